use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

/// Authenticated caller together with the bearer token it presented.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Session attached by [`optional_auth_middleware`], if any.
#[derive(Debug, Clone)]
pub struct OptionalSession(pub Option<Session>);

impl<S> FromRequestParts<S> for OptionalSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalSession(parts.extensions.get::<Session>().cloned()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(auth_header) = headers.get("Authorization") else {
        return Ok(None);
    };

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

fn attach_session(request: &mut Request<Body>, user: User, token: String) {
    request.extensions_mut().insert(user.clone());
    request.extensions_mut().insert(Session { user, token });
}

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_string();

    let user = validate_token(&token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    attach_session(&mut request, user, token);

    Ok(next.run(request).await)
}

/// Lets anonymous requests through; a present but invalid token is still rejected.
pub async fn optional_auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(request.headers())?.map(str::to_string) {
        let user = validate_token(&token, &config.supabase_jwt_secret)
            .map_err(AppError::Auth)?;
        attach_session(&mut request, user, token);
    }

    Ok(next.run(request).await)
}

pub async fn extract_user<B>(request: &Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}
