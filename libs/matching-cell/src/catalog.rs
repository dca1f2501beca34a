use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use shared_config::AppConfig;

use crate::models::{
    KeywordBonuses, OrganCategory, OrganFilterChoice, OrganFilterOption, OrganFilterTable,
    Questionnaire,
};

const EMBEDDED_CATALOG: &str = include_str!("../data/matching_catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read matching catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse matching catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid matching catalog: {0}")]
    Invalid(String),
}

/// Static matching data: questionnaire with its option tags, the organ keyword
/// table and the keyword bonuses. Loaded once and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchingCatalog {
    pub version: u32,
    pub questionnaire: Questionnaire,
    pub organ_filter: OrganFilterTable,
    #[serde(default)]
    pub keyword_bonuses: KeywordBonuses,
}

impl MatchingCatalog {
    /// Catalog shipped with the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: MatchingCatalog = serde_json::from_str(json)?;
        catalog.normalized()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Uses `MATCHING_CATALOG_PATH` when configured, the embedded catalog otherwise.
    pub fn load(config: &AppConfig) -> Result<Self, CatalogError> {
        let catalog = match &config.matching_catalog_path {
            Some(path) => {
                info!("Loading matching catalog from {}", path);
                Self::from_path(path)?
            }
            None => Self::embedded()?,
        };

        info!(
            "Matching catalog v{} loaded: {} questionnaire items, {} organ categories",
            catalog.version,
            catalog.questionnaire.items.len(),
            catalog.organ_filter.options.len()
        );

        Ok(catalog)
    }

    fn normalized(mut self) -> Result<Self, CatalogError> {
        let mut item_ids = HashSet::new();
        for item in &self.questionnaire.items {
            if !item_ids.insert(item.id.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate questionnaire item id '{}'",
                    item.id
                )));
            }
        }

        let mut categories = HashSet::new();
        for option in &mut self.organ_filter.options {
            if !categories.insert(option.category) {
                return Err(CatalogError::Invalid(format!(
                    "organ category '{}' listed twice",
                    option.category
                )));
            }

            option.keywords = option
                .keywords
                .iter()
                .map(|keyword| keyword.trim().to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect();

            if option.keywords.is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "organ category '{}' has no keywords",
                    option.category
                )));
            }
        }

        for category in OrganCategory::ALL {
            if !categories.contains(&category) {
                warn!("Organ category '{}' missing from catalog, it will not filter", category);
            }
        }

        Ok(self)
    }

    pub fn organ_option(&self, category: OrganCategory) -> Option<&OrganFilterOption> {
        self.organ_filter
            .options
            .iter()
            .find(|option| option.category == category)
    }

    /// Filter bar entries, "all" first, with the selected one marked active.
    pub fn organ_filter_choices(&self, selected: Option<OrganCategory>) -> Vec<OrganFilterChoice> {
        let all = OrganFilterChoice {
            label: self.organ_filter.all_label.clone(),
            value: None,
            is_active: selected.is_none(),
        };

        std::iter::once(all)
            .chain(self.organ_filter.options.iter().map(|option| OrganFilterChoice {
                label: option.label.clone(),
                value: Some(option.category),
                is_active: selected == Some(option.category),
            }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_embedded_catalog_preserves_keyword_roots() {
        let catalog = MatchingCatalog::embedded().unwrap();

        let breast = catalog.organ_option(OrganCategory::Breast).unwrap();
        assert_eq!(breast.keywords, vec!["молочн", "груд", "breast"]);

        let skin = catalog.organ_option(OrganCategory::Skin).unwrap();
        assert_eq!(skin.keywords, vec!["шкір", "дермат", "skin"]);

        assert_eq!(catalog.keyword_bonuses, KeywordBonuses::default());
    }

    #[test]
    fn test_embedded_catalog_carries_symptom_tags() {
        let catalog = MatchingCatalog::embedded().unwrap();
        let symptoms = catalog
            .questionnaire
            .items
            .iter()
            .find(|item| item.id == "symptoms")
            .unwrap();

        assert_eq!(symptoms.option("breast_lump").unwrap().tags, vec!["breast"]);
        assert_eq!(symptoms.option("histology_he").unwrap().tags, vec!["he"]);
        assert!(symptoms.option("unknown").is_none());
    }

    #[test]
    fn test_filter_choices_mark_selection() {
        let catalog = MatchingCatalog::embedded().unwrap();

        let choices = catalog.organ_filter_choices(None);
        assert_eq!(choices.len(), 5);
        assert!(choices[0].is_active);
        assert_eq!(choices[0].value, None);

        let choices = catalog.organ_filter_choices(Some(OrganCategory::Lung));
        assert!(!choices[0].is_active);
        let active: Vec<_> = choices.iter().filter(|c| c.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].value, Some(OrganCategory::Lung));
    }

    #[test]
    fn test_keywords_are_lowercased_on_load() {
        let json = r#"{
            "version": 2,
            "questionnaire": { "version": 1, "items": [] },
            "organ_filter": {
                "all_label": "All",
                "options": [
                    { "category": "lung", "label": "Lung", "keywords": [" LEGEN ", "Pulmon", ""] }
                ]
            }
        }"#;

        let catalog = MatchingCatalog::from_json(json).unwrap();
        let lung = catalog.organ_option(OrganCategory::Lung).unwrap();
        assert_eq!(lung.keywords, vec!["legen", "pulmon"]);
        assert_eq!(catalog.keyword_bonuses.organ_match, 10);
    }

    #[test]
    fn test_rejects_duplicate_categories() {
        let json = r#"{
            "version": 1,
            "questionnaire": { "version": 1, "items": [] },
            "organ_filter": {
                "all_label": "All",
                "options": [
                    { "category": "skin", "label": "Skin", "keywords": ["skin"] },
                    { "category": "skin", "label": "Skin again", "keywords": ["derm"] }
                ]
            }
        }"#;

        assert_matches!(MatchingCatalog::from_json(json), Err(CatalogError::Invalid(_)));
    }

    #[test]
    fn test_loads_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut catalog = MatchingCatalog::embedded().unwrap();
        catalog.version = 7;
        catalog.keyword_bonuses.organ_match = 20;
        write!(file, "{}", serde_json::to_string(&catalog).unwrap()).unwrap();

        let loaded = MatchingCatalog::from_path(file.path()).unwrap();
        assert_eq!(loaded.version, 7);
        assert_eq!(loaded.keyword_bonuses.organ_match, 20);

        assert_matches!(
            MatchingCatalog::from_path("/nonexistent/catalog.json"),
            Err(CatalogError::Io { .. })
        );
    }
}
