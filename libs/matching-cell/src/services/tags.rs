use serde_json::Value;

use crate::models::{Answers, DerivedTagSet, InputKind, QuestionnaireItem};

/// Scalar answers become a one-element list, arrays are taken as is, null is nothing.
fn selected_values(answer: &Value) -> Vec<&Value> {
    match answer {
        Value::Null => Vec::new(),
        Value::Array(values) => values.iter().collect(),
        other => vec![other],
    }
}

/// Union of the tags of every selected option. Items without options, missing
/// answers and unknown values contribute nothing.
pub fn derive_tags(items: &[QuestionnaireItem], answers: &Answers) -> DerivedTagSet {
    let mut tags = DerivedTagSet::new();

    for item in items {
        let Some(options) = &item.options else {
            continue;
        };
        let Some(answer) = answers.get(&item.id) else {
            continue;
        };

        for selected in selected_values(answer) {
            let Some(selected) = selected.as_str() else {
                continue;
            };

            if let Some(option) = options.iter().find(|option| option.value == selected) {
                tags.extend(option.tags.iter().cloned());
            }
        }
    }

    tags
}

fn is_blank(answer: Option<&Value>) -> bool {
    match answer {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(values)) => values.is_empty(),
        Some(_) => false,
    }
}

fn is_visible(item: &QuestionnaireItem, answers: &Answers) -> bool {
    let Some(condition) = &item.show_if else {
        return true;
    };

    answers
        .get(&condition.id)
        .map(|answer| {
            selected_values(answer)
                .into_iter()
                .filter_map(Value::as_str)
                .any(|value| condition.values.iter().any(|allowed| allowed == value))
        })
        .unwrap_or(false)
}

fn numeric_value(answer: &Value) -> Option<f64> {
    match answer {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Checks answers against the questionnaire before a case is created.
/// Returns one message per problem, empty when the answers are acceptable.
pub fn validate_answers(items: &[QuestionnaireItem], answers: &Answers) -> Vec<String> {
    let mut issues = Vec::new();

    for item in items {
        if !is_visible(item, answers) {
            continue;
        }

        let answer = answers.get(&item.id);
        if is_blank(answer) {
            if item.required {
                issues.push(format!("Field '{}' is required", item.id));
            }
            continue;
        }
        let Some(answer) = answer else {
            continue;
        };

        match item.kind {
            InputKind::Number => match numeric_value(answer) {
                Some(value) => {
                    if item.min.is_some_and(|min| value < min) || item.max.is_some_and(|max| value > max) {
                        issues.push(format!(
                            "Field '{}' must be between {} and {}",
                            item.id,
                            item.min.map(|v| v.to_string()).unwrap_or_else(|| "-inf".to_string()),
                            item.max.map(|v| v.to_string()).unwrap_or_else(|| "inf".to_string()),
                        ));
                    }
                }
                None => issues.push(format!("Field '{}' must be a number", item.id)),
            },
            InputKind::Text => {
                if !answer.is_string() {
                    issues.push(format!("Field '{}' must be text", item.id));
                }
            }
            kind => {
                if answer.is_array() && !kind.is_multi() {
                    issues.push(format!("Field '{}' accepts a single value", item.id));
                    continue;
                }

                for selected in selected_values(answer) {
                    match selected.as_str() {
                        Some(value) if item.option(value).is_some() => {}
                        Some(value) => issues.push(format!(
                            "Unknown option '{}' for field '{}'",
                            value, item.id
                        )),
                        None => issues.push(format!(
                            "Field '{}' expects option values",
                            item.id
                        )),
                    }
                }
            }
        }
    }

    issues
}
