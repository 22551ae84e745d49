use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::ContextCombination;

/// Contents of `context-combinations.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CombinationCatalog {
    /// Id of the combination used when nothing scores above zero.
    pub default_combination: String,
    pub combinations: Vec<ContextCombination>,
}

impl CombinationCatalog {
    pub fn get(&self, id: &str) -> Option<&ContextCombination> {
        self.combinations.iter().find(|c| c.id == id)
    }

    pub fn default_combination(&self) -> Option<&ContextCombination> {
        self.get(&self.default_combination)
    }

    /// Check structural consistency and report unparseable conditions.
    ///
    /// Unparseable conditions are not an error: they never match.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for combination in &self.combinations {
            if !ids.insert(combination.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate combination id '{}'",
                    combination.id
                )));
            }

            for rule in &combination.conditional_contexts {
                for fragment in rule.condition.condition().unsupported_fragments() {
                    tracing::warn!(
                        "Combination '{}': unsupported condition fragment '{}' in '{}' will never match",
                        combination.id,
                        fragment,
                        rule.condition
                    );
                }
            }
        }

        if self.default_combination().is_none() {
            return Err(ConfigError::Invalid(format!(
                "default combination '{}' is not in the catalog",
                self.default_combination
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(json: &str) -> CombinationCatalog {
        serde_json::from_str(json).expect("catalog parses")
    }

    #[test]
    fn rejects_missing_default() {
        let c = catalog(
            r#"{ "defaultCombination": "nope", "combinations": [
                { "id": "a", "name": "A", "queryType": "story", "baseContexts": ["x"] }
            ] }"#,
        );
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let c = catalog(
            r#"{ "defaultCombination": "a", "combinations": [
                { "id": "a", "name": "A", "queryType": "story", "baseContexts": [] },
                { "id": "a", "name": "B", "queryType": "epic", "baseContexts": [] }
            ] }"#,
        );
        assert!(c.validate().is_err());
    }

    #[test]
    fn tolerates_unsupported_conditions() {
        let c = catalog(
            r#"{ "defaultCombination": "a", "combinations": [
                { "id": "a", "name": "A", "queryType": "story", "baseContexts": [],
                  "conditionalContexts": [
                    { "condition": "scope.length > 2", "contexts": ["y"], "reason": "never" }
                  ] }
            ] }"#,
        );
        assert!(c.validate().is_ok());
    }
}
