use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The documents a query type loads in basic (unscored) mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryMapping {
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub templates: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Contents of `query-mappings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryMappings {
    pub mappings: BTreeMap<String, QueryMapping>,
    pub allowed_query_types: Vec<String>,
}

impl QueryMappings {
    pub fn is_allowed(&self, query_type: &str) -> bool {
        self.allowed_query_types.iter().any(|t| t == query_type)
    }

    pub fn get(&self, query_type: &str) -> Option<&QueryMapping> {
        self.mappings.get(query_type)
    }
}
