use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::ModelError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Where a template came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    Library,
    Custom,
}

/// A named document with `{{identifier}}` placeholders.
///
/// The placeholder list is extracted from the content on every call to
/// [`Template::variables`] unless it was supplied up front with
/// [`Template::with_variables`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    content: String,
    source: TemplateSource,
    declared_variables: Option<Vec<String>>,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        source: TemplateSource,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        let content = content.into();

        if name.trim().is_empty() {
            return Err(ModelError::EmptyName { entity: "template" });
        }
        if content.trim().is_empty() {
            return Err(ModelError::EmptyContent {
                entity: "template",
                name,
            });
        }

        Ok(Self {
            name,
            content,
            source,
            declared_variables: None,
        })
    }

    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.declared_variables = Some(variables);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source(&self) -> TemplateSource {
        self.source
    }

    /// Placeholder names in order of first appearance, without duplicates.
    pub fn variables(&self) -> Vec<String> {
        if let Some(declared) = &self.declared_variables {
            return declared.clone();
        }
        extract_variables(&self.content)
    }

    /// Substitute every placeholder that has a value in `values`.
    ///
    /// Placeholders without a value are left exactly as written.
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(&self.content, |caps: &Captures| match values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

pub fn extract_variables(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PLACEHOLDER.captures_iter(content) {
        let name = caps[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

impl Serialize for Template {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Template", 4)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("content", &self.content)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("variables", &self.variables())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(content: &str) -> Template {
        Template::new("story", content, TemplateSource::Library).unwrap()
    }

    #[test]
    fn extracts_variables_in_order_without_duplicates() {
        let t = template("As a {{persona}} I want {{goal}} so {{persona}} can {{ benefit }}");
        assert_eq!(t.variables(), vec!["persona", "goal", "benefit"]);
    }

    #[test]
    fn declared_variables_take_precedence() {
        let t = template("{{a}} {{b}}").with_variables(vec!["b".to_string()]);
        assert_eq!(t.variables(), vec!["b"]);
    }

    #[test]
    fn render_replaces_every_occurrence_and_nothing_else() {
        let t = template("Hi {{name}}, {name} and {{name}}. {{other}}");
        let mut values = HashMap::new();
        values.insert("name".to_string(), "X".to_string());

        assert_eq!(t.render(&values), "Hi X, {name} and X. {{other}}");
    }

    #[test]
    fn ignores_malformed_placeholders() {
        assert!(extract_variables("{{1abc}} {{ }} {single}").is_empty());
    }
}
