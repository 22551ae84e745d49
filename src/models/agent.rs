use serde::{Deserialize, Serialize};

use super::ModelError;

/// The kind of specialist an agent profile describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// Business or regulatory domain knowledge (payments, healthcare, ...)
    DomainExpert,
    /// Engineering role (backend, frontend, devops, ...)
    Technical,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomainExpert => "domain_expert",
            Self::Technical => "technical",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s.trim() {
            "domain_expert" | "domain-expert" => Ok(Self::DomainExpert),
            "technical" => Ok(Self::Technical),
            other => Err(ModelError::InvalidAgentType(other.to_string())),
        }
    }
}

/// Input for constructing an [`Agent`].
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub id: String,
    pub name: String,
    pub content: String,
    pub description: String,
    pub agent_type: AgentType,
    pub specializations: Vec<String>,
    pub model: Option<String>,
}

/// A specialist profile loaded from the agent library.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Agent {
    id: String,
    name: String,
    content: String,
    description: String,
    #[serde(rename = "type")]
    agent_type: AgentType,
    specializations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

impl Agent {
    /// Minimum profile body length, in characters.
    pub const MIN_CONTENT_LEN: usize = 50;

    pub fn new(input: NewAgent) -> Result<Self, ModelError> {
        if input.id.trim().is_empty() {
            return Err(ModelError::EmptyName { entity: "agent id" });
        }
        if input.name.trim().is_empty() {
            return Err(ModelError::EmptyName { entity: "agent" });
        }
        let len = input.content.trim().chars().count();
        if len < Self::MIN_CONTENT_LEN {
            return Err(ModelError::ContentTooShort {
                id: input.id,
                len,
                min: Self::MIN_CONTENT_LEN,
            });
        }

        Ok(Self {
            id: input.id,
            name: input.name,
            content: input.content,
            description: input.description,
            agent_type: input.agent_type,
            specializations: input.specializations,
            model: input.model,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    pub fn specializations(&self) -> &[String] {
        &self.specializations
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Short listing form without the profile body.
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            agent_type: self.agent_type,
            specializations: self.specializations.clone(),
        }
    }

    /// Check profile completeness.
    ///
    /// Normal mode only reports missing specializations as a warning; strict
    /// mode treats it, and a thin description, as errors.
    pub fn validate(&self, strict: bool) -> ProfileValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.description.trim().is_empty() {
            errors.push("missing required field: description".to_string());
        } else if strict && self.description.trim().chars().count() < 20 {
            errors.push("description must be at least 20 characters in strict mode".to_string());
        }

        if self.specializations.is_empty() {
            if strict {
                errors.push("missing required field: specializations".to_string());
            } else {
                warnings.push("no specializations listed".to_string());
            }
        }

        if !self.content.lines().any(|l| l.starts_with("## ")) {
            let msg = "profile body has no '## ' sections".to_string();
            if strict {
                errors.push(msg);
            } else {
                warnings.push(msg);
            }
        }

        if self.model.is_none() {
            warnings.push("no preferred model declared".to_string());
        }

        ProfileValidation {
            agent_id: self.id.clone(),
            strict,
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Listing entry for an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub specializations: Vec<String>,
}

/// Outcome of validating an agent profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileValidation {
    pub agent_id: String,
    pub strict: bool,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewAgent {
        NewAgent {
            id: "a-backend-engineer".to_string(),
            name: "Backend Engineer".to_string(),
            content: "# Backend Engineer\n\n## Responsibilities\nDesigns services, APIs and storage layers."
                .to_string(),
            description: "Builds and operates server-side systems".to_string(),
            agent_type: AgentType::Technical,
            specializations: vec!["apis".to_string()],
            model: None,
        }
    }

    #[test]
    fn rejects_short_content() {
        let mut agent = input();
        agent.content = "too short".to_string();
        assert!(matches!(
            Agent::new(agent),
            Err(ModelError::ContentTooShort { .. })
        ));
    }

    #[test]
    fn rejects_empty_name() {
        let mut agent = input();
        agent.name = " ".to_string();
        assert!(Agent::new(agent).is_err());
    }

    #[test]
    fn parses_agent_types() {
        assert_eq!(AgentType::parse("technical").unwrap(), AgentType::Technical);
        assert_eq!(
            AgentType::parse("domain_expert").unwrap(),
            AgentType::DomainExpert
        );
        assert!(AgentType::parse("wizard").is_err());
    }

    #[test]
    fn empty_specializations_pass_normal_but_fail_strict() {
        let mut raw = input();
        raw.specializations.clear();
        let agent = Agent::new(raw).unwrap();

        let normal = agent.validate(false);
        assert!(normal.valid);
        assert!(!normal.warnings.is_empty());

        let strict = agent.validate(true);
        assert!(!strict.valid);
        assert!(strict
            .errors
            .iter()
            .any(|e| e.contains("specializations")));
    }
}
