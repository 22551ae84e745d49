//! Conditional-inclusion expressions used by context combinations.
//!
//! The catalog stores conditions as short strings such as
//! `domain_focus.includes('security') && complexity === 'critical'`. They are
//! parsed once, when the catalog is loaded, into a [`Condition`] tree.
//!
//! Grammar:
//!
//! ```text
//! expr     := and ( "||" and )*
//! and      := atom ( "&&" atom )*
//! atom     := field ".includes(" quoted ")"
//!           | field "===" ( quoted | "true" | "false" )
//! ```
//!
//! `||` binds looser than `&&`. Parentheses and anything else are not
//! supported; such fragments parse to [`Condition::Unsupported`], which always
//! evaluates to `false`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::QueryParams;

static INCLUDES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z_][A-Za-z0-9_]*)\.includes\(\s*['"]([^'"]*)['"]\s*\)$"#)
        .expect("includes pattern is valid")
});

static EQUALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z_][A-Za-z0-9_]*)\s*===\s*(?:['"]([^'"]*)['"]|(true|false))$"#)
        .expect("equality pattern is valid")
});

/// Right-hand side of an equality test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equals { field: String, value: Literal },
    Includes { field: String, value: String },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Unsupported(String),
}

/// A parameter value as seen by a condition.
enum Field<'a> {
    Scalar(Option<&'a str>),
    List(&'a [String]),
    Flag(bool),
    Unknown,
}

fn lookup<'a>(params: &'a QueryParams, field: &str) -> Field<'a> {
    match field {
        "complexity" => Field::Scalar(params.complexity.as_deref()),
        "task_intent" => Field::Scalar(params.task_intent.as_deref()),
        "scope" => Field::Scalar(params.scope.as_deref()),
        "output_format" => Field::Scalar(params.output_format.as_deref()),
        "query_type" => Field::Scalar(Some(params.query_type.as_str())),
        "domain_focus" => Field::List(&params.domain_focus),
        "include_sdlc_checks" => Field::Flag(params.include_sdlc_checks),
        _ => Field::Unknown,
    }
}

impl Condition {
    pub fn parse(source: &str) -> Self {
        let source = source.trim();

        if let Some((left, right)) = source.split_once("||") {
            return Self::Or(Box::new(Self::parse(left)), Box::new(Self::parse(right)));
        }
        if let Some((left, right)) = source.split_once("&&") {
            return Self::And(Box::new(Self::parse(left)), Box::new(Self::parse(right)));
        }

        if let Some(caps) = INCLUDES.captures(source) {
            return Self::Includes {
                field: caps[1].to_string(),
                value: caps[2].to_string(),
            };
        }

        if let Some(caps) = EQUALS.captures(source) {
            let value = match (caps.get(2), caps.get(3)) {
                (Some(text), _) => Literal::Text(text.as_str().to_string()),
                (None, Some(flag)) => Literal::Bool(flag.as_str() == "true"),
                (None, None) => return Self::Unsupported(source.to_string()),
            };
            return Self::Equals {
                field: caps[1].to_string(),
                value,
            };
        }

        Self::Unsupported(source.to_string())
    }

    pub fn evaluate(&self, params: &QueryParams) -> bool {
        match self {
            Self::Or(left, right) => left.evaluate(params) || right.evaluate(params),
            Self::And(left, right) => left.evaluate(params) && right.evaluate(params),
            Self::Includes { field, value } => match lookup(params, field) {
                Field::List(items) => items.iter().any(|item| item == value),
                _ => false,
            },
            Self::Equals { field, value } => match (lookup(params, field), value) {
                (Field::Scalar(Some(actual)), Literal::Text(expected)) => actual == expected,
                (Field::Flag(actual), Literal::Bool(expected)) => actual == *expected,
                _ => false,
            },
            Self::Unsupported(_) => false,
        }
    }

    /// Fragments of the expression that could not be parsed.
    pub fn unsupported_fragments(&self) -> Vec<&str> {
        match self {
            Self::Or(left, right) | Self::And(left, right) => {
                let mut out = left.unsupported_fragments();
                out.extend(right.unsupported_fragments());
                out
            }
            Self::Unsupported(fragment) => vec![fragment.as_str()],
            _ => Vec::new(),
        }
    }
}

/// A parsed condition together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ConditionExpr {
    source: String,
    condition: Condition,
}

impl ConditionExpr {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn evaluate(&self, params: &QueryParams) -> bool {
        self.condition.evaluate(params)
    }
}

impl From<String> for ConditionExpr {
    fn from(source: String) -> Self {
        let condition = Condition::parse(&source);
        Self { source, condition }
    }
}

impl From<&str> for ConditionExpr {
    fn from(source: &str) -> Self {
        Self::from(source.to_string())
    }
}

impl From<ConditionExpr> for String {
    fn from(expr: ConditionExpr) -> Self {
        expr.source
    }
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> QueryParams {
        QueryParams::new("security")
            .task_intent("review")
            .complexity("critical")
            .domain_focus(["security", "compliance"])
    }

    #[test]
    fn parses_includes() {
        assert_eq!(
            Condition::parse("domain_focus.includes('payments')"),
            Condition::Includes {
                field: "domain_focus".to_string(),
                value: "payments".to_string()
            }
        );
    }

    #[test]
    fn parses_equality_with_double_quotes() {
        assert_eq!(
            Condition::parse(r#"complexity === "critical""#),
            Condition::Equals {
                field: "complexity".to_string(),
                value: Literal::Text("critical".to_string())
            }
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let cond = Condition::parse(
            "scope === 'epic' || complexity === 'critical' && domain_focus.includes('security')",
        );
        assert!(matches!(cond, Condition::Or(_, _)));
        assert!(cond.evaluate(&params()));
    }

    #[test]
    fn includes_only_applies_to_list_fields() {
        assert!(!Condition::parse("complexity.includes('critical')").evaluate(&params()));
        assert!(Condition::parse("domain_focus.includes('compliance')").evaluate(&params()));
    }

    #[test]
    fn equality_against_missing_field_is_false() {
        assert!(!Condition::parse("scope === 'epic'").evaluate(&params()));
    }

    #[test]
    fn boolean_flags() {
        let cond = Condition::parse("include_sdlc_checks === true");
        assert!(!cond.evaluate(&params()));
        assert!(cond.evaluate(&params().include_sdlc_checks(true)));
    }

    #[test]
    fn unsupported_syntax_evaluates_false() {
        for source in [
            "(complexity === 'critical')",
            "complexity == 'critical'",
            "domain_focus.length > 1",
            "",
        ] {
            let cond = Condition::parse(source);
            assert!(!cond.evaluate(&params()), "{source} should be false");
            assert!(!cond.unsupported_fragments().is_empty());
        }
    }

    #[test]
    fn round_trips_source_text() {
        let expr: ConditionExpr = serde_json::from_str(r#""task_intent === 'review'""#).unwrap();
        assert!(expr.evaluate(&params()));
        assert_eq!(
            serde_json::to_string(&expr).unwrap(),
            r#""task_intent === 'review'""#
        );
    }
}
