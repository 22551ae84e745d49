//! Free-text task classification.
//!
//! Each dimension has its own ordered pattern families:
//!
//! - query type: every family is scored and the best total wins
//! - task intent, scope, output format: the first family with a match wins
//! - complexity: first match in the fixed order critical, complex, simple,
//!   medium
//! - domain focus: every family with a match is reported
//!
//! Overall confidence is
//! `0.4·type + 0.2·intent + 0.15·scope + 0.1·complexity + 0.05·format + 0.1·domain`,
//! plus 0.3 when the query type had to be inferred from the intent, clamped
//! to `[0, 1]`.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{AnalyzedIntent, QueryParams};

const QUERY_TYPE_WEIGHT: f64 = 0.4;
const TASK_INTENT_WEIGHT: f64 = 0.2;
const SCOPE_WEIGHT: f64 = 0.15;
const COMPLEXITY_WEIGHT: f64 = 0.1;
const OUTPUT_FORMAT_BONUS: f64 = 0.05;
const DOMAIN_BONUS: f64 = 0.1;
const INFERRED_TYPE_BONUS: f64 = 0.3;

const TASK_INTENT_CONFIDENCE: f64 = 0.8;
const SCOPE_CONFIDENCE: f64 = 0.7;

const DEFAULT_TASK_INTENT: &str = "create";

/// A named list of patterns.
struct Family {
    name: &'static str,
    patterns: Vec<Regex>,
}

impl Family {
    fn new(name: &'static str, patterns: &[&str]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("intent pattern is valid"))
            .collect();
        Self { name, patterns }
    }

    fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// Anchored patterns count 1.0 per match, loose ones 0.5.
    fn score(&self, text: &str) -> f64 {
        self.patterns
            .iter()
            .filter(|p| p.is_match(text))
            .map(|p| if p.as_str().contains(r"\b") { 1.0 } else { 0.5 })
            .sum()
    }
}

fn families(table: &[(&'static str, &[&str])]) -> Vec<Family> {
    table
        .iter()
        .map(|(name, patterns)| Family::new(name, patterns))
        .collect()
}

static QUERY_TYPES: LazyLock<Vec<Family>> = LazyLock::new(|| {
    families(&[
        (
            "story",
            &[
                r"\buser stor(y|ies)\b",
                r"\bas an? \w+,? i want\b",
                r"\bacceptance criteria\b",
                r"stor(y|ies)",
            ],
        ),
        (
            "epic",
            &[
                r"\bepics?\b",
                r"\binitiatives?\b",
                r"\bfeature set\b",
                r"large feature",
            ],
        ),
        (
            "story-breakdown",
            &[
                r"\bbreak(ing)? (it |this |that |them )?down\b",
                r"\bbreakdown\b",
                r"\bsplit\b.*\bstor",
                r"\b(break(ing)?|split(ting)?)\b.*\binto\b",
                r"\bsub-?tasks?\b",
                r"decompos",
            ],
        ),
        (
            "pr-review",
            &[
                r"\bpull requests?\b",
                r"\bprs?\b",
                r"\bcode review\b",
                r"\breview\b.*\b(code|changes|diff)\b",
                r"diff",
            ],
        ),
        (
            "architecture",
            &[
                r"\barchitecture\b",
                r"\bsystem design\b",
                r"\bdesign (a|an|the)\b.*\b(system|service|platform)\b",
                r"\bmicroservices?\b",
                r"scalab",
            ],
        ),
        (
            "security",
            &[
                r"\bsecurity\b",
                r"\bvulnerabilit(y|ies)\b",
                r"\bthreat model(ing)?\b",
                r"\bowasp\b",
                r"\bauth(entication|orization)?\b",
                r"pentest",
            ],
        ),
        (
            "testing",
            &[
                r"\btest (plan|cases?|strategy)\b",
                r"\bunit tests?\b",
                r"\bintegration tests?\b",
                r"\bqa\b",
                r"coverage",
            ],
        ),
        (
            "documentation",
            &[
                r"\bdocument(ation)?\b",
                r"\breadme\b",
                r"\bapi docs\b",
                r"\brunbooks?\b",
            ],
        ),
        (
            "poc",
            &[
                r"\bpoc\b",
                r"\bproof of concept\b",
                r"\bprototype\b",
                r"\bspike\b",
            ],
        ),
        (
            "bug-fix",
            &[
                r"\bbugs?\b",
                r"\bdefects?\b",
                r"\bfix(es|ing)?\b",
                r"\bregressions?\b",
                r"crash",
            ],
        ),
        (
            "performance",
            &[
                r"\bperformance\b",
                r"\blatency\b",
                r"\bthroughput\b",
                r"\bbottlenecks?\b",
                r"optimi[sz]",
            ],
        ),
        (
            "deployment",
            &[
                r"\bdeploy(ment|ing)?\b",
                r"\bci/cd\b",
                r"\bpipelines?\b",
                r"\breleases?\b",
                r"kubernetes|k8s",
            ],
        ),
    ])
});

static TASK_INTENTS: LazyLock<Vec<Family>> = LazyLock::new(|| {
    families(&[
        ("create", &[r"\b(create|write|draft|generate|compose)\b"]),
        ("refine", &[r"\b(refine|improve|update|revise|polish|clarify)\b"]),
        (
            "breakdown",
            &[
                r"\bbreak(ing)? (it |this |that |them )?down\b",
                r"\bbreakdown\b",
                r"\bsplit\b",
                r"\bdecompose\b",
            ],
        ),
        (
            "review",
            &[r"\b(review|audit|assess|evaluate|analy[sz]e|check)\b"],
        ),
        ("plan", &[r"\b(plan|design|architect|roadmap|strategy)\b"]),
        ("implement", &[r"\b(implement|build|code|develop|fix)\b"]),
    ])
});

static SCOPES: LazyLock<Vec<Family>> = LazyLock::new(|| {
    families(&[
        ("epic", &[r"\bepics?\b"]),
        ("story", &[r"\b(user )?stor(y|ies)\b"]),
        ("subtask", &[r"\bsub-?tasks?\b", r"\btasks?\b"]),
        ("portfolio", &[r"\bportfolio\b", r"\bprogram(me)?\b"]),
        ("theme", &[r"\bthemes?\b", r"\binitiatives?\b"]),
        ("spike", &[r"\bspike\b", r"\binvestigat", r"\bresearch\b"]),
    ])
});

/// Checked in this order regardless of where words appear in the text.
static COMPLEXITIES: LazyLock<Vec<(Family, f64)>> = LazyLock::new(|| {
    vec![
        (
            Family::new(
                "critical",
                &[
                    r"\bcritical\b",
                    r"\bmission[- ]critical\b",
                    r"\burgent\b",
                    r"\bhigh[- ]risk\b",
                    r"\bproduction (outage|incident)\b",
                ],
            ),
            0.9,
        ),
        (
            Family::new(
                "complex",
                &[
                    r"\bcomplex\b",
                    r"\bcomplicated\b",
                    r"\blarge[- ]scale\b",
                    r"\bdistributed\b",
                    r"\bmulti-?(service|team|region)\b",
                ],
            ),
            0.8,
        ),
        (
            Family::new(
                "simple",
                &[
                    r"\bsimple\b",
                    r"\bsmall\b",
                    r"\btrivial\b",
                    r"\bquick\b",
                    r"\beasy\b",
                ],
            ),
            0.7,
        ),
        (
            Family::new(
                "medium",
                &[r"\bmedium\b", r"\bmoderate\b", r"\bstandard\b"],
            ),
            0.6,
        ),
    ]
});

static OUTPUT_FORMATS: LazyLock<Vec<Family>> = LazyLock::new(|| {
    families(&[
        ("jira", &[r"\bjira\b"]),
        ("confluence", &[r"\bconfluence\b", r"\bwiki\b"]),
        ("github", &[r"\bgithub\b"]),
        ("gitlab", &[r"\bgitlab\b"]),
    ])
});

static DOMAINS: LazyLock<Vec<Family>> = LazyLock::new(|| {
    families(&[
        (
            "security",
            &[
                r"\bsecurity\b",
                r"\bsecure\b",
                r"\bauth(entication|orization)?\b",
                r"\bvulnerab",
                r"\bencrypt",
            ],
        ),
        (
            "payments",
            &[
                r"\bpayments?\b",
                r"\bbilling\b",
                r"\bcheckout\b",
                r"\bpci\b",
                r"\bstripe\b",
            ],
        ),
        (
            "compliance",
            &[
                r"\bcompliance\b",
                r"\bgdpr\b",
                r"\bhipaa\b",
                r"\bsoc ?2\b",
                r"\baudit\b",
                r"\bregulat",
            ],
        ),
        (
            "performance",
            &[
                r"\bperformance\b",
                r"\blatency\b",
                r"\bscalab",
                r"\bcaching\b",
            ],
        ),
        (
            "accessibility",
            &[
                r"\baccessib",
                r"\ba11y\b",
                r"\bwcag\b",
                r"\bscreen readers?\b",
            ],
        ),
        (
            "data",
            &[
                r"\bdata(base)?\b",
                r"\betl\b",
                r"\banalytics\b",
                r"\bsql\b",
                r"\bschemas?\b",
            ],
        ),
        (
            "infrastructure",
            &[
                r"\binfrastructure\b",
                r"\bkubernetes\b",
                r"\bterraform\b",
                r"\bcloud\b",
                r"\b(aws|azure|gcp)\b",
            ],
        ),
        (
            "api",
            &[
                r"\bapis?\b",
                r"\brest(ful)?\b",
                r"\bgraphql\b",
                r"\bendpoints?\b",
            ],
        ),
        (
            "frontend",
            &[
                r"\bfrontend\b",
                r"\bfront-end\b",
                r"\bui\b",
                r"\breact\b",
                r"\bcomponents?\b",
            ],
        ),
        (
            "backend",
            &[
                r"\bbackend\b",
                r"\bback-end\b",
                r"\bserver(-side)?\b",
                r"\bmicroservices?\b",
            ],
        ),
    ])
});

/// Query type used when no query-type pattern matched.
fn query_type_for_intent(intent: &str) -> &'static str {
    match intent {
        "breakdown" => "story-breakdown",
        "review" => "pr-review",
        "plan" => "architecture",
        "implement" => "documentation",
        _ => "story",
    }
}

fn first_match<'a>(families: &'a [Family], text: &str) -> Option<&'a Family> {
    families.iter().find(|f| f.matches(text))
}

/// Deterministic, pattern-based classifier for task statements.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentAnalyzer;

impl IntentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, statement: &str) -> AnalyzedIntent {
        let text = statement.trim().to_lowercase();
        let mut reasoning = Vec::new();
        let mut confidence = 0.0;

        // Query type: highest accumulated score, first family wins ties.
        let mut best: Option<(&Family, f64)> = None;
        for family in QUERY_TYPES.iter() {
            let score = family.score(&text);
            if score > 0.0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((family, score));
            }
        }
        let detected_type = best.map(|(family, score)| {
            let type_confidence = (score / family.patterns.len() as f64).min(1.0);
            confidence += type_confidence * QUERY_TYPE_WEIGHT;
            reasoning.push(format!(
                "Query type '{}' matched with score {:.1} (confidence {:.2})",
                family.name, score, type_confidence
            ));
            family.name
        });

        let task_intent = match first_match(&TASK_INTENTS, &text) {
            Some(family) => {
                confidence += TASK_INTENT_CONFIDENCE * TASK_INTENT_WEIGHT;
                reasoning.push(format!("Task intent '{}' detected", family.name));
                Some(family.name)
            }
            None => None,
        };

        let scope = first_match(&SCOPES, &text).map(|family| {
            confidence += SCOPE_CONFIDENCE * SCOPE_WEIGHT;
            reasoning.push(format!("Scope '{}' detected", family.name));
            family.name.to_string()
        });

        let complexity = COMPLEXITIES
            .iter()
            .find(|(family, _)| family.matches(&text))
            .map(|(family, level_confidence)| {
                confidence += level_confidence * COMPLEXITY_WEIGHT;
                reasoning.push(format!(
                    "Complexity '{}' detected (confidence {:.1})",
                    family.name, level_confidence
                ));
                family.name.to_string()
            });

        let output_format = first_match(&OUTPUT_FORMATS, &text).map(|family| {
            confidence += OUTPUT_FORMAT_BONUS;
            reasoning.push(format!("Output format '{}' detected", family.name));
            family.name.to_string()
        });

        let domain_focus: Vec<String> = DOMAINS
            .iter()
            .filter(|family| family.matches(&text))
            .map(|family| family.name.to_string())
            .collect();
        if !domain_focus.is_empty() {
            confidence += DOMAIN_BONUS;
            reasoning.push(format!("Domain focus: {}", domain_focus.join(", ")));
        }

        let query_type = match detected_type {
            Some(name) => name,
            None => {
                let inferred = query_type_for_intent(task_intent.unwrap_or_default());
                confidence += INFERRED_TYPE_BONUS;
                reasoning.push(format!(
                    "No query type pattern matched; inferred '{}' from task intent",
                    inferred
                ));
                inferred
            }
        };

        let task_intent = task_intent.unwrap_or_else(|| {
            reasoning.push(format!(
                "No task intent detected; defaulting to '{}'",
                DEFAULT_TASK_INTENT
            ));
            DEFAULT_TASK_INTENT
        });

        AnalyzedIntent {
            query_type: query_type.to_string(),
            task_intent: task_intent.to_string(),
            scope,
            complexity,
            output_format,
            domain_focus,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning,
        }
    }
}

impl From<&AnalyzedIntent> for QueryParams {
    fn from(intent: &AnalyzedIntent) -> Self {
        QueryParams {
            query_type: intent.query_type.clone(),
            task_intent: Some(intent.task_intent.clone()),
            scope: intent.scope.clone(),
            complexity: intent.complexity.clone(),
            output_format: intent.output_format.clone(),
            domain_focus: intent.domain_focus.clone(),
            include_sdlc_checks: false,
        }
    }
}
