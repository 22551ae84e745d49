//! Combination selection.
//!
//! A combination's score for a request is the sum of four weights:
//!
//! | dimension     | weight | combination unconstrained | request omits it |
//! |---------------|--------|---------------------------|------------------|
//! | `query_type`  | 0.40   | n/a (always constrained)  | n/a (required)   |
//! | `task_intent` | 0.25   | 0.25                      | 0.10             |
//! | `scope`       | 0.20   | 0.20                      | 0.10             |
//! | `complexity`  | 0.15   | 0.15                      | 0.075            |
//!
//! A query type mismatch scores exactly zero regardless of the rest, and a
//! mismatch on any other constrained dimension contributes nothing.

use std::sync::Arc;

use crate::config::CombinationCatalog;
use crate::models::{
    ContextCombination, MatchedCondition, QueryParams, SelectedContext, SelectionSource,
};

const QUERY_TYPE_WEIGHT: f64 = 0.40;

/// Weight of an optional dimension and the partial credit given when the
/// request does not say.
struct Dimension {
    full: f64,
    partial: f64,
}

const TASK_INTENT: Dimension = Dimension {
    full: 0.25,
    partial: 0.10,
};
const SCOPE: Dimension = Dimension {
    full: 0.20,
    partial: 0.10,
};
const COMPLEXITY: Dimension = Dimension {
    full: 0.15,
    partial: 0.075,
};

fn dimension_score(dim: &Dimension, wanted: Option<&str>, given: Option<&str>) -> f64 {
    match (wanted, given) {
        (None, _) => dim.full,
        (Some(_), None) => dim.partial,
        (Some(w), Some(g)) if w == g => dim.full,
        _ => 0.0,
    }
}

/// Score one combination against a request.
pub fn score(combination: &ContextCombination, params: &QueryParams) -> f64 {
    if combination.query_type != params.query_type {
        return 0.0;
    }

    QUERY_TYPE_WEIGHT
        + dimension_score(
            &TASK_INTENT,
            combination.task_intent.as_deref(),
            params.task_intent.as_deref(),
        )
        + dimension_score(
            &SCOPE,
            combination.scope.as_deref(),
            params.scope.as_deref(),
        )
        + dimension_score(
            &COMPLEXITY,
            combination.complexity.as_deref(),
            params.complexity.as_deref(),
        )
}

/// Selects combinations from a catalog and resolves their conditional rules.
#[derive(Debug, Clone)]
pub struct CombinationService {
    catalog: Arc<CombinationCatalog>,
}

impl CombinationService {
    pub fn new(catalog: Arc<CombinationCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CombinationCatalog {
        &self.catalog
    }

    /// Every combination with its score, best first. Ties keep catalog order.
    pub fn ranked(&self, params: &QueryParams) -> Vec<(&ContextCombination, f64)> {
        let mut scored: Vec<_> = self
            .catalog
            .combinations
            .iter()
            .map(|c| (c, score(c, params)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
    }

    /// The best-scoring combination, or the catalog default when nothing
    /// scores above zero. `None` only if the default is missing.
    pub fn find_best(&self, params: &QueryParams) -> Option<&ContextCombination> {
        match self.ranked(params).first() {
            Some((best, s)) if *s > 0.0 => {
                tracing::debug!(
                    "Selected combination '{}' (score {:.3}) for query type '{}'",
                    best.id,
                    s,
                    params.query_type
                );
                Some(*best)
            }
            _ => {
                tracing::debug!(
                    "No combination matched query type '{}', using default '{}'",
                    params.query_type,
                    self.catalog.default_combination
                );
                self.catalog.default_combination()
            }
        }
    }

    /// Conditional rules of `combination` that hold for `params`, in catalog
    /// order.
    pub fn evaluate_conditional_contexts(
        &self,
        combination: &ContextCombination,
        params: &QueryParams,
    ) -> Vec<MatchedCondition> {
        combination
            .conditional_contexts
            .iter()
            .filter(|rule| rule.condition.evaluate(params))
            .map(|rule| MatchedCondition {
                condition: rule.condition.source().to_string(),
                contexts: rule.contexts.clone(),
                reason: rule.reason.clone(),
            })
            .collect()
    }

    /// Base contexts followed by matched conditional contexts.
    ///
    /// Names are not deduplicated here.
    pub fn all_contexts(
        &self,
        combination: &ContextCombination,
        params: &QueryParams,
    ) -> Vec<SelectedContext> {
        let base_reason = format!("required for {}", combination.name);
        let base = combination.base_contexts.iter().map(|name| SelectedContext {
            name: name.clone(),
            source: SelectionSource::Base,
            reason: base_reason.clone(),
        });

        let conditional = self
            .evaluate_conditional_contexts(combination, params)
            .into_iter()
            .flat_map(|rule| {
                let reason = rule.reason;
                rule.contexts
                    .into_iter()
                    .map(move |name| SelectedContext {
                        name,
                        source: SelectionSource::Conditional,
                        reason: reason.clone(),
                    })
            });

        base.chain(conditional).collect()
    }

    /// Human-readable account of why `combination` was chosen.
    pub fn explain(&self, combination: &ContextCombination, params: &QueryParams) -> Vec<String> {
        let mut lines = vec![
            format!("Selected combination: {} ({})", combination.name, combination.id),
            format!("Description: {}", combination.description),
            format!("Query type: {}", params.query_type),
        ];

        if let Some(intent) = &params.task_intent {
            lines.push(format!("Task intent: {}", intent));
        }
        if let Some(scope) = &params.scope {
            lines.push(format!("Scope: {}", scope));
        }
        if let Some(complexity) = &params.complexity {
            lines.push(format!("Complexity: {}", complexity));
        }
        if let Some(format) = &params.output_format {
            lines.push(format!("Output format: {}", format));
        }
        if !params.domain_focus.is_empty() {
            lines.push(format!("Domain focus: {}", params.domain_focus.join(", ")));
        }
        if params.include_sdlc_checks {
            lines.push("SDLC checks requested".to_string());
        }

        for rule in self.evaluate_conditional_contexts(combination, params) {
            lines.push(format!(
                "Added {} because {} ({})",
                rule.contexts.join(", "),
                rule.reason,
                rule.condition
            ));
        }

        lines
    }
}
