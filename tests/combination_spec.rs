use std::sync::Arc;

use speculate2::speculate;
use vishkar_mcp::config::{CombinationCatalog, ConfigLoader};
use vishkar_mcp::models::{Condition, ContextCombination, QueryParams, SelectionSource};
use vishkar_mcp::services::{score, CombinationService};

fn repo_catalog() -> Arc<CombinationCatalog> {
    let loader = ConfigLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/config"));
    loader.load().expect("repository config loads").catalog
}

fn combination(json: &str) -> ContextCombination {
    serde_json::from_str(json).expect("valid combination")
}

speculate! {
    before {
        let service = CombinationService::new(repo_catalog());
    }

    describe "score" {
        before {
            let constrained = combination(r#"{
                "id": "c", "name": "C", "queryType": "security",
                "taskIntent": "review", "scope": "story", "complexity": "critical",
                "baseContexts": []
            }"#);
        }

        it "is zero when the query type differs" {
            let params = QueryParams::new("story")
                .task_intent("review")
                .scope("story")
                .complexity("critical");
            assert_eq!(score(&constrained, &params), 0.0);
        }

        it "is one when every dimension matches" {
            let params = QueryParams::new("security")
                .task_intent("review")
                .scope("story")
                .complexity("critical");
            assert!((score(&constrained, &params) - 1.0).abs() < 1e-9);
        }

        it "gives partial credit when the request omits a dimension" {
            let params = QueryParams::new("security");
            assert!((score(&constrained, &params) - 0.675).abs() < 1e-9);
        }

        it "gives nothing for a mismatched dimension" {
            let params = QueryParams::new("security")
                .task_intent("create")
                .scope("story")
                .complexity("critical");
            assert!((score(&constrained, &params) - 0.75).abs() < 1e-9);
        }
    }

    describe "find_best" {
        it "selects the critical security review for a critical review" {
            let params = QueryParams::new("security")
                .task_intent("review")
                .complexity("critical");

            let best = service.find_best(&params).expect("a combination");
            assert_eq!(best.id, "security-review-critical");
        }

        it "prefers the unconstrained security combination for simple work" {
            let params = QueryParams::new("security").complexity("simple");

            let best = service.find_best(&params).expect("a combination");
            assert_eq!(best.id, "security-general");
        }

        it "falls back to the default combination when nothing scores" {
            let params = QueryParams::new("not-a-type");

            let best = service.find_best(&params).expect("a combination");
            assert_eq!(best.id, service.catalog().default_combination);
        }

        it "covers every allowed query type" {
            let loader = ConfigLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/config"));
            let bundle = loader.load().expect("repository config loads");

            for query_type in &bundle.mappings.allowed_query_types {
                let params = QueryParams::new(query_type.as_str());
                let best = service.find_best(&params).expect("a combination");
                assert_eq!(&best.query_type, query_type);
            }
        }

        it "ranks ties in catalog order" {
            let params = QueryParams::new("security")
                .task_intent("review")
                .complexity("critical");

            let ranked = service.ranked(&params);
            assert_eq!(ranked[0].0.id, "security-review-critical");
            assert_eq!(ranked[1].0.id, "security-general");
            assert_eq!(ranked[0].1, ranked[1].1);
        }
    }

    describe "selection properties" {
        it "returns the same ranking for the same request" {
            let params = QueryParams::new("security")
                .task_intent("review")
                .complexity("critical")
                .domain_focus(["security", "compliance"]);

            let first = service.find_best(&params).map(|c| c.id.clone());
            let second = service.find_best(&params).map(|c| c.id.clone());
            assert_eq!(first, second);

            let ids = |ranked: Vec<(&ContextCombination, f64)>| {
                ranked
                    .into_iter()
                    .map(|(c, s)| (c.id.clone(), s))
                    .collect::<Vec<_>>()
            };
            assert_eq!(ids(service.ranked(&params)), ids(service.ranked(&params)));
        }

        it "never scores lower when a matching dimension is supplied" {
            for combination in &service.catalog().combinations {
                let bare = QueryParams::new(combination.query_type.as_str());
                let baseline = score(combination, &bare);

                let mut full = bare.clone();
                let mut variants = Vec::new();
                if let Some(intent) = &combination.task_intent {
                    variants.push(bare.clone().task_intent(intent.as_str()));
                    full = full.task_intent(intent.as_str());
                }
                if let Some(scope) = &combination.scope {
                    variants.push(bare.clone().scope(scope.as_str()));
                    full = full.scope(scope.as_str());
                }
                if let Some(complexity) = &combination.complexity {
                    variants.push(bare.clone().complexity(complexity.as_str()));
                    full = full.complexity(complexity.as_str());
                }
                variants.push(full);

                for params in variants {
                    assert!(
                        score(combination, &params) >= baseline,
                        "{} scored lower with {:?}",
                        combination.id,
                        params
                    );
                }
            }
        }
    }

    describe "conditional contexts" {
        before {
            let critical = service
                .catalog()
                .get("security-review-critical")
                .expect("combination exists")
                .clone();
        }

        it "adds contexts for matching domains" {
            let params = QueryParams::new("security")
                .domain_focus(["payments", "compliance"]);

            let names: Vec<String> = service
                .all_contexts(&critical, &params)
                .into_iter()
                .map(|s| s.name)
                .collect();
            assert_eq!(
                names,
                vec![
                    "security-fundamentals",
                    "owasp-top-10",
                    "threat-modeling",
                    "compliance-requirements",
                    "payments-security",
                ]
            );
        }

        it "marks each selection with its source" {
            let params = QueryParams::new("security").include_sdlc_checks(true);

            let selected = service.all_contexts(&critical, &params);
            let last = selected.last().expect("contexts selected");
            assert_eq!(last.name, "sdlc-checklist");
            assert_eq!(last.source, SelectionSource::Conditional);
            assert_eq!(selected[0].source, SelectionSource::Base);
        }

        it "matches nothing for an empty request" {
            let params = QueryParams::new("security");
            assert!(service.evaluate_conditional_contexts(&critical, &params).is_empty());
        }
    }

    describe "condition grammar" {
        it "binds and tighter than or" {
            let condition = Condition::parse(
                "complexity === 'critical' || domain_focus.includes('api') && scope === 'story'",
            );

            assert!(condition.evaluate(&QueryParams::new("x").complexity("critical")));
            assert!(!condition.evaluate(&QueryParams::new("x").domain_focus(["api"])));
            assert!(condition.evaluate(&QueryParams::new("x").domain_focus(["api"]).scope("story")));
        }

        it "never matches unsupported fragments" {
            let condition = Condition::parse("(complexity === 'critical')");

            assert!(!condition.evaluate(&QueryParams::new("x").complexity("critical")));
            assert_eq!(condition.unsupported_fragments().len(), 1);
        }

        it "compares booleans" {
            let condition = Condition::parse("include_sdlc_checks === false");
            assert!(condition.evaluate(&QueryParams::new("x")));
        }
    }

    describe "explain" {
        it "names the combination and the request dimensions" {
            let params = QueryParams::new("security")
                .task_intent("review")
                .complexity("critical");
            let best = service.find_best(&params).expect("a combination");

            let lines = service.explain(best, &params);
            assert!(lines[0].contains("security-review-critical"));
            assert!(lines.iter().any(|l| l == "Complexity: critical"));
        }
    }
}
