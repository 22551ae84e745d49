use speculate2::speculate;
use vishkar_mcp::services::{FileAgentMatcher, PatternRule, DEFAULT_AGENT};

speculate! {
    before {
        let matcher = FileAgentMatcher::new(DEFAULT_AGENT);
    }

    describe "recommend" {
        it "ranks agents across backend and frontend files" {
            let result = matcher
                .recommend(&["backend/src/api/users.py", "frontend/components/Button.tsx"])
                .expect("paths were given");

            assert_eq!(result.files_analyzed, 2);
            assert_eq!(result.primary_agent, "a-backend-engineer");
            assert_eq!(
                result.agent_ids(),
                vec![
                    "a-backend-engineer",
                    "a-python-developer",
                    "a-frontend-developer",
                    "a-react-developer",
                ]
            );
            assert_eq!(result.recommended_agents[1].match_count, 2);
            assert_eq!(result.recommended_agents[3].match_count, 1);
        }

        it "requires a directory under a double star" {
            let result = matcher.recommend(&["backend/main.py"]).expect("paths were given");

            assert_eq!(result.agent_ids(), vec!["a-python-developer"]);
            assert_eq!(result.matches[0].patterns, vec!["**/*.py"]);
        }

        it "falls back to the default agent for unmatched paths" {
            let result = matcher.recommend(&["notes.txt"]).expect("paths were given");

            assert_eq!(result.primary_agent, DEFAULT_AGENT);
            assert!(result.matches[0].defaulted);
            assert!(result.matches[0].patterns.is_empty());
        }

        it "returns a usage error for no paths" {
            let empty: [&str; 0] = [];
            let err = matcher.recommend(&empty).unwrap_err();

            assert_eq!(err.error, "no file paths provided");
            assert!(err.usage.contains("file_paths"));
        }

        it "ignores blank paths" {
            let err = matcher.recommend(&["", "   "]).unwrap_err();
            assert_eq!(err.error, "no file paths provided");
        }

        it "normalizes windows separators and leading dot segments" {
            let result = matcher
                .recommend(&[r".\backend\app\models.py"])
                .expect("paths were given");

            assert_eq!(result.matches[0].path, "backend/app/models.py");
            assert_eq!(result.primary_agent, "a-backend-engineer");
        }

        it "counts an agent once per matching rule" {
            let result = matcher
                .recommend(&[
                    "services/payments/stripe/charge.py",
                    "services/payments/stripe/refund.py",
                ])
                .expect("paths were given");

            let payments = result
                .recommended_agents
                .iter()
                .find(|r| r.agent_id == "de-payments-expert")
                .expect("payments expert recommended");
            assert_eq!(payments.match_count, 2);
        }
    }

    describe "match_path" {
        it "lists every matching pattern in table order" {
            let m = matcher.match_path("backend/src/api/users.py");

            assert_eq!(
                m.patterns,
                vec!["backend/**/*.py", "backend/**/*", "**/*.py"]
            );
            assert_eq!(
                matcher.match_path("services/api/v1/users.go").patterns,
                vec!["**/api/**/*", "**/*.go"]
            );
        }

        it "matches infrastructure files" {
            assert_eq!(
                matcher.match_path("deploy/Dockerfile").agents,
                vec!["a-devops-engineer"]
            );
            assert!(matcher.match_path("Dockerfile").defaulted);
            assert_eq!(
                matcher.match_path(".github/workflows/ci.yml").agents,
                vec!["a-devops-engineer"]
            );
            assert!(matcher.match_path(".github/workflows/nested/ci.yml").defaulted);
        }

        it "recognizes test files by name" {
            assert!(matcher
                .match_path("web/src/cart.test.ts")
                .agents
                .contains(&"a-qa-engineer".to_string()));
            assert!(matcher
                .match_path("pkg/store_test.go")
                .agents
                .contains(&"a-qa-engineer".to_string()));
        }
    }

    describe "custom rules" {
        it "uses the supplied table and default" {
            let rules = vec![PatternRule::new("lib/*.ex", &["an-elixir-developer"]).unwrap()];
            let custom = FileAgentMatcher::with_rules(rules, "a-generalist");

            assert_eq!(
                custom.recommend(&["lib/app.ex"]).unwrap().primary_agent,
                "an-elixir-developer"
            );
            assert_eq!(
                custom.recommend(&["lib/nested/app.ex"]).unwrap().primary_agent,
                "a-generalist"
            );
        }

        it "treats question marks as any one character" {
            let rule = PatternRule::new("v?.json", &["x"]).unwrap();

            assert!(rule.matches("v1.json"));
            assert!(!rule.matches("v10.json"));
            assert!(rule.matches("v/.json"));
            assert!(PatternRule::new("a?b", &["x"]).unwrap().matches("a/b"));
        }
    }
}
