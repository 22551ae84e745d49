//! Fixed guidance returned by the SDLC, standards and POC tools.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SdlcPhase {
    pub name: &'static str,
    pub goal: &'static str,
    pub activities: &'static [&'static str],
    pub exit_criteria: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct SdlcGuidance {
    pub methodology: &'static str,
    pub phases: Vec<SdlcPhase>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandardArea {
    pub area: &'static str,
    pub rules: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineeringStandards {
    pub areas: Vec<StandardArea>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PocStep {
    pub step: u8,
    pub title: &'static str,
    pub details: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PocGuide {
    pub purpose: &'static str,
    pub timebox: &'static str,
    pub steps: &'static [PocStep],
    pub deliverables: &'static [&'static str],
    pub anti_patterns: &'static [&'static str],
}

const PHASES: &[SdlcPhase] = &[
    SdlcPhase {
        name: "discovery",
        goal: "Agree on the problem, the users affected and how success is measured",
        activities: &[
            "Write the problem statement and the user outcome",
            "Identify stakeholders and constraints",
            "Capture acceptance criteria as testable statements",
        ],
        exit_criteria: &[
            "Problem statement reviewed by product and engineering",
            "Success metrics defined",
        ],
    },
    SdlcPhase {
        name: "design",
        goal: "Choose an approach and record the decisions that are hard to reverse",
        activities: &[
            "Sketch the architecture and data flow",
            "Threat model anything that handles credentials, payments or personal data",
            "Record decisions as ADRs",
        ],
        exit_criteria: &[
            "Design reviewed by at least one engineer outside the team",
            "Open risks have owners",
        ],
    },
    SdlcPhase {
        name: "implementation",
        goal: "Deliver the change in small, reviewable increments",
        activities: &[
            "Keep pull requests under a day of work",
            "Write tests alongside the code",
            "Put unfinished work behind a feature flag",
        ],
        exit_criteria: &["All changes reviewed and merged", "CI green on main"],
    },
    SdlcPhase {
        name: "testing",
        goal: "Show that the acceptance criteria hold and nothing regressed",
        activities: &[
            "Automate acceptance tests for each criterion",
            "Run exploratory testing on risky flows",
            "Check accessibility and performance budgets",
        ],
        exit_criteria: &[
            "Every acceptance criterion has a passing test",
            "No open severity-1 or severity-2 defects",
        ],
    },
    SdlcPhase {
        name: "release",
        goal: "Ship safely and be able to undo it",
        activities: &[
            "Roll out progressively behind a flag or canary",
            "Prepare the rollback plan before the rollout starts",
            "Publish release notes",
        ],
        exit_criteria: &["Change live for all users", "Rollback plan verified"],
    },
    SdlcPhase {
        name: "operations",
        goal: "Keep the change healthy in production and learn from it",
        activities: &[
            "Add dashboards and alerts for the new behavior",
            "Review success metrics against the discovery targets",
            "Hold a blameless review for any incident",
        ],
        exit_criteria: &["Runbook updated", "Metrics reviewed with stakeholders"],
    },
];

const STANDARDS: &[StandardArea] = &[
    StandardArea {
        area: "code-review",
        rules: &[
            "Every change is reviewed by someone who did not write it",
            "Reviewers check behavior, tests and naming before style",
            "Authors describe what changed and how it was verified",
        ],
    },
    StandardArea {
        area: "testing",
        rules: &[
            "New behavior ships with tests at the lowest level that can cover it",
            "Bug fixes start with a failing test",
            "Tests do not depend on execution order or wall-clock time",
        ],
    },
    StandardArea {
        area: "security",
        rules: &[
            "Secrets never live in source control",
            "Validate all input at trust boundaries",
            "Dependencies are scanned on every build",
        ],
    },
    StandardArea {
        area: "documentation",
        rules: &[
            "Public interfaces are documented where they are defined",
            "Architecture decisions are recorded as ADRs",
            "Runbooks exist for every alert",
        ],
    },
    StandardArea {
        area: "observability",
        rules: &[
            "Log with structure and a request id",
            "Every service exposes a health endpoint",
            "Alerts page on user impact, not on causes",
        ],
    },
];

const POC_STEPS: &[PocStep] = &[
    PocStep {
        step: 1,
        title: "State the hypothesis",
        details: "One sentence naming what must be true for the idea to work",
    },
    PocStep {
        step: 2,
        title: "Define success and failure",
        details: "Measurable criteria agreed before any code is written",
    },
    PocStep {
        step: 3,
        title: "Build the thinnest slice",
        details: "Only the path that tests the hypothesis; stub everything else",
    },
    PocStep {
        step: 4,
        title: "Measure",
        details: "Run against realistic data and record the numbers",
    },
    PocStep {
        step: 5,
        title: "Decide",
        details: "Recommend proceed, pivot or stop, with the evidence",
    },
];

pub fn sdlc_guidance(phase: Option<&str>) -> Option<SdlcGuidance> {
    let phases: Vec<SdlcPhase> = match phase {
        Some(name) => {
            let name = name.trim().to_lowercase();
            let found: Vec<SdlcPhase> = PHASES.iter().filter(|p| p.name == name).cloned().collect();
            if found.is_empty() {
                return None;
            }
            found
        }
        None => PHASES.to_vec(),
    };

    Some(SdlcGuidance {
        methodology: "Iterative delivery with explicit exit criteria per phase",
        phases,
    })
}

pub fn sdlc_phase_names() -> Vec<&'static str> {
    PHASES.iter().map(|p| p.name).collect()
}

pub fn engineering_standards(area: Option<&str>) -> Option<EngineeringStandards> {
    let areas: Vec<StandardArea> = match area {
        Some(name) => {
            let name = name.trim().to_lowercase();
            let found: Vec<StandardArea> =
                STANDARDS.iter().filter(|a| a.area == name).cloned().collect();
            if found.is_empty() {
                return None;
            }
            found
        }
        None => STANDARDS.to_vec(),
    };
    Some(EngineeringStandards { areas })
}

pub fn standard_area_names() -> Vec<&'static str> {
    STANDARDS.iter().map(|a| a.area).collect()
}

pub fn poc_guide() -> PocGuide {
    PocGuide {
        purpose: "Answer one technical or product question with the least code possible",
        timebox: "Two weeks at most; stop early when the question is answered",
        steps: POC_STEPS,
        deliverables: &[
            "A short write-up with the hypothesis, results and recommendation",
            "The code, clearly marked as throwaway",
            "A list of what a production version would need",
        ],
        anti_patterns: &[
            "Polishing the POC into production code",
            "Changing the success criteria after seeing the results",
            "Testing more than one hypothesis at a time",
        ],
    }
}
