use serde::{Deserialize, Serialize};

use crate::model::TestOutcome;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionStatus {
    Passed,
    Failed,
    Skipped,
}

/// Where a per-action record came from. A create is followed by an
/// automatic read-back check, which logs under the same action index;
/// the origin keeps the two records apart.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionOrigin {
    Declared,
    CreateCheck,
}

/// One line of the per-test action log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionRecord {
    pub index: usize,
    pub origin: ActionOrigin,
    pub status: ActionStatus,
    pub detail: String,
}

/// Result of one test within a script.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub name: String,
    pub outcome: TestOutcome,
    pub actions: Vec<ActionRecord>,
}

impl ExecutionResult {
    pub fn passed(&self) -> bool {
        self.outcome == TestOutcome::Passed
    }
}

/// Result of one script run: one entry per declared test, declared order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub script: String,
    pub results: Vec<ExecutionResult>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(ExecutionResult::passed)
    }
}
