use serde::{Deserialize, Serialize};

/// Operation method codes the engine dispatches on. Anything else in a
/// script is rejected as unsupported at execution time.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MethodCode {
    Create,
    Read,
    Update,
}

impl MethodCode {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "create" => Some(MethodCode::Create),
            "read" => Some(MethodCode::Read),
            "update" => Some(MethodCode::Update),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Response,
    Request,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    Stopped,
}
