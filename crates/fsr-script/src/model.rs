use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use fsr_core::Direction;

/// A declarative test script. Only the boundary fields the engine inspects
/// are typed; anything else in the source document is ignored on parse.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestScript {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub variable: Vec<Variable>,
    #[serde(default)]
    pub fixture: Vec<FixtureDecl>,
    #[serde(default)]
    pub test: Vec<TestCase>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default, rename = "sourceId")]
    pub source_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureDecl {
    pub id: String,
    #[serde(default)]
    pub autocreate: bool,
    /// Accepted on parse because published scripts declare it, but no
    /// delete is ever issued; provisioned fixtures stay on the server.
    #[serde(default)]
    pub autodelete: bool,
    #[serde(default)]
    pub resource: Option<ResourceReference>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceReference {
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Default stop/continue behavior for assertions in this test that do
    /// not carry their own flag.
    #[serde(default, rename = "stopTestOnFail")]
    pub stop_test_on_fail: bool,
    #[serde(default)]
    pub action: Vec<Action>,
}

impl TestCase {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed test)")
    }
}

/// Exactly one of `operation` / `assert` is expected per action; scripts
/// that set both or neither fail validation, not parsing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub operation: Option<Operation>,
    #[serde(default, rename = "assert")]
    pub assertion: Option<Assertion>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, rename = "type")]
    pub method: Option<Coding>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default, rename = "contentType")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub accept: Option<String>,
    #[serde(default, rename = "sourceId")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Operation {
    pub fn method_code(&self) -> Option<&str> {
        self.method.as_ref().map(|c| c.code.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Coding {
    pub code: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Assertion {
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default, rename = "responseCode")]
    pub response_code: Option<String>,
    #[serde(default, rename = "contentType")]
    pub content_type: Option<String>,
    #[serde(default, rename = "validateProfileId")]
    pub validate_profile_id: Option<String>,
    #[serde(default, rename = "stopTestOnFail")]
    pub stop_test_on_fail: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Assertion {
    /// Assertion flag wins; the test-level flag is the fallback.
    pub fn effective_stop_on_fail(&self, test_default: bool) -> bool {
        self.stop_test_on_fail.unwrap_or(test_default)
    }
}

/// Script invariants: fixture ids and variable names unique, every action
/// carries exactly one of operation/assert.
pub fn validate_script(script: &TestScript) -> Result<()> {
    let mut fixture_ids = HashSet::new();
    for f in &script.fixture {
        if !fixture_ids.insert(f.id.as_str()) {
            return Err(anyhow!("duplicate fixture id: {}", f.id));
        }
    }
    let mut variable_names = HashSet::new();
    for v in &script.variable {
        if !variable_names.insert(v.name.as_str()) {
            return Err(anyhow!("duplicate variable name: {}", v.name));
        }
    }
    for (ti, test) in script.test.iter().enumerate() {
        for (ai, action) in test.action.iter().enumerate() {
            match (&action.operation, &action.assertion) {
                (Some(_), None) | (None, Some(_)) => {}
                (Some(_), Some(_)) => {
                    return Err(anyhow!("test {ti} action {ai}: both operation and assert set"));
                }
                (None, None) => {
                    return Err(anyhow!("test {ti} action {ai}: neither operation nor assert set"));
                }
            }
        }
    }
    Ok(())
}
