//! Assertion evaluation against the last observed response.
//!
//! Checks run in a fixed precedence: profile existence, then content type,
//! then response code — the response-code check only when no content-type
//! check was performed. A `request`-direction assertion is out of scope and
//! passes trivially.

use fsr_client::expand_media_type;
use fsr_core::{AuditLog, Direction, EngineError, EngineResult, ObservedResponse};
use fsr_script::{Assertion, ProfileCatalog};

/// What the evaluator actually checked, for the action log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckKind {
    RequestOutOfScope,
    Profile,
    ContentType,
    ResponseCode,
    Nothing,
}

pub struct AssertionEvaluator<'c> {
    catalog: &'c ProfileCatalog,
}

impl<'c> AssertionEvaluator<'c> {
    pub fn new(catalog: &'c ProfileCatalog) -> Self {
        Self { catalog }
    }

    /// Evaluate one assertion. Failure is `AssertionFailed(detail)`; whether
    /// that stops the test is the runner's decision, not ours.
    pub fn evaluate(
        &self,
        assertion: &Assertion,
        response: Option<&ObservedResponse>,
        audit: &mut AuditLog,
    ) -> EngineResult<CheckKind> {
        if assertion.direction == Some(Direction::Request) {
            audit.event("direction request out of scope");
            return Ok(CheckKind::RequestOutOfScope);
        }

        let mut checked = CheckKind::Nothing;

        if let Some(profile_id) = assertion.validate_profile_id.as_deref() {
            self.check_profile(profile_id, audit)?;
            checked = CheckKind::Profile;
        }

        if let Some(expected) = assertion.content_type.as_deref() {
            self.check_content_type(expected, response, audit)?;
            return Ok(CheckKind::ContentType);
        }

        if let Some(expected) = assertion.response_code.as_deref() {
            self.check_response_code(expected, response, audit)?;
            return Ok(CheckKind::ResponseCode);
        }

        Ok(checked)
    }

    fn check_profile(&self, profile_id: &str, audit: &mut AuditLog) -> EngineResult<()> {
        let available = self.catalog.ids();
        audit.event(format!("Asserting profile id '{profile_id}' in {available:?}"));
        if self.catalog.contains(profile_id) {
            Ok(())
        } else {
            Err(EngineError::AssertionFailed(format!(
                "profile id '{profile_id}' not found in loaded profiles (available: {available:?})"
            )))
        }
    }

    fn check_content_type(
        &self,
        expected: &str,
        response: Option<&ObservedResponse>,
        audit: &mut AuditLog,
    ) -> EngineResult<()> {
        let response = required_response(response)?;
        let expected = expand_media_type(Some(expected));
        let actual = response.media_type().unwrap_or_default();
        audit.event(format!("Checking Content-Type: expected '{expected}', got '{actual}'"));
        if actual == expected {
            Ok(())
        } else {
            Err(EngineError::AssertionFailed(format!(
                "content-type mismatch: got '{actual}', expected '{expected}'"
            )))
        }
    }

    fn check_response_code(
        &self,
        expected: &str,
        response: Option<&ObservedResponse>,
        audit: &mut AuditLog,
    ) -> EngineResult<()> {
        let response = required_response(response)?;
        let expected_codes: Vec<&str> = expected.split(',').map(str::trim).collect();
        let status = response.status.to_string();
        audit.event(format!("Asserting response code {status} in {expected_codes:?}"));
        if expected_codes.iter().any(|c| *c == status) {
            Ok(())
        } else {
            Err(EngineError::AssertionFailed(format!(
                "response code {status} not in {expected_codes:?}"
            )))
        }
    }
}

fn required_response(response: Option<&ObservedResponse>) -> EngineResult<&ObservedResponse> {
    response.ok_or_else(|| EngineError::AssertionFailed("no response observed before assertion".into()))
}
