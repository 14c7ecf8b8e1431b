use serde_json::Value;

use fsr_bundle::id_from_location;
use fsr_core::{AuditLog, EngineError, EngineResult, FixtureEntry, MethodCode, ObservedResponse, ServerId};
use fsr_script::Operation;

use crate::media::expand_media_type;
use crate::transport::{HttpMethod, Transport, WireRequest};

/// Outcome of one executed operation. `created_id` is set only for a
/// successful create.
#[derive(Debug)]
pub struct Executed {
    pub response: ObservedResponse,
    pub created_id: Option<ServerId>,
}

/// Executes one action's operation against the target API. URL and headers
/// derive from the operation's declared resource type and negotiation
/// hints; identity for read/update comes from the resolved fixture entry.
pub struct OperationExecutor<'t> {
    base_url: String,
    transport: &'t dyn Transport,
}

impl<'t> OperationExecutor<'t> {
    pub fn new(base_url: impl Into<String>, transport: &'t dyn Transport) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, transport }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Dispatch one operation. Audit lines are written before and after
    /// the wire call so a truncated log still shows what was attempted.
    pub fn execute(
        &self,
        operation: &Operation,
        resource: Option<&Value>,
        resolved: Option<&FixtureEntry>,
        audit: &mut AuditLog,
    ) -> EngineResult<Executed> {
        let code = operation.method_code().unwrap_or_default();
        let method = MethodCode::parse(code)
            .ok_or_else(|| EngineError::UnsupportedOperation(code.to_string()))?;

        let resource_type = operation
            .resource
            .as_deref()
            .or_else(|| resource.and_then(|r| r.get("resourceType")?.as_str()))
            .ok_or_else(|| EngineError::UnsupportedOperation("operation has no resource type".into()))?
            .to_string();

        let content_type = expand_media_type(operation.content_type.as_deref());
        let accept = expand_media_type(operation.accept.as_deref());

        match method {
            MethodCode::Create => {
                let body = resource
                    .cloned()
                    .ok_or_else(|| EngineError::NotFound("no resource document for create".into()))?;
                let url = format!("{}/{resource_type}", self.base_url);
                let response = self.send(HttpMethod::Post, url, content_type, accept, Some(body), audit)?;
                let created_id = if response.is_success() {
                    Some(self.capture_created_id(&response, audit)?)
                } else {
                    None
                };
                Ok(Executed { response, created_id })
            }
            MethodCode::Read => {
                let id = self.resolve_id(operation, resource, resolved)?;
                let url = format!("{}/{resource_type}/{id}", self.base_url);
                let response = self.send(HttpMethod::Get, url, content_type, accept, None, audit)?;
                Ok(Executed { response, created_id: None })
            }
            MethodCode::Update => {
                let id = self.resolve_id(operation, resource, resolved)?;
                let body = resource
                    .cloned()
                    .ok_or_else(|| EngineError::NotFound("no resource document for update".into()))?;
                let url = format!("{}/{resource_type}/{id}", self.base_url);
                let response = self.send(HttpMethod::Put, url, content_type, accept, Some(body), audit)?;
                Ok(Executed { response, created_id: None })
            }
        }
    }

    /// Identity for read/update: a declared `sourceId` must resolve to a
    /// provisioned fixture; without one, the example document's own `id`
    /// serves. Neither is a hard failure upstream — the runner downgrades
    /// `FixtureUnresolved` to a failed action.
    fn resolve_id(
        &self,
        operation: &Operation,
        resource: Option<&Value>,
        resolved: Option<&FixtureEntry>,
    ) -> EngineResult<String> {
        if let Some(source_id) = operation.source_id.as_deref() {
            let entry = resolved
                .ok_or_else(|| EngineError::FixtureUnresolved(source_id.to_string()))?;
            return entry
                .server_id
                .as_ref()
                .map(|s| s.as_str().to_string())
                .ok_or_else(|| EngineError::FixtureUnresolved(source_id.to_string()));
        }
        resource
            .and_then(|r| r.get("id")?.as_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                EngineError::FixtureUnresolved("operation has no sourceId and resource has no id".into())
            })
    }

    fn send(
        &self,
        method: HttpMethod,
        url: String,
        content_type: String,
        accept: String,
        body: Option<Value>,
        audit: &mut AuditLog,
    ) -> EngineResult<ObservedResponse> {
        audit.event(format!("Executing: {} {url}", method.as_str()));
        let request = WireRequest { method, url, content_type, accept, body };
        let response = self
            .transport
            .send(&request)
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        audit.event(format!("Response: {}", response.status));
        Ok(response)
    }

    /// A created resource's id comes from the response body, or failing
    /// that from the Location header.
    fn capture_created_id(
        &self,
        response: &ObservedResponse,
        audit: &mut AuditLog,
    ) -> EngineResult<ServerId> {
        if let Some(id) = response.body_id() {
            return Ok(ServerId::from_str(id));
        }
        if let Some(id) = response.location.as_deref().and_then(id_from_location) {
            audit.event(format!("ID from Location header: {id}"));
            return Ok(ServerId::from_str(id));
        }
        Err(EngineError::IdentifierNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use fsr_core::{FixtureId, FixtureRegistry, SourceId};
    use fsr_script::Coding;

    use crate::transport::ScriptedTransport;

    fn operation(code: &str, resource: &str) -> Operation {
        Operation {
            method: Some(Coding { code: code.into() }),
            resource: Some(resource.into()),
            content_type: None,
            accept: None,
            source_id: None,
            label: None,
            description: None,
        }
    }

    fn response(status: u16, body: Option<Value>) -> ObservedResponse {
        ObservedResponse { status, content_type: Some("application/fhir+json".into()), location: None, body }
    }

    #[test]
    fn create_posts_to_type_url_and_captures_body_id() {
        let transport = ScriptedTransport::new();
        transport.push_response(response(201, Some(json!({"id": "abc123"}))));
        let executor = OperationExecutor::new("http://fhir.example/base/", &transport);
        let mut audit = AuditLog::buffered();

        let executed = executor
            .execute(
                &operation("create", "Patient"),
                Some(&json!({"resourceType": "Patient"})),
                None,
                &mut audit,
            )
            .unwrap();

        assert_eq!(executed.created_id.unwrap().as_str(), "abc123");
        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://fhir.example/base/Patient");
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].content_type, "application/fhir+json");
        assert!(audit.lines().iter().any(|l| l.contains("POST")));
        assert!(audit.lines().iter().any(|l| l.contains("Response: 201")));
    }

    #[test]
    fn create_falls_back_to_location_header() {
        let transport = ScriptedTransport::new();
        transport.push_response(ObservedResponse {
            status: 201,
            content_type: None,
            location: Some("http://fhir.example/base/Patient/p-77/_history/1".into()),
            body: None,
        });
        let executor = OperationExecutor::new("http://fhir.example/base", &transport);
        let mut audit = AuditLog::buffered();

        let executed = executor
            .execute(&operation("create", "Patient"), Some(&json!({})), None, &mut audit)
            .unwrap();
        assert_eq!(executed.created_id.unwrap().as_str(), "p-77");
    }

    #[test]
    fn create_without_any_id_source_fails() {
        let transport = ScriptedTransport::new();
        transport.push_response(response(201, Some(json!({"resourceType": "Patient"}))));
        let executor = OperationExecutor::new("http://fhir.example/base", &transport);
        let mut audit = AuditLog::buffered();

        let err = executor
            .execute(&operation("create", "Patient"), Some(&json!({})), None, &mut audit)
            .unwrap_err();
        assert!(matches!(err, EngineError::IdentifierNotFound));
    }

    #[test]
    fn failed_create_does_not_capture_an_id() {
        let transport = ScriptedTransport::new();
        transport.push_response(response(500, None));
        let executor = OperationExecutor::new("http://fhir.example/base", &transport);
        let mut audit = AuditLog::buffered();

        let executed = executor
            .execute(&operation("create", "Patient"), Some(&json!({})), None, &mut audit)
            .unwrap();
        assert_eq!(executed.response.status, 500);
        assert!(executed.created_id.is_none());
    }

    #[test]
    fn read_uses_resolved_server_id() {
        let mut registry = FixtureRegistry::new();
        registry
            .register(FixtureId::from_str("f1"), SourceId::from_str("src-1"), "Patient")
            .unwrap();
        registry
            .bind_server_id(&FixtureId::from_str("f1"), ServerId::from_str("srv-42"))
            .unwrap();

        let transport = ScriptedTransport::new();
        transport.push_response(response(200, Some(json!({"resourceType": "Patient", "id": "srv-42"}))));
        let executor = OperationExecutor::new("http://fhir.example/base", &transport);
        let mut audit = AuditLog::buffered();

        let mut op = operation("read", "Patient");
        op.source_id = Some("src-1".into());
        let entry = registry.resolve_by_source_id(&SourceId::from_str("src-1"));
        executor.execute(&op, None, entry, &mut audit).unwrap();

        assert_eq!(transport.requests()[0].url, "http://fhir.example/base/Patient/srv-42");
        assert_eq!(transport.requests()[0].method, HttpMethod::Get);
    }

    #[test]
    fn unresolved_source_id_is_reported_not_sent() {
        let transport = ScriptedTransport::new();
        let executor = OperationExecutor::new("http://fhir.example/base", &transport);
        let mut audit = AuditLog::buffered();

        let mut op = operation("update", "Patient");
        op.source_id = Some("missing".into());
        let err = executor
            .execute(&op, Some(&json!({"id": "x"})), None, &mut audit)
            .unwrap_err();
        assert!(matches!(err, EngineError::FixtureUnresolved(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn update_without_source_id_uses_resource_id() {
        let transport = ScriptedTransport::new();
        transport.push_response(response(200, None));
        let executor = OperationExecutor::new("http://fhir.example/base", &transport);
        let mut audit = AuditLog::buffered();

        executor
            .execute(
                &operation("update", "Patient"),
                Some(&json!({"resourceType": "Patient", "id": "pat-9"})),
                None,
                &mut audit,
            )
            .unwrap();
        assert_eq!(transport.requests()[0].url, "http://fhir.example/base/Patient/pat-9");
        assert_eq!(transport.requests()[0].method, HttpMethod::Put);
    }

    #[test]
    fn unknown_method_code_is_unsupported() {
        let transport = ScriptedTransport::new();
        let executor = OperationExecutor::new("http://fhir.example/base", &transport);
        let mut audit = AuditLog::buffered();

        let err = executor
            .execute(&operation("delete", "Patient"), None, None, &mut audit)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedOperation(code) if code == "delete"));
    }

    #[test]
    fn negotiation_hints_expand_into_headers() {
        let transport = ScriptedTransport::new();
        transport.push_response(response(201, Some(json!({"id": "a"}))));
        let executor = OperationExecutor::new("http://fhir.example/base", &transport);
        let mut audit = AuditLog::buffered();

        let mut op = operation("create", "Patient");
        op.content_type = Some("xml".into());
        op.accept = Some("application/fhir+json".into());
        executor.execute(&op, Some(&json!({})), None, &mut audit).unwrap();

        let req = &transport.requests()[0];
        assert_eq!(req.content_type, "application/fhir+xml");
        assert_eq!(req.accept, "application/fhir+json");
    }
}
