use serde_json::Value;

use fsr_assert::AssertionEvaluator;
use fsr_bundle::{build_transaction_bundle, extract_server_ids};
use fsr_client::{expand_media_type, HttpMethod, OperationExecutor, Transport, WireRequest};
use fsr_core::{
    ActionOrigin, ActionRecord, ActionStatus, EngineError, ExecutionResult, FixtureEntry,
    FixtureId, RunSummary, ServerId, SourceId, TestOutcome,
};
use fsr_script::{Operation, ProfileCatalog, ScriptDocuments, TestCase, TestScript};

use crate::context::RunContext;

/// Orchestrates one script: provisions fixtures, then walks each test's
/// actions in order, alternating operation execution and assertion
/// evaluation with per-assertion continue/stop semantics.
pub struct ScriptRunner<'a> {
    base_url: String,
    transport: &'a dyn Transport,
    catalog: &'a ProfileCatalog,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(base_url: impl Into<String>, transport: &'a dyn Transport, catalog: &'a ProfileCatalog) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, transport, catalog }
    }

    pub fn run(
        &self,
        script_name: &str,
        script: &TestScript,
        docs: &ScriptDocuments,
        ctx: &mut RunContext,
    ) -> RunSummary {
        ctx.audit
            .event(format!("=========== Starting Testscript: {script_name} ==========="));

        self.register_fixtures(script, docs, ctx);
        self.provision_fixtures(script, docs, ctx);

        let executor = OperationExecutor::new(self.base_url.clone(), self.transport);
        let evaluator = AssertionEvaluator::new(self.catalog);

        let mut results = Vec::with_capacity(script.test.len());
        for test in &script.test {
            let result = self.run_test(test, script, docs, &executor, &evaluator, ctx);
            ctx.audit
                .event(format!("Test '{}': {:?}", result.name, result.outcome));
            results.push(result);
        }

        let summary = RunSummary { script: script_name.to_string(), results };
        let passed = summary.results.iter().filter(|r| r.passed()).count();
        ctx.audit
            .event(format!("Run complete: {passed}/{} passed", summary.results.len()));
        ctx.finish();
        summary
    }

    /// Pre-populate the registry with every declared fixture that has a
    /// loadable example document.
    fn register_fixtures(&self, script: &TestScript, docs: &ScriptDocuments, ctx: &mut RunContext) {
        for fixture in &script.fixture {
            let Some(source_id) = docs.source_id_for_fixture(&fixture.id) else {
                continue;
            };
            let resource_kind = docs
                .documents
                .get(source_id)
                .and_then(|d| d.get("resourceType"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if let Err(e) = ctx.registry.register(
                FixtureId::from_str(fixture.id.clone()),
                SourceId::from_str(source_id),
                resource_kind,
            ) {
                ctx.audit.event(format!("fixture registration failed: {e}"));
            }
        }
    }

    /// Provision every autocreate fixture in one atomic transaction bundle.
    /// A failed submission leaves all fixtures unbound; dependent actions
    /// later surface as unresolved rather than aborting the script.
    fn provision_fixtures(&self, script: &TestScript, docs: &ScriptDocuments, ctx: &mut RunContext) {
        let mut fixture_ids = Vec::new();
        let mut resources = Vec::new();
        for fixture in &script.fixture {
            if !fixture.autocreate {
                continue;
            }
            let Some(source_id) = docs.source_id_for_fixture(&fixture.id) else {
                continue;
            };
            if let Some(doc) = docs.documents.get(source_id) {
                fixture_ids.push(FixtureId::from_str(fixture.id.clone()));
                resources.push(doc.clone());
            }
        }
        if resources.is_empty() {
            return;
        }

        let bundle = build_transaction_bundle(&resources);
        ctx.audit
            .event(format!("Provisioning {} fixture(s) via transaction bundle", resources.len()));
        let request = WireRequest {
            method: HttpMethod::Post,
            url: self.base_url.clone(),
            content_type: expand_media_type(None),
            accept: expand_media_type(None),
            body: Some(bundle),
        };
        let response = match self.transport.send(&request) {
            Ok(r) => r,
            Err(e) => {
                ctx.audit.event(format!("Provisioning failed: {e}"));
                return;
            }
        };
        ctx.audit.event(format!("Provisioning response: {}", response.status));
        if !response.is_success() {
            return;
        }
        let Some(body) = &response.body else {
            ctx.audit.event("Provisioning response had no JSON body".to_string());
            return;
        };

        // ids come back in entry order, matching the submission order
        for (fixture_id, server_id) in fixture_ids.iter().zip(extract_server_ids(body)) {
            let Some(server_id) = server_id else {
                ctx.audit
                    .event(format!("No server id for fixture {}", fixture_id.as_str()));
                continue;
            };
            ctx.audit
                .event(format!("Fixture {} bound to server id {server_id}", fixture_id.as_str()));
            if let Err(e) = ctx.registry.bind_server_id(fixture_id, ServerId::from_str(server_id)) {
                ctx.audit.event(format!("bind failed: {e}"));
            }
        }
    }

    fn run_test(
        &self,
        test: &TestCase,
        script: &TestScript,
        docs: &ScriptDocuments,
        executor: &OperationExecutor<'_>,
        evaluator: &AssertionEvaluator<'_>,
        ctx: &mut RunContext,
    ) -> ExecutionResult {
        ctx.audit.event(format!("Test: {}", test.display_name()));
        ctx.last_response = None;
        ctx.last_created_id = None;

        let mut actions = Vec::with_capacity(test.action.len());
        let mut any_failure = false;
        let mut stopped = false;

        for (index, action) in test.action.iter().enumerate() {
            if let Some(operation) = &action.operation {
                match self.run_operation(operation, script, docs, executor, ctx) {
                    Ok(detail) => {
                        actions.push(ActionRecord {
                            index,
                            origin: ActionOrigin::Declared,
                            status: ActionStatus::Passed,
                            detail,
                        });
                        // a successful create gets an automatic verification read
                        if let Some(created) = ctx.last_created_id.clone() {
                            if let Err(detail) = self.verify_created(operation, &created, executor, ctx) {
                                ctx.audit.event(format!("Create verification failed: {detail}"));
                                actions.push(ActionRecord {
                                    index,
                                    origin: ActionOrigin::CreateCheck,
                                    status: ActionStatus::Failed,
                                    detail,
                                });
                                if test.stop_test_on_fail {
                                    stopped = true;
                                    break;
                                }
                                any_failure = true;
                            }
                        }
                    }
                    Err(e) => {
                        ctx.audit.event(format!("Operation failed: {e}"));
                        actions.push(ActionRecord {
                            index,
                            origin: ActionOrigin::Declared,
                            status: ActionStatus::Failed,
                            detail: e.to_string(),
                        });
                        ctx.last_response = None;
                        any_failure = true;
                    }
                }
            } else if let Some(assertion) = &action.assertion {
                match evaluator.evaluate(assertion, ctx.last_response.as_ref(), &mut ctx.audit) {
                    Ok(kind) => {
                        actions.push(ActionRecord {
                            index,
                            origin: ActionOrigin::Declared,
                            status: ActionStatus::Passed,
                            detail: format!("{kind:?}"),
                        });
                    }
                    Err(e) => {
                        let detail = e.to_string();
                        ctx.audit.event(format!("FAILED: {detail}"));
                        actions.push(ActionRecord {
                            index,
                            origin: ActionOrigin::Declared,
                            status: ActionStatus::Failed,
                            detail,
                        });
                        if assertion.effective_stop_on_fail(test.stop_test_on_fail) {
                            stopped = true;
                            break;
                        }
                        any_failure = true;
                    }
                }
            }
        }

        let outcome = if stopped {
            TestOutcome::Stopped
        } else if any_failure {
            TestOutcome::Failed
        } else {
            TestOutcome::Passed
        };

        ExecutionResult {
            name: test.display_name().to_string(),
            outcome,
            actions,
        }
    }

    fn run_operation(
        &self,
        operation: &Operation,
        script: &TestScript,
        docs: &ScriptDocuments,
        executor: &OperationExecutor<'_>,
        ctx: &mut RunContext,
    ) -> Result<String, EngineError> {
        let resolved = match operation.source_id.as_deref() {
            Some(sid) => resolve_source(script, sid, ctx),
            None => None,
        };
        let resolved_source = resolved.map(|e| e.source_id.0.clone());
        let resource = resource_for(resolved_source.as_deref(), docs);

        let entry = resolved.cloned();
        let executed = executor.execute(operation, resource.as_ref(), entry.as_ref(), &mut ctx.audit)?;

        let detail = format!(
            "{} {} -> {}",
            operation.method_code().unwrap_or("?"),
            operation.resource.as_deref().unwrap_or("?"),
            executed.response.status
        );
        ctx.last_created_id = executed.created_id;
        ctx.last_response = Some(executed.response);
        Ok(detail)
    }

    /// Read the resource a create just produced and compare identity. A
    /// mismatch (or a non-JSON body) counts as an assertion failure.
    fn verify_created(
        &self,
        operation: &Operation,
        created_id: &ServerId,
        executor: &OperationExecutor<'_>,
        ctx: &mut RunContext,
    ) -> Result<(), String> {
        let resource_type = operation
            .resource
            .clone()
            .or_else(|| {
                ctx.last_response
                    .as_ref()
                    .and_then(|r| r.body_resource_type().map(str::to_owned))
            })
            .ok_or_else(|| "create verification: unknown resource type".to_string())?;

        let url = format!("{}/{resource_type}/{}", executor.base_url(), created_id.as_str());
        ctx.audit.event(format!("Verifying created resource via GET: {url}"));
        let request = WireRequest {
            method: HttpMethod::Get,
            url,
            content_type: expand_media_type(None),
            accept: expand_media_type(None),
            body: None,
        };
        let response = self
            .transport
            .send(&request)
            .map_err(|e| format!("create verification transport failure: {e}"))?;
        ctx.audit.event(format!("Response: {}", response.status));

        if response.body.is_none() {
            return Err("create verification response is not valid JSON".into());
        }
        if response.body_id() != Some(created_id.as_str()) {
            return Err(format!(
                "create verification returned id {:?}, expected {}",
                response.body_id(),
                created_id.as_str()
            ));
        }
        if response.body_resource_type() != Some(resource_type.as_str()) {
            return Err(format!(
                "create verification returned resourceType {:?}, expected {resource_type}",
                response.body_resource_type()
            ));
        }
        Ok(())
    }
}

/// The example document an operation works on: the resolved fixture's
/// document when identity is declared, otherwise the script's single
/// document if there is exactly one.
fn resource_for(resolved_source: Option<&str>, docs: &ScriptDocuments) -> Option<Value> {
    if let Some(source_id) = resolved_source {
        return docs.documents.get(source_id).cloned();
    }
    if docs.documents.len() == 1 {
        return docs.documents.values().next().cloned();
    }
    None
}

/// Resolve an operation's `sourceId` to a fixture entry. The id may name a
/// variable, which indirects to its own `sourceId`; that in turn may match
/// either a fixture id or an example-document source id.
fn resolve_source<'r>(script: &TestScript, source_id: &str, ctx: &'r RunContext) -> Option<&'r FixtureEntry> {
    let target = script
        .variable
        .iter()
        .find(|v| v.name == source_id)
        .and_then(|v| v.source_id.as_deref())
        .unwrap_or(source_id);
    ctx.registry
        .get(&FixtureId::from_str(target))
        .or_else(|| ctx.registry.resolve_by_source_id(&SourceId::from_str(target)))
}
