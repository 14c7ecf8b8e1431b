//! Transaction bundle assembly: wrap a batch of resources into one atomic
//! multi-resource submission, with internal cross-references rewritten to a
//! content-addressed form the server can resolve within the submission.

use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Scheme prefix that makes intra-bundle references resolvable without
/// knowing server-assigned ids in advance.
pub const URN_UUID: &str = "urn:uuid:";

/// Rewrite every `reference` field whose value is a plain identifier into
/// the `urn:uuid:` form. Walks an owned copy; values already carrying the
/// scheme pass through untouched, which makes the rewrite idempotent.
pub fn rewrite_references(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                let child = match (&key[..], &child) {
                    ("reference", Value::String(s)) if !s.starts_with(URN_UUID) => {
                        Value::String(format!("{URN_UUID}{s}"))
                    }
                    _ => rewrite_references(child),
                };
                out.insert(key, child);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(rewrite_references).collect()),
        other => other,
    }
}

/// Pair one resource with its synthetic bundle address and a creation
/// directive. A resource without an `id` gets a fresh UUID in the address.
pub fn bundle_entry(resource: Value) -> Value {
    let resource_type = resource
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or("Resource")
        .to_string();
    let resource_id = resource
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    json!({
        "fullUrl": format!("{URN_UUID}{resource_type}/{resource_id}"),
        "resource": resource,
        "request": {
            "method": "POST",
            "url": resource_type
        }
    })
}

/// Assemble the all-or-nothing envelope. Input documents are borrowed and
/// never mutated; the reference rewrite happens on working copies. The
/// builder does not submit and does not retry; both belong to the caller's
/// transport.
pub fn build_transaction_bundle(resources: &[Value]) -> Value {
    let entries: Vec<Value> = resources
        .iter()
        .cloned()
        .map(rewrite_references)
        .map(bundle_entry)
        .collect();

    json!({
        "resourceType": "Bundle",
        "type": "transaction",
        "entry": entries
    })
}

/// Pull the server-assigned ids out of a transaction response, in entry
/// order. Servers answer each entry with a `response.location` of the form
/// `{type}/{id}/_history/{vid}` (absolute or relative); the id is the
/// segment right after the resource type.
pub fn extract_server_ids(response_bundle: &Value) -> Vec<Option<String>> {
    let Some(entries) = response_bundle.get("entry").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| {
            entry
                .get("response")
                .and_then(|r| r.get("location"))
                .and_then(Value::as_str)
                .and_then(id_from_location)
        })
        .collect()
}

/// `Patient/123/_history/1` → `123`. Also accepts a bare `Patient/123`.
pub fn id_from_location(location: &str) -> Option<String> {
    let segments: Vec<&str> = location.trim_end_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if let Some(pos) = segments.iter().rposition(|s| *s == "_history") {
        return segments.get(pos.checked_sub(1)?).map(|s| s.to_string());
    }
    segments.last().map(|s| s.to_string())
}
