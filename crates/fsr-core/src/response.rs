use serde_json::Value;

/// The last response observed by a test, in the shape the engine inspects.
/// The body stays an opaque JSON tree; only boundary fields (`id`,
/// `resourceType`) get typed accessors.
#[derive(Clone, Debug)]
pub struct ObservedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Option<Value>,
}

impl ObservedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Media type with any parameters after `;` stripped.
    pub fn media_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
    }

    pub fn body_id(&self) -> Option<&str> {
        self.body.as_ref()?.get("id")?.as_str()
    }

    pub fn body_resource_type(&self) -> Option<&str> {
        self.body.as_ref()?.get("resourceType")?.as_str()
    }
}
