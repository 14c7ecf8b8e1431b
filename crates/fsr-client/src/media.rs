/// Canonical FHIR JSON media type, the default for every request.
pub const FHIR_JSON: &str = "application/fhir+json";
pub const FHIR_XML: &str = "application/fhir+xml";

/// Expand a content negotiation hint. `json`/`xml` short forms become the
/// canonical media types; an absent or empty hint defaults to JSON; any
/// other literal passes through unchanged rather than erroring, so scripts
/// can pin exotic media types verbatim.
pub fn expand_media_type(hint: Option<&str>) -> String {
    let Some(hint) = hint else {
        return FHIR_JSON.to_string();
    };
    let trimmed = hint.trim();
    if trimmed.is_empty() {
        return FHIR_JSON.to_string();
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "json" => FHIR_JSON.to_string(),
        "xml" => FHIR_XML.to_string(),
        _ => trimmed.to_string(),
    }
}
