//! JSON-Schema validation wrapper.
//!
//! Delegates to the `jsonschema` crate (draft auto-detected from `$schema`)
//! rather than hand-rolled rules: the schema vocabulary is open-ended and
//! user-authored, so the full grammar must be supported, not a subset.
//! Side-effect-free and deterministic; no I/O.

use serde_json::Value;

use crate::{Error, Result};

/// Check that `document` is itself a well-formed JSON-Schema.
///
/// Run once at definition time so malformed documents are rejected before
/// they can gate any record write.
pub fn check_document(document: &Value) -> Result<()> {
  jsonschema::validator_for(document)
    .map(|_| ())
    .map_err(|e| Error::InvalidSchemaDocument(e.to_string()))
}

/// Validate `payload` against `document`.
///
/// Reports the first violation with its JSON-pointer instance path. The
/// document is expected to have passed [`check_document`] already; a
/// malformed one still fails cleanly here.
pub fn validate(payload: &Value, document: &Value) -> Result<()> {
  let validator = jsonschema::validator_for(document)
    .map_err(|e| Error::InvalidSchemaDocument(e.to_string()))?;

  match validator.iter_errors(payload).next() {
    None => Ok(()),
    Some(violation) => Err(Error::SchemaViolation {
      message: violation.to_string(),
      path:    violation.instance_path.to_string(),
    }),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::Error;

  fn sample_schema() -> serde_json::Value {
    json!({
      "type": "object",
      "required": ["volume_ml"],
      "properties": {
        "volume_ml": { "type": "number" },
        "medium":    { "enum": ["LB", "YPD", "M9"] },
        "lot":       { "type": "string", "pattern": "^[A-Z]{2}-[0-9]+$" }
      }
    })
  }

  #[test]
  fn conforming_payload_passes() {
    let payload = json!({ "volume_ml": 50, "medium": "YPD", "lot": "AB-123" });
    assert!(validate(&payload, &sample_schema()).is_ok());
  }

  #[test]
  fn wrong_type_reports_instance_path() {
    let payload = json!({ "volume_ml": "fifty" });
    let err = validate(&payload, &sample_schema()).unwrap_err();
    match err {
      Error::SchemaViolation { path, .. } => assert_eq!(path, "/volume_ml"),
      other => panic!("expected SchemaViolation, got {other}"),
    }
  }

  #[test]
  fn missing_required_property_fails() {
    let err = validate(&json!({}), &sample_schema()).unwrap_err();
    match err {
      Error::SchemaViolation { message, .. } => {
        assert!(message.contains("volume_ml"));
      }
      other => panic!("expected SchemaViolation, got {other}"),
    }
  }

  #[test]
  fn enum_and_pattern_are_enforced() {
    let schema = sample_schema();
    assert!(validate(&json!({ "volume_ml": 1, "medium": "agar" }), &schema).is_err());
    assert!(validate(&json!({ "volume_ml": 1, "lot": "bad lot" }), &schema).is_err());
  }

  #[test]
  fn nested_object_rules_apply() {
    let schema = json!({
      "type": "object",
      "properties": {
        "replicates": {
          "type": "array",
          "items": { "type": "object", "required": ["well"] }
        }
      }
    });
    let bad = json!({ "replicates": [{ "well": "A1" }, {}] });
    let err = validate(&bad, &schema).unwrap_err();
    match err {
      Error::SchemaViolation { path, .. } => assert_eq!(path, "/replicates/1"),
      other => panic!("expected SchemaViolation, got {other}"),
    }
  }

  #[test]
  fn malformed_document_is_rejected() {
    let bogus = json!({ "type": 17 });
    assert!(matches!(
      check_document(&bogus),
      Err(Error::InvalidSchemaDocument(_))
    ));
  }

  #[test]
  fn validation_has_no_state() {
    // Same inputs, same answer, any number of times.
    let payload = json!({ "volume_ml": 50 });
    let schema = sample_schema();
    for _ in 0..3 {
      assert!(validate(&payload, &schema).is_ok());
    }
  }
}
