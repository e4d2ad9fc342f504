use agent_knowledge_server::schema::{validate_json, validate_value, SchemaValidationError};
use agent_knowledge_server::tools;
use serde_json::json;

#[test]
fn json_schema_harness_validates_instance() {
    let schema = r#"{
      "$schema": "https://json-schema.org/draft/2020-12/schema",
      "type": "object",
      "required": ["error"],
      "additionalProperties": false,
      "properties": {
        "error": {
          "type": "object",
          "required": ["code", "message"],
          "additionalProperties": false,
          "properties": {
            "code": { "type": "string" },
            "message": { "type": "string", "minLength": 1 }
          }
        }
      }
    }"#;

    let instance = r#"{
      "error": {
        "code": "not_found",
        "message": "Entry does not exist"
      }
    }"#;

    validate_json(schema, instance).expect("schema validation failed");
}

#[test]
fn share_schema_accepts_complete_arguments() {
    let schema = tools::input_schema(tools::SHARE).unwrap();
    let args = json!({
        "agent": "backend-agent",
        "feature": "user-auth",
        "summary": "CREATED POST /login",
        "branch": null,
        "metadata": { "status": 200 }
    });
    validate_value(&schema, &args).expect("share arguments should validate");
}

#[test]
fn share_schema_reports_every_violation() {
    let schema = tools::input_schema(tools::SHARE).unwrap();
    let args = json!({ "agent": 7, "extra": true });

    match validate_value(&schema, &args) {
        Err(SchemaValidationError::ValidationFailed(violations)) => {
            assert!(violations.len() >= 3, "expected several violations, got {violations:?}");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}
