use mcp_types::JsonrpcMessage;
use serde_json::Value;

pub fn get_schema_validator() -> jsonschema::Validator {
    let schema = schemars::schema_for!(JsonrpcMessage);
    let schema: Value = serde_json::to_value(&schema).expect("Failed to serialize schema");

    jsonschema::validator_for(&schema).expect("Failed to compile JSON schema")
}
