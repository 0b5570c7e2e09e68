//! JSON schema for the recipe draft.
//!
//! The schema is derived from the serialized shape of [`Draft`] rather than
//! written by hand, so adding a field to the draft changes what the model is
//! asked for. Strict structured output requires every property to be listed
//! in `required` and `additionalProperties` to be false.

use crate::error::ExtractionError;
use crate::model::Draft;
use serde_json::{json, Map, Value};

/// Name the schema is registered under in the request.
pub const SCHEMA_NAME: &str = "recipe";

pub fn draft_schema() -> Result<Value, ExtractionError> {
    let sample = serde_json::to_value(Draft::default())
        .map_err(|e| ExtractionError::Schema(e.to_string()))?;

    let fields = sample
        .as_object()
        .ok_or_else(|| ExtractionError::Schema("draft does not serialize to an object".into()))?;

    let mut properties = Map::new();
    for (name, value) in fields {
        properties.insert(name.clone(), property_schema(name, value)?);
    }
    let required: Vec<&String> = fields.keys().collect();

    Ok(json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    }))
}

// Lists in the draft only ever hold strings.
fn property_schema(name: &str, value: &Value) -> Result<Value, ExtractionError> {
    match value {
        Value::String(_) => Ok(json!({ "type": "string" })),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(json!({ "type": "integer" })),
        Value::Number(_) => Ok(json!({ "type": "number" })),
        Value::Array(_) => Ok(json!({ "type": "array", "items": { "type": "string" } })),
        other => Err(ExtractionError::Schema(format!(
            "unsupported type for draft field '{}': {}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_every_draft_field() {
        let schema = draft_schema().unwrap();
        let properties = schema["properties"].as_object().unwrap();

        for key in ["title", "ingredients", "directions", "prepTime", "cookTime", "servings"] {
            assert!(properties.contains_key(key), "missing property {}", key);
        }
        assert_eq!(properties.len(), 6);

        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), properties.len());
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn test_schema_types() {
        let schema = draft_schema().unwrap();
        let properties = &schema["properties"];

        assert_eq!(properties["title"]["type"], "string");
        assert_eq!(properties["prepTime"]["type"], "string");
        assert_eq!(properties["servings"]["type"], "integer");
        assert_eq!(properties["ingredients"]["type"], "array");
        assert_eq!(properties["directions"]["items"]["type"], "string");
    }

    #[test]
    fn test_unsupported_field_type_is_a_schema_error() {
        let result = property_schema("flag", &json!(true));
        assert!(matches!(result, Err(ExtractionError::Schema(_))));
    }
}
