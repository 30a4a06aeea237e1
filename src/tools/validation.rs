//! Validate tool call arguments against JSON Schema before execution.

use serde_json::Value;

/// Check tool arguments against the top level of a JSON Schema.
///
/// Covers the object type, required fields, property types and string enums.
/// Returns the first violation as a message suitable for an `output-error`.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    let expects_object = schema.get("type").and_then(Value::as_str) == Some("object");
    let Some(obj) = args.as_object() else {
        if expects_object {
            return Err(format!("expected object arguments, got {}", json_type_name(args)));
        }
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        if let Some(missing) = required
            .iter()
            .filter_map(Value::as_str)
            .find(|name| !obj.contains_key(*name))
        {
            return Err(format!("missing required field '{missing}'"));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, value) in obj {
        let Some(prop_schema) = properties.get(key) else {
            continue;
        };
        if let Some(expected) = prop_schema.get("type").and_then(Value::as_str) {
            if !value_matches_type(value, expected) {
                return Err(format!(
                    "field '{key}' expected type '{expected}', got {}",
                    json_type_name(value)
                ));
            }
        }
        if let Some(allowed) = prop_schema.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                let options = allowed
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(format!("field '{key}' must be one of [{options}], got {value}"));
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::AgentToolParameters;
    use serde_json::json;

    fn fact_schema() -> Value {
        AgentToolParameters::object()
            .string_enum(
                "category",
                "Fact category",
                &["name", "preference", "location", "other"],
                true,
            )
            .string("fact", "The fact", true)
            .build()
            .schema
    }

    #[test]
    fn accepts_well_formed_arguments() {
        let args = json!({ "category": "name", "fact": "Ronny" });
        assert_eq!(validate_arguments(&args, &fact_schema()), Ok(()));
    }

    #[test]
    fn rejects_non_object_arguments() {
        let err = validate_arguments(&json!("Ronny"), &fact_schema()).unwrap_err();
        assert_eq!(err, "expected object arguments, got string");
    }

    #[test]
    fn reports_first_missing_required_field() {
        let err = validate_arguments(&json!({ "category": "name" }), &fact_schema()).unwrap_err();
        assert_eq!(err, "missing required field 'fact'");
    }

    #[test]
    fn rejects_type_mismatch() {
        let schema = AgentToolParameters::object()
            .number("fahrenheit", "Degrees", true)
            .build()
            .schema;

        let err = validate_arguments(&json!({ "fahrenheit": "hot" }), &schema).unwrap_err();

        assert_eq!(err, "field 'fahrenheit' expected type 'number', got string");
    }

    #[test]
    fn rejects_values_outside_the_enum() {
        let args = json!({ "category": "birthday", "fact": "May 1" });

        let err = validate_arguments(&args, &fact_schema()).unwrap_err();

        assert!(err.starts_with("field 'category' must be one of"));
        assert!(err.ends_with("got \"birthday\""));
    }

    #[test]
    fn ignores_unknown_fields_and_untyped_schemas() {
        let args = json!({ "category": "other", "fact": "x", "confidence": 0.9 });
        assert!(validate_arguments(&args, &fact_schema()).is_ok());
        assert!(validate_arguments(&Value::Null, &json!({})).is_ok());
    }
}
