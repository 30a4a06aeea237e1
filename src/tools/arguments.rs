//! Typed access to tool call arguments.

use crate::error::OrchestraError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, OrchestraError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| OrchestraError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get a float argument.
    pub fn get_f64(&self, key: &str) -> Result<f64, OrchestraError> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| OrchestraError::InvalidArgument(format!("Missing number argument: {key}")))
    }

    /// Deserialize the entire arguments into a typed struct.
    ///
    /// Models occasionally send the arguments as a JSON-encoded string; that
    /// form is decoded first, and an empty string counts as `{}`.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, OrchestraError> {
        let value = match &self.value {
            serde_json::Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str::<serde_json::Value>(trimmed).map_err(|e| {
                        OrchestraError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
                    })?
                }
            }
            other => other.clone(),
        };
        serde_json::from_value(value).map_err(|e| {
            OrchestraError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Task {
        task: String,
    }

    #[test]
    fn typed_getters() {
        let args = ToolArguments::new(json!({ "location": "Madrid", "fahrenheit": 72 }));

        assert_eq!(args.get_str("location").unwrap(), "Madrid");
        assert_eq!(args.get_f64("fahrenheit").unwrap(), 72.0);
        assert_eq!(args.get_str_opt("missing"), None);
        assert!(args.get_str("fahrenheit").is_err());
    }

    #[test]
    fn deserialize_accepts_json_encoded_string() {
        let args = ToolArguments::new(json!("{\"task\":\"2+2\"}"));
        let task: Task = args.deserialize().unwrap();
        assert_eq!(task.task, "2+2");
    }

    #[test]
    fn deserialize_reports_shape_errors_as_invalid_argument() {
        let args = ToolArguments::new(json!({ "task": 4 }));
        let err = args.deserialize::<Task>().unwrap_err();
        assert!(matches!(err, OrchestraError::InvalidArgument(_)));
    }
}
