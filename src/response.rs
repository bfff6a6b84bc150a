//! Standard response envelope: every backend answer is `{ data, error }`.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "none")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

// serde's `default` on Option<T> would require T: Default.
fn none<T>() -> Option<T> {
    None
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            data: Some(data),
            error: None,
        }
    }

    /// Successful call with no payload (e.g. DELETE).
    pub fn empty() -> Self {
        Envelope {
            data: None,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Envelope {
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Error wins over data when a backend sets both.
    pub fn into_result(self) -> Result<Option<T>, String> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.data),
        }
    }
}

/// Outcome of the connectivity check.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        HealthStatus {
            healthy: true,
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        HealthStatus {
            healthy: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn missing_fields_deserialize_as_none() {
        let env: Envelope<Value> = serde_json::from_value(json!({})).expect("deserialize");
        assert_eq!(env, Envelope::empty());
    }

    #[test]
    fn error_wins_over_data() {
        let env: Envelope<Value> =
            serde_json::from_value(json!({"data": [1], "error": "boom"})).expect("deserialize");
        assert_eq!(env.into_result(), Err("boom".to_string()));
    }
}
