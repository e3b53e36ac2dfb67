//! # Request/Response Mappers
//!
//! A mapper translates between a locked task's variables and the request/response
//! shape of the downstream API behind a topic. Topics without a specific mapper use
//! [`IdentityMapper`], which sends the variables as-is and reads them back from the
//! response's `variables` field.

use crate::constants::IDENTITY_MAPPER;
use crate::error::DispatcherResult;
use crate::models::{LockedTask, Variables};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Body returned by the downstream API on success
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub variables: Option<Variables>,
}

/// Per-topic transformer between task variables and a downstream API
pub trait TaskMapper: Send + Sync {
    /// Name used in logs and in the mapper catalog
    fn mapper_name(&self) -> &str;

    /// Serialize the request body sent to the downstream API
    fn build_request_body(&self, task: &LockedTask) -> DispatcherResult<Vec<u8>>;

    /// Extract output variables from a successful downstream response.
    ///
    /// Extraction is best-effort: the HTTP status decides success, so a body that
    /// cannot be read yields no variables instead of an error.
    fn parse_response(&self, body: &[u8]) -> Variables;
}

/// Passes variables through unchanged in both directions
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl TaskMapper for IdentityMapper {
    fn mapper_name(&self) -> &str {
        IDENTITY_MAPPER
    }

    fn build_request_body(&self, task: &LockedTask) -> DispatcherResult<Vec<u8>> {
        Ok(serde_json::to_vec(&task.variables)?)
    }

    fn parse_response(&self, body: &[u8]) -> Variables {
        parse_api_response(body)
    }
}

/// Read the `variables` field of an [`ApiResponse`] body, empty on any problem
pub fn parse_api_response(body: &[u8]) -> Variables {
    if body.iter().all(u8::is_ascii_whitespace) {
        debug!("Downstream response body is empty");
        return Variables::new();
    }

    match serde_json::from_slice::<ApiResponse>(body) {
        Ok(response) => {
            let variables = response.variables.unwrap_or_default();
            for (name, value) in &variables {
                debug!(variable = %name, value = ?value, "Received variable");
            }
            variables
        }
        Err(e) => {
            warn!(error = %e, "Downstream response could not be parsed; completing without output variables");
            Variables::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VariableValue;
    use serde_json::json;

    #[test]
    fn request_body_is_the_variable_mapping() {
        let task = LockedTask::new("T1", "Svc-Quote")
            .with_variable("amount", VariableValue::new(json!(100), "Integer"));

        let body = IdentityMapper.build_request_body(&task).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value, json!({"amount": {"value": 100, "type": "Integer"}}));
    }

    #[test]
    fn response_variables_are_extracted() {
        let body = br#"{"taskId":"T1","variables":{"approved":{"value":true,"type":"Boolean"}}}"#;

        let variables = IdentityMapper.parse_response(body);

        assert_eq!(variables.len(), 1);
        assert_eq!(variables["approved"].value, json!(true));
    }

    #[test]
    fn bare_and_typed_response_variables_are_both_kept() {
        let body = br#"{"variables":{"a":{"value":1,"type":"Integer"},"b":true}}"#;

        let variables = IdentityMapper.parse_response(body);

        assert_eq!(variables["a"], VariableValue::new(json!(1), "Integer"));
        assert_eq!(variables["b"], VariableValue::untyped(json!(true)));
    }

    #[test]
    fn missing_variables_yield_empty_mapping() {
        assert!(IdentityMapper.parse_response(br#"{"taskId":"T1"}"#).is_empty());
        assert!(IdentityMapper.parse_response(br#"{"variables":null}"#).is_empty());
    }

    #[test]
    fn malformed_or_empty_bodies_yield_empty_mapping() {
        assert!(IdentityMapper.parse_response(b"").is_empty());
        assert!(IdentityMapper.parse_response(b"  \n").is_empty());
        assert!(IdentityMapper.parse_response(b"<html>oops</html>").is_empty());
        assert!(IdentityMapper.parse_response(br#"{"variables": 42}"#).is_empty());
    }
}
