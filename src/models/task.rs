//! Locked task, variables and outcome reports.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Process variables keyed by name
pub type Variables = BTreeMap<String, VariableValue>;

/// A typed process variable.
///
/// The dispatcher never interprets `value`; it is carried verbatim between the
/// engine and the downstream API together with its type metadata. A bare JSON
/// value in place of the `{value, type}` object reads as an untyped variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableValue {
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_info: Option<Map<String, Value>>,
}

impl VariableValue {
    pub fn new(value: Value, value_type: impl Into<String>) -> Self {
        Self {
            value,
            value_type: Some(value_type.into()),
            value_info: None,
        }
    }

    /// Untyped value; the engine infers the type
    pub fn untyped(value: Value) -> Self {
        Self {
            value,
            value_type: None,
            value_info: None,
        }
    }
}

/// Wire forms accepted for a variable
#[derive(Deserialize)]
#[serde(untagged)]
enum VariableRepr {
    Typed(TypedVariable),
    Bare(Value),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TypedVariable {
    value: Value,
    #[serde(rename = "type", default)]
    value_type: Option<String>,
    #[serde(default)]
    value_info: Option<Map<String, Value>>,
}

impl<'de> Deserialize<'de> for VariableValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match VariableRepr::deserialize(deserializer)? {
            VariableRepr::Typed(typed) => Self {
                value: typed.value,
                value_type: typed.value_type,
                value_info: typed.value_info,
            },
            VariableRepr::Bare(value) => Self::untyped(value),
        })
    }
}

/// An external task claimed by this worker through fetch-and-lock.
///
/// Read-only for the whole handling cycle; outcomes are reported by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedTask {
    pub id: String,
    pub topic_name: String,
    #[serde(default, deserialize_with = "deserialize_variables")]
    pub variables: Variables,
    /// Remaining retries as reported by the engine; `None` before the first failure
    #[serde(rename = "retries", default)]
    pub retries_remaining: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_key: Option<String>,
}

impl LockedTask {
    pub fn new(id: impl Into<String>, topic_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic_name: topic_name.into(),
            variables: Variables::new(),
            retries_remaining: None,
            process_instance_id: None,
            activity_id: None,
            business_key: None,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: VariableValue) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_retries(mut self, retries: i32) -> Self {
        self.retries_remaining = Some(retries);
        self
    }
}

/// The engine sends `"variables": null` for tasks without fetched variables
fn deserialize_variables<'de, D>(deserializer: D) -> Result<Variables, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Variables>::deserialize(deserializer)?.unwrap_or_default())
}

/// Sent to the engine to mark a task done and hand its outputs back to the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub worker_id: String,
    pub variables: Variables,
}

/// Sent to the engine when a task could not be handled.
///
/// `retries_remaining == 0` tells the engine to stop dispatching the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub worker_id: String,
    pub error_message: String,
    pub error_details: String,
    #[serde(rename = "retries")]
    pub retries_remaining: i32,
    #[serde(rename = "retryTimeout")]
    pub retry_timeout_ms: i64,
}

/// Entry of the engine's external task query, used for topic discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTaskSummary {
    #[serde(default)]
    pub id: Option<String>,
    pub topic_name: String,
}
