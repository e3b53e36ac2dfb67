use external_task_dispatcher::models::{VariableValue, Variables};
use proptest::prelude::*;
use serde_json::Value;

/// Strategy for topic names that match neither `Svc-` nor `Msg-`
pub fn unprefixed_topic_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{0,32}".prop_filter("must not carry a task type prefix", |name| {
        !name.starts_with("Svc-") && !name.starts_with("Msg-")
    })
}

/// Strategy for retry counts the engine may report
pub fn prior_retries_strategy() -> impl Strategy<Value = Option<i32>> {
    prop::option::of(0i32..100)
}

/// Strategy for JSON scalars carried as variable values
pub fn scalar_value_strategy() -> impl Strategy<Value = (Value, &'static str)> {
    prop_oneof![
        any::<bool>().prop_map(|b| (Value::Bool(b), "Boolean")),
        any::<i64>().prop_map(|n| (Value::from(n), "Long")),
        "[a-zA-Z0-9 .,!?]{0,64}".prop_map(|s| (Value::String(s), "String")),
        Just((Value::Null, "Null")),
    ]
}

/// Strategy for variable mappings
pub fn variables_strategy() -> impl Strategy<Value = Variables> {
    prop::collection::btree_map("[a-zA-Z_][a-zA-Z0-9_]{0,31}", scalar_value_strategy(), 0..8).prop_map(
        |entries| {
            entries
                .into_iter()
                .map(|(name, (value, value_type))| (name, VariableValue::new(value, value_type)))
                .collect()
        },
    )
}
