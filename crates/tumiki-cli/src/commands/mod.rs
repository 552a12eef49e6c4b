pub mod credential;
pub mod password;
pub mod token;

use serde_json::Value;

/// Repeated `--permission` flags as stored on credentials and tokens:
/// nothing, a single string, or a list.
pub fn permission_value(permissions: &[String]) -> Value {
    match permissions {
        [] => Value::Null,
        [single] => Value::String(single.clone()),
        many => Value::Array(many.iter().cloned().map(Value::String).collect()),
    }
}
