//! `GET /api/data`: the reference data the recording form loads on start.
//!
//! The aggregate is expensive (two full collection scans plus one read per
//! listed user) and changes rarely, so it is served through the read-through
//! cache under `app-data:<YYYY-MM>`.

use axum::extract::State;
use serde_json::{Map, Value, json};
use tumiki_api::{ApiResult, Success};
use tumiki_auth::BearerAuth;
use tumiki_core::month_key;
use tumiki_storage::{Key, Record, StorageResult, Table, value_to_key_string};

use super::is_truthy;
use crate::cache::{CacheTtl, cache_key};
use crate::state::AppState;

const SUPPORT_KINDS: [&str; 3] = ["behaviorSupport", "mobilitySupport", "hospitalSupport"];

pub async fn get_data(
    State(state): State<AppState>,
    BearerAuth(_claims): BearerAuth,
) -> ApiResult<Success<Value>> {
    let month = month_key(state.clock.now());
    let key = cache_key("app-data", &[month.as_str()]);
    let ttl = state.cache.ttl(CacheTtl::Medium);

    let data = state
        .cache
        .get_or_load(&key, ttl, || load_app_data(&state, &month))
        .await?;
    Ok(Success(data))
}

async fn load_app_data(state: &AppState, month: &str) -> StorageResult<Value> {
    tracing::info!(month, "loading app data from the document store");

    let users: Vec<Record> = state
        .storage
        .scan(Table::Users, &[])
        .await?
        .into_iter()
        .filter(has_available_time)
        .collect();

    let affiliation = state.config.data.supporter_affiliation.as_str();
    let mut supporters: Vec<String> = state
        .storage
        .scan(Table::Employees, &[])
        .await?
        .into_iter()
        .filter(|emp| emp.get("affiliation").and_then(Value::as_str) == Some(affiliation))
        .filter_map(|emp| emp.get("name").and_then(Value::as_str).map(str::to_string))
        .collect();
    supporters.sort();

    let mut monthly_hours = Map::new();
    for user in &users {
        let Some(user_id) = user.get("id").and_then(value_to_key_string) else {
            continue;
        };
        let doc_id = format!("user_{user_id}_{month}");
        if let Some(hours) = state
            .storage
            .get(Table::MonthlyHours, &Key::id(doc_id))
            .await?
        {
            monthly_hours.insert(user_id, monthly_entry(&hours));
        }
    }

    tracing::info!(
        users = users.len(),
        supporters = supporters.len(),
        "app data loaded"
    );

    Ok(json!({
        "users": users,
        "supporters": supporters,
        "supportTypes": state.config.data.support_types,
        "appearances": state.config.data.appearances,
        "monthlyHours": monthly_hours,
    }))
}

/// A user is listed when any support kind has a non-empty `availableTime`.
fn has_available_time(user: &Record) -> bool {
    SUPPORT_KINDS
        .iter()
        .any(|kind| is_truthy(user.get(*kind).and_then(|s| s.get("availableTime"))))
}

fn monthly_entry(hours: &Record) -> Value {
    let mut entry = Map::new();
    for kind in SUPPORT_KINDS {
        let value = hours
            .get(kind)
            .filter(|v| is_truthy(Some(v)))
            .cloned()
            .unwrap_or_else(|| json!({}));
        entry.insert(kind.to_string(), value);
    }
    Value::Object(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn users_need_some_available_time() {
        assert!(has_available_time(&record(json!({
            "mobilitySupport": {"availableTime": "20"}
        }))));
        assert!(!has_available_time(&record(json!({
            "behaviorSupport": {"availableTime": ""},
            "hospitalSupport": {}
        }))));
        assert!(!has_available_time(&record(json!({"name": "x"}))));
    }

    #[test]
    fn monthly_entry_fills_missing_kinds() {
        let entry = monthly_entry(&record(json!({
            "behaviorSupport": {"used": 3},
            "mobilitySupport": null
        })));
        assert_eq!(
            entry,
            json!({
                "behaviorSupport": {"used": 3},
                "mobilitySupport": {},
                "hospitalSupport": {}
            })
        );
    }
}
