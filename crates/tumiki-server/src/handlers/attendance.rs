use axum::extract::{Path, State};
use serde::Serialize;
use serde_json::{Map, Value};
use time::Time;
use time::macros::format_description;
use tumiki_api::{ApiError, ApiResult, Success};
use tumiki_auth::BearerAuth;
use tumiki_core::format_rfc3339;
use tumiki_storage::{Key, Record, Table, value_to_key_string};

use super::records::same_user;
use super::{JsonBody, require_fields};
use crate::state::AppState;

/// Display name of a punch type. Unknown types are shown as given.
pub fn type_name(kind: &str) -> &str {
    match kind {
        "clock-in" => "出勤",
        "break-start" => "休憩開始",
        "break-end" => "休憩終了",
        "clock-out" => "退勤",
        other => other,
    }
}

#[derive(Debug, Serialize)]
pub struct PunchResponse {
    pub message: String,
    pub data: Record,
}

#[derive(Debug, Serialize)]
pub struct PunchListResponse {
    pub records: Vec<Record>,
}

/// `POST /api/attendance`
pub async fn create_punch(
    State(state): State<AppState>,
    BearerAuth(_claims): BearerAuth,
    JsonBody(form): JsonBody<Map<String, Value>>,
) -> ApiResult<Success<PunchResponse>> {
    require_fields(&form, &["userId", "date", "time", "type"])?;

    let text = |field: &str| form.get(field).and_then(value_to_key_string).unwrap_or_default();
    let kind = text("type");
    let label = type_name(&kind).to_string();

    let now = state.clock.now();
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let id = Key::composite([text("userId"), text("date"), millis.to_string()]).document_id()?;

    let mut record = Record::new();
    for field in ["userId", "userName", "date", "time", "type"] {
        if let Some(value) = form.get(field) {
            record.insert(field.to_string(), value.clone());
        }
    }
    record.insert("typeName".into(), Value::String(label.clone()));
    record.insert("timestamp".into(), Value::String(format_rfc3339(now)));
    record.insert("id".into(), Value::String(id));

    let stored_id = state.storage.put(Table::Attendance, record.clone()).await?;
    tracing::info!(id = %stored_id, kind = %kind, "attendance punch recorded");

    Ok(Success(PunchResponse {
        message: format!("{label}を記録しました"),
        data: record,
    }))
}

/// `GET /api/attendance/{userId}/{date}`, ordered by punch time.
pub async fn list_punches(
    State(state): State<AppState>,
    BearerAuth(_claims): BearerAuth,
    Path((user_id, date)): Path<(String, String)>,
) -> ApiResult<Success<PunchListResponse>> {
    if user_id.trim().is_empty() || date.trim().is_empty() {
        return Err(ApiError::bad_request("userId and date are required"));
    }
    let mut records: Vec<Record> = state
        .storage
        .query(Table::Attendance, "date", date.as_str())
        .await?
        .into_iter()
        .filter(|r| same_user(r, &user_id))
        .collect();
    records.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    Ok(Success(PunchListResponse { records }))
}

/// Punches with a readable `time` come first, in clock order; the stored
/// timestamp breaks ties.
fn sort_key(record: &Record) -> (bool, Option<Time>, &str) {
    let parsed = parse_clock_time(str_field(record, "time"));
    (parsed.is_none(), parsed, str_field(record, "timestamp"))
}

/// `H:MM`, `HH:MM` or `HH:MM:SS`.
fn parse_clock_time(raw: &str) -> Option<Time> {
    let raw = raw.trim();
    Time::parse(raw, format_description!("[hour padding:none]:[minute]:[second]"))
        .or_else(|_| Time::parse(raw, format_description!("[hour padding:none]:[minute]")))
        .ok()
}

fn str_field<'a>(record: &'a Record, name: &str) -> &'a str {
    record.get(name).and_then(Value::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_have_display_names() {
        assert_eq!(type_name("clock-in"), "出勤");
        assert_eq!(type_name("break-start"), "休憩開始");
        assert_eq!(type_name("break-end"), "休憩終了");
        assert_eq!(type_name("clock-out"), "退勤");
        assert_eq!(type_name("overtime"), "overtime");
    }

    fn punch(time: &str, timestamp: &str) -> Record {
        serde_json::json!({"time": time, "timestamp": timestamp})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn punches_sort_by_clock_time_not_text() {
        let mut records = vec![
            punch("18:00", "2025-10-15T09:00:03Z"),
            punch("later", "2025-10-15T09:00:04Z"),
            punch("9:00", "2025-10-15T09:00:01Z"),
            punch("12:30", "2025-10-15T09:00:02Z"),
            punch("09:00", "2025-10-15T09:00:00Z"),
        ];
        records.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        let order: Vec<&str> = records.iter().map(|r| str_field(r, "timestamp")).collect();
        assert_eq!(
            order,
            [
                "2025-10-15T09:00:00Z",
                "2025-10-15T09:00:01Z",
                "2025-10-15T09:00:02Z",
                "2025-10-15T09:00:03Z",
                "2025-10-15T09:00:04Z",
            ]
        );
    }

    #[test]
    fn clock_times_parse_with_or_without_padding() {
        assert_eq!(parse_clock_time("9:05"), parse_clock_time("09:05"));
        assert!(parse_clock_time("18:00:30").is_some());
        assert!(parse_clock_time("25:00").is_none());
        assert!(parse_clock_time("").is_none());
    }
}
