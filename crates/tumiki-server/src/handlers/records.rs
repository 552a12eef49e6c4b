//! Support service records, stored in `csv-schedules` next to the rows
//! imported from the monthly CSV exports.

use axum::extract::{Path, State};
use serde::Serialize;
use serde_json::{Map, Value};
use tumiki_api::{ApiError, ApiResult, Success};
use tumiki_auth::BearerAuth;
use tumiki_core::{format_rfc3339, generate_id};
use tumiki_storage::{FieldFilter, Record, Table, value_to_key_string};

use super::{JsonBody, require_fields};
use crate::state::AppState;

/// Tag written into `fileName` for records entered through this service.
pub const RECORD_SOURCE: &str = "tumiki-recorder";

const REQUIRED: [&str; 4] = ["userId", "date", "startTime", "endTime"];
/// Slot fields that identify a record; equal slots overwrite each other.
const SLOT: [&str; 4] = REQUIRED;
const COPIED: [&str; 8] = [
    "userName",
    "duration",
    "staff1",
    "destination",
    "serviceType",
    "checkStatus",
    "notes",
    "staff2",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordResponse {
    pub data: Record,
    pub is_duplicate: bool,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub schedules: Vec<Record>,
}

/// `POST /api/records`
pub async fn create_record(
    State(state): State<AppState>,
    BearerAuth(claims): BearerAuth,
    JsonBody(form): JsonBody<Map<String, Value>>,
) -> ApiResult<Success<CreateRecordResponse>> {
    require_fields(&form, &REQUIRED)?;

    let mut record = build_record(&form, format_rfc3339(state.clock.now()));

    let filters: Vec<FieldFilter> = SLOT
        .iter()
        .map(|field| FieldFilter::eq(*field, record.get(*field).cloned().unwrap_or(Value::Null)))
        .collect();
    let existing = state.storage.scan(Table::CsvSchedules, &filters).await?;
    let existing_id = existing
        .first()
        .and_then(|r| r.get("id"))
        .and_then(value_to_key_string);

    let is_duplicate = existing_id.is_some();
    let id = existing_id.unwrap_or_else(generate_id);
    if is_duplicate {
        tracing::debug!(id = %id, "record for this slot exists, overwriting");
    }
    record.insert("id".into(), Value::String(id));

    let stored_id = state.storage.put(Table::CsvSchedules, record.clone()).await?;
    tracing::info!(id = %stored_id, subject = %claims.subject(), is_duplicate, "record saved");

    Ok(Success(CreateRecordResponse {
        data: record,
        is_duplicate,
    }))
}

/// `GET /api/records/{userId}/{date}`
///
/// `userId` matches both string and numeric stored ids.
pub async fn get_records(
    State(state): State<AppState>,
    BearerAuth(_claims): BearerAuth,
    Path((user_id, date)): Path<(String, String)>,
) -> ApiResult<Success<RecordsResponse>> {
    if user_id.trim().is_empty() || date.trim().is_empty() {
        return Err(ApiError::bad_request("userId and date are required"));
    }
    let schedules: Vec<Record> = state
        .storage
        .query(Table::CsvSchedules, "date", date.as_str())
        .await?
        .into_iter()
        .filter(|s| same_user(s, &user_id))
        .collect();

    tracing::debug!(user_id = %user_id, date = %date, count = schedules.len(), "records fetched");
    Ok(Success(RecordsResponse { schedules }))
}

pub(crate) fn same_user(record: &Record, user_id: &str) -> bool {
    record
        .get("userId")
        .and_then(value_to_key_string)
        .is_some_and(|id| id == user_id)
}

fn build_record(form: &Map<String, Value>, imported_at: String) -> Record {
    let mut record = Record::new();
    for field in REQUIRED.iter().chain(COPIED.iter()) {
        if let Some(value) = form.get(*field) {
            record.insert((*field).to_string(), value.clone());
        }
    }
    if !super::is_truthy(record.get("staff2")) {
        record.insert("staff2".into(), Value::String(String::new()));
    }

    let text = |field: &str| form.get(field).and_then(value_to_key_string).unwrap_or_default();
    record.insert(
        "serviceName".into(),
        Value::String(format!("{} - {}", text("serviceType"), text("destination"))),
    );
    record.insert("fileName".into(), Value::String(RECORD_SOURCE.into()));
    record.insert("importedAt".into(), Value::String(imported_at));
    record
}
