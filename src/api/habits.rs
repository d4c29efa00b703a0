use super::error::{ApiError, ApiResult};
use super::extract::{anchor_date, parse_date_param};
use super::routes::ApiState;
use crate::auth::Caller;
use crate::error::DomainError;
use crate::habits::logs::{self, HabitLog};
use crate::habits::{self, Habit, HabitFilter, HabitPatch, HabitWithStatus, NewHabit, SeedOutcome};
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub(super) struct HabitListQuery {
    include: Option<HabitFilter>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DateQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LogRangeQuery {
    start: Option<String>,
    end: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct LogChangeBody {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SetLogBody {
    count: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderBody {
    habit_ids: Vec<i64>,
}

pub(super) async fn list(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<HabitListQuery>,
) -> ApiResult<Json<Vec<Habit>>> {
    let Some(owner) = caller.owner() else {
        return Ok(Json(Vec::new()));
    };

    let database = state.database()?;
    let filter = query.include.unwrap_or_default();
    Ok(Json(habits::list(&database, owner, filter)?))
}

pub(super) async fn create(
    State(state): State<ApiState>,
    caller: Caller,
    Json(input): Json<NewHabit>,
) -> ApiResult<Json<Habit>> {
    let owner = caller.require()?;
    let database = state.database()?;

    Ok(Json(habits::create(&database, owner, input)?))
}

pub(super) async fn create_defaults(
    State(state): State<ApiState>,
    caller: Caller,
) -> ApiResult<Json<SeedOutcome>> {
    let owner = caller.require()?;
    let database = state.database()?;

    Ok(Json(habits::create_defaults(&database, owner)?))
}

pub(super) async fn reorder(
    State(state): State<ApiState>,
    caller: Caller,
    Json(body): Json<OrderBody>,
) -> ApiResult<Json<Value>> {
    let owner = caller.require()?;
    let mut database = state.database()?;
    let updated = habits::reorder(&mut database, owner, &body.habit_ids)?;

    Ok(Json(json!({ "updated": updated })))
}

pub(super) async fn with_status(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Vec<HabitWithStatus>>> {
    let date = anchor_date(query.date.as_deref())?;
    let Some(owner) = caller.owner() else {
        return Ok(Json(Vec::new()));
    };

    let database = state.database()?;
    Ok(Json(habits::with_status(&database, owner, date)?))
}

pub(super) async fn get(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Habit>> {
    let owner = caller
        .owner()
        .ok_or_else(|| DomainError::not_found("Habit", id))?;
    let database = state.database()?;

    Ok(Json(habits::get(&database, owner, id)?))
}

pub(super) async fn update(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(patch): Json<HabitPatch>,
) -> ApiResult<Json<Habit>> {
    let owner = caller.require()?;
    let database = state.database()?;

    Ok(Json(habits::update(&database, owner, id, patch)?))
}

pub(super) async fn delete(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let owner = caller.require()?;
    let mut database = state.database()?;
    let cards = habits::delete(&mut database, owner, id)?;

    Ok(Json(json!({ "deleted": true, "schedule_cards_deleted": cards })))
}

pub(super) async fn archive(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Habit>> {
    set_archived(state, caller, id, true)
}

pub(super) async fn unarchive(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Habit>> {
    set_archived(state, caller, id, false)
}

fn set_archived(state: ApiState, caller: Caller, id: i64, archived: bool) -> ApiResult<Json<Habit>> {
    let owner = caller.require()?;
    let database = state.database()?;

    Ok(Json(habits::set_archived(&database, owner, id, archived)?))
}

pub(super) async fn habit_logs(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<HabitLog>>> {
    let Some(owner) = caller.owner() else {
        return Ok(Json(Vec::new()));
    };

    let database = state.database()?;
    Ok(Json(logs::list_for_habit(&database, owner, id)?))
}

pub(super) async fn log_get(
    State(state): State<ApiState>,
    caller: Caller,
    Path((id, date)): Path<(i64, String)>,
) -> ApiResult<Json<Option<HabitLog>>> {
    let date = parse_date_param(&date)?;
    let Some(owner) = caller.owner() else {
        return Ok(Json(None));
    };

    let database = state.database()?;
    Ok(Json(logs::get(&database, owner, id, date)?))
}

pub(super) async fn log_set(
    State(state): State<ApiState>,
    caller: Caller,
    Path((id, date)): Path<(i64, String)>,
    Json(body): Json<SetLogBody>,
) -> ApiResult<Json<Option<HabitLog>>> {
    let date = parse_date_param(&date)?;
    let owner = caller.require()?;
    let database = state.database()?;

    Ok(Json(logs::set(&database, owner, id, date, body.count)?))
}

pub(super) async fn log_delete(
    State(state): State<ApiState>,
    caller: Caller,
    Path((id, date)): Path<(i64, String)>,
) -> ApiResult<Json<Value>> {
    let date = parse_date_param(&date)?;
    let owner = caller.require()?;
    let database = state.database()?;
    let deleted = logs::delete(&database, owner, id, date)?;

    Ok(Json(json!({ "deleted": deleted })))
}

pub(super) async fn log_increment(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
    body: Option<Json<LogChangeBody>>,
) -> ApiResult<Json<HabitLog>> {
    let owner = caller.require()?;
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let date = body.date.as_deref().map(parse_date_param).transpose()?;
    let database = state.database()?;

    Ok(Json(logs::log(&database, owner, id, date, body.count)?))
}

pub(super) async fn log_decrement(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
    body: Option<Json<LogChangeBody>>,
) -> ApiResult<Json<Option<HabitLog>>> {
    let owner = caller.require()?;
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let date = body.date.as_deref().map(parse_date_param).transpose()?;
    let database = state.database()?;

    Ok(Json(logs::unlog(&database, owner, id, date, body.count)?))
}

pub(super) async fn log_range(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<LogRangeQuery>,
) -> ApiResult<Json<Vec<HabitLog>>> {
    let (start, end) = match (&query.date, &query.start, &query.end) {
        (Some(date), _, _) => {
            let date = parse_date_param(date)?;
            (date, date)
        }
        (None, Some(start), Some(end)) => (parse_date_param(start)?, parse_date_param(end)?),
        _ => {
            return Err(ApiError::BadRequest(
                "Provide either date or both start and end".to_string(),
            ));
        }
    };
    let Some(owner) = caller.owner() else {
        return Ok(Json(Vec::new()));
    };

    let database = state.database()?;
    Ok(Json(logs::list_range(&database, owner, start, end)?))
}
