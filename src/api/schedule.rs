use super::error::{ApiError, ApiResult};
use super::routes::ApiState;
use crate::auth::Caller;
use crate::calendar;
use crate::schedule::{self, BulkCardPatch, CardPatch, NewCard, ScheduleCard};
use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Datelike;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub(super) struct ScheduleQuery {
    /// Grid day index `0..=6` (Monday first) or `today`.
    day: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DuplicateBody {
    target_day: u8,
}

pub(super) async fn list(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Json<Vec<ScheduleCard>>> {
    let day = query.day.as_deref().map(parse_day).transpose()?;
    let Some(owner) = caller.owner() else {
        return Ok(Json(Vec::new()));
    };

    let database = state.database()?;
    Ok(Json(schedule::list(&database, owner, day)?))
}

fn parse_day(raw: &str) -> ApiResult<u8> {
    if raw == "today" {
        return Ok(calendar::grid_day(calendar::today().weekday()));
    }

    raw.parse::<u8>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid day: {raw}. Use 0-6 or today")))
}

pub(super) async fn create(
    State(state): State<ApiState>,
    caller: Caller,
    Json(input): Json<NewCard>,
) -> ApiResult<Json<ScheduleCard>> {
    let owner = caller.require()?;
    let mut database = state.database()?;

    Ok(Json(schedule::create(&mut database, owner, input)?))
}

pub(super) async fn bulk_update(
    State(state): State<ApiState>,
    caller: Caller,
    Json(patches): Json<Vec<BulkCardPatch>>,
) -> ApiResult<Json<Vec<ScheduleCard>>> {
    let owner = caller.require()?;
    let mut database = state.database()?;

    Ok(Json(schedule::bulk_update(&mut database, owner, &patches)?))
}

pub(super) async fn update(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(patch): Json<CardPatch>,
) -> ApiResult<Json<ScheduleCard>> {
    let owner = caller.require()?;
    let mut database = state.database()?;

    Ok(Json(schedule::update(&mut database, owner, id, patch)?))
}

pub(super) async fn delete(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let owner = caller.require()?;
    let database = state.database()?;
    schedule::delete(&database, owner, id)?;

    Ok(Json(json!({ "deleted": true })))
}

pub(super) async fn duplicate(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(body): Json<DuplicateBody>,
) -> ApiResult<Json<ScheduleCard>> {
    let owner = caller.require()?;
    let mut database = state.database()?;

    Ok(Json(schedule::duplicate_to_day(
        &mut database,
        owner,
        id,
        body.target_day,
    )?))
}

pub(super) async fn delete_for_habit(
    State(state): State<ApiState>,
    caller: Caller,
    Path(habit_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let owner = caller.require()?;
    let database = state.database()?;
    let deleted = schedule::delete_all_for_habit(&database, owner, habit_id)?;

    Ok(Json(json!({ "deleted": deleted })))
}
