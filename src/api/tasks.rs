use super::error::ApiResult;
use super::extract::anchor_date;
use super::routes::ApiState;
use crate::auth::Caller;
use crate::calendar;
use crate::error::DomainError;
use crate::tasks::{
    self, Completion, NewTask, RecurrenceFilter, RetentionSetting, Task, TaskPatch, TaskStatus,
    TaskView,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub(super) struct TaskListQuery {
    view: Option<TaskView>,
    status: Option<TaskStatus>,
    recurrence: Option<RecurrenceFilter>,
    today: Option<String>,
}

pub(super) async fn list(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let anchor = anchor_date(query.today.as_deref())?;
    let Some(owner) = caller.owner() else {
        return Ok(Json(Vec::new()));
    };

    let database = state.database()?;
    let listed = match query.view {
        Some(view) => tasks::list(&database, owner, view, anchor)?,
        None => tasks::list_by_status(
            &database,
            owner,
            query.status.unwrap_or(TaskStatus::Active),
            query.recurrence.unwrap_or_default(),
        )?,
    };

    Ok(Json(listed))
}

pub(super) async fn create(
    State(state): State<ApiState>,
    caller: Caller,
    Json(input): Json<NewTask>,
) -> ApiResult<Json<Task>> {
    let owner = caller.require()?;
    let database = state.database()?;

    Ok(Json(tasks::create(&database, owner, input)?))
}

pub(super) async fn get(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Task>> {
    let owner = caller
        .owner()
        .ok_or_else(|| DomainError::not_found("Task", id))?;
    let database = state.database()?;

    Ok(Json(tasks::get(&database, owner, id)?))
}

pub(super) async fn update(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<Json<Task>> {
    let owner = caller.require()?;
    let database = state.database()?;

    Ok(Json(tasks::update(&database, owner, id, patch)?))
}

pub(super) async fn delete(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let owner = caller.require()?;
    let database = state.database()?;
    tasks::delete(&database, owner, id)?;

    Ok(Json(json!({ "deleted": true })))
}

pub(super) async fn complete(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Completion>> {
    let owner = caller.require()?;
    let mut database = state.database()?;

    Ok(Json(tasks::complete(&mut database, owner, id)?))
}

pub(super) async fn terminate(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Task>> {
    let owner = caller.require()?;
    let database = state.database()?;

    Ok(Json(tasks::terminate(&database, owner, id)?))
}

pub(super) async fn cleanup(
    State(state): State<ApiState>,
    caller: Caller,
) -> ApiResult<Json<Value>> {
    let owner = caller.require()?;
    let database = state.database()?;
    let deleted = tasks::cleanup_old(
        &database,
        owner,
        calendar::now_millis(),
        state.config.default_retention_days,
    )?;

    Ok(Json(json!({ "deleted": deleted })))
}

#[derive(Debug, Deserialize)]
pub(super) struct RetentionBody {
    retention_period_days: u32,
}

pub(super) async fn retention_get(
    State(state): State<ApiState>,
    caller: Caller,
) -> ApiResult<Json<RetentionSetting>> {
    let fallback = state.config.default_retention_days;
    let Some(owner) = caller.owner() else {
        return Ok(Json(RetentionSetting {
            retention_period_days: fallback,
        }));
    };

    let database = state.database()?;
    Ok(Json(tasks::retention_period(&database, owner, fallback)?))
}

pub(super) async fn retention_put(
    State(state): State<ApiState>,
    caller: Caller,
    Json(body): Json<RetentionBody>,
) -> ApiResult<Json<RetentionSetting>> {
    let owner = caller.require()?;
    let database = state.database()?;

    Ok(Json(tasks::set_retention_period(
        &database,
        owner,
        body.retention_period_days,
    )?))
}
