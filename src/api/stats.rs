use super::error::ApiResult;
use super::extract::anchor_date;
use super::routes::ApiState;
use crate::auth::Caller;
use crate::stats::{
    self,
    streak::{OverallStreak, StreakSummary},
    window::{ConsistencyRate, DailyVolume, DensityCell, TrendPoint, WeeklyProgress},
};
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

const DEFAULT_CONSISTENCY_DAYS: u32 = 30;
const DEFAULT_TREND_WEEKS: u32 = 8;
const DEFAULT_DENSITY_WEEKS: u32 = 12;

/// `today` overrides the anchor date; the rest apply to individual endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct StatsQuery {
    today: Option<String>,
    date: Option<String>,
    days: Option<u32>,
    weeks: Option<u32>,
}

pub(super) async fn overall_streak(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<OverallStreak>> {
    let anchor = anchor_date(query.today.as_deref())?;
    let database = state.database()?;

    Ok(Json(stats::overall(
        &database,
        &caller,
        anchor,
        state.config.stats_window_days,
    )?))
}

pub(super) async fn habit_streak(
    State(state): State<ApiState>,
    caller: Caller,
    Path(habit_id): Path<i64>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<StreakSummary>> {
    let anchor = anchor_date(query.today.as_deref())?;
    let database = state.database()?;

    Ok(Json(stats::habit_streak(
        &database,
        &caller,
        habit_id,
        anchor,
        state.config.stats_window_days,
    )?))
}

pub(super) async fn consistency(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<ConsistencyRate>> {
    let anchor = anchor_date(query.today.as_deref())?;
    let days = query.days.unwrap_or(DEFAULT_CONSISTENCY_DAYS);
    let database = state.database()?;

    Ok(Json(stats::consistency(&database, &caller, anchor, days)?))
}

pub(super) async fn volume(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<DailyVolume>> {
    let date = anchor_date(query.date.as_deref().or(query.today.as_deref()))?;
    let database = state.database()?;

    Ok(Json(stats::volume(&database, &caller, date)?))
}

pub(super) async fn weekly(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Vec<WeeklyProgress>>> {
    let anchor = anchor_date(query.today.as_deref())?;
    let database = state.database()?;

    Ok(Json(stats::weekly(&database, &caller, anchor)?))
}

pub(super) async fn trend(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Vec<TrendPoint>>> {
    let anchor = anchor_date(query.today.as_deref())?;
    let weeks = query.weeks.unwrap_or(DEFAULT_TREND_WEEKS);
    let database = state.database()?;

    Ok(Json(stats::trend(&database, &caller, anchor, weeks)?))
}

pub(super) async fn density(
    State(state): State<ApiState>,
    caller: Caller,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Vec<DensityCell>>> {
    let anchor = anchor_date(query.today.as_deref())?;
    let weeks = query.weeks.unwrap_or(DEFAULT_DENSITY_WEEKS);
    let database = state.database()?;

    Ok(Json(stats::density(&database, &caller, anchor, weeks)?))
}
