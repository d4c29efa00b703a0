use super::error::ApiResult;
use super::{habits, schedule, stats, tasks};
use crate::config::{Config, parse_hhmm};
use crate::db::{Database, StoreSummary};
use crate::scheduler;
use anyhow::Result;
use axum::extract::State;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

impl ApiState {
    /// Each request works on its own connection; SQLite serializes writers.
    pub fn database(&self) -> Result<Database> {
        Database::open(&self.config.db_path)
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/habits", get(habits::list).post(habits::create))
        .route("/api/v1/habits/defaults", post(habits::create_defaults))
        .route("/api/v1/habits/order", put(habits::reorder))
        .route("/api/v1/habits/status", get(habits::with_status))
        .route(
            "/api/v1/habits/:id",
            get(habits::get)
                .patch(habits::update)
                .delete(habits::delete),
        )
        .route("/api/v1/habits/:id/archive", post(habits::archive))
        .route("/api/v1/habits/:id/unarchive", post(habits::unarchive))
        .route("/api/v1/habits/:id/logs", get(habits::habit_logs))
        .route(
            "/api/v1/habits/:id/logs/:date",
            get(habits::log_get)
                .put(habits::log_set)
                .delete(habits::log_delete),
        )
        .route("/api/v1/habits/:id/log", post(habits::log_increment))
        .route("/api/v1/habits/:id/unlog", post(habits::log_decrement))
        .route("/api/v1/logs", get(habits::log_range))
        .route("/api/v1/stats/streak", get(stats::overall_streak))
        .route("/api/v1/stats/streak/:habit_id", get(stats::habit_streak))
        .route("/api/v1/stats/consistency", get(stats::consistency))
        .route("/api/v1/stats/volume", get(stats::volume))
        .route("/api/v1/stats/weekly", get(stats::weekly))
        .route("/api/v1/stats/trend", get(stats::trend))
        .route("/api/v1/stats/density", get(stats::density))
        .route(
            "/api/v1/schedule",
            get(schedule::list).post(schedule::create),
        )
        .route("/api/v1/schedule/bulk", put(schedule::bulk_update))
        .route(
            "/api/v1/schedule/:id",
            patch(schedule::update).delete(schedule::delete),
        )
        .route("/api/v1/schedule/:id/duplicate", post(schedule::duplicate))
        .route(
            "/api/v1/schedule/habit/:habit_id",
            delete(schedule::delete_for_habit),
        )
        .route("/api/v1/tasks", get(tasks::list).post(tasks::create))
        .route("/api/v1/tasks/cleanup", post(tasks::cleanup))
        .route(
            "/api/v1/tasks/:id",
            get(tasks::get).patch(tasks::update).delete(tasks::delete),
        )
        .route("/api/v1/tasks/:id/complete", post(tasks::complete))
        .route("/api/v1/tasks/:id/terminate", post(tasks::terminate))
        .route(
            "/api/v1/settings/retention",
            get(tasks::retention_get).put(tasks::retention_put),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    service: &'static str,
    version: &'static str,
    api_port: u16,
    cleanup_time: String,
    next_cleanup_in_seconds: Option<u64>,
    store: StoreSummary,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let database = state.database()?;
    let next_cleanup_in_seconds = parse_hhmm(&state.config.cleanup_time)
        .and_then(scheduler::delay_until_next_run)
        .map(|delay| delay.as_secs())
        .ok();

    Ok(Json(StatusPayload {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        api_port: state.config.api_port,
        cleanup_time: state.config.cleanup_time.clone(),
        next_cleanup_in_seconds,
        store: database.summary()?,
    }))
}

#[cfg(test)]
mod tests {
    use super::{ApiState, router};
    use crate::auth::OWNER_HEADER;
    use crate::config::Config;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config {
            db_path: dir.path().join("api.db"),
            ..Config::default()
        };

        (
            dir,
            router(ApiState {
                config: Arc::new(config),
            }),
        )
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        owner: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            builder = builder.header(OWNER_HEADER, owner);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };

        (status, value)
    }

    async fn create_habit(app: &Router, owner: &str, name: &str) -> i64 {
        let (status, habit) = send(
            app,
            Method::POST,
            "/api/v1/habits",
            Some(owner),
            Some(json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        habit["id"].as_i64().expect("habit id")
    }

    #[tokio::test]
    async fn status_reports_service_and_store() {
        let (_dir, app) = test_app();

        let (status, body) = send(&app, Method::GET, "/api/v1/status", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "habitgrid");
        assert_eq!(body["store"]["habits"], 0);
        assert_eq!(body["cleanup_time"], "03:30");
        assert!(body["next_cleanup_in_seconds"].as_u64().is_some());
    }

    #[tokio::test]
    async fn anonymous_reads_degrade_and_writes_are_rejected() {
        let (_dir, app) = test_app();

        let (status, body) = send(&app, Method::GET, "/api/v1/habits", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) = send(&app, Method::GET, "/api/v1/stats/streak", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current"], 0);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/habits",
            None,
            Some(json!({ "name": "Read" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/habits",
            Some("   "),
            Some(json!({ "name": "Read" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logging_feeds_the_habit_streak() {
        let (_dir, app) = test_app();
        let id = create_habit(&app, "alice", "Stretch").await;

        for date in ["2026-03-02", "2026-03-03", "2026-03-04"] {
            let (status, log) = send(
                &app,
                Method::POST,
                &format!("/api/v1/habits/{id}/log"),
                Some("alice"),
                Some(json!({ "date": date })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(log["count"], 1);
        }

        let (status, streak) = send(
            &app,
            Method::GET,
            &format!("/api/v1/stats/streak/{id}?today=2026-03-04"),
            Some("alice"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(streak["current"], 3);
        assert_eq!(streak["best"], 3);

        let (status, logs) = send(
            &app,
            Method::GET,
            "/api/v1/logs?start=2026-03-01&end=2026-03-03",
            Some("alice"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(logs.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn log_range_requires_bounds() {
        let (_dir, app) = test_app();

        let (status, body) =
            send(&app, Method::GET, "/api/v1/logs?start=2026-03-01", Some("alice"), None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn other_owners_records_are_not_found() {
        let (_dir, app) = test_app();
        let id = create_habit(&app, "alice", "Journal").await;

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/habits/{id}"),
            Some("bob"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/v1/habits/{id}"),
            Some("bob"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, &format!("/api/v1/habits/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn overlapping_schedule_card_is_a_conflict() {
        let (_dir, app) = test_app();
        let habit_id = create_habit(&app, "alice", "Deep work").await;

        let (status, card) = send(
            &app,
            Method::POST,
            "/api/v1/schedule",
            Some("alice"),
            Some(json!({
                "habit_id": habit_id,
                "day": 0,
                "start_hour": 9,
                "start_minute": 0,
                "duration_minutes": 60
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(card["duration_minutes"], 60);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/schedule",
            Some("alice"),
            Some(json!({
                "habit_id": habit_id,
                "day": 0,
                "start_hour": 9,
                "start_minute": 30
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/schedule",
            Some("alice"),
            Some(json!({
                "habit_id": habit_id,
                "day": 0,
                "start_hour": 5,
                "start_minute": 0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, cards) =
            send(&app, Method::GET, "/api/v1/schedule?day=0", Some("alice"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cards.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn schedule_list_accepts_today_as_day() {
        use crate::calendar;
        use chrono::Datelike;

        let (_dir, app) = test_app();
        let habit_id = create_habit(&app, "alice", "Walk").await;
        let today = calendar::grid_day(calendar::today().weekday());
        let other = (today + 1) % 7;

        for day in [today, other] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/api/v1/schedule",
                Some("alice"),
                Some(json!({ "habit_id": habit_id, "day": day, "start_hour": 7, "start_minute": 0 })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, cards) =
            send(&app, Method::GET, "/api/v1/schedule?day=today", Some("alice"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cards.as_array().map(Vec::len), Some(1));
        assert_eq!(cards[0]["day"], today);

        let (status, body) =
            send(&app, Method::GET, "/api/v1/schedule?day=someday", Some("alice"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn completing_weekly_task_returns_snapshot_and_rolls_forward() {
        let (_dir, app) = test_app();
        let due = 1_772_409_600_000_i64;

        let (status, task) = send(
            &app,
            Method::POST,
            "/api/v1/tasks",
            Some("alice"),
            Some(json!({ "title": "Water plants", "recurrence": "weekly", "due_date": due })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = task["id"].as_i64().expect("task id");

        let (status, completion) = send(
            &app,
            Method::POST,
            &format!("/api/v1/tasks/{id}/complete"),
            Some("alice"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(completion["task"]["status"], "active");
        assert!(completion["task"]["due_date"].as_i64().expect("next due") > due);
        assert_eq!(completion["snapshot"]["status"], "completed");
        assert_eq!(completion["snapshot"]["master_task_id"], id);

        let (status, past) = send(
            &app,
            Method::GET,
            "/api/v1/tasks?view=past",
            Some("alice"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(past.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn retention_setting_round_trips_and_validates() {
        let (_dir, app) = test_app();

        let (status, body) =
            send(&app, Method::GET, "/api/v1/settings/retention", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["retention_period_days"], 30);

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/v1/settings/retention",
            Some("alice"),
            Some(json!({ "retention_period_days": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/v1/settings/retention",
            Some("alice"),
            Some(json!({ "retention_period_days": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(
            &app,
            Method::GET,
            "/api/v1/settings/retention",
            Some("alice"),
            None,
        )
        .await;
        assert_eq!(body["retention_period_days"], 10);

        let (status, body) =
            send(&app, Method::POST, "/api/v1/tasks/cleanup", Some("alice"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], 0);
    }
}
