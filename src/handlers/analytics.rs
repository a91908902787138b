// src/handlers/analytics.rs

use std::{future::Future, sync::Arc};

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::page_visit::{
        AnalyticsParams, MostVisitedPage, PageVisit, SessionDurationRequest, TopPage,
        TrackVisitRequest, TrackVisitResponse, VisitSample,
    },
    state::Caches,
    utils::{
        analytics::{
            browser_breakdown, daily_trend, day_start, device_breakdown, hourly_buckets,
            new_session_id, new_visitor_id, summarize,
        },
        jwt::optional_claims,
        user_agent::detect_device,
    },
};

const DEFAULT_DAYS: i64 = 30;
const MAX_DAYS: i64 = 365;
const DEFAULT_PAGE_LIMIT: i64 = 10;
const DEFAULT_VISIT_LIMIT: i64 = 100;
const MAX_VISIT_LIMIT: i64 = 1000;

impl AnalyticsParams {
    fn days(&self) -> i64 {
        self.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
    }

    fn limit(&self, default: i64, max: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, max)
    }

    fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - TimeDelta::days(self.days())
    }
}

/// Runs `compute` behind the analytics memo; identical concurrent queries share one run.
async fn memoized<T, F, Fut>(caches: &Caches, key: String, compute: F) -> Result<serde_json::Value, AppError>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    caches
        .analytics
        .get_or_try_init(key, || async move {
            let value = compute().await?;
            serde_json::to_value(value).map_err(|e| AppError::InternalServerError(e.to_string()))
        })
        .await
}

/// Records a page visit.
///
/// Never fails the caller: a malformed body or a database error is logged and
/// reported as `tracked: false`, always with 202 Accepted.
pub async fn track_visit(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let now = Utc::now();
    let header_user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let request = serde_json::from_slice::<TrackVisitRequest>(&body)
        .map_err(|e| e.to_string())
        .and_then(|req| req.validate().map(|_| req).map_err(|e| e.to_string()));

    let request = match request {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Ignoring malformed page visit: {}", e);
            let device = detect_device(header_user_agent);
            return (
                StatusCode::ACCEPTED,
                Json(TrackVisitResponse {
                    tracked: false,
                    visitor_id: new_visitor_id(now),
                    session_id: new_session_id(now),
                    device_type: device.device_type,
                    browser: device.browser,
                    os: device.os,
                }),
            );
        }
    };

    let visitor_id = request.visitor_id.clone().unwrap_or_else(|| new_visitor_id(now));
    let session_id = request.session_id.clone().unwrap_or_else(|| new_session_id(now));
    let user_agent = request
        .user_agent
        .clone()
        .unwrap_or_else(|| header_user_agent.to_string());

    let detected = detect_device(&user_agent);
    let device_type = request.device_type.unwrap_or(detected.device_type);
    let browser = request.browser.clone().unwrap_or(detected.browser);
    let os = request.os.clone().unwrap_or(detected.os);
    let user_id = optional_claims(&headers, &config.jwt_secret).and_then(|c| c.user_id().ok());

    let result = sqlx::query(
        r#"
        INSERT INTO page_visits (
            page_path, page_title, referrer, session_id, visitor_id, user_id, is_authenticated,
            user_agent, device_type, browser, os, country_code, visit_timestamp, session_duration
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&request.page_path)
    .bind(&request.page_title)
    .bind(&request.referrer)
    .bind(&session_id)
    .bind(&visitor_id)
    .bind(user_id)
    .bind(user_id.is_some())
    .bind((!user_agent.is_empty()).then_some(&user_agent))
    .bind(device_type.as_str())
    .bind(&browser)
    .bind(&os)
    .bind(&request.country_code)
    .bind(now)
    .bind(request.session_duration)
    .execute(&pool)
    .await;

    let tracked = match result {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Failed to track page visit for {}: {:?}", request.page_path, e);
            false
        }
    };

    (
        StatusCode::ACCEPTED,
        Json(TrackVisitResponse {
            tracked,
            visitor_id,
            session_id,
            device_type,
            browser,
            os,
        }),
    )
}

/// Backfills the duration of a session's visits that do not have one yet.
pub async fn update_session_duration(
    State(pool): State<SqlitePool>,
    Path(session_id): Path<String>,
    Json(payload): Json<SessionDurationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let result = sqlx::query(
        "UPDATE page_visits SET session_duration = ? WHERE session_id = ? AND session_duration IS NULL",
    )
    .bind(payload.duration)
    .bind(&session_id)
    .execute(&pool)
    .await;

    let updated = match result {
        Ok(done) => done.rows_affected() > 0,
        Err(e) => {
            tracing::error!("Failed to update duration of session {}: {:?}", session_id, e);
            false
        }
    };

    Ok(Json(json!({ "updated": updated })))
}

async fn most_visited_pages(
    pool: &SqlitePool,
    since: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<MostVisitedPage>, AppError> {
    let rows = sqlx::query_as::<_, MostVisitedPage>(
        r#"
        SELECT
            page_path,
            MAX(page_title) AS page_title,
            COUNT(*) AS visit_count,
            COUNT(DISTINCT visitor_id) AS unique_visitors
        FROM page_visits
        WHERE (?1 IS NULL OR visit_timestamp >= ?1)
        GROUP BY page_path
        ORDER BY visit_count DESC, page_path ASC
        LIMIT ?2
        "#,
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to rank pages: {:?}", e);
        AppError::from(e)
    })?;
    Ok(rows)
}

/// Overall dashboard numbers.
/// Admin only.
pub async fn get_stats(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
) -> Result<impl IntoResponse, AppError> {
    let pool = &pool;
    let stats = memoized(&caches, "stats".to_string(), move || async move {
        let samples = sqlx::query_as::<_, VisitSample>(
            "SELECT visitor_id, visit_timestamp, session_duration FROM page_visits",
        )
        .fetch_all(pool)
        .await?;

        let top = most_visited_pages(pool, None, 1)
            .await?
            .into_iter()
            .next()
            .map(|p| TopPage {
                page_path: p.page_path,
                page_title: p.page_title,
                visit_count: p.visit_count,
            });

        Ok(summarize(&samples, top, Utc::now()))
    })
    .await?;

    Ok(Json(stats))
}

/// Visits per hour over the last 24 hours, oldest first.
/// Admin only.
pub async fn get_hourly(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
) -> Result<impl IntoResponse, AppError> {
    let pool = &pool;
    let hourly = memoized(&caches, "hourly".to_string(), move || async move {
        let now = Utc::now();
        let timestamps: Vec<DateTime<Utc>> =
            sqlx::query_scalar("SELECT visit_timestamp FROM page_visits WHERE visit_timestamp >= ?")
                .bind(now - TimeDelta::hours(24))
                .fetch_all(pool)
                .await?;
        Ok(hourly_buckets(timestamps, now))
    })
    .await?;

    Ok(Json(hourly))
}

/// Admin only.
pub async fn get_top_pages(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, AppError> {
    let days = params.days();
    let limit = params.limit(DEFAULT_PAGE_LIMIT, 100);
    let key = format!("pages:{}:{}", days, limit);

    let pool = &pool;
    let pages = memoized(&caches, key, move || async move {
        most_visited_pages(pool, Some(params.since(Utc::now())), limit).await
    })
    .await?;

    Ok(Json(pages))
}

/// Admin only.
pub async fn get_devices(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, AppError> {
    let key = format!("devices:{}", params.days());

    let pool = &pool;
    let devices = memoized(&caches, key, move || async move {
        let rows: Vec<Option<String>> =
            sqlx::query_scalar("SELECT device_type FROM page_visits WHERE visit_timestamp >= ?")
                .bind(params.since(Utc::now()))
                .fetch_all(pool)
                .await?;
        Ok(device_breakdown(rows.iter().map(|d| d.as_deref())))
    })
    .await?;

    Ok(Json(devices))
}

/// Admin only.
pub async fn get_browsers(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, AppError> {
    let key = format!("browsers:{}", params.days());

    let pool = &pool;
    let browsers = memoized(&caches, key, move || async move {
        let rows: Vec<Option<String>> =
            sqlx::query_scalar("SELECT browser FROM page_visits WHERE visit_timestamp >= ?")
                .bind(params.since(Utc::now()))
                .fetch_all(pool)
                .await?;
        Ok(browser_breakdown(rows.iter().map(|b| b.as_deref())))
    })
    .await?;

    Ok(Json(browsers))
}

/// Daily totals and unique visitors, one entry per day including today.
/// Admin only.
pub async fn get_trend(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, AppError> {
    let days = params.days();
    let key = format!("trend:{}", days);

    let pool = &pool;
    let trend = memoized(&caches, key, move || async move {
        let now = Utc::now();
        let start = day_start(now) - TimeDelta::days(days - 1);
        let rows: Vec<(DateTime<Utc>, String)> = sqlx::query_as(
            "SELECT visit_timestamp, visitor_id FROM page_visits WHERE visit_timestamp >= ?",
        )
        .bind(start)
        .fetch_all(pool)
        .await?;

        Ok(daily_trend(
            rows.iter().map(|(ts, visitor)| (*ts, visitor.as_str())),
            start.date_naive(),
            now.date_naive(),
        ))
    })
    .await?;

    Ok(Json(trend))
}

/// Most recent raw visits.
/// Admin only.
pub async fn list_visits(
    State(pool): State<SqlitePool>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, AppError> {
    let visits = sqlx::query_as::<_, PageVisit>(
        r#"
        SELECT
            id, page_path, page_title, referrer, session_id, visitor_id, user_id, is_authenticated,
            user_agent, device_type, browser, os, country_code, visit_timestamp, session_duration
        FROM page_visits
        ORDER BY visit_timestamp DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(params.limit(DEFAULT_VISIT_LIMIT, MAX_VISIT_LIMIT))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list visits: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(visits))
}
