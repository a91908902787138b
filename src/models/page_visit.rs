// src/models/page_visit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::user_agent::DeviceType;

/// Represents the 'page_visits' table in the database.
/// Written once per page load; only `session_duration` is ever backfilled.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PageVisit {
    pub id: i64,
    pub page_path: String,
    pub page_title: Option<String>,
    pub referrer: Option<String>,
    pub session_id: String,
    pub visitor_id: String,
    pub user_id: Option<i64>,
    pub is_authenticated: bool,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub country_code: Option<String>,
    pub visit_timestamp: DateTime<Utc>,
    /// Seconds.
    pub session_duration: Option<i64>,
}

/// The columns the dashboard aggregates over.
#[derive(Debug, Clone, FromRow)]
pub struct VisitSample {
    pub visitor_id: String,
    pub visit_timestamp: DateTime<Utc>,
    pub session_duration: Option<i64>,
}

/// DTO for tracking a page visit.
/// Ids and device info are optional: the server fills in whatever is missing.
#[derive(Debug, Deserialize, Validate)]
pub struct TrackVisitRequest {
    #[validate(length(min = 1, max = 2048))]
    pub page_path: String,
    #[validate(length(max = 500))]
    pub page_title: Option<String>,
    #[validate(length(max = 2048))]
    pub referrer: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub session_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub visitor_id: Option<String>,
    #[validate(length(max = 1000))]
    pub user_agent: Option<String>,
    pub device_type: Option<DeviceType>,
    #[validate(length(max = 50))]
    pub browser: Option<String>,
    #[validate(length(max = 50))]
    pub os: Option<String>,
    #[validate(length(equal = 2))]
    pub country_code: Option<String>,
    /// Seconds, at most one week.
    #[validate(range(min = 0, max = 604800))]
    pub session_duration: Option<i64>,
}

/// Returned to the tracker so it can persist the ids it should reuse.
#[derive(Debug, Serialize)]
pub struct TrackVisitResponse {
    pub tracked: bool,
    pub visitor_id: String,
    pub session_id: String,
    pub device_type: DeviceType,
    pub browser: String,
    pub os: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SessionDurationRequest {
    /// Seconds since the session started.
    #[validate(range(min = 0, max = 604800))]
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct MostVisitedPage {
    pub page_path: String,
    pub page_title: Option<String>,
    pub visit_count: i64,
    pub unique_visitors: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopPage {
    pub page_path: String,
    pub page_title: Option<String>,
    pub visit_count: i64,
}

/// Overall numbers for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsStats {
    pub total_visits: i64,
    pub total_visits_today: i64,
    pub unique_visitors_total: i64,
    pub unique_visitors_today: i64,
    /// Seconds, rounded.
    pub avg_session_duration: i64,
    pub avg_session_duration_display: String,
    pub most_visited_page: Option<TopPage>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HourlyVisitData {
    pub hour_timestamp: DateTime<Utc>,
    pub visit_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeviceBreakdown {
    pub device_type: DeviceType,
    pub visit_count: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BrowserStats {
    pub browser: String,
    pub visit_count: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VisitTrendData {
    pub date: chrono::NaiveDate,
    pub total_visits: i64,
    pub unique_visitors: i64,
}

/// Query parameters shared by the windowed analytics endpoints.
#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    /// Look-back window in days (default 30).
    pub days: Option<i64>,
    /// Max rows (default depends on the endpoint).
    pub limit: Option<i64>,
}
