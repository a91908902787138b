// src/models/setting.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// The keys the application reads. Anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    MapDrawingVideoUrl,
    FeedbackFormUrl,
}

impl SettingKey {
    pub const ALL: [SettingKey; 2] = [SettingKey::MapDrawingVideoUrl, SettingKey::FeedbackFormUrl];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::MapDrawingVideoUrl => "map_drawing_video_url",
            SettingKey::FeedbackFormUrl => "feedback_form_url",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SettingKey::MapDrawingVideoUrl => "Video tutorial shown next to the map drawing exercise",
            SettingKey::FeedbackFormUrl => "External form collecting user feedback",
        }
    }

    pub fn parse(key: &str) -> Result<Self, AppError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == key)
            .ok_or_else(|| AppError::NotFound(format!("Unknown setting '{}'", key)))
    }
}

/// Represents the 'general_settings' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeneralSetting {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of one setting; `value` is null until an admin sets it.
#[derive(Debug, Serialize)]
pub struct SettingValue {
    pub key: &'static str,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertSettingRequest {
    #[validate(url(message = "Value must be a valid URL"), length(max = 2048))]
    pub value: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_keys_parse() {
        assert_eq!(
            SettingKey::parse("feedback_form_url").unwrap(),
            SettingKey::FeedbackFormUrl
        );
        assert!(matches!(
            SettingKey::parse("site_title"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn value_must_be_a_url() {
        let ok = UpsertSettingRequest {
            value: "https://www.youtube.com/watch?v=abc".to_string(),
            description: None,
        };
        let bad = UpsertSettingRequest {
            value: "not a url".to_string(),
            description: None,
        };
        assert!(ok.validate().is_ok());
        assert!(bad.validate().is_err());
    }
}
