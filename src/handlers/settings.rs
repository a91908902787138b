// src/handlers/settings.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::setting::{GeneralSetting, SettingKey, SettingValue, UpsertSettingRequest},
};

/// Public value of one setting; `value` is null when it was never set.
pub async fn get_setting(
    State(pool): State<SqlitePool>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let key = SettingKey::parse(&key)?;

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM general_settings WHERE key = ?")
        .bind(key.as_str())
        .fetch_optional(&pool)
        .await?;

    Ok(Json(SettingValue {
        key: key.as_str(),
        value,
    }))
}

/// Admin only.
pub async fn list_settings(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let settings = sqlx::query_as::<_, GeneralSetting>(
        "SELECT id, key, value, description, created_at, updated_at FROM general_settings ORDER BY key",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list settings: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(settings))
}

/// Creates or replaces a setting. The value must be a URL.
/// Admin only.
pub async fn upsert_setting(
    State(pool): State<SqlitePool>,
    Path(key): Path<String>,
    Json(payload): Json<UpsertSettingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let key = SettingKey::parse(&key)?;
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let now = Utc::now();
    let description = payload
        .description
        .unwrap_or_else(|| key.description().to_string());

    let setting = sqlx::query_as::<_, GeneralSetting>(
        r#"
        INSERT INTO general_settings (key, value, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            description = excluded.description,
            updated_at = excluded.updated_at
        RETURNING id, key, value, description, created_at, updated_at
        "#,
    )
    .bind(key.as_str())
    .bind(payload.value.trim())
    .bind(description)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save setting {}: {:?}", key.as_str(), e);
        AppError::from(e)
    })?;

    tracing::info!("Setting {} updated", key.as_str());
    Ok(Json(setting))
}
