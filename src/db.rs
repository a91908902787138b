// src/db.rs

use std::{str::FromStr, time::Duration};

use chrono::Utc;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{
    config::Config,
    error::AppError,
    models::user::default_username,
    utils::hash::hash_password,
};

/// Opens the pool (creating the database file if needed) and applies migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        // An in-memory database lives only as long as its connection.
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    tracing::info!("Migrations applied successfully.");

    Ok(pool)
}

/// Creates the admin account from `ADMIN_EMAIL` / `ADMIN_PASSWORD` if it does not exist yet.
pub async fn seed_admin_user(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };
    // Accounts are stored and looked up by lowercased email.
    let email = email.trim().to_lowercase();
    let email = email.as_str();

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if existing.is_none() {
        tracing::info!("Seeding admin user: {}", email);
        let hashed_password = hash_password(password)?;

        sqlx::query(
            "INSERT INTO users (email, username, password, role, created_at) VALUES (?, ?, ?, 'admin', ?)",
        )
        .bind(email)
        .bind(default_username(email))
        .bind(hashed_password)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        tracing::info!("Admin user created successfully.");
    }
    Ok(())
}
