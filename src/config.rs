// src/config.rs

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use dotenvy::dotenv;

/// Memo window shared by the quiz, analytics and document caches.
pub const CACHE_TTL_SECS: u64 = 5 * 60;

/// Hard limit for a single storage listing call.
pub const STORAGE_LIST_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_STORAGE_BUCKET: &str = "documents";

/// 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 52_428_800;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub port: u16,
    pub storage_root: String,
    pub storage_bucket: String,
    pub max_file_size: u64,
    pub public_base_url: String,
    /// File path or http(s) URL of the GADM level-1 province boundaries.
    pub boundary_source: String,
    pub draft_dir: String,
    pub draft_debounce_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/econzones.db".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 86_400),
            rust_log,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            port: parse_or("PORT", 3000),
            storage_root: var_or("STORAGE_ROOT", "data/storage"),
            storage_bucket: var_or("STORAGE_BUCKET", DEFAULT_STORAGE_BUCKET),
            max_file_size: parse_or("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
            public_base_url: var_or("PUBLIC_BASE_URL", "http://localhost:3000"),
            boundary_source: var_or("BOUNDARY_SOURCE", "data/gadm41_VNM_1.json"),
            draft_dir: var_or("DRAFT_DIR", "data/drafts"),
            draft_debounce_ms: parse_or("DRAFT_DEBOUNCE_MS", 2000),
        }
    }
}

impl Config {
    /// Directory backing the document bucket.
    pub fn bucket_dir(&self) -> PathBuf {
        Path::new(&self.storage_root).join(&self.storage_bucket)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
