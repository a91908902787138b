// src/state.rs

use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;
use sqlx::SqlitePool;
use tokio::sync::OnceCell;

use crate::{
    config::{CACHE_TTL_SECS, Config},
    error::AppError,
    models::{
        document::DocumentFolder,
        quiz::{Quiz, QuizListItem},
    },
    utils::{
        boundary::{BoundaryData, load_provinces},
        cache::TtlCache,
        draft::DraftStore,
        storage::ObjectStore,
    },
};

/// Memos shared by all requests.
pub struct Caches {
    /// Keyed by listing scope ("published" or "all").
    pub quiz_lists: TtlCache<&'static str, Arc<Vec<QuizListItem>>>,
    pub quizzes: TtlCache<i64, Arc<Quiz>>,
    /// Keyed by endpoint and query parameters.
    pub analytics: TtlCache<String, serde_json::Value>,
    pub documents: TtlCache<(), Arc<Vec<DocumentFolder>>>,
}

impl Caches {
    pub fn new(ttl: Duration) -> Self {
        Self {
            quiz_lists: TtlCache::new(ttl),
            quizzes: TtlCache::new(ttl),
            analytics: TtlCache::new(ttl),
            documents: TtlCache::new(ttl),
        }
    }

    /// Drops every memo derived from quiz `id`.
    pub fn invalidate_quiz(&self, id: i64) {
        self.quizzes.invalidate(&id);
        self.quiz_lists.clear();
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new(Duration::from_secs(CACHE_TTL_SECS))
    }
}

/// Province boundaries, loaded on first use and kept for the process lifetime.
/// A failed load leaves the cell empty so the next request retries.
#[derive(Clone)]
pub struct Boundaries {
    source: String,
    cell: Arc<OnceCell<Arc<BoundaryData>>>,
}

impl Boundaries {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            cell: Arc::new(OnceCell::new()),
        }
    }

    pub async fn get(&self) -> Result<Arc<BoundaryData>, AppError> {
        self.cell
            .get_or_try_init(|| async {
                let provinces = load_provinces(&self.source).await?;
                Ok(Arc::new(BoundaryData::build(&provinces)?))
            })
            .await
            .cloned()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub caches: Arc<Caches>,
    pub boundaries: Boundaries,
    pub storage: Arc<dyn ObjectStore>,
    pub drafts: DraftStore,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, storage: Arc<dyn ObjectStore>) -> Self {
        Self {
            boundaries: Boundaries::new(config.boundary_source.clone()),
            drafts: DraftStore::new(
                config.draft_dir.clone(),
                Duration::from_millis(config.draft_debounce_ms),
            ),
            caches: Arc::new(Caches::default()),
            storage,
            pool,
            config,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<Caches> {
    fn from_ref(state: &AppState) -> Self {
        state.caches.clone()
    }
}

impl FromRef<AppState> for Boundaries {
    fn from_ref(state: &AppState) -> Self {
        state.boundaries.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ObjectStore> {
    fn from_ref(state: &AppState) -> Self {
        state.storage.clone()
    }
}

impl FromRef<AppState> for DraftStore {
    fn from_ref(state: &AppState) -> Self {
        state.drafts.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_boundary_load_is_retried() {
        let path = std::env::temp_dir().join(format!("provinces_{}.json", uuid::Uuid::new_v4()));
        let boundaries = Boundaries::new(path.to_string_lossy().into_owned());

        let err = boundaries.get().await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)), "{:?}", err);

        let data = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "NAME_1": "HàNội" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[105.0, 21.0], [106.0, 21.0], [106.0, 22.0], [105.0, 21.0]]]
                }
            }]
        });
        tokio::fs::write(&path, data.to_string()).await.unwrap();

        let loaded = boundaries.get().await.unwrap();
        assert_eq!(loaded.province_names, vec!["HàNội".to_string()]);

        // Later failures of the source no longer matter once loaded.
        tokio::fs::remove_file(&path).await.unwrap();
        let again = boundaries.get().await.unwrap();
        assert!(Arc::ptr_eq(&loaded, &again));
    }
}
