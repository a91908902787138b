// src/utils/draft.rs

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::{
    error::AppError,
    models::quiz::{Quiz, QuizDraft},
};

const DRAFT_PREFIX: &str = "quiz_draft_";

/// Quiz editor drafts, one JSON file per quiz.
///
/// `save_debounced` coalesces rapid edits: each call cancels the pending write
/// for the same quiz and schedules a new one after the debounce delay.
#[derive(Clone)]
pub struct DraftStore {
    dir: PathBuf,
    debounce: Duration,
    pending: Arc<Mutex<HashMap<i64, JoinHandle<()>>>>,
}

impl DraftStore {
    pub fn new(dir: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            dir: dir.into(),
            debounce,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn path_for(&self, quiz_id: i64) -> PathBuf {
        self.dir.join(format!("{}{}.json", DRAFT_PREFIX, quiz_id))
    }

    /// Writes the draft immediately. A pending debounced write for this quiz is dropped.
    pub async fn save(&self, quiz_id: i64, quiz: &Quiz) -> Result<QuizDraft, AppError> {
        self.cancel_pending(quiz_id);
        write_draft(&self.dir, &self.path_for(quiz_id), quiz).await
    }

    /// Schedules a write after the debounce delay, replacing any pending one for this quiz.
    pub fn save_debounced(&self, quiz_id: i64, quiz: Quiz) {
        let dir = self.dir.clone();
        let path = self.path_for(quiz_id);
        let delay = self.debounce;
        let pending = self.pending.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match write_draft(&dir, &path, &quiz).await {
                Ok(_) => tracing::debug!("Draft saved for quiz {}", quiz_id),
                Err(e) => tracing::error!("Failed to save draft for quiz {}: {:?}", quiz_id, e),
            }
            if let Some(task) = tokio::task::try_id() {
                forget_finished(&pending, quiz_id, task);
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.insert(quiz_id, handle) {
            previous.abort();
        }
    }

    fn cancel_pending(&self, quiz_id: i64) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pending.remove(&quiz_id) {
            handle.abort();
        }
    }

    /// `Ok(None)` when no draft exists. An unreadable draft is logged and treated as absent.
    pub async fn load(&self, quiz_id: i64) -> Result<Option<QuizDraft>, AppError> {
        let raw = match tokio::fs::read(self.path_for(quiz_id)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                tracing::error!("Corrupt draft for quiz {}: {}", quiz_id, e);
                Ok(None)
            }
        }
    }

    pub async fn delete(&self, quiz_id: i64) -> Result<(), AppError> {
        self.cancel_pending(quiz_id);
        match tokio::fs::remove_file(self.path_for(quiz_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, quiz_id: i64) -> bool {
        tokio::fs::try_exists(self.path_for(quiz_id)).await.unwrap_or(false)
    }

    /// Ids of every quiz that has a draft, ascending.
    pub async fn list_ids(&self) -> Result<Vec<i64>, AppError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name
                .to_str()
                .and_then(|n| n.strip_prefix(DRAFT_PREFIX))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<i64>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    pub async fn clear(&self) -> Result<usize, AppError> {
        let ids = self.list_ids().await?;
        for id in &ids {
            self.delete(*id).await?;
        }
        Ok(ids.len())
    }
}

/// Removes the pending entry for `quiz_id` only if it still belongs to `task`.
/// A newer write scheduled meanwhile keeps its handle so it can still be cancelled.
fn forget_finished(pending: &Mutex<HashMap<i64, JoinHandle<()>>>, quiz_id: i64, task: tokio::task::Id) {
    let mut pending = pending.lock().unwrap_or_else(|e| e.into_inner());
    if pending.get(&quiz_id).is_some_and(|handle| handle.id() == task) {
        pending.remove(&quiz_id);
    }
}

async fn write_draft(dir: &Path, path: &Path, quiz: &Quiz) -> Result<QuizDraft, AppError> {
    let draft = QuizDraft {
        quiz: quiz.clone(),
        saved_at: Utc::now(),
    };
    let body = serde_json::to_vec_pretty(&draft)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tokio::fs::create_dir_all(dir).await?;
    // Readers only ever see complete files.
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(draft)
}
