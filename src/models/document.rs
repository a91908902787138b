// src/models/document.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An entry of a bucket listing.
/// Folders carry neither `id` nor `size`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageObject {
    pub name: String,
    pub id: Option<String>,
    pub size: Option<u64>,
    pub mimetype: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StorageObject {
    pub fn is_folder(&self) -> bool {
        self.id.is_none() && self.size.is_none()
    }
}

/// A downloadable document as shown in the public library.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFile {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub size_display: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub mimetype: String,
    pub folder: String,
    pub download_url: String,
    pub file_extension: String,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentFolder {
    pub name: String,
    pub count: usize,
    pub documents: Vec<DocumentFile>,
}

#[derive(Debug, Deserialize)]
pub struct PathParams {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFolderRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub parent: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteFilesRequest {
    #[validate(length(min = 1, max = 1000))]
    pub paths: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MoveRequest {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub path: String,
    pub size: u64,
    pub public_url: String,
}
