// src/utils/storage.rs

//! Single-bucket object storage and the document library built on top of it.
//!
//! Folders are not real objects: a folder exists while at least one object
//! (possibly the empty `.folderkeep` marker) lives under its prefix.

use std::{
    path::{Component, Path, PathBuf},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::{
    config::STORAGE_LIST_TIMEOUT_SECS,
    error::AppError,
    models::document::{DocumentFile, DocumentFolder, StorageObject},
};

pub const FOLDER_MARKER: &str = ".folderkeep";
pub const ROOT_FOLDER_NAME: &str = "General";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Direct children of `prefix` ("" for the bucket root), sorted by name.
    async fn list(&self, prefix: &str) -> Result<Vec<StorageObject>, AppError>;

    /// Stores a new object. Fails with `Conflict` if `path` is taken.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), AppError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, AppError>;

    /// Removes objects; missing paths are ignored.
    async fn remove(&self, paths: &[String]) -> Result<(), AppError>;

    async fn rename(&self, from: &str, to: &str) -> Result<(), AppError>;
}

/// Bucket stored as a directory tree on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the bucket directory if it does not exist yet.
    pub async fn ensure_bucket(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, AppError> {
        let relative = normalize_path(path)?;
        Ok(self.root.join(relative))
    }

    /// Removes now-empty directories between `path` and the bucket root.
    async fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            if tokio::fs::remove_dir(dir).await.is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StorageObject>, AppError> {
        let dir = self.resolve(prefix)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                objects.push(StorageObject {
                    name,
                    id: None,
                    size: None,
                    mimetype: None,
                    created_at: None,
                    updated_at: None,
                });
            } else {
                let id = join_path(prefix.trim_matches('/'), &name);
                objects.push(StorageObject {
                    mimetype: Some(guess_mimetype(&name).to_string()),
                    name,
                    id: Some(id),
                    size: Some(meta.len()),
                    created_at: meta.created().ok().map(to_utc),
                    updated_at: meta.modified().ok().map(to_utc),
                });
            }
        }
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), AppError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    AppError::Conflict(format!("Object '{}' already exists", path))
                }
                _ => AppError::from(e),
            })?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, AppError> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound(format!("Object '{}' not found", path)),
            _ => AppError::from(e),
        })
    }

    async fn remove(&self, paths: &[String]) -> Result<(), AppError> {
        for path in paths {
            let target = self.resolve(path)?;
            match tokio::fs::remove_file(&target).await {
                Ok(()) => self.prune_empty_parents(&target).await,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), AppError> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;

        if !tokio::fs::try_exists(&source).await? {
            return Err(AppError::NotFound(format!("Object '{}' not found", from)));
        }
        if tokio::fs::try_exists(&target).await? {
            return Err(AppError::Conflict(format!("Object '{}' already exists", to)));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(&source, &target).await?;
        self.prune_empty_parents(&source).await;
        Ok(())
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Validates a bucket-relative path and returns it without leading/trailing slashes.
/// The empty string designates the bucket root.
pub fn normalize_path(path: &str) -> Result<String, AppError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    for segment in trimmed.split('/') {
        if segment.is_empty() || segment.contains('\\') {
            return Err(AppError::BadRequest(format!("Invalid path '{}'", path)));
        }
        let mut components = Path::new(segment).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(AppError::BadRequest(format!("Invalid path '{}'", path)));
        }
    }
    Ok(trimmed.to_string())
}

pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Rejects files above `max_bytes` before anything is written.
pub fn validate_file_size(name: &str, size: u64, max_bytes: u64) -> Result<(), AppError> {
    if size > max_bytes {
        return Err(AppError::BadRequest(format!(
            "File '{}' ({}) exceeds maximum allowed size ({})",
            name,
            format_megabytes(size),
            format_megabytes(max_bytes)
        )));
    }
    Ok(())
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / 1024.0 / 1024.0)
}

/// "0 Bytes", "512 Bytes", "1.5 KB", "2.25 MB".
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Upper-cased extension, `FILE` when there is none.
pub fn file_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_uppercase(),
        _ => "FILE".to_string(),
    }
}

pub fn file_type_icon(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "pdf" => "pdf",
        "doc" | "docx" => "word",
        "xls" | "xlsx" => "excel",
        "ppt" | "pptx" => "powerpoint",
        "jpg" | "jpeg" | "png" | "gif" | "svg" => "image",
        "mp4" | "avi" | "mov" | "wmv" => "video",
        "mp3" | "wav" | "flac" => "audio",
        "zip" | "rar" | "7z" => "archive",
        _ => "file",
    }
}

pub fn guess_mimetype(name: &str) -> &'static str {
    match file_extension(name).to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "zip" => "application/zip",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Public download URL of `path`, served under `/storage/<bucket>/`.
pub fn public_url(base: &str, bucket: &str, path: &str) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push("storage").push(bucket);
                segments.extend(path.split('/'));
            }
            url.to_string()
        }
        Err(_) => format!("{}/storage/{}/{}", base.trim_end_matches('/'), bucket, path),
    }
}

/// `list` bounded by the storage listing timeout.
pub async fn list_with_timeout(
    store: &dyn ObjectStore,
    prefix: &str,
) -> Result<Vec<StorageObject>, AppError> {
    match tokio::time::timeout(Duration::from_secs(STORAGE_LIST_TIMEOUT_SECS), store.list(prefix)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Unavailable(format!(
            "Listing '{}' timed out, please try again",
            prefix
        ))),
    }
}

/// Size-checks then stores one upload. Returns the object path.
pub async fn upload_file(
    store: &dyn ObjectStore,
    max_bytes: u64,
    folder: &str,
    file_name: &str,
    bytes: &[u8],
) -> Result<String, AppError> {
    validate_file_size(file_name, bytes.len() as u64, max_bytes)?;
    let folder = normalize_path(folder)?;
    let path = normalize_path(&join_path(&folder, file_name))?;
    store.put(&path, bytes).await?;
    Ok(path)
}

pub async fn create_folder(store: &dyn ObjectStore, parent: &str, name: &str) -> Result<String, AppError> {
    let folder = normalize_path(&join_path(parent, name))?;
    if folder.is_empty() {
        return Err(AppError::BadRequest("Folder name is required".to_string()));
    }
    store.put(&join_path(&folder, FOLDER_MARKER), b"").await?;
    Ok(folder)
}

/// Deletes every object under `folder`, nested folders included.
pub async fn delete_folder(store: &dyn ObjectStore, folder: &str) -> Result<usize, AppError> {
    let folder = normalize_path(folder)?;
    if folder.is_empty() {
        return Err(AppError::BadRequest("Refusing to delete the bucket root".to_string()));
    }

    let mut pending = vec![folder];
    let mut removed = 0;
    while let Some(prefix) = pending.pop() {
        let mut files = Vec::new();
        for object in list_with_timeout(store, &prefix).await? {
            let path = join_path(&prefix, &object.name);
            if object.is_folder() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
        removed += files.len();
        store.remove(&files).await?;
    }
    Ok(removed)
}

/// Metadata of a single object, `None` if it does not exist.
pub async fn object_metadata(store: &dyn ObjectStore, path: &str) -> Result<Option<StorageObject>, AppError> {
    let path = normalize_path(path)?;
    let (parent, name) = match path.rsplit_once('/') {
        Some((parent, name)) => (parent.to_string(), name.to_string()),
        None => (String::new(), path.clone()),
    };
    Ok(list_with_timeout(store, &parent)
        .await?
        .into_iter()
        .find(|o| o.name == name && !o.is_folder()))
}

fn to_document(object: StorageObject, folder: &str, path: String, url: String) -> DocumentFile {
    let file_extension = file_extension(&object.name);
    let size = object.size.unwrap_or(0);
    DocumentFile {
        id: object.id.unwrap_or_else(|| path.clone()),
        icon: file_type_icon(&file_extension),
        size_display: format_file_size(size),
        mimetype: object
            .mimetype
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        name: object.name,
        path,
        size,
        created_at: object.created_at,
        updated_at: object.updated_at,
        folder: folder.to_string(),
        download_url: url,
        file_extension,
    }
}

/// Files directly inside `folder`, skipping nested folders and markers, sorted by name.
pub async fn documents_in_folder(
    store: &dyn ObjectStore,
    folder: &str,
    url_for: &(dyn Fn(&str) -> String + Send + Sync),
) -> Result<Vec<DocumentFile>, AppError> {
    let folder = normalize_path(folder)?;
    let mut documents: Vec<DocumentFile> = list_with_timeout(store, &folder)
        .await?
        .into_iter()
        .filter(|o| !o.is_folder() && o.name != FOLDER_MARKER)
        .map(|o| {
            let path = join_path(&folder, &o.name);
            let url = url_for(&path);
            to_document(o, &folder, path, url)
        })
        .collect();
    documents.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(documents)
}

/// The public library: one group per top-level folder, root files under "General".
/// Empty folders are left out; groups are sorted by name.
pub async fn documents_by_folders(
    store: &dyn ObjectStore,
    url_for: &(dyn Fn(&str) -> String + Send + Sync),
) -> Result<Vec<DocumentFolder>, AppError> {
    let mut root_documents = Vec::new();
    let mut folders = Vec::new();

    for item in list_with_timeout(store, "").await? {
        if item.is_folder() {
            match documents_in_folder(store, &item.name, url_for).await {
                Ok(documents) if !documents.is_empty() => folders.push(DocumentFolder {
                    count: documents.len(),
                    name: item.name,
                    documents,
                }),
                Ok(_) => {}
                Err(e) => tracing::error!("Failed to list folder {}: {:?}", item.name, e),
            }
        } else if item.name != FOLDER_MARKER {
            let path = item.name.clone();
            let url = url_for(&path);
            root_documents.push(to_document(item, ROOT_FOLDER_NAME, path, url));
        }
    }

    if !root_documents.is_empty() {
        root_documents.sort_by(|a, b| a.name.cmp(&b.name));
        match folders.iter_mut().find(|f| f.name == ROOT_FOLDER_NAME) {
            Some(general) => {
                general.documents.extend(root_documents);
                general.documents.sort_by(|a, b| a.name.cmp(&b.name));
                general.count = general.documents.len();
            }
            None => folders.push(DocumentFolder {
                name: ROOT_FOLDER_NAME.to_string(),
                count: root_documents.len(),
                documents: root_documents,
            }),
        }
    }

    folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_bucket() -> LocalObjectStore {
        LocalObjectStore::new(std::env::temp_dir().join(format!("bucket_{}", uuid::Uuid::new_v4())))
    }

    fn url(path: &str) -> String {
        format!("http://cdn.test/{}", path)
    }

    /// Counts calls and stores nothing.
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn list(&self, _prefix: &str) -> Result<Vec<StorageObject>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
        async fn put(&self, _path: &str, _bytes: &[u8]) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn get(&self, _path: &str) -> Result<Vec<u8>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
        async fn remove(&self, _paths: &[String]) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn rename(&self, _from: &str, _to: &str) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// A backend whose listing never answers.
    struct StalledStore;

    #[async_trait]
    impl ObjectStore for StalledStore {
        async fn list(&self, _prefix: &str) -> Result<Vec<StorageObject>, AppError> {
            std::future::pending().await
        }
        async fn put(&self, _path: &str, _bytes: &[u8]) -> Result<(), AppError> {
            Ok(())
        }
        async fn get(&self, _path: &str) -> Result<Vec<u8>, AppError> {
            Ok(Vec::new())
        }
        async fn remove(&self, _paths: &[String]) -> Result<(), AppError> {
            Ok(())
        }
        async fn rename(&self, _from: &str, _to: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_listing_times_out() {
        let started = tokio::time::Instant::now();

        let err = list_with_timeout(&StalledStore, "Mekong").await.unwrap_err();

        assert!(matches!(err, AppError::Unavailable(ref msg) if msg.contains("Mekong")), "{:?}", err);
        assert_eq!(started.elapsed().as_secs(), STORAGE_LIST_TIMEOUT_SECS);
    }

    #[tokio::test]
    async fn oversized_upload_never_reaches_the_store() {
        let store = CountingStore::default();
        let bytes = vec![0u8; 2 * 1024 * 1024];

        let err = upload_file(&store, 1024 * 1024, "reports", "atlas.pdf", &bytes)
            .await
            .unwrap_err();

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        match err {
            AppError::BadRequest(msg) => {
                assert!(msg.contains("atlas.pdf"), "{}", msg);
                assert!(msg.contains("2.00MB"), "{}", msg);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn upload_at_the_limit_is_accepted() {
        let store = CountingStore::default();
        let path = upload_file(&store, 4, "", "a.txt", b"abcd").await.unwrap();
        assert_eq!(path, "a.txt");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn traversal_paths_are_rejected() {
        assert!(normalize_path("../etc/passwd").is_err());
        assert!(normalize_path("docs/../../x").is_err());
        assert!(normalize_path("docs//x").is_err());
        assert!(normalize_path("docs/./x").is_err());
        assert_eq!(normalize_path("/docs/x.pdf/").unwrap(), "docs/x.pdf");
        assert_eq!(normalize_path("").unwrap(), "");
    }

    #[test]
    fn human_sizes_and_extensions() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
        assert_eq!(file_extension("atlas.final.PDF"), "PDF");
        assert_eq!(file_extension("README"), "FILE");
        assert_eq!(file_type_icon("DOCX"), "word");
        assert_eq!(file_type_icon("exe"), "file");
        assert_eq!(guess_mimetype("map.png"), "image/png");
    }

    #[test]
    fn public_urls_are_percent_encoded() {
        assert_eq!(
            public_url("http://localhost:3000", "documents", "Bài giảng/vùng 1.pdf"),
            "http://localhost:3000/storage/documents/B%C3%A0i%20gi%E1%BA%A3ng/v%C3%B9ng%201.pdf"
        );
    }

    #[tokio::test]
    async fn folders_exist_through_markers() {
        let store = temp_bucket();
        store.ensure_bucket().await.unwrap();

        let folder = create_folder(&store, "", "Zone 1").await.unwrap();
        assert_eq!(folder, "Zone 1");
        let root = store.list("").await.unwrap();
        assert_eq!(root.len(), 1);
        assert!(root[0].is_folder());

        assert!(matches!(
            create_folder(&store, "", "Zone 1").await,
            Err(AppError::Conflict(_))
        ));

        store.put("Zone 1/slides.pptx", b"ppt").await.unwrap();
        assert_eq!(delete_folder(&store, "Zone 1").await.unwrap(), 2);
        assert!(store.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn library_groups_by_folder() {
        let store = temp_bucket();
        store.put("intro.pdf", b"1").await.unwrap();
        store.put(FOLDER_MARKER, b"").await.unwrap();
        store.put("Mekong/rice.docx", b"22").await.unwrap();
        store.put("Mekong/aqua.pdf", b"333").await.unwrap();
        store.put("Mekong/nested/deep.pdf", b"4").await.unwrap();
        create_folder(&store, "", "Empty").await.unwrap();

        let folders = documents_by_folders(&store, &url).await.unwrap();
        let names: Vec<&str> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["General", "Mekong"]);

        let mekong = &folders[1];
        assert_eq!(mekong.count, 2);
        assert_eq!(mekong.documents[0].name, "aqua.pdf");
        assert_eq!(mekong.documents[0].path, "Mekong/aqua.pdf");
        assert_eq!(mekong.documents[0].download_url, "http://cdn.test/Mekong/aqua.pdf");
        assert_eq!(mekong.documents[1].file_extension, "DOCX");
        assert_eq!(mekong.documents[1].mimetype, guess_mimetype("rice.docx"));

        assert_eq!(folders[0].documents[0].folder, "General");
        assert_eq!(folders[0].documents[0].size, 1);
    }

    #[tokio::test]
    async fn move_and_metadata() {
        let store = temp_bucket();
        store.put("a/one.txt", b"hello").await.unwrap();
        store.rename("a/one.txt", "b/two.txt").await.unwrap();

        assert!(object_metadata(&store, "a/one.txt").await.unwrap().is_none());
        let meta = object_metadata(&store, "b/two.txt").await.unwrap().unwrap();
        assert_eq!(meta.size, Some(5));
        assert_eq!(store.get("b/two.txt").await.unwrap(), b"hello");
        assert!(matches!(store.get("a/one.txt").await, Err(AppError::NotFound(_))));
        assert!(store.list("").await.unwrap().iter().all(|o| o.name != "a"));
    }
}
