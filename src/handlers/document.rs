// src/handlers/document.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::document::{CreateFolderRequest, DeleteFilesRequest, MoveRequest, PathParams, UploadResponse},
    state::Caches,
    utils::storage::{
        self, ObjectStore, documents_by_folders, documents_in_folder, guess_mimetype,
        list_with_timeout, normalize_path, object_metadata, public_url, upload_file,
    },
};

fn url_builder(config: &Config) -> impl Fn(&str) -> String + Send + Sync + '_ {
    move |path: &str| public_url(&config.public_base_url, &config.storage_bucket, path)
}

/// The document library grouped by folder. Root files are listed under "General".
pub async fn list_documents(
    State(store): State<Arc<dyn ObjectStore>>,
    State(caches): State<Arc<Caches>>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    let url_for = url_builder(&config);
    let store = store.as_ref();
    let url_for = &url_for;

    let folders = caches
        .documents
        .get_or_try_init((), move || async move {
            documents_by_folders(store, url_for).await.map(Arc::new)
        })
        .await?;

    Ok(Json(folders.as_ref().clone()))
}

/// Documents directly inside one folder.
pub async fn list_folder_documents(
    State(store): State<Arc<dyn ObjectStore>>,
    State(config): State<Config>,
    Path(folder): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let url_for = url_builder(&config);
    let documents = documents_in_folder(store.as_ref(), &folder, &url_for).await?;
    Ok(Json(documents))
}

/// Raw listing of a bucket folder, folders included.
/// Admin only.
pub async fn list_storage(
    State(store): State<Arc<dyn ObjectStore>>,
    Query(params): Query<PathParams>,
) -> Result<impl IntoResponse, AppError> {
    let prefix = normalize_path(&params.path)?;
    Ok(Json(list_with_timeout(store.as_ref(), &prefix).await?))
}

/// Uploads every file field of a multipart body into `?path=`.
///
/// Each file is size-checked before anything is stored; existing objects are
/// never overwritten.
/// Admin only.
pub async fn upload_files(
    State(store): State<Arc<dyn ObjectStore>>,
    State(caches): State<Arc<Caches>>,
    State(config): State<Config>,
    Query(params): Query<PathParams>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut uploaded = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;

        let path = upload_file(
            store.as_ref(),
            config.max_file_size,
            &params.path,
            &file_name,
            &bytes,
        )
        .await
        .inspect_err(|e| tracing::warn!("Upload of {} rejected: {:?}", file_name, e))?;

        // Earlier files of this request are already stored.
        caches.documents.clear();

        tracing::info!("Uploaded {} ({} bytes)", path, bytes.len());
        uploaded.push(UploadResponse {
            public_url: public_url(&config.public_base_url, &config.storage_bucket, &path),
            size: bytes.len() as u64,
            path,
        });
    }

    if uploaded.is_empty() {
        return Err(AppError::BadRequest("No file in request".to_string()));
    }

    Ok((StatusCode::CREATED, Json(uploaded)))
}

/// Admin only.
pub async fn create_folder(
    State(store): State<Arc<dyn ObjectStore>>,
    State(caches): State<Arc<Caches>>,
    Json(payload): Json<CreateFolderRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let folder = storage::create_folder(store.as_ref(), &payload.parent, payload.name.trim()).await?;
    caches.documents.clear();
    Ok((StatusCode::CREATED, Json(json!({ "path": folder }))))
}

/// Deletes a folder and everything below it.
/// Admin only.
pub async fn delete_folder(
    State(store): State<Arc<dyn ObjectStore>>,
    State(caches): State<Arc<Caches>>,
    Query(params): Query<PathParams>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = storage::delete_folder(store.as_ref(), &params.path).await?;
    caches.documents.clear();
    tracing::info!("Deleted folder {} ({} objects)", params.path, deleted);
    Ok(Json(json!({ "deleted": deleted })))
}

/// Admin only.
pub async fn delete_files(
    State(store): State<Arc<dyn ObjectStore>>,
    State(caches): State<Arc<Caches>>,
    Json(payload): Json<DeleteFilesRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let paths = payload
        .paths
        .iter()
        .map(|p| normalize_path(p))
        .collect::<Result<Vec<_>, _>>()?;
    if paths.iter().any(String::is_empty) {
        return Err(AppError::BadRequest("Cannot delete the bucket root".to_string()));
    }

    store.remove(&paths).await?;
    caches.documents.clear();
    Ok(Json(json!({ "deleted": paths.len() })))
}

/// Moves or renames one object.
/// Admin only.
pub async fn move_object(
    State(store): State<Arc<dyn ObjectStore>>,
    State(caches): State<Arc<Caches>>,
    Json(payload): Json<MoveRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let from = normalize_path(&payload.from)?;
    let to = normalize_path(&payload.to)?;
    if from.is_empty() || to.is_empty() {
        return Err(AppError::BadRequest("Both paths are required".to_string()));
    }

    store.rename(&from, &to).await?;
    caches.documents.clear();
    Ok(Json(json!({ "from": from, "to": to })))
}

/// Admin only.
pub async fn download(
    State(store): State<Arc<dyn ObjectStore>>,
    Query(params): Query<PathParams>,
) -> Result<impl IntoResponse, AppError> {
    let path = normalize_path(&params.path)?;
    let bytes = store.get(&path).await?;

    let name = path.rsplit('/').next().unwrap_or(&path);
    let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes())
        .collect::<String>()
        .replace('+', "%20");

    Ok((
        [
            (header::CONTENT_TYPE, guess_mimetype(name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename*=UTF-8''{}", encoded),
            ),
        ],
        bytes,
    ))
}

/// Admin only.
pub async fn metadata(
    State(store): State<Arc<dyn ObjectStore>>,
    Query(params): Query<PathParams>,
) -> Result<impl IntoResponse, AppError> {
    let object = object_metadata(store.as_ref(), &params.path)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Object '{}' not found", params.path)))?;
    Ok(Json(object))
}
