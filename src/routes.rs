// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin, analytics, auth, document, draft, quiz, settings, zone},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Multipart framing on top of the file bytes.
const UPLOAD_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, zones, quizzes, analytics, documents, settings, admin).
/// * Serves bucket objects under `/storage/<bucket>/`.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let mut origins = vec![
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];
    if let Ok(origin) = HeaderValue::from_str(state.config.public_base_url.trim_end_matches('/')) {
        origins.push(origin);
    }

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me).put(auth::update_me))
                .layer(require_auth.clone()),
        );

    let zone_routes = Router::new()
        .route("/", get(zone::list_zones))
        .route("/boundaries", get(zone::get_boundaries))
        .route("/provinces", get(zone::list_provinces))
        .route("/{id}", get(zone::get_zone));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        .route("/{id}/submit", post(quiz::submit_quiz));

    let analytics_routes = Router::new()
        .route("/visits", post(analytics::track_visit))
        .route(
            "/sessions/{session_id}/duration",
            put(analytics::update_session_duration),
        );

    let document_routes = Router::new()
        .route("/", get(document::list_documents))
        .route("/folders/{folder}", get(document::list_folder_documents));

    let upload_limit = state
        .config
        .max_file_size
        .saturating_mul(2)
        .saturating_add(UPLOAD_OVERHEAD_BYTES);
    let upload_limit = usize::try_from(upload_limit).unwrap_or(usize::MAX);

    let admin_routes = Router::new()
        .route("/zones/report", get(zone::match_report))
        .route("/quizzes", get(admin::list_quizzes).post(admin::create_quiz))
        .route(
            "/quizzes/{id}",
            get(admin::get_quiz)
                .put(admin::update_quiz)
                .delete(admin::delete_quiz),
        )
        .route("/quizzes/{id}/content", put(admin::save_quiz_content))
        .route(
            "/quizzes/{id}/draft",
            get(draft::get_draft)
                .put(draft::save_draft)
                .delete(draft::delete_draft),
        )
        .route("/quizzes/{id}/draft/exists", get(draft::has_draft))
        .route("/drafts", get(draft::list_drafts).delete(draft::clear_drafts))
        .route("/analytics/stats", get(analytics::get_stats))
        .route("/analytics/hourly", get(analytics::get_hourly))
        .route("/analytics/pages", get(analytics::get_top_pages))
        .route("/analytics/devices", get(analytics::get_devices))
        .route("/analytics/browsers", get(analytics::get_browsers))
        .route("/analytics/trend", get(analytics::get_trend))
        .route("/analytics/visits", get(analytics::list_visits))
        .route("/storage", get(document::list_storage))
        .route(
            "/storage/upload",
            post(document::upload_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/storage/folders",
            post(document::create_folder).delete(document::delete_folder),
        )
        .route("/storage/files", delete(document::delete_files))
        .route("/storage/move", post(document::move_object))
        .route("/storage/download", get(document::download))
        .route("/storage/metadata", get(document::metadata))
        .route("/settings", get(settings::list_settings))
        .route("/settings/{key}", put(settings::upsert_setting))
        // Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth);

    let bucket_dir = state.config.bucket_dir();
    let bucket_mount = format!("/storage/{}", state.config.storage_bucket);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/zones", zone_routes)
        .route("/api/map/config", get(zone::get_map_config))
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/analytics", analytics_routes)
        .nest("/api/documents", document_routes)
        .route("/api/settings/{key}", get(settings::get_setting))
        .nest("/api/admin", admin_routes)
        .nest_service(&bucket_mount, ServeDir::new(bucket_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
