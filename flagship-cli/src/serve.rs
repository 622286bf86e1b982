use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{self, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use flagship_lib::FeatureFlag;
use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::RwLock;
use tower_http::compression::CompressionLayer;

/// Flags served by the local mock backend.
pub struct ServeState {
    pub flags: RwLock<Vec<FeatureFlag>>,
    /// When set, only this application key is answered.
    pub app_key: Option<String>,
}

pub fn parse_flags(content: &str) -> Option<Vec<FeatureFlag>> {
    match serde_json::from_str(content) {
        Ok(flags) => Some(flags),
        Err(e) => {
            tracing::warn!(error = %e, "invalid flags file");
            None
        }
    }
}

async fn handle_health(State(state): State<Arc<ServeState>>) -> Json<serde_json::Value> {
    let flags = state.flags.read().await;
    Json(serde_json::json!({
        "status": "ok",
        "flags_loaded": flags.len()
    }))
}

async fn handle_flags(
    State(state): State<Arc<ServeState>>,
    extract::Path(app_key): extract::Path<String>,
) -> Response {
    if let Some(ref expected) = state.app_key {
        if *expected != app_key {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "unknown application key"})),
            )
                .into_response();
        }
    }
    let flags = state.flags.read().await;
    (StatusCode::OK, Json(flags.clone())).into_response()
}

pub fn router(state: Arc<ServeState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/sdk/{app_key}/flags", get(handle_flags))
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// True when `event` writes the watched file.
fn is_reload_event(event: &notify::Event, file_name: &OsStr) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event.paths.iter().any(|p| p.file_name() == Some(file_name))
}

async fn reload(state: &ServeState, path: &Path) {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            if let Some(flags) = parse_flags(&content) {
                tracing::info!(count = flags.len(), "flags reloaded");
                *state.flags.write().await = flags;
            }
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to read flags file"),
    }
}

/// Reloads the served flags whenever `path` changes. Bursts of events are
/// collapsed into one reload.
pub async fn watch_flags_file(state: Arc<ServeState>, path: PathBuf) -> notify::Result<()> {
    let Some(file_name) = path.file_name().map(OsStr::to_os_string) else {
        return Ok(());
    };
    let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if matches!(res, Ok(ref event) if is_reload_event(event, &file_name)) {
            let _ = tx.try_send(());
        }
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    tracing::info!(path = %path.display(), "watching flags file");

    while rx.recv().await.is_some() {
        tokio::time::sleep(Duration::from_millis(500)).await;
        while rx.try_recv().is_ok() {}
        reload(&state, &path).await;
    }
    Ok(())
}

pub async fn run_serve(file: &str, port: u16, app_key: Option<String>) {
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(_) => {
            eprintln!("{} does not exist", file);
            process::exit(1);
        }
    };

    let flags = match parse_flags(&content) {
        Some(flags) => flags,
        None => {
            eprintln!("Initial parsing of {} failed", file);
            process::exit(1);
        }
    };

    let state = Arc::new(ServeState {
        flags: RwLock::new(flags),
        app_key,
    });

    let watcher_path = PathBuf::from(file)
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(file));
    let watched = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = watch_flags_file(watched, watcher_path).await {
            tracing::warn!(error = %e, "file watcher stopped, flags will not reload");
        }
    });

    let addr = format!("0.0.0.0:{}", port);
    println!("Serving {} on http://{}", file, addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Failed to bind to {}: {}", addr, e);
            process::exit(1);
        });

    axum::serve(listener, router(state))
        .await
        .unwrap_or_else(|e| {
            eprintln!("Server error: {}", e);
            process::exit(1);
        });
}
