// server/core.rs

use std::{
    any::Any,
    io,
    path::PathBuf,
    sync::Arc,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::{
        IntoResponse,
        Response,
    },
    routing::{
        get,
        post,
    },
};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use tracing::{
    error,
    info,
};

use super::{
    AppState,
    endpoints::*,
    error::ApiError,
};
use crate::config::Config;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_SLACK: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to create storage directory {path:?}: {source}")]
    StorageDir {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr:   String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// # Builds the application router
///
/// Every body is capped at `max_form_size` except uploads, which get the upload ceiling plus
/// multipart overhead. The exact file size is enforced while streaming.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = usize::try_from(state.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_SLACK);

    Router::new()
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/music", get(list_music))
        .route(&format!("{UPLOADS_PREFIX}/{{filename}}"), get(download))
        .layer(DefaultBodyLimit::max(state.max_form_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .with_state(state)
}

/// Turns a handler panic into a logged 500
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "Unknown error".to_string()
    };

    error!("Handler panicked: {message}");
    ApiError::Internal(message).into_response()
}

pub async fn serve(config: &Config) -> Result<(), ServeError> {
    let state = Arc::new(AppState::from_config(config));

    state
        .storage
        .ensure()
        .await
        .map_err(|source| {
            ServeError::StorageDir {
                path: state.storage.root().to_path_buf(),
                source,
            }
        })?;
    info!(
        "Storing uploads in {:?} ({:?} profile, {} byte limit)",
        state.storage.root(),
        state.profile,
        state.max_upload_size
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| {
            ServeError::Bind {
                addr: addr.clone(),
                source,
            }
        })?;

    info!("Listening on http://{addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
