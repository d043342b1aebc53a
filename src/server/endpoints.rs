// server/endpoints.rs

use std::{
    fs::Metadata,
    io::SeekFrom,
    sync::Arc,
};

use axum::{
    Json,
    body::Body,
    extract::{
        Multipart,
        Path as Apath,
        State,
        multipart::MultipartRejection,
    },
    http::{
        HeaderMap,
        HeaderValue,
        StatusCode,
        Uri,
        header,
    },
    response::{
        IntoResponse,
        Response,
    },
};
use serde::Serialize;
use tokio::{
    fs::File,
    io::{
        AsyncReadExt,
        AsyncSeekExt,
    },
};
use tokio_util::io::ReaderStream;
use tracing::{
    debug,
    error,
    info,
    warn,
};

use super::{
    AppState,
    error::ApiError,
    range::{
        RangeRequest,
        parse_range,
    },
};
use crate::storage::StoredAudio;

/// Multipart field carrying the upload
pub const UPLOAD_FIELD: &str = "music";
/// Path prefix under which stored files are served
pub const UPLOADS_PREFIX: &str = "/uploads";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success:  bool,
    pub url:      String,
    pub filename: String,
    pub size:     u64,
}

#[derive(Debug, Serialize)]
pub struct MusicEntry {
    pub filename: String,
    pub url:      String,
}

/// # Builds `<scheme>://<host>` for the current request
///
/// The host comes from the `Host` header, or the request URI's authority for HTTP/2. The scheme
/// is `http` unless forwarded headers are trusted.
fn base_url(state: &AppState, headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = state
        .trust_forwarded_proto
        .then(|| header_str(headers, "x-forwarded-proto"))
        .flatten()
        .and_then(|p| p.split(',').next())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("http");

    let host = header_str(headers, header::HOST.as_str())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");

    format!("{scheme}://{host}")
}

fn file_url(base: &str, filename: &str) -> String { format!("{base}{UPLOADS_PREFIX}/{filename}") }

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// # Accepts a single audio file under the `music` field
///
/// Text fields are ignored. A file under any other field, or a second file, rejects the whole
/// request and removes whatever was already stored for it.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut stored = None;
    if let Err(e) = receive(&state, &mut multipart, &mut stored).await {
        if let Some(audio) = stored {
            if let Err(re) = state.storage.remove(&audio.filename).await {
                error!("Failed to remove {} after a rejected upload: {re}", audio.filename);
            }
        }
        return Err(e);
    }

    let Some(audio) = stored else {
        return Err(ApiError::NoFile);
    };

    info!("Stored {} ({} bytes)", audio.filename, audio.size_bytes);
    let url = file_url(&base_url(&state, &headers, &uri), &audio.filename);

    Ok(Json(UploadResponse {
        success: true,
        url,
        filename: audio.filename,
        size: audio.size_bytes,
    }))
}

async fn receive(
    state: &AppState,
    multipart: &mut Multipart,
    stored: &mut Option<StoredAudio>,
) -> Result<(), ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        // Fields without a filename are plain form values
        let Some(original) = field
            .file_name()
            .filter(|f| !f.is_empty())
            .map(str::to_owned)
        else {
            continue;
        };

        let name = field.name().unwrap_or_default().to_owned();
        if name != UPLOAD_FIELD || stored.is_some() {
            return Err(ApiError::UnexpectedField(name));
        }

        let content_type = field.content_type().unwrap_or_default();
        if !state.profile.allows(content_type) {
            debug!("Rejecting '{original}' declared as '{content_type}'");
            return Err(ApiError::InvalidType(state.profile.type_hint()));
        }

        // Dropping `pending` on any early return deletes the partial file
        let mut pending = state
            .storage
            .create(&original, state.max_upload_size)
            .await?;
        debug!("Writing '{original}' to {}", pending.filename());

        while let Some(chunk) = field.chunk().await.map_err(ApiError::from_multipart)? {
            pending.write(&chunk).await?;
        }

        *stored = Some(pending.commit().await?);
    }

    Ok(())
}

/// Lists stored mp3 and wav files
pub async fn list_music(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<Vec<MusicEntry>>, ApiError> {
    let files = state
        .storage
        .list_audio()
        .await
        .map_err(ApiError::ListFailed)?;

    let base = base_url(&state, &headers, &uri);
    let entries = files
        .into_iter()
        .map(|f| {
            MusicEntry {
                url:      file_url(&base, &f.filename),
                filename: f.filename,
            }
        })
        .collect::<Vec<_>>();

    debug!("Listed {} files", entries.len());
    Ok(Json(entries))
}

/// Serves a stored file, honouring single byte ranges
pub async fn download(
    State(state): State<Arc<AppState>>,
    Apath(filename): Apath<String>,
    headers: HeaderMap,
) -> Response {
    let Some(path) = state.storage.resolve(&filename) else {
        warn!("Refusing to serve {filename:?}");
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut file = match File::open(&path).await {
        | Ok(file) => file,
        | Err(e) => {
            debug!("Can't open {path:?}: {e}");
            return StatusCode::NOT_FOUND.into_response();
        },
    };

    let meta = match file.metadata().await {
        | Ok(meta) if meta.is_file() => meta,
        | Ok(_) => return StatusCode::NOT_FOUND.into_response(),
        | Err(e) => return ApiError::ReadFailed(e).into_response(),
    };
    let size = meta.len();

    let mut out = HeaderMap::new();

    // Add mime type header
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        out.insert(header::CONTENT_TYPE, value);
    }

    out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    if let Some(modtime) = last_modified(&meta) {
        out.insert(header::LAST_MODIFIED, modtime);
    }

    match parse_range(header_str(&headers, header::RANGE.as_str()), size) {
        | RangeRequest::Full => {
            out.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
            let body = Body::from_stream(ReaderStream::new(file));
            (out, body).into_response()
        },
        | RangeRequest::Partial(range) => {
            if let Err(e) = file.seek(SeekFrom::Start(range.start)).await {
                return ApiError::ReadFailed(e).into_response();
            }

            out.insert(header::CONTENT_LENGTH, HeaderValue::from(range.len()));
            if let Ok(value) = HeaderValue::from_str(&range.content_range(size)) {
                out.insert(header::CONTENT_RANGE, value);
            }

            let body = Body::from_stream(ReaderStream::new(file.take(range.len())));
            (StatusCode::PARTIAL_CONTENT, out, body).into_response()
        },
        | RangeRequest::NotSatisfiable => {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                out.insert(header::CONTENT_RANGE, value);
            }
            (StatusCode::RANGE_NOT_SATISFIABLE, out).into_response()
        },
    }
}

fn last_modified(meta: &Metadata) -> Option<HeaderValue> {
    let modtime = meta.modified().ok()?;
    HeaderValue::from_str(&httpdate::fmt_http_date(modtime)).ok()
}
