//! HTTP routes
//!
//! Handlers are thin: decode the request, run the blocking file system work
//! on the blocking pool and encode the result.

use crate::error::ApiResult;
use api_proto::{
    routes, CreateDirectoryRequest, ListQuery, ListResponse, MessageResponse, PathRequest,
};
use app_core::{AppError, AppState, FileManager, PendingUpload, UPLOAD_CHUNK_SIZE};
use app_fs::StagedUpload;
use axum::body::Body;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let server = &state.config.server;
    let body_limit = usize::try_from(server.max_request_bytes).unwrap_or(usize::MAX);
    let request_timeout = Duration::from_secs(server.request_timeout_secs);

    let mut router = Router::new()
        .route(routes::FILES, get(list_files))
        .route(
            routes::DIRECTORY,
            post(create_directory).delete(delete_directory),
        )
        .route(routes::UPLOAD, post(upload_files))
        .route(routes::FILE, delete(delete_file))
        .layer(DefaultBodyLimit::max(body_limit));

    let prefix = state.config.storage.public_prefix();
    if !prefix.is_empty() {
        router = router.route(&format!("{}/*path", prefix), get(serve_stored));
        tracing::debug!("Serving stored files under {}", prefix);
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

async fn list_files(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Query(query) = query?;
    let manager = Arc::clone(&state.manager);
    let listing = blocking(move || manager.list(&query.directory)).await?;
    Ok(Json(listing))
}

async fn create_directory(
    State(state): State<AppState>,
    payload: Result<Json<CreateDirectoryRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let manager = Arc::clone(&state.manager);
    let message = blocking(move || manager.create_directory(&request)).await?;
    Ok(Json(message))
}

async fn delete_file(
    State(state): State<AppState>,
    payload: Result<Json<PathRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let manager = Arc::clone(&state.manager);
    let message = blocking(move || manager.delete_file(&request)).await?;
    Ok(Json(message))
}

async fn delete_directory(
    State(state): State<AppState>,
    payload: Result<Json<PathRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let manager = Arc::clone(&state.manager);
    let message = blocking(move || manager.delete_directory(&request)).await?;
    Ok(Json(message))
}

/// Read-only access to a stored file
///
/// Anything a listing would not show is a plain 404, whatever the reason.
async fn serve_stored(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    request: Request,
) -> Response {
    let manager = Arc::clone(&state.manager);
    let located = blocking(move || manager.locate_public(&path)).await;

    match located {
        Ok(file) => match ServeFile::new(file).oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        },
        Err(e) => {
            tracing::debug!("Not serving stored file: {}", e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Multipart upload: any number of `files[]` parts plus a `directory` part
///
/// The directory part may come after the files, so every file is staged
/// first and moved into place once the whole request has been read.
async fn upload_files(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let mut multipart = multipart?;
    let mut directory = String::new();
    let mut pending = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            routes::DIRECTORY_FIELD => directory = field.text().await?,
            routes::UPLOAD_FIELD => {
                pending.push(receive_file(Arc::clone(&state.manager), field).await?);
            }
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    let manager = Arc::clone(&state.manager);
    let outcome = blocking(move || manager.finish_uploads(&directory, pending)).await?;
    let status = StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::OK);
    Ok((status, Json(outcome)).into_response())
}

/// Stream one file part into a staged upload
///
/// A file that fails (bad name, too large, write error) is recorded as
/// failed and the rest of its bytes are skipped.
async fn receive_file(manager: Arc<FileManager>, mut field: Field<'_>) -> ApiResult<PendingUpload> {
    let name = field.file_name().unwrap_or_default().to_string();
    let declared = declared_length(field.headers());

    let started = {
        let manager = Arc::clone(&manager);
        let name = name.clone();
        blocking(move || {
            let staged = manager.begin_upload(&name)?;
            if let Some(length) = declared {
                staged.check_declared_size(length)?;
            }
            Ok(staged)
        })
        .await
    };

    let mut staged = match started {
        Ok(staged) => staged,
        Err(e) => {
            skip_field(&mut field).await?;
            return Ok(PendingUpload::failed(name, e));
        }
    };

    let mut buffer = Vec::with_capacity(UPLOAD_CHUNK_SIZE);
    loop {
        let chunk = field.chunk().await?;
        let done = chunk.is_none();
        if let Some(bytes) = chunk {
            buffer.extend_from_slice(&bytes);
        }

        if buffer.len() >= UPLOAD_CHUNK_SIZE || (done && !buffer.is_empty()) {
            staged = match write_chunk(staged, std::mem::take(&mut buffer)).await {
                Ok(staged) => staged,
                Err(e) => {
                    skip_field(&mut field).await?;
                    return Ok(PendingUpload::failed(name, e));
                }
            };
        }

        if done {
            break;
        }
    }

    tracing::debug!("Received {:?} ({} bytes)", name, staged.written());
    Ok(PendingUpload::staged(staged))
}

async fn write_chunk(mut staged: StagedUpload, buffer: Vec<u8>) -> app_core::Result<StagedUpload> {
    blocking(move || {
        staged.write_chunk(&buffer)?;
        Ok(staged)
    })
    .await
}

async fn skip_field(field: &mut Field<'_>) -> ApiResult<()> {
    while field.chunk().await?.is_some() {}
    Ok(())
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Run file system work on the blocking pool
async fn blocking<T, F>(work: F) -> app_core::Result<T>
where
    F: FnOnce() -> app_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_proto::{ErrorKind, ErrorResponse, UploadResponse};
    use axum::body::to_bytes;
    use axum::http::Request;
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn setup(limit: u64) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = app_core::AppConfig::default();
        config.storage.root = dir.path().to_path_buf();
        config.storage.max_upload_bytes = limit;
        let state = AppState::new(config).unwrap();
        (dir, state)
    }

    async fn send(state: &AppState, request: Request<Body>) -> Response {
        router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn json<T: DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn upload_request(directory: &str, files: &[(&str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files[]\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"directory\"\r\n\r\n{directory}\r\n--{BOUNDARY}--\r\n"
            )
            .as_bytes(),
        );

        Request::builder()
            .method("POST")
            .uri(routes::UPLOAD)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_root() {
        let (dir, state) = setup(1024);
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"abc").unwrap();

        let response = send(&state, get(routes::FILES)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let listing: ListResponse = json(response).await;
        assert_eq!(listing.current_directory, "");
        assert_eq!(listing.directories[0].name, "docs");
        assert_eq!(listing.files[0].url, "/storage/a.txt");
        assert_eq!(listing.files[0].size, 3);
    }

    #[tokio::test]
    async fn test_list_rejects_traversal() {
        let (_dir, state) = setup(1024);
        let response = send(&state, get("/file-manager/files?directory=..%2Fetc")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = json(response).await;
        assert_eq!(error.kind, ErrorKind::InvalidPath);
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let (_dir, state) = setup(1024);
        let response = send(&state, get("/file-manager/files?directory=missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_directory_twice() {
        let (dir, state) = setup(1024);
        let body = r#"{"name":"docs","directory":""}"#;

        let response = send(&state, json_request("POST", routes::DIRECTORY, body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let message: MessageResponse = json(response).await;
        assert_eq!(message.message, "Directory created successfully");
        assert!(dir.path().join("docs").is_dir());

        let response = send(&state, json_request("POST", routes::DIRECTORY, body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = json(response).await;
        assert_eq!(error.kind, ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_request() {
        let (_dir, state) = setup(1024);
        let response = send(&state, json_request("POST", routes::DIRECTORY, r#"{"nom":1}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = json(response).await;
        assert_eq!(error.kind, ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_partial_upload() {
        let (dir, state) = setup(8);
        std::fs::create_dir(dir.path().join("docs")).unwrap();

        let request = upload_request("docs", &[("small.txt", &b"tiny"[..]), ("big.bin", &[0u8; 64][..])]);
        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let outcome: UploadResponse = json(response).await;
        assert_eq!(outcome.files.len(), 2);
        assert!(outcome.files[0].is_stored());
        assert_eq!(
            outcome.files[0].file.as_ref().unwrap().url,
            "/storage/docs/small.txt"
        );
        assert_eq!(
            outcome.files[1].error.as_ref().unwrap().kind,
            ErrorKind::TooLarge
        );

        let response = send(&state, get("/file-manager/files?directory=docs")).await;
        let listing: ListResponse = json(response).await;
        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["small.txt"]);
    }

    #[tokio::test]
    async fn test_upload_all_failed_status() {
        let (_dir, state) = setup(8);
        let response = send(&state, upload_request("", &[("big.bin", &[0u8; 64][..])])).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let outcome: UploadResponse = json(response).await;
        assert_eq!(outcome.stored_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_into_missing_directory() {
        let (_dir, state) = setup(1024);
        let response = send(&state, upload_request("missing", &[("a.txt", &b"a"[..])])).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_file_and_directory() {
        let (dir, state) = setup(1024);
        std::fs::create_dir_all(dir.path().join("docs/nested")).unwrap();
        std::fs::write(dir.path().join("docs/nested/a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();

        let response = send(&state, json_request("DELETE", routes::FILE, r#"{"path":"b.txt"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let message: MessageResponse = json(response).await;
        assert_eq!(message.message, "File deleted successfully");
        assert!(!dir.path().join("b.txt").exists());

        let response = send(
            &state,
            json_request("DELETE", routes::DIRECTORY, r#"{"path":"docs"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!dir.path().join("docs").exists());

        let listing: ListResponse = json(send(&state, get(routes::FILES)).await).await;
        assert!(listing.directories.is_empty());
        assert!(listing.files.is_empty());
    }

    #[tokio::test]
    async fn test_stored_files_are_served() {
        let (dir, state) = setup(1024);
        std::fs::write(dir.path().join("hello.txt"), b"hello").unwrap();

        let response = send(&state, get("/storage/hello.txt")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_uploaded_url_with_reserved_characters_resolves() {
        let (_dir, state) = setup(1024);
        let response = send(&state, upload_request("", &[("what?.txt", &b"question"[..])])).await;
        let outcome: UploadResponse = json(response).await;
        let url = outcome.files[0].file.as_ref().unwrap().url.clone();
        assert_eq!(url, "/storage/what%3F.txt");

        let response = send(&state, get(&url)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"question");
    }

    #[tokio::test]
    async fn test_hidden_and_staging_files_are_not_served() {
        let (dir, state) = setup(1024);
        std::fs::write(dir.path().join(".env"), b"DB_PASSWORD=x").unwrap();
        std::fs::write(dir.path().join(".upload-1.part"), b"partial").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();

        for uri in ["/storage/.env", "/storage/.upload-1.part", "/storage/docs", "/storage/%2E%2E/x"] {
            let response = send(&state, get(uri)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_is_not_served() {
        let (dir, state) = setup(1024);
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"top secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let listing: ListResponse = json(send(&state, get(routes::FILES)).await).await;
        assert!(listing.directories.is_empty());

        let response = send(&state, get("/storage/link/secret.txt")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
