//! HTTP handlers. Each request runs exactly one gateway operation.

use super::{AppError, AppState};
use crate::gateway::FileGateway;
use crate::transfer;
use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::io::{self, Cursor};
use std::sync::Arc;

/// Chunks in flight between the request body and the upload thread.
const UPLOAD_BUFFER: usize = 8;

#[derive(Deserialize)]
pub struct DownloadParams {
    pub filename: String,
    pub sourcepath: String,
}

#[derive(Deserialize)]
pub struct FileParams {
    pub directory: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

#[derive(Deserialize)]
pub struct DirParams {
    #[serde(rename = "dirName")]
    pub dir_name: String,
}

#[derive(Deserialize)]
pub struct ExistsParams {
    pub directory: String,
}

/// Multipart upload with a `file` part and a `sourcepath` text part.
///
/// The file part is streamed to the server when `sourcepath` arrives first,
/// and buffered otherwise.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut remote_path: Option<String> = None;
    let mut pending: Option<Vec<u8>> = None;
    let mut outcome = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("sourcepath") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                remote_path = Some(text);
            }
            Some("file") => match remote_path.as_deref() {
                Some(path) => outcome = Some(stream_field(&state.gateway, field, path).await),
                None => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    pending = Some(bytes.to_vec());
                }
            },
            _ => {}
        }
    }

    let outcome = match (outcome, pending, remote_path) {
        (Some(outcome), _, _) => outcome,
        (None, Some(data), Some(path)) => {
            state
                .gateway
                .upload(Box::new(Cursor::new(data)), &path)
                .await
        }
        (None, _, None) => {
            return Err(AppError::BadRequest(
                "missing multipart field 'sourcepath'".to_string(),
            ))
        }
        (None, None, Some(_)) => {
            return Err(AppError::BadRequest(
                "missing multipart field 'file'".to_string(),
            ))
        }
    };

    match outcome {
        Ok(_) => Ok((StatusCode::OK, "File uploaded successfully.").into_response()),
        Err(err) => Err(AppError::Internal(format!("Failed to upload file: {err}"))),
    }
}

async fn stream_field(
    gateway: &Arc<dyn FileGateway>,
    mut field: Field<'_>,
    remote_path: &str,
) -> Result<u64, crate::error::GatewayError> {
    let (writer, reader) = transfer::channel(UPLOAD_BUFFER);

    let pump = async move {
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    if !writer.send(chunk).await {
                        return;
                    }
                }
                Ok(None) => return writer.finish().await,
                Err(err) => return writer.fail(io::Error::other(err.to_string())).await,
            }
        }
    };

    let (result, ()) = tokio::join!(gateway.upload(Box::new(reader), remote_path), pump);
    result
}

/// Streams the file straight from the data connection.
pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, AppError> {
    let stream = state
        .gateway
        .download_streamed(&params.sourcepath, &params.filename)
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition("attachment", &params.filename)?,
        )
        .body(Body::from_stream(stream))
        .map_err(|err| AppError::Internal(err.to_string()))
}

/// Buffers the whole file and guesses its media type from the name.
pub async fn download_bytes(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
) -> Result<Response, AppError> {
    let data = state
        .gateway
        .download_buffered(&params.directory, &params.file_name)
        .await?;
    let mime = mime_guess::from_path(&params.file_name).first_or_octet_stream();

    Response::builder()
        .header(header::CONTENT_TYPE, mime.essence_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition("inline", &params.file_name)?,
        )
        .body(Body::from(data))
        .map_err(|err| AppError::Internal(err.to_string()))
}

pub async fn list_directories(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.gateway.list_directories(None).await?))
}

pub async fn list_files(
    State(state): State<AppState>,
    Query(params): Query<DirParams>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.gateway.list_files(&params.dir_name).await?))
}

pub async fn make_directory(
    State(state): State<AppState>,
    Query(params): Query<DirParams>,
) -> Result<String, AppError> {
    state.gateway.make_directory(&params.dir_name).await?;
    Ok(format!("New Working Directory: {}", params.dir_name))
}

pub async fn change_directory(
    State(state): State<AppState>,
    Query(params): Query<DirParams>,
) -> Result<String, AppError> {
    state.gateway.change_directory(&params.dir_name).await?;
    Ok("Using new working directory for operations.".to_string())
}

pub async fn delete_file(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
) -> Result<Response, AppError> {
    let deleted = state
        .gateway
        .delete(&params.directory, &params.file_name)
        .await?;

    Ok(if deleted {
        (StatusCode::OK, "File deleted successfully.").into_response()
    } else {
        (StatusCode::NOT_FOUND, "File not found or could not be deleted.").into_response()
    })
}

pub async fn path_exists(
    State(state): State<AppState>,
    Query(params): Query<ExistsParams>,
) -> Result<Json<bool>, AppError> {
    Ok(Json(state.gateway.path_exists(&params.directory).await?))
}

fn content_disposition(kind: &str, file_name: &str) -> Result<HeaderValue, AppError> {
    let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("{kind}; filename=\"{escaped}\""))
        .map_err(|_| AppError::BadRequest(format!("file name not usable in a header: {file_name}")))
}
