//! HTTP handlers for the S3 subset.
//!
//! Engine calls are blocking, so every handler hands its work to
//! `spawn_blocking`. Request bodies reach the engine through a
//! [`SyncIoBridge`]; object bodies come back through a bounded in-memory
//! pipe, so neither direction buffers a whole object.

use std::io;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{StreamExt, TryStreamExt};
use serde_json::json;
use strata_fileset::CancellationToken;
use tokio::sync::oneshot;
use tokio_util::io::{ReaderStream, StreamReader, SyncIoBridge};
use tracing::{debug, error};

use crate::driver::{ObjectInfo, WorkerDriver};
use crate::error::{GatewayError, GatewayResult};

const PIPE_CAPACITY: usize = 256 * 1024;
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";
/// Buckets have no creation time of their own.
const EPOCH: &str = "1970-01-01T00:00:00.000Z";

#[derive(Clone, Debug)]
pub struct AppState {
    pub driver: WorkerDriver,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self, integrity = self.is_integrity_violation(), "request failed");
        } else {
            debug!(error = %self, "request rejected");
        }
        let body = format!(
            "{XML_DECL}<Error><Code>{}</Code><Message>{}</Message></Error>",
            self.s3_code(),
            xml_escape(&self.to_string())
        );
        (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
    }
}

async fn blocking<T, F>(f: F) -> GatewayResult<T>
where
    F: FnOnce() -> GatewayResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| GatewayError::Io(io::Error::other(e)))?
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_buckets(State(state): State<AppState>) -> Response {
    let mut body = format!(
        "{XML_DECL}<ListAllMyBucketsResult xmlns=\"{S3_NAMESPACE}\">\
         <Owner><ID>strata</ID><DisplayName>strata</DisplayName></Owner><Buckets>"
    );
    for bucket in state.driver.list_buckets() {
        body.push_str(&format!(
            "<Bucket><Name>{}</Name><CreationDate>{EPOCH}</CreationDate></Bucket>",
            xml_escape(&bucket.name)
        ));
    }
    body.push_str("</Buckets></ListAllMyBucketsResult>");
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

pub async fn head_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> GatewayResult<StatusCode> {
    state.driver.bucket(&bucket)?;
    Ok(StatusCode::OK)
}

pub async fn put_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> GatewayResult<StatusCode> {
    state.driver.make_bucket(&bucket)?;
    Ok(StatusCode::OK)
}

pub async fn delete_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> GatewayResult<StatusCode> {
    state.driver.remove_bucket(&bucket)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_objects(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> GatewayResult<StatusCode> {
    state.driver.bucket(&bucket)?;
    Err(GatewayError::NotImplemented("list objects".into()))
}

pub async fn head_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> GatewayResult<Response> {
    let driver = state.driver.clone();
    let info = blocking(move || driver.stat_object(&bucket, &key, &CancellationToken::new())).await?;
    Ok((StatusCode::OK, object_headers(&info)).into_response())
}

pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> GatewayResult<Response> {
    let (info, body) =
        open_object_stream(state.driver.clone(), bucket, key, CancellationToken::new()).await?;
    Ok((StatusCode::OK, object_headers(&info), body).into_response())
}

/// Look up an object and stream it from a blocking reader. `cancel` fires
/// on any early return and when the returned body is dropped.
async fn open_object_stream(
    driver: WorkerDriver,
    bucket: String,
    key: String,
    cancel: CancellationToken,
) -> GatewayResult<(ObjectInfo, Body)> {
    let guard = cancel.clone().drop_guard();
    let (pipe_in, pipe_out) = tokio::io::duplex(PIPE_CAPACITY);
    let mut sink = SyncIoBridge::new(pipe_in);
    let (found_tx, found_rx) = oneshot::channel::<GatewayResult<ObjectInfo>>();

    tokio::task::spawn_blocking(move || {
        let (info, mut reader) = match driver.get_object(&bucket, &key, &cancel) {
            Ok(found) => found,
            Err(e) => {
                let _ = found_tx.send(Err(e));
                return;
            }
        };
        if found_tx.send(Ok(info)).is_err() {
            return;
        }
        if let Err(e) = io::copy(&mut reader, &mut sink) {
            debug!(%bucket, %key, error = %e, "object stream ended early");
        }
    });

    let info = found_rx
        .await
        .map_err(|_| GatewayError::Io(io::Error::other("object reader stopped")))??;

    let stream = ReaderStream::new(pipe_out).map(move |chunk| {
        let _alive = &guard;
        chunk
    });
    Ok((info, Body::from_stream(stream)))
}

pub async fn put_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> GatewayResult<Response> {
    // fail fast before reading any of the body
    state.driver.bucket(&bucket)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let stream = body.into_data_stream().map_err(io::Error::other);
    let mut reader = SyncIoBridge::new(StreamReader::new(stream));
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let driver = state.driver.clone();
    let written = blocking(move || {
        driver.put_object(&bucket, &key, &mut reader, content_type.as_deref(), &cancel)
    })
    .await?;
    guard.disarm();

    let mut headers = HeaderMap::new();
    headers.insert("x-strata-bytes-written", HeaderValue::from(written));
    Ok((StatusCode::OK, headers).into_response())
}

pub async fn delete_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> GatewayResult<StatusCode> {
    let driver = state.driver.clone();
    blocking(move || driver.remove_object(&bucket, &key)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn object_headers(info: &ObjectInfo) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(info.size));
    if let Ok(v) = HeaderValue::from_str(&info.content_type) {
        headers.insert(header::CONTENT_TYPE, v);
    }
    if let Ok(v) = HeaderValue::from_str(&format!("\"{}\"", info.etag)) {
        headers.insert(header::ETAG, v);
    }
    headers
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
