// Container and blob request handlers
use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use log::{debug, info, warn};
use serde_json::json;

use crate::api::{
    apply_metadata_headers, content_from_headers, tag_request, user_metadata_from_headers, ListQuery,
};
use crate::app_state::{extract_app_state, AppState};
use crate::blob::{BlobMetadata, Payload};
use crate::error::StorageError;
use crate::options::{ByteRange, GetOptions};

/// Lists container names
/// Handles requests like: GET /
pub async fn list_containers_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let strategy = extract_app_state(&app_state).strategy.clone();
    let mut names = web::block(move || strategy.container_names()?.collect::<Result<Vec<_>, _>>()).await??;
    names.sort();
    debug!("Listing {} containers", names.len());
    Ok(HttpResponse::Ok().json(json!({ "containers": names })))
}

/// Creates a container
/// Handles requests like: PUT /{container}
pub async fn create_container_handler(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let container = path.into_inner();
    tag_request(&container, None);
    let strategy = extract_app_state(&app_state).strategy.clone();
    let name = container.clone();
    let created = web::block(move || strategy.create_container(&name)).await??;
    if created {
        Ok(HttpResponse::Created().json(json!({ "container": container })))
    } else {
        debug!("Container {} already exists", container);
        Ok(HttpResponse::Ok().json(json!({ "container": container })))
    }
}

/// Handles requests like: HEAD /{container}
pub async fn container_exists_handler(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let container = path.into_inner();
    tag_request(&container, None);
    let strategy = extract_app_state(&app_state).strategy.clone();
    let exists = web::block(move || strategy.container_exists(&container)).await??;
    if exists {
        Ok(HttpResponse::Ok().finish())
    } else {
        Ok(HttpResponse::NotFound().finish())
    }
}

/// Handles requests like: DELETE /{container}
pub async fn delete_container_handler(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let container = path.into_inner();
    tag_request(&container, None);
    let strategy = extract_app_state(&app_state).strategy.clone();
    web::block(move || strategy.delete_container(&container)).await??;
    Ok(HttpResponse::NoContent().finish())
}

/// Lists blob keys of a container
/// Handles requests like: GET /{container}?prefix=a/&delimiter=/&max-keys=100
pub async fn list_blobs_handler(
    path: web::Path<String>,
    query: web::Query<ListQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let container = path.into_inner();
    tag_request(&container, None);
    let options = query.to_options();
    debug!("List blobs: container={}, options={:?}", container, options);

    let strategy = extract_app_state(&app_state).strategy.clone();
    let name = container.clone();
    let keys = web::block(move || {
        strategy
            .blob_keys(&name, &options)?
            .collect::<Result<Vec<_>, _>>()
    })
    .await??;

    Ok(HttpResponse::Ok().json(json!({
        "container": container,
        "prefix": query.prefix,
        "count": keys.len(),
        "keys": keys,
    })))
}

/// Stores a blob. Content attributes come from the standard headers and
/// user metadata from `x-amz-meta-*` headers.
/// Handles requests like: PUT /{container}/{key}
pub async fn put_blob_handler(
    path: web::Path<(String, String)>,
    mut payload: web::Payload,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (container, key) = path.into_inner();
    tag_request(&container, Some(&key));
    let state = extract_app_state(&app_state);
    let limit = state.config.server.max_payload_size;

    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            warn!("Error reading payload chunk: {}", e);
            actix_web::error::ErrorBadRequest("Error reading payload")
        })?;
        if bytes.len() + chunk.len() > limit {
            warn!("Payload for {}/{} exceeds {} bytes", container, key, limit);
            return Ok(HttpResponse::PayloadTooLarge().json(json!({ "error": "Payload too large" })));
        }
        bytes.extend_from_slice(&chunk);
    }
    info!("Total received data size: {} bytes", bytes.len());

    let content = content_from_headers(req.headers());
    if let Some(declared) = content.content_length {
        debug!("Declared length {} for {}/{}", declared, container, key);
    }
    let user_metadata = user_metadata_from_headers(req.headers());
    let body = bytes.freeze();

    let strategy = state.strategy.clone();
    let etag = web::block(move || {
        let mut blob = strategy.new_blob(&key)?;
        blob.metadata.content = content;
        blob.metadata.user_metadata = user_metadata;
        blob.payload = Some(Payload::Bytes(body));
        strategy.put_blob(&container, blob)
    })
    .await??;

    Ok(HttpResponse::Ok()
        .insert_header((header::ETAG, format!("\"{}\"", etag)))
        .json(json!({ "etag": etag })))
}

/// Reads a blob, honoring a single `Range: bytes=a-b` request
/// Handles requests like: GET /{container}/{key}
pub async fn get_blob_handler(
    path: web::Path<(String, String)>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (container, key) = path.into_inner();
    tag_request(&container, Some(&key));
    let range = req
        .headers()
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(ByteRange::parse_header);
    debug!("GET blob: container={}, key={}, range={:?}", container, key, range);

    let strategy = extract_app_state(&app_state).strategy.clone();
    let found = web::block(move || read_blob(strategy.as_ref(), &container, &key, range)).await??;
    let Some((metadata, total, data)) = found else {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Blob not found" })));
    };

    let status = if range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let mut response = HttpResponse::build(status);
    apply_metadata_headers(&mut response, &metadata);
    response.insert_header((header::ACCEPT_RANGES, "bytes"));
    if let (Some(range), false) = (range, data.is_empty()) {
        let last = range.start + data.len() as u64 - 1;
        response.insert_header((
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", range.start, last, total),
        ));
    }
    Ok(response.body(data))
}

/// Blob metadata as response headers, no body
/// Handles requests like: HEAD /{container}/{key}
pub async fn head_blob_handler(
    path: web::Path<(String, String)>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (container, key) = path.into_inner();
    tag_request(&container, Some(&key));
    let strategy = extract_app_state(&app_state).strategy.clone();
    let metadata = web::block(move || strategy.blob_metadata(&container, &key)).await??;
    let Some(metadata) = metadata else {
        return Ok(HttpResponse::NotFound().finish());
    };
    let mut response = HttpResponse::Ok();
    apply_metadata_headers(&mut response, &metadata);
    response.no_chunking(metadata.content.content_length.unwrap_or(0));
    Ok(response.finish())
}

/// Handles requests like: DELETE /{container}/{key}
pub async fn delete_blob_handler(
    path: web::Path<(String, String)>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (container, key) = path.into_inner();
    tag_request(&container, Some(&key));
    let strategy = extract_app_state(&app_state).strategy.clone();
    web::block(move || strategy.remove_blob(&container, &key)).await??;
    Ok(HttpResponse::NoContent().finish())
}

/// Metadata, full length and the selected bytes of a blob
fn read_blob(
    strategy: &dyn crate::storage::StorageStrategy,
    container: &str,
    key: &str,
    range: Option<ByteRange>,
) -> Result<Option<(BlobMetadata, u64, Bytes)>, StorageError> {
    let total = match range {
        Some(_) => match strategy.blob_metadata(container, key)? {
            Some(metadata) => metadata.content.content_length.unwrap_or(0),
            None => return Ok(None),
        },
        None => 0,
    };
    let options = GetOptions { range };
    let Some(blob) = strategy.get_blob(container, key, &options)? else {
        return Ok(None);
    };
    let metadata = blob.metadata.clone();
    let data = blob
        .into_bytes()
        .map_err(|e| StorageError::io(strategy.file_for_blob_key(container, key).unwrap_or_default(), e))?;
    let total = if range.is_some() { total } else { data.len() as u64 };
    Ok(Some((metadata, total, data)))
}
