//api/mod.rs
//! HTTP surface over the storage strategy
//!
//! Every strategy call is blocking filesystem work and runs inside
//! `web::block`.

pub mod handlers;

use actix_web::http::header::{self, HeaderMap};
use actix_web::{web, HttpResponseBuilder};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::blob::{BlobMetadata, ContentMetadata};
use crate::options::ListContainerOptions;

pub use handlers::*;

/// Prefix of request and response headers carrying user metadata
pub const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// Register every route on an actix `App` or scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(list_containers_handler))
        .route("/{container}", web::put().to(create_container_handler))
        .route("/{container}", web::head().to(container_exists_handler))
        .route("/{container}", web::delete().to(delete_container_handler))
        .route("/{container}", web::get().to(list_blobs_handler))
        .route("/{container}/{key:.*}", web::put().to(put_blob_handler))
        .route("/{container}/{key:.*}", web::head().to(head_blob_handler))
        .route("/{container}/{key:.*}", web::get().to(get_blob_handler))
        .route("/{container}/{key:.*}", web::delete().to(delete_blob_handler));
}

/// Query string of a key listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub recursive: Option<bool>,
    #[serde(rename = "max-keys")]
    pub max_keys: Option<usize>,
}

impl ListQuery {
    pub fn to_options(&self) -> ListContainerOptions {
        let mut options = ListContainerOptions::new()
            .prefix(self.prefix.clone().unwrap_or_default())
            .delimiter(self.delimiter.as_deref());
        if let Some(recursive) = self.recursive {
            options = options.recursive(recursive);
        }
        if let Some(max) = self.max_keys {
            options = options.max_results(max);
        }
        options
    }
}

fn tag_request(container: &str, key: Option<&str>) {
    log_mdc::insert("container", container);
    match key {
        Some(key) => log_mdc::insert("key", key),
        None => log_mdc::remove("key"),
    };
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Content attributes supplied with an upload. The declared length is only
/// known when the client sends `Content-Length`.
fn content_from_headers(headers: &HeaderMap) -> ContentMetadata {
    ContentMetadata {
        content_type: header_value(headers, header::CONTENT_TYPE),
        content_length: header_value(headers, header::CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()),
        content_disposition: header_value(headers, header::CONTENT_DISPOSITION),
        content_encoding: header_value(headers, header::CONTENT_ENCODING),
        content_language: header_value(headers, header::CONTENT_LANGUAGE),
        cache_control: header_value(headers, header::CACHE_CONTROL),
    }
}

fn user_metadata_from_headers(headers: &HeaderMap) -> std::collections::BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().strip_prefix(USER_METADATA_PREFIX)?;
            let value = value.to_str().ok()?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn http_date(when: &DateTime<Utc>) -> String {
    when.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Describe a blob in response headers
fn apply_metadata_headers(response: &mut HttpResponseBuilder, metadata: &BlobMetadata) {
    let content = &metadata.content;
    response.insert_header((
        header::CONTENT_TYPE,
        content
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    ));
    if let Some(etag) = &metadata.etag {
        response.insert_header((header::ETAG, format!("\"{}\"", etag)));
    }
    if let Some(when) = &metadata.last_modified {
        response.insert_header((header::LAST_MODIFIED, http_date(when)));
    }
    let optional = [
        (header::CONTENT_DISPOSITION, &content.content_disposition),
        (header::CONTENT_ENCODING, &content.content_encoding),
        (header::CONTENT_LANGUAGE, &content.content_language),
        (header::CACHE_CONTROL, &content.cache_control),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            response.insert_header((name, value.clone()));
        }
    }
    for (name, value) in &metadata.user_metadata {
        response.insert_header((format!("{}{}", USER_METADATA_PREFIX, name), value.clone()));
    }
}
