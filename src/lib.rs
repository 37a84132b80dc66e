// src/lib.rs

pub mod error;
pub mod blob;
pub mod container;
pub mod options;
pub mod validation;
pub mod content_type;
pub mod metadata;
pub mod storage;
pub mod config;
pub mod app_state;
pub mod api;

pub use error::{Result, StorageError};
