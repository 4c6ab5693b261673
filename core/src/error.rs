//! Error types for the catalog library.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("index store error: {0}")]
    Store(#[from] sled::Error),

    #[error("record codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Config(#[from] ValidationError),

    #[error("index: missing path")]
    MissingPath,

    #[error("index rebuild aborted")]
    RebuildAborted,
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// One rejected configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Every field error found by a validation pass, reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub items: Vec<FieldError>,
}

impl ValidationError {
    pub fn add(&mut self, field: &str, message: &str) {
        self.items.push(FieldError { field: field.to_string(), message: message.to_string() });
    }

    pub fn has_any(&self) -> bool {
        !self.items.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return f.write_str("validation failed");
        }
        f.write_str("validation failed:")?;
        for item in &self.items {
            write!(f, "\n - {item}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
