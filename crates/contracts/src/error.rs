//! Layered error definitions
//!
//! Categorized by source: config / bus / store / cache

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum CurationError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Bus Errors =====
    /// Bus connection error
    #[error("bus connection error on '{leg}': {message}")]
    BusConnection { leg: String, message: String },

    /// Bus publish error
    #[error("bus publish error to '{topic}': {message}")]
    BusPublish { topic: String, message: String },

    // ===== Store Errors =====
    /// Store query error
    #[error("store query error: {message}")]
    StoreQuery {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Store write error
    #[error("store write error during '{operation}': {message}")]
    StoreWrite { operation: String, message: String },

    // ===== Cache Errors =====
    /// Cache refresh error
    #[error("cache '{cache}' refresh error: {message}")]
    CacheRefresh { cache: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl CurationError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create bus connection error
    pub fn bus_connection(leg: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BusConnection {
            leg: leg.into(),
            message: message.into(),
        }
    }

    /// Create store query error
    pub fn store_query(message: impl Into<String>) -> Self {
        Self::StoreQuery {
            message: message.into(),
            source: None,
        }
    }

    /// Create store write error
    pub fn store_write(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreWrite {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create cache refresh error
    pub fn cache_refresh(cache: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CacheRefresh {
            cache: cache.into(),
            message: message.into(),
        }
    }
}
