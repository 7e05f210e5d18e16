// src/error.rs
//! Error types for the NMEA publisher

use std::fmt;

pub type Result<T> = std::result::Result<T, PublisherError>;

#[derive(Debug)]
pub enum PublisherError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Connection(String),
    Parse(String),
    Config(String),
    Other(String),
}

impl fmt::Display for PublisherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublisherError::Io(e) => write!(f, "IO error: {}", e),
            PublisherError::Json(e) => write!(f, "JSON error: {}", e),
            PublisherError::Connection(msg) => write!(f, "Connection error: {}", msg),
            PublisherError::Parse(msg) => write!(f, "Parse error: {}", msg),
            PublisherError::Config(msg) => write!(f, "Config error: {}", msg),
            PublisherError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for PublisherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublisherError::Io(e) => Some(e),
            PublisherError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PublisherError {
    fn from(error: std::io::Error) -> Self {
        PublisherError::Io(error)
    }
}

impl From<serde_json::Error> for PublisherError {
    fn from(error: serde_json::Error) -> Self {
        PublisherError::Json(error)
    }
}
