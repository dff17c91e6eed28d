//! File manager client
//!
//! A UI-agnostic store that mirrors the server's listing, plus the HTTP
//! transport it talks through.

pub mod api;
pub mod format;
pub mod http;
pub mod store;

pub use api::{FileManagerApi, UploadFile};
pub use format::{display_rows, format_size, format_timestamp, DisplayRow, RowKind};
pub use http::HttpApi;
pub use store::{Dispatch, FileManagerStore, Operation, Status, StoreState, Ticket};

use api_proto::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Client error types
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with an error body
    #[error("{message}")]
    Api {
        kind: ErrorKind,
        message: String,
        status: u16,
    },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("cancelled")]
    Cancelled,
}

impl ClientError {
    /// Server-side classification, `Unknown` for local failures
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Api { kind, .. } => *kind,
            _ => ErrorKind::Unknown,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
