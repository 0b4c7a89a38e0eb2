//! Error types for the gateway.
//!
//! Every failure carries a [`RemoteError`]: the reply code and text the FTP
//! server sent, or the transport error when no reply was received.

use std::fmt;
use std::io;

use suppaftp::{FtpError, Status};
use thiserror::Error;

/// Diagnostic reported by the remote server or the connection beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// FTP reply code, when the server answered.
    pub code: Option<u32>,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn io(err: &io::Error) -> Self {
        Self {
            code: None,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<FtpError> for RemoteError {
    fn from(err: FtpError) -> Self {
        match err {
            FtpError::UnexpectedResponse(response) => {
                let body = String::from_utf8_lossy(&response.body);
                let code = match response.status {
                    // Codes suppaftp has no variant for are read from the reply itself.
                    Status::Unknown => body.get(..3).and_then(|code| code.parse::<u32>().ok()),
                    status => Some(status as u32),
                };
                match code {
                    Some(code) => Self::new(code, reply_text(code, &body)),
                    None => Self {
                        code: None,
                        message: body.trim().to_string(),
                    },
                }
            }
            other => Self {
                code: None,
                message: other.to_string(),
            },
        }
    }
}

/// Strips the leading reply code the server repeats in the reply body.
fn reply_text(code: u32, body: &str) -> String {
    let body = body.trim();
    let prefix = code.to_string();
    body.strip_prefix(prefix.as_str())
        .map_or(body, |rest| rest.trim_start_matches(['-', ' ']))
        .to_string()
}

/// Failure to obtain an authenticated session.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("could not resolve {addr}: {reason}")]
    Resolve { addr: String, reason: String },

    #[error("could not connect to {addr}: {source}")]
    Connect { addr: String, source: RemoteError },

    #[error("login rejected for user '{user}': {source}")]
    Login { user: String, source: RemoteError },

    #[error("could not configure session: {0}")]
    Configure(RemoteError),
}

/// Upload or download failure on an established session.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("could not upload the file to {path}: {source}")]
    Store { path: String, source: RemoteError },

    #[error("could not change directory to {directory}: {source}")]
    DirectoryNotFound {
        directory: String,
        source: RemoteError,
    },

    #[error("file not found or could not be downloaded: {path}: {source}")]
    FileNotFound { path: String, source: RemoteError },

    #[error("failed to retrieve file: {path}: {source}")]
    Retrieve { path: String, source: RemoteError },

    #[error("transfer of {path} did not complete: {source}")]
    Incomplete { path: String, source: RemoteError },
}

impl TransferError {
    pub fn remote(&self) -> &RemoteError {
        match self {
            Self::Store { source, .. }
            | Self::DirectoryNotFound { source, .. }
            | Self::FileNotFound { source, .. }
            | Self::Retrieve { source, .. }
            | Self::Incomplete { source, .. } => source,
        }
    }
}

/// Listing, directory creation or working-directory change failure.
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("could not list {path}: {source}")]
    List { path: String, source: RemoteError },

    #[error("could not create directory {name}: {source}")]
    MakeDirectory { name: String, source: RemoteError },

    #[error("could not change directory to {name}: {source}")]
    ChangeDirectory { name: String, source: RemoteError },

    #[error("could not read the working directory: {0}")]
    WorkingDirectory(RemoteError),
}

impl NavigationError {
    pub fn remote(&self) -> &RemoteError {
        match self {
            Self::List { source, .. }
            | Self::MakeDirectory { source, .. }
            | Self::ChangeDirectory { source, .. } => source,
            Self::WorkingDirectory(source) => source,
        }
    }
}

/// Top-level error returned by every gateway operation.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("gateway worker failed: {0}")]
    Worker(String),
}

impl GatewayError {
    /// Reply code of the remote server, if the failure came with one.
    pub fn remote_code(&self) -> Option<u32> {
        match self {
            Self::Connection(
                ConnectionError::Connect { source, .. } | ConnectionError::Login { source, .. },
            )
            | Self::Connection(ConnectionError::Configure(source)) => source.code,
            Self::Connection(ConnectionError::Resolve { .. }) | Self::Worker(_) => None,
            Self::Transfer(err) => err.remote().code,
            Self::Navigation(err) => err.remote().code,
        }
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}
