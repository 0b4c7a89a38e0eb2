#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod listing;
pub mod navigator;
pub mod path;
pub mod server;
pub mod transfer;

pub use client::{FtpSessionFactory, FtpSettings, RemoteSession, SessionFactory};
pub use error::{ConnectionError, GatewayError, NavigationError, RemoteError, TransferError};
pub use gateway::{FileGateway, FtpGateway, RetrievalStream};
