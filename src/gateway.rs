//! Async entry point: one session per operation, run on the blocking pool.

use crate::client::{RemoteSession, ScopedSession, SessionFactory};
use crate::error::GatewayError;
use crate::listing::EntryKind;
use crate::transfer::{self, PumpOutcome};
use crate::{navigator, path};
use async_trait::async_trait;
use futures::Stream;
use std::io::{self, Read};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio_util::bytes::Bytes;
use tracing::{info_span, warn};

/// Chunks buffered between the transfer thread and the consumer.
const STREAM_BUFFER: usize = 4;

#[async_trait]
pub trait FileGateway: Send + Sync {
    async fn upload(
        &self,
        source: Box<dyn Read + Send>,
        remote_path: &str,
    ) -> Result<u64, GatewayError>;

    async fn download_streamed(
        &self,
        directory: &str,
        file_name: &str,
    ) -> Result<RetrievalStream, GatewayError>;

    async fn download_buffered(
        &self,
        directory: &str,
        file_name: &str,
    ) -> Result<Vec<u8>, GatewayError>;

    /// Lists `directory`, or the login directory when `None`.
    async fn list_directories(&self, directory: Option<&str>)
        -> Result<Vec<String>, GatewayError>;

    async fn list_files(&self, directory: &str) -> Result<Vec<String>, GatewayError>;
    async fn make_directory(&self, name: &str) -> Result<(), GatewayError>;
    async fn change_directory(&self, name: &str) -> Result<(), GatewayError>;

    /// Only a failure to open the session is an error.
    async fn delete(&self, directory: &str, file_name: &str) -> Result<bool, GatewayError>;

    /// Only a failure to open the session is an error.
    async fn path_exists(&self, path: &str) -> Result<bool, GatewayError>;
}

/// Bytes of a streamed retrieval, read while the session is still open.
///
/// Dropping the stream before the end abandons the transfer and releases
/// the session.
pub struct RetrievalStream {
    rx: mpsc::Receiver<io::Result<Bytes>>,
}

impl Stream for RetrievalStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

pub struct FtpGateway<F> {
    factory: Arc<F>,
}

impl<F> Clone for FtpGateway<F> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<F: SessionFactory> FtpGateway<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    async fn run<T, Op>(&self, operation: &'static str, op: Op) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        Op: FnOnce(&mut dyn RemoteSession) -> Result<T, GatewayError> + Send + 'static,
    {
        let factory = Arc::clone(&self.factory);
        tokio::task::spawn_blocking(move || -> Result<T, GatewayError> {
            let _span = info_span!("ftp", operation).entered();
            let mut scoped = ScopedSession::open(factory.as_ref())?;
            let result = op(scoped.session());
            scoped.release();
            result
        })
        .await?
    }
}

#[async_trait]
impl<F: SessionFactory> FileGateway for FtpGateway<F> {
    async fn upload(
        &self,
        source: Box<dyn Read + Send>,
        remote_path: &str,
    ) -> Result<u64, GatewayError> {
        let remote_path = remote_path.to_string();
        self.run("upload", move |session| {
            Ok(transfer::upload(session, source, &remote_path)?)
        })
        .await
    }

    async fn download_streamed(
        &self,
        directory: &str,
        file_name: &str,
    ) -> Result<RetrievalStream, GatewayError> {
        let factory = Arc::clone(&self.factory);
        let directory = directory.to_string();
        let file_name = file_name.to_string();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), GatewayError>>();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        // The worker owns the session until the stream is drained or dropped.
        tokio::task::spawn_blocking(move || {
            let _span = info_span!("ftp", operation = "download_streamed").entered();
            let mut scoped = match ScopedSession::open(factory.as_ref()) {
                Ok(scoped) => scoped,
                Err(err) => {
                    let _ = ready_tx.send(Err(err.into()));
                    return;
                }
            };
            let stream = match transfer::open_stream(scoped.session(), &directory, &file_name) {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = ready_tx.send(Err(err.into()));
                    return;
                }
            };
            if ready_tx.send(Ok(())).is_err() {
                return;
            }

            let remote_path = path::join(&directory, &file_name);
            let pumped = transfer::pump_stream(scoped.session(), stream, &remote_path, |chunk| {
                tx.blocking_send(Ok(chunk)).is_ok()
            });
            match pumped {
                Ok(PumpOutcome::Completed { .. } | PumpOutcome::Abandoned { .. }) => {}
                Err(err) => {
                    warn!(error = %err, "streamed download failed");
                    let _ = tx.blocking_send(Err(io::Error::other(err.to_string())));
                }
            }
            scoped.release();
            drop(tx);
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(RetrievalStream { rx }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(GatewayError::Worker(
                "download worker exited before the transfer started".to_string(),
            )),
        }
    }

    async fn download_buffered(
        &self,
        directory: &str,
        file_name: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        let directory = directory.to_string();
        let file_name = file_name.to_string();
        self.run("download_buffered", move |session| {
            Ok(transfer::download_buffered(session, &directory, &file_name)?)
        })
        .await
    }

    async fn list_directories(
        &self,
        directory: Option<&str>,
    ) -> Result<Vec<String>, GatewayError> {
        let directory = directory.map(str::to_string);
        self.run("list_directories", move |session| {
            Ok(navigator::list(
                session,
                directory.as_deref(),
                EntryKind::Directory,
            )?)
        })
        .await
    }

    async fn list_files(&self, directory: &str) -> Result<Vec<String>, GatewayError> {
        let directory = directory.to_string();
        self.run("list_files", move |session| {
            Ok(navigator::list(session, Some(&directory), EntryKind::File)?)
        })
        .await
    }

    async fn make_directory(&self, name: &str) -> Result<(), GatewayError> {
        let name = name.to_string();
        self.run("make_directory", move |session| {
            Ok(navigator::make_directory(session, &name)?)
        })
        .await
    }

    async fn change_directory(&self, name: &str) -> Result<(), GatewayError> {
        let name = name.to_string();
        self.run("change_directory", move |session| {
            Ok(navigator::change_directory(session, &name)?)
        })
        .await
    }

    async fn delete(&self, directory: &str, file_name: &str) -> Result<bool, GatewayError> {
        let directory = directory.to_string();
        let file_name = file_name.to_string();
        self.run("delete", move |session| {
            Ok(navigator::delete(session, &directory, &file_name))
        })
        .await
    }

    async fn path_exists(&self, path: &str) -> Result<bool, GatewayError> {
        let path = path.to_string();
        self.run("path_exists", move |session| {
            Ok(navigator::path_exists(session, &path))
        })
        .await
    }
}
