pub mod ftp;
pub mod scoped;

pub use ftp::{FtpSession, FtpSessionFactory, FtpSettings};
pub use scoped::ScopedSession;

use crate::error::{ConnectionError, RemoteError};
use std::io::Read;

/// One authenticated control connection to the remote server.
///
/// A session is opened for a single operation and is closed with
/// [`logout`](Self::logout) followed by [`disconnect`](Self::disconnect).
/// Use [`ScopedSession`] rather than calling those two directly.
pub trait RemoteSession: Send {
    fn pwd(&mut self) -> Result<String, RemoteError>;
    fn cwd(&mut self, path: &str) -> Result<(), RemoteError>;
    fn mkdir(&mut self, name: &str) -> Result<(), RemoteError>;
    fn rm(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Raw `LIST` lines for `path`.
    fn list(&mut self, path: &str) -> Result<Vec<String>, RemoteError>;

    /// Stores everything `source` yields at `path`, returning the byte count.
    fn store(&mut self, path: &str, source: Box<dyn Read + Send>) -> Result<u64, RemoteError>;

    /// Retrieves `path` into memory.
    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Opens `name` for reading over a live data connection.
    ///
    /// The returned stream must be handed back to
    /// [`finish_retrieve`](Self::finish_retrieve) once drained, or dropped
    /// to abandon the transfer.
    fn open_retrieve(&mut self, name: &str) -> Result<Box<dyn Read + Send>, RemoteError>;
    fn finish_retrieve(&mut self, stream: Box<dyn Read + Send>) -> Result<(), RemoteError>;

    fn logout(&mut self) -> Result<(), RemoteError>;
    fn disconnect(&mut self);
}

/// Opens a fresh session for every operation.
pub trait SessionFactory: Send + Sync + 'static {
    fn open(&self) -> Result<Box<dyn RemoteSession>, ConnectionError>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub Session {}

        impl RemoteSession for Session {
            fn pwd(&mut self) -> Result<String, RemoteError>;
            fn cwd(&mut self, path: &str) -> Result<(), RemoteError>;
            fn mkdir(&mut self, name: &str) -> Result<(), RemoteError>;
            fn rm(&mut self, path: &str) -> Result<(), RemoteError>;
            fn list(&mut self, path: &str) -> Result<Vec<String>, RemoteError>;
            fn store(&mut self, path: &str, source: Box<dyn Read + Send>) -> Result<u64, RemoteError>;
            fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, RemoteError>;
            fn open_retrieve(&mut self, name: &str) -> Result<Box<dyn Read + Send>, RemoteError>;
            fn finish_retrieve(&mut self, stream: Box<dyn Read + Send>) -> Result<(), RemoteError>;
            fn logout(&mut self) -> Result<(), RemoteError>;
            fn disconnect(&mut self);
        }
    }

    mock! {
        pub Factory {}

        impl SessionFactory for Factory {
            fn open(&self) -> Result<Box<dyn RemoteSession>, ConnectionError>;
        }
    }

    /// A session that expects exactly one logout and one disconnect.
    pub fn releasing_session() -> MockSession {
        let mut session = MockSession::new();
        session.expect_logout().times(1).returning(|| Ok(()));
        session.expect_disconnect().times(1).return_const(());
        session
    }

    pub fn not_found() -> RemoteError {
        RemoteError::new(550, "No such file or directory")
    }
}
