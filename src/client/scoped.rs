use super::{RemoteSession, SessionFactory};
use crate::error::ConnectionError;
use tracing::{debug, warn};

/// Owns a session for the duration of one operation.
///
/// The session is released (logout, then disconnect) exactly once: by
/// [`release`](Self::release), or on drop if the operation returned early or
/// panicked.
pub struct ScopedSession {
    session: Box<dyn RemoteSession>,
    released: bool,
}

impl ScopedSession {
    pub fn open<F: SessionFactory + ?Sized>(factory: &F) -> Result<Self, ConnectionError> {
        let session = factory.open()?;
        Ok(Self {
            session,
            released: false,
        })
    }

    pub fn session(&mut self) -> &mut dyn RemoteSession {
        self.session.as_mut()
    }

    pub fn release(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        // The outcome of the operation is already decided; a failed QUIT
        // must not change it.
        if let Err(err) = self.session.logout() {
            warn!(error = %err, "logout failed, dropping connection");
        }
        self.session.disconnect();
        debug!("ftp session released");
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        self.close();
    }
}
