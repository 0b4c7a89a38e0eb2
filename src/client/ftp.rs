use super::{RemoteSession, SessionFactory};
use crate::error::{ConnectionError, RemoteError};
use std::io::{self, Cursor, Read};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};
use tracing::{debug, info};

/// Connection parameters, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct FtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl FtpSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct FtpSessionFactory {
    settings: FtpSettings,
}

impl FtpSessionFactory {
    pub fn new(settings: FtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FtpSettings {
        &self.settings
    }

    /// Resolves the host, bounded by the connect timeout. On timeout the
    /// lookup thread is left to finish on its own.
    fn resolve(&self) -> Result<Vec<SocketAddr>, ConnectionError> {
        let addr = self.settings.address();
        let target = (self.settings.host.clone(), self.settings.port);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(target.to_socket_addrs().map(Iterator::collect::<Vec<_>>));
        });

        let resolve_error = |reason: String| ConnectionError::Resolve {
            addr: addr.clone(),
            reason,
        };
        match rx.recv_timeout(self.settings.connect_timeout) {
            Ok(Ok(addrs)) if !addrs.is_empty() => Ok(addrs),
            Ok(Ok(_)) => Err(resolve_error("no addresses found".to_string())),
            Ok(Err(e)) => Err(resolve_error(e.to_string())),
            Err(_) => Err(resolve_error("lookup timed out".to_string())),
        }
    }

    fn connect_ftp(&self) -> Result<FtpStream, ConnectionError> {
        let settings = &self.settings;
        let addrs = self.resolve()?;

        let ftp = connect_any(&addrs, settings.connect_timeout).map_err(|e| {
            ConnectionError::Connect {
                addr: settings.address(),
                source: e.into(),
            }
        })?;

        let control = ftp.get_ref();
        control
            .set_read_timeout(Some(settings.idle_timeout))
            .and_then(|()| control.set_write_timeout(Some(settings.idle_timeout)))
            .map_err(|e| ConnectionError::Configure(RemoteError::io(&e)))?;

        // Every data connection (LIST, STOR, RETR) gets the same bounds.
        let (connect_timeout, idle_timeout) = (settings.connect_timeout, settings.idle_timeout);
        let mut ftp = ftp.passive_stream_builder(move |addr| {
            open_data_stream(&addr, connect_timeout, idle_timeout)
                .map_err(FtpError::ConnectionError)
        });

        if let Err(e) = ftp.login(settings.username.as_str(), settings.password.as_str()) {
            let _ = ftp.quit();
            return Err(ConnectionError::Login {
                user: settings.username.clone(),
                source: e.into(),
            });
        }

        // The server opens the data channel, so the gateway works behind NAT.
        ftp.set_mode(Mode::Passive);
        if let Err(e) = ftp.transfer_type(FileType::Binary) {
            let _ = ftp.quit();
            return Err(ConnectionError::Configure(e.into()));
        }

        Ok(ftp)
    }
}

/// Tries each address in turn, returning the last failure if none answers.
fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> Result<FtpStream, FtpError> {
    let mut last_error = None;
    for addr in addrs {
        match FtpStream::connect_timeout(*addr, timeout) {
            Ok(ftp) => return Ok(ftp),
            Err(e) => {
                debug!(%addr, error = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| {
        FtpError::ConnectionError(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no addresses to connect to",
        ))
    }))
}

fn open_data_stream(
    addr: &SocketAddr,
    connect_timeout: Duration,
    idle_timeout: Duration,
) -> io::Result<TcpStream> {
    let stream = TcpStream::connect_timeout(addr, connect_timeout)?;
    stream.set_read_timeout(Some(idle_timeout))?;
    stream.set_write_timeout(Some(idle_timeout))?;
    Ok(stream)
}

impl SessionFactory for FtpSessionFactory {
    fn open(&self) -> Result<Box<dyn RemoteSession>, ConnectionError> {
        let ftp = self.connect_ftp()?;
        info!(
            addr = %self.settings.address(),
            user = %self.settings.username,
            "ftp session opened"
        );
        Ok(Box::new(FtpSession { stream: Some(ftp) }))
    }
}

/// [`RemoteSession`] backed by a `suppaftp` control connection.
pub struct FtpSession {
    stream: Option<FtpStream>,
}

impl FtpSession {
    fn ftp(&mut self) -> Result<&mut FtpStream, RemoteError> {
        self.stream
            .as_mut()
            .ok_or_else(|| RemoteError::new(421, "session already closed"))
    }
}

impl RemoteSession for FtpSession {
    fn pwd(&mut self) -> Result<String, RemoteError> {
        Ok(self.ftp()?.pwd()?)
    }

    fn cwd(&mut self, path: &str) -> Result<(), RemoteError> {
        debug!(path, "CWD");
        Ok(self.ftp()?.cwd(path)?)
    }

    fn mkdir(&mut self, name: &str) -> Result<(), RemoteError> {
        debug!(name, "MKD");
        Ok(self.ftp()?.mkdir(name)?)
    }

    fn rm(&mut self, path: &str) -> Result<(), RemoteError> {
        debug!(path, "DELE");
        Ok(self.ftp()?.rm(path)?)
    }

    fn list(&mut self, path: &str) -> Result<Vec<String>, RemoteError> {
        debug!(path, "LIST");
        Ok(self.ftp()?.list(Some(path))?)
    }

    fn store(&mut self, path: &str, mut source: Box<dyn Read + Send>) -> Result<u64, RemoteError> {
        debug!(path, "STOR");
        Ok(self.ftp()?.put_file(path, &mut source)?)
    }

    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, RemoteError> {
        debug!(path, "RETR");
        let buffer = self.ftp()?.retr_as_buffer(path)?;
        Ok(Cursor::into_inner(buffer))
    }

    fn open_retrieve(&mut self, name: &str) -> Result<Box<dyn Read + Send>, RemoteError> {
        debug!(name, "RETR (stream)");
        let stream = self.ftp()?.retr_as_stream(name)?;
        Ok(Box::new(stream))
    }

    fn finish_retrieve(&mut self, stream: Box<dyn Read + Send>) -> Result<(), RemoteError> {
        Ok(self.ftp()?.finalize_retr_stream(stream)?)
    }

    fn logout(&mut self) -> Result<(), RemoteError> {
        Ok(self.ftp()?.quit()?)
    }

    fn disconnect(&mut self) {
        if let Some(ftp) = self.stream.take() {
            let _ = ftp.get_ref().shutdown(Shutdown::Both);
        }
    }
}
