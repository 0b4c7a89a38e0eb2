//! Single-file uploads and downloads over one session.

pub mod channel;

pub use channel::{channel, ChannelReader, ChannelWriter};

use crate::client::RemoteSession;
use crate::error::{RemoteError, TransferError};
use crate::path;
use std::io::{self, Read};
use tokio_util::bytes::Bytes;
use tracing::{debug, info, warn};

/// Chunk size used when pumping a streamed retrieval.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// How a streamed retrieval ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    Completed { bytes: u64 },
    /// The consumer stopped reading before the end of the file.
    Abandoned { bytes: u64 },
}

/// Stores `source` at `remote_path`, creating or overwriting it.
///
/// There is no staging: a failed upload may leave a partial file behind.
pub fn upload(
    session: &mut dyn RemoteSession,
    source: Box<dyn Read + Send>,
    remote_path: &str,
) -> Result<u64, TransferError> {
    let written = session
        .store(remote_path, source)
        .map_err(|source| TransferError::Store {
            path: remote_path.to_string(),
            source,
        })?;
    info!(path = remote_path, bytes = written, "upload complete");
    Ok(written)
}

/// Reads `directory/file_name` into memory without changing directory.
pub fn download_buffered(
    session: &mut dyn RemoteSession,
    directory: &str,
    file_name: &str,
) -> Result<Vec<u8>, TransferError> {
    let path = path::join(directory, file_name);
    let data = session
        .retrieve(&path)
        .map_err(|source| TransferError::Retrieve {
            path: path.clone(),
            source,
        })?;
    info!(path = %path, bytes = data.len(), "buffered download complete");
    Ok(data)
}

/// Changes into `directory` and opens `file_name` as a live stream.
pub fn open_stream(
    session: &mut dyn RemoteSession,
    directory: &str,
    file_name: &str,
) -> Result<Box<dyn Read + Send>, TransferError> {
    session
        .cwd(directory)
        .map_err(|source| TransferError::DirectoryNotFound {
            directory: directory.to_string(),
            source,
        })?;

    session
        .open_retrieve(file_name)
        .map_err(|source| TransferError::FileNotFound {
            path: path::join(directory, file_name),
            source,
        })
}

/// Drains an opened retrieval into `sink`, chunk by chunk.
///
/// `sink` returns false when the consumer has gone away; the data
/// connection is then dropped without waiting for the rest of the file.
pub fn pump_stream(
    session: &mut dyn RemoteSession,
    mut stream: Box<dyn Read + Send>,
    remote_path: &str,
    mut sink: impl FnMut(Bytes) -> bool,
) -> Result<PumpOutcome, TransferError> {
    let incomplete = |err: &io::Error| TransferError::Incomplete {
        path: remote_path.to_string(),
        source: RemoteError::io(err),
    };

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let read = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(incomplete(&err)),
        };
        total += read as u64;

        if !sink(Bytes::copy_from_slice(&buf[..read])) {
            warn!(
                path = remote_path,
                bytes = total,
                "consumer went away, abandoning streamed download"
            );
            return Ok(PumpOutcome::Abandoned { bytes: total });
        }
        debug!(path = remote_path, bytes = total, "streamed chunk");
    }

    session
        .finish_retrieve(stream)
        .map_err(|source| TransferError::Incomplete {
            path: remote_path.to_string(),
            source,
        })?;
    info!(path = remote_path, bytes = total, "streamed download complete");
    Ok(PumpOutcome::Completed { bytes: total })
}
