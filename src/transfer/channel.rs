//! Bridges an async producer to the blocking `Read` a session stores from.
//!
//! End of input is explicit: if the writer is dropped without calling
//! [`ChannelWriter::finish`] the reader fails, so a truncated body is never
//! stored as a complete upload.

use std::io::{self, Read};
use tokio::sync::mpsc;
use tokio_util::bytes::Bytes;

enum Frame {
    Data(Bytes),
    Failed(io::Error),
    End,
}

pub fn channel(buffer: usize) -> (ChannelWriter, ChannelReader) {
    let (tx, rx) = mpsc::channel(buffer);
    (
        ChannelWriter { tx },
        ChannelReader {
            rx,
            current: Bytes::new(),
            done: false,
        },
    )
}

pub struct ChannelWriter {
    tx: mpsc::Sender<Frame>,
}

impl ChannelWriter {
    /// Returns false once the reader has gone away.
    pub async fn send(&self, chunk: Bytes) -> bool {
        self.tx.send(Frame::Data(chunk)).await.is_ok()
    }

    pub async fn finish(self) {
        let _ = self.tx.send(Frame::End).await;
    }

    pub async fn fail(self, err: io::Error) {
        let _ = self.tx.send(Frame::Failed(err)).await;
    }
}

/// Blocking reader side. Must be read from outside the async runtime.
pub struct ChannelReader {
    rx: mpsc::Receiver<Frame>,
    current: Bytes,
    done: bool,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.current.is_empty() {
            if self.done {
                return Ok(0);
            }
            match self.rx.blocking_recv() {
                Some(Frame::Data(chunk)) => self.current = chunk,
                Some(Frame::End) => self.done = true,
                Some(Frame::Failed(err)) => return Err(err),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "upload source closed before completion",
                    ))
                }
            }
        }

        let count = buf.len().min(self.current.len());
        let chunk = self.current.split_to(count);
        buf[..count].copy_from_slice(&chunk);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reader_sees_all_chunks_then_eof() {
        let (writer, mut reader) = channel(4);
        let handle = tokio::task::spawn_blocking(move || {
            let mut data = Vec::new();
            reader.read_to_end(&mut data).map(|_| data)
        });

        assert!(writer.send(Bytes::from_static(b"hello ")).await);
        assert!(writer.send(Bytes::from_static(b"world")).await);
        writer.finish().await;

        let data = handle.await.unwrap().unwrap();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn test_reader_reports_source_failure() {
        let (writer, mut reader) = channel(4);
        let handle = tokio::task::spawn_blocking(move || {
            let mut data = Vec::new();
            reader.read_to_end(&mut data)
        });

        writer.send(Bytes::from_static(b"partial")).await;
        writer
            .fail(io::Error::new(io::ErrorKind::ConnectionReset, "client went away"))
            .await;

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn test_dropped_writer_is_not_a_clean_end() {
        let (writer, mut reader) = channel(4);
        let handle = tokio::task::spawn_blocking(move || {
            let mut data = Vec::new();
            reader.read_to_end(&mut data)
        });

        writer.send(Bytes::from_static(b"partial")).await;
        drop(writer);

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_send_reports_gone_reader() {
        let (writer, reader) = channel(1);
        drop(reader);
        assert!(!writer.send(Bytes::from_static(b"data")).await);
    }
}
