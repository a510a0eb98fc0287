use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

/// Where outbound chunks go. Implemented by the file-transfer data channel.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn send_chunk(&self, chunk: Bytes) -> Result<()>;
}

/// The file offered to every peer.
#[derive(Debug, Clone)]
pub enum OutboundFile {
    Path(PathBuf),
    Memory(Bytes),
}

impl OutboundFile {
    pub async fn size(&self) -> Result<u64> {
        match self {
            Self::Path(path) => tokio::fs::metadata(path)
                .await
                .map(|meta| meta.len())
                .map_err(|source| Error::FileRead { offset: 0, source }),
            Self::Memory(data) => Ok(data.len() as u64),
        }
    }

    pub async fn open(&self) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        match self {
            Self::Path(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| Error::FileRead { offset: 0, source })?;
                Ok(Box::new(file))
            }
            Self::Memory(data) => Ok(Box::new(std::io::Cursor::new(data.clone()))),
        }
    }
}

/// Streams a source to a sink in fixed-size chunks, one chunk in flight.
///
/// There is no end marker; the receiver knows the size from the `start` frame.
pub struct FileTransferer<R> {
    source: R,
    chunk_size: usize,
}

impl<R> FileTransferer<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Returns the number of bytes sent. A read failure is returned as
    /// [`Error::FileRead`] and is not retried.
    pub async fn start_transfer(mut self, sink: &dyn ChunkSink) -> Result<u64> {
        debug!("Remote peer accepted the file, start sending");

        let mut offset = 0u64;
        loop {
            let chunk = self.read_chunk(offset).await?;
            if chunk.is_empty() {
                break;
            }

            let len = chunk.len();
            sink.send_chunk(chunk).await?;
            offset += len as u64;
            trace!("Sent chunk, current offset: {}", offset);

            if len < self.chunk_size {
                break;
            }
        }

        debug!("File transfer finished after {} bytes", offset);
        Ok(offset)
    }

    /// Fills one chunk, short only at end of file.
    async fn read_chunk(&mut self, offset: u64) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.chunk_size);
        while buf.len() < self.chunk_size {
            let mut limited = (&mut self.source).take((self.chunk_size - buf.len()) as u64);
            let read = limited
                .read_buf(&mut buf)
                .await
                .map_err(|source| Error::FileRead {
                    offset: offset + buf.len() as u64,
                    source,
                })?;
            if read == 0 {
                break;
            }
        }
        Ok(buf.freeze())
    }
}
