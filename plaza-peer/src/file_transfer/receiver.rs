use bytes::{Bytes, BytesMut};
use plaza_core::PeerId;
use tracing::{debug, info, warn};

/// A fully reassembled inbound file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFile {
    pub data: Bytes,
    pub options: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveEvent {
    /// Fraction of the declared size received so far.
    Progress(f64),
    Completed(ReceivedFile),
}

/// Inbound transfer announced by a `start` frame.
#[derive(Debug)]
pub struct FileTransferSession {
    expected: u64,
    received: u64,
    chunks: Vec<Bytes>,
    chunk_count: u32,
    options: serde_json::Value,
    overrun_reported: bool,
}

impl FileTransferSession {
    fn new(expected: u64, options: serde_json::Value) -> Self {
        Self {
            expected,
            received: 0,
            chunks: Vec::new(),
            chunk_count: 0,
            options,
            overrun_reported: false,
        }
    }

    pub fn expected_len(&self) -> u64 {
        self.expected
    }

    pub fn received_len(&self) -> u64 {
        self.received
    }

    fn assemble(self) -> ReceivedFile {
        let mut data = BytesMut::with_capacity(self.received as usize);
        for chunk in self.chunks {
            data.extend_from_slice(&chunk);
        }
        ReceivedFile {
            data: data.freeze(),
            options: self.options,
        }
    }
}

/// Reassembles the raw chunk stream of one peer's file-transfer channel.
///
/// Chunks carry no framing, so the only completion signal is the running
/// byte count reaching the size declared by `start`. A stream that overshoots
/// never completes.
pub struct FileReceiver {
    peer_id: PeerId,
    progress_every: u32,
    session: Option<FileTransferSession>,
}

impl FileReceiver {
    pub fn new(peer_id: PeerId, progress_every: u32) -> Self {
        Self {
            peer_id,
            progress_every: progress_every.max(1),
            session: None,
        }
    }

    pub fn session(&self) -> Option<&FileTransferSession> {
        self.session.as_ref()
    }

    /// Opens a session for an announced file. An empty file completes at once.
    pub fn on_start_requested(
        &mut self,
        file_size: u64,
        options: serde_json::Value,
    ) -> Option<ReceiveEvent> {
        debug!(
            "Peer {} requests to send a file of {} bytes",
            self.peer_id, file_size
        );

        if let Some(old) = self.session.take() {
            warn!(
                "Peer {} restarted a transfer; discarding {}/{} bytes",
                self.peer_id, old.received, old.expected
            );
        }

        let session = FileTransferSession::new(file_size, options);
        if file_size == 0 {
            return Some(ReceiveEvent::Completed(session.assemble()));
        }
        self.session = Some(session);
        None
    }

    pub fn on_receive_chunk(&mut self, chunk: Bytes) -> Vec<ReceiveEvent> {
        let mut events = Vec::new();

        let Some(session) = self.session.as_mut() else {
            warn!(
                "Dropping {} byte chunk from {}: no transfer in progress",
                chunk.len(),
                self.peer_id
            );
            return events;
        };

        session.received += chunk.len() as u64;
        session.chunks.push(chunk);
        session.chunk_count += 1;

        if session.chunk_count % self.progress_every == 0 {
            events.push(ReceiveEvent::Progress(
                session.received as f64 / session.expected as f64,
            ));
        }

        if session.received == session.expected {
            info!(
                "Finished receiving file from {} ({} bytes)",
                self.peer_id, session.expected
            );
            if let Some(session) = self.session.take() {
                events.push(ReceiveEvent::Completed(session.assemble()));
            }
        } else if session.received > session.expected && !session.overrun_reported {
            session.overrun_reported = true;
            warn!(
                "Peer {} sent {} bytes but announced {}; transfer will not complete",
                self.peer_id, session.received, session.expected
            );
        }

        events
    }
}
