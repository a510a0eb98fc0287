use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Text frames of the file-transfer handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum FileTransferControl {
    Start {
        #[serde(rename = "fileSize")]
        file_size: u64,
        #[serde(default)]
        options: serde_json::Value,
    },
    Accept,
}

/// A frame read off the file-transfer channel.
///
/// Text frames carry the JSON handshake, binary frames are raw chunks with no
/// framing of their own.
#[derive(Debug, Clone, PartialEq)]
pub enum FileChannelFrame {
    Control(FileTransferControl),
    Chunk(Bytes),
}

impl FileChannelFrame {
    pub fn decode(is_string: bool, data: Bytes) -> serde_json::Result<Self> {
        if is_string {
            serde_json::from_slice(&data).map(Self::Control)
        } else {
            Ok(Self::Chunk(data))
        }
    }
}
