/// Public STUN servers used when no ICE configuration is supplied.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_3: &str = "stun:stun2.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_4: &str = "stun:stun3.l.google.com:19302";

/// Logical id of the pre-negotiated file-transfer data channel.
pub const FILE_TRANSFER_CHANNEL_ID: u16 = 10;

pub const CONTROL_CHANNEL_LABEL: &str = "RealTimeDataChannel";
pub const FILE_TRANSFER_CHANNEL_LABEL: &str = "FileTransferDataChannel";
