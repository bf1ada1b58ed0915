//! Error types for SPDY frame and header-block decoding.
//!
//! "Need more bytes" is never an error: parsers report it as `Ok(None)`.
//! Every variant here is a real failure that the caller has to act on.

use crate::control::ControlFrameKind;

/// Errors produced while decoding SPDY frames and header blocks.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpdyError {
    /// The 8-byte frame header is structurally invalid.
    ///
    /// Frame boundaries can no longer be trusted after this.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame declared a payload larger than the configured limit.
    #[error("frame payload of {size} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    /// The reader already failed on an earlier frame.
    #[error("frame reader previously failed: {0}")]
    ReaderFailed(String),

    /// Header decoding was requested for a data frame.
    #[error("header decode requested on data frame for stream {stream_id}")]
    NotAControlFrame { stream_id: u32 },

    /// A control frame payload ended before the start of its header block.
    #[error("{kind} payload too short: need {need} bytes before header block, got {actual}")]
    ShortPayload {
        kind: ControlFrameKind,
        need: usize,
        actual: usize,
    },

    /// A length inside the decompressed header block ran past its end.
    #[error("truncated header block: {field} needs {need} bytes, {available} remaining")]
    TruncatedHeaderBlock {
        field: &'static str,
        need: usize,
        available: usize,
    },

    /// The direction's decompression stream rejected its input.
    #[error("header decompression failed: {0}")]
    HeaderDecompression(String),

    /// A header block inflated past the configured maximum.
    ///
    /// The decompression stream is abandoned mid-block and cannot continue.
    #[error("header block exceeds maximum decompressed size of {max} bytes")]
    HeaderBlockTooLarge { max: usize },

    /// A resize message could not be decoded.
    #[error("invalid terminal resize message: {0}")]
    InvalidResize(String),
}

impl SpdyError {
    /// Whether frame boundaries on the connection are no longer trustworthy.
    ///
    /// Header-level failures leave raw frame relaying intact; framing-level
    /// failures do not.
    pub fn is_framing_error(&self) -> bool {
        matches!(
            self,
            SpdyError::MalformedFrame(_)
                | SpdyError::FrameTooLarge { .. }
                | SpdyError::ReaderFailed(_)
        )
    }
}
