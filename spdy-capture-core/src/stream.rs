//! Classification of exec/attach/port-forward sub-streams.
//!
//! Each sub-stream of a remote command session is opened by a SYN_STREAM
//! frame whose `streamtype` header names its role. Data frames carry only a
//! stream id, so callers record the role at SYN_STREAM time and look it up
//! for every later data frame.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::control::ControlFrameKind;
use crate::error::SpdyError;
use crate::frame::Frame;
use crate::headers::HeaderBlock;

/// Header naming the role of a sub-stream.
pub const STREAM_TYPE_HEADER: &str = "streamtype";

const STREAM_ID_MASK: u32 = 0x7fff_ffff;

/// Longest partial resize message kept between frames.
const MAX_PENDING_RESIZE: usize = 4096;

/// Role of a sub-stream, from its `streamtype` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamType {
    Error,
    Stdin,
    Stdout,
    Stderr,
    /// Terminal size changes, one JSON document per message.
    Resize,
    /// Port-forward payload.
    Data,
    Other(String),
}

impl StreamType {
    /// Read the `streamtype` header, if present and valid UTF-8.
    pub fn from_headers(headers: &HeaderBlock) -> Option<Self> {
        headers.get_str(STREAM_TYPE_HEADER).map(Self::from)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StreamType::Error => "error",
            StreamType::Stdin => "stdin",
            StreamType::Stdout => "stdout",
            StreamType::Stderr => "stderr",
            StreamType::Resize => "resize",
            StreamType::Data => "data",
            StreamType::Other(other) => other,
        }
    }
}

impl From<&str> for StreamType {
    fn from(value: &str) -> Self {
        match value {
            "error" => StreamType::Error,
            "stdin" => StreamType::Stdin,
            "stdout" => StreamType::Stdout,
            "stderr" => StreamType::Stderr,
            "resize" => StreamType::Resize,
            "data" => StreamType::Data,
            other => StreamType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Id of the stream a SYN_STREAM frame opens.
///
/// `None` for any other frame, or a payload too short to hold the id.
pub fn syn_stream_id(frame: &Frame) -> Option<u32> {
    if frame.control_kind()? != ControlFrameKind::SynStream {
        return None;
    }
    let id = frame.payload().get(..4)?;
    Some(u32::from_be_bytes([id[0], id[1], id[2], id[3]]) & STREAM_ID_MASK)
}

/// Roles of the sub-streams seen on a connection.
#[derive(Debug, Clone, Default)]
pub struct StreamTypes {
    streams: HashMap<u32, StreamType>,
}

impl StreamTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the role of the stream opened by `frame`.
    ///
    /// Returns the recorded role, or `None` if `frame` is not a SYN_STREAM
    /// or `headers` has no `streamtype`.
    pub fn observe(&mut self, frame: &Frame, headers: &HeaderBlock) -> Option<StreamType> {
        let stream_id = syn_stream_id(frame)?;
        let stream_type = StreamType::from_headers(headers)?;
        tracing::debug!(
            stream.id = stream_id,
            stream.kind = %stream_type,
            "observed SPDY sub-stream"
        );
        self.streams.insert(stream_id, stream_type.clone());
        Some(stream_type)
    }

    pub fn get(&self, stream_id: u32) -> Option<&StreamType> {
        self.streams.get(&stream_id)
    }

    /// Lowest stream id recorded with the given role.
    pub fn stream_of(&self, stream_type: &StreamType) -> Option<u32> {
        self.streams
            .iter()
            .filter(|(_, t)| *t == stream_type)
            .map(|(id, _)| *id)
            .min()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// A terminal resize message, as sent on the `resize` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TerminalSize {
    pub width: u16,
    pub height: u16,
}

impl TerminalSize {
    /// Decode one resize message, e.g. `{"Width":80,"Height":24}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self, SpdyError> {
        serde_json::from_slice(bytes).map_err(|e| SpdyError::InvalidResize(e.to_string()))
    }
}

/// Decoder for the resize stream.
///
/// Senders write one JSON document per resize, but a document may span
/// several data frames and one frame may carry several documents.
#[derive(Debug, Default)]
pub struct ResizeDecoder {
    pending: Vec<u8>,
}

impl ResizeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the payload of one resize-stream data frame.
    ///
    /// Returns every message completed by `bytes`. A partial trailing message
    /// is kept for the next call. On a syntax error, or a partial message
    /// longer than 4 KiB, pending bytes are discarded so the next frame
    /// starts clean.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<TerminalSize>, SpdyError> {
        self.pending.extend_from_slice(bytes);

        let mut sizes = Vec::new();
        let mut messages =
            serde_json::Deserializer::from_slice(&self.pending).into_iter::<TerminalSize>();
        let failure = loop {
            match messages.next() {
                Some(Ok(size)) => sizes.push(size),
                Some(Err(e)) if e.is_eof() => break None,
                Some(Err(e)) => break Some(e.to_string()),
                None => break None,
            }
        };
        let consumed = messages.byte_offset();

        if let Some(reason) = failure {
            self.pending.clear();
            return Err(SpdyError::InvalidResize(reason));
        }
        self.pending.drain(..consumed);
        if self.pending.len() > MAX_PENDING_RESIZE {
            let len = self.pending.len();
            self.pending.clear();
            return Err(SpdyError::InvalidResize(format!(
                "unterminated message of {len} bytes"
            )));
        }
        Ok(sizes)
    }

    /// Bytes of a partial message waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
