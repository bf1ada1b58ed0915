//! Incremental frame reader for one direction of a connection.
//!
//! This module provides [`FrameReader`], which accumulates raw transport reads
//! and yields complete SPDY frames, together with the direction's header
//! decompressor.
//!
//! # Example
//!
//! ```ignore
//! let mut reader = FrameReader::new(Direction::ClientToServer);
//!
//! loop {
//!     let n = socket.read(&mut buf)?;
//!     reader.extend(&buf[..n]);
//!     while let Some(frame) = reader.next_frame()? {
//!         if let Some(headers) = reader.decode_headers(&frame)? {
//!             println!("{:?}", headers);
//!         }
//!         upstream.write_all(frame.raw())?;
//!     }
//! }
//! ```

use std::fmt;

use bytes::BytesMut;

use crate::decompress::HeaderDecompressor;
use crate::error::SpdyError;
use crate::frame::{Frame, log_frame, parse_frame_header};
use crate::headers::{self, HeaderBlock};
use crate::limits::FrameLimits;

/// Which side of the connection a byte stream came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToServer => write!(f, "client->server"),
            Direction::ServerToClient => write!(f, "server->client"),
        }
    }
}

/// Frame reader for one connection direction.
///
/// Owns the partial-input buffer and the header decompressor for the
/// direction, so a connection needs exactly two readers. Not `Clone`.
#[derive(Debug)]
pub struct FrameReader {
    direction: Direction,
    /// Bytes not yet consumed as a complete frame.
    buffer: BytesMut,
    decompressor: HeaderDecompressor,
    limits: FrameLimits,
    /// Set after the first framing error; frame boundaries are lost.
    failure: Option<String>,
}

impl FrameReader {
    /// Create a reader with default limits.
    pub fn new(direction: Direction) -> Self {
        Self::with_limits(direction, FrameLimits::default())
    }

    pub fn with_limits(direction: Direction, limits: FrameLimits) -> Self {
        Self {
            direction,
            buffer: BytesMut::new(),
            decompressor: HeaderDecompressor::with_max_output(limits.max_header_block_size()),
            limits,
            failure: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn limits(&self) -> FrameLimits {
        self.limits
    }

    /// The direction's header decompressor.
    pub fn decompressor(&self) -> &HeaderDecompressor {
        &self.decompressor
    }

    /// Number of buffered bytes not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a framing error has poisoned the reader.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Append one transport read.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete frame from the buffer.
    ///
    /// # Returns
    /// - `Ok(Some(frame))` if a complete frame was buffered
    /// - `Ok(None)` if more data is needed
    /// - `Err(e)` on a framing error; every later call fails with
    ///   [`SpdyError::ReaderFailed`]
    pub fn next_frame(&mut self) -> Result<Option<Frame>, SpdyError> {
        if let Some(reason) = &self.failure {
            return Err(SpdyError::ReaderFailed(reason.clone()));
        }

        match self.try_parse_frame() {
            Ok(frame) => Ok(frame),
            Err(e) => {
                tracing::warn!(
                    direction = %self.direction,
                    buffered = self.buffer.len(),
                    error = %e,
                    "SPDY frame reader failed"
                );
                self.failure = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn try_parse_frame(&mut self) -> Result<Option<Frame>, SpdyError> {
        let Some(header) = parse_frame_header(&self.buffer)? else {
            return Ok(None);
        };

        // Checked before the payload arrives so an oversize frame is never
        // buffered in full.
        self.limits.check_size(header.payload_len)?;

        let frame_len = header.frame_len();
        if self.buffer.len() < frame_len {
            return Ok(None);
        }

        let raw = self.buffer.split_to(frame_len).freeze();
        let frame = Frame::from_parts(header, raw);
        log_frame(&frame);
        Ok(Some(frame))
    }

    /// Decode the header block of `frame` with this direction's decompressor.
    ///
    /// Frames must be passed in the order [`next_frame`](Self::next_frame)
    /// returned them.
    pub fn decode_headers(&mut self, frame: &Frame) -> Result<Option<HeaderBlock>, SpdyError> {
        headers::decode_headers(frame, &mut self.decompressor)
    }
}
