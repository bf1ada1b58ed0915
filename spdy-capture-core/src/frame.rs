//! SPDY/3 frame parsing.
//!
//! Every SPDY frame starts with an 8-byte header:
//!
//! ```text
//! Control frame:
//! +----------------------------------+
//! |C| Version(15bits) | Type(16bits) |
//! +----------------------------------+
//! | Flags (8)  |  Length (24 bits)   |
//! +----------------------------------+
//!
//! Data frame:
//! +----------------------------------+
//! |C|       Stream-ID (31bits)       |
//! +----------------------------------+
//! | Flags (8)  |  Length (24 bits)   |
//! +----------------------------------+
//! ```
//!
//! Parsers return `Ok(None)` when the buffer does not yet hold a whole frame.
//! That is the normal state between reads and must not be treated as an
//! error.

use bytes::Bytes;

use crate::control::ControlFrameKind;
use crate::error::SpdyError;

/// Size of the fixed frame header.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest payload the 24-bit length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = 0x00ff_ffff;

const CONTROL_BIT: u16 = 0x8000;
const STREAM_ID_MASK: u32 = 0x7fff_ffff;

/// Frame header flags.
pub mod frame_flags {
    /// Last frame the sender will send on this stream.
    pub const FIN: u8 = 0x01;
    /// SYN_STREAM only: the recipient must not reply on this stream.
    pub const UNIDIRECTIONAL: u8 = 0x02;
}

/// What the first four header bytes describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Control {
        version: u16,
        kind: ControlFrameKind,
    },
    Data {
        /// Never 0.
        stream_id: u32,
    },
}

/// A decoded 8-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    pub flags: u8,
    /// Declared payload length.
    pub payload_len: usize,
}

impl FrameHeader {
    /// Total frame size on the wire, header included.
    pub fn frame_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload_len
    }
}

/// One complete SPDY frame.
///
/// `raw` holds the frame exactly as received, for transparent relaying;
/// `payload` is a view of `raw` past the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    flags: u8,
    payload: Bytes,
    raw: Bytes,
}

impl Frame {
    /// Build a frame from its parsed header and its complete wire bytes.
    pub(crate) fn from_parts(header: FrameHeader, raw: Bytes) -> Self {
        debug_assert_eq!(raw.len(), header.frame_len());
        let payload = raw.slice(FRAME_HEADER_SIZE..);
        Self {
            kind: header.kind,
            flags: header.flags,
            payload,
            raw,
        }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Consume the frame, keeping only the bytes to relay.
    pub fn into_raw(self) -> Bytes {
        self.raw
    }

    pub fn is_control(&self) -> bool {
        matches!(self.kind, FrameKind::Control { .. })
    }

    /// Protocol version, for control frames.
    pub fn version(&self) -> Option<u16> {
        match self.kind {
            FrameKind::Control { version, .. } => Some(version),
            FrameKind::Data { .. } => None,
        }
    }

    /// Control frame type, for control frames.
    pub fn control_kind(&self) -> Option<ControlFrameKind> {
        match self.kind {
            FrameKind::Control { kind, .. } => Some(kind),
            FrameKind::Data { .. } => None,
        }
    }

    /// Stream id, for data frames.
    pub fn stream_id(&self) -> Option<u32> {
        match self.kind {
            FrameKind::Data { stream_id } => Some(stream_id),
            FrameKind::Control { .. } => None,
        }
    }

    pub fn is_fin(&self) -> bool {
        self.flags & frame_flags::FIN != 0
    }
}

/// Parse the 8-byte frame header at the start of `buf`.
///
/// # Returns
/// - `Ok(Some(header))` if the header is complete (the payload may not be)
/// - `Ok(None)` if fewer than 8 bytes are available
/// - `Err(MalformedFrame)` for a data frame on reserved stream 0
pub fn parse_frame_header(buf: &[u8]) -> Result<Option<FrameHeader>, SpdyError> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Ok(None);
    }

    let word0 = u16::from_be_bytes([buf[0], buf[1]]);
    let kind = if word0 & CONTROL_BIT != 0 {
        FrameKind::Control {
            version: word0 & !CONTROL_BIT,
            kind: ControlFrameKind::from_u16(u16::from_be_bytes([buf[2], buf[3]])),
        }
    } else {
        let stream_id = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) & STREAM_ID_MASK;
        if stream_id == 0 {
            return Err(SpdyError::MalformedFrame(
                "data frame on reserved stream id 0".into(),
            ));
        }
        FrameKind::Data { stream_id }
    };

    let flags = buf[4];
    let payload_len = u32::from_be_bytes([0, buf[5], buf[6], buf[7]]) as usize;

    Ok(Some(FrameHeader {
        kind,
        flags,
        payload_len,
    }))
}

/// Parse one frame from the start of `buf`.
///
/// Bytes past the end of the frame are ignored; the caller advances its
/// buffer by `frame.raw().len()`.
///
/// # Returns
/// - `Ok(Some(frame))` if a complete frame was parsed
/// - `Ok(None)` if more data is needed
/// - `Err(e)` if the header is malformed
pub fn parse_frame(buf: &[u8]) -> Result<Option<Frame>, SpdyError> {
    let Some(header) = parse_frame_header(buf)? else {
        return Ok(None);
    };

    let frame_len = header.frame_len();
    if buf.len() < frame_len {
        return Ok(None);
    }

    let frame = Frame::from_parts(header, Bytes::copy_from_slice(&buf[..frame_len]));
    log_frame(&frame);
    Ok(Some(frame))
}

pub(crate) fn log_frame(frame: &Frame) {
    match frame.kind() {
        FrameKind::Control { version, kind } => tracing::debug!(
            frame.kind = %kind,
            frame.version = version,
            frame.flags = frame.flags(),
            frame.len = frame.payload().len(),
            "parsed SPDY control frame"
        ),
        FrameKind::Data { stream_id } => tracing::debug!(
            frame.stream_id = stream_id,
            frame.flags = frame.flags(),
            frame.len = frame.payload().len(),
            "parsed SPDY data frame"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control_frame_syn_stream() {
        let bytes = [0x80, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
        let frame = parse_frame(&bytes).unwrap().unwrap();

        assert!(frame.is_control());
        assert_eq!(frame.version(), Some(3));
        assert_eq!(frame.control_kind(), Some(ControlFrameKind::SynStream));
        assert_eq!(frame.stream_id(), None);
        assert!(frame.payload().is_empty());
        assert_eq!(&frame.raw()[..], &bytes[..]);
    }

    #[test]
    fn test_parse_control_frame_syn_reply() {
        let bytes = [0x80, 0x03, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        let frame = parse_frame(&bytes).unwrap().unwrap();

        assert_eq!(
            frame.kind(),
            FrameKind::Control {
                version: 3,
                kind: ControlFrameKind::SynReply
            }
        );
        assert_eq!(&frame.raw()[..], &bytes[..]);
    }

    #[test]
    fn test_parse_control_frame_headers() {
        let bytes = [0x80, 0x03, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00];
        let frame = parse_frame(&bytes).unwrap().unwrap();

        assert_eq!(frame.control_kind(), Some(ControlFrameKind::Headers));
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn test_parse_data_frame_stream_id_5() {
        let bytes = [0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00];
        let frame = parse_frame(&bytes).unwrap().unwrap();

        assert!(!frame.is_control());
        assert_eq!(frame.stream_id(), Some(5));
        assert_eq!(frame.version(), None);
        assert_eq!(frame.control_kind(), None);
        assert!(frame.payload().is_empty());
        assert_eq!(&frame.raw()[..], &bytes[..]);
    }

    #[test]
    fn test_parse_data_frame_with_payload() {
        let bytes = [
            0x00, 0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o',
        ];
        let frame = parse_frame(&bytes).unwrap().unwrap();

        assert_eq!(frame.stream_id(), Some(3));
        assert!(frame.is_fin());
        assert_eq!(&frame.payload()[..], b"hello");
        assert_eq!(frame.raw().len(), FRAME_HEADER_SIZE + 5);
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let bytes = [
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0xaa, 0xbb, 0xcc, 0xdd,
        ];
        let frame = parse_frame(&bytes).unwrap().unwrap();

        assert_eq!(&frame.payload()[..], &[0xaa, 0xbb]);
        assert_eq!(frame.raw().len(), 10);
    }

    #[test]
    fn test_parse_high_stream_id_masks_control_bit() {
        let bytes = [0x7f, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00];
        let frame = parse_frame(&bytes).unwrap().unwrap();
        assert_eq!(frame.stream_id(), Some(0x7fff_ffff));
    }

    #[test]
    fn test_parse_unknown_control_type_is_preserved() {
        let bytes = [0x80, 0x03, 0x12, 0x34, 0x00, 0x00, 0x00, 0x00];
        let frame = parse_frame(&bytes).unwrap().unwrap();
        assert_eq!(
            frame.control_kind(),
            Some(ControlFrameKind::Unknown(0x1234))
        );
    }

    #[test]
    fn test_parse_incomplete_header() {
        for len in 0..FRAME_HEADER_SIZE {
            let bytes = vec![0u8; len];
            assert_eq!(parse_frame(&bytes).unwrap(), None);
            assert_eq!(parse_frame_header(&bytes).unwrap(), None);
        }
    }

    #[test]
    fn test_parse_incomplete_payload() {
        // header declares a payload of 2 bytes
        let bytes = [0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x02];
        assert_eq!(parse_frame(&bytes).unwrap(), None);

        let bytes = [0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x02, 0x01];
        assert_eq!(parse_frame(&bytes).unwrap(), None);
    }

    #[test]
    fn test_parse_data_frame_stream_id_zero_is_malformed() {
        let bytes = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let result = parse_frame(&bytes);
        assert!(matches!(result, Err(SpdyError::MalformedFrame(_))));
    }

    #[test]
    fn test_parse_leading_byte_0x01_is_data_frame() {
        // Only the reserved stream id 0 is rejected; 0x01000000 is a legal id.
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let frame = parse_frame(&bytes).unwrap().unwrap();
        assert_eq!(frame.stream_id(), Some(0x0100_0000));
    }

    #[test]
    fn test_payload_length_uses_all_24_bits() {
        let bytes = [0x80, 0x03, 0x00, 0x04, 0x00, 0x01, 0x02, 0x03];
        let header = parse_frame_header(&bytes).unwrap().unwrap();
        assert_eq!(header.payload_len, 0x010203);
        assert_eq!(header.frame_len(), 0x010203 + FRAME_HEADER_SIZE);
    }

    #[test]
    fn test_payload_length_matches_declared_length() {
        for len in [0usize, 1, 7, 255, 256, 4096] {
            let mut bytes = vec![0x00, 0x00, 0x00, 0x09, 0x00];
            bytes.extend_from_slice(&(len as u32).to_be_bytes()[1..]);
            bytes.resize(FRAME_HEADER_SIZE + len, 0x5a);

            let frame = parse_frame(&bytes).unwrap().unwrap();
            assert_eq!(frame.payload().len(), len);
            assert_eq!(frame.raw().len(), FRAME_HEADER_SIZE + len);
        }
    }

    #[test]
    fn test_into_raw() {
        let bytes = [0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x42];
        let frame = parse_frame(&bytes).unwrap().unwrap();
        assert_eq!(&frame.into_raw()[..], &bytes[..]);
    }
}
