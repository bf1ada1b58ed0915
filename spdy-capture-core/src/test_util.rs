//! Builders for SPDY wire data used by the unit tests.

use flate2::{Compress, Compression, FlushCompress};

use crate::control::ControlFrameKind;
use crate::dictionary::SPDY_DICTIONARY;
use crate::frame::{Frame, parse_frame};

/// Compressing side of a header-block stream, as a SPDY peer would run it.
pub(crate) struct HeaderBlockEncoder {
    deflater: Compress,
}

impl HeaderBlockEncoder {
    pub(crate) fn new() -> Self {
        let mut deflater = Compress::new(Compression::best(), true);
        deflater
            .set_dictionary(SPDY_DICTIONARY)
            .expect("set compression dictionary");
        Self { deflater }
    }

    /// Compress `input` and sync-flush, continuing the same stream.
    pub(crate) fn compress(&mut self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len() + 1024);
        let mut pos = 0;
        loop {
            let before = self.deflater.total_in();
            self.deflater
                .compress_vec(&input[pos..], &mut out, FlushCompress::Sync)
                .expect("compress header block");
            pos += (self.deflater.total_in() - before) as usize;
            if pos == input.len() && out.len() < out.capacity() {
                break;
            }
            out.reserve(1024);
        }
        out
    }

    /// Encode and compress a name/value header block.
    pub(crate) fn encode(&mut self, headers: &[(&str, &[&str])]) -> Vec<u8> {
        self.compress(&header_block(headers))
    }
}

/// Uncompressed name/value block. Names are written as given.
pub(crate) fn header_block(headers: &[(&str, &[&str])]) -> Vec<u8> {
    let mut block = Vec::new();
    block.extend_from_slice(&(headers.len() as u32).to_be_bytes());
    for (name, values) in headers {
        block.extend_from_slice(&(name.len() as u32).to_be_bytes());
        block.extend_from_slice(name.as_bytes());
        let value = values.join("\0");
        block.extend_from_slice(&(value.len() as u32).to_be_bytes());
        block.extend_from_slice(value.as_bytes());
    }
    block
}

/// Payload bytes a control frame carries before its header block.
pub(crate) fn payload_prefix(kind: ControlFrameKind, stream_id: u32) -> Vec<u8> {
    let len = kind.header_prefix_len().unwrap_or(0);
    let mut prefix = vec![0u8; len];
    if len >= 4 {
        prefix[..4].copy_from_slice(&stream_id.to_be_bytes());
    }
    prefix
}

/// Control frame payload: type-specific prefix followed by the compressed
/// header block, or just the prefix when `headers` is empty.
pub(crate) fn header_payload(
    encoder: &mut HeaderBlockEncoder,
    kind: ControlFrameKind,
    stream_id: u32,
    headers: &[(&str, &[&str])],
) -> Vec<u8> {
    let mut payload = payload_prefix(kind, stream_id);
    if !headers.is_empty() {
        payload.extend_from_slice(&encoder.encode(headers));
    }
    payload
}

/// Wire bytes of a SPDY/3 control frame.
pub(crate) fn control_frame_bytes(kind: ControlFrameKind, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + payload.len());
    bytes.extend_from_slice(&(0x8000u16 | 3).to_be_bytes());
    bytes.extend_from_slice(&kind.to_u16().to_be_bytes());
    bytes.push(flags);
    bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
    bytes.extend_from_slice(payload);
    bytes
}

/// Wire bytes of a data frame.
pub(crate) fn data_frame_bytes(stream_id: u32, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + payload.len());
    bytes.extend_from_slice(&(stream_id & 0x7fff_ffff).to_be_bytes());
    bytes.push(flags);
    bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
    bytes.extend_from_slice(payload);
    bytes
}

pub(crate) fn control_frame(kind: ControlFrameKind, payload: &[u8]) -> Frame {
    parse_frame(&control_frame_bytes(kind, 0, payload))
        .expect("valid control frame")
        .expect("complete control frame")
}

pub(crate) fn data_frame(stream_id: u32, payload: &[u8]) -> Frame {
    parse_frame(&data_frame_bytes(stream_id, 0, payload))
        .expect("valid data frame")
        .expect("complete data frame")
}
