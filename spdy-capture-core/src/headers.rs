//! SPDY/3 name/value header blocks.
//!
//! SYN_STREAM, SYN_REPLY and HEADERS frames carry a zlib-compressed header
//! block after a fixed, type-specific prefix. Decompressed, the block is:
//!
//! ```text
//! [count:4]
//! repeated count times:
//!   [name_len:4][name][value_len:4][value]
//! ```
//!
//! A value holding several values joins them with a `0x00` byte.
//!
//! Names include SPDY pseudo-headers such as `:method` and `:status`, and
//! values are opaque bytes, so blocks decode into [`HeaderBlock`] rather
//! than an HTTP header map.

use bytes::{Buf, Bytes};

use crate::decompress::HeaderDecompressor;
use crate::error::SpdyError;
use crate::frame::{Frame, FrameKind};

/// Separator between the values of a multi-valued header.
pub const HEADER_VALUE_SEPARATOR: u8 = 0x00;

const LENGTH_FIELD_SIZE: usize = 4;

/// A decoded name/value header block.
///
/// Entries keep the order they had on the wire. Names are lowercase; values
/// are kept byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    entries: Vec<(Bytes, Vec<Bytes>)>,
}

impl HeaderBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one value under `name`, folded to lowercase.
    ///
    /// A name seen before gets the value appended to its existing entry.
    pub fn append(&mut self, name: &[u8], value: impl Into<Bytes>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n[..] == name[..]) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((Bytes::from(name), vec![value])),
        }
    }

    /// All values for `name`. Lookup ignores ASCII case.
    pub fn get(&self, name: &str) -> Option<&[Bytes]> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.as_bytes()))
            .map(|(_, values)| values.as_slice())
    }

    /// First value for `name`, if it is valid UTF-8.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        let value = self.get(name)?.first()?;
        std::str::from_utf8(value).ok()
    }

    /// Entries in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[Bytes])> {
        self.entries
            .iter()
            .map(|(name, values)| (&name[..], values.as_slice()))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode the header block carried by a control frame.
///
/// # Returns
/// - `Ok(Some(headers))` for a frame carrying a non-empty header block
/// - `Ok(None)` if the frame type carries no header block (PING, SETTINGS,
///   ...) or the block is absent; the decompressor is untouched
/// - `Err(NotAControlFrame)` for data frames
/// - `Err(ShortPayload)` if the payload ends inside the type-specific prefix
/// - `Err(HeaderDecompression)` / `Err(HeaderBlockTooLarge)` /
///   `Err(TruncatedHeaderBlock)` for a corrupt or oversized block
///
/// Every header-bearing frame of a direction must pass through the same
/// `decompressor`, in the order received.
pub fn decode_headers(
    frame: &Frame,
    decompressor: &mut HeaderDecompressor,
) -> Result<Option<HeaderBlock>, SpdyError> {
    let kind = match frame.kind() {
        FrameKind::Control { kind, .. } => kind,
        FrameKind::Data { stream_id } => return Err(SpdyError::NotAControlFrame { stream_id }),
    };

    let Some(prefix_len) = kind.header_prefix_len() else {
        return Ok(None);
    };

    let payload = frame.payload();
    if payload.len() < prefix_len {
        return Err(SpdyError::ShortPayload {
            kind,
            need: prefix_len,
            actual: payload.len(),
        });
    }

    let compressed = &payload[prefix_len..];
    if compressed.is_empty() {
        return Ok(None);
    }

    let block = decompressor.feed(compressed)?;
    let headers = parse_header_block(block)?;
    tracing::trace!(
        frame.kind = %kind,
        headers.count = headers.len(),
        "decoded SPDY header block"
    );
    Ok(Some(headers))
}

/// Parse a decompressed name/value block.
pub fn parse_header_block(mut block: Bytes) -> Result<HeaderBlock, SpdyError> {
    let count = read_length(&mut block, "count")?;
    let mut headers = HeaderBlock::new();

    for _ in 0..count {
        let name_len = read_length(&mut block, "name length")?;
        let name = take(&mut block, name_len, "name")?;
        let value_len = read_length(&mut block, "value length")?;
        let mut value = take(&mut block, value_len, "value")?;

        loop {
            match value.iter().position(|b| *b == HEADER_VALUE_SEPARATOR) {
                Some(end) => {
                    let part = value.split_to(end);
                    value.advance(1);
                    headers.append(&name, part);
                }
                None => {
                    headers.append(&name, value);
                    break;
                }
            }
        }
    }

    Ok(headers)
}

fn read_length(block: &mut Bytes, field: &'static str) -> Result<usize, SpdyError> {
    if block.remaining() < LENGTH_FIELD_SIZE {
        return Err(SpdyError::TruncatedHeaderBlock {
            field,
            need: LENGTH_FIELD_SIZE,
            available: block.remaining(),
        });
    }
    Ok(block.get_u32() as usize)
}

fn take(block: &mut Bytes, len: usize, field: &'static str) -> Result<Bytes, SpdyError> {
    if block.remaining() < len {
        return Err(SpdyError::TruncatedHeaderBlock {
            field,
            need: len,
            available: block.remaining(),
        });
    }
    Ok(block.split_to(len))
}
