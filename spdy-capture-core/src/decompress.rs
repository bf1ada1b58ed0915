//! Persistent zlib stream for SPDY header blocks.
//!
//! All header blocks sent in one direction of a connection are compressed
//! with a single zlib stream, seeded with [`SPDY_DICTIONARY`] and sync-flushed
//! after every frame. Decoding a block therefore depends on every block that
//! came before it: the decompressor must live as long as the direction and
//! see every header-bearing frame, in order.

use bytes::Bytes;
use flate2::{Decompress, FlushDecompress, Status};

use crate::dictionary::SPDY_DICTIONARY;
use crate::error::SpdyError;
use crate::limits::DEFAULT_MAX_HEADER_BLOCK_SIZE;

const MIN_OUTPUT_CHUNK: usize = 256;

/// Decompressor for one connection direction.
///
/// Not `Clone`: a copy would fork the stream state.
pub struct HeaderDecompressor {
    /// Created on first use.
    inflater: Option<Decompress>,
    /// Largest block a single `feed` may produce; `None` is uncapped.
    max_output: Option<usize>,
    /// Set once the stream has rejected input.
    failure: Option<SpdyError>,
}

impl Default for HeaderDecompressor {
    fn default() -> Self {
        Self::with_max_output(Some(DEFAULT_MAX_HEADER_BLOCK_SIZE))
    }
}

impl HeaderDecompressor {
    /// Create a decompressor capped at [`DEFAULT_MAX_HEADER_BLOCK_SIZE`]
    /// bytes per block.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_output(max_output: Option<usize>) -> Self {
        Self {
            inflater: None,
            max_output,
            failure: None,
        }
    }

    pub fn max_output(&self) -> Option<usize> {
        self.max_output
    }

    /// Whether any compressed bytes have been fed yet.
    pub fn is_started(&self) -> bool {
        self.inflater.is_some()
    }

    /// Whether the stream has failed. A failed stream never recovers.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Total compressed bytes consumed over the stream's lifetime.
    pub fn total_in(&self) -> u64 {
        self.inflater.as_ref().map_or(0, Decompress::total_in)
    }

    /// Total bytes produced over the stream's lifetime.
    pub fn total_out(&self) -> u64 {
        self.inflater.as_ref().map_or(0, Decompress::total_out)
    }

    /// Decompress the next chunk of the stream.
    ///
    /// Returns everything the chunk makes available. The preset dictionary is
    /// supplied the first time the stream asks for it. Output past
    /// `max_output` fails the stream with [`SpdyError::HeaderBlockTooLarge`]
    /// before more of it is inflated.
    pub fn feed(&mut self, input: &[u8]) -> Result<Bytes, SpdyError> {
        if let Some(reason) = &self.failure {
            return Err(SpdyError::HeaderDecompression(format!(
                "stream previously failed: {reason}"
            )));
        }

        let inflater = self.inflater.get_or_insert_with(|| Decompress::new(true));
        match inflate_sync(inflater, input, self.max_output) {
            Ok(out) => Ok(Bytes::from(out)),
            Err(e) => {
                tracing::debug!(error = %e, "header decompression stream failed");
                self.failure = Some(e.clone());
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for HeaderDecompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderDecompressor")
            .field("started", &self.is_started())
            .field("max_output", &self.max_output)
            .field("total_in", &self.total_in())
            .field("total_out", &self.total_out())
            .field("failure", &self.failure)
            .finish()
    }
}

/// Run `input` through the stream until it is consumed and all flushed
/// output has been collected, never holding more than `max_output + 1`
/// output bytes.
fn inflate_sync(
    inflater: &mut Decompress,
    input: &[u8],
    max_output: Option<usize>,
) -> Result<Vec<u8>, SpdyError> {
    let limit = max_output.unwrap_or(usize::MAX);
    // One byte past the limit is enough to detect overflow.
    let ceiling = limit.saturating_add(1);
    let mut out = Vec::with_capacity(
        input
            .len()
            .saturating_mul(4)
            .max(MIN_OUTPUT_CHUNK)
            .min(ceiling),
    );
    let mut pos = 0;

    loop {
        if out.len() == out.capacity() {
            let grow = out
                .capacity()
                .max(MIN_OUTPUT_CHUNK)
                .min(ceiling - out.len());
            out.reserve_exact(grow);
        }

        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        let result = inflater.decompress_vec(&input[pos..], &mut out, FlushDecompress::Sync);
        pos += (inflater.total_in() - before_in) as usize;
        let progressed = inflater.total_in() != before_in || inflater.total_out() != before_out;

        if out.len() > limit {
            return Err(SpdyError::HeaderBlockTooLarge { max: limit });
        }

        match result {
            Ok(Status::StreamEnd) => break,
            Ok(Status::Ok) | Ok(Status::BufError) => {
                let has_room = out.len() < out.capacity();
                if pos >= input.len() && has_room {
                    break;
                }
                if !progressed && has_room {
                    return Err(SpdyError::HeaderDecompression(format!(
                        "stream stalled with {} unconsumed bytes",
                        input.len() - pos
                    )));
                }
            }
            Err(e) if e.needs_dictionary().is_some() => {
                inflater.set_dictionary(SPDY_DICTIONARY).map_err(|e| {
                    SpdyError::HeaderDecompression(format!("setting preset dictionary: {e}"))
                })?;
            }
            Err(e) => return Err(SpdyError::HeaderDecompression(e.to_string())),
        }
    }

    Ok(out)
}
