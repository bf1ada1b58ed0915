//! SPDY/3 frame demultiplexing and header-block decoding.
//!
//! This crate recognizes frames on an intercepted SPDY connection, such as
//! the exec, attach and port-forward streams between an orchestration API
//! server and its client tool. It never encodes or sends frames: raw frame
//! bytes are handed back untouched for relaying.
//!
//! ## Modules
//!
//! - [`frame`]: 8-byte frame header and frame parsing
//! - [`control`]: control frame type table
//! - [`decompress`]: per-direction zlib stream for header blocks
//! - [`headers`]: name/value header block decoding
//! - [`reader`]: incremental reader for one connection direction
//! - [`limits`]: frame size limits
//! - [`stream`]: sub-stream classification and resize messages
//! - [`error`]: error type

mod control;
mod decompress;
mod dictionary;
mod error;
mod frame;
mod headers;
mod limits;
mod reader;
mod stream;

#[cfg(test)]
mod test_util;

pub use control::*;
pub use decompress::*;
pub use dictionary::*;
pub use error::*;
pub use frame::*;
pub use headers::*;
pub use limits::*;
pub use reader::*;
pub use stream::*;
