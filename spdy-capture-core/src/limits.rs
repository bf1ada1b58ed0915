//! Frame and header-block size limits for SPDY readers.
//!
//! The wire format already caps a payload at 24 bits (16 MiB - 1). A reader
//! can be configured with a lower cap so that a hostile peer cannot make it
//! buffer that much for a single frame. Header blocks are compressed, so
//! their decompressed size is capped separately.

use crate::error::SpdyError;

/// Default maximum decompressed header block (1 MiB), the same bound Go's
/// HTTP server applies to request headers.
pub const DEFAULT_MAX_HEADER_BLOCK_SIZE: usize = 1024 * 1024;

/// Configuration for frame and header-block limits.
///
/// # Example
///
/// ```rust
/// use spdy_capture_core::FrameLimits;
///
/// // Only the 24-bit wire maximum; header blocks capped at 1 MiB
/// let limits = FrameLimits::default();
///
/// // Reject frames with more than 1 MiB of payload
/// let limits = FrameLimits::new(1024 * 1024);
///
/// // Also allow header blocks up to 8 MiB once decompressed
/// let limits = FrameLimits::new(1024 * 1024).with_max_header_block_size(8 * 1024 * 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLimits {
    /// Maximum payload of a single frame in bytes.
    /// `None` leaves only the wire maximum.
    max_payload_size: Option<usize>,
    /// Maximum decompressed size of a single header block.
    /// `None` means unlimited.
    max_header_block_size: Option<usize>,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_payload_size: None,
            max_header_block_size: Some(DEFAULT_MAX_HEADER_BLOCK_SIZE),
        }
    }
}

impl FrameLimits {
    /// Create limits with the specified maximum payload size in bytes.
    pub fn new(max_payload_size: usize) -> Self {
        Self {
            max_payload_size: Some(max_payload_size),
            ..Self::default()
        }
    }

    /// Create limits with no cap beyond the wire maximum, and no cap on
    /// decompressed header blocks.
    ///
    /// # Security Warning
    ///
    /// A small compressed header block can inflate to gigabytes. Only use
    /// this for trusted captures.
    pub fn unlimited() -> Self {
        Self {
            max_payload_size: None,
            max_header_block_size: None,
        }
    }

    /// Set the maximum decompressed header block size in bytes.
    pub fn with_max_header_block_size(mut self, max: usize) -> Self {
        self.max_header_block_size = Some(max);
        self
    }

    /// Returns the configured maximum payload size, or `None` if uncapped.
    pub fn max_payload_size(&self) -> Option<usize> {
        self.max_payload_size
    }

    /// Returns the maximum decompressed header block size, or `None` if
    /// unlimited.
    pub fn max_header_block_size(&self) -> Option<usize> {
        self.max_header_block_size
    }

    /// Check a declared payload size against the configured limit.
    pub fn check_size(&self, size: usize) -> Result<(), SpdyError> {
        if let Some(max) = self.max_payload_size {
            if size > max {
                return Err(SpdyError::FrameTooLarge { size, max });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MAX_PAYLOAD_SIZE;

    #[test]
    fn test_default_limits() {
        let limits = FrameLimits::default();
        assert_eq!(limits.max_payload_size(), None);
        assert_eq!(
            limits.max_header_block_size(),
            Some(DEFAULT_MAX_HEADER_BLOCK_SIZE)
        );
    }

    #[test]
    fn test_custom_limits() {
        let limits = FrameLimits::new(1024);
        assert_eq!(limits.max_payload_size(), Some(1024));
        assert_eq!(
            limits.max_header_block_size(),
            Some(DEFAULT_MAX_HEADER_BLOCK_SIZE)
        );
    }

    #[test]
    fn test_with_max_header_block_size() {
        let limits = FrameLimits::new(1024).with_max_header_block_size(4096);
        assert_eq!(limits.max_payload_size(), Some(1024));
        assert_eq!(limits.max_header_block_size(), Some(4096));
    }

    #[test]
    fn test_unlimited() {
        let limits = FrameLimits::unlimited();
        assert_eq!(limits.max_payload_size(), None);
        assert_eq!(limits.max_header_block_size(), None);
    }

    #[test]
    fn test_check_size_within_limit() {
        let limits = FrameLimits::new(1024);
        assert!(limits.check_size(0).is_ok());
        assert!(limits.check_size(1024).is_ok());
    }

    #[test]
    fn test_check_size_exceeds_limit() {
        let limits = FrameLimits::new(1024);
        let err = limits.check_size(1025).unwrap_err();
        assert_eq!(err, SpdyError::FrameTooLarge { size: 1025, max: 1024 });
        let msg = err.to_string();
        assert!(msg.contains("1025"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn test_check_size_unlimited() {
        let limits = FrameLimits::unlimited();
        assert!(limits.check_size(MAX_PAYLOAD_SIZE).is_ok());
    }
}
