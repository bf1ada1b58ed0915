//! SPDY/3 control frame types.
//!
//! Each known type code has a descriptor in [`CONTROL_FRAMES`]. Kinds that
//! carry a compressed name/value header block also record how many payload
//! bytes precede that block, so header decoding never branches on the kind
//! itself.

use std::fmt;

/// SPDY control frame type.
///
/// Unknown type codes are preserved rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFrameKind {
    SynStream,
    SynReply,
    RstStream,
    Settings,
    /// SPDY/2 only; unused on SPDY/3 connections.
    Noop,
    /// Also called SYN_PING.
    Ping,
    GoAway,
    Headers,
    WindowUpdate,
    Credential,
    Unknown(u16),
}

/// Static description of a known control frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrameSpec {
    /// Type code on the wire.
    pub code: u16,
    pub kind: ControlFrameKind,
    /// Protocol name, e.g. `SYN_STREAM`.
    pub name: &'static str,
    /// Payload bytes before the header block, or `None` if the kind carries
    /// no header block.
    pub header_prefix_len: Option<usize>,
}

/// Descriptor table for every known control frame type.
pub const CONTROL_FRAMES: &[ControlFrameSpec] = &[
    // Stream-ID (4) + Associated-To-Stream-ID (4) + Pri/Unused/Slot (2)
    ControlFrameSpec {
        code: 1,
        kind: ControlFrameKind::SynStream,
        name: "SYN_STREAM",
        header_prefix_len: Some(10),
    },
    // Stream-ID (4)
    ControlFrameSpec {
        code: 2,
        kind: ControlFrameKind::SynReply,
        name: "SYN_REPLY",
        header_prefix_len: Some(4),
    },
    ControlFrameSpec {
        code: 3,
        kind: ControlFrameKind::RstStream,
        name: "RST_STREAM",
        header_prefix_len: None,
    },
    ControlFrameSpec {
        code: 4,
        kind: ControlFrameKind::Settings,
        name: "SETTINGS",
        header_prefix_len: None,
    },
    ControlFrameSpec {
        code: 5,
        kind: ControlFrameKind::Noop,
        name: "NOOP",
        header_prefix_len: None,
    },
    ControlFrameSpec {
        code: 6,
        kind: ControlFrameKind::Ping,
        name: "PING",
        header_prefix_len: None,
    },
    ControlFrameSpec {
        code: 7,
        kind: ControlFrameKind::GoAway,
        name: "GOAWAY",
        header_prefix_len: None,
    },
    // Same layout as SYN_REPLY.
    ControlFrameSpec {
        code: 8,
        kind: ControlFrameKind::Headers,
        name: "HEADERS",
        header_prefix_len: Some(4),
    },
    ControlFrameSpec {
        code: 9,
        kind: ControlFrameKind::WindowUpdate,
        name: "WINDOW_UPDATE",
        header_prefix_len: None,
    },
    ControlFrameSpec {
        code: 10,
        kind: ControlFrameKind::Credential,
        name: "CREDENTIAL",
        header_prefix_len: None,
    },
];

impl ControlFrameKind {
    /// Classify a wire type code.
    pub fn from_u16(code: u16) -> Self {
        CONTROL_FRAMES
            .iter()
            .find(|spec| spec.code == code)
            .map(|spec| spec.kind)
            .unwrap_or(ControlFrameKind::Unknown(code))
    }

    /// The wire type code.
    pub fn to_u16(self) -> u16 {
        match self {
            ControlFrameKind::Unknown(code) => code,
            kind => kind.spec().map(|spec| spec.code).unwrap_or_default(),
        }
    }

    /// Table entry for this kind, `None` for unknown codes.
    pub fn spec(self) -> Option<&'static ControlFrameSpec> {
        CONTROL_FRAMES.iter().find(|spec| spec.kind == self)
    }

    /// Payload bytes preceding the header block, `None` if the kind carries
    /// no header block.
    pub fn header_prefix_len(self) -> Option<usize> {
        self.spec().and_then(|spec| spec.header_prefix_len)
    }
}

impl From<u16> for ControlFrameKind {
    fn from(code: u16) -> Self {
        ControlFrameKind::from_u16(code)
    }
}

impl fmt::Display for ControlFrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.spec() {
            Some(spec) => write!(f, "{}", spec.name),
            None => write!(f, "UNKNOWN(0x{:04x})", self.to_u16()),
        }
    }
}
