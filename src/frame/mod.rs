//! LAPB frame model and wire codec.
//!
//! A frame on the wire is an address octet, a control field and an optional
//! information field:
//!
//! ```text
//! +---------+-----------------+----------------------+
//! | Address | Control         | Information          |
//! | 1 byte  | 1 or 2 bytes    | I and FRMR only      |
//! +---------+-----------------+----------------------+
//! ```
//!
//! HDLC flags, bit stuffing and the FCS belong to the transport and are not
//! handled here.

mod codec;

pub use codec::*;

use bytes::Bytes;

use crate::core::{
    CTRL_DISC, CTRL_DM, CTRL_FORMAT_MASK, CTRL_FORMAT_S, CTRL_FORMAT_U, CTRL_FRMR, CTRL_PF,
    CTRL_REJ, CTRL_RNR, CTRL_RR, CTRL_SABM, CTRL_SABME, CTRL_UA, FRMR_W, FRMR_X, FRMR_Z,
    Modulus,
};

/// Which end of the physical link this station is.
///
/// The role only decides which address carries commands in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Data terminal equipment.
    #[default]
    Dte,
    /// Data circuit-terminating equipment.
    Dce,
}

/// Operating mode of a link: numbering, role and addressing plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mode {
    /// Sequence numbering scheme.
    pub modulus: Modulus,
    /// DTE or DCE.
    pub role: Role,
    /// Use the multilink (C/D) address pair instead of single link (A/B).
    pub multilink: bool,
}

impl Mode {
    /// Basic-mode DTE on a single link.
    pub fn basic() -> Self {
        Self::default()
    }

    /// Extended-mode DTE on a single link.
    pub fn extended() -> Self {
        Self {
            modulus: Modulus::Extended,
            ..Self::default()
        }
    }

    /// Same mode with the given role.
    pub fn with_role(self, role: Role) -> Self {
        Self { role, ..self }
    }

    /// Same mode using multilink addressing.
    pub fn with_multilink(self) -> Self {
        Self {
            multilink: true,
            ..self
        }
    }

    /// Check if this is extended (modulo 128) operation.
    pub fn is_extended(&self) -> bool {
        self.modulus.is_extended()
    }
}

/// Command or response, derived from the address octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Frame is a command.
    Command,
    /// Frame is a response.
    Response,
}

/// Frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Set Asynchronous Balanced Mode.
    Sabm,
    /// Set Asynchronous Balanced Mode Extended.
    Sabme,
    /// Disconnect.
    Disc,
    /// Unnumbered Acknowledgement.
    Ua,
    /// Disconnected Mode.
    Dm,
    /// Frame Reject.
    Frmr,
    /// Receive Ready.
    Rr,
    /// Receive Not Ready.
    Rnr,
    /// Reject.
    Rej,
    /// Information.
    I,
    /// Undecodable or structurally invalid frame.
    Illegal,
}

impl FrameKind {
    /// Map a supervisory control code (low nibble) to a frame type.
    pub fn from_s_code(code: u8) -> Self {
        match code {
            CTRL_RR => FrameKind::Rr,
            CTRL_RNR => FrameKind::Rnr,
            CTRL_REJ => FrameKind::Rej,
            _ => FrameKind::Illegal,
        }
    }

    /// Map an unnumbered control code (P/F masked) to a frame type.
    pub fn from_u_code(code: u8) -> Self {
        match code {
            CTRL_SABM => FrameKind::Sabm,
            CTRL_SABME => FrameKind::Sabme,
            CTRL_DISC => FrameKind::Disc,
            CTRL_UA => FrameKind::Ua,
            CTRL_DM => FrameKind::Dm,
            CTRL_FRMR => FrameKind::Frmr,
            _ => FrameKind::Illegal,
        }
    }

    /// Control code of this frame type, without P/F or sequence numbers.
    ///
    /// Returns `None` for I-frames and illegal frames.
    pub fn code(self) -> Option<u8> {
        match self {
            FrameKind::Sabm => Some(CTRL_SABM),
            FrameKind::Sabme => Some(CTRL_SABME),
            FrameKind::Disc => Some(CTRL_DISC),
            FrameKind::Ua => Some(CTRL_UA),
            FrameKind::Dm => Some(CTRL_DM),
            FrameKind::Frmr => Some(CTRL_FRMR),
            FrameKind::Rr => Some(CTRL_RR),
            FrameKind::Rnr => Some(CTRL_RNR),
            FrameKind::Rej => Some(CTRL_REJ),
            FrameKind::I | FrameKind::Illegal => None,
        }
    }

    /// Check if this is a supervisory frame type.
    pub fn is_supervisory(self) -> bool {
        matches!(self, FrameKind::Rr | FrameKind::Rnr | FrameKind::Rej)
    }

    /// Check if this frame carries N(R).
    pub fn is_numbered(self) -> bool {
        self == FrameKind::I || self.is_supervisory()
    }

    /// Check if this is a link set-up command (SABM or SABME).
    pub fn is_set_mode(self) -> bool {
        matches!(self, FrameKind::Sabm | FrameKind::Sabme)
    }
}

/// Why a frame is being rejected with FRMR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// W: control field invalid or not implemented.
    InvalidControl,
    /// W and X: an information field on a frame type that may not carry one.
    InfoNotPermitted,
    /// Z: N(R) outside `[V(A), V(S)]`.
    InvalidNr,
}

impl Violation {
    /// Reason bits carried in the last octet of the FRMR information field.
    pub fn bits(self) -> u8 {
        match self {
            Violation::InvalidControl => FRMR_W,
            Violation::InfoNotPermitted => FRMR_W | FRMR_X,
            Violation::InvalidNr => FRMR_Z,
        }
    }
}

/// A decoded frame.
///
/// Frames are immutable values; the engine never keeps one beyond the call
/// that processes it, except as the copy saved for an outstanding FRMR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type.
    pub kind: FrameKind,
    /// N(S), meaningful for I-frames only.
    pub ns: u8,
    /// N(R), meaningful for I, RR, RNR and REJ.
    pub nr: u8,
    /// Poll (command) or final (response) bit.
    pub pf: bool,
    /// Command or response.
    pub cr: Direction,
    /// Raw control field; the second octet is zero for one-octet fields.
    pub control: [u8; 2],
    /// Information field.
    pub info: Bytes,
}

impl Frame {
    /// An illegal frame standing in for input that could not be decoded.
    pub fn illegal(control: [u8; 2]) -> Self {
        Self {
            kind: FrameKind::Illegal,
            ns: 0,
            nr: 0,
            pf: false,
            cr: Direction::Command,
            control,
            info: Bytes::new(),
        }
    }

    /// Build an unnumbered or supervisory frame, mainly for tests and tooling.
    pub fn control(kind: FrameKind, pf: bool, cr: Direction) -> Self {
        let code = kind.code().unwrap_or(0);
        Self {
            kind,
            ns: 0,
            nr: 0,
            pf,
            cr,
            control: [code | if pf { CTRL_PF } else { 0 }, 0],
            info: Bytes::new(),
        }
    }

    /// Set N(R).
    pub fn with_nr(mut self, nr: u8) -> Self {
        self.nr = nr;
        self
    }

    /// Build an I-frame command.
    pub fn iframe(ns: u8, nr: u8, pf: bool, info: Bytes) -> Self {
        Self {
            kind: FrameKind::I,
            ns,
            nr,
            pf,
            cr: Direction::Command,
            control: [ns << 1, 0],
            info,
        }
    }

    /// Classify why this illegal frame violates the frame format.
    pub fn format_violation(&self) -> Violation {
        let c0 = self.control[0];
        let known = match c0 & CTRL_FORMAT_MASK {
            CTRL_FORMAT_S => FrameKind::from_s_code(c0 & 0x0F) != FrameKind::Illegal,
            CTRL_FORMAT_U => FrameKind::from_u_code(c0 & !CTRL_PF) != FrameKind::Illegal,
            _ => false,
        };
        if known && !self.info.is_empty() {
            Violation::InfoNotPermitted
        } else {
            Violation::InvalidControl
        }
    }
}
