//! Frame encoding and decoding.
//!
//! Control field layouts:
//!
//! ```text
//! basic I:    N(R) N(R) N(R) P    N(S) N(S) N(S) 0
//! basic S:    N(R) N(R) N(R) P/F  S    S    0    1
//! U:          M    M    M    P/F  M    M    1    1
//! extended I: N(S)...N(S) 0 | N(R)...N(R) P
//! extended S: 0 0 0 0 S S 0 1 | N(R)...N(R) P/F
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::{Direction, Frame, FrameKind, Mode, Role, Violation};
use crate::core::{
    ADDR_A, ADDR_B, ADDR_C, ADDR_D, CTRL_EXT_PF, CTRL_FORMAT_MASK, CTRL_FORMAT_S, CTRL_FRMR,
    CTRL_I, CTRL_PF, DecodeError,
};

/// Minimum frame length: address plus a one-octet control field.
pub const MIN_FRAME_LEN: usize = 2;

/// Minimum length of an extended I or S frame.
pub const MIN_EXTENDED_NUMBERED_LEN: usize = 3;

/// Frame rejected by this station, retained so the FRMR can be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrmrRecord {
    /// Control field of the rejected frame.
    pub control: [u8; 2],
    /// Whether the rejected frame was a command or a response.
    pub cr: Direction,
    /// Reason for rejection.
    pub violation: Violation,
}

impl FrmrRecord {
    /// Record a rejected frame.
    pub fn new(frame: &Frame, violation: Violation) -> Self {
        Self {
            control: frame.control,
            cr: frame.cr,
            violation,
        }
    }
}

/// Address octet to put on an outbound frame.
pub fn address(mode: Mode, cr: Direction) -> u8 {
    match (mode.multilink, mode.role, cr) {
        (false, Role::Dte, Direction::Command) => ADDR_B,
        (false, Role::Dte, Direction::Response) => ADDR_A,
        (false, Role::Dce, Direction::Command) => ADDR_A,
        (false, Role::Dce, Direction::Response) => ADDR_B,
        (true, Role::Dte, Direction::Command) => ADDR_D,
        (true, Role::Dte, Direction::Response) => ADDR_C,
        (true, Role::Dce, Direction::Command) => ADDR_C,
        (true, Role::Dce, Direction::Response) => ADDR_D,
    }
}

/// Classify an inbound address octet as command or response.
///
/// The peer uses the opposite role, so a command arriving here carries the
/// address we would put on a response.
pub fn classify_address(mode: Mode, addr: u8) -> Option<Direction> {
    if addr == address(mode, Direction::Response) {
        Some(Direction::Command)
    } else if addr == address(mode, Direction::Command) {
        Some(Direction::Response)
    } else {
        None
    }
}

/// Decode a received frame.
///
/// Structurally invalid frames whose address and control octets could be read
/// (unknown control codes, information fields where none is allowed) decode
/// to [`FrameKind::Illegal`] so the state machine can answer them with FRMR.
pub fn decode(mode: Mode, raw: Bytes) -> Result<Frame, DecodeError> {
    if raw.len() < MIN_FRAME_LEN {
        return Err(DecodeError::TooShort {
            expected: MIN_FRAME_LEN,
            actual: raw.len(),
        });
    }

    let cr = classify_address(mode, raw[0]).ok_or(DecodeError::UnknownAddress(raw[0]))?;
    let c0 = raw[1];

    let mut frame = Frame {
        kind: FrameKind::Illegal,
        ns: 0,
        nr: 0,
        pf: false,
        cr,
        control: [c0, 0],
        info: Bytes::new(),
    };

    let is_i = c0 & 0x01 == CTRL_I;
    let is_s = c0 & CTRL_FORMAT_MASK == CTRL_FORMAT_S;

    let body = if (is_i || is_s) && mode.is_extended() {
        if raw.len() < MIN_EXTENDED_NUMBERED_LEN {
            return Err(DecodeError::TooShort {
                expected: MIN_EXTENDED_NUMBERED_LEN,
                actual: raw.len(),
            });
        }
        let c1 = raw[2];
        frame.control[1] = c1;
        frame.nr = (c1 >> 1) & 0x7F;
        frame.pf = c1 & CTRL_EXT_PF != 0;
        if is_i {
            frame.kind = FrameKind::I;
            frame.ns = (c0 >> 1) & 0x7F;
        } else {
            frame.kind = FrameKind::from_s_code(c0 & 0x0F);
        }
        raw.slice(MIN_EXTENDED_NUMBERED_LEN..)
    } else {
        frame.pf = c0 & CTRL_PF != 0;
        if is_i {
            frame.kind = FrameKind::I;
            frame.ns = (c0 >> 1) & 0x07;
            frame.nr = (c0 >> 5) & 0x07;
        } else if is_s {
            frame.kind = FrameKind::from_s_code(c0 & 0x0F);
            frame.nr = (c0 >> 5) & 0x07;
        } else {
            frame.kind = FrameKind::from_u_code(c0 & !CTRL_PF);
        }
        raw.slice(MIN_FRAME_LEN..)
    };

    let info_allowed = matches!(
        frame.kind,
        FrameKind::I | FrameKind::Frmr | FrameKind::Illegal
    );
    if !body.is_empty() && !info_allowed {
        frame.kind = FrameKind::Illegal;
    }
    frame.info = body;

    Ok(frame)
}

/// Encode an unnumbered or supervisory frame.
///
/// `nr` is only used for supervisory frames.
pub fn encode_control(mode: Mode, kind: FrameKind, pf: bool, cr: Direction, nr: u8) -> Bytes {
    let code = kind.code().unwrap_or(0);
    let mut buf = BytesMut::with_capacity(3);
    buf.put_u8(address(mode, cr));

    if kind.is_supervisory() && mode.is_extended() {
        buf.put_u8(code);
        buf.put_u8((nr << 1) | if pf { CTRL_EXT_PF } else { 0 });
    } else {
        let mut c0 = code | if pf { CTRL_PF } else { 0 };
        if kind.is_supervisory() {
            c0 |= (nr & 0x07) << 5;
        }
        buf.put_u8(c0);
    }

    buf.freeze()
}

/// Encode an I-frame. I-frames are always commands.
pub fn encode_iframe(mode: Mode, ns: u8, nr: u8, pf: bool, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(3 + payload.len());
    buf.put_u8(address(mode, Direction::Command));

    if mode.is_extended() {
        buf.put_u8((ns << 1) & 0xFE);
        buf.put_u8((nr << 1) | if pf { CTRL_EXT_PF } else { 0 });
    } else {
        let mut c0 = ((ns & 0x07) << 1) | ((nr & 0x07) << 5);
        if pf {
            c0 |= CTRL_PF;
        }
        buf.put_u8(c0);
    }

    buf.put_slice(payload);
    buf.freeze()
}

/// Encode an FRMR response.
///
/// The information field holds the rejected control field, the current V(S)
/// and V(R) with the C/R bit of the rejected frame, and the reason bits.
pub fn encode_frmr(mode: Mode, record: &FrmrRecord, vs: u8, vr: u8) -> Bytes {
    let response = record.cr == Direction::Response;
    let mut buf = BytesMut::with_capacity(7);
    buf.put_u8(address(mode, Direction::Response));
    buf.put_u8(CTRL_FRMR);

    if mode.is_extended() {
        buf.put_u8(record.control[0]);
        buf.put_u8(record.control[1]);
        buf.put_u8((vs << 1) & 0xFE);
        buf.put_u8(((vr << 1) & 0xFE) | if response { 0x01 } else { 0 });
    } else {
        buf.put_u8(record.control[0]);
        let mut octet = ((vs << 1) & 0x0E) | ((vr << 5) & 0xE0);
        if response {
            octet |= 0x10;
        }
        buf.put_u8(octet);
    }

    buf.put_u8(record.violation.bits());
    buf.freeze()
}
