//! Protocol constants for LAPB (ISO 7776 / ITU-T X.25 section 2).
//!
//! Wire values are fixed by the protocol and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// CONTROL FIELD CODES
// =============================================================================

/// Information frame (bit 0 clear).
pub const CTRL_I: u8 = 0x00;

/// Receive Ready.
pub const CTRL_RR: u8 = 0x01;

/// Receive Not Ready.
pub const CTRL_RNR: u8 = 0x05;

/// Reject.
pub const CTRL_REJ: u8 = 0x09;

/// Set Asynchronous Balanced Mode.
pub const CTRL_SABM: u8 = 0x2F;

/// Set Asynchronous Balanced Mode Extended.
pub const CTRL_SABME: u8 = 0x6F;

/// Disconnect.
pub const CTRL_DISC: u8 = 0x43;

/// Disconnected Mode.
pub const CTRL_DM: u8 = 0x0F;

/// Unnumbered Acknowledgement.
pub const CTRL_UA: u8 = 0x63;

/// Frame Reject.
pub const CTRL_FRMR: u8 = 0x87;

/// Mask selecting the frame format bits of the first control octet.
pub const CTRL_FORMAT_MASK: u8 = 0x03;

/// Format bits of a supervisory frame.
pub const CTRL_FORMAT_S: u8 = 0x01;

/// Format bits of an unnumbered frame.
pub const CTRL_FORMAT_U: u8 = 0x03;

/// Poll/final bit in a one-octet control field.
pub const CTRL_PF: u8 = 0x10;

/// Poll/final bit in the second octet of an extended control field.
pub const CTRL_EXT_PF: u8 = 0x01;

// =============================================================================
// ADDRESSES
// =============================================================================

/// Single-link address A.
pub const ADDR_A: u8 = 0x03;

/// Single-link address B.
pub const ADDR_B: u8 = 0x01;

/// Multilink address C.
pub const ADDR_C: u8 = 0x0F;

/// Multilink address D.
pub const ADDR_D: u8 = 0x07;

// =============================================================================
// FRAME REJECT REASONS
// =============================================================================

/// W: control field invalid or not implemented.
pub const FRMR_W: u8 = 0x01;

/// X: information field not permitted with this frame type.
pub const FRMR_X: u8 = 0x02;

/// Z: invalid N(R).
pub const FRMR_Z: u8 = 0x08;

// =============================================================================
// SEQUENCE SPACE
// =============================================================================

/// Modulus of basic (modulo 8) operation.
pub const BASIC_MODULUS: u8 = 8;

/// Modulus of extended (modulo 128) operation.
pub const EXTENDED_MODULUS: u8 = 128;

/// Largest window permitted in basic mode.
pub const MAX_BASIC_WINDOW: u8 = 7;

/// Largest window permitted in extended mode.
pub const MAX_EXTENDED_WINDOW: u8 = 127;

// =============================================================================
// DEFAULT PARAMETERS
// =============================================================================

/// Default retransmission timer.
pub const DEFAULT_T1: Duration = Duration::from_secs(5);

/// Default acknowledgement delay timer.
pub const DEFAULT_T2: Duration = Duration::from_secs(1);

/// Longest accepted T1 or T2.
pub const MAX_TIMER: Duration = Duration::from_secs(24 * 60 * 60);

/// Default maximum number of T1 expiries before giving up.
pub const DEFAULT_N2: u32 = 20;

/// Default window size.
pub const DEFAULT_WINDOW: u8 = 7;
