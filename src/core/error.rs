//! Error types for the LAPB engine.
//!
//! Protocol violations committed by the peer are never reported through these
//! types; they are handled inside the state machine with FRMR and surfaced to
//! the upper layer as notifications. These errors cover malformed input at the
//! codec boundary, rejected configuration and refused local requests.

use thiserror::Error;

/// Errors that can occur when decoding a received frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame shorter than address plus control field.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum length for this frame format.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },

    /// Address octet is not one this link answers to.
    #[error("unknown address 0x{0:02x}")]
    UnknownAddress(u8),
}

/// Errors in link parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A timer was configured as zero.
    #[error("timer {0} must be non-zero")]
    ZeroTimer(&'static str),

    /// A timer was configured longer than [`MAX_TIMER`](crate::core::MAX_TIMER).
    #[error("timer {name} ({ms} ms) exceeds the {max_ms} ms limit")]
    TimerTooLong {
        /// Timer name.
        name: &'static str,
        /// Configured value in milliseconds.
        ms: u128,
        /// Limit in milliseconds.
        max_ms: u128,
    },

    /// T2 must expire before the peer's T1 could.
    #[error("T2 ({t2_ms} ms) must be shorter than T1 ({t1_ms} ms)")]
    T2NotBelowT1 {
        /// Configured T1 in milliseconds.
        t1_ms: u128,
        /// Configured T2 in milliseconds.
        t2_ms: u128,
    },

    /// Retry count of zero.
    #[error("N2 must be at least 1")]
    ZeroRetries,

    /// Window outside the range allowed by the modulus.
    #[error("window {window} out of range 1..={max}")]
    WindowOutOfRange {
        /// Requested window.
        window: u8,
        /// Largest window allowed for the modulus.
        max: u8,
    },
}

/// Errors returned by local requests on a link.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Connect requested on a link that is already up.
    #[error("link already connected")]
    AlreadyConnected,

    /// Data or disconnect requested on a link that is not up.
    #[error("link not connected")]
    NotConnected,

    /// A link with this key is already registered.
    #[error("link already registered")]
    AlreadyRegistered,

    /// No link with this key is registered.
    #[error("unknown link")]
    UnknownLink,

    /// Invalid parameters.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The link driver task has stopped.
    #[error("link driver shut down")]
    Shutdown,
}

impl LinkError {
    /// Check if this error means the link can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::UnknownLink | LinkError::Shutdown)
    }
}

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(LinkError::Shutdown.is_fatal());
        assert!(LinkError::UnknownLink.is_fatal());

        assert!(!LinkError::NotConnected.is_fatal());
        assert!(!LinkError::AlreadyConnected.is_fatal());
        assert!(!LinkError::Config(ConfigError::ZeroRetries).is_fatal());
    }

    #[test]
    fn test_config_error_converts() {
        let err: LinkError = ConfigError::ZeroTimer("T1").into();
        assert_eq!(err, LinkError::Config(ConfigError::ZeroTimer("T1")));
        assert_eq!(err.to_string(), "configuration error: timer T1 must be non-zero");
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::TooShort {
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.to_string(), "frame too short: expected at least 2 bytes, got 1");
        assert_eq!(
            DecodeError::UnknownAddress(0x42).to_string(),
            "unknown address 0x42"
        );
    }
}
