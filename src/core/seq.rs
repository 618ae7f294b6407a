//! Sequence numbering.
//!
//! LAPB numbers frames modulo 8 (basic) or modulo 128 (extended). All state
//! variables and received N(S)/N(R) values live in `[0, modulus)`.

use super::constants::{
    BASIC_MODULUS, EXTENDED_MODULUS, MAX_BASIC_WINDOW, MAX_EXTENDED_WINDOW,
};

/// Sequence numbering scheme of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Modulus {
    /// Numbers cycle through 0 to 7; one-octet control fields.
    #[default]
    Basic,
    /// Numbers cycle through 0 to 127; two-octet I and S control fields.
    Extended,
}

impl Modulus {
    /// Size of the sequence space.
    pub fn value(self) -> u8 {
        match self {
            Modulus::Basic => BASIC_MODULUS,
            Modulus::Extended => EXTENDED_MODULUS,
        }
    }

    /// Largest window this scheme allows.
    pub fn max_window(self) -> u8 {
        match self {
            Modulus::Basic => MAX_BASIC_WINDOW,
            Modulus::Extended => MAX_EXTENDED_WINDOW,
        }
    }

    /// Check if this is extended (modulo 128) operation.
    pub fn is_extended(self) -> bool {
        self == Modulus::Extended
    }

    /// Returns the sequence number following `seq`.
    pub fn next(self, seq: u8) -> u8 {
        self.add(seq, 1)
    }

    /// Returns `seq + n` reduced to the sequence space.
    pub fn add(self, seq: u8, n: u8) -> u8 {
        ((u16::from(seq) + u16::from(n)) % u16::from(self.value())) as u8
    }

    /// Number of steps from `from` forward to `to`.
    pub fn distance(self, from: u8, to: u8) -> u8 {
        let m = u16::from(self.value());
        ((u16::from(to) + m - u16::from(from) % m) % m) as u8
    }

    /// Check if `seq` lies in the circular interval `[start, end]`.
    pub fn in_range(self, seq: u8, start: u8, end: u8) -> bool {
        if seq >= self.value() {
            return false;
        }
        self.distance(start, seq) <= self.distance(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_wraps() {
        assert_eq!(Modulus::Basic.next(0), 1);
        assert_eq!(Modulus::Basic.next(7), 0);
        assert_eq!(Modulus::Extended.next(7), 8);
        assert_eq!(Modulus::Extended.next(127), 0);
    }

    #[test]
    fn test_distance() {
        assert_eq!(Modulus::Basic.distance(2, 5), 3);
        assert_eq!(Modulus::Basic.distance(6, 1), 3);
        assert_eq!(Modulus::Basic.distance(4, 4), 0);
        assert_eq!(Modulus::Extended.distance(120, 3), 11);
    }

    #[test]
    fn test_in_range_plain() {
        assert!(Modulus::Basic.in_range(2, 2, 3));
        assert!(Modulus::Basic.in_range(3, 2, 3));
        assert!(!Modulus::Basic.in_range(5, 2, 3));
        assert!(!Modulus::Basic.in_range(1, 2, 3));
    }

    #[test]
    fn test_in_range_wrapped() {
        // Window 6..=1 wraps through 7 and 0
        for seq in [6, 7, 0, 1] {
            assert!(Modulus::Basic.in_range(seq, 6, 1), "seq {seq}");
        }
        for seq in 2..6 {
            assert!(!Modulus::Basic.in_range(seq, 6, 1), "seq {seq}");
        }
    }

    #[test]
    fn test_in_range_empty_window() {
        assert!(Modulus::Basic.in_range(4, 4, 4));
        assert!(!Modulus::Basic.in_range(5, 4, 4));
    }

    #[test]
    fn test_in_range_rejects_out_of_space() {
        assert!(!Modulus::Basic.in_range(8, 0, 7));
        assert!(Modulus::Extended.in_range(100, 0, 127));
    }
}
