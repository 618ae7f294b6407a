//! Core constants, error types, sequence numbering and the upper-layer trait.
//!
//! This module has no I/O dependencies and defines the vocabulary shared by
//! the codec and the link state machine.

mod constants;
mod error;
mod seq;
mod traits;

pub use constants::*;
pub use error::*;
pub use seq::*;
pub use traits::*;
