//! # lapb-link
//!
//! A LAPB (Link Access Procedure, Balanced) data link engine: the
//! connection-oriented, sliding-window, retransmission-and-reject protocol
//! that carries X.25 packets over a point-to-point link.
//!
//! The engine is sans-IO. A [`Link`](link::Link) consumes received frames and
//! local requests and produces encoded frames, timer deadlines and upper-layer
//! callbacks; the caller moves bytes and keeps time. HDLC flags, bit stuffing
//! and the FCS belong to the transport underneath.
//!
//! ## Feature Flags
//!
//! - `runtime` (default): a tokio task per link driving timers and the
//!   transmit path
//!
//! ## Modules
//!
//! - [`core`]: constants, error types, sequence numbering and the
//!   [`UpperLayer`](core::UpperLayer) trait
//! - [`frame`]: frame model and wire codec
//! - [`link`]: link state, transition engine, timers, transmit queue and
//!   the [`LinkTable`](link::LinkTable) registry
//! - [`runtime`]: async driver (requires `runtime` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use std::time::Instant;
//!
//! use bytes::Bytes;
//! use lapb_link::prelude::*;
//!
//! #[derive(Default)]
//! struct Sink(Vec<Bytes>);
//!
//! impl UpperLayer for Sink {
//!     fn connect_indication(&mut self) {}
//!     fn connect_confirmation(&mut self) {}
//!     fn disconnect_indication(&mut self, _reason: DisconnectReason) {}
//!     fn disconnect_confirmation(&mut self, _reason: DisconnectReason) {}
//!     fn data_indication(&mut self, payload: Bytes) -> Delivery {
//!         self.0.push(payload);
//!         Delivery::Accepted
//!     }
//! }
//!
//! let now = Instant::now();
//! let mut dte = Link::new(LinkParams::default()).unwrap();
//! let mut dce = Link::new(LinkParamsBuilder::new().role(Role::Dce).build().unwrap()).unwrap();
//! let (mut dte_up, mut dce_up) = (Sink::default(), Sink::default());
//!
//! dte.connect_request(now).unwrap();
//! let sabm = dte.poll_transmit().unwrap();
//! dce.data_input(now, sabm, &mut dce_up);
//! let ua = dce.poll_transmit().unwrap();
//! dte.data_input(now, ua, &mut dte_up);
//! assert_eq!(dte.state(), LinkState::DataTransfer);
//!
//! dte.data_request(now, Bytes::from_static(b"hello")).unwrap();
//! let iframe = dte.poll_transmit().unwrap();
//! dce.data_input(now, iframe, &mut dce_up);
//! assert_eq!(dce_up.0, vec![Bytes::from_static(b"hello")]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Frame model and codec
pub mod frame;

// Link state machine
pub mod link;

// Async driver (feature-gated)
#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub mod runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        ConfigError, DecodeError, Delivery, DisconnectReason, LinkError, LinkResult, Modulus,
        UpperLayer,
    };
    pub use crate::frame::{Direction, Frame, FrameKind, Mode, Role};
    pub use crate::link::{Link, LinkParams, LinkParamsBuilder, LinkState, LinkTable};

    #[cfg(feature = "runtime")]
    pub use crate::runtime::{LinkEvent, LinkHandle, spawn_link};
}

// Re-export commonly used items at crate root
pub use crate::core::{Delivery, DisconnectReason, LinkError, LinkResult, UpperLayer};
pub use crate::link::{Link, LinkParams, LinkState};

#[cfg(feature = "runtime")]
pub use crate::runtime::{LinkEvent, LinkHandle, spawn_link};
