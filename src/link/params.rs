//! Link parameters.

use std::time::Duration;

use crate::core::{
    ConfigError, DEFAULT_N2, DEFAULT_T1, DEFAULT_T2, DEFAULT_WINDOW, MAX_TIMER, Modulus,
};
use crate::frame::{Mode, Role};

/// Per-link configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkParams {
    /// Retransmission timer.
    pub t1: Duration,

    /// Acknowledgement delay timer. Must be shorter than T1.
    pub t2: Duration,

    /// Maximum number of T1 expiries before the link gives up.
    pub n2: u32,

    /// Maximum number of outstanding I-frames.
    pub window: u8,

    /// Numbering, role and addressing.
    pub mode: Mode,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            t1: DEFAULT_T1,
            t2: DEFAULT_T2,
            n2: DEFAULT_N2,
            window: DEFAULT_WINDOW,
            mode: Mode::default(),
        }
    }
}

impl LinkParams {
    /// Check the parameters are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.t1.is_zero() {
            return Err(ConfigError::ZeroTimer("T1"));
        }
        if self.t2.is_zero() {
            return Err(ConfigError::ZeroTimer("T2"));
        }
        if self.t1 > MAX_TIMER {
            return Err(ConfigError::TimerTooLong {
                name: "T1",
                ms: self.t1.as_millis(),
                max_ms: MAX_TIMER.as_millis(),
            });
        }
        if self.t2 >= self.t1 {
            return Err(ConfigError::T2NotBelowT1 {
                t1_ms: self.t1.as_millis(),
                t2_ms: self.t2.as_millis(),
            });
        }
        if self.n2 == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        let max = self.mode.modulus.max_window();
        if self.window == 0 || self.window > max {
            return Err(ConfigError::WindowOutOfRange {
                window: self.window,
                max,
            });
        }
        Ok(())
    }
}

/// Builder for [`LinkParams`].
///
/// ```
/// use std::time::Duration;
/// use lapb_link::link::LinkParamsBuilder;
///
/// let params = LinkParamsBuilder::new()
///     .extended()
///     .window(32)
///     .t1(Duration::from_secs(3))
///     .build()
///     .unwrap();
/// assert_eq!(params.window, 32);
/// ```
#[derive(Debug)]
pub struct LinkParamsBuilder {
    params: LinkParams,
}

impl LinkParamsBuilder {
    /// Create a new builder with default parameters.
    pub fn new() -> Self {
        Self {
            params: LinkParams::default(),
        }
    }

    /// Set T1.
    pub fn t1(mut self, t1: Duration) -> Self {
        self.params.t1 = t1;
        self
    }

    /// Set T2.
    pub fn t2(mut self, t2: Duration) -> Self {
        self.params.t2 = t2;
        self
    }

    /// Set N2.
    pub fn n2(mut self, n2: u32) -> Self {
        self.params.n2 = n2;
        self
    }

    /// Set the window size.
    pub fn window(mut self, window: u8) -> Self {
        self.params.window = window;
        self
    }

    /// Use extended (modulo 128) numbering.
    pub fn extended(mut self) -> Self {
        self.params.mode.modulus = Modulus::Extended;
        self
    }

    /// Set the station role.
    pub fn role(mut self, role: Role) -> Self {
        self.params.mode.role = role;
        self
    }

    /// Use multilink addressing.
    pub fn multilink(mut self, multilink: bool) -> Self {
        self.params.mode.multilink = multilink;
        self
    }

    /// Set the whole mode at once.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.params.mode = mode;
        self
    }

    /// Validate and build the parameters.
    pub fn build(self) -> Result<LinkParams, ConfigError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl Default for LinkParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
