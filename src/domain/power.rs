//! Power domain types
//!
//! Provides the power value type and the usage + limit sample.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power in milliwatts (stored internally) but displayed as watts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Power(u32);

impl Power {
    /// Create a new power value from watts
    pub const fn from_watts(watts: u32) -> Self {
        Self(watts.saturating_mul(1000))
    }

    /// Create a new power value from milliwatts
    pub const fn from_milliwatts(mw: u32) -> Self {
        Self(mw)
    }

    /// Get the power in whole watts
    ///
    /// Floor division: anything below 1000 mW reads as 0 W.
    #[inline]
    pub const fn as_watts(&self) -> u32 {
        self.0 / 1000
    }

    /// Get the power in milliwatts
    #[inline]
    pub const fn as_milliwatts(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}W", self.as_watts())
    }
}

/// Power draw and power management limit for one device
///
/// Zero in either field means the value could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PowerSample {
    pub usage: Power,
    pub limit: Power,
}

impl PowerSample {
    /// Value reported when nothing could be read
    pub const UNKNOWN: Self = Self {
        usage: Power::from_milliwatts(0),
        limit: Power::from_milliwatts(0),
    };

    /// Current draw in whole watts
    pub const fn usage_watts(&self) -> u32 {
        self.usage.as_watts()
    }

    /// Power management limit in whole watts
    pub const fn limit_watts(&self) -> u32 {
        self.limit.as_watts()
    }
}

impl fmt::Display for PowerSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.usage, self.limit)
    }
}
