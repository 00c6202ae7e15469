//! Clock domain types
//!
//! Types for GPU clock rates and the core/memory clock pair.

use serde::{Deserialize, Serialize};

/// GPU clock speed in MHz
///
/// Zero means the clock could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClockSpeed(u32);

impl ClockSpeed {
    /// Create a new clock speed value
    pub const fn new(mhz: u32) -> Self {
        Self(mhz)
    }

    /// Get clock speed in MHz
    pub const fn as_mhz(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ClockSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} MHz", self.0)
    }
}

/// Clock domain for querying specific clocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockDomain {
    /// Graphics clock
    Graphics,
    /// Streaming Multiprocessor clock
    Sm,
    /// Memory clock
    Memory,
}

/// Core and memory clock pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClockSample {
    pub core: ClockSpeed,
    pub memory: ClockSpeed,
}

impl ClockSample {
    /// Value reported when nothing could be read
    pub const UNKNOWN: Self = Self {
        core: ClockSpeed::new(0),
        memory: ClockSpeed::new(0),
    };
}

impl std::fmt::Display for ClockSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "core {}, memory {}", self.core, self.memory)
    }
}
