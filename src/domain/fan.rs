//! Fan-related domain types
//!
//! Provides the validated fan speed percentage and the PWM rescaling used
//! by the hwmon backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fan speed percentage (0-100)
///
/// Validated on construction to ensure the value is within valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FanSpeed(u8);

impl FanSpeed {
    /// Maximum valid fan speed
    pub const MAX: u8 = 100;
    /// Full-scale raw PWM duty value
    pub const PWM_MAX: u32 = 255;

    /// Create a new FanSpeed, returning `None` if value > 100
    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    /// Create a FanSpeed from a percentage reported by the driver
    ///
    /// NVML may report slightly above 100 on some boards; the value is
    /// clamped.
    pub fn from_percent_clamped(value: u32) -> Self {
        Self(value.min(u32::from(Self::MAX)) as u8)
    }

    /// Rescale a raw 0-255 PWM duty value to a rounded percentage
    ///
    /// Values above 255 are clamped to full scale.
    pub fn from_pwm(raw: u32) -> Self {
        let raw = raw.min(Self::PWM_MAX);
        let percent = (raw as f32 * 100.0 / Self::PWM_MAX as f32).round();
        Self(percent as u8)
    }

    /// Get the speed as a percentage value (0-100)
    #[inline]
    pub const fn as_percentage(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for FanSpeed {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("invalid fan speed: {value}% (must be 0-100)"))
    }
}

impl From<FanSpeed> for u8 {
    fn from(speed: FanSpeed) -> Self {
        speed.0
    }
}
