//! Thermal domain types
//!
//! Provides the temperature value type and the temperature + fan sample
//! returned by every backend.

use crate::domain::FanSpeed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature, stored in millidegrees Celsius
///
/// NVML reports whole degrees while hwmon reports millidegrees, so the
/// finer unit is kept internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Temperature(i32);

impl Temperature {
    /// Create a new Temperature from whole degrees Celsius
    pub const fn from_celsius(celsius: i32) -> Self {
        Self(celsius.saturating_mul(1000))
    }

    /// Create a new Temperature from millidegrees Celsius
    pub const fn from_millicelsius(millicelsius: i32) -> Self {
        Self(millicelsius)
    }

    /// Get the temperature in Celsius
    #[inline]
    pub fn as_celsius(&self) -> f32 {
        self.0 as f32 / 1000.0
    }

    /// Get the temperature in millidegrees Celsius
    #[inline]
    pub const fn as_millicelsius(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 1000 == 0 {
            write!(f, "{}°C", self.0 / 1000)
        } else {
            write!(f, "{:.1}°C", self.as_celsius())
        }
    }
}

impl From<u32> for Temperature {
    fn from(celsius: u32) -> Self {
        Self::from_celsius(i32::try_from(celsius).unwrap_or(i32::MAX))
    }
}

/// Temperature and fan reading for one device
///
/// Each field is independent: a known temperature with an unknown fan
/// is a normal result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThermalSample {
    pub temperature: Option<Temperature>,
    pub fan: Option<FanSpeed>,
}

impl ThermalSample {
    /// Value reported when nothing could be read
    pub const UNKNOWN: Self = Self {
        temperature: None,
        fan: None,
    };

    /// Temperature in degrees, or `-1.0` when unavailable
    pub fn temperature_or_sentinel(&self) -> f32 {
        self.temperature.map_or(-1.0, |t| t.as_celsius())
    }

    /// Fan speed in percent, or `-1` when unavailable
    pub fn fan_or_sentinel(&self) -> i32 {
        self.fan.map_or(-1, |f| i32::from(f.as_percentage()))
    }
}

impl fmt::Display for ThermalSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.temperature {
            Some(t) => write!(f, "{t}")?,
            None => write!(f, "unknown")?,
        }
        match self.fan {
            Some(fan) => write!(f, ", fan {fan}"),
            None => write!(f, ", fan unknown"),
        }
    }
}
