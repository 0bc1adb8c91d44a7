//! Distances in this testbed have been logged as raw ticks, centimeters and
//! meters, sometimes scaled by ad-hoc factors. [`Length`] carries its unit
//! with it so every conversion is spelled out at the call site.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Propagation speed used by the firmware, in meters per second.
pub const SPEED_OF_LIGHT_M_PER_S: f64 = 299_702_547.236;

/// Duration of one DW1000 device time unit, in femtoseconds.
pub const TICK_FEMTOSECONDS: f64 = 15_650.0;

/// Distance light travels during one device time unit (about 4.69 mm).
pub const METERS_PER_TICK: f64 = SPEED_OF_LIGHT_M_PER_S * 1.0e-15 * TICK_FEMTOSECONDS;

/// The unit a [`Length`] or a measurement set is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Unit {
    /// Raw radio time units, one-way time of flight.
    #[default]
    Ticks,
    /// Centimeters
    Centimeters,
    /// Meters
    Meters,
}

impl Unit {
    /// How many meters one of this unit is.
    fn meters_per_unit(self) -> f64 {
        match self {
            Unit::Ticks => METERS_PER_TICK,
            Unit::Centimeters => 0.01,
            Unit::Meters => 1.0,
        }
    }

    /// Short suffix used in reports.
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Ticks => "tu",
            Unit::Centimeters => "cm",
            Unit::Meters => "m",
        }
    }

    /// Multiplicative factor that converts a value in `self` into `target`.
    pub fn factor_to(self, target: Unit) -> f64 {
        if self == target {
            1.0
        } else {
            self.meters_per_unit() / target.meters_per_unit()
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tu" | "tick" | "ticks" => Ok(Unit::Ticks),
            "cm" | "centimeter" | "centimeters" => Ok(Unit::Centimeters),
            "m" | "meter" | "meters" => Ok(Unit::Meters),
            other => Err(format!("unknown length unit '{other}'")),
        }
    }
}

/// A signed length tagged with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Length {
    /// Magnitude, in `unit`s.
    pub value: f64,
    /// The unit `value` is expressed in.
    pub unit: Unit,
}

impl Length {
    /// A length of `value` radio ticks of one-way flight time.
    pub fn ticks(value: f64) -> Self {
        Length {
            value,
            unit: Unit::Ticks,
        }
    }

    /// A length in centimeters.
    pub fn centimeters(value: f64) -> Self {
        Length {
            value,
            unit: Unit::Centimeters,
        }
    }

    /// A length in meters.
    pub fn meters(value: f64) -> Self {
        Length {
            value,
            unit: Unit::Meters,
        }
    }

    /// Converts to `target`, returning a new tagged length.
    pub fn to(self, target: Unit) -> Self {
        Length {
            value: self.value * self.unit.factor_to(target),
            unit: target,
        }
    }

    /// The magnitude after converting to `target`.
    pub fn value_in(self, target: Unit) -> f64 {
        self.to(target).value
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} {}", self.value, self.unit)
    }
}
