//! Dimension-checked scalar quantities.
//!
//! Caller-facing lengths and tolerances travel as [`Quantity`] values that carry
//! their physical dimension. Arithmetic between quantities checks dimensions
//! instead of silently stripping units, and conversion to a raw model-space
//! value only succeeds for the expected dimension.

use std::fmt;
use std::ops::{Div, Mul};

use serde::{Deserialize, Serialize};

/// Exponent of length in a derived dimension (`0` = dimensionless, `1` = length,
/// `2` = area, `-1` = inverse length, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub length: i8,
}

impl Dimension {
    pub const NONE: Self = Self { length: 0 };
    pub const LENGTH: Self = Self { length: 1 };
    pub const AREA: Self = Self { length: 2 };
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            0 => write!(f, "dimensionless"),
            1 => write!(f, "length"),
            n => write!(f, "length^{n}"),
        }
    }
}

/// Length units accepted at the API boundary. Model space is in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Meter,
    Millimeter,
    Centimeter,
    Inch,
}

impl LengthUnit {
    #[must_use]
    pub const fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meter => 1.0,
            Self::Millimeter => 1e-3,
            Self::Centimeter => 1e-2,
            Self::Inch => 0.0254,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuantityError {
    #[error("dimension mismatch in {operation}: {left} vs {right}")]
    DimensionMismatch {
        operation: &'static str,
        left: Dimension,
        right: Dimension,
    },
    #[error("quantity value must be finite")]
    NonFinite,
}

/// A scalar value tagged with its dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub dimension: Dimension,
}

impl Quantity {
    #[must_use]
    pub const fn new(value: f64, dimension: Dimension) -> Self {
        Self { value, dimension }
    }

    /// A dimensionless value.
    #[must_use]
    pub const fn scalar(value: f64) -> Self {
        Self::new(value, Dimension::NONE)
    }

    /// A length in model units (meters).
    #[must_use]
    pub const fn length(value: f64) -> Self {
        Self::new(value, Dimension::LENGTH)
    }

    /// A length expressed in `unit`, converted to model units.
    #[must_use]
    pub fn length_in(value: f64, unit: LengthUnit) -> Self {
        Self::length(value * unit.meters_per_unit())
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, QuantityError> {
        self.require_same(rhs, "addition")?;
        Ok(Self::new(self.value + rhs.value, self.dimension))
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, QuantityError> {
        self.require_same(rhs, "subtraction")?;
        Ok(Self::new(self.value - rhs.value, self.dimension))
    }

    pub fn checked_max(self, rhs: Self) -> Result<Self, QuantityError> {
        self.require_same(rhs, "max")?;
        Ok(if rhs.value > self.value { rhs } else { self })
    }

    /// Raw model-space value, provided the dimension is `expected`.
    pub fn value_as(self, expected: Dimension) -> Result<f64, QuantityError> {
        if self.dimension != expected {
            return Err(QuantityError::DimensionMismatch {
                operation: "conversion",
                left: self.dimension,
                right: expected,
            });
        }
        if !self.value.is_finite() {
            return Err(QuantityError::NonFinite);
        }
        Ok(self.value)
    }

    /// Raw length value in model units.
    pub fn as_length(self) -> Result<f64, QuantityError> {
        self.value_as(Dimension::LENGTH)
    }

    fn require_same(self, rhs: Self, operation: &'static str) -> Result<(), QuantityError> {
        if self.dimension == rhs.dimension {
            Ok(())
        } else {
            Err(QuantityError::DimensionMismatch {
                operation,
                left: self.dimension,
                right: rhs.dimension,
            })
        }
    }
}

impl Mul for Quantity {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Self::new(
            self.value * rhs.value,
            Dimension {
                length: self.dimension.length + rhs.dimension.length,
            },
        )
    }
}

impl Mul<f64> for Quantity {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.value * rhs, self.dimension)
    }
}

impl Div for Quantity {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        Self::new(
            self.value / rhs.value,
            Dimension {
                length: self.dimension.length - rhs.dimension.length,
            },
        )
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.dimension)
    }
}
