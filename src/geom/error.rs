//! Error taxonomy shared by the B-spline kernel and the Gordon pipeline.
//!
//! Two classes are fatal and abort the operation with no partial output:
//! [`ValidationError`] for malformed input records and arguments, and
//! [`ConstructionError`] for inputs that are individually valid but cannot be
//! built into the requested result. Tolerance failures are not errors; see
//! [`KnotRemoval`](super::KnotRemoval).

use super::quantity::QuantityError;

/// Malformed counts, degrees, knot vectors or arguments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("degree must be >= 1")]
    ZeroDegree,
    #[error("{context} requires at least {required} control points, got {provided}")]
    TooFewControlPoints {
        context: &'static str,
        required: usize,
        provided: usize,
    },
    #[error("knot vector length must be {expected}, got {provided}")]
    KnotLengthMismatch { expected: usize, provided: usize },
    #[error("knot vector must be non-decreasing")]
    KnotsNotMonotone,
    #[error("knot vector must contain at least one non-empty span")]
    EmptyDomain,
    #[error("control net is {provided} points, expected {u_count}x{v_count}")]
    GridSizeMismatch {
        u_count: usize,
        v_count: usize,
        provided: usize,
    },
    #[error("weights length must match control point count ({expected}), got {provided}")]
    WeightCountMismatch { expected: usize, provided: usize },
    #[error("weights must be finite and > 0")]
    InvalidWeight,
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("parameter {value} lies outside the domain [{start}, {end}]")]
    ParameterOutOfDomain { value: f64, start: f64, end: f64 },
    #[error("knot {value} already has multiplicity {multiplicity}, the maximum for degree {degree}")]
    MultiplicityExceeded {
        value: f64,
        multiplicity: usize,
        degree: usize,
    },
    #[error("{value} is not a knot of this curve")]
    KnotNotFound { value: f64 },
    #[error("{what}: expected {expected} entries, got {provided}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        provided: usize,
    },
    #[error("{0} must be strictly increasing")]
    NotIncreasing(&'static str),
    #[error("family is empty")]
    EmptyFamily,
    #[error("curve family is not compatible: {0}")]
    IncompatibleFamily(String),
    #[error("invalid quantity: {0}")]
    Quantity(#[from] QuantityError),
}

/// Valid inputs that cannot be assembled into the requested result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructionError {
    #[error("{context} requires at least {required} curves, got {provided}")]
    TooFewCurves {
        context: &'static str,
        required: usize,
        provided: usize,
    },
    #[error("interpolation system is singular: {0}")]
    SingularSystem(String),
    #[error("knot vectors did not converge to a common vector after unification ({0})")]
    KnotVectorsDiverged(String),
    #[error("surfaces are not reducible to a common control grid: {0}")]
    IncompatibleSurfaces(String),
    #[error("interpolated weight {weight} is not positive")]
    NonPositiveWeight { weight: f64 },
    #[error("u-curve {u_curve} and v-curve {v_curve} do not intersect (gap {gap:.3e} > {tolerance:.3e})")]
    CurvesDoNotIntersect {
        u_curve: usize,
        v_curve: usize,
        gap: f64,
        tolerance: f64,
    },
    #[error("approximation did not reach tolerance {tolerance:.3e} (best deviation {deviation:.3e})")]
    ApproximationFailed { tolerance: f64, deviation: f64 },
}

/// Umbrella error for multi-stage operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeomError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("construction failed: {0}")]
    Construction(#[from] ConstructionError),
}
