mod compat;
mod core;
mod curve;
mod elevation;
mod error;
mod evaluator;
mod knot_ops;
mod knots;
mod metrics;
mod quantity;
mod surface;

pub use compat::{unify_curves, unify_surfaces};
pub use core::{BBox, HPoint4, Point3, Tolerance, Vec3};
pub use curve::NurbsCurve3;
pub use elevation::{binomial, elevate_degree, elevate_surface_degree};
pub use error::{ConstructionError, GeomError, ValidationError};
pub use evaluator::{
    DeBoorEvaluator, GeometryEvaluator, basis_function_derivatives, basis_functions,
};
pub use knot_ops::{
    KnotRemoval, clamp_curve, clamp_surface, decompose_to_bezier, insert_knot,
    insert_surface_knot, refine_knot_vector, refine_surface_knots, remove_knot,
};
pub use knots::{
    KnotTable, approximation_knot_vector, averaging_knot_vector, find_span, is_clamped,
    is_non_decreasing, multiplicities, remap_knots, sanitize_insertions,
};
pub use metrics::{GordonMetrics, GordonTimingReport, TimingBucket};
pub use quantity::{Dimension, LengthUnit, Quantity, QuantityError};
pub use surface::{NurbsSurface, UvDirection};

#[cfg(test)]
mod tests;
