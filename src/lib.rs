#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! NURBS curve and surface algebra with a Gordon surface builder.
//!
//! [`geom`] holds the value types and the shape-preserving B-spline
//! operations (knot insertion, refinement and removal, degree elevation,
//! compatibility unification). [`gordon`] assembles a surface through a
//! network of crossing curves on top of them.
//!
//! The crate logs through the [`log`] facade and never installs a logger;
//! hosts that want pipeline tracing register their own.

pub mod geom;
pub mod gordon;

pub use geom::{
    ConstructionError, DeBoorEvaluator, GeomError, GeometryEvaluator, NurbsCurve3, NurbsSurface, Point3,
    Quantity, Tolerance, UvDirection, ValidationError,
};
pub use gordon::{GordonDiagnostics, GordonOptions, GordonSurface, build_gordon_surface, build_gordon_surface_with};
