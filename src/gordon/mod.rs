//! Gordon surface construction from a network of crossing curves.
//!
//! The pipeline is a single forward pass:
//!
//! 1. normalize every input curve (clamp, map onto `[0, 1]`, orient),
//! 2. unify each family to a common degree and knot vector,
//! 3. intersect the network and derive the placements of both families,
//! 4. skin each family (`Su` through the u-curves, `Sv` through the v-curves,
//!    transposed) and interpolate the crossing grid (`T`),
//! 5. unify the three surfaces and combine them as `Su + Sv - T`.
//!
//! Any validation or construction failure aborts the whole pass.
//!
//! ```ignore
//! use gordon_engine::gordon::{build_gordon_surface, GordonOptions};
//!
//! let result = build_gordon_surface(&u_curves, &v_curves, &GordonOptions::default())?;
//! println!("{}", result.diagnostics.summary());
//! ```

mod assemble;
mod diagnostics;
mod intersect;
mod placement;
mod skinning;
mod tensor;

#[cfg(test)]
mod tests;

pub use assemble::{assemble_gordon, assemble_unified};
pub use diagnostics::GordonDiagnostics;
pub use intersect::{Crossing, IntersectionOptions, NetworkIntersection, closest_approach, intersect_network};
pub use placement::{
    PlacementOptions, SanitizedPlacements, canonicalize_orientation, order_by_placement, permute,
    sanitize_placements,
};
pub use skinning::skin_curves;
pub use tensor::tensor_product_surface;

use crate::geom::{
    ConstructionError, DeBoorEvaluator, GeomError, GeometryEvaluator, GordonMetrics, NurbsCurve3, NurbsSurface,
    Quantity, TimingBucket, Tolerance, ValidationError, clamp_curve, unify_curves, unify_surfaces,
};

/// Options for [`build_gordon_surface`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GordonOptions {
    /// Requested u degree of the skin through the v-curves and of `T`.
    pub degree_u: usize,
    /// Requested v degree of the skin through the u-curves and of `T`.
    pub degree_v: usize,
    /// Knot values closer than this are merged during unification.
    pub knot_tolerance: Tolerance,
    /// Largest allowed distance between two curves at a crossing.
    pub intersection_tolerance: Quantity,
    pub intersection: IntersectionOptions,
    pub placement: PlacementOptions,
}

impl Default for GordonOptions {
    fn default() -> Self {
        Self {
            degree_u: 3,
            degree_v: 3,
            knot_tolerance: Tolerance::KNOT,
            intersection_tolerance: Quantity::length(1e-4),
            intersection: IntersectionOptions::default(),
            placement: PlacementOptions::default(),
        }
    }
}

impl GordonOptions {
    #[must_use]
    pub fn with_degrees(mut self, degree_u: usize, degree_v: usize) -> Self {
        self.degree_u = degree_u;
        self.degree_v = degree_v;
        self
    }

    #[must_use]
    pub fn with_knot_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.knot_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_intersection_tolerance(mut self, tolerance: Quantity) -> Self {
        self.intersection_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_intersection(mut self, intersection: IntersectionOptions) -> Self {
        self.intersection = intersection;
        self
    }

    #[must_use]
    pub fn with_placement(mut self, placement: PlacementOptions) -> Self {
        self.placement = placement;
        self
    }

    fn validated_gap_tolerance(&self) -> Result<f64, ValidationError> {
        if self.degree_u == 0 || self.degree_v == 0 {
            return Err(ValidationError::ZeroDegree);
        }
        let gap = self.intersection_tolerance.as_length()?;
        if gap <= 0.0 {
            return Err(ValidationError::NonPositive("intersection tolerance"));
        }
        Ok(gap)
    }
}

/// A finished Gordon surface plus what the pipeline did to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct GordonSurface {
    pub surface: NurbsSurface,
    /// The u-curves as used: normalized, oriented, unified and sorted so that
    /// u-curve `i` is the iso-curve at `diagnostics.v_placements[i]`.
    pub u_curves: Vec<NurbsCurve3>,
    /// The v-curves as used, matching `diagnostics.u_placements`.
    pub v_curves: Vec<NurbsCurve3>,
    pub diagnostics: GordonDiagnostics,
}

fn require_family(curves: &[NurbsCurve3], context: &'static str) -> Result<(), ConstructionError> {
    if curves.len() < 2 {
        return Err(ConstructionError::TooFewCurves {
            context,
            required: 2,
            provided: curves.len(),
        });
    }
    Ok(())
}

/// Clamp, map onto `[0, 1]` and orient one family.
fn normalize_family<E: GeometryEvaluator + ?Sized>(
    curves: &[NurbsCurve3],
    evaluator: &E,
) -> Result<(Vec<NurbsCurve3>, usize), GeomError> {
    let mapped = curves
        .iter()
        .map(|curve| clamp_curve(curve)?.reparameterized(0.0, 1.0))
        .collect::<Result<Vec<_>, _>>()?;
    canonicalize_orientation(&mapped, evaluator)
}

fn displaced(order: &[usize]) -> usize {
    order.iter().enumerate().filter(|(k, idx)| k != *idx).count()
}

/// Build a Gordon surface with the bundled [`DeBoorEvaluator`].
pub fn build_gordon_surface(
    u_curves: &[NurbsCurve3],
    v_curves: &[NurbsCurve3],
    options: &GordonOptions,
) -> Result<GordonSurface, GeomError> {
    build_gordon_surface_with(&DeBoorEvaluator::default(), u_curves, v_curves, options)
}

/// Build a Gordon surface, evaluating and fitting through `evaluator`.
///
/// `u_curves` run along u and are placed across v; `v_curves` run along v
/// and are placed across u. Input order and orientation do not matter.
pub fn build_gordon_surface_with<E: GeometryEvaluator + ?Sized>(
    evaluator: &E,
    u_curves: &[NurbsCurve3],
    v_curves: &[NurbsCurve3],
    options: &GordonOptions,
) -> Result<GordonSurface, GeomError> {
    require_family(u_curves, "u-curve family")?;
    require_family(v_curves, "v-curve family")?;
    let gap_tolerance = options.validated_gap_tolerance()?;
    let tol = options.knot_tolerance;

    let mut metrics = GordonMetrics::default();
    metrics.begin();
    let mut diagnostics = GordonDiagnostics::new();

    let ((u_family, u_reversed), (v_family, v_reversed)) = metrics.time(TimingBucket::Normalize, || {
        Ok::<_, GeomError>((normalize_family(u_curves, evaluator)?, normalize_family(v_curves, evaluator)?))
    })?;
    diagnostics.u_curves_reversed = u_reversed;
    diagnostics.v_curves_reversed = v_reversed;

    let (u_family, v_family) = metrics.time(TimingBucket::CurveUnify, || {
        Ok::<_, GeomError>((unify_curves(&u_family, tol)?, unify_curves(&v_family, tol)?))
    })?;
    log::debug!(
        "families unified: {} u-curves of degree {}, {} v-curves of degree {}",
        u_family.len(),
        u_family[0].degree,
        v_family.len(),
        v_family[0].degree
    );

    let (network, u_family, v_family, u_params, v_params) = metrics.time(TimingBucket::Intersection, || {
        let network = intersect_network(
            &u_family,
            &v_family,
            evaluator,
            options.intersection,
            gap_tolerance,
        )?;

        // v placements order the u-curves, u placements the v-curves.
        let u_order = order_by_placement(&network.v_placements());
        let v_order = order_by_placement(&network.u_placements());
        diagnostics.u_curves_reordered = displaced(&u_order);
        diagnostics.v_curves_reordered = displaced(&v_order);
        let network = network.reordered(&u_order, &v_order);

        diagnostics.raw_u_placements = network.u_placements();
        diagnostics.raw_v_placements = network.v_placements();
        let u_params = sanitize_placements(&diagnostics.raw_u_placements, options.placement)?;
        let v_params = sanitize_placements(&diagnostics.raw_v_placements, options.placement)?;
        for (family, params) in [("v-curve", &u_params), ("u-curve", &v_params)] {
            if params.uniform_fallback {
                diagnostics.add_warning(format!("{family} placements fell back to a uniform spread"));
            }
        }
        diagnostics.spacing_adjustments = u_params.adjusted + v_params.adjusted;
        diagnostics.max_intersection_gap = network.max_gap;

        Ok::<_, GeomError>((
            network,
            permute(&u_family, &u_order),
            permute(&v_family, &v_order),
            u_params.values,
            v_params.values,
        ))
    })?;

    let (su, sv) = metrics.time(TimingBucket::Skinning, || {
        let su = skin_curves(&u_family, &v_params, options.degree_v, evaluator, tol)?;
        let sv = skin_curves(&v_family, &u_params, options.degree_u, evaluator, tol)?.transposed();
        Ok::<_, GeomError>((su, sv))
    })?;

    let t = metrics.time(TimingBucket::TensorProduct, || {
        tensor_product_surface(
            &network.points(),
            &u_params,
            &v_params,
            options.degree_u,
            options.degree_v,
            evaluator,
            tol,
        )
    })?;

    let unified = metrics.time(TimingBucket::SurfaceUnify, || unify_surfaces(&[su, sv, t], tol))?;
    let surface = metrics.time(TimingBucket::Assembly, || {
        assemble_gordon(&unified[0], &unified[1], &unified[2], tol)
    })?;

    diagnostics.u_placements = u_params;
    diagnostics.v_placements = v_params;
    diagnostics.timing = metrics.end();
    log::debug!(
        "gordon surface: degrees ({}, {}), grid {}x{}; {}",
        surface.degree_u,
        surface.degree_v,
        surface.u_count,
        surface.v_count,
        diagnostics.summary()
    );

    Ok(GordonSurface {
        surface,
        u_curves: u_family,
        v_curves: v_family,
        diagnostics,
    })
}
