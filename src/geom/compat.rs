//! Compatibility unification: bring a family of curves (or surfaces) to one
//! shared degree and knot vector so their control points can be combined
//! index by index.

use super::core::Tolerance;
use super::curve::NurbsCurve3;
use super::elevation::{elevate_degree, elevate_surface_degree};
use super::error::{ConstructionError, GeomError, ValidationError};
use super::knot_ops::{clamp_curve, clamp_surface, refine_knot_vector, refine_surface_knots};
use super::knots::{KnotTable, remap_knots};
use super::surface::{NurbsSurface, UvDirection};

/// Merged interior-knot target: per tolerance bucket, the maximum
/// multiplicity seen in any of the knot vectors.
fn merged_interior<'a, I>(knot_vectors: I, tol: Tolerance) -> KnotTable
where
    I: IntoIterator<Item = (&'a [f64], usize)>,
{
    let mut merged = KnotTable::new(tol);
    for (knots, degree) in knot_vectors {
        merged.merge_max(&KnotTable::interior(knots, degree, tol));
    }
    merged
}

/// Snap every knot vector onto the first one, or report the first outlier.
fn snap_to_canonical(vectors: &mut [&mut Vec<f64>], tol: Tolerance) -> Result<(), String> {
    let Some(canonical) = vectors.first().map(|v| v.to_vec()) else {
        return Ok(());
    };
    // Refinement snaps each curve to its own bucket representative, so two
    // vectors may differ by up to twice the bucket width.
    let slack = tol.scaled(2.0 + 1e-6);
    for (idx, knots) in vectors.iter_mut().enumerate().skip(1) {
        if !slack.approx_eq_slice(knots.as_slice(), &canonical) {
            return Err(format!(
                "entry {idx} has {} knots, expected {}",
                knots.len(),
                canonical.len()
            ));
        }
        **knots = canonical.clone();
    }
    Ok(())
}

/// Make `curves` compatible: same degree, same clamped knot vector, same
/// control-point count.
///
/// Curves are clamped, reparameterized onto the first curve's domain,
/// elevated to the highest degree in the set and refined with the merged
/// interior knots (maximum multiplicity per value). Shapes are unchanged.
pub fn unify_curves(curves: &[NurbsCurve3], tol: Tolerance) -> Result<Vec<NurbsCurve3>, GeomError> {
    let first = curves.first().ok_or(ValidationError::EmptyFamily)?;
    let (start, end) = first.domain();

    let mut work = Vec::with_capacity(curves.len());
    for curve in curves {
        let mut clamped = clamp_curve(curve)?;
        let (a, b) = clamped.domain();
        if !tol.approx_eq_f64(a, start) || !tol.approx_eq_f64(b, end) {
            clamped = clamped.reparameterized(start, end)?;
        }
        work.push(clamped);
    }

    let degree = work.iter().map(|c| c.degree).max().unwrap_or(first.degree);
    for curve in &mut work {
        if curve.degree < degree {
            *curve = elevate_degree(curve, degree - curve.degree)?;
        }
    }

    let merged = merged_interior(work.iter().map(|c| (c.knots.as_slice(), c.degree)), tol);
    for curve in &mut work {
        let missing = merged.deficit_against(&curve.knots);
        if !missing.is_empty() {
            *curve = refine_knot_vector(curve, &missing)?;
        }
    }

    let mut knot_refs: Vec<&mut Vec<f64>> = work.iter_mut().map(|c| &mut c.knots).collect();
    snap_to_canonical(&mut knot_refs, tol).map_err(ConstructionError::KnotVectorsDiverged)?;

    log::debug!(
        "unified {} curves: degree {degree}, {} knots, {} control points",
        work.len(),
        work[0].knots.len(),
        work[0].control_point_count()
    );
    Ok(work)
}

fn remap_surface(surface: &NurbsSurface, u: (f64, f64), v: (f64, f64)) -> Result<NurbsSurface, ValidationError> {
    NurbsSurface::new(
        surface.degree_u,
        surface.degree_v,
        surface.u_count,
        surface.v_count,
        surface.control_points.clone(),
        remap_knots(&surface.knots_u, u.0, u.1),
        remap_knots(&surface.knots_v, v.0, v.1),
        surface.weights.clone(),
    )
}

/// Make `surfaces` compatible in both directions independently.
pub fn unify_surfaces(surfaces: &[NurbsSurface], tol: Tolerance) -> Result<Vec<NurbsSurface>, GeomError> {
    let first = surfaces.first().ok_or(ValidationError::EmptyFamily)?;
    let (u_domain, v_domain) = (first.domain_u(), first.domain_v());

    let mut work = Vec::with_capacity(surfaces.len());
    for surface in surfaces {
        let mut clamped = clamp_surface(surface)?;
        let (du, dv) = (clamped.domain_u(), clamped.domain_v());
        let same = tol.approx_eq_f64(du.0, u_domain.0)
            && tol.approx_eq_f64(du.1, u_domain.1)
            && tol.approx_eq_f64(dv.0, v_domain.0)
            && tol.approx_eq_f64(dv.1, v_domain.1);
        if !same {
            clamped = remap_surface(&clamped, u_domain, v_domain)?;
        }
        work.push(clamped);
    }

    for direction in [UvDirection::U, UvDirection::V] {
        let degree = work.iter().map(|s| s.degree(direction)).max().unwrap_or(1);
        for surface in &mut work {
            let current = surface.degree(direction);
            if current < degree {
                *surface = elevate_surface_degree(surface, direction, degree - current)?;
            }
        }

        let merged = merged_interior(
            work.iter().map(|s| (s.knots(direction), s.degree(direction))),
            tol,
        );
        for surface in &mut work {
            let missing = merged.deficit_against(surface.knots(direction));
            if !missing.is_empty() {
                *surface = refine_surface_knots(surface, direction, &missing)?;
            }
        }
    }

    let shape = (work[0].u_count, work[0].v_count);
    if let Some(idx) = work.iter().position(|s| (s.u_count, s.v_count) != shape) {
        return Err(ConstructionError::IncompatibleSurfaces(format!(
            "surface {idx} has a {}x{} grid, expected {}x{}",
            work[idx].u_count, work[idx].v_count, shape.0, shape.1
        ))
        .into());
    }

    let mut u_refs: Vec<&mut Vec<f64>> = work.iter_mut().map(|s| &mut s.knots_u).collect();
    snap_to_canonical(&mut u_refs, tol)
        .map_err(|e| ConstructionError::IncompatibleSurfaces(format!("u knots: {e}")))?;
    let mut v_refs: Vec<&mut Vec<f64>> = work.iter_mut().map(|s| &mut s.knots_v).collect();
    snap_to_canonical(&mut v_refs, tol)
        .map_err(|e| ConstructionError::IncompatibleSurfaces(format!("v knots: {e}")))?;

    log::debug!(
        "unified {} surfaces: degrees ({}, {}), grid {}x{}",
        work.len(),
        work[0].degree_u,
        work[0].degree_v,
        shape.0,
        shape.1
    );
    Ok(work)
}
