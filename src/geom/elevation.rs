//! Degree elevation by Bezier decomposition.
//!
//! Each step raises the degree by one: the curve is split into Bezier
//! segments, every segment is elevated with the binomial blend, the segments
//! are stitched back together and the interior multiplicity introduced by the
//! split is removed again with knot removal.

use super::core::{BBox, HPoint4, Tolerance};
use super::curve::NurbsCurve3;
use super::error::ValidationError;
use super::knot_ops::{clamp_curve, decompose_to_bezier, remove_knot};
use super::knots::KnotTable;
use super::surface::{NurbsSurface, UvDirection};

/// Binomial coefficient `C(n, k)` as a float.
#[must_use]
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Elevate the control polygon of one Bezier segment from degree `p` to
/// degree `p + t`.
fn elevate_bezier(points: &[HPoint4], t: usize) -> Vec<HPoint4> {
    let p = points.len() - 1;
    (0..=p + t)
        .map(|i| {
            let lo = i.saturating_sub(t);
            let hi = p.min(i);
            let denom = binomial(p + t, i);
            (lo..=hi).fold(HPoint4::new(0.0, 0.0, 0.0, 0.0), |acc, j| {
                acc + points[j] * (binomial(p, j) * binomial(t, i - j) / denom)
            })
        })
        .collect()
}

fn removal_tolerance(curve: &NurbsCurve3) -> f64 {
    let scale = BBox::from_points(&curve.control_points).map_or(0.0, BBox::max_abs_coordinate);
    1e-7 * (1.0 + scale)
}

fn elevate_by_one(curve: &NurbsCurve3, remove_redundant: bool) -> Result<NurbsCurve3, ValidationError> {
    let p = curve.degree;
    let original = KnotTable::interior(&curve.knots, p, Tolerance::KNOT);
    let segments = decompose_to_bezier(curve)?;

    let mut points: Vec<HPoint4> = Vec::with_capacity(segments.len() * (p + 1) + 1);
    let mut knots = Vec::with_capacity(segments.len() * (p + 1) + p + 3);
    for (idx, segment) in segments.iter().enumerate() {
        let elevated = elevate_bezier(&segment.homogeneous_points(), 1);
        let (start, end) = segment.domain();
        if idx == 0 {
            points.extend_from_slice(&elevated);
            knots.extend(std::iter::repeat_n(start, p + 2));
        } else {
            // Shared boundary point between consecutive segments.
            points.extend_from_slice(&elevated[1..]);
        }
        let count = if idx + 1 == segments.len() { p + 2 } else { p + 1 };
        knots.extend(std::iter::repeat_n(end, count));
    }

    let mut elevated =
        NurbsCurve3::from_homogeneous(p + 1, &points, knots, curve.weights.is_some())?;
    if !remove_redundant {
        return Ok(elevated);
    }

    let tolerance = removal_tolerance(curve);
    for &(value, multiplicity) in original.entries() {
        let excess = p.saturating_sub(multiplicity);
        if excess == 0 {
            continue;
        }
        let removal = remove_knot(&elevated, value, excess, tolerance)?;
        if !removal.success {
            log::warn!(
                "degree elevation kept knot {value} at multiplicity {} (removed {} of {excess})",
                p + 1 - removal.removed_count,
                removal.removed_count
            );
        }
        elevated = removal.curve;
    }
    Ok(elevated)
}

fn elevate_with(curve: &NurbsCurve3, t: usize, remove_redundant: bool) -> Result<NurbsCurve3, ValidationError> {
    let mut current = clamp_curve(curve)?;
    for _ in 0..t {
        current = elevate_by_one(&current, remove_redundant)?;
    }
    Ok(current)
}

/// Raise the degree of a curve by `t` without changing its shape.
///
/// Each unique interior knot ends with its original multiplicity plus `t`.
/// The input is clamped first if needed.
pub fn elevate_degree(curve: &NurbsCurve3, t: usize) -> Result<NurbsCurve3, ValidationError> {
    if t == 0 {
        return Ok(curve.clone());
    }
    let elevated = elevate_with(curve, t, true)?;
    log::debug!(
        "elevated curve degree {} -> {}, {} -> {} control points",
        curve.degree,
        elevated.degree,
        curve.control_point_count(),
        elevated.control_point_count()
    );
    Ok(elevated)
}

/// Raise the degree of a surface in one direction by `t`.
///
/// The rows (or columns) are elevated as curves. If knot removal leaves them
/// with different knot vectors, all of them are elevated again without the
/// removal step so the grid stays rectangular.
pub fn elevate_surface_degree(
    surface: &NurbsSurface,
    direction: UvDirection,
    t: usize,
) -> Result<NurbsSurface, ValidationError> {
    if t == 0 {
        return Ok(surface.clone());
    }
    let curves = surface.direction_curves(direction)?;
    let mut elevated = curves
        .iter()
        .map(|curve| elevate_with(curve, t, true))
        .collect::<Result<Vec<_>, _>>()?;

    let consistent = elevated.windows(2).all(|pair| {
        Tolerance::KNOT.approx_eq_slice(&pair[0].knots, &pair[1].knots)
    });
    if !consistent {
        log::debug!("surface elevation: per-curve knot removal diverged, keeping full multiplicity");
        elevated = curves
            .iter()
            .map(|curve| elevate_with(curve, t, false))
            .collect::<Result<Vec<_>, _>>()?;
    }

    let other = direction.other();
    let mut out = NurbsSurface::from_direction_curves(
        direction,
        &elevated,
        surface.degree(other),
        surface.knots(other).to_vec(),
    )?;
    match direction {
        UvDirection::U => out.periodic_v = surface.periodic_v,
        UvDirection::V => out.periodic_u = surface.periodic_u,
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binomial_matches_pascal() {
        assert_eq!(binomial(5, 0), 1.0);
        assert_eq!(binomial(5, 2), 10.0);
        assert_eq!(binomial(6, 3), 20.0);
        assert_eq!(binomial(3, 4), 0.0);
    }

    #[test]
    fn bezier_elevation_keeps_end_points() {
        let pts = [
            HPoint4::new(0.0, 0.0, 0.0, 1.0),
            HPoint4::new(1.0, 2.0, 0.0, 1.0),
            HPoint4::new(2.0, 0.0, 0.0, 1.0),
        ];
        let up = elevate_bezier(&pts, 1);
        assert_eq!(up.len(), 4);
        assert_eq!(up[0], pts[0]);
        assert_eq!(up[3], pts[2]);
        // Q1 = 1/3 P0 + 2/3 P1
        assert!((up[1].y - 4.0 / 3.0).abs() < 1e-15);
    }
}
