//! Shape-preserving knot manipulation: insertion, refinement, Bezier
//! decomposition, clamping and removal.
//!
//! All routines work on homogeneous control points so rational and
//! polynomial curves share one code path, and all return new records.

use super::core::{HPoint4, Tolerance};
use super::curve::NurbsCurve3;
use super::error::ValidationError;
use super::knots::{KnotTable, find_span, sanitize_insertions};
use super::surface::{NurbsSurface, UvDirection};

/// Outcome of [`remove_knot`]. A removal that would exceed the deviation
/// tolerance is an ordinary result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotRemoval {
    /// `true` when all requested removals succeeded.
    pub success: bool,
    pub removed_count: usize,
    /// The curve after `removed_count` removals (the input when zero).
    pub curve: NurbsCurve3,
}

fn check_in_domain(curve: &NurbsCurve3, value: f64) -> Result<(), ValidationError> {
    let (start, end) = curve.domain();
    if !value.is_finite() {
        return Err(ValidationError::NonFinite("knot value"));
    }
    if value < start - Tolerance::KNOT.eps || value > end + Tolerance::KNOT.eps {
        return Err(ValidationError::ParameterOutOfDomain { value, start, end });
    }
    Ok(())
}

fn rebuild(curve: &NurbsCurve3, points: &[HPoint4], knots: Vec<f64>) -> Result<NurbsCurve3, ValidationError> {
    Ok(
        NurbsCurve3::from_homogeneous(curve.degree, points, knots, curve.weights.is_some())?
            .with_periodic(curve.periodic),
    )
}

/// Insert `value` once (Boehm). The result has one more control point and
/// one more knot and traces the same point set.
pub fn insert_knot(curve: &NurbsCurve3, value: f64) -> Result<NurbsCurve3, ValidationError> {
    check_in_domain(curve, value)?;
    let p = curve.degree;
    let n = curve.control_point_count() - 1;

    let table = KnotTable::from_knots(&curve.knots, Tolerance::KNOT);
    let multiplicity = table.count(value);
    if multiplicity >= p {
        return Err(ValidationError::MultiplicityExceeded {
            value,
            multiplicity,
            degree: p,
        });
    }
    let (start, end) = curve.domain();
    let ubar = table.representative(value).unwrap_or(value).clamp(start, end);

    let k = find_span(n, p, ubar, &curve.knots);
    let pw = curve.homogeneous_points();
    let u = &curve.knots;

    let mut qw = Vec::with_capacity(n + 2);
    for i in 0..=n + 1 {
        let q = if i + p <= k {
            pw[i]
        } else if i > k {
            pw[i - 1]
        } else {
            let denom = u[i + p] - u[i];
            // Coincident knots leave the blend undefined; split evenly.
            let alpha = if denom.abs() <= f64::EPSILON {
                0.5
            } else {
                (ubar - u[i]) / denom
            };
            pw[i - 1].lerp(pw[i], alpha)
        };
        qw.push(q);
    }

    let mut knots = Vec::with_capacity(u.len() + 1);
    knots.extend_from_slice(&u[..=k]);
    knots.push(ubar);
    knots.extend_from_slice(&u[k + 1..]);

    rebuild(curve, &qw, knots)
}

/// Insert several knots in one pass (P&T A5.4).
///
/// The candidates go through [`sanitize_insertions`] first, so values outside
/// the domain or beyond multiplicity `degree` are dropped. An empty list after
/// filtering returns the curve unchanged.
pub fn refine_knot_vector(curve: &NurbsCurve3, values: &[f64]) -> Result<NurbsCurve3, ValidationError> {
    let p = curve.degree;
    let x = sanitize_insertions(&curve.knots, p, values, Tolerance::KNOT);
    if x.is_empty() {
        return Ok(curve.clone());
    }

    let n = curve.control_point_count() - 1;
    let m = n + p + 1;
    let r = x.len() - 1;
    let u = &curve.knots;
    let pw = curve.homogeneous_points();

    let a = find_span(n, p, x[0], u);
    let b = find_span(n, p, x[r], u) + 1;

    let mut qw = vec![HPoint4::new(0.0, 0.0, 0.0, 0.0); n + r + 2];
    let mut ubar = vec![0.0; m + r + 2];

    qw[..=a - p].copy_from_slice(&pw[..=a - p]);
    for j in b - 1..=n {
        qw[j + r + 1] = pw[j];
    }
    ubar[..=a].copy_from_slice(&u[..=a]);
    for j in b + p..=m {
        ubar[j + r + 1] = u[j];
    }

    let mut i = b + p - 1;
    let mut k = b + p + r;
    for j in (0..=r).rev() {
        while i > a && x[j] <= u[i] {
            qw[k - p - 1] = pw[i - p - 1];
            ubar[k] = u[i];
            k -= 1;
            i -= 1;
        }
        qw[k - p - 1] = qw[k - p];
        for l in 1..=p {
            let ind = k - p + l;
            let numer = ubar[k + l] - x[j];
            if numer.abs() == 0.0 {
                qw[ind - 1] = qw[ind];
            } else {
                let denom = ubar[k + l] - u[i + l - p];
                let alpha = if denom.abs() <= f64::EPSILON {
                    0.5
                } else {
                    numer / denom
                };
                qw[ind - 1] = qw[ind].lerp(qw[ind - 1], alpha);
            }
        }
        ubar[k] = x[j];
        k -= 1;
    }

    log::trace!("refined degree-{p} curve with {} knots", x.len());
    rebuild(curve, &qw, ubar)
}

/// Clamp the curve to its domain `[knots[p], knots[n + 1]]`.
///
/// Each domain end is inserted up to multiplicity `degree`, then the control
/// points and knots outside the domain are dropped. The result is clamped,
/// non-periodic and traces the same point set over the domain.
pub fn clamp_curve(curve: &NurbsCurve3) -> Result<NurbsCurve3, ValidationError> {
    if curve.is_clamped(Tolerance::KNOT) {
        return Ok(curve.clone().with_periodic(false));
    }

    let p = curve.degree;
    let (start, end) = curve.domain();
    let table = KnotTable::from_knots(&curve.knots, Tolerance::KNOT);
    let mut inserts = Vec::new();
    inserts.extend(std::iter::repeat_n(start, p.saturating_sub(table.count(start))));
    inserts.extend(std::iter::repeat_n(end, p.saturating_sub(table.count(end))));
    let refined = refine_knot_vector(curve, &inserts)?;

    let tol = Tolerance::KNOT;
    let knots = &refined.knots;
    let last_start = knots
        .iter()
        .rposition(|k| tol.approx_eq_f64(*k, start))
        .ok_or(ValidationError::EmptyDomain)?;
    let first_end = knots
        .iter()
        .position(|k| tol.approx_eq_f64(*k, end))
        .ok_or(ValidationError::EmptyDomain)?;
    if last_start < p || first_end == 0 || first_end + p >= knots.len() {
        return Err(ValidationError::EmptyDomain);
    }

    let first_cp = last_start - p;
    let last_cp = first_end - 1;
    let pw = refined.homogeneous_points();
    let points = &pw[first_cp..=last_cp];

    let mut clamped_knots = Vec::with_capacity(points.len() + p + 1);
    clamped_knots.extend(std::iter::repeat_n(start, p + 1));
    clamped_knots.extend_from_slice(&knots[last_start + 1..first_end]);
    clamped_knots.extend(std::iter::repeat_n(end, p + 1));

    log::debug!(
        "clamped degree-{p} curve: {} -> {} control points",
        curve.control_point_count(),
        points.len()
    );
    NurbsCurve3::from_homogeneous(p, points, clamped_knots, curve.weights.is_some())
}

/// Split the curve into its Bezier segments.
///
/// The curve is clamped, every interior knot is raised to multiplicity
/// `degree`, and each span becomes a degree-`p` curve with `p + 1` control
/// points over its original parameter interval.
pub fn decompose_to_bezier(curve: &NurbsCurve3) -> Result<Vec<NurbsCurve3>, ValidationError> {
    let clamped = clamp_curve(curve)?;
    let p = clamped.degree;

    let interior = KnotTable::interior(&clamped.knots, p, Tolerance::KNOT);
    let mut target = KnotTable::new(Tolerance::KNOT);
    for &(value, _) in interior.entries() {
        target.raise_to(value, p);
    }
    let missing = target.deficit_against(&clamped.knots);
    let refined = refine_knot_vector(&clamped, &missing)?;

    let pw = refined.homogeneous_points();
    let breaks: Vec<f64> = refined
        .knot_multiplicities(Tolerance::KNOT)
        .into_iter()
        .map(|(value, _)| value)
        .collect();
    let rational = refined.weights.is_some();

    breaks
        .windows(2)
        .enumerate()
        .map(|(segment, span)| {
            let first = segment * p;
            let mut knots = Vec::with_capacity(2 * p + 2);
            knots.extend(std::iter::repeat_n(span[0], p + 1));
            knots.extend(std::iter::repeat_n(span[1], p + 1));
            NurbsCurve3::from_homogeneous(p, &pw[first..=first + p], knots, rational)
        })
        .collect()
}

/// Try to remove `num` occurrences of the knot `value` (P&T A5.8).
///
/// `tolerance` bounds the Euclidean deviation of the curve. Removal stops at
/// the first occurrence that would exceed it; the partial result is returned
/// with `success == false`. Knots at a clamped domain end are never removed.
pub fn remove_knot(
    curve: &NurbsCurve3,
    value: f64,
    num: usize,
    tolerance: f64,
) -> Result<KnotRemoval, ValidationError> {
    let tol = Tolerance::KNOT;
    let p = curve.degree;
    let n = curve.control_point_count() - 1;
    let m = n + p + 1;

    let Some(r) = curve.knots.iter().rposition(|k| tol.approx_eq_f64(*k, value)) else {
        return Err(ValidationError::KnotNotFound { value });
    };
    let (start, end) = curve.domain();
    if tol.approx_eq_f64(value, start) || tol.approx_eq_f64(value, end) || r <= p || r > n {
        log::debug!("refusing to remove domain end knot {value}");
        return Ok(KnotRemoval {
            success: num == 0,
            removed_count: 0,
            curve: curve.clone(),
        });
    }

    let u = &curve.knots;
    let u_val = u[r];
    let s = u.iter().filter(|k| tol.approx_eq_f64(**k, value)).count();
    let attempts = num.min(s);

    let mut pw = curve.homogeneous_points();
    let check_tol = if curve.weights.is_some() {
        let w_min = pw.iter().map(|hp| hp.w).fold(f64::INFINITY, f64::min);
        let p_max = curve
            .control_points
            .iter()
            .map(|pt| pt.to_vec3().length())
            .fold(0.0, f64::max);
        tolerance * w_min / (1.0 + p_max)
    } else {
        tolerance
    };

    let ord = (p + 1) as isize;
    let (ri, si, pi) = (r as isize, s as isize, p as isize);
    let fout = ((2 * ri - si - pi) / 2) as usize;
    let mut first = ri - pi;
    let mut last = ri - si;
    let mut temp = vec![HPoint4::new(0.0, 0.0, 0.0, 0.0); 2 * p + 1];
    let at = |idx: isize| idx as usize;

    let mut t = 0usize;
    while t < attempts {
        let ti = t as isize;
        let off = first - 1;
        temp[0] = pw[at(off)];
        temp[at(last + 1 - off)] = pw[at(last + 1)];
        let (mut i, mut j) = (first, last);
        let (mut ii, mut jj) = (1isize, last - off);

        while j - i > ti {
            let alfi = (u_val - u[at(i)]) / (u[at(i + ord + ti)] - u[at(i)]);
            let alfj = (u_val - u[at(j - ti)]) / (u[at(j + ord)] - u[at(j - ti)]);
            temp[at(ii)] = (pw[at(i)] - temp[at(ii - 1)] * (1.0 - alfi)) / alfi;
            temp[at(jj)] = (pw[at(j)] - temp[at(jj + 1)] * alfj) / (1.0 - alfj);
            i += 1;
            ii += 1;
            j -= 1;
            jj -= 1;
        }

        let deviation = if j - i < ti {
            temp[at(ii - 1)].distance_to(temp[at(jj + 1)])
        } else {
            let alfi = (u_val - u[at(i)]) / (u[at(i + ord + ti)] - u[at(i)]);
            let blended = temp[at(ii + ti + 1)] * alfi + temp[at(ii - 1)] * (1.0 - alfi);
            pw[at(i)].distance_to(blended)
        };
        if !deviation.is_finite() || deviation > check_tol {
            log::trace!("knot {value}: removal {} deviates by {deviation:.3e}", t + 1);
            break;
        }

        let (mut i, mut j) = (first, last);
        while j - i > ti {
            pw[at(i)] = temp[at(i - off)];
            pw[at(j)] = temp[at(j - off)];
            i += 1;
            j -= 1;
        }
        first -= 1;
        last += 1;
        t += 1;
    }

    if t == 0 {
        return Ok(KnotRemoval {
            success: num == 0,
            removed_count: 0,
            curve: curve.clone(),
        });
    }

    let mut knots = u.clone();
    for k in r + 1..=m {
        knots[k - t] = knots[k];
    }
    knots.truncate(m + 1 - t);

    let mut j = fout;
    let mut i = j;
    for k in 1..t {
        if k % 2 == 1 {
            i += 1;
        } else {
            j -= 1;
        }
    }
    for k in i + 1..=n {
        pw[j] = pw[k];
        j += 1;
    }
    pw.truncate(n + 1 - t);

    Ok(KnotRemoval {
        success: t == num,
        removed_count: t,
        curve: rebuild(curve, &pw, knots)?,
    })
}

fn map_direction_curves<F>(
    surface: &NurbsSurface,
    direction: UvDirection,
    op: F,
) -> Result<NurbsSurface, ValidationError>
where
    F: Fn(&NurbsCurve3) -> Result<NurbsCurve3, ValidationError>,
{
    let curves = surface
        .direction_curves(direction)?
        .iter()
        .map(op)
        .collect::<Result<Vec<_>, _>>()?;
    let other = direction.other();
    let mut out = NurbsSurface::from_direction_curves(
        direction,
        &curves,
        surface.degree(other),
        surface.knots(other).to_vec(),
    )?;
    out.periodic_u = surface.periodic_u;
    out.periodic_v = surface.periodic_v;
    Ok(out)
}

/// Insert one knot into the `direction` knot vector of a surface.
pub fn insert_surface_knot(
    surface: &NurbsSurface,
    direction: UvDirection,
    value: f64,
) -> Result<NurbsSurface, ValidationError> {
    map_direction_curves(surface, direction, |curve| insert_knot(curve, value))
}

/// Batch-insert knots into the `direction` knot vector of a surface.
pub fn refine_surface_knots(
    surface: &NurbsSurface,
    direction: UvDirection,
    values: &[f64],
) -> Result<NurbsSurface, ValidationError> {
    let admitted = sanitize_insertions(
        surface.knots(direction),
        surface.degree(direction),
        values,
        Tolerance::KNOT,
    );
    if admitted.is_empty() {
        return Ok(surface.clone());
    }
    map_direction_curves(surface, direction, |curve| refine_knot_vector(curve, &admitted))
}

/// Clamp both directions of a surface.
pub fn clamp_surface(surface: &NurbsSurface) -> Result<NurbsSurface, ValidationError> {
    let u_clamped = map_direction_curves(surface, UvDirection::U, clamp_curve)?;
    let mut out = map_direction_curves(&u_clamped, UvDirection::V, clamp_curve)?;
    out.periodic_u = false;
    out.periodic_v = false;
    Ok(out)
}
