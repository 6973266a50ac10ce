//! Crossing discovery between the u-curve and v-curve families.
//!
//! Every (u-curve, v-curve) pair is seeded with the closest pair of samples
//! and refined by Gauss-Newton steps on the squared distance between the two
//! curves. Parameters stay inside each curve's domain.

use crate::geom::{
    ConstructionError, GeomError, GeometryEvaluator, NurbsCurve3, Point3, Tolerance, ValidationError, Vec3,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Options for [`intersect_network`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionOptions {
    /// Samples per curve for the brute-force seed (at least 2).
    pub samples: usize,
    /// Refinement step budget per crossing.
    pub max_iterations: usize,
    /// Refinement stops once both parameter updates are below this.
    pub convergence: f64,
}

impl Default for IntersectionOptions {
    fn default() -> Self {
        Self {
            samples: 20,
            max_iterations: 32,
            convergence: 1e-12,
        }
    }
}

impl IntersectionOptions {
    #[must_use]
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(2);
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_convergence(mut self, convergence: f64) -> Self {
        self.convergence = convergence.abs();
        self
    }
}

/// Closest approach between one u-curve and one v-curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Parameter on the u-curve (a u value).
    pub u: f64,
    /// Parameter on the v-curve (a v value).
    pub v: f64,
    /// Midpoint of the closest pair.
    pub point: Point3,
    /// Distance between the closest pair.
    pub gap: f64,
}

/// All crossings of a network, indexed `[v-curve][u-curve]`.
///
/// That is the `[u][v]` layout of the correction grid: v-curve `j` sits at
/// the `j`-th u placement and u-curve `i` at the `i`-th v placement.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkIntersection {
    pub crossings: Vec<Vec<Crossing>>,
    pub max_gap: f64,
}

impl NetworkIntersection {
    #[must_use]
    pub fn u_curve_count(&self) -> usize {
        self.crossings.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn v_curve_count(&self) -> usize {
        self.crossings.len()
    }

    /// Crossing points in `[u][v]` order.
    #[must_use]
    pub fn points(&self) -> Vec<Vec<Point3>> {
        self.crossings
            .iter()
            .map(|row| row.iter().map(|c| c.point).collect())
            .collect()
    }

    /// Average u parameter of each v-curve's crossings: where every v-curve
    /// sits along u.
    #[must_use]
    pub fn u_placements(&self) -> Vec<f64> {
        self.crossings
            .iter()
            .map(|row| mean(row.iter().map(|c| c.u)))
            .collect()
    }

    /// Average v parameter of each u-curve's crossings: where every u-curve
    /// sits along v.
    #[must_use]
    pub fn v_placements(&self) -> Vec<f64> {
        (0..self.u_curve_count())
            .map(|i| mean(self.crossings.iter().map(|row| row[i].v)))
            .collect()
    }

    /// Reindex after the families were permuted. `u_order[k]` is the old
    /// index of the u-curve now at position `k`, likewise `v_order`.
    #[must_use]
    pub fn reordered(&self, u_order: &[usize], v_order: &[usize]) -> Self {
        let crossings = v_order
            .iter()
            .map(|&j| u_order.iter().map(|&i| self.crossings[j][i]).collect())
            .collect();
        Self {
            crossings,
            max_gap: self.max_gap,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Parameters and positions of the seed samples of one curve.
struct Samples {
    params: Vec<f64>,
    points: Vec<Point3>,
}

#[allow(clippy::cast_precision_loss)]
fn sample_curve<E: GeometryEvaluator + ?Sized>(
    curve: &NurbsCurve3,
    evaluator: &E,
    count: usize,
) -> Result<Samples, ValidationError> {
    let (start, end) = curve.domain();
    let last = (count.max(2) - 1) as f64;
    let params: Vec<f64> = (0..count.max(2))
        .map(|k| start + (end - start) * (k as f64 / last))
        .collect();
    let points = evaluator.curve_points(curve, &params)?;
    Ok(Samples { params, points })
}

fn seed(a: &Samples, b: &Samples) -> (f64, f64) {
    let mut best = (a.params[0], b.params[0], f64::INFINITY);
    for (pa, &sa) in a.points.iter().zip(&a.params) {
        for (pb, &sb) in b.points.iter().zip(&b.params) {
            let d = (*pa - *pb).length_squared();
            if d < best.2 {
                best = (sa, sb, d);
            }
        }
    }
    (best.0, best.1)
}

/// Parameter steps `(ds, dt)` moving `C1(s)` and `C2(t)` towards each other.
///
/// Solves the 2x2 normal equations of `T1 ds - T2 dt = C2 - C1`. Nearly
/// parallel tangents fall back to projecting the gap on each tangent alone;
/// a zero-length tangent leaves its parameter in place.
fn refinement_step(t1: Vec3, t2: Vec3, gap: Vec3) -> (f64, f64) {
    let a11 = t1.length_squared();
    let a22 = t2.length_squared();
    let a12 = -t1.dot(t2);
    let b1 = t1.dot(gap);
    let b2 = -t2.dot(gap);
    let det = a11 * a22 - a12 * a12;
    if det > 1e-10 * a11 * a22 && a11 > 0.0 && a22 > 0.0 {
        return ((b1 * a22 - a12 * b2) / det, (a11 * b2 - a12 * b1) / det);
    }
    let tiny = Tolerance::ZERO_LENGTH.eps_squared();
    let ds = if a11 > tiny { b1 / a11 } else { 0.0 };
    let dt = if a22 > tiny { b2 / a22 } else { 0.0 };
    (ds, dt)
}

/// Closest approach between `a` and `b`, starting from the sample seed.
pub fn closest_approach<E: GeometryEvaluator + ?Sized>(
    a: &NurbsCurve3,
    b: &NurbsCurve3,
    evaluator: &E,
    options: IntersectionOptions,
) -> Result<Crossing, ValidationError> {
    let sa = sample_curve(a, evaluator, options.samples)?;
    let sb = sample_curve(b, evaluator, options.samples)?;
    refine_crossing(a, b, seed(&sa, &sb), evaluator, options)
}

fn refine_crossing<E: GeometryEvaluator + ?Sized>(
    a: &NurbsCurve3,
    b: &NurbsCurve3,
    start: (f64, f64),
    evaluator: &E,
    options: IntersectionOptions,
) -> Result<Crossing, ValidationError> {
    let (a0, a1) = a.domain();
    let (b0, b1) = b.domain();
    let (mut s, mut t) = start;
    let mut best: Option<(f64, f64, Point3, Point3, f64)> = None;

    for iteration in 0..=options.max_iterations {
        let da = evaluator.curve_derivatives(a, s, 1)?;
        let db = evaluator.curve_derivatives(b, t, 1)?;
        let (pa, pb) = (da[0].to_point3(), db[0].to_point3());
        let gap = pb - pa;
        let distance = gap.length();
        if best.is_none_or(|(.., d)| distance < d) {
            best = Some((s, t, pa, pb, distance));
        }
        if iteration == options.max_iterations {
            break;
        }

        let (ds, dt) = refinement_step(da[1], db[1], gap);
        let next = ((s + ds).clamp(a0, a1), (t + dt).clamp(b0, b1));
        let moved = (next.0 - s).abs().max((next.1 - t).abs());
        (s, t) = next;
        if moved <= options.convergence {
            log::trace!("crossing converged after {} steps (gap {distance:e})", iteration + 1);
            // One more evaluation records the converged pair.
            let pa = evaluator.curve_point(a, s)?;
            let pb = evaluator.curve_point(b, t)?;
            let distance = pa.distance_to(pb);
            if best.is_none_or(|(.., d)| distance < d) {
                best = Some((s, t, pa, pb, distance));
            }
            break;
        }
    }

    let (u, v, pa, pb, gap) = best.ok_or(ValidationError::EmptyDomain)?;
    Ok(Crossing {
        u,
        v,
        point: pa.lerp(pb, 0.5),
        gap,
    })
}

/// Crossings of v-curve `j` with every u-curve.
fn crossing_row<E: GeometryEvaluator + ?Sized>(
    j: usize,
    u_curves: &[NurbsCurve3],
    v_curve: &NurbsCurve3,
    u_samples: &[Samples],
    v_samples: &Samples,
    evaluator: &E,
    options: IntersectionOptions,
) -> Result<Vec<Crossing>, ValidationError> {
    u_curves
        .iter()
        .zip(u_samples)
        .enumerate()
        .map(|(i, (u_curve, samples))| {
            let crossing = refine_crossing(u_curve, v_curve, seed(samples, v_samples), evaluator, options)?;
            log::trace!(
                "u-curve {i} x v-curve {j}: u = {:.6}, v = {:.6}, gap = {:e}",
                crossing.u,
                crossing.v,
                crossing.gap
            );
            Ok(crossing)
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn crossing_rows<E: GeometryEvaluator + ?Sized>(
    u_curves: &[NurbsCurve3],
    v_curves: &[NurbsCurve3],
    u_samples: &[Samples],
    v_samples: &[Samples],
    evaluator: &E,
    options: IntersectionOptions,
) -> Result<Vec<Vec<Crossing>>, ValidationError> {
    v_curves
        .par_iter()
        .zip(v_samples.par_iter())
        .enumerate()
        .map(|(j, (v_curve, samples))| crossing_row(j, u_curves, v_curve, u_samples, samples, evaluator, options))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn crossing_rows<E: GeometryEvaluator + ?Sized>(
    u_curves: &[NurbsCurve3],
    v_curves: &[NurbsCurve3],
    u_samples: &[Samples],
    v_samples: &[Samples],
    evaluator: &E,
    options: IntersectionOptions,
) -> Result<Vec<Vec<Crossing>>, ValidationError> {
    v_curves
        .iter()
        .zip(v_samples)
        .enumerate()
        .map(|(j, (v_curve, samples))| crossing_row(j, u_curves, v_curve, u_samples, samples, evaluator, options))
        .collect()
}

/// Intersect every u-curve with every v-curve.
///
/// A pair whose closest approach exceeds `tolerance` aborts with
/// [`ConstructionError::CurvesDoNotIntersect`].
pub fn intersect_network<E: GeometryEvaluator + ?Sized>(
    u_curves: &[NurbsCurve3],
    v_curves: &[NurbsCurve3],
    evaluator: &E,
    options: IntersectionOptions,
    tolerance: f64,
) -> Result<NetworkIntersection, GeomError> {
    if u_curves.is_empty() || v_curves.is_empty() {
        return Err(ValidationError::EmptyFamily.into());
    }

    let u_samples = u_curves
        .iter()
        .map(|c| sample_curve(c, evaluator, options.samples))
        .collect::<Result<Vec<_>, _>>()?;
    let v_samples = v_curves
        .iter()
        .map(|c| sample_curve(c, evaluator, options.samples))
        .collect::<Result<Vec<_>, _>>()?;

    let crossings = crossing_rows(u_curves, v_curves, &u_samples, &v_samples, evaluator, options)?;

    let mut max_gap = 0.0_f64;
    for (j, row) in crossings.iter().enumerate() {
        for (i, crossing) in row.iter().enumerate() {
            if crossing.gap > tolerance {
                return Err(ConstructionError::CurvesDoNotIntersect {
                    u_curve: i,
                    v_curve: j,
                    gap: crossing.gap,
                    tolerance,
                }
                .into());
            }
            max_gap = max_gap.max(crossing.gap);
        }
    }
    if max_gap > 0.5 * tolerance {
        log::warn!("largest crossing gap {max_gap:e} is close to the allowed {tolerance:e}");
    }
    log::debug!(
        "intersected {} u-curves with {} v-curves, max gap {max_gap:e}",
        u_curves.len(),
        v_curves.len()
    );
    Ok(NetworkIntersection { crossings, max_gap })
}
