//! Curve orientation and cross-direction placement parameters.
//!
//! Both families are oriented once, before intersection, so that raw
//! placements come out in index order after a plain sort. The sanitizer then
//! turns averaged crossing parameters into a strictly increasing sequence
//! pinned to `[0, 1]` that the interpolation builders accept.

use crate::geom::{GeometryEvaluator, GeomError, NurbsCurve3, Tolerance, ValidationError, Vec3};

/// Options for [`sanitize_placements`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementOptions {
    /// Smallest gap kept between neighbouring placements.
    ///
    /// When `(n - 1) * min_spacing > 1` the sequence cannot honour it and the
    /// placements fall back to a uniform spread.
    pub min_spacing: f64,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self { min_spacing: 1e-4 }
    }
}

impl PlacementOptions {
    #[must_use]
    pub fn with_min_spacing(mut self, min_spacing: f64) -> Self {
        self.min_spacing = min_spacing;
        self
    }

    fn effective_spacing(self) -> f64 {
        if self.min_spacing.is_finite() {
            self.min_spacing.max(Tolerance::KNOT.eps)
        } else {
            Tolerance::KNOT.eps
        }
    }
}

/// Result of [`sanitize_placements`].
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedPlacements {
    pub values: Vec<f64>,
    /// Interior entries moved to honour ordering or spacing.
    pub adjusted: usize,
    /// The minimum spacing could not fit in `[0, 1]`.
    pub uniform_fallback: bool,
}

/// Direction a curve "runs": its chord, or its start tangent when the chord
/// collapses (closed curves). `None` when both vanish.
fn running_direction<E: GeometryEvaluator + ?Sized>(
    curve: &NurbsCurve3,
    evaluator: &E,
) -> Result<Option<Vec3>, ValidationError> {
    let (start, end) = curve.domain();
    let head = evaluator.curve_point(curve, start)?;
    let tail = evaluator.curve_point(curve, end)?;
    let chord = tail - head;
    if !Tolerance::ZERO_LENGTH.is_zero_vec3(chord) {
        return Ok(Some(chord));
    }
    let ders = evaluator.curve_derivatives(curve, start, 1)?;
    Ok(ders.get(1).copied().filter(|t| !Tolerance::ZERO_LENGTH.is_zero_vec3(*t)))
}

/// Orient every curve of a family to agree with the first curve.
///
/// Returns the oriented family and how many curves were reversed. Curves
/// without a usable direction keep their orientation.
pub fn canonicalize_orientation<E: GeometryEvaluator + ?Sized>(
    curves: &[NurbsCurve3],
    evaluator: &E,
) -> Result<(Vec<NurbsCurve3>, usize), GeomError> {
    let Some(first) = curves.first() else {
        return Err(ValidationError::EmptyFamily.into());
    };
    let Some(reference) = running_direction(first, evaluator)? else {
        log::warn!("first curve of the family has no direction; orientation left as given");
        return Ok((curves.to_vec(), 0));
    };

    let mut reversed = 0;
    let mut oriented = Vec::with_capacity(curves.len());
    for curve in curves {
        match running_direction(curve, evaluator)? {
            Some(direction) if direction.dot(reference) < 0.0 => {
                reversed += 1;
                oriented.push(curve.reversed());
            }
            _ => oriented.push(curve.clone()),
        }
    }
    Ok((oriented, reversed))
}

/// Permutation that sorts `placements` ascending. Ties keep index order.
#[must_use]
pub fn order_by_placement(placements: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..placements.len()).collect();
    order.sort_by(|&a, &b| placements[a].total_cmp(&placements[b]));
    order
}

/// Apply a permutation from [`order_by_placement`].
#[must_use]
pub fn permute<T: Clone>(items: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&idx| items[idx].clone()).collect()
}

/// Turn raw averaged placements into interpolation parameters.
///
/// The ends are pinned to exactly `0` and `1`, then a forward pass enforces
/// ascending order with the minimum spacing and a backward pass compresses
/// entries that were pushed past the upper end.
pub fn sanitize_placements(raw: &[f64], options: PlacementOptions) -> Result<SanitizedPlacements, ValidationError> {
    let n = raw.len();
    if n < 2 {
        return Err(ValidationError::LengthMismatch {
            what: "placements",
            expected: 2,
            provided: n,
        });
    }
    if raw.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::NonFinite("placements"));
    }

    let last = n - 1;
    let spacing = options.effective_spacing();
    #[allow(clippy::cast_precision_loss)]
    let span = last as f64;

    if spacing * span > 1.0 {
        log::warn!("{n} placements cannot keep spacing {spacing:e} inside [0, 1]; using a uniform spread");
        return Ok(SanitizedPlacements {
            values: (0..n).map(|i| i as f64 / span).collect(),
            adjusted: last.saturating_sub(1),
            uniform_fallback: true,
        });
    }

    let mut values: Vec<f64> = raw.iter().map(|v| v.clamp(0.0, 1.0)).collect();
    values[0] = 0.0;
    values[last] = 1.0;
    let mut moved = vec![false; n];

    for i in 1..last {
        let floor = values[i - 1] + spacing;
        if values[i] < floor {
            values[i] = floor;
            moved[i] = true;
        }
    }
    for i in (1..last).rev() {
        let ceiling = values[i + 1] - spacing;
        if values[i] > ceiling {
            values[i] = ceiling;
            moved[i] = true;
        }
    }

    let adjusted = moved.iter().filter(|m| **m).count();
    if adjusted > 0 {
        log::warn!("placement sanitizing moved {adjusted} of {n} entries");
    }
    log::debug!("placements {raw:?} -> {values:?}");
    Ok(SanitizedPlacements {
        values,
        adjusted,
        uniform_fallback: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_spread_placements_only_get_pinned() {
        let out = sanitize_placements(&[0.001, 0.4, 0.999], PlacementOptions::default()).unwrap();
        assert_eq!(out.values, vec![0.0, 0.4, 1.0]);
        assert_eq!(out.adjusted, 0);
        assert!(!out.uniform_fallback);
    }

    #[test]
    fn crowded_placements_are_spread() {
        let options = PlacementOptions::default().with_min_spacing(0.1);
        let out = sanitize_placements(&[0.0, 0.5, 0.52, 1.0], options).unwrap();
        assert_eq!(out.values[0], 0.0);
        assert_eq!(out.values[3], 1.0);
        assert!((out.values[2] - 0.6).abs() < 1e-15);
        assert_eq!(out.adjusted, 1);
    }

    #[test]
    fn crowding_at_the_top_compresses_backwards() {
        let options = PlacementOptions::default().with_min_spacing(0.1);
        let out = sanitize_placements(&[0.0, 0.97, 0.98, 0.99, 1.0], options).unwrap();
        for pair in out.values.windows(2) {
            assert!(pair[1] - pair[0] >= 0.1 - 1e-12, "{:?}", out.values);
        }
        assert_eq!(out.values[4], 1.0);
        assert_eq!(out.adjusted, 3);
    }

    #[test]
    fn impossible_spacing_goes_uniform() {
        let options = PlacementOptions::default().with_min_spacing(0.5);
        let out = sanitize_placements(&[0.0, 0.1, 0.2, 1.0], options).unwrap();
        assert!(out.uniform_fallback);
        assert_eq!(out.values.len(), 4);
        assert!((out.values[1] - 1.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn short_or_non_finite_input_is_rejected() {
        assert!(sanitize_placements(&[0.5], PlacementOptions::default()).is_err());
        assert_eq!(
            sanitize_placements(&[0.0, f64::NAN, 1.0], PlacementOptions::default()),
            Err(ValidationError::NonFinite("placements"))
        );
    }

    #[test]
    fn ordering_is_a_stable_permutation() {
        let order = order_by_placement(&[0.7, 0.1, 0.7, 0.0]);
        assert_eq!(order, vec![3, 1, 0, 2]);
        assert_eq!(permute(&['a', 'b', 'c', 'd'], &order), vec!['d', 'b', 'a', 'c']);
    }
}
