use serde::{Deserialize, Serialize};

use super::core::{HPoint4, Point3, Tolerance};
use super::error::ValidationError;
use super::knots::{self, is_non_decreasing};

/// A (possibly rational) B-spline curve record.
///
/// Invariants enforced by [`NurbsCurve3::new`]:
/// `knots.len() == degree + control_points.len() + 1`, knots non-decreasing,
/// `1 <= degree < control_points.len()`, weights (if any) finite and positive.
/// Operations never mutate a curve; they return a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveRecord", rename_all = "camelCase")]
pub struct NurbsCurve3 {
    pub degree: usize,
    pub control_points: Vec<Point3>,
    pub knots: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    #[serde(rename = "isPeriodic")]
    pub periodic: bool,
}

/// Unvalidated wire form; converted through [`NurbsCurve3::new`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurveRecord {
    degree: usize,
    control_points: Vec<Point3>,
    knots: Vec<f64>,
    #[serde(default)]
    weights: Option<Vec<f64>>,
    #[serde(default)]
    is_periodic: bool,
}

impl TryFrom<CurveRecord> for NurbsCurve3 {
    type Error = ValidationError;

    fn try_from(record: CurveRecord) -> Result<Self, Self::Error> {
        Ok(Self::new(record.degree, record.control_points, record.knots, record.weights)?
            .with_periodic(record.is_periodic))
    }
}

impl NurbsCurve3 {
    /// Spatial dimension of every control point.
    pub const DIMENSION: usize = 3;

    pub fn new(
        degree: usize,
        control_points: Vec<Point3>,
        knots: Vec<f64>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, ValidationError> {
        if degree == 0 {
            return Err(ValidationError::ZeroDegree);
        }
        if control_points.len() < 2 || degree >= control_points.len() {
            return Err(ValidationError::TooFewControlPoints {
                context: "nurbs curve",
                required: (degree + 1).max(2),
                provided: control_points.len(),
            });
        }

        let expected_knot_len = control_points.len() + degree + 1;
        if knots.len() != expected_knot_len {
            return Err(ValidationError::KnotLengthMismatch {
                expected: expected_knot_len,
                provided: knots.len(),
            });
        }

        if let Some(ref weights) = weights {
            if weights.len() != control_points.len() {
                return Err(ValidationError::WeightCountMismatch {
                    expected: control_points.len(),
                    provided: weights.len(),
                });
            }
            if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
                return Err(ValidationError::InvalidWeight);
            }
        }

        if control_points.iter().any(|p| !p.is_finite()) {
            return Err(ValidationError::NonFinite("control points"));
        }
        if knots.iter().any(|k| !k.is_finite()) {
            return Err(ValidationError::NonFinite("knots"));
        }
        if !is_non_decreasing(&knots) {
            return Err(ValidationError::KnotsNotMonotone);
        }
        if knots[degree] >= knots[control_points.len()] {
            return Err(ValidationError::EmptyDomain);
        }

        Ok(Self {
            degree,
            control_points,
            knots,
            weights,
            periodic: false,
        })
    }

    /// Rebuild a curve from homogeneous control points.
    ///
    /// With `rational == false` the weights are dropped after projection, which
    /// is exact whenever every weight is 1.
    pub fn from_homogeneous(
        degree: usize,
        points: &[HPoint4],
        knots: Vec<f64>,
        rational: bool,
    ) -> Result<Self, ValidationError> {
        let mut control_points = Vec::with_capacity(points.len());
        for hp in points {
            control_points.push(hp.to_point3().ok_or(ValidationError::InvalidWeight)?);
        }
        let weights = rational.then(|| points.iter().map(|hp| hp.w).collect());
        Self::new(degree, control_points, knots, weights)
    }

    #[must_use]
    pub fn with_periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic;
        self
    }

    #[must_use]
    pub fn control_point_count(&self) -> usize {
        self.control_points.len()
    }

    /// Parameter domain `[knots[p], knots[n + 1]]`.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.control_points.len()])
    }

    /// Whether any weight differs from 1.
    #[must_use]
    pub fn is_rational(&self) -> bool {
        self.weights
            .as_ref()
            .is_some_and(|w| w.iter().any(|x| (x - 1.0).abs() > Tolerance::TIGHT.eps))
    }

    #[must_use]
    pub fn weight(&self, index: usize) -> f64 {
        self.weights
            .as_ref()
            .and_then(|w| w.get(index).copied())
            .unwrap_or(1.0)
    }

    #[must_use]
    pub fn homogeneous_points(&self) -> Vec<HPoint4> {
        self.control_points
            .iter()
            .enumerate()
            .map(|(i, p)| HPoint4::from_weighted(*p, self.weight(i)))
            .collect()
    }

    #[must_use]
    pub fn knot_multiplicities(&self, tol: Tolerance) -> Vec<(f64, usize)> {
        knots::multiplicities(&self.knots, tol)
    }

    #[must_use]
    pub fn is_clamped(&self, tol: Tolerance) -> bool {
        knots::is_clamped(&self.knots, self.degree, tol)
    }

    /// Reverse the parameter direction: `u_new = u_max - u + u_min`.
    ///
    /// Control points and weights are reversed and knots are reflected about
    /// the domain midpoint, so the point-set image is unchanged, the endpoints
    /// swap, and reversing twice restores the original record.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let first = self.knots[0];
        let last = self.knots[self.knots.len() - 1];
        let knots = self.knots.iter().rev().map(|k| first + last - k).collect();
        let control_points = self.control_points.iter().rev().copied().collect();
        let weights = self
            .weights
            .as_ref()
            .map(|w| w.iter().rev().copied().collect());
        Self {
            degree: self.degree,
            control_points,
            knots,
            weights,
            periodic: self.periodic,
        }
    }

    /// Affine reparameterization of the knot vector onto `[start, end]`.
    ///
    /// Only the end knots are used as anchors; for clamped curves this maps the
    /// domain exactly onto `[start, end]`.
    pub fn reparameterized(&self, start: f64, end: f64) -> Result<Self, ValidationError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ValidationError::NonFinite("domain bounds"));
        }
        if start >= end {
            return Err(ValidationError::NotIncreasing("domain bounds"));
        }
        let knots = knots::remap_knots(&self.knots, start, end);
        Ok(Self::new(
            self.degree,
            self.control_points.clone(),
            knots,
            self.weights.clone(),
        )?
        .with_periodic(self.periodic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic() -> NurbsCurve3 {
        NurbsCurve3::new(
            2,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
                Point3::new(3.0, 2.0, 1.0),
                Point3::new(4.0, 0.0, 0.0),
            ],
            vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0],
            Some(vec![1.0, 2.0, 0.5, 1.0]),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_bad_knot_length() {
        let err = NurbsCurve3::new(
            1,
            vec![Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0)],
            vec![0.0, 1.0, 1.0],
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::KnotLengthMismatch {
                expected: 4,
                provided: 3
            }
        );
    }

    #[test]
    fn new_rejects_degree_too_high_and_bad_weights() {
        let pts = vec![Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0)];
        assert!(matches!(
            NurbsCurve3::new(2, pts.clone(), vec![0.0; 5], None),
            Err(ValidationError::TooFewControlPoints { .. })
        ));
        assert_eq!(
            NurbsCurve3::new(1, pts.clone(), vec![0.0, 0.0, 1.0, 1.0], Some(vec![1.0, -1.0])),
            Err(ValidationError::InvalidWeight)
        );
        assert_eq!(
            NurbsCurve3::new(1, pts, vec![0.0, 1.0, 0.5, 1.0], None),
            Err(ValidationError::KnotsNotMonotone)
        );
    }

    #[test]
    fn reversal_is_an_involution() {
        let curve = quadratic();
        let rev = curve.reversed();
        assert_eq!(rev.control_points.first(), curve.control_points.last());
        assert_eq!(rev.knots, vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]);
        assert_eq!(rev.weights, Some(vec![1.0, 0.5, 2.0, 1.0]));
        assert_eq!(rev.reversed(), curve);
    }

    #[test]
    fn reparameterize_maps_domain() {
        let curve = quadratic().reparameterized(2.0, 4.0).unwrap();
        assert_eq!(curve.domain(), (2.0, 4.0));
        assert_eq!(curve.knots[3], 3.0);
        assert!(quadratic().reparameterized(1.0, 1.0).is_err());
    }

    #[test]
    fn homogeneous_round_trip_keeps_weights() {
        let curve = quadratic();
        let hp = curve.homogeneous_points();
        assert_eq!(hp[1], HPoint4::new(2.0, 4.0, 0.0, 2.0));
        let back = NurbsCurve3::from_homogeneous(2, &hp, curve.knots.clone(), true).unwrap();
        assert_eq!(back, curve);
        assert!(back.is_rational());
    }

    #[test]
    fn record_deserialization_validates() {
        let json = r#"{"degree":1,"controlPoints":[[0,0,0],[1,0,0]],"knots":[0,0,1,1]}"#;
        let curve: NurbsCurve3 = serde_json::from_str(json).unwrap();
        assert_eq!(curve.control_point_count(), 2);
        assert!(!curve.periodic);

        let bad = r#"{"degree":1,"controlPoints":[[0,0,0],[1,0,0]],"knots":[0,1,1]}"#;
        assert!(serde_json::from_str::<NurbsCurve3>(bad).is_err());
    }

    #[test]
    fn record_serialization_uses_layout_names() {
        let curve = quadratic();
        let value = serde_json::to_value(&curve).unwrap();
        assert!(value.get("controlPoints").is_some());
        assert_eq!(value["isPeriodic"], serde_json::Value::Bool(false));
        let back: NurbsCurve3 = serde_json::from_value(value).unwrap();
        assert_eq!(back, curve);
    }

    #[test]
    fn json_text_keeps_every_bit() {
        let awkward = [0.051_659_347_423_565_996, 0.1 + 0.2, 1.0 / 3.0, 2.0_f64.sqrt(), -7.0 / 11.0];
        let curve = NurbsCurve3::new(
            2,
            vec![
                Point3::new(awkward[0], awkward[1], awkward[2]),
                Point3::new(awkward[3], awkward[4], awkward[0]),
                Point3::new(awkward[2], awkward[1], awkward[3]),
                Point3::new(awkward[4], awkward[0], awkward[1]),
            ],
            vec![0.0, 0.0, 0.0, 1.0 / 3.0, 1.0, 1.0, 1.0],
            Some(vec![1.0, 0.1 + 0.2, 2.0_f64.sqrt(), 1.0]),
        )
        .unwrap();
        let json = serde_json::to_string(&curve).unwrap();
        let back: NurbsCurve3 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, curve);
    }
}
