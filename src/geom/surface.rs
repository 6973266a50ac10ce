use serde::{Deserialize, Serialize};

use super::core::{HPoint4, Point3, Tolerance};
use super::curve::NurbsCurve3;
use super::error::ValidationError;
use super::evaluator::de_boor_homogeneous;
use super::knots::{find_span, is_non_decreasing};

/// Parametric direction of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UvDirection {
    U,
    V,
}

impl UvDirection {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::U => Self::V,
            Self::V => Self::U,
        }
    }
}

/// A (possibly rational) tensor-product B-spline surface record.
///
/// The control net is stored u-major: the point at `(u_index, v_index)` lives
/// at `u_index * v_count + v_index`. Each direction satisfies the curve knot
/// length invariant on its own, so every row and column slices into a valid
/// [`NurbsCurve3`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SurfaceRecord", into = "SurfaceRecord")]
pub struct NurbsSurface {
    pub degree_u: usize,
    pub degree_v: usize,
    pub u_count: usize,
    pub v_count: usize,
    pub control_points: Vec<Point3>,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    pub weights: Option<Vec<f64>>,
    pub periodic_u: bool,
    pub periodic_v: bool,
}

/// Wire form with a nested `[u][v]` control grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurfaceRecord {
    u_degree: usize,
    v_degree: usize,
    control_points: Vec<Vec<Point3>>,
    u_knots: Vec<f64>,
    v_knots: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weights: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    is_periodic_u: bool,
    #[serde(default)]
    is_periodic_v: bool,
}

impl TryFrom<SurfaceRecord> for NurbsSurface {
    type Error = ValidationError;

    fn try_from(record: SurfaceRecord) -> Result<Self, Self::Error> {
        let mut surface = Self::from_grid(
            record.u_degree,
            record.v_degree,
            record.control_points,
            record.u_knots,
            record.v_knots,
            record.weights,
        )?;
        surface.periodic_u = record.is_periodic_u;
        surface.periodic_v = record.is_periodic_v;
        Ok(surface)
    }
}

impl From<NurbsSurface> for SurfaceRecord {
    fn from(surface: NurbsSurface) -> Self {
        let weights = surface.weights.as_ref().map(|w| {
            w.chunks(surface.v_count)
                .map(<[f64]>::to_vec)
                .collect::<Vec<_>>()
        });
        Self {
            u_degree: surface.degree_u,
            v_degree: surface.degree_v,
            control_points: surface.grid(),
            u_knots: surface.knots_u,
            v_knots: surface.knots_v,
            weights,
            is_periodic_u: surface.periodic_u,
            is_periodic_v: surface.periodic_v,
        }
    }
}

impl NurbsSurface {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        u_count: usize,
        v_count: usize,
        control_points: Vec<Point3>,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, ValidationError> {
        if degree_u == 0 || degree_v == 0 {
            return Err(ValidationError::ZeroDegree);
        }
        if u_count < 2 || degree_u >= u_count {
            return Err(ValidationError::TooFewControlPoints {
                context: "nurbs surface u direction",
                required: (degree_u + 1).max(2),
                provided: u_count,
            });
        }
        if v_count < 2 || degree_v >= v_count {
            return Err(ValidationError::TooFewControlPoints {
                context: "nurbs surface v direction",
                required: (degree_v + 1).max(2),
                provided: v_count,
            });
        }
        if control_points.len() != u_count * v_count {
            return Err(ValidationError::GridSizeMismatch {
                u_count,
                v_count,
                provided: control_points.len(),
            });
        }

        let expected_u_knots = u_count + degree_u + 1;
        if knots_u.len() != expected_u_knots {
            return Err(ValidationError::KnotLengthMismatch {
                expected: expected_u_knots,
                provided: knots_u.len(),
            });
        }

        let expected_v_knots = v_count + degree_v + 1;
        if knots_v.len() != expected_v_knots {
            return Err(ValidationError::KnotLengthMismatch {
                expected: expected_v_knots,
                provided: knots_v.len(),
            });
        }

        if knots_u.iter().chain(&knots_v).any(|k| !k.is_finite()) {
            return Err(ValidationError::NonFinite("knots"));
        }
        if !is_non_decreasing(&knots_u) || !is_non_decreasing(&knots_v) {
            return Err(ValidationError::KnotsNotMonotone);
        }
        if knots_u[degree_u] >= knots_u[u_count] || knots_v[degree_v] >= knots_v[v_count] {
            return Err(ValidationError::EmptyDomain);
        }
        if control_points.iter().any(|p| !p.is_finite()) {
            return Err(ValidationError::NonFinite("control points"));
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

        Ok(Self {
            degree_u,
            degree_v,
            u_count,
            v_count,
            control_points,
            knots_u,
            knots_v,
            weights,
            periodic_u: false,
            periodic_v: false,
        })
    }

    /// Build from a nested `[u][v]` grid.
    pub fn from_grid(
        degree_u: usize,
        degree_v: usize,
        grid: Vec<Vec<Point3>>,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        weights: Option<Vec<Vec<f64>>>,
    ) -> Result<Self, ValidationError> {
        let u_count = grid.len();
        let v_count = grid.first().map_or(0, Vec::len);
        if let Some(row) = grid.iter().find(|row| row.len() != v_count) {
            return Err(ValidationError::LengthMismatch {
                what: "control grid row",
                expected: v_count,
                provided: row.len(),
            });
        }
        let weights = match weights {
            Some(w) => {
                if w.len() != u_count || w.iter().any(|row| row.len() != v_count) {
                    return Err(ValidationError::WeightCountMismatch {
                        expected: u_count * v_count,
                        provided: w.iter().map(Vec::len).sum(),
                    });
                }
                Some(w.into_iter().flatten().collect())
            }
            None => None,
        };
        Self::new(
            degree_u,
            degree_v,
            u_count,
            v_count,
            grid.into_iter().flatten().collect(),
            knots_u,
            knots_v,
            weights,
        )
    }

    /// Build from homogeneous control points in u-major order.
    #[allow(clippy::too_many_arguments)]
    pub fn from_homogeneous(
        degree_u: usize,
        degree_v: usize,
        u_count: usize,
        v_count: usize,
        points: &[HPoint4],
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        rational: bool,
    ) -> Result<Self, ValidationError> {
        let mut control_points = Vec::with_capacity(points.len());
        for hp in points {
            control_points.push(hp.to_point3().ok_or(ValidationError::InvalidWeight)?);
        }
        let weights = rational.then(|| points.iter().map(|hp| hp.w).collect());
        Self::new(
            degree_u,
            degree_v,
            u_count,
            v_count,
            control_points,
            knots_u,
            knots_v,
            weights,
        )
    }

    #[must_use]
    pub const fn index(&self, u_index: usize, v_index: usize) -> usize {
        u_index * self.v_count + v_index
    }

    #[must_use]
    pub fn control_point(&self, u_index: usize, v_index: usize) -> Point3 {
        self.control_points[self.index(u_index, v_index)]
    }

    #[must_use]
    pub fn weight(&self, u_index: usize, v_index: usize) -> f64 {
        let idx = self.index(u_index, v_index);
        self.weights
            .as_ref()
            .and_then(|weights| weights.get(idx).copied())
            .unwrap_or(1.0)
    }

    #[must_use]
    pub fn control_hpoint(&self, u_index: usize, v_index: usize) -> HPoint4 {
        HPoint4::from_weighted(
            self.control_point(u_index, v_index),
            self.weight(u_index, v_index),
        )
    }

    /// All control points in homogeneous form, u-major.
    #[must_use]
    pub fn homogeneous_points(&self) -> Vec<HPoint4> {
        (0..self.u_count)
            .flat_map(|u| (0..self.v_count).map(move |v| (u, v)))
            .map(|(u, v)| self.control_hpoint(u, v))
            .collect()
    }

    /// The control net as a nested `[u][v]` grid.
    #[must_use]
    pub fn grid(&self) -> Vec<Vec<Point3>> {
        self.control_points
            .chunks(self.v_count)
            .map(<[Point3]>::to_vec)
            .collect()
    }

    #[must_use]
    pub fn is_rational(&self) -> bool {
        self.weights
            .as_ref()
            .is_some_and(|w| w.iter().any(|x| (x - 1.0).abs() > Tolerance::TIGHT.eps))
    }

    #[must_use]
    pub fn degree(&self, direction: UvDirection) -> usize {
        match direction {
            UvDirection::U => self.degree_u,
            UvDirection::V => self.degree_v,
        }
    }

    #[must_use]
    pub fn knots(&self, direction: UvDirection) -> &[f64] {
        match direction {
            UvDirection::U => &self.knots_u,
            UvDirection::V => &self.knots_v,
        }
    }

    #[must_use]
    pub fn domain_u(&self) -> (f64, f64) {
        (self.knots_u[self.degree_u], self.knots_u[self.u_count])
    }

    #[must_use]
    pub fn domain_v(&self) -> (f64, f64) {
        (self.knots_v[self.degree_v], self.knots_v[self.v_count])
    }

    /// Swap the roles of u and v.
    #[must_use]
    pub fn transposed(&self) -> Self {
        let mut control_points = Vec::with_capacity(self.control_points.len());
        let mut weights = self.weights.as_ref().map(|_| Vec::with_capacity(self.control_points.len()));
        for v in 0..self.v_count {
            for u in 0..self.u_count {
                control_points.push(self.control_point(u, v));
                if let Some(w) = weights.as_mut() {
                    w.push(self.weight(u, v));
                }
            }
        }
        Self {
            degree_u: self.degree_v,
            degree_v: self.degree_u,
            u_count: self.v_count,
            v_count: self.u_count,
            control_points,
            knots_u: self.knots_v.clone(),
            knots_v: self.knots_u.clone(),
            weights,
            periodic_u: self.periodic_v,
            periodic_v: self.periodic_u,
        }
    }

    /// Slice the control net into curves running along `direction`.
    ///
    /// For [`UvDirection::U`] this yields one curve per v index, each with the
    /// surface's u degree and knots; for [`UvDirection::V`] one curve per u index.
    pub fn direction_curves(&self, direction: UvDirection) -> Result<Vec<NurbsCurve3>, ValidationError> {
        let rational = self.weights.is_some();
        let (outer, inner) = match direction {
            UvDirection::U => (self.v_count, self.u_count),
            UvDirection::V => (self.u_count, self.v_count),
        };
        (0..outer)
            .map(|o| {
                let points: Vec<HPoint4> = (0..inner)
                    .map(|i| match direction {
                        UvDirection::U => self.control_hpoint(i, o),
                        UvDirection::V => self.control_hpoint(o, i),
                    })
                    .collect();
                NurbsCurve3::from_homogeneous(
                    self.degree(direction),
                    &points,
                    self.knots(direction).to_vec(),
                    rational,
                )
            })
            .collect()
    }

    /// Inverse of [`direction_curves`](Self::direction_curves).
    ///
    /// All `curves` must share degree, knots and control-point count; they are
    /// laid side by side along the other direction with `other_degree` and
    /// `other_knots`.
    pub fn from_direction_curves(
        direction: UvDirection,
        curves: &[NurbsCurve3],
        other_degree: usize,
        other_knots: Vec<f64>,
    ) -> Result<Self, ValidationError> {
        let first = curves.first().ok_or(ValidationError::EmptyFamily)?;
        let along = first.control_point_count();
        for curve in curves {
            if curve.degree != first.degree || curve.control_point_count() != along {
                return Err(ValidationError::IncompatibleFamily(format!(
                    "expected degree {} with {} control points, got degree {} with {}",
                    first.degree,
                    along,
                    curve.degree,
                    curve.control_point_count()
                )));
            }
        }
        let rational = curves.iter().any(NurbsCurve3::is_rational);
        let homogeneous: Vec<Vec<HPoint4>> =
            curves.iter().map(NurbsCurve3::homogeneous_points).collect();

        let (u_count, v_count) = match direction {
            UvDirection::U => (along, curves.len()),
            UvDirection::V => (curves.len(), along),
        };
        let mut points = Vec::with_capacity(u_count * v_count);
        for u in 0..u_count {
            for v in 0..v_count {
                points.push(match direction {
                    UvDirection::U => homogeneous[v][u],
                    UvDirection::V => homogeneous[u][v],
                });
            }
        }

        let (degree_u, degree_v, knots_u, knots_v) = match direction {
            UvDirection::U => (first.degree, other_degree, first.knots.clone(), other_knots),
            UvDirection::V => (other_degree, first.degree, other_knots, first.knots.clone()),
        };
        Self::from_homogeneous(
            degree_u, degree_v, u_count, v_count, &points, knots_u, knots_v, rational,
        )
    }

    /// Exact iso-parameter curve.
    ///
    /// `direction` names the parameter being held fixed: `UvDirection::V` with
    /// `parameter = v0` yields the curve `u -> S(u, v0)`.
    pub fn iso_curve(&self, direction: UvDirection, parameter: f64) -> Result<NurbsCurve3, ValidationError> {
        let running = direction.other();
        let fixed_degree = self.degree(direction);
        let fixed_knots = self.knots(direction);
        let (start, end) = match direction {
            UvDirection::U => self.domain_u(),
            UvDirection::V => self.domain_v(),
        };
        if !parameter.is_finite() || parameter < start || parameter > end {
            return Err(ValidationError::ParameterOutOfDomain {
                value: parameter,
                start,
                end,
            });
        }

        let fixed_count = match direction {
            UvDirection::U => self.u_count,
            UvDirection::V => self.v_count,
        };
        let span = find_span(fixed_count - 1, fixed_degree, parameter, fixed_knots);
        let rational = self.weights.is_some();

        let points: Vec<HPoint4> = self
            .direction_curves(direction)?
            .iter()
            .map(|slice| {
                let hp = slice.homogeneous_points();
                let mut local: Vec<HPoint4> = hp[span - fixed_degree..=span].to_vec();
                de_boor_homogeneous(&mut local, span, fixed_degree, parameter, fixed_knots);
                local[fixed_degree]
            })
            .collect();

        NurbsCurve3::from_homogeneous(
            self.degree(running),
            &points,
            self.knots(running).to_vec(),
            rational,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bilinear_patch() -> NurbsSurface {
        NurbsSurface::from_grid(
            1,
            2,
            vec![
                vec![
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(0.0, 1.0, 1.0),
                    Point3::new(0.0, 2.0, 0.0),
                ],
                vec![
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(1.0, 1.0, 2.0),
                    Point3::new(1.0, 2.0, 0.0),
                ],
            ],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            None,
        )
        .unwrap()
    }

    #[test]
    fn grid_layout_is_u_major() {
        let s = bilinear_patch();
        assert_eq!((s.u_count, s.v_count), (2, 3));
        assert_eq!(s.control_point(1, 1), Point3::new(1.0, 1.0, 2.0));
        assert_eq!(s.grid()[0][2], Point3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn new_rejects_mismatched_grid() {
        let err = NurbsSurface::new(
            1,
            1,
            2,
            2,
            vec![Point3::ORIGIN; 3],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::GridSizeMismatch { provided: 3, .. }));
    }

    #[test]
    fn transpose_swaps_roles() {
        let s = bilinear_patch();
        let t = s.transposed();
        assert_eq!((t.u_count, t.v_count), (3, 2));
        assert_eq!((t.degree_u, t.degree_v), (2, 1));
        assert_eq!(t.control_point(1, 1), s.control_point(1, 1));
        assert_eq!(t.control_point(2, 0), s.control_point(0, 2));
        assert_eq!(t.transposed(), s);
    }

    #[test]
    fn direction_curves_round_trip() {
        let s = bilinear_patch();
        let u_curves = s.direction_curves(UvDirection::U).unwrap();
        assert_eq!(u_curves.len(), 3);
        assert_eq!(u_curves[1].degree, 1);
        assert_eq!(u_curves[1].control_points[1], Point3::new(1.0, 1.0, 2.0));

        let rebuilt =
            NurbsSurface::from_direction_curves(UvDirection::U, &u_curves, 2, s.knots_v.clone())
                .unwrap();
        assert_eq!(rebuilt, s);

        let v_curves = s.direction_curves(UvDirection::V).unwrap();
        assert_eq!(v_curves.len(), 2);
        let rebuilt =
            NurbsSurface::from_direction_curves(UvDirection::V, &v_curves, 1, s.knots_u.clone())
                .unwrap();
        assert_eq!(rebuilt, s);
    }

    #[test]
    fn iso_curve_at_domain_edges_matches_boundary_rows() {
        let s = bilinear_patch();
        let edge = s.iso_curve(UvDirection::V, 0.0).unwrap();
        assert_eq!(edge.degree, 1);
        assert_eq!(edge.control_points, vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]);

        let mid = s.iso_curve(UvDirection::U, 0.5).unwrap();
        assert_eq!(mid.degree, 2);
        assert_eq!(mid.control_points[1], Point3::new(0.5, 1.0, 1.5));
        assert!(s.iso_curve(UvDirection::U, 1.5).is_err());
    }

    #[test]
    fn record_round_trips_through_json() {
        let s = bilinear_patch();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["uDegree"], 1);
        assert_eq!(json["controlPoints"].as_array().map(Vec::len), Some(2));
        let back: NurbsSurface = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
