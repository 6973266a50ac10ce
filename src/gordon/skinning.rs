//! Skinning: a surface through an ordered, compatible curve family.
//!
//! Curve `i` of the family becomes the iso-curve at cross parameter
//! `params[i]`. Each control-point column is interpolated exactly across the
//! family, so the result reproduces every member.

use crate::geom::{
    ConstructionError, GeomError, GeometryEvaluator, HPoint4, NurbsCurve3, NurbsSurface, Point3, Tolerance,
    UvDirection, ValidationError, unify_curves,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One column of samples to interpolate: positions, plus weights for
/// rational families.
pub(crate) struct Column {
    pub points: Vec<Point3>,
    pub weights: Option<Vec<f64>>,
}

fn interpolate_column<E: GeometryEvaluator + ?Sized>(
    column: &Column,
    params: &[f64],
    degree: usize,
    evaluator: &E,
) -> Result<NurbsCurve3, GeomError> {
    let every: Vec<usize> = (0..params.len()).collect();
    let Some(weights) = &column.weights else {
        return evaluator.approximate(&column.points, params, degree, 0.0, &every);
    };

    // Rational columns interpolate (w*x, w*y, w*z) and w on the same knots.
    let weighted: Vec<Point3> = column
        .points
        .iter()
        .zip(weights)
        .map(|(p, &w)| HPoint4::from_weighted(*p, w).weighted_part())
        .collect();
    let channel: Vec<Point3> = weights.iter().map(|&w| Point3::new(w, 0.0, 0.0)).collect();
    let spatial = evaluator.approximate(&weighted, params, degree, 0.0, &every)?;
    let weight_curve = evaluator.approximate(&channel, params, degree, 0.0, &every)?;
    if spatial.knots != weight_curve.knots || spatial.degree != weight_curve.degree {
        return Err(ConstructionError::SingularSystem(
            "weight channel was fitted on a different knot vector".to_string(),
        )
        .into());
    }

    let mut homogeneous = Vec::with_capacity(spatial.control_point_count());
    for (p, w) in spatial.control_points.iter().zip(&weight_curve.control_points) {
        if !w.x.is_finite() || w.x <= 0.0 {
            return Err(ConstructionError::NonPositiveWeight { weight: w.x }.into());
        }
        homogeneous.push(HPoint4::new(p.x, p.y, p.z, w.x));
    }
    Ok(NurbsCurve3::from_homogeneous(
        spatial.degree,
        &homogeneous,
        spatial.knots,
        true,
    )?)
}

#[cfg(feature = "parallel")]
pub(crate) fn interpolate_columns<E: GeometryEvaluator + ?Sized>(
    columns: &[Column],
    params: &[f64],
    degree: usize,
    evaluator: &E,
) -> Result<Vec<NurbsCurve3>, GeomError> {
    columns
        .par_iter()
        .map(|column| interpolate_column(column, params, degree, evaluator))
        .collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn interpolate_columns<E: GeometryEvaluator + ?Sized>(
    columns: &[Column],
    params: &[f64],
    degree: usize,
    evaluator: &E,
) -> Result<Vec<NurbsCurve3>, GeomError> {
    columns
        .iter()
        .map(|column| interpolate_column(column, params, degree, evaluator))
        .collect()
}

/// Cross parameters must be one per member, finite and strictly increasing.
pub(crate) fn check_cross_params(params: &[f64], expected: usize) -> Result<(), ValidationError> {
    if params.len() != expected {
        return Err(ValidationError::LengthMismatch {
            what: "cross parameters",
            expected,
            provided: params.len(),
        });
    }
    if params.iter().any(|p| !p.is_finite()) {
        return Err(ValidationError::NonFinite("cross parameters"));
    }
    if params.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ValidationError::NotIncreasing("cross parameters"));
    }
    Ok(())
}

fn check_compatible(curves: &[NurbsCurve3], tol: Tolerance) -> Result<(), ValidationError> {
    let first = &curves[0];
    for (idx, curve) in curves.iter().enumerate().skip(1) {
        if curve.degree != first.degree
            || curve.control_point_count() != first.control_point_count()
            || !tol.approx_eq_slice(&curve.knots, &first.knots)
        {
            return Err(ValidationError::IncompatibleFamily(format!(
                "member {idx} has degree {} with {} knots, member 0 has degree {} with {} knots",
                curve.degree,
                curve.knots.len(),
                first.degree,
                first.knots.len()
            )));
        }
    }
    Ok(())
}

/// Skin a compatible family.
///
/// The result runs along the family in u (degree and knots of the members)
/// and across it in v, with v degree `min(degree, curves.len() - 1)`.
pub fn skin_curves<E: GeometryEvaluator + ?Sized>(
    curves: &[NurbsCurve3],
    params: &[f64],
    degree: usize,
    evaluator: &E,
    tol: Tolerance,
) -> Result<NurbsSurface, GeomError> {
    if curves.len() < 2 {
        return Err(ConstructionError::TooFewCurves {
            context: "skinning",
            required: 2,
            provided: curves.len(),
        }
        .into());
    }
    if degree == 0 {
        return Err(ValidationError::ZeroDegree.into());
    }
    check_cross_params(params, curves.len())?;
    check_compatible(curves, tol)?;

    let cross_degree = degree.min(curves.len() - 1);
    let rational = curves.iter().any(NurbsCurve3::is_rational);
    let count = curves[0].control_point_count();
    let columns: Vec<Column> = (0..count)
        .map(|k| Column {
            points: curves.iter().map(|c| c.control_points[k]).collect(),
            weights: rational.then(|| curves.iter().map(|c| c.weight(k)).collect()),
        })
        .collect();

    let fitted = interpolate_columns(&columns, params, cross_degree, evaluator)?;
    let fitted = unify_curves(&fitted, tol)?;
    log::debug!(
        "skinned {} curves: {} columns, cross degree {cross_degree}, {} cross knots",
        curves.len(),
        fitted.len(),
        fitted[0].knots.len()
    );

    let first = &curves[0];
    Ok(NurbsSurface::from_direction_curves(
        UvDirection::V,
        &fitted,
        first.degree,
        first.knots.clone(),
    )?)
}
