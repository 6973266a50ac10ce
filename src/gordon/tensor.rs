//! Tensor-product interpolation of a point grid.
//!
//! Produces the correction surface `T` of the Gordon formula: the surface
//! through every crossing point, at the sanitized placements of both families.

use crate::geom::{
    ConstructionError, GeomError, GeometryEvaluator, NurbsSurface, Point3, Tolerance, UvDirection, ValidationError,
    unify_curves,
};

use super::skinning::{Column, check_cross_params, interpolate_columns};

/// Interpolate `grid[r][c]` at `(row_params[r], column_params[c])`.
///
/// Rows run along u and columns along v. Degrees are clamped to one less
/// than the point count in each direction.
pub fn tensor_product_surface<E: GeometryEvaluator + ?Sized>(
    grid: &[Vec<Point3>],
    row_params: &[f64],
    column_params: &[f64],
    degree_u: usize,
    degree_v: usize,
    evaluator: &E,
    tol: Tolerance,
) -> Result<NurbsSurface, GeomError> {
    let rows = grid.len();
    let cols = grid.first().map_or(0, Vec::len);
    if rows < 2 || cols < 2 {
        return Err(ConstructionError::TooFewCurves {
            context: "tensor-product grid",
            required: 2,
            provided: rows.min(cols),
        }
        .into());
    }
    if degree_u == 0 || degree_v == 0 {
        return Err(ValidationError::ZeroDegree.into());
    }
    if let Some(row) = grid.iter().find(|row| row.len() != cols) {
        return Err(ValidationError::LengthMismatch {
            what: "grid row",
            expected: cols,
            provided: row.len(),
        }
        .into());
    }
    check_cross_params(row_params, rows)?;
    check_cross_params(column_params, cols)?;

    let q_u = degree_u.min(rows - 1);
    let q_v = degree_v.min(cols - 1);

    // First pass: one u-curve per grid column.
    let columns: Vec<Column> = (0..cols)
        .map(|c| Column {
            points: grid.iter().map(|row| row[c]).collect(),
            weights: None,
        })
        .collect();
    let along_u = unify_curves(&interpolate_columns(&columns, row_params, q_u, evaluator)?, tol)?;

    // Second pass: across the first family, one v-curve per u control index.
    let u_count = along_u[0].control_point_count();
    let columns: Vec<Column> = (0..u_count)
        .map(|k| Column {
            points: along_u.iter().map(|curve| curve.control_points[k]).collect(),
            weights: None,
        })
        .collect();
    let along_v = unify_curves(&interpolate_columns(&columns, column_params, q_v, evaluator)?, tol)?;

    log::debug!("tensor-product grid {rows}x{cols}: degrees ({q_u}, {q_v})");
    Ok(NurbsSurface::from_direction_curves(
        UvDirection::V,
        &along_v,
        q_u,
        along_u[0].knots.clone(),
    )?)
}
