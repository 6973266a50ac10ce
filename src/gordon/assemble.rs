//! Final Gordon combination `G = Su + Sv - T`.

use crate::geom::{ConstructionError, GeomError, HPoint4, NurbsSurface, Tolerance, unify_surfaces};

fn describe(surface: &NurbsSurface) -> String {
    format!(
        "degrees ({}, {}), grid {}x{}",
        surface.degree_u, surface.degree_v, surface.u_count, surface.v_count
    )
}

fn require_same_grid(a: &NurbsSurface, b: &NurbsSurface, tol: Tolerance) -> Result<(), ConstructionError> {
    let same = a.degree_u == b.degree_u
        && a.degree_v == b.degree_v
        && a.u_count == b.u_count
        && a.v_count == b.v_count
        && tol.approx_eq_slice(&a.knots_u, &b.knots_u)
        && tol.approx_eq_slice(&a.knots_v, &b.knots_v);
    if same {
        Ok(())
    } else {
        Err(ConstructionError::IncompatibleSurfaces(format!(
            "{} vs {}",
            describe(a),
            describe(b)
        )))
    }
}

/// Combine three compatible surfaces control point by control point.
///
/// The sum runs on homogeneous points, so polynomial inputs give the plain
/// `Su + Sv - T` grid. A combined weight that is not positive aborts the
/// assembly.
pub fn assemble_gordon(
    su: &NurbsSurface,
    sv: &NurbsSurface,
    t: &NurbsSurface,
    tol: Tolerance,
) -> Result<NurbsSurface, GeomError> {
    require_same_grid(su, sv, tol)?;
    require_same_grid(su, t, tol)?;

    let rational = su.is_rational() || sv.is_rational() || t.is_rational();
    let (a, b, c) = (su.homogeneous_points(), sv.homogeneous_points(), t.homogeneous_points());
    let mut combined: Vec<HPoint4> = Vec::with_capacity(a.len());
    for ((pa, pb), pc) in a.iter().zip(&b).zip(&c) {
        let point = *pa + *pb - *pc;
        if rational && (!point.w.is_finite() || point.w <= 0.0) {
            return Err(ConstructionError::NonPositiveWeight { weight: point.w }.into());
        }
        combined.push(point);
    }

    Ok(NurbsSurface::from_homogeneous(
        su.degree_u,
        su.degree_v,
        su.u_count,
        su.v_count,
        &combined,
        su.knots_u.clone(),
        su.knots_v.clone(),
        rational,
    )?)
}

/// Unify the three surfaces, then combine them.
pub fn assemble_unified(
    su: &NurbsSurface,
    sv: &NurbsSurface,
    t: &NurbsSurface,
    tol: Tolerance,
) -> Result<NurbsSurface, GeomError> {
    let unified = unify_surfaces(&[su.clone(), sv.clone(), t.clone()], tol)?;
    assemble_gordon(&unified[0], &unified[1], &unified[2], tol)
}
