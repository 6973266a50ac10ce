//! Diagnostics collected while assembling a Gordon surface.
//!
//! None of these affect the result; they record what the pipeline had to
//! correct on the way (reversed or reordered input curves, placement
//! adjustments) and how well the network actually intersected.

use std::fmt;

use serde::Serialize;

use crate::geom::GordonTimingReport;

/// Summary of one [`build_gordon_surface`](super::build_gordon_surface) run.
///
/// Placement naming follows the surface parameters: `u_placements[j]` is the
/// u value at which v-curve `j` sits, `v_placements[i]` the v value at which
/// u-curve `i` sits.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GordonDiagnostics {
    pub u_curves_reversed: usize,
    pub v_curves_reversed: usize,

    /// Curves whose position in the family changed when sorting by placement.
    pub u_curves_reordered: usize,
    pub v_curves_reordered: usize,

    /// Averaged crossing parameters before sanitizing, in sorted order.
    pub raw_u_placements: Vec<f64>,
    pub raw_v_placements: Vec<f64>,

    /// Interpolation parameters actually used.
    pub u_placements: Vec<f64>,
    pub v_placements: Vec<f64>,

    /// Largest closest-approach distance over all crossings.
    pub max_intersection_gap: f64,

    /// Placements moved by the sanitizer, both families together.
    pub spacing_adjustments: usize,

    pub warnings: Vec<String>,

    /// Stage timings; only present with the `metrics` feature.
    pub timing: Option<GordonTimingReport>,
}

impl GordonDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// No curve was flipped or moved and no placement needed adjusting.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.u_curves_reversed == 0
            && self.v_curves_reversed == 0
            && self.u_curves_reordered == 0
            && self.v_curves_reordered == 0
            && self.spacing_adjustments == 0
            && self.warnings.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// One-line form for log output.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "{}x{} curves, gap {:.2e}",
            self.v_placements.len(),
            self.u_placements.len(),
            self.max_intersection_gap
        )];
        let reversed = self.u_curves_reversed + self.v_curves_reversed;
        if reversed > 0 {
            parts.push(format!("reversed:{reversed}"));
        }
        let reordered = self.u_curves_reordered + self.v_curves_reordered;
        if reordered > 0 {
            parts.push(format!("reordered:{reordered}"));
        }
        if self.spacing_adjustments > 0 {
            parts.push(format!("spacing:{}", self.spacing_adjustments));
        }
        if !self.warnings.is_empty() {
            parts.push(format!("warnings:{}", self.warnings.len()));
        }
        parts.join(" ")
    }
}

impl fmt::Display for GordonDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gordon diagnostics:")?;
        writeln!(f, "  u-curves: {} at v = {:?}", self.v_placements.len(), self.v_placements)?;
        writeln!(f, "  v-curves: {} at u = {:?}", self.u_placements.len(), self.u_placements)?;
        writeln!(f, "  Max intersection gap: {:e}", self.max_intersection_gap)?;

        if self.u_curves_reversed + self.v_curves_reversed > 0 {
            writeln!(
                f,
                "  Reversed: {} u-curves, {} v-curves",
                self.u_curves_reversed, self.v_curves_reversed
            )?;
        }
        if self.u_curves_reordered + self.v_curves_reordered > 0 {
            writeln!(
                f,
                "  Reordered: {} u-curves, {} v-curves",
                self.u_curves_reordered, self.v_curves_reordered
            )?;
        }
        if self.spacing_adjustments > 0 {
            writeln!(f, "  Placements adjusted: {}", self.spacing_adjustments)?;
        }
        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {warning}")?;
            }
        }
        if let Some(timing) = &self.timing {
            writeln!(f, "  Timing: {:.3} ms total", timing.total_ms())?;
            for (name, ns) in timing.entries() {
                writeln!(f, "    {name}: {ns} ns")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_clean() {
        let diag = GordonDiagnostics::default();
        assert!(diag.is_clean());
        assert!(!diag.has_warnings());
    }

    #[test]
    fn test_corrections_are_not_clean() {
        let diag = GordonDiagnostics {
            u_curves_reversed: 1,
            spacing_adjustments: 2,
            ..Default::default()
        };
        assert!(!diag.is_clean());
        let summary = diag.summary();
        assert!(summary.contains("reversed:1"));
        assert!(summary.contains("spacing:2"));
    }

    #[test]
    fn test_warnings_show_in_display() {
        let mut diag = GordonDiagnostics::new();
        diag.add_warning("placements fell back to a uniform spread");
        assert!(diag.has_warnings());
        let text = diag.to_string();
        assert!(text.contains("Warnings:"));
        assert!(text.contains("uniform spread"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let diag = GordonDiagnostics {
            max_intersection_gap: 1e-9,
            ..Default::default()
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["maxIntersectionGap"], 1e-9);
        assert!(json["timing"].is_null());
    }
}
