//! Knot-vector utilities: span search, multiplicity bookkeeping and the
//! construction of interpolation/approximation knot vectors.

use super::core::Tolerance;

/// Locate the knot span `i` with `knots[i] <= u < knots[i + 1]`.
///
/// `n` is the index of the last control point and `p` the degree. Parameters
/// at or past the end of the domain map to the last non-empty span `n`, and
/// parameters at or before the start map to `p`, so the result is always a
/// valid span index. O(log n).
#[must_use]
pub fn find_span(n: usize, p: usize, u: f64, knots: &[f64]) -> usize {
    if u >= knots[n + 1] {
        // Walk back over trailing repeated knots so the span is non-empty.
        let mut span = n;
        while span > p && knots[span] >= knots[n + 1] {
            span -= 1;
        }
        return span;
    }
    if u <= knots[p] {
        return p;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

#[must_use]
pub fn is_non_decreasing(knots: &[f64]) -> bool {
    knots.windows(2).all(|w| w[0] <= w[1])
}

/// Whether the first and last knot are each repeated `degree + 1` times.
#[must_use]
pub fn is_clamped(knots: &[f64], degree: usize, tol: Tolerance) -> bool {
    if knots.len() < 2 * (degree + 1) {
        return false;
    }
    let first = knots[0];
    let last = knots[knots.len() - 1];
    knots[..=degree].iter().all(|k| tol.approx_eq_f64(*k, first))
        && knots[knots.len() - degree - 1..]
            .iter()
            .all(|k| tol.approx_eq_f64(*k, last))
}

/// Distinct knot values with their multiplicities, in ascending order.
#[must_use]
pub fn multiplicities(knots: &[f64], tol: Tolerance) -> Vec<(f64, usize)> {
    KnotTable::from_knots(knots, tol).entries().to_vec()
}

/// Tolerance-bucketed multiset of knot values.
///
/// Values within `tol` of an existing entry are counted against that entry
/// and take its representative value, so knots that drifted apart by rounding
/// never turn into two separate, nearly coincident knots.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotTable {
    tol: Tolerance,
    entries: Vec<(f64, usize)>,
}

impl KnotTable {
    #[must_use]
    pub fn new(tol: Tolerance) -> Self {
        Self {
            tol,
            entries: Vec::new(),
        }
    }

    /// All knots of a knot vector, including the end knots.
    #[must_use]
    pub fn from_knots(knots: &[f64], tol: Tolerance) -> Self {
        let mut table = Self::new(tol);
        for &k in knots {
            table.add(k, 1);
        }
        table
    }

    /// Only the knots strictly inside the domain `(knots[p], knots[len - p - 1])`.
    #[must_use]
    pub fn interior(knots: &[f64], degree: usize, tol: Tolerance) -> Self {
        let mut table = Self::new(tol);
        if knots.len() < 2 * (degree + 1) {
            return table;
        }
        let start = knots[degree];
        let end = knots[knots.len() - degree - 1];
        for &k in &knots[degree + 1..knots.len() - degree - 1] {
            if !tol.approx_eq_f64(k, start) && !tol.approx_eq_f64(k, end) {
                table.add(k, 1);
            }
        }
        table
    }

    #[must_use]
    pub fn entries(&self) -> &[(f64, usize)] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, value: f64) -> Result<usize, usize> {
        let idx = self
            .entries
            .partition_point(|(v, _)| *v < value - self.tol.eps);
        match self.entries.get(idx) {
            Some((v, _)) if self.tol.approx_eq_f64(*v, value) => Ok(idx),
            _ => Err(idx),
        }
    }

    /// The stored value `value` snaps to, if it falls in an existing bucket.
    #[must_use]
    pub fn representative(&self, value: f64) -> Option<f64> {
        self.position(value).ok().map(|idx| self.entries[idx].0)
    }

    #[must_use]
    pub fn count(&self, value: f64) -> usize {
        self.position(value).map_or(0, |idx| self.entries[idx].1)
    }

    pub fn add(&mut self, value: f64, count: usize) {
        match self.position(value) {
            Ok(idx) => self.entries[idx].1 += count,
            Err(idx) => self.entries.insert(idx, (value, count)),
        }
    }

    /// Raise the multiplicity of `value` to at least `count`.
    pub fn raise_to(&mut self, value: f64, count: usize) {
        match self.position(value) {
            Ok(idx) => self.entries[idx].1 = self.entries[idx].1.max(count),
            Err(idx) => self.entries.insert(idx, (value, count)),
        }
    }

    /// Per-value maximum of the two multisets.
    pub fn merge_max(&mut self, other: &Self) {
        for &(value, count) in &other.entries {
            self.raise_to(value, count);
        }
    }

    /// Knot values that must be inserted into `knots` so that every entry of
    /// this table reaches its multiplicity. Values snap to the buckets already
    /// present in `knots`.
    #[must_use]
    pub fn deficit_against(&self, knots: &[f64]) -> Vec<f64> {
        let existing = Self::from_knots(knots, self.tol);
        let mut missing = Vec::new();
        for &(value, target) in &self.entries {
            let have = existing.count(value);
            let value = existing.representative(value).unwrap_or(value);
            for _ in have..target {
                missing.push(value);
            }
        }
        missing
    }
}

/// Filter and sort candidate insertion knots.
///
/// Candidates are sorted, snapped to existing tolerance buckets, restricted to
/// the curve domain, and admitted only while the running multiplicity of their
/// bucket stays below `degree`. Excess candidates are dropped silently: callers
/// request merged multiplicities and this truncates them to the legal maximum.
#[must_use]
pub fn sanitize_insertions(
    knots: &[f64],
    degree: usize,
    candidates: &[f64],
    tol: Tolerance,
) -> Vec<f64> {
    if knots.len() < 2 * (degree + 1) {
        return Vec::new();
    }
    let start = knots[degree];
    let end = knots[knots.len() - degree - 1];

    let mut sorted: Vec<f64> = candidates
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v >= start - tol.eps && *v <= end + tol.eps)
        .collect();
    sorted.sort_by(f64::total_cmp);

    let mut table = KnotTable::from_knots(knots, tol);
    let mut admitted = Vec::with_capacity(sorted.len());
    for candidate in sorted {
        let value = table
            .representative(candidate)
            .unwrap_or(candidate)
            .clamp(start, end);
        if table.count(value) < degree {
            table.add(value, 1);
            admitted.push(value);
        } else {
            log::trace!("dropping knot {value}: multiplicity already at degree {degree}");
        }
    }
    admitted
}

/// Affine map of a knot vector onto `[start, end]`.
#[must_use]
pub fn remap_knots(knots: &[f64], start: f64, end: f64) -> Vec<f64> {
    let (Some(&a), Some(&b)) = (knots.first(), knots.last()) else {
        return Vec::new();
    };
    let span = b - a;
    if span == 0.0 {
        return knots.to_vec();
    }
    let scale = (end - start) / span;
    let mut out: Vec<f64> = knots.iter().map(|k| start + (k - a) * scale).collect();
    // Pin the ends exactly so repeated end knots stay bitwise identical.
    for k in &mut out {
        if *k <= start {
            *k = start;
        }
        if *k >= end {
            *k = end;
        }
    }
    out
}

/// Computes a clamped knot vector using the averaging method.
///
/// For a degree-p B-spline interpolating n points with parameters t_0 ... t_{n-1},
/// the interior knots are computed as:
///   u_{j+p} = (t_j + t_{j+1} + ... + t_{j+p-1}) / p  for j = 1, ..., n-p-1
#[must_use]
pub fn averaging_knot_vector(params: &[f64], degree: usize) -> Vec<f64> {
    let n = params.len();
    let p = degree;
    let (start, end) = match (params.first(), params.last()) {
        (Some(&a), Some(&b)) => (a, b),
        _ => (0.0, 1.0),
    };

    let mut knots = Vec::with_capacity(n + p + 1);
    knots.extend(std::iter::repeat_n(start, p + 1));

    let interior_count = if n > p + 1 { n - p - 1 } else { 0 };
    for j in 1..=interior_count {
        let sum: f64 = params[j..j + p].iter().sum();
        knots.push(sum / p as f64);
    }

    knots.extend(std::iter::repeat_n(end, p + 1));
    knots
}

/// Clamped knot vector for least-squares approximation of `params.len()` samples
/// with `control_count` control points. Every knot span receives at least one
/// sample, which keeps the normal equations non-singular.
#[must_use]
pub fn approximation_knot_vector(params: &[f64], degree: usize, control_count: usize) -> Vec<f64> {
    let p = degree;
    let n = control_count - 1;
    let m = params.len() - 1;
    let start = params[0];
    let end = params[m];

    let mut knots = Vec::with_capacity(control_count + p + 1);
    knots.extend(std::iter::repeat_n(start, p + 1));

    let d = (m + 1) as f64 / (n - p + 1) as f64;
    for j in 1..=(n - p) {
        let jd = j as f64 * d;
        let i = jd.floor() as usize;
        let alpha = jd - i as f64;
        let lo = params[i.saturating_sub(1)];
        let hi = params[i.min(m)];
        knots.push((1.0 - alpha) * lo + alpha * hi);
    }

    knots.extend(std::iter::repeat_n(end, p + 1));
    knots
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBIC_KNOTS: [f64; 11] = [0.0, 0.0, 0.0, 0.0, 0.25, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0];

    #[test]
    fn find_span_locates_interval() {
        let n = CUBIC_KNOTS.len() - 3 - 2;
        assert_eq!(find_span(n, 3, 0.0, &CUBIC_KNOTS), 3);
        assert_eq!(find_span(n, 3, 0.1, &CUBIC_KNOTS), 3);
        assert_eq!(find_span(n, 3, 0.25, &CUBIC_KNOTS), 4);
        assert_eq!(find_span(n, 3, 0.4, &CUBIC_KNOTS), 4);
        assert_eq!(find_span(n, 3, 0.5, &CUBIC_KNOTS), 6);
        assert_eq!(find_span(n, 3, 0.9, &CUBIC_KNOTS), 6);
    }

    #[test]
    fn find_span_clamps_past_the_end() {
        let n = CUBIC_KNOTS.len() - 3 - 2;
        assert_eq!(find_span(n, 3, 1.0, &CUBIC_KNOTS), n);
        assert_eq!(find_span(n, 3, 7.0, &CUBIC_KNOTS), n);
        assert_eq!(find_span(n, 3, -1.0, &CUBIC_KNOTS), 3);
    }

    #[test]
    fn clamped_detection() {
        assert!(is_clamped(&CUBIC_KNOTS, 3, Tolerance::KNOT));
        assert!(!is_clamped(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 2, Tolerance::KNOT));
    }

    #[test]
    fn multiplicities_group_by_tolerance() {
        let knots = [0.0, 0.0, 0.5, 0.5 + 1e-12, 1.0, 1.0];
        let mult = multiplicities(&knots, Tolerance::KNOT);
        assert_eq!(mult, vec![(0.0, 2), (0.5, 2), (1.0, 2)]);
    }

    #[test]
    fn interior_table_skips_end_knots() {
        let table = KnotTable::interior(&CUBIC_KNOTS, 3, Tolerance::KNOT);
        assert_eq!(table.entries(), &[(0.25, 1), (0.5, 2)]);
    }

    #[test]
    fn merge_takes_max_multiplicity() {
        let mut a = KnotTable::new(Tolerance::KNOT);
        a.add(0.25, 1);
        a.add(0.5, 2);
        let mut b = KnotTable::new(Tolerance::KNOT);
        b.add(0.5, 1);
        b.add(0.75, 3);
        a.merge_max(&b);
        assert_eq!(a.entries(), &[(0.25, 1), (0.5, 2), (0.75, 3)]);
    }

    #[test]
    fn deficit_lists_missing_copies() {
        let mut target = KnotTable::new(Tolerance::KNOT);
        target.add(0.25, 2);
        target.add(0.5, 2);
        target.add(0.75, 1);
        let missing = target.deficit_against(&CUBIC_KNOTS);
        assert_eq!(missing, vec![0.25, 0.75]);
    }

    #[test]
    fn sanitize_truncates_to_degree() {
        let admitted = sanitize_insertions(
            &CUBIC_KNOTS,
            3,
            &[0.5, 0.5, 0.5, 0.25, 0.25, 0.25, 0.7, 2.0, f64::NAN],
            Tolerance::KNOT,
        );
        // 0.5 has multiplicity 2 -> one more admitted, 0.25 has 1 -> two more.
        assert_eq!(admitted, vec![0.25, 0.25, 0.5, 0.7]);
    }

    #[test]
    fn sanitize_snaps_to_existing_bucket() {
        let admitted = sanitize_insertions(&CUBIC_KNOTS, 3, &[0.25 + 1e-12], Tolerance::KNOT);
        assert_eq!(admitted, vec![0.25]);
    }

    #[test]
    fn sanitize_rejects_clamped_end_knots() {
        let admitted = sanitize_insertions(&CUBIC_KNOTS, 3, &[0.0, 1.0], Tolerance::KNOT);
        assert!(admitted.is_empty());
    }

    #[test]
    fn remap_pins_end_knots() {
        let knots = remap_knots(&[2.0, 2.0, 3.0, 4.0, 4.0], 0.0, 1.0);
        assert_eq!(knots, vec![0.0, 0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn averaging_knots_have_expected_length() {
        let params = [0.0, 0.2, 0.5, 0.8, 1.0];
        let knots = averaging_knot_vector(&params, 3);
        assert_eq!(knots.len(), params.len() + 3 + 1);
        assert!((knots[4] - (0.2 + 0.5 + 0.8) / 3.0).abs() < 1e-15);
        assert!(is_clamped(&knots, 3, Tolerance::KNOT));
    }

    #[test]
    fn approximation_knots_are_clamped_and_monotone() {
        let params: Vec<f64> = (0..=20).map(|i| f64::from(i) / 20.0).collect();
        let knots = approximation_knot_vector(&params, 3, 8);
        assert_eq!(knots.len(), 8 + 3 + 1);
        assert!(is_non_decreasing(&knots));
        assert!(is_clamped(&knots, 3, Tolerance::KNOT));
    }
}
