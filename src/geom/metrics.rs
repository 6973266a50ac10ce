//! Opt-in timing hooks for the Gordon pipeline.
//!
//! Timing is only collected when the `metrics` feature is enabled and the
//! target is not `wasm32` (no `std::time::Instant` there). Otherwise every
//! call compiles down to running the closure.
//!
//! ```ignore
//! let mut metrics = GordonMetrics::default();
//! metrics.begin();
//! let grid = metrics.time(TimingBucket::Intersection, || intersect_network(..));
//! if let Some(report) = metrics.end() {
//!     println!("intersection: {} ns", report.get(TimingBucket::Intersection));
//! }
//! ```

use serde::Serialize;

/// Pipeline stages that accumulate time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Reparameterization, clamping and orientation of the input curves.
    Normalize,
    /// Per-family curve unification.
    CurveUnify,
    /// Network intersection and placement sanitizing.
    Intersection,
    /// Both skinning surfaces.
    Skinning,
    /// Tensor-product correction surface.
    TensorProduct,
    /// Three-way surface unification.
    SurfaceUnify,
    /// Final `Su + Sv - T` combination.
    Assembly,
}

impl TimingBucket {
    pub const ALL: [Self; 7] = [
        Self::Normalize,
        Self::CurveUnify,
        Self::Intersection,
        Self::Skinning,
        Self::TensorProduct,
        Self::SurfaceUnify,
        Self::Assembly,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normalize => "normalize",
            Self::CurveUnify => "curve_unify",
            Self::Intersection => "intersection",
            Self::Skinning => "skinning",
            Self::TensorProduct => "tensor_product",
            Self::SurfaceUnify => "surface_unify",
            Self::Assembly => "assembly",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Cumulative nanoseconds per bucket.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct GordonTimingReport {
    buckets_ns: [u64; 7],
}

impl GordonTimingReport {
    #[must_use]
    pub fn get(&self, bucket: TimingBucket) -> u64 {
        self.buckets_ns[bucket.index()]
    }

    pub fn add(&mut self, bucket: TimingBucket, nanos: u64) {
        let slot = &mut self.buckets_ns[bucket.index()];
        *slot = slot.saturating_add(nanos);
    }

    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.buckets_ns.iter().fold(0u64, |acc, ns| acc.saturating_add(*ns))
    }

    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }

    /// `(bucket name, nanoseconds)` pairs in pipeline order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, u64)> {
        TimingBucket::ALL
            .iter()
            .map(|bucket| (bucket.name(), self.get(*bucket)))
            .collect()
    }
}

/// Timing accumulator; a zero-sized no-op unless metrics are enabled.
#[derive(Debug, Default)]
pub struct GordonMetrics {
    #[cfg(all(feature = "metrics", not(target_arch = "wasm32")))]
    report: GordonTimingReport,
}

impl GordonMetrics {
    pub fn begin(&mut self) {
        #[cfg(all(feature = "metrics", not(target_arch = "wasm32")))]
        {
            self.report = GordonTimingReport::default();
        }
    }

    /// The accumulated report, or `None` when metrics are disabled.
    #[must_use]
    pub fn end(&self) -> Option<GordonTimingReport> {
        #[cfg(all(feature = "metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            let nanos = start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
            self.report.add(bucket, nanos);
            result
        }

        #[cfg(not(all(feature = "metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }
}
