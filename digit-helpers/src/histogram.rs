use crate::Float;

/// Equal-width histogram of a set of values.
///
/// Bins are half-open `[lo, hi)` except the last one, which also counts values
/// equal to the upper edge. When every value is identical the range is widened
/// to `[v - 0.5, v + 0.5]` so the values land in the middle bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram<F: Float> {
    /// `bins + 1` ascending bin edges.
    pub edges: Vec<F>,
    pub counts: Vec<usize>,
}

impl<F: Float> Histogram<F> {
    /// Bins `values` into `bins` buckets. Non-finite values are skipped.
    ///
    /// Returns `None` if there are no finite values or `bins` is zero.
    pub fn new(values: &[F], bins: usize) -> Option<Self> {
        let finite: Vec<F> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return None;
        }

        let mut lo = finite.iter().copied().fold(F::infinity(), F::min);
        let mut hi = finite.iter().copied().fold(F::neg_infinity(), F::max);
        if lo == hi {
            let half = F::cast(0.5)?;
            lo = lo - half;
            hi = hi + half;
        }

        let n = F::from_usize(bins)?;
        let width = (hi - lo) / n;
        let edges: Vec<F> = (0..=bins)
            .map(|i| F::from_usize(i).map(|i| lo + width * i))
            .collect::<Option<_>>()?;

        let mut counts = vec![0; bins];
        for v in finite {
            let bin = ((v - lo) / width).floor().to_usize().unwrap_or(0);
            counts[bin.min(bins - 1)] += 1;
        }

        Some(Self { edges, counts })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Largest bin count, used to scale a chart.
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Lower and upper edge of bin `i`.
    pub fn bin_range(&self, i: usize) -> Option<(F, F)> {
        Some((*self.edges.get(i)?, *self.edges.get(i + 1)?))
    }
}
