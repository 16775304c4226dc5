//! Search bins over simulated parameter values.
//!
//! Each unique simulated value owns one bin whose edges sit halfway to its
//! neighbours. The outermost edges are infinite, so the bins of an axis
//! cover the whole real line without overlap.

/// Half-open interval `[lo, hi)` generated by one simulated value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub value: f64,
    pub lo: f64,
    pub hi: f64,
}

impl Bin {
    pub fn contains(&self, x: f64) -> bool {
        self.lo <= x && x < self.hi
    }
}

/// Bins of one axis, ordered by generating value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisBins {
    bins: Vec<Bin>,
}

impl AxisBins {
    /// Bins around the sorted unique values of `values`; NaN is ignored
    pub fn from_values(values: &[f64]) -> Self {
        let mut unique: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        unique.sort_by(f64::total_cmp);
        unique.dedup();

        let edges: Vec<f64> = unique.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        let bins = unique
            .iter()
            .enumerate()
            .map(|(i, &value)| Bin {
                value,
                lo: if i == 0 { f64::NEG_INFINITY } else { edges[i - 1] },
                hi: edges.get(i).copied().unwrap_or(f64::INFINITY),
            })
            .collect();

        Self { bins }
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bin> {
        self.bins.iter()
    }

    /// Index of the bin containing `x`
    pub fn locate(&self, x: f64) -> Option<usize> {
        self.bins.iter().position(|bin| bin.contains(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_are_midpoints() {
        let bins = AxisBins::from_values(&[8.0, 2.0, 20.0, 8.0]);
        let edges: Vec<(f64, f64, f64)> = bins.iter().map(|b| (b.value, b.lo, b.hi)).collect();
        assert_eq!(
            edges,
            vec![
                (2.0, f64::NEG_INFINITY, 5.0),
                (8.0, 5.0, 14.0),
                (20.0, 14.0, f64::INFINITY)
            ]
        );
    }

    #[test]
    fn test_values_lie_inside_their_own_bin() {
        let values = [-2.3, -1.3, -0.3, 0.0, 0.7];
        let bins = AxisBins::from_values(&values);
        for (i, bin) in bins.iter().enumerate() {
            assert!(bin.lo < bin.value && bin.value < bin.hi);
            assert_eq!(bins.locate(values[i]), Some(i));
        }
    }

    #[test]
    fn test_bins_are_contiguous() {
        let bins = AxisBins::from_values(&[1.0, 2.0, 4.0, 8.0]);
        for pair in bins.bins().windows(2) {
            assert_eq!(pair[0].hi, pair[1].lo);
        }
        assert_eq!(bins.bins()[0].lo, f64::NEG_INFINITY);
        assert_eq!(bins.bins()[3].hi, f64::INFINITY);
    }

    #[test]
    fn test_edge_belongs_to_upper_bin() {
        let bins = AxisBins::from_values(&[2.0, 8.0]);
        assert_eq!(bins.locate(5.0), Some(1));
        assert_eq!(bins.locate(4.999), Some(0));
    }

    #[test]
    fn test_single_value_spans_everything() {
        let bins = AxisBins::from_values(&[8.0, 8.0]);
        assert_eq!(bins.len(), 1);
        assert!(bins.bins()[0].contains(-1e300));
        assert!(bins.bins()[0].contains(1e300));
    }

    #[test]
    fn test_nan_values_ignored() {
        let bins = AxisBins::from_values(&[f64::NAN, 1.0]);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins.locate(f64::NAN), None);
        assert!(AxisBins::from_values(&[]).is_empty());
    }
}
