//! Load-balance metrics derived from a [`super::Pattern`], computed on demand rather than cached
//! — an "external sidecar" with no transport dependency, useful for tests and tuning.

use fixedbitset::FixedBitSet;

use super::Pattern;

#[derive(Clone, Debug, PartialEq)]
pub struct PatternMetrics {
    pub min_local_size: usize,
    pub max_local_size: usize,
    pub balanced_units: usize,
    pub imbalanced_units: usize,
    /// `max_local_size / min_local_size` as a float; `1.0` if every unit is balanced or the
    /// pattern has zero units (the latter cannot happen in practice, guarded against here only
    /// to keep this a total function).
    pub imbalance_factor: f64,
    /// Bit `u` set iff unit `u` holds `max_local_size` elements. Cheaper for a tuning pass to
    /// scan than re-deriving per-unit sizes from the pattern.
    pub balanced_mask: FixedBitSet,
}

impl PatternMetrics {
    pub(crate) fn compute<const R: usize>(pattern: &Pattern<R>) -> Self {
        let sizes: Vec<usize> = (0..pattern.nunits()).map(|u| pattern.local_size(u)).collect();
        let min_local_size = sizes.iter().copied().min().unwrap_or(0);
        let max_local_size = sizes.iter().copied().max().unwrap_or(0);
        let mut balanced_mask = FixedBitSet::with_capacity(sizes.len());
        for (u, &size) in sizes.iter().enumerate() {
            balanced_mask.set(u, size == max_local_size);
        }
        let balanced_units = balanced_mask.count_ones(..);
        let imbalanced_units = sizes.len() - balanced_units;
        let imbalance_factor = if min_local_size == 0 {
            if max_local_size == 0 {
                1.0
            } else {
                f64::INFINITY
            }
        } else {
            max_local_size as f64 / min_local_size as f64
        };
        PatternMetrics {
            min_local_size,
            max_local_size,
            balanced_units,
            imbalanced_units,
            imbalance_factor,
            balanced_mask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Distribution;
    use super::*;

    #[test]
    fn evenly_blocked_pattern_has_no_imbalance() {
        let pattern = Pattern::<1>::new([8], [Distribution::Blocked], [2], 2);
        let metrics = pattern.metrics();
        assert_eq!(metrics.min_local_size, 4);
        assert_eq!(metrics.max_local_size, 4);
        assert_eq!(metrics.imbalance_factor, 1.0);
        assert_eq!(metrics.balanced_units, 2);
    }

    #[test]
    fn non_divisible_tile_is_imbalanced() {
        let pattern = Pattern::<1>::new([10], [Distribution::Tile(4)], [2], 2);
        let metrics = pattern.metrics();
        assert_eq!(metrics.min_local_size, 4);
        assert_eq!(metrics.max_local_size, 6);
        assert_eq!(metrics.imbalanced_units, 1);
    }
}
