//! Positive / nonnegative spatial adjacency index.
//!
//! For each sample, the sorted ascending list of sample indices within the
//! positive radius and within the negative radius. Built once from the UTM
//! positions, read-only afterwards; sortedness is what makes the O(log n)
//! membership test in the batch assembler valid.

/// Membership test over a sorted ascending slice.
pub fn in_sorted_array(value: usize, sorted: &[usize]) -> bool {
    sorted.binary_search(&value).is_ok()
}

#[derive(Debug, Clone)]
pub struct PairIndex {
    /// `positives[i]`: indices within `positive_threshold` of sample `i`,
    /// sorted ascending, duplicate-free, including `i` itself.
    positives: Vec<Vec<usize>>,
    /// `nonnegatives[i]`: indices within `negative_threshold` of sample `i`.
    /// Negatives are the complement of this set.
    nonnegatives: Vec<Vec<usize>>,
}

impl PairIndex {
    /// Build the index from per-sample UTM positions and the two radii.
    ///
    /// Quadratic in the number of samples; runs once at construction. Both
    /// lists come out sorted because candidate indices are scanned in order.
    pub fn build(positions: &[[f64; 2]], positive_threshold: f64, negative_threshold: f64) -> Self {
        let pos_sq = positive_threshold * positive_threshold;
        let neg_sq = negative_threshold * negative_threshold;
        let mut positives = Vec::with_capacity(positions.len());
        let mut nonnegatives = Vec::with_capacity(positions.len());
        for a in positions {
            let mut pos_row = Vec::new();
            let mut nn_row = Vec::new();
            for (j, b) in positions.iter().enumerate() {
                let dn = a[0] - b[0];
                let de = a[1] - b[1];
                let dist_sq = dn * dn + de * de;
                if dist_sq <= pos_sq {
                    pos_row.push(j);
                }
                if dist_sq <= neg_sq {
                    nn_row.push(j);
                }
            }
            positives.push(pos_row);
            nonnegatives.push(nn_row);
        }
        Self {
            positives,
            nonnegatives,
        }
    }

    /// Construct from precomputed lists. Rows must be sorted ascending and
    /// duplicate-free; violating this silently breaks pair-mask correctness.
    pub fn from_lists(positives: Vec<Vec<usize>>, nonnegatives: Vec<Vec<usize>>) -> Self {
        debug_assert!(positives.iter().all(|r| r.windows(2).all(|w| w[0] < w[1])));
        debug_assert!(nonnegatives.iter().all(|r| r.windows(2).all(|w| w[0] < w[1])));
        Self {
            positives,
            nonnegatives,
        }
    }

    pub fn len(&self) -> usize {
        self.positives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positives.is_empty()
    }

    pub fn is_positive(&self, i: usize, j: usize) -> bool {
        in_sorted_array(j, &self.positives[i])
    }

    pub fn is_nonnegative(&self, i: usize, j: usize) -> bool {
        in_sorted_array(j, &self.nonnegatives[i])
    }

    pub fn positives_of(&self, i: usize) -> &[usize] {
        &self.positives[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_membership() {
        let sorted = [1, 3, 5, 9];
        assert!(in_sorted_array(3, &sorted));
        assert!(!in_sorted_array(4, &sorted));
        assert!(!in_sorted_array(0, &[]));
    }

    #[test]
    fn build_thresholds_and_band() {
        // Colinear points 0, 8, 30 meters from the origin.
        let positions = [[0.0, 0.0], [8.0, 0.0], [30.0, 0.0]];
        let index = PairIndex::build(&positions, 10.0, 25.0);

        // 8 m apart: positive both ways.
        assert!(index.is_positive(0, 1));
        assert!(index.is_positive(1, 0));
        // 22 m apart: in the band, neither positive nor negative.
        assert!(!index.is_positive(1, 2));
        assert!(index.is_nonnegative(1, 2));
        // 30 m apart: a true negative.
        assert!(!index.is_nonnegative(0, 2));
        // Self-membership at zero distance.
        assert!(index.is_positive(2, 2));
        assert!(index.is_nonnegative(2, 2));
    }

    #[test]
    fn build_rows_sorted_ascending() {
        let positions: Vec<[f64; 2]> = (0..20).map(|i| [i as f64 * 3.0, 0.0]).collect();
        let index = PairIndex::build(&positions, 7.0, 13.0);
        for i in 0..index.len() {
            let row = index.positives_of(i);
            assert!(row.windows(2).all(|w| w[0] < w[1]), "row {i} not sorted");
        }
    }
}
