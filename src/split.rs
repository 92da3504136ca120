//! Deterministic train/test splitting

use crate::error::{Result, TrainError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Disjoint train/test partitions of a dataset
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

impl TrainTestSplit {
    /// Number of training rows
    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    /// Number of held-out rows
    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }
}

/// Partition rows into train and test subsets.
///
/// Indices are shuffled with a seeded `ChaCha8Rng`, so the same seed
/// and fraction always yield the same partition. The test set gets the
/// first `round(n * test_fraction)` shuffled rows, the training set the
/// rest; the partitions are disjoint and cover the whole dataset.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = x.nrows();
    if n != y.len() {
        return Err(TrainError::ShapeMismatch {
            expected: format!("y length = {}", n),
            actual: format!("y length = {}", y.len()),
        });
    }

    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let n_test = (n as f64 * test_fraction).round() as usize;
    if n_test == 0 || n_test >= n {
        return Err(TrainError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: format!("leaves a degenerate partition for {} samples", n),
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_indices, train_indices) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), train_indices),
        x_test: x.select(Axis(0), test_indices),
        y_train: Array1::from_vec(train_indices.iter().map(|&i| y[i]).collect()),
        y_test: Array1::from_vec(test_indices.iter().map(|&i| y[i]).collect()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    #[test]
    fn test_partition_sizes() {
        let dataset = Dataset::load().unwrap();
        let split = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();

        assert_eq!(split.n_test(), 45);
        assert_eq!(split.n_train(), 105);
        assert_eq!(split.n_train() + split.n_test(), dataset.n_samples());
    }

    #[test]
    fn test_partitions_disjoint_and_exhaustive() {
        let dataset = Dataset::load().unwrap();
        let split = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();

        // Rows in the bundled dataset are not unique, so compare label
        // multisets instead of row identity: per-class counts across the
        // two partitions must add up to the full dataset counts.
        let mut counts = [0usize; 3];
        for &label in split.y_train.iter().chain(split.y_test.iter()) {
            counts[label as usize] += 1;
        }
        assert_eq!(counts, [50, 50, 50]);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let dataset = Dataset::load().unwrap();
        let a = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();
        let b = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();

        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.x_test, b.x_test);
        assert_eq!(a.y_train, b.y_train);
    }

    #[test]
    fn test_different_seed_shuffles_differently() {
        let dataset = Dataset::load().unwrap();
        let a = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();
        let b = train_test_split(&dataset.features, &dataset.labels, 0.3, 43).unwrap();

        assert_ne!(a.x_test, b.x_test);
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let dataset = Dataset::load().unwrap();
        for fraction in [0.0, 1.0, -0.3, 1.5] {
            let result = train_test_split(&dataset.features, &dataset.labels, fraction, 42);
            assert!(result.is_err(), "fraction {} should be rejected", fraction);
        }
    }

    #[test]
    fn test_rejects_degenerate_partition() {
        use ndarray::array;
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 0.0];
        // round(3 * 0.01) = 0 test rows
        assert!(train_test_split(&x, &y, 0.01, 42).is_err());
    }
}
