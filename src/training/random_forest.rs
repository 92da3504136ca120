//! Random Forest implementation

use super::decision_tree::{argmax, Criterion, DecisionTree};
use crate::error::{Result, TrainError};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Strategy for the number of features scanned per split
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

/// Random forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features per split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Base seed; tree `i` derives its own seed from it
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Number of classes
    n_classes: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(TrainError::ShapeMismatch {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        if n_samples == 0 {
            return Err(TrainError::Data("cannot fit on empty data".to_string()));
        }

        if self.n_estimators == 0 {
            return Err(TrainError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "need at least one tree".to_string(),
            });
        }

        let mut max_label = 0.0f64;
        for &label in y.iter() {
            if label.round() < 0.0 {
                return Err(TrainError::Data(format!("negative label {}", label)));
            }
            max_label = max_label.max(label.round());
        }

        self.n_features = n_features;
        self.n_classes = max_label as usize + 1;
        let max_features = self.compute_max_features(n_features);

        let base_seed = self.random_state.unwrap_or(42);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for tree_idx in 0..self.n_estimators {
            let seed = base_seed.wrapping_add(tree_idx as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let sample_indices: Vec<usize> = if self.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let x_boot = x.select(Axis(0), &sample_indices);
            let y_boot: Array1<f64> =
                Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

            let mut tree = DecisionTree::new()
                .with_min_samples_split(self.min_samples_split)
                .with_min_samples_leaf(self.min_samples_leaf)
                .with_max_features(max_features)
                .with_criterion(self.criterion)
                .with_random_state(seed);

            if let Some(d) = self.max_depth {
                tree = tree.with_max_depth(d);
            }

            tree.fit(&x_boot, &y_boot, self.n_classes)?;
            trees.push(tree);
        }

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (i, &val) in imp.iter().enumerate() {
                    total[i] += val;
                }
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Predict class labels by majority vote across trees
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(TrainError::ModelNotFitted);
        }

        let n_samples = x.nrows();
        let mut votes = Array2::<f64>::zeros((n_samples, self.n_classes));

        for tree in &self.trees {
            let predictions = tree.predict(x)?;
            for (i, &p) in predictions.iter().enumerate() {
                votes[[i, p.round() as usize]] += 1.0;
            }
        }

        // Ties break toward the lower class id, keeping predictions
        // deterministic for a fixed seed
        let labels: Vec<f64> = (0..n_samples)
            .map(|i| argmax(&votes.row(i).to_vec()) as f64)
            .collect();

        Ok(Array1::from_vec(labels))
    }

    /// Predict class probabilities as the mean of the trees' leaf
    /// distributions
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(TrainError::ModelNotFitted);
        }

        let mut proba = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        for tree in &self.trees {
            proba = proba + tree.predict_proba(x)?;
        }
        proba /= self.trees.len() as f64;

        Ok(proba)
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Fitted trees, for export
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of classes seen at fit time
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of features seen at fit time
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blob_data() -> (Array2<f64>, Array1<f64>) {
        (
            array![
                [0.0, 0.0],
                [0.1, 0.1],
                [0.2, 0.2],
                [1.0, 1.0],
                [1.1, 1.1],
                [1.2, 1.2],
            ],
            array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        )
    }

    #[test]
    fn test_classifier() {
        let (x, y) = two_blob_data();

        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;

        assert!(accuracy >= 0.8, "accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let (x, y) = two_blob_data();

        let mut a = RandomForest::new(10).with_random_state(7);
        let mut b = RandomForest::new(10).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_predict_proba() {
        let (x, y) = two_blob_data();

        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.nrows(), x.nrows());
        assert_eq!(proba.ncols(), 2);

        for i in 0..proba.nrows() {
            let row_sum: f64 = proba.row(i).sum();
            assert!((row_sum - 1.0).abs() < 1e-6, "row {} sum: {}", i, row_sum);
        }
    }

    #[test]
    fn test_feature_importances_normalized() {
        let (x, y) = two_blob_data();

        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_estimators_rejected() {
        let (x, y) = two_blob_data();
        let mut rf = RandomForest::new(0);
        assert!(rf.fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let rf = RandomForest::new(10);
        let x = array![[0.0, 0.0]];
        assert!(matches!(rf.predict(&x), Err(TrainError::ModelNotFitted)));
    }
}
