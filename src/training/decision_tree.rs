//! Decision tree implementation

use crate::error::{Result, TrainError};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the class-probability distribution of the
    /// training samples that reached it
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node routing samples by `feature <= threshold` (left)
    /// or `feature > threshold` (right)
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Information entropy
    Entropy,
}

/// Classification decision tree (CART)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for per-split feature subsampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Number of classes
    n_classes: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
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

    /// Set the number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set seed for feature subsampling
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data with labels in `0..n_classes`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, n_classes: usize) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(TrainError::ShapeMismatch {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        if n_samples < self.min_samples_split {
            return Err(TrainError::InvalidParameter {
                name: "min_samples_split".to_string(),
                value: self.min_samples_split.to_string(),
                reason: format!("only {} samples available", n_samples),
            });
        }

        if n_classes == 0 {
            return Err(TrainError::InvalidParameter {
                name: "n_classes".to_string(),
                value: "0".to_string(),
                reason: "need at least one class".to_string(),
            });
        }

        for &label in y.iter() {
            let class = label.round();
            if class < 0.0 || class as usize >= n_classes {
                return Err(TrainError::Data(format!(
                    "label {} out of range (expected 0..{})",
                    label, n_classes
                )));
            }
        }

        self.n_features = n_features;
        self.n_classes = n_classes;

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut rng, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.map_or(false, |d| depth >= d)
            || Self::is_pure(&counts);

        if should_stop {
            return Self::leaf(&counts, n_samples);
        }

        if let Some((best_feature, best_threshold, best_gain)) =
            self.find_best_split(x, y, indices, &counts, rng)
        {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, best_feature]] <= best_threshold);

            if left_indices.len() < self.min_samples_leaf
                || right_indices.len() < self.min_samples_leaf
            {
                return Self::leaf(&counts, n_samples);
            }

            importances[best_feature] += n_samples as f64 * best_gain;

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng, importances));
            let right =
                Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng, importances));

            TreeNode::Split {
                feature_idx: best_feature,
                threshold: best_threshold,
                left,
                right,
                n_samples,
            }
        } else {
            Self::leaf(&counts, n_samples)
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        parent_counts: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();
        let parent_impurity = self.impurity(parent_counts, n);

        let candidate_features = self.sample_features(rng);

        let mut best: Option<(usize, f64, f64)> = None;

        for feature_idx in candidate_features {
            let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature_idx]]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();

            for window in values.windows(2) {
                let threshold = (window[0] + window[1]) / 2.0;

                let mut left_counts = vec![0usize; self.n_classes];
                let mut right_counts = vec![0usize; self.n_classes];
                let mut left_total = 0usize;

                for &idx in indices {
                    let class = y[idx].round() as usize;
                    if x[[idx, feature_idx]] <= threshold {
                        left_counts[class] += 1;
                        left_total += 1;
                    } else {
                        right_counts[class] += 1;
                    }
                }
                let right_total = n - left_total;

                if left_total < self.min_samples_leaf || right_total < self.min_samples_leaf {
                    continue;
                }

                let weighted_impurity = (left_total as f64 * self.impurity(&left_counts, left_total)
                    + right_total as f64 * self.impurity(&right_counts, right_total))
                    / n as f64;

                let gain = parent_impurity - weighted_impurity;
                if gain > 0.0 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, threshold, gain));
                }
            }
        }

        best
    }

    /// Pick the feature subset scanned at one split
    fn sample_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        if let Some(k) = self.max_features {
            if k < self.n_features {
                features.shuffle(rng);
                features.truncate(k.max(1));
                features.sort_unstable();
            }
        }
        features
    }

    fn class_counts(&self, y: &Array1<f64>, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[y[i].round() as usize] += 1;
        }
        counts
    }

    fn impurity(&self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self.criterion {
            Criterion::Gini => {
                let sum_sq: f64 = counts.iter().map(|&c| (c as f64 / n).powi(2)).sum();
                1.0 - sum_sq
            }
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }

    fn is_pure(counts: &[usize]) -> bool {
        counts.iter().filter(|&&c| c > 0).count() <= 1
    }

    fn leaf(counts: &[usize], n_samples: usize) -> TreeNode {
        let total: f64 = counts.iter().sum::<usize>() as f64;
        let distribution = counts.iter().map(|&c| c as f64 / total).collect();
        TreeNode::Leaf {
            distribution,
            n_samples,
        }
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;

        let predictions: Vec<f64> = (0..proba.nrows())
            .map(|i| argmax(&proba.row(i).to_vec()) as f64)
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Predict class probabilities, one row per sample
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(TrainError::ModelNotFitted)?;

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for i in 0..x.nrows() {
            let sample = x.row(i);
            let distribution = Self::leaf_distribution(root, &sample.to_vec());
            for (j, &p) in distribution.iter().enumerate() {
                proba[[i, j]] = p;
            }
        }

        Ok(proba)
    }

    fn leaf_distribution<'a>(node: &'a TreeNode, sample: &[f64]) -> &'a [f64] {
        match node {
            TreeNode::Leaf { distribution, .. } => distribution,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::leaf_distribution(left, sample)
                } else {
                    Self::leaf_distribution(right, sample)
                }
            }
        }
    }

    /// Tree root, available after fitting
    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Number of classes seen at fit time
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    /// Get number of leaves
    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        self.root.as_ref().map_or(0, count)
    }
}

/// Index of the largest value, ties broken toward the lower index
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_simple() {
        let x = array![[0.0, 0.0], [0.1, 0.0], [1.0, 1.0], [1.1, 1.0],];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0],];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y, 2).unwrap();

        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_leaf_distribution_sums_to_one() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        for i in 0..proba.nrows() {
            let row_sum: f64 = proba.row(i).sum();
            assert!((row_sum - 1.0).abs() < 1e-9, "row {} sum: {}", i, row_sum);
        }
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0],];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        let importances = tree.feature_importances().unwrap();
        // Second feature is constant, all signal is in the first
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 5.0];

        let mut tree = DecisionTree::new();
        assert!(tree.fit(&x, &y, 2).is_err());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let tree = DecisionTree::new();
        let x = array![[0.0]];
        assert!(matches!(
            tree.predict(&x),
            Err(TrainError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_argmax_tie_breaks_low() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.5, 0.4]), 1);
    }
}
