//! Model training module
//!
//! Classification-only tree induction for the pipeline: a CART
//! decision tree, the bootstrap-aggregated random forest built on top
//! of it, and the accuracy metric used for evaluation.

pub mod decision_tree;
pub mod metrics;
pub mod random_forest;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use metrics::accuracy;
pub use random_forest::{MaxFeatures, RandomForest};
