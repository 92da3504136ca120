//! Evaluation metrics

use crate::error::{Result, TrainError};
use ndarray::Array1;

/// Fraction of predictions matching the ground truth, in [0, 1]
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(TrainError::ShapeMismatch {
            expected: format!("y_pred length = {}", y_true.len()),
            actual: format!("y_pred length = {}", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(TrainError::Data(
            "cannot compute accuracy on empty labels".to_string(),
        ));
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();

    Ok(correct as f64 / y_true.len() as f64)
}
