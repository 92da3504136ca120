//! End-to-end training pipeline
//!
//! One strictly sequential procedure: load the bundled dataset, split
//! it, fit the forest, score the held-out rows, export the model to
//! ONNX, and assemble the console report.

use crate::dataset::Dataset;
use crate::error::{Result, TrainError};
use crate::export::OnnxExporter;
use crate::split::train_test_split;
use crate::training::{accuracy, RandomForest};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Fixed pipeline constants, matching the reference training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Held-out fraction of the dataset
    pub test_fraction: f64,
    /// Seed for the split and the forest
    pub seed: u64,
    /// Number of trees in the ensemble
    pub n_estimators: usize,
    /// Where the serialized model is written
    pub output_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.3,
            seed: 42,
            n_estimators: 100,
            output_path: PathBuf::from("models/iris_classifier_v1.onnx"),
        }
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Held-out accuracy in [0, 1]
    pub accuracy: f64,
    pub n_train: usize,
    pub n_test: usize,
    /// Feature values of the sample row (first test row)
    pub sample_features: Vec<f64>,
    pub predicted_label: usize,
    pub predicted_class: String,
    pub actual_label: usize,
    pub actual_class: String,
    /// Size of the written ONNX artifact in bytes
    pub model_bytes: usize,
    /// Path the artifact was written to
    pub output_path: PathBuf,
}

impl PipelineReport {
    /// Print the report to stdout
    pub fn print(&self) {
        println!("Model Accuracy: {:.2}%", self.accuracy * 100.0);
        println!();
        println!("Model saved to {}", self.output_path.display());
        println!();
        println!("--- Example Prediction ---");
        println!("Input features: {:?}", self.sample_features);
        println!(
            "Predicted class: {} ({})",
            self.predicted_label, self.predicted_class
        );
        println!("Actual class: {} ({})", self.actual_label, self.actual_class);
    }
}

/// Run the full pipeline: load, split, fit, evaluate, export, report
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    info!("loading iris dataset");
    let dataset = Dataset::load()?;
    info!(
        n_samples = dataset.n_samples(),
        n_features = dataset.n_features(),
        "dataset loaded"
    );

    let split = train_test_split(
        &dataset.features,
        &dataset.labels,
        config.test_fraction,
        config.seed,
    )?;
    info!(
        n_train = split.n_train(),
        n_test = split.n_test(),
        seed = config.seed,
        "split dataset"
    );

    info!(n_estimators = config.n_estimators, "training random forest");
    let start = Instant::now();
    let mut forest = RandomForest::new(config.n_estimators).with_random_state(config.seed);
    forest.fit(&split.x_train, &split.y_train)?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "training finished");

    let y_pred = forest.predict(&split.x_test)?;
    let test_accuracy = accuracy(&split.y_test, &y_pred)?;
    info!(accuracy = test_accuracy, "evaluated held-out split");

    // The serialized graph's input shape is inferred from one
    // representative row
    let sample = split.x_test.row(0);
    let exporter = OnnxExporter::new();
    let bytes = exporter.to_bytes(&forest, sample.len())?;
    std::fs::write(&config.output_path, &bytes)?;
    info!(
        path = %config.output_path.display(),
        bytes = bytes.len(),
        "wrote onnx model"
    );

    let predicted_label = y_pred[0].round() as usize;
    let actual_label = split.y_test[0].round() as usize;
    let predicted_class = Dataset::class_name(predicted_label)
        .ok_or_else(|| TrainError::Data(format!("predicted label {} has no name", predicted_label)))?;
    let actual_class = Dataset::class_name(actual_label)
        .ok_or_else(|| TrainError::Data(format!("actual label {} has no name", actual_label)))?;

    Ok(PipelineReport {
        accuracy: test_accuracy,
        n_train: split.n_train(),
        n_test: split.n_test(),
        sample_features: sample.to_vec(),
        predicted_label,
        predicted_class: predicted_class.to_string(),
        actual_label,
        actual_class: actual_class.to_string(),
        model_bytes: bytes.len(),
        output_path: config.output_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.test_fraction, 0.3);
        assert_eq!(config.seed, 42);
        assert_eq!(config.n_estimators, 100);
        assert_eq!(
            config.output_path,
            PathBuf::from("models/iris_classifier_v1.onnx")
        );
    }
}
