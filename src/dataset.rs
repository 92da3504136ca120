//! Bundled Iris dataset
//!
//! The classic Fisher dataset ships with the crate as a CSV asset: 150
//! samples, 4 measurements each, 3 species classes. Loading never
//! touches the filesystem.

use crate::error::{Result, TrainError};
use ndarray::{Array1, Array2};

const IRIS_CSV: &str = include_str!("../data/iris.csv");

/// Number of samples in the bundled dataset
pub const N_SAMPLES: usize = 150;
/// Number of feature columns
pub const N_FEATURES: usize = 4;
/// Number of species classes
pub const N_CLASSES: usize = 3;

/// Species names, indexed by integer label
pub const TARGET_NAMES: [&str; N_CLASSES] = ["setosa", "versicolor", "virginica"];

/// In-memory tabular dataset: a feature matrix plus one integer label
/// per row and the label-to-name mapping.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Feature matrix, rows = samples
    pub features: Array2<f64>,
    /// Integer class label per row, stored as f64 for the model API
    pub labels: Array1<f64>,
    /// Column names, from the CSV header
    pub feature_names: Vec<String>,
}

impl Dataset {
    /// Load the bundled Iris dataset
    pub fn load() -> Result<Self> {
        let dataset = parse_csv(IRIS_CSV)?;

        if dataset.n_samples() != N_SAMPLES || dataset.n_features() != N_FEATURES {
            return Err(TrainError::ShapeMismatch {
                expected: format!("{} x {}", N_SAMPLES, N_FEATURES),
                actual: format!("{} x {}", dataset.n_samples(), dataset.n_features()),
            });
        }

        Ok(dataset)
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Human-readable class name for an integer label
    pub fn class_name(label: usize) -> Option<&'static str> {
        TARGET_NAMES.get(label).copied()
    }
}

fn parse_csv(text: &str) -> Result<Dataset> {
    let mut lines = text.lines();

    let header = lines
        .next()
        .ok_or_else(|| TrainError::Data("empty dataset".to_string()))?;
    let columns: Vec<&str> = header.split(',').collect();
    if columns.len() < 2 {
        return Err(TrainError::Data(format!(
            "expected features and a label column, got header '{}'",
            header
        )));
    }
    let n_features = columns.len() - 1;
    let feature_names: Vec<String> = columns[..n_features]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows: Vec<f64> = Vec::new();
    let mut labels: Vec<f64> = Vec::new();

    for (line_no, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != n_features + 1 {
            return Err(TrainError::Data(format!(
                "row {}: expected {} fields, got {}",
                line_no + 2,
                n_features + 1,
                fields.len()
            )));
        }

        for field in &fields[..n_features] {
            let value: f64 = field.parse().map_err(|_| {
                TrainError::Data(format!("row {}: invalid value '{}'", line_no + 2, field))
            })?;
            rows.push(value);
        }

        let label: usize = fields[n_features].parse().map_err(|_| {
            TrainError::Data(format!(
                "row {}: invalid label '{}'",
                line_no + 2,
                fields[n_features]
            ))
        })?;
        if label >= N_CLASSES {
            return Err(TrainError::Data(format!(
                "row {}: label {} out of range (expected 0..{})",
                line_no + 2,
                label,
                N_CLASSES
            )));
        }
        labels.push(label as f64);
    }

    let n_samples = labels.len();
    let features = Array2::from_shape_vec((n_samples, n_features), rows)
        .map_err(|e| TrainError::Data(e.to_string()))?;

    Ok(Dataset {
        features,
        labels: Array1::from_vec(labels),
        feature_names,
    })
}
