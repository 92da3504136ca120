//! Iris training pipeline
//!
//! Trains a random-forest classifier on the bundled Iris dataset and
//! exports the fitted model as a binary ONNX file.
//!
//! # Modules
//!
//! - [`dataset`] - Bundled Iris dataset
//! - [`split`] - Deterministic train/test splitting
//! - [`training`] - Decision tree, random forest, accuracy metric
//! - [`export`] - Binary ONNX serialization of the fitted forest
//! - [`pipeline`] - The end-to-end load/split/fit/evaluate/export run

pub mod error;

pub mod dataset;
pub mod split;
pub mod training;
pub mod export;
pub mod pipeline;

pub use error::{Result, TrainError};
