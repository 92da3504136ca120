//! Model export
//!
//! Converts the fitted forest into a portable serialized graph: a
//! binary ONNX `ModelProto` whose single node is an `ai.onnx.ml`
//! `TreeEnsembleClassifier`.

mod onnx;
pub mod protobuf;

pub use onnx::{OnnxConfig, OnnxExporter, TreeEnsemble};
