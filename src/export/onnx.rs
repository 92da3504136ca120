//! Binary ONNX export of the fitted forest
//!
//! The forest is flattened into the parallel attribute arrays the
//! `ai.onnx.ml` `TreeEnsembleClassifier` operator expects, then
//! serialized as a `ModelProto` with the [`super::protobuf`] writer.
//! Field numbers follow the public `onnx.proto` schema.

use super::protobuf::ProtoWriter;
use crate::error::{Result, TrainError};
use crate::training::{RandomForest, TreeNode};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// TensorProto.DataType
const ELEM_FLOAT: i64 = 1;
const ELEM_INT64: i64 = 7;

// AttributeProto.AttributeType
const ATTR_STRING: i64 = 3;
const ATTR_FLOATS: i64 = 6;
const ATTR_INTS: i64 = 7;
const ATTR_STRINGS: i64 = 8;

/// ONNX export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnnxConfig {
    /// IR version of the emitted model
    pub ir_version: i64,
    /// Default-domain opset version
    pub opset_version: i64,
    /// `ai.onnx.ml` opset version
    pub ml_opset_version: i64,
    /// Producer name
    pub producer_name: String,
    /// Producer version
    pub producer_version: String,
    /// Model description
    pub doc_string: String,
}

impl Default for OnnxConfig {
    fn default() -> Self {
        Self {
            ir_version: 8,
            opset_version: 15,
            ml_opset_version: 1,
            producer_name: "iris-trainer".to_string(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
            doc_string: String::new(),
        }
    }
}

/// A forest flattened into `TreeEnsembleClassifier` attribute arrays.
///
/// Node ids are assigned in preorder per tree. Split nodes use the
/// `BRANCH_LEQ` mode, so the true branch is the tree's left child;
/// each leaf contributes one weighted entry per class, scaled by
/// `1 / n_trees` so that summing over trees yields the forest's mean
/// class probability.
#[derive(Debug, Clone, Default)]
pub struct TreeEnsemble {
    pub n_classes: usize,
    pub nodes_treeids: Vec<i64>,
    pub nodes_nodeids: Vec<i64>,
    pub nodes_featureids: Vec<i64>,
    pub nodes_modes: Vec<String>,
    pub nodes_values: Vec<f32>,
    pub nodes_truenodeids: Vec<i64>,
    pub nodes_falsenodeids: Vec<i64>,
    pub class_treeids: Vec<i64>,
    pub class_nodeids: Vec<i64>,
    pub class_ids: Vec<i64>,
    pub class_weights: Vec<f32>,
}

impl TreeEnsemble {
    /// Flatten a fitted forest
    pub fn from_forest(forest: &RandomForest) -> Result<Self> {
        if forest.n_trees() == 0 {
            return Err(TrainError::ModelNotFitted);
        }

        let mut ensemble = TreeEnsemble {
            n_classes: forest.n_classes(),
            ..Default::default()
        };

        let scale = 1.0 / forest.n_trees() as f64;
        for (tree_id, tree) in forest.trees().iter().enumerate() {
            let root = tree.root().ok_or(TrainError::ModelNotFitted)?;
            let mut next_id = 0i64;
            ensemble.flatten(root, tree_id as i64, &mut next_id, scale);
        }

        Ok(ensemble)
    }

    /// Total number of flattened nodes
    pub fn n_nodes(&self) -> usize {
        self.nodes_treeids.len()
    }

    fn flatten(&mut self, node: &TreeNode, tree_id: i64, next_id: &mut i64, scale: f64) -> i64 {
        let node_id = *next_id;
        *next_id += 1;

        match node {
            TreeNode::Leaf { distribution, .. } => {
                self.push_node(tree_id, node_id, 0, "LEAF", 0.0);
                for (class, &weight) in distribution.iter().enumerate() {
                    self.class_treeids.push(tree_id);
                    self.class_nodeids.push(node_id);
                    self.class_ids.push(class as i64);
                    self.class_weights.push((weight * scale) as f32);
                }
            }
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                self.push_node(
                    tree_id,
                    node_id,
                    *feature_idx as i64,
                    "BRANCH_LEQ",
                    *threshold as f32,
                );
                let row = self.n_nodes() - 1;
                let left_id = self.flatten(left, tree_id, next_id, scale);
                let right_id = self.flatten(right, tree_id, next_id, scale);
                self.nodes_truenodeids[row] = left_id;
                self.nodes_falsenodeids[row] = right_id;
            }
        }

        node_id
    }

    fn push_node(&mut self, tree_id: i64, node_id: i64, feature_id: i64, mode: &str, value: f32) {
        self.nodes_treeids.push(tree_id);
        self.nodes_nodeids.push(node_id);
        self.nodes_featureids.push(feature_id);
        self.nodes_modes.push(mode.to_string());
        self.nodes_values.push(value);
        self.nodes_truenodeids.push(0);
        self.nodes_falsenodeids.push(0);
    }
}

/// ONNX model exporter
#[derive(Debug, Default)]
pub struct OnnxExporter {
    config: OnnxConfig,
}

impl OnnxExporter {
    /// Create new exporter with default config
    pub fn new() -> Self {
        Self {
            config: OnnxConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(config: OnnxConfig) -> Self {
        Self { config }
    }

    /// Serialize the forest as binary ONNX bytes.
    ///
    /// `n_features` fixes the width of the graph's input tensor and is
    /// inferred by the caller from a representative input row.
    pub fn to_bytes(&self, forest: &RandomForest, n_features: usize) -> Result<Vec<u8>> {
        if n_features == 0 {
            return Err(TrainError::InvalidParameter {
                name: "n_features".to_string(),
                value: "0".to_string(),
                reason: "input tensor needs at least one column".to_string(),
            });
        }

        let ensemble = TreeEnsemble::from_forest(forest)?;
        let n_classes = ensemble.n_classes;
        let class_labels: Vec<i64> = (0..n_classes as i64).collect();

        // NodeProto
        let mut node = ProtoWriter::new();
        node.string(1, "float_input");
        node.string(2, "label");
        node.string(2, "probabilities");
        node.string(3, "tree_ensemble");
        node.string(4, "TreeEnsembleClassifier");
        node.message(5, ints_attribute("class_ids", &ensemble.class_ids));
        node.message(5, ints_attribute("class_nodeids", &ensemble.class_nodeids));
        node.message(5, ints_attribute("class_treeids", &ensemble.class_treeids));
        node.message(5, floats_attribute("class_weights", &ensemble.class_weights));
        node.message(5, ints_attribute("classlabels_int64s", &class_labels));
        node.message(
            5,
            ints_attribute("nodes_falsenodeids", &ensemble.nodes_falsenodeids),
        );
        node.message(
            5,
            ints_attribute("nodes_featureids", &ensemble.nodes_featureids),
        );
        node.message(5, strings_attribute("nodes_modes", &ensemble.nodes_modes));
        node.message(5, ints_attribute("nodes_nodeids", &ensemble.nodes_nodeids));
        node.message(5, ints_attribute("nodes_treeids", &ensemble.nodes_treeids));
        node.message(
            5,
            ints_attribute("nodes_truenodeids", &ensemble.nodes_truenodeids),
        );
        node.message(5, floats_attribute("nodes_values", &ensemble.nodes_values));
        node.message(5, string_attribute("post_transform", "NONE"));
        node.string(7, "ai.onnx.ml");

        // GraphProto
        let mut graph = ProtoWriter::new();
        graph.message(1, node);
        graph.string(2, "iris_random_forest");
        graph.message(
            11,
            tensor_value_info(
                "float_input",
                ELEM_FLOAT,
                &[Dim::Param("N"), Dim::Value(n_features as i64)],
            ),
        );
        graph.message(12, tensor_value_info("label", ELEM_INT64, &[Dim::Param("N")]));
        graph.message(
            12,
            tensor_value_info(
                "probabilities",
                ELEM_FLOAT,
                &[Dim::Param("N"), Dim::Value(n_classes as i64)],
            ),
        );

        // ModelProto
        let mut model = ProtoWriter::new();
        model.int64(1, self.config.ir_version);
        model.string(2, &self.config.producer_name);
        model.string(3, &self.config.producer_version);
        model.int64(5, 1);
        if !self.config.doc_string.is_empty() {
            model.string(6, &self.config.doc_string);
        }
        model.message(7, graph);

        let mut default_opset = ProtoWriter::new();
        default_opset.int64(2, self.config.opset_version);
        model.message(8, default_opset);

        let mut ml_opset = ProtoWriter::new();
        ml_opset.string(1, "ai.onnx.ml");
        ml_opset.int64(2, self.config.ml_opset_version);
        model.message(8, ml_opset);

        Ok(model.into_bytes())
    }

    /// Serialize the forest and write it to `path`.
    ///
    /// A missing parent directory surfaces as the underlying I/O
    /// error.
    pub fn save(&self, forest: &RandomForest, n_features: usize, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes(forest, n_features)?;
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }
}

/// Dimension of a tensor shape: named (dynamic) or fixed
enum Dim {
    Param(&'static str),
    Value(i64),
}

fn tensor_value_info(name: &str, elem_type: i64, dims: &[Dim]) -> ProtoWriter {
    let mut shape = ProtoWriter::new();
    for dim in dims {
        let mut d = ProtoWriter::new();
        match dim {
            Dim::Value(v) => d.int64(1, *v),
            Dim::Param(p) => d.string(2, p),
        }
        shape.message(1, d);
    }

    let mut tensor_type = ProtoWriter::new();
    tensor_type.int64(1, elem_type);
    tensor_type.message(2, shape);

    let mut type_proto = ProtoWriter::new();
    type_proto.message(1, tensor_type);

    let mut value_info = ProtoWriter::new();
    value_info.string(1, name);
    value_info.message(2, type_proto);
    value_info
}

fn ints_attribute(name: &str, values: &[i64]) -> ProtoWriter {
    let mut attr = ProtoWriter::new();
    attr.string(1, name);
    attr.packed_int64s(8, values);
    attr.int64(20, ATTR_INTS);
    attr
}

fn floats_attribute(name: &str, values: &[f32]) -> ProtoWriter {
    let mut attr = ProtoWriter::new();
    attr.string(1, name);
    attr.packed_floats(7, values);
    attr.int64(20, ATTR_FLOATS);
    attr
}

fn string_attribute(name: &str, value: &str) -> ProtoWriter {
    let mut attr = ProtoWriter::new();
    attr.string(1, name);
    attr.bytes(4, value.as_bytes());
    attr.int64(20, ATTR_STRING);
    attr
}

fn strings_attribute(name: &str, values: &[String]) -> ProtoWriter {
    let mut attr = ProtoWriter::new();
    attr.string(1, name);
    for value in values {
        attr.bytes(9, value.as_bytes());
    }
    attr.int64(20, ATTR_STRINGS);
    attr
}
