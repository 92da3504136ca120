//! Integration test: ONNX export of a forest trained on the bundled
//! dataset

use iris_trainer::dataset::Dataset;
use iris_trainer::export::{OnnxConfig, OnnxExporter, TreeEnsemble};
use iris_trainer::split::train_test_split;
use iris_trainer::training::RandomForest;

fn iris_forest(n_estimators: usize) -> RandomForest {
    let dataset = Dataset::load().unwrap();
    let split = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();
    let mut forest = RandomForest::new(n_estimators).with_random_state(42);
    forest.fit(&split.x_train, &split.y_train).unwrap();
    forest
}

#[test]
fn test_ensemble_covers_all_trees_and_classes() {
    let forest = iris_forest(10);
    let ensemble = TreeEnsemble::from_forest(&forest).unwrap();

    assert_eq!(ensemble.n_classes, 3);

    for tree_id in 0..10i64 {
        assert!(
            ensemble.nodes_treeids.contains(&tree_id),
            "tree {} missing from flattened nodes",
            tree_id
        );
    }

    // Every class id appears in the leaf weight table
    for class in 0..3i64 {
        assert!(ensemble.class_ids.contains(&class));
    }
}

#[test]
fn test_ensemble_node_ids_are_preorder_per_tree() {
    let forest = iris_forest(5);
    let ensemble = TreeEnsemble::from_forest(&forest).unwrap();

    let mut expected_next: Vec<i64> = vec![0; 5];
    for i in 0..ensemble.n_nodes() {
        let tree = ensemble.nodes_treeids[i] as usize;
        assert_eq!(ensemble.nodes_nodeids[i], expected_next[tree]);
        expected_next[tree] += 1;
    }
}

#[test]
fn test_export_bytes_deterministic() {
    let a = OnnxExporter::new().to_bytes(&iris_forest(10), 4).unwrap();
    let b = OnnxExporter::new().to_bytes(&iris_forest(10), 4).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_export_custom_config_strings_present() {
    let forest = iris_forest(5);
    let config = OnnxConfig {
        producer_name: "custom-producer".to_string(),
        doc_string: "iris ensemble".to_string(),
        ..OnnxConfig::default()
    };
    let bytes = OnnxExporter::with_config(config).to_bytes(&forest, 4).unwrap();

    let contains = |needle: &[u8]| bytes.windows(needle.len()).any(|w| w == needle);
    assert!(contains(b"custom-producer"));
    assert!(contains(b"iris ensemble"));
}

#[test]
fn test_export_grows_with_forest_size() {
    let small = OnnxExporter::new().to_bytes(&iris_forest(5), 4).unwrap();
    let large = OnnxExporter::new().to_bytes(&iris_forest(20), 4).unwrap();
    assert!(large.len() > small.len());
}
