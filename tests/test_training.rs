//! Integration test: forest training on the bundled dataset

use iris_trainer::dataset::Dataset;
use iris_trainer::split::train_test_split;
use iris_trainer::training::{accuracy, RandomForest};

#[test]
fn test_forest_learns_iris() {
    let dataset = Dataset::load().unwrap();
    let split = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();

    let mut forest = RandomForest::new(25).with_random_state(42);
    forest.fit(&split.x_train, &split.y_train).unwrap();

    let y_pred = forest.predict(&split.x_test).unwrap();
    let acc = accuracy(&split.y_test, &y_pred).unwrap();
    assert!(acc > 0.9, "held-out accuracy {} too low", acc);
}

#[test]
fn test_forest_deterministic_on_iris() {
    let dataset = Dataset::load().unwrap();
    let split = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();

    let mut a = RandomForest::new(25).with_random_state(42);
    let mut b = RandomForest::new(25).with_random_state(42);
    a.fit(&split.x_train, &split.y_train).unwrap();
    b.fit(&split.x_train, &split.y_train).unwrap();

    assert_eq!(
        a.predict(&split.x_test).unwrap(),
        b.predict(&split.x_test).unwrap()
    );
}

#[test]
fn test_forest_predictions_are_valid_labels() {
    let dataset = Dataset::load().unwrap();
    let split = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();

    let mut forest = RandomForest::new(25).with_random_state(42);
    forest.fit(&split.x_train, &split.y_train).unwrap();

    let y_pred = forest.predict(&split.x_test).unwrap();
    for &label in y_pred.iter() {
        assert!(Dataset::class_name(label as usize).is_some());
    }
}

#[test]
fn test_forest_probabilities_on_iris() {
    let dataset = Dataset::load().unwrap();
    let split = train_test_split(&dataset.features, &dataset.labels, 0.3, 42).unwrap();

    let mut forest = RandomForest::new(25).with_random_state(42);
    forest.fit(&split.x_train, &split.y_train).unwrap();

    let proba = forest.predict_proba(&split.x_test).unwrap();
    assert_eq!(proba.nrows(), split.n_test());
    assert_eq!(proba.ncols(), 3);
    for i in 0..proba.nrows() {
        let row_sum: f64 = proba.row(i).sum();
        assert!((row_sum - 1.0).abs() < 1e-6);
    }
}
