use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use stratpd::tree::{DecisionTree, TreeError, TreeSettings};

#[test]
fn test_tree_primitives() {
    let mut tree = DecisionTree::new(5.0, vec![0, 1, 2, 3]);
    let (left_idx, right_idx) = tree
        .split_node(0, 0, 1500.0, false, (1.0, vec![0, 1]), (2.0, vec![2, 3]))
        .unwrap();

    // Test threshold value a node was split on
    assert_eq!(tree.threshold[0], 1500.0);

    // Test index of left and right children of split node
    assert_eq!(tree.left_child(0), Some(left_idx));
    assert_eq!(tree.right_child(0), Some(right_idx));
    assert_eq!((left_idx, right_idx), (1, 2));

    // Test is leaf value
    assert!(!tree.is_leaf(0));
    assert!(tree.is_leaf(1));
    assert!(tree.is_leaf(2));

    // Test leaf value
    assert_eq!(tree.value.last(), Some(&2.0));

    // Rows move from the split node to its children
    assert!(tree.leaf_rows(0).is_empty());
    assert_eq!(tree.leaf_rows(1), &[0, 1]);
    assert_eq!(tree.leaf_nodes(), vec![1, 2]);
    assert_eq!(tree.node_depth(0), 0);
    assert_eq!(tree.node_depth(2), 1);
    assert_eq!(tree.len(), 3);
}

#[test]
fn test_split_errors() {
    let mut tree = DecisionTree::new(0.0, vec![0, 1]);
    tree.split_node(0, 0, 0.5, false, (0.0, vec![0]), (1.0, vec![1]))
        .unwrap();

    assert_eq!(
        tree.split_node(0, 0, 0.5, false, (0.0, vec![]), (0.0, vec![])),
        Err(TreeError::NonLeafSplit)
    );
    assert_eq!(
        tree.split_node(9, 0, 0.5, false, (0.0, vec![]), (0.0, vec![])),
        Err(TreeError::InvalidNodeIndex(9))
    );
}

#[test]
fn test_fit_separates_step() {
    let X = Array2::from_shape_fn((20, 1), |(i, _)| i as f64);
    let y = Array1::from_shape_fn(20, |i| if i < 10 { 0.0 } else { 5.0 });
    let settings = TreeSettings {
        min_samples_leaf: 2,
        max_features: 1.0,
    };
    let mut rng = StdRng::seed_from_u64(0);

    let tree = DecisionTree::fit(
        X.view(),
        y.view(),
        &[0],
        &[false],
        (0..20).collect(),
        &settings,
        &mut rng,
    )
    .unwrap();

    // Both halves are pure, so the root split is the only one
    assert_eq!(tree.leaf_nodes(), vec![1, 2]);
    assert_eq!(tree.threshold[0], 9.5);
    assert_eq!(tree.leaf_rows(1), (0..10).collect::<Vec<_>>().as_slice());
    assert_eq!(tree.predict(&[3.0]), 0.0);
    assert_eq!(tree.predict(&[15.0]), 5.0);
}

#[test]
fn test_fit_respects_min_samples_leaf() {
    let X = Array2::from_shape_fn((50, 1), |(i, _)| ((i * 37) % 50) as f64);
    let y = Array1::from_shape_fn(50, |i| X[[i, 0]] * X[[i, 0]]);
    let settings = TreeSettings {
        min_samples_leaf: 7,
        max_features: 1.0,
    };
    let mut rng = StdRng::seed_from_u64(1);

    let tree = DecisionTree::fit(
        X.view(),
        y.view(),
        &[0],
        &[false],
        (0..50).collect(),
        &settings,
        &mut rng,
    )
    .unwrap();

    let leaves = tree.leaf_nodes();
    assert!(leaves.len() > 1);
    let mut covered: Vec<usize> = leaves
        .iter()
        .flat_map(|&leaf| tree.leaf_rows(leaf).to_vec())
        .collect();
    assert!(leaves.iter().all(|&leaf| tree.leaf_rows(leaf).len() >= 7));
    covered.sort_unstable();
    assert_eq!(covered, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_fit_one_hot_column() {
    // Code 1 lifts the target; codes 0 and 2 do not.
    let X = Array2::from_shape_fn((30, 1), |(i, _)| (i % 3) as f64);
    let y = Array1::from_shape_fn(30, |i| if i % 3 == 1 { 10.0 } else { 0.0 });
    let settings = TreeSettings {
        min_samples_leaf: 2,
        max_features: 1.0,
    };
    let mut rng = StdRng::seed_from_u64(2);

    let tree = DecisionTree::fit(
        X.view(),
        y.view(),
        &[0],
        &[true],
        (0..30).collect(),
        &settings,
        &mut rng,
    )
    .unwrap();

    assert!(tree.one_hot[0]);
    assert_eq!(tree.leaf_nodes().len(), 2);
    assert_eq!(tree.predict(&[1.0]), 10.0);
    assert_eq!(tree.predict(&[2.0]), 0.0);
}

#[test]
fn test_fit_without_features_is_a_single_leaf() {
    let X = Array2::<f64>::zeros((6, 1));
    let y = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let settings = TreeSettings {
        min_samples_leaf: 2,
        max_features: 1.0,
    };
    let mut rng = StdRng::seed_from_u64(3);

    let tree =
        DecisionTree::fit(X.view(), y.view(), &[], &[], (0..6).collect(), &settings, &mut rng)
            .unwrap();

    assert_eq!(tree.leaf_nodes(), vec![0]);
    assert_eq!(tree.predict(&[0.0]), 3.5);
}
