use stratpd::split_rules::{ContinuousSplit, OneHotSplit, SplitRule, SplitRuleType};

#[test]
fn test_continuous_split_rule() {
    let rule = ContinuousSplit;

    let feature_values: Vec<f64> = (0..10).map(f64::from).collect();
    let split = rule.best_split(&feature_values, &feature_values, 2).unwrap();

    // The balanced split minimizes the squared error of a linear target
    assert_eq!(split.value, 4.5);
    assert!((split.gain - 62.5).abs() < 1e-9);

    let static_split_value = 4.0;
    let (left, right) = rule.divide(&feature_values, &static_split_value);

    // Indices where value <= 4 go left
    assert_eq!(left, vec![0, 1, 2, 3, 4]);
    // Indices where value > 4 go right
    assert_eq!(right, vec![5, 6, 7, 8, 9]);
}

#[test]
fn test_continuous_split_respects_leaf_size() {
    let rule = ContinuousSplit;
    let values = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
    let targets = [0.0, 0.0, 0.0, 0.0, 0.0, 100.0];

    // The best unconstrained split isolates the last row; with at least
    // three rows per side only the middle split remains.
    let split = rule.best_split(&values, &targets, 3).unwrap();
    assert_eq!(split.value, 2.5);
    assert!(rule.best_split(&values, &targets, 4).is_none());
}

#[test]
fn test_continuous_split_skips_ties_and_nan() {
    let rule = ContinuousSplit;
    let values = [1.0, 1.0, 1.0, f64::NAN];
    let targets = [1.0, 2.0, 3.0, 4.0];

    assert!(rule.best_split(&values, &targets, 1).is_none());

    let (left, right) = rule.divide(&values, &1.0);
    assert_eq!(left, vec![0, 1, 2]);
    assert_eq!(right, vec![3]);
}

#[test]
fn test_continuous_split_sends_negative_nan_right() {
    let rule = ContinuousSplit;
    let values = [-f64::NAN, -f64::NAN, 0.0, 1.0, 2.0, 3.0];
    let targets = [100.0, 100.0, 0.0, 0.0, 1.0, 1.0];

    // Missing values always join the right child, whatever their sign bit.
    let split = rule.best_split(&values, &targets, 2).unwrap();
    assert_eq!(split.value, 2.5);

    let (left, right) = rule.divide(&values, &split.value);
    assert_eq!(left, vec![2, 3, 4]);
    assert_eq!(right, vec![0, 1, 5]);
}

#[test]
fn test_one_hot_split_rule() {
    let rule = OneHotSplit;

    // Test heterogeneous vector of codes
    let feature_values = vec![1.0, 2.0, 3.0, 2.0];
    let targets = vec![0.0, 10.0, 0.0, 10.0];
    let split = rule.best_split(&feature_values, &targets, 1).unwrap();

    assert_eq!(split.value, 2.0);
    assert!((split.gain - 100.0).abs() < 1e-9);

    let (left, right) = rule.divide(&feature_values, &2.0);

    // Indices where value = 2 go left
    assert_eq!(left, vec![1, 3]);
    // Indices where value != 2 go right
    assert_eq!(right, vec![0, 2]);

    // Test homogeneous vector of codes
    let feature_values = vec![1.0, 1.0, 1.0, 1.0];
    let split = rule.best_split(&feature_values, &targets, 1);

    assert_eq!(split, None);

    let (left, right) = rule.divide(&feature_values, &1.0);

    // Indices where value = 1 go left
    assert_eq!(left, vec![0, 1, 2, 3]);
    // Indices where value != 1 go right
    assert_eq!(right, Vec::<usize>::new());
}

#[test]
fn test_rule_for_column_kind() {
    assert!(matches!(
        SplitRuleType::for_column(true),
        SplitRuleType::OneHot(_)
    ));
    assert!(matches!(
        SplitRuleType::for_column(false),
        SplitRuleType::Continuous(_)
    ));
}
