//   Copyright 2024 The PyMC Developers
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.
//! A least-squares regression tree used to stratify rows. The tree is
//! implemented using an array (vector) representation and grown
//! breadth-first from an expansion queue; every leaf keeps the indices of
//! the rows that reached it.
#![allow(non_snake_case)]

use std::collections::VecDeque;

use ndarray::{ArrayView1, ArrayView2};
use rand::seq::index;
use rand::Rng;

use crate::split_rules::{SplitCandidate, SplitRuleType};

/// Represents errors related to binary decision tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// When attempting to split a leaf node, if the node is not a leaf.
    #[error("cannot split a non-leaf node")]
    NonLeafSplit,
    /// When attempting to split a leaf node, if the index is valid or not
    #[error("node index {0} does not exist")]
    InvalidNodeIndex(usize),
}

/// Growth limits for [`DecisionTree::fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeSettings {
    /// Each child of a split holds at least this many rows.
    pub min_samples_leaf: usize,
    /// Fraction of the candidate columns searched at each node.
    pub max_features: f64,
}

/// Both children of a split node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Children {
    left: usize,
    right: usize,
}

/// A `DecisionTree` is an array-based implementation of the binary decision tree.
///
/// The `i-th` element of each vector holds information about node `i`. Node 0
/// is the tree's root. `feature`, `threshold` and `one_hot` only apply to
/// split nodes; `leaf_sample_indices` only to leaves (it is emptied when a
/// node is split).
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    /// Stores the feature (column of `X`) index for splitting at the i'th node.
    pub feature: Vec<usize>,
    /// Stores the threshold value (or category code) for the i'th node split.
    pub threshold: Vec<f64>,
    /// Whether the i'th node splits on category equality.
    pub one_hot: Vec<bool>,
    /// Mean target of the rows at the i'th node.
    pub value: Vec<f64>,
    /// Row indices that reached the i'th node, kept for leaves only.
    pub leaf_sample_indices: Vec<Vec<usize>>,
    /// Stores index of nodes that can still be expanded
    pub expansion_nodes: VecDeque<usize>,
    children: Vec<Option<Children>>,
    parent: Vec<Option<usize>>,
}

impl DecisionTree {
    /// Creates a new `DecisionTree` whose root holds every row in `rows`.
    pub fn new(init_value: f64, rows: Vec<usize>) -> Self {
        Self {
            feature: vec![0],
            threshold: vec![0.0],
            one_hot: vec![false],
            value: vec![init_value],
            leaf_sample_indices: vec![rows],
            expansion_nodes: VecDeque::from([0]),
            children: vec![None],
            parent: vec![None],
        }
    }

    /// Adds a new leaf to the `DecisionTree` and returns its index.
    fn add_node(&mut self, parent: usize, value: f64, rows: Vec<usize>) -> usize {
        let node_id = self.feature.len();

        self.feature.push(0);
        self.threshold.push(0.0);
        self.one_hot.push(false);
        self.value.push(value);
        self.leaf_sample_indices.push(rows);
        self.children.push(None);
        self.parent.push(Some(parent));
        self.expansion_nodes.push_back(node_id);

        node_id
    }

    /// Number of nodes, split nodes included.
    pub fn len(&self) -> usize {
        self.feature.len()
    }

    /// A tree always holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.feature.is_empty()
    }

    /// Computes the left child index of _this_ node.
    pub fn left_child(&self, index: usize) -> Option<usize> {
        self.children.get(index).copied().flatten().map(|c| c.left)
    }

    /// Computes the right child index of _this_ node.
    pub fn right_child(&self, index: usize) -> Option<usize> {
        self.children.get(index).copied().flatten().map(|c| c.right)
    }

    /// Checks whether the passed index is a leaf node.
    pub fn is_leaf(&self, index: usize) -> bool {
        self.left_child(index).is_none() && self.right_child(index).is_none()
    }

    /// Computes the depth of _this_ node in the `DecisionTree`.
    pub fn node_depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.parent.get(index).copied().flatten();

        while let Some(node) = current {
            depth += 1;
            current = self.parent[node];
        }

        depth
    }

    /// Splits a leaf node into an internal node with two new leaves.
    #[allow(clippy::too_many_arguments)]
    pub fn split_node(
        &mut self,
        node_index: usize,
        feature: usize,
        threshold: f64,
        one_hot: bool,
        left: (f64, Vec<usize>),
        right: (f64, Vec<usize>),
    ) -> Result<(usize, usize), TreeError> {
        if node_index >= self.len() {
            return Err(TreeError::InvalidNodeIndex(node_index));
        }

        if !self.is_leaf(node_index) {
            return Err(TreeError::NonLeafSplit);
        }

        // Update the current node
        self.feature[node_index] = feature;
        self.threshold[node_index] = threshold;
        self.one_hot[node_index] = one_hot;
        self.leaf_sample_indices[node_index].clear();

        let left_child_index = self.add_node(node_index, left.0, left.1);
        let right_child_index = self.add_node(node_index, right.0, right.1);
        self.children[node_index] = Some(Children {
            left: left_child_index,
            right: right_child_index,
        });

        Ok((left_child_index, right_child_index))
    }

    fn pop_expansion_index(&mut self) -> Option<usize> {
        self.expansion_nodes.pop_front()
    }

    /// Grows a least-squares regression tree on `rows` of `X`, considering
    /// only the columns listed in `features`.
    ///
    /// `categorical[k]` tells whether `features[k]` holds category codes.
    /// A node is expanded only while it holds at least
    /// `2 * min_samples_leaf` rows and a non-constant target, so every leaf
    /// keeps at least `min_samples_leaf` rows unless the root itself is
    /// smaller. `rows` may contain repeated indices (bootstrap draws).
    pub fn fit<R: Rng + ?Sized>(
        X: ArrayView2<f64>,
        y: ArrayView1<f64>,
        features: &[usize],
        categorical: &[bool],
        rows: Vec<usize>,
        settings: &TreeSettings,
        rng: &mut R,
    ) -> Result<Self, TreeError> {
        debug_assert_eq!(features.len(), categorical.len());

        let root_value = mean_of(&rows, y);
        let mut tree = DecisionTree::new(root_value, rows);
        if features.is_empty() {
            tree.expansion_nodes.clear();
            return Ok(tree);
        }

        let rules: Vec<SplitRuleType> = categorical
            .iter()
            .map(|&is_cat| SplitRuleType::for_column(is_cat))
            .collect();
        let msl = settings.min_samples_leaf;
        let n_candidates = ((settings.max_features * features.len() as f64).ceil() as usize)
            .clamp(1, features.len());

        while let Some(node) = tree.pop_expansion_index() {
            let rows = &tree.leaf_sample_indices[node];
            if rows.len() < 2 * msl {
                continue;
            }

            let targets: Vec<f64> = rows.iter().map(|&r| y[r]).collect();
            if targets.iter().all(|&t| t == targets[0]) {
                continue;
            }

            let candidates: Vec<usize> = if n_candidates < features.len() {
                let mut picked = index::sample(rng, features.len(), n_candidates).into_vec();
                picked.sort_unstable();
                picked
            } else {
                (0..features.len()).collect()
            };

            let mut best: Option<(usize, SplitCandidate<f64>)> = None;
            for k in candidates {
                let column: Vec<f64> = rows.iter().map(|&r| X[[r, features[k]]]).collect();
                if let Some(split) = rules[k].best_split(&column, &targets, msl) {
                    if best.map_or(true, |(_, b)| split.gain > b.gain) {
                        best = Some((k, split));
                    }
                }
            }

            let Some((k, split)) = best else {
                continue;
            };
            if split.gain <= 0.0 {
                continue;
            }

            let column: Vec<f64> = rows.iter().map(|&r| X[[r, features[k]]]).collect();
            let (left, right) = rules[k].divide(&column, &split.value);
            let left_rows: Vec<usize> = left.into_iter().map(|i| rows[i]).collect();
            let right_rows: Vec<usize> = right.into_iter().map(|i| rows[i]).collect();
            let left_value = mean_of(&left_rows, y);
            let right_value = mean_of(&right_rows, y);

            tree.split_node(
                node,
                features[k],
                split.value,
                matches!(rules[k], SplitRuleType::OneHot(_)),
                (left_value, left_rows),
                (right_value, right_rows),
            )?;
        }

        Ok(tree)
    }

    /// Indices of the leaf nodes, in node order.
    pub fn leaf_nodes(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.is_leaf(i)).collect()
    }

    /// Rows that reached leaf `index`.
    pub fn leaf_rows(&self, index: usize) -> &[usize] {
        &self.leaf_sample_indices[index]
    }

    /// Predicts the value for a given input sample (indexed like the
    /// columns of `X` the tree was fitted on).
    pub fn predict(&self, sample: &[f64]) -> f64 {
        let mut node = 0;
        while let Some(children) = self.children[node] {
            let value = sample[self.feature[node]];
            let goes_left = if self.one_hot[node] {
                value == self.threshold[node]
            } else {
                value <= self.threshold[node]
            };
            node = if goes_left {
                children.left
            } else {
                children.right
            };
        }
        self.value[node]
    }
}

fn mean_of(rows: &[usize], y: ArrayView1<f64>) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64
}
