//! CART decision tree classification
//!
//! Binary tree grown greedily on Gini impurity. At each node every feature
//! is scanned in sorted order and split at the midpoint between consecutive
//! distinct values; the split with the largest impurity decrease wins.
//! Growth stops at a pure node, at `max_depth`, when no split reduces
//! impurity, or when a child would hold fewer than `min_leaf_population`
//! samples. Leaves predict the majority class (lowest label on ties).

use crate::classification::classifier::{check_class_coverage, class_set};
use crate::classification::{Classifier, LabeledSample, TrainedClassifier};
use crate::imagery::{FeatureVector, N_BANDS};
use covermap_core::{ClassLabel, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for [`CartClassifier`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartParams {
    /// Maximum tree depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum number of samples in each leaf. Default: 1
    pub min_leaf_population: usize,
}

impl Default for CartParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_leaf_population: 1,
        }
    }
}

/// Classification and regression tree learner
#[derive(Debug, Clone, Copy, Default)]
pub struct CartClassifier {
    pub params: CartParams,
}

impl CartClassifier {
    pub fn new(params: CartParams) -> Self {
        Self { params }
    }
}

/// Tree node. Samples with `features[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        label: ClassLabel,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.leaves() + right.leaves(),
        }
    }
}

/// Fitted decision tree. The default tree has no root and is untrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
}

impl DecisionTree {
    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Number of split levels (0 for a single leaf)
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }

    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::leaves)
    }
}

impl Classifier for CartClassifier {
    type Model = DecisionTree;

    fn name(&self) -> &'static str {
        "cart"
    }

    fn train(&self, samples: &[LabeledSample], classes: &[ClassLabel]) -> Result<DecisionTree> {
        if self.params.min_leaf_population == 0 {
            return Err(Error::InvalidParameter {
                name: "min_leaf_population",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        check_class_coverage(samples, classes)?;

        let labels = class_set(classes);
        // Dense class index per sample; coverage check guarantees a hit
        let y: Vec<usize> = samples
            .iter()
            .map(|s| labels.binary_search(&s.label).unwrap_or_default())
            .collect();

        let builder = TreeBuilder {
            samples,
            y: &y,
            labels: &labels,
            params: &self.params,
        };
        let indices: Vec<usize> = (0..samples.len()).collect();
        let root = builder.build(indices, 0);

        let tree = DecisionTree { root: Some(root) };
        debug!(
            "CART tree: {} samples, depth {}, {} leaves",
            samples.len(),
            tree.depth(),
            tree.n_leaves()
        );
        Ok(tree)
    }
}

impl TrainedClassifier for DecisionTree {
    fn predict(&self, features: &FeatureVector) -> Result<ClassLabel> {
        let mut node = self.root.as_ref().ok_or(Error::UntrainedModel)?;
        loop {
            match node {
                TreeNode::Leaf { label, .. } => return Ok(*label),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = features[*feature];
                    if v.is_nan() {
                        return Err(Error::Algorithm("cannot classify a NaN feature".into()));
                    }
                    node = if v <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// Gini = 1 - Σ p_i²
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    samples: &'a [LabeledSample],
    y: &'a [usize],
    labels: &'a [ClassLabel],
    params: &'a CartParams,
}

impl TreeBuilder<'_> {
    fn counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.labels.len()];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn leaf(&self, counts: &[usize], n: usize) -> TreeNode {
        // First maximum, so ties resolve to the lowest label
        let mut best = 0;
        for (k, &c) in counts.iter().enumerate() {
            if c > counts[best] {
                best = k;
            }
        }
        TreeNode::Leaf {
            label: self.labels[best],
            samples: n,
        }
    }

    fn build(&self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n = indices.len();
        let counts = self.counts(&indices);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let at_depth = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || at_depth || n < 2 * self.params.min_leaf_population {
            return self.leaf(&counts, n);
        }

        let parent = gini(&counts, n);
        let Some(split) = self.best_split(&indices, parent) else {
            return self.leaf(&counts, n);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.samples[i].features[split.feature] <= split.threshold);
        // Adjacent floats can round the midpoint onto one side
        if left.is_empty() || right.is_empty() {
            return self.leaf(&counts, n);
        }

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    fn best_split(&self, indices: &[usize], parent: f64) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_leaf_population;
        let total = self.counts(indices);
        let mut best: Option<BestSplit> = None;
        let mut order = indices.to_vec();

        for feature in 0..N_BANDS {
            let value = |i: usize| self.samples[i].features[feature];
            order.sort_by(|&a, &b| value(a).total_cmp(&value(b)));

            let mut left = vec![0usize; self.labels.len()];
            for pos in 0..n - 1 {
                left[self.y[order[pos]]] += 1;
                let n_left = pos + 1;
                let n_right = n - n_left;

                let (lo, hi) = (value(order[pos]), value(order[pos + 1]));
                if hi - lo <= 1e-12 || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right: Vec<usize> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;

                if impurity < parent - 1e-12
                    && best.as_ref().map_or(true, |b| impurity < b.impurity)
                {
                    best = Some(BestSplit {
                        feature,
                        threshold: lo / 2.0 + hi / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }
}
