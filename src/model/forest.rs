//! Random Forest Classifier
//!
//! Bootstrap-aggregated CART trees with Gini impurity. Every tree is grown
//! on a bootstrap sample and considers a random subset of features at each
//! node. Class probabilities are the mean of the leaf class distributions
//! across trees, and the prediction is their argmax.
//!
//! Training is fully determined by the seed: bootstrap draws and feature
//! shuffles come from a single `StdRng`, and no hash-ordered containers are
//! involved.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::inference::InferenceError;
use super::trainer::TrainingError;

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: u16,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn with_n_trees(mut self, n_trees: u16) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

/// A single CART tree stored as a flat node arena; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    params: &'a ForestParams,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

impl<'a> TreeBuilder<'a> {
    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in samples {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn leaf(&mut self, counts: &[usize], total: usize) -> usize {
        let distribution = counts
            .iter()
            .map(|&c| c as f64 / total as f64)
            .collect();
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    /// Best threshold on one feature, or None if the feature is constant
    fn best_split_on(&self, samples: &[usize], feature: usize, counts: &[usize]) -> Option<SplitCandidate> {
        let mut sorted = samples.to_vec();
        sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

        let n = sorted.len();
        let mut left = vec![0usize; self.n_classes];
        let mut best: Option<SplitCandidate> = None;

        for pos in 1..n {
            left[self.y[sorted[pos - 1]]] += 1;

            let lo = self.x[[sorted[pos - 1], feature]];
            let hi = self.x[[sorted[pos], feature]];
            if hi <= lo {
                continue;
            }

            let right: Vec<usize> = counts.iter().zip(&left).map(|(c, l)| c - l).collect();
            let impurity = (pos as f64 * gini(&left, pos)
                + (n - pos) as f64 * gini(&right, n - pos))
                / n as f64;

            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(SplitCandidate { feature, threshold, impurity });
            }
        }

        best
    }

    fn grow(&mut self, samples: &[usize], depth: usize, rng: &mut StdRng) -> usize {
        let total = samples.len();
        let counts = self.class_counts(samples);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.map_or(false, |d| depth >= d);
        if pure || depth_reached || total < self.params.min_samples_split {
            return self.leaf(&counts, total);
        }

        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        for (visited, &feature) in features.iter().enumerate() {
            // Keep looking past max_features only while nothing splits
            if visited >= self.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_split_on(samples, feature, &counts) {
                if best.as_ref().map_or(true, |b| candidate.impurity < b.impurity) {
                    best = Some(candidate);
                }
            }
        }

        let Some(split) = best else {
            return self.leaf(&counts, total);
        };

        let parent_impurity = gini(&counts, total);
        self.importances[split.feature] +=
            total as f64 * parent_impurity - total as f64 * split.impurity;

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);

        // Reserve the split slot so children land after it
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { distribution: Vec::new() });

        let left_index = self.grow(&left, depth + 1, rng);
        let right_index = self.grow(&right, depth + 1, rng);

        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_index,
            right: right_index,
        };
        index
    }
}

impl DecisionTree {
    /// Leaf class distribution reached by `row`
    pub fn leaf_distribution(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split { feature, threshold, left, right } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { distribution } => return distribution,
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Structural sanity check for trees coming from an artifact
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split { feature, left, right, .. } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on unknown feature {}", i, feature));
                    }
                    if *left <= i || *right <= i || *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(format!("node {} has invalid children", i));
                    }
                }
                Node::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!("leaf {} has {} classes", i, distribution.len()));
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// FOREST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ForestParams,
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForestClassifier {
    /// Fit on a (scaled) feature matrix and class labels `0..n_classes`
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        n_classes: usize,
        params: ForestParams,
    ) -> Result<Self, TrainingError> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(TrainingError::EmptyDataset);
        }
        if y.len() != n_samples {
            return Err(TrainingError::LabelMismatch { samples: n_samples, labels: y.len() });
        }
        if let Some(&label) = y.iter().find(|&&l| l >= n_classes) {
            return Err(TrainingError::UnknownLabel { label, n_classes });
        }
        if params.n_trees == 0 {
            return Err(TrainingError::InvalidParams("n_trees must be positive".to_string()));
        }

        let max_features = ((n_features as f64).sqrt().floor() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees as usize);
        let mut importances = vec![0.0; n_features];

        for _ in 0..params.n_trees {
            let bootstrap: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

            let mut builder = TreeBuilder {
                x: x.view(),
                y,
                n_classes,
                max_features,
                params: &params,
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };
            builder.grow(&bootstrap, 0, &mut rng);

            let tree_total: f64 = builder.importances.iter().sum();
            if tree_total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&builder.importances) {
                    *acc += v / tree_total;
                }
            }
            trees.push(DecisionTree { nodes: builder.nodes });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(Self {
            params,
            n_features,
            n_classes,
            trees,
            feature_importances: importances,
        })
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Mean decrease in impurity per feature, summing to 1
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Mean of leaf class distributions across trees
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> Result<Vec<f64>, InferenceError> {
        if row.len() != self.n_features {
            return Err(InferenceError::FeatureCount {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf_distribution(row)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }

    /// Argmax of `predict_proba`, lowest index on ties
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> Result<usize, InferenceError> {
        let proba = self.predict_proba(row)?;
        Ok(argmax(&proba))
    }

    /// Fraction of rows predicted correctly
    pub fn score(&self, x: ArrayView2<'_, f64>, y: &[usize]) -> Result<f64, InferenceError> {
        if y.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for (row, &label) in x.rows().into_iter().zip(y) {
            if self.predict(row)? == label {
                correct += 1;
            }
        }
        Ok(correct as f64 / y.len() as f64)
    }

    /// Reject structurally broken forests (e.g. a hand-edited artifact)
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn toy_data() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.0], [0.1, 0.2], [0.2, 0.1],
            [5.0, 5.0], [5.1, 4.9], [4.9, 5.2],
            [10.0, 0.0], [10.2, 0.1], [9.9, 0.3],
        ];
        (x, vec![0, 0, 0, 1, 1, 1, 2, 2, 2])
    }

    #[test]
    fn test_fit_separable_data() {
        let (x, y) = toy_data();
        let forest = RandomForestClassifier::fit(x.view(), &y, 3, ForestParams::default()).unwrap();

        assert_eq!(forest.n_trees(), 100);
        assert_eq!(forest.predict(array![0.05, 0.05].view()).unwrap(), 0);
        assert_eq!(forest.predict(array![5.0, 5.1].view()).unwrap(), 1);
        assert_eq!(forest.predict(array![10.1, 0.2].view()).unwrap(), 2);
        assert_eq!(forest.score(x.view(), &y).unwrap(), 1.0);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = toy_data();
        let forest = RandomForestClassifier::fit(x.view(), &y, 3, ForestParams::default()).unwrap();

        for row in [array![0.0, 0.0], array![3.0, 2.5], array![7.5, 2.5], array![-40.0, 99.0]] {
            let proba = forest.predict_proba(row.view()).unwrap();
            assert_eq!(proba.len(), 3);
            assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let (x, y) = toy_data();
        let a = RandomForestClassifier::fit(x.view(), &y, 3, ForestParams::default().with_n_trees(25)).unwrap();
        let b = RandomForestClassifier::fit(x.view(), &y, 3, ForestParams::default().with_n_trees(25)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let (x, y) = toy_data();
        let params = ForestParams::default().with_n_trees(5).with_max_depth(Some(1));
        let forest = RandomForestClassifier::fit(x.view(), &y, 3, params).unwrap();
        // A depth-1 tree is at most one split and two leaves
        assert!(forest.trees.iter().all(|t| t.node_count() <= 3));
    }

    #[test]
    fn test_feature_importances_normalised() {
        let (x, y) = toy_data();
        let forest = RandomForestClassifier::fit(x.view(), &y, 3, ForestParams::default()).unwrap();
        let total: f64 = forest.feature_importances().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_input() {
        let (x, y) = toy_data();
        assert!(matches!(
            RandomForestClassifier::fit(x.view(), &y[..4], 3, ForestParams::default()),
            Err(TrainingError::LabelMismatch { .. })
        ));
        assert!(matches!(
            RandomForestClassifier::fit(x.view(), &y, 2, ForestParams::default()),
            Err(TrainingError::UnknownLabel { label: 2, n_classes: 2 })
        ));
        assert!(matches!(
            RandomForestClassifier::fit(x.view(), &y, 3, ForestParams::default().with_n_trees(0)),
            Err(TrainingError::InvalidParams(_))
        ));

        let forest = RandomForestClassifier::fit(x.view(), &y, 3, ForestParams::default()).unwrap();
        assert!(matches!(
            forest.predict(array![1.0, 2.0, 3.0].view()),
            Err(InferenceError::FeatureCount { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_validate_detects_broken_tree() {
        let (x, y) = toy_data();
        let mut forest = RandomForestClassifier::fit(x.view(), &y, 3, ForestParams::default().with_n_trees(3)).unwrap();
        assert!(forest.validate().is_ok());

        forest.trees[0].nodes[0] = Node::Split { feature: 7, threshold: 0.0, left: 1, right: 2 };
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_argmax_prefers_lowest_index_on_tie() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.3, 0.6]), 2);
    }
}
