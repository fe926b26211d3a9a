//! Gradient-boosted tree ensemble loaded from a JSON model dump.
//!
//! The file wraps the per-tree node layout produced by XGBoost's
//! `dump_model(..., dump_format="json")`:
//!
//! ```json
//! {
//!   "base_score": 0.5,
//!   "objective": "binary:logistic",
//!   "trees": [
//!     { "nodeid": 0, "split": "LOCATION_CODE", "split_condition": 0.5,
//!       "yes": 1, "no": 2, "missing": 1,
//!       "children": [ { "nodeid": 1, "leaf": 0.4 }, { "nodeid": 2, "leaf": -0.1 } ] }
//!   ]
//! }
//! ```
//!
//! A split sends a record to `yes` when its value is strictly less than
//! `split_condition`. The score is the sum of one leaf per tree on top of
//! the base margin, passed through the logistic function for logistic
//! objectives.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::{CrimeModel, FeatureRecord, ModelError};

/// Training objective, which decides how margins become scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Objective {
    /// Probability of the positive class.
    #[serde(rename = "binary:logistic", alias = "reg:logistic")]
    Logistic,
    /// Raw regression output.
    #[serde(rename = "reg:squarederror", alias = "reg:linear")]
    SquaredError,
}

impl Objective {
    const fn name(self) -> &'static str {
        match self {
            Self::Logistic => "binary:logistic",
            Self::SquaredError => "reg:squarederror",
        }
    }
}

/// One node as it appears in the dump.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNode {
    Split {
        nodeid: u32,
        split: String,
        split_condition: f64,
        yes: u32,
        no: u32,
        children: Vec<RawNode>,
    },
    Leaf {
        nodeid: u32,
        leaf: f64,
    },
}

impl RawNode {
    const fn id(&self) -> u32 {
        match self {
            Self::Split { nodeid, .. } | Self::Leaf { nodeid, .. } => *nodeid,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEnsemble {
    #[serde(default = "default_base_score")]
    base_score: f64,
    objective: Objective,
    trees: Vec<RawNode>,
}

const fn default_base_score() -> f64 {
    0.5
}

/// A node with its feature resolved to a record index and its children
/// resolved to positions in the tree's node list.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
    },
    Leaf(f64),
}

/// A single regression tree; `nodes[0]` is the root.
#[derive(Debug, Clone, PartialEq)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Flattens a nested dump into an indexed node list, validating
    /// feature names and child references.
    fn compile(index: usize, root: RawNode) -> Result<Self, ModelError> {
        let malformed = |message: String| ModelError::MalformedTree {
            tree: index,
            message,
        };

        let root_id = root.id();
        let mut by_id: BTreeMap<u32, RawNode> = BTreeMap::new();
        let mut stack = vec![root];
        while let Some(mut node) = stack.pop() {
            if let RawNode::Split { children, .. } = &mut node {
                stack.append(children);
            }
            let id = node.id();
            if by_id.insert(id, node).is_some() {
                return Err(malformed(format!("node id {id} appears more than once")));
            }
        }

        // Root first so evaluation always starts at position 0.
        let mut order: Vec<u32> = vec![root_id];
        order.extend(by_id.keys().copied().filter(|id| *id != root_id));
        let position: BTreeMap<u32, usize> =
            order.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();

        let resolve = |child: u32| {
            position
                .get(&child)
                .copied()
                .ok_or_else(|| malformed(format!("reference to missing node {child}")))
        };

        let mut nodes = Vec::with_capacity(order.len());
        for id in &order {
            let node = match &by_id[id] {
                RawNode::Leaf { leaf, .. } => Node::Leaf(*leaf),
                RawNode::Split {
                    split,
                    split_condition,
                    yes,
                    no,
                    ..
                } => Node::Split {
                    feature: FeatureRecord::index_of(split).ok_or_else(|| {
                        ModelError::UnknownFeature {
                            tree: index,
                            feature: split.clone(),
                        }
                    })?,
                    threshold: *split_condition,
                    yes: resolve(*yes)?,
                    no: resolve(*no)?,
                },
            };
            nodes.push(node);
        }

        Ok(Self { nodes })
    }

    /// Walks from the root to a leaf and returns its value.
    fn leaf_value(&self, index: usize, values: &[f64; 10]) -> Result<f64, ModelError> {
        let mut pos = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has
        // nodes; anything longer is a cycle.
        for _ in 0..self.nodes.len() {
            match &self.nodes[pos] {
                Node::Leaf(value) => return Ok(*value),
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                } => {
                    pos = if values[*feature] < *threshold { *yes } else { *no };
                }
            }
        }
        Err(ModelError::MalformedTree {
            tree: index,
            message: "no leaf reached (cycle in node references)".to_string(),
        })
    }
}

/// Gradient-boosted tree ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsemble {
    objective: Objective,
    base_margin: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Parses a model from its JSON dump.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the JSON is malformed, a split names an
    /// unknown feature, a tree references missing nodes, or the base
    /// score is not a valid probability for a logistic objective.
    pub fn from_json_str(s: &str) -> Result<Self, ModelError> {
        let raw: RawEnsemble = serde_json::from_str(s)?;

        let base_margin = match raw.objective {
            Objective::Logistic => {
                if !(raw.base_score > 0.0 && raw.base_score < 1.0) {
                    return Err(ModelError::InvalidBaseScore {
                        base_score: raw.base_score,
                        objective: raw.objective.name().to_string(),
                    });
                }
                (raw.base_score / (1.0 - raw.base_score)).ln()
            }
            Objective::SquaredError => raw.base_score,
        };

        let trees = raw
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, root)| Tree::compile(i, root))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            objective: raw.objective,
            base_margin,
            trees,
        })
    }

    /// Loads a model from a JSON dump on disk.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json_str(&contents)?;
        log::info!(
            "Loaded {} model with {} trees from {}",
            model.objective.name(),
            model.trees.len(),
            path.display()
        );
        Ok(model)
    }

    /// The training objective.
    #[must_use]
    pub const fn objective(&self) -> Objective {
        self.objective
    }

    /// Number of trees in the ensemble.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Raw margin for `record`, before any link function.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MalformedTree`] if a tree never reaches a leaf.
    pub fn margin(&self, record: &FeatureRecord) -> Result<f64, ModelError> {
        let values = record.fields().map(|(_, v)| v);
        self.trees
            .iter()
            .enumerate()
            .try_fold(self.base_margin, |acc, (i, tree)| {
                Ok(acc + tree.leaf_value(i, &values)?)
            })
    }
}

impl CrimeModel for TreeEnsemble {
    fn predict(&self, record: &FeatureRecord) -> Result<f64, ModelError> {
        let margin = self.margin(record)?;
        let score = match self.objective {
            Objective::Logistic => 1.0 / (1.0 + (-margin).exp()),
            Objective::SquaredError => margin,
        };
        if score.is_finite() {
            Ok(score)
        } else {
            Err(ModelError::NonFiniteScore)
        }
    }
}
