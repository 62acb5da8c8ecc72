//! Gradient-boosted regression tree ensemble
//!
//! # Artifact format
//!
//! ```json
//! {
//!   "format": "revpred-gbdt",
//!   "version": 1,
//!   "base_score": 11.2,
//!   "categories": {
//!     "companyType": ["Private Company", "Public Company"],
//!     "category": ["Tech"],
//!     "city_tier": ["Tier_1", "Tier_2_3"],
//!     "state": ["Maharashtra"]
//!   },
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 0, "threshold": 50.0, "left": 1, "right": 2 },
//!         { "leaf": -0.3 },
//!         { "leaf": 0.4 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Encoded input: the four numeric schema columns, then one one-hot block per
//! categorical column (companyType, category, city_tier, state) in listed
//! category order. Unlisted values encode as all zeros. At a split `x <
//! threshold` goes left. Output is `base_score + sum(leaves)` on the log1p
//! scale.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ModelError, Predictor};
use crate::features::FeatureRow;

pub const ARTIFACT_FORMAT: &str = "revpred-gbdt";
pub const ARTIFACT_VERSION: u32 = 1;

const NUMERIC_WIDTH: usize = 4;

/// Serialized form of the model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Artifact {
    pub format: String,
    pub version: u32,
    pub base_score: f64,
    #[serde(default)]
    pub categories: Categories,
    pub trees: Vec<TreeSpec>,
}

/// Known category values per categorical column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Categories {
    #[serde(rename = "companyType")]
    pub company_type: Vec<String>,
    pub category: Vec<String>,
    pub city_tier: Vec<String>,
    pub state: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeSpec {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

/// One-hot block for a categorical column
#[derive(Debug)]
struct OneHot {
    offset: usize,
    index: HashMap<String, usize>,
}

impl OneHot {
    fn new(column: &str, offset: usize, values: &[String]) -> Result<Self, ModelError> {
        let mut index = HashMap::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            if index.insert(value.clone(), i).is_some() {
                return Err(ModelError::InvalidArtifact(format!(
                    "duplicate category '{}' for {}",
                    value, column
                )));
            }
        }
        Ok(Self { offset, index })
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

/// Validated, ready-to-evaluate tree ensemble
#[derive(Debug)]
pub struct TreeEnsemble {
    base_score: f64,
    blocks: [OneHot; 4],
    width: usize,
    trees: Vec<Vec<Node>>,
}

impl TreeEnsemble {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: Artifact = serde_json::from_slice(bytes)?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: Artifact) -> Result<Self, ModelError> {
        if artifact.format != ARTIFACT_FORMAT {
            return Err(ModelError::InvalidArtifact(format!(
                "unsupported format '{}', expected '{}'",
                artifact.format, ARTIFACT_FORMAT
            )));
        }
        if artifact.version != ARTIFACT_VERSION {
            return Err(ModelError::InvalidArtifact(format!(
                "unsupported version {}, expected {}",
                artifact.version, ARTIFACT_VERSION
            )));
        }
        if !artifact.base_score.is_finite() {
            return Err(ModelError::InvalidArtifact("base_score is not finite".into()));
        }
        if artifact.trees.is_empty() {
            return Err(ModelError::InvalidArtifact("artifact contains no trees".into()));
        }

        let c = &artifact.categories;
        let mut offset = NUMERIC_WIDTH;
        let mut block = |column: &str, values: &[String]| {
            let one_hot = OneHot::new(column, offset, values)?;
            offset += one_hot.len();
            Ok::<_, ModelError>(one_hot)
        };
        let blocks = [
            block("companyType", &c.company_type)?,
            block("category", &c.category)?,
            block("city_tier", &c.city_tier)?,
            block("state", &c.state)?,
        ];
        let width = offset;

        let trees = artifact
            .trees
            .into_iter()
            .enumerate()
            .map(|(t, tree)| validate_tree(t, tree.nodes, width))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base_score: artifact.base_score,
            blocks,
            width,
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Length of the encoded feature vector
    pub fn encoded_width(&self) -> usize {
        self.width
    }

    fn encode(&self, row: &FeatureRow) -> Vec<f64> {
        let mut x = vec![0.0; self.width];
        x[..NUMERIC_WIDTH].copy_from_slice(&row.numeric());
        for (block, value) in self.blocks.iter().zip(row.categorical()) {
            if let Some(i) = block.index.get(value) {
                x[block.offset + i] = 1.0;
            }
        }
        x
    }

    fn score(&self, x: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|nodes| evaluate(nodes, x)).sum::<f64>()
    }
}

impl Predictor for TreeEnsemble {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let y = self.score(&self.encode(row));
                if y.is_finite() {
                    Ok(y)
                } else {
                    Err(ModelError::Inference(format!(
                        "non-finite output {} for row {}",
                        y, i
                    )))
                }
            })
            .collect()
    }
}

/// Children must point forward, so traversal always terminates
fn validate_tree(t: usize, nodes: Vec<Node>, width: usize) -> Result<Vec<Node>, ModelError> {
    let invalid = |msg: String| ModelError::InvalidArtifact(format!("tree {}: {}", t, msg));
    if nodes.is_empty() {
        return Err(invalid("no nodes".into()));
    }
    for (i, node) in nodes.iter().enumerate() {
        match *node {
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if feature >= width {
                    return Err(invalid(format!(
                        "node {} uses feature {} but only {} features are encoded",
                        i, feature, width
                    )));
                }
                if !threshold.is_finite() {
                    return Err(invalid(format!("node {} threshold is not finite", i)));
                }
                for child in [left, right] {
                    if child <= i || child >= nodes.len() {
                        return Err(invalid(format!(
                            "node {} has out-of-order child {}",
                            i, child
                        )));
                    }
                }
            }
            Node::Leaf { leaf } => {
                if !leaf.is_finite() {
                    return Err(invalid(format!("node {} leaf is not finite", i)));
                }
            }
        }
    }
    Ok(nodes)
}

fn evaluate(nodes: &[Node], x: &[f64]) -> f64 {
    let mut i = 0;
    loop {
        match nodes[i] {
            Node::Leaf { leaf } => return leaf,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                i = if x[feature] < threshold { left } else { right };
            }
        }
    }
}
