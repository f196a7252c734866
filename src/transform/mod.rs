//! Transform catalog
//!
//! Eight pure `TabularFrame -> TabularFrame` operations, each applied to the
//! base frame (never to another transform's output) and persisted under its
//! own suffixed identity:
//!
//! | Kind | Operation |
//! |---|---|
//! | `DropNa` | remove rows containing any null |
//! | `GroupBy` | mean of a measure per key pair |
//! | `Pivot` | one key as row index, the other's values as columns |
//! | `Melt` | unpivot measure columns into name/value pairs, column-major |
//! | `Stack` | unpivot over a multi-column index, row-major, nulls dropped |
//! | `Merge` | inner self-join on a key, self-pairs excluded |
//! | `Concat` | two partitions of a categorical column, re-concatenated |
//! | `Union` | frame plus a projection of itself, exact duplicates removed |

mod drop_missing;
mod group;
mod join;
mod partition;
mod pivot;
mod reshape;
mod union;

pub use drop_missing::drop_missing;
pub use group::group_mean;
pub use join::self_join;
pub use partition::partition_concat;
pub use pivot::pivot;
pub use reshape::{melt, stack};
pub use union::union_dedup;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::frame::{FrameError, TabularFrame};

/// Error type for transforms
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// A designated column is absent from the input frame
    #[error("Transform {transform} requires column '{column}'")]
    MissingColumn {
        transform: TransformKind,
        column: String,
    },

    /// A measure column holds text
    #[error("Transform {transform} requires numeric column '{column}'")]
    NonNumeric {
        transform: TransformKind,
        column: String,
    },

    /// The output frame could not be built
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Result type for transforms
pub type TransformResult<T> = Result<T, TransformError>;

/// The transforms in catalog order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransformKind {
    DropNa,
    GroupBy,
    Pivot,
    Melt,
    Stack,
    Merge,
    Concat,
    Union,
}

impl TransformKind {
    /// Every transform, in the order the pipeline applies them
    pub const ALL: [TransformKind; 8] = [
        TransformKind::DropNa,
        TransformKind::GroupBy,
        TransformKind::Pivot,
        TransformKind::Melt,
        TransformKind::Stack,
        TransformKind::Merge,
        TransformKind::Concat,
        TransformKind::Union,
    ];

    /// Suffix appended to the base table name
    pub fn suffix(&self) -> &'static str {
        match self {
            TransformKind::DropNa => "DropNa",
            TransformKind::GroupBy => "GroupBy",
            TransformKind::Pivot => "Pivot",
            TransformKind::Melt => "Melt",
            TransformKind::Stack => "Stack",
            TransformKind::Merge => "Merge",
            TransformKind::Concat => "Concat",
            TransformKind::Union => "Union",
        }
    }

    /// One-line description for listings
    pub fn description(&self) -> &'static str {
        match self {
            TransformKind::DropNa => "remove rows containing any null",
            TransformKind::GroupBy => "mean of a measure per key pair",
            TransformKind::Pivot => "key pair reshaped into an index and value columns",
            TransformKind::Melt => "measure columns unpivoted into name/value pairs",
            TransformKind::Stack => "measure columns stacked over a multi-column index",
            TransformKind::Merge => "inner self-join on a key, self-pairs excluded",
            TransformKind::Concat => "two partitions of a category concatenated",
            TransformKind::Union => "frame plus a projection of itself, deduplicated",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TransformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransformKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.suffix().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown transform: {}", s))
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Group-aggregate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Grouping columns
    pub keys: Vec<String>,
    /// Column averaged within each group
    pub measure: String,
    /// Name of the averaged column in the output
    pub output: String,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            keys: strings(&["Pclass", "Sex"]),
            measure: "Survived".to_string(),
            output: "Survival_Rate".to_string(),
        }
    }
}

/// Pivot settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotConfig {
    /// Column whose distinct values become the row index
    pub index: String,
    /// Column whose distinct values become output columns
    pub columns: String,
    /// Column supplying cell values
    pub values: String,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            index: "Pclass".to_string(),
            columns: "Sex".to_string(),
            values: "Fare".to_string(),
        }
    }
}

/// Melt settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeltConfig {
    pub id_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub variable_name: String,
    pub value_name: String,
}

impl Default for MeltConfig {
    fn default() -> Self {
        Self {
            id_columns: strings(&["PassengerId", "Pclass", "Sex", "Survived"]),
            value_columns: strings(&["Age", "Fare", "SibSp", "Parch"]),
            variable_name: "Measurement".to_string(),
            value_name: "Value".to_string(),
        }
    }
}

/// Stack settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub index_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub label_name: String,
    pub value_name: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            index_columns: strings(&["PassengerId", "Pclass", "Sex"]),
            value_columns: strings(&["Age", "Fare", "SibSp", "Parch"]),
            label_name: "Measurement".to_string(),
            value_name: "Value".to_string(),
        }
    }
}

/// Self-join settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Join key
    pub key: String,
    /// Row identifier; pairs with equal identifiers are dropped
    pub identifier: String,
    pub left_suffix: String,
    pub right_suffix: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            key: "Ticket".to_string(),
            identifier: "PassengerId".to_string(),
            left_suffix: "_left".to_string(),
            right_suffix: "_right".to_string(),
        }
    }
}

/// Partition-concat settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Categorical column to split on
    pub column: String,
    /// Value selecting the first partition
    pub first: String,
    /// Value selecting the second partition
    pub second: String,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            column: "Sex".to_string(),
            first: "male".to_string(),
            second: "female".to_string(),
        }
    }
}

/// Union-dedup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnionConfig {
    /// Columns of the projected copy appended to the frame
    pub columns: Vec<String>,
}

impl Default for UnionConfig {
    fn default() -> Self {
        Self {
            columns: strings(&["PassengerId", "Pclass", "Sex"]),
        }
    }
}

/// Designated columns for every transform
///
/// Defaults match the Titanic passenger dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub group: GroupConfig,
    pub pivot: PivotConfig,
    pub melt: MeltConfig,
    pub stack: StackConfig,
    pub merge: MergeConfig,
    pub partition: PartitionConfig,
    pub union: UnionConfig,
}

/// Applies the transforms to a base frame
#[derive(Debug, Clone, Default)]
pub struct TransformCatalog {
    config: TransformConfig,
}

impl TransformCatalog {
    /// Create a catalog with the given column designations
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Column designations in use
    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Transforms in the order they are applied
    pub fn kinds(&self) -> &'static [TransformKind] {
        &TransformKind::ALL
    }

    /// Apply one transform to the base frame
    pub fn apply(&self, kind: TransformKind, frame: &TabularFrame) -> TransformResult<TabularFrame> {
        let config = &self.config;
        match kind {
            TransformKind::DropNa => Ok(drop_missing(frame)),
            TransformKind::GroupBy => group_mean(frame, &config.group),
            TransformKind::Pivot => pivot(frame, &config.pivot),
            TransformKind::Melt => melt(frame, &config.melt),
            TransformKind::Stack => stack(frame, &config.stack),
            TransformKind::Merge => self_join(frame, &config.merge),
            TransformKind::Concat => partition_concat(frame, &config.partition),
            TransformKind::Union => union_dedup(frame, &config.union),
        }
    }
}

/// Look up a designated column, naming the transform that needed it
pub(crate) fn require<'a>(
    frame: &'a TabularFrame,
    transform: TransformKind,
    column: &str,
) -> TransformResult<&'a crate::frame::Column> {
    frame
        .column(column)
        .ok_or_else(|| TransformError::MissingColumn {
            transform,
            column: column.to_string(),
        })
}
