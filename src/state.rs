//! Engine states put back into the clustering that generated their data, so that
//! a single state can be timed in a known configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use timing_jobs::JobArgs;
use timing_results::TableData;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{total} is not divisible into {parts} equal groups")]
    NotDivisible { total: usize, parts: usize },
    #[error("permutation {index} has length {found}, expected {expected}")]
    PermutationLength {
        index: usize,
        found: usize,
        expected: usize,
    },
    #[error("state has {found} inverse permutations but {expected} views were requested")]
    ViewCount { found: usize, expected: usize },
    #[error("state carries no data_inverse_permutation_indices")]
    MissingPermutations,
    #[error("X_L is not a JSON object")]
    InvalidLatentState,
}

/// `[0, 0, .., 1, 1, .., parts - 1]`, each label repeated `total / parts` times.
fn repeated_labels(total: usize, parts: usize) -> Result<Vec<usize>, StateError> {
    if parts == 0 || total % parts != 0 {
        return Err(StateError::NotDivisible { total, parts });
    }
    let per_part = total / parts;
    Ok((0..parts)
        .flat_map(|label| std::iter::repeat(label).take(per_part))
        .collect())
}

/// Indices that sort `values`, ties kept in input order.
fn argsort(values: &[usize]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by_key(|&i| values[i]);
    indices
}

/// Row cluster assignments of every view, undoing the row shuffle that the data
/// generator applied to each of them.
pub fn generative_row_assignments(
    num_rows: usize,
    num_clusters: usize,
    inverse_permutations: &[Vec<usize>],
) -> Result<Vec<Vec<usize>>, StateError> {
    let labels = repeated_labels(num_rows, num_clusters)?;
    inverse_permutations
        .iter()
        .enumerate()
        .map(|(index, permutation)| {
            if permutation.len() != num_rows {
                return Err(StateError::PermutationLength {
                    index,
                    found: permutation.len(),
                    expected: num_rows,
                });
            }
            Ok(argsort(permutation).into_iter().map(|i| labels[i]).collect())
        })
        .collect()
}

pub fn generative_column_assignments(
    num_cols: usize,
    num_views: usize,
) -> Result<Vec<usize>, StateError> {
    repeated_labels(num_cols, num_views)
}

/// A state as exported by the engine, in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(rename = "T")]
    pub t: Vec<Vec<Value>>,
    #[serde(rename = "M_c")]
    pub m_c: Value,
    #[serde(rename = "M_r")]
    pub m_r: Value,
    #[serde(rename = "X_L")]
    pub x_l: Value,
    #[serde(rename = "X_D", default, skip_serializing_if = "Option::is_none")]
    pub x_d: Option<Vec<Vec<usize>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_inverse_permutation_indices: Option<Vec<Vec<usize>>>,
}

impl EngineState {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn num_rows(&self) -> usize {
        self.t.len()
    }

    pub fn num_cols(&self) -> usize {
        self.t.first().map(Vec::len).unwrap_or(0)
    }

    /// Replaces the row and column partitions with the generative clustering.
    /// Hyperparameters in `X_L` are left as they are.
    pub fn into_generative(
        mut self,
        num_clusters: usize,
        num_views: usize,
    ) -> Result<Self, StateError> {
        let permutations = self
            .data_inverse_permutation_indices
            .as_ref()
            .ok_or(StateError::MissingPermutations)?;
        if permutations.len() != num_views {
            return Err(StateError::ViewCount {
                found: permutations.len(),
                expected: num_views,
            });
        }
        let x_d = generative_row_assignments(self.num_rows(), num_clusters, permutations)?;
        let column_assignments = generative_column_assignments(self.num_cols(), num_views)?;

        let x_l = self
            .x_l
            .as_object_mut()
            .ok_or(StateError::InvalidLatentState)?;
        let partition = x_l
            .entry("column_partition")
            .or_insert_with(|| Value::Object(Map::new()));
        let partition = partition
            .as_object_mut()
            .ok_or(StateError::InvalidLatentState)?;
        partition.insert(
            String::from("assignments"),
            Value::from(column_assignments),
        );
        self.x_d = Some(x_d);
        Ok(self)
    }

    /// The shared dataset every task loads; the latent state travels in the job lines.
    pub fn table_data(&self) -> TableData {
        TableData {
            t: Value::from(self.t.clone()),
            m_c: self.m_c.clone(),
            m_r: self.m_r.clone(),
            ..TableData::placeholder()
        }
    }

    pub fn job_payload(&self) -> JobArgs {
        let mut payload = Map::new();
        payload.insert(String::from("X_L"), self.x_l.clone());
        let x_d = self
            .x_d
            .as_ref()
            .map(|x_d| Value::from(x_d.clone()))
            .unwrap_or(Value::Array(Vec::new()));
        payload.insert(String::from("X_D"), x_d);
        payload
    }
}
