use itertools::{iproduct, Itertools};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One synthetic dataset shape to time the engine on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterCombination {
    pub num_rows: u64,
    pub num_cols: u64,
    pub num_clusters: u64,
    pub num_views: u64,
}

impl ParameterCombination {
    pub fn new(num_rows: u64, num_cols: u64, num_clusters: u64, num_views: u64) -> Self {
        ParameterCombination {
            num_rows,
            num_cols,
            num_clusters,
            num_views,
        }
    }

    /// Rows must split evenly into clusters and columns into views.
    /// A zero divisor is never valid.
    pub fn is_valid(&self) -> bool {
        self.num_rows.checked_rem(self.num_clusters) == Some(0)
            && self.num_cols.checked_rem(self.num_views) == Some(0)
    }

    /// The combination as the argument dictionary the engine expects.
    pub fn to_args(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut args = serde_json::Map::new();
        args.insert("num_rows".to_owned(), self.num_rows.into());
        args.insert("num_cols".to_owned(), self.num_cols.into());
        args.insert("num_views".to_owned(), self.num_views.into());
        args.insert("num_clusters".to_owned(), self.num_clusters.into());
        args
    }
}

impl Display for ParameterCombination {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rows={} cols={} clusters={} views={}",
            self.num_rows, self.num_cols, self.num_clusters, self.num_views
        )
    }
}

pub const DEFAULT_NUM_ROWS_LIST: [u64; 5] = [100, 400, 1000, 4000, 10000];
pub const DEFAULT_NUM_COLS_LIST: [u64; 5] = [4, 8, 16, 24, 32];
pub const DEFAULT_NUM_CLUSTERS_LIST: [u64; 4] = [10, 20, 40, 50];
pub const DEFAULT_NUM_SPLITS_LIST: [u64; 3] = [2, 3, 4];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterGrid {
    pub num_rows_list: Vec<u64>,
    pub num_cols_list: Vec<u64>,
    pub num_clusters_list: Vec<u64>,
    pub num_splits_list: Vec<u64>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        ParameterGrid {
            num_rows_list: DEFAULT_NUM_ROWS_LIST.to_vec(),
            num_cols_list: DEFAULT_NUM_COLS_LIST.to_vec(),
            num_clusters_list: DEFAULT_NUM_CLUSTERS_LIST.to_vec(),
            num_splits_list: DEFAULT_NUM_SPLITS_LIST.to_vec(),
        }
    }
}

impl ParameterGrid {
    pub fn new(
        num_rows_list: Vec<u64>,
        num_cols_list: Vec<u64>,
        num_clusters_list: Vec<u64>,
        num_splits_list: Vec<u64>,
    ) -> Self {
        ParameterGrid {
            num_rows_list,
            num_cols_list,
            num_clusters_list,
            num_splits_list,
        }
    }

    /// Full cartesian product, rows varying slowest and splits fastest.
    /// Invalid combinations are included; a repeated size is only used once.
    pub fn product(&self) -> impl Iterator<Item = ParameterCombination> {
        iproduct!(
            distinct(&self.num_rows_list),
            distinct(&self.num_cols_list),
            distinct(&self.num_clusters_list),
            distinct(&self.num_splits_list)
        )
        .map(|(rows, cols, clusters, splits)| ParameterCombination::new(rows, cols, clusters, splits))
    }

    pub fn valid_combinations(&self) -> Vec<ParameterCombination> {
        self.product().filter(ParameterCombination::is_valid).collect()
    }

    /// Every size of either grid, `self`'s first.
    pub fn union(&self, other: &ParameterGrid) -> ParameterGrid {
        let merge = |a: &[u64], b: &[u64]| -> Vec<u64> { distinct(&[a, b].concat()).collect() };
        ParameterGrid {
            num_rows_list: merge(&self.num_rows_list, &other.num_rows_list),
            num_cols_list: merge(&self.num_cols_list, &other.num_cols_list),
            num_clusters_list: merge(&self.num_clusters_list, &other.num_clusters_list),
            num_splits_list: merge(&self.num_splits_list, &other.num_splits_list),
        }
    }
}

fn distinct(list: &[u64]) -> std::vec::IntoIter<u64> {
    list.iter().copied().unique().collect::<Vec<_>>().into_iter()
}
