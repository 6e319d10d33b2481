use crate::table_data::{read_msgpack_zstd, write_msgpack_zstd};
use crate::ResultsError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use timing_jobs::ParameterGrid;

/** What a run directory was generated from, so that a finished run can be
re-fitted offline without its command line.
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub created: String,
    pub grid: ParameterGrid,
    pub kernels: Vec<String>,
    pub seed: u64,
    pub n_steps: u64,
    pub n_tasks: usize,
    pub mode: String,
}

impl RunManifest {
    pub const FILENAME: &'static str = "RunManifest.msgpack.zst";

    pub fn read_msgpack_zstd(path: impl AsRef<Path>) -> Result<Self, ResultsError> {
        read_msgpack_zstd(path)
    }

    pub fn write_msgpack_zstd(&self, path: impl AsRef<Path>) -> Result<(), ResultsError> {
        write_msgpack_zstd(self, path)
    }
}
