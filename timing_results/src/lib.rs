/** Timing results of engine runs: parsing of the job output, the normalized
timing CSV, the coefficient log and the files shipped alongside the jobs.
*/
pub mod manifest;
pub mod output;
pub mod regression_log;
pub mod table_data;
pub mod timing_csv;

pub use manifest::RunManifest;
pub use output::{
    parse_output, parse_timing_to_csv, write_timing_csv, OutputRow, JOB_OUTPUT_FILENAME,
    PARSED_OUTPUT_FILENAME,
};
pub use regression_log::{
    append_regression_results, read_regression_log, timestamp_now, RegressionResult,
    COEFFICIENT_COUNT, DEFAULT_REGRESSION_FILE,
};
pub use table_data::{CommandDict, TableData};
pub use timing_csv::{read_timing_csv, TimingRecord, TimingTable, MAX_TIMING_COLUMNS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("msgpack encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("msgpack decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("malformed job output line {line}: {reason}")]
    MalformedOutput { line: usize, reason: String },
    #[error("invalid timing header: {0}")]
    Header(String),
    #[error("invalid value on line {line}, column {column}: {reason}")]
    InvalidRecord {
        line: u64,
        column: String,
        reason: String,
    },
}
