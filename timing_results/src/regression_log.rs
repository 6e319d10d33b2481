use crate::ResultsError;
use std::fs::OpenOptions;
use std::path::Path;

pub const DEFAULT_REGRESSION_FILE: &str = "daily_regression_coeffs.csv";
pub const COEFFICIENT_COUNT: usize = 5;

/// One fitted kernel, one line of the append-only coefficient log:
/// `timestamp,kernel,c0,c1,c2,c3,c4`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionResult {
    pub timestamp: String,
    pub kernel: String,
    pub coefficients: [f64; COEFFICIENT_COUNT],
}

impl RegressionResult {
    fn to_record(&self) -> Vec<String> {
        let mut record = vec![self.timestamp.clone(), self.kernel.clone()];
        record.extend(self.coefficients.iter().map(|c| c.to_string()));
        record
    }
}

/// `ctime`-like local timestamp, e.g. `Mon Oct 19 14:03:27 2026`.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}

/// Appends to the log, creating it if needed. No locking: concurrent runs against
/// the same log must be serialized by the caller.
pub fn append_regression_results(
    path: impl AsRef<Path>,
    results: &[RegressionResult],
) -> Result<(), ResultsError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for result in results {
        writer.write_record(result.to_record())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_regression_log(path: impl AsRef<Path>) -> Result<Vec<RegressionResult>, ResultsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut results = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != COEFFICIENT_COUNT + 2 {
            return Err(ResultsError::InvalidRecord {
                line,
                column: String::from("*"),
                reason: format!("expected {} fields, found {}", COEFFICIENT_COUNT + 2, record.len()),
            });
        }
        let mut coefficients = [0.0; COEFFICIENT_COUNT];
        for (i, c) in coefficients.iter_mut().enumerate() {
            let field = &record[i + 2];
            *c = field.parse().map_err(|e| ResultsError::InvalidRecord {
                line,
                column: format!("c{}", i),
                reason: format!("{:?}: {}", field, e),
            })?;
        }
        results.push(RegressionResult {
            timestamp: record[0].to_owned(),
            kernel: record[1].to_owned(),
            coefficients,
        });
    }
    Ok(results)
}
