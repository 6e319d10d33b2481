use crate::ResultsError;
use std::io::Read;
use std::path::Path;
use timing_jobs::ParameterCombination;

pub const TIMING_HEADER: [&str; 8] = [
    "num_rows",
    "num_cols",
    "num_clusters",
    "num_views",
    "elapsed_secs",
    "which_kernel",
    "n_steps",
    "SEED",
];

/// Columns past this are engine-internal debug fields.
pub const MAX_TIMING_COLUMNS: usize = 20;

/// Only the size fields, the time and the kernel are required.
const REQUIRED_COLUMNS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct TimingRecord {
    pub combination: ParameterCombination,
    pub elapsed_secs: f64,
    pub kernel: String,
    /// Remaining columns, up to `MAX_TIMING_COLUMNS` in total.
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingTable {
    pub header: Vec<String>,
    pub records: Vec<TimingRecord>,
}

impl TimingTable {
    pub fn kernel_records<'a>(&'a self, kernel: &'a str) -> impl Iterator<Item = &'a TimingRecord> {
        self.records.iter().filter(move |r| r.kernel == kernel)
    }
}

fn invalid(line: u64, column: &str, reason: impl Into<String>) -> ResultsError {
    ResultsError::InvalidRecord {
        line,
        column: column.to_owned(),
        reason: reason.into(),
    }
}

/// Decimal integers only in canonical form, so that integer equality is string equality.
fn parse_size(field: &str, line: u64, column: &str) -> Result<u64, ResultsError> {
    let value: u64 = field
        .parse()
        .map_err(|e| invalid(line, column, format!("{:?}: {}", field, e)))?;
    if value.to_string() != field {
        return Err(invalid(line, column, format!("{:?} is not canonical", field)));
    }
    Ok(value)
}

pub fn read_timing_csv_from<R: Read>(input: R) -> Result<TimingTable, ResultsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input);

    let full_header = reader.headers()?.clone();
    let header: Vec<String> = full_header
        .iter()
        .take(MAX_TIMING_COLUMNS)
        .map(str::to_owned)
        .collect();
    if header.len() < REQUIRED_COLUMNS {
        return Err(ResultsError::Header(format!(
            "expected at least {} columns, found {}",
            REQUIRED_COLUMNS,
            header.len()
        )));
    }
    for (found, expected) in header.iter().zip(TIMING_HEADER.iter()).take(REQUIRED_COLUMNS) {
        if found != expected {
            return Err(ResultsError::Header(format!(
                "expected column {:?}, found {:?}",
                expected, found
            )));
        }
    }
    if full_header.len() > MAX_TIMING_COLUMNS {
        log::debug!(
            "ignoring {} columns past the first {}",
            full_header.len() - MAX_TIMING_COLUMNS,
            MAX_TIMING_COLUMNS
        );
    }

    let mut records = Vec::new();
    // the reader rejects rows whose length differs from the header
    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let field = |i: usize| row.get(i).unwrap_or("");
        let elapsed_secs: f64 = field(4)
            .parse()
            .map_err(|e| invalid(line, TIMING_HEADER[4], format!("{:?}: {}", field(4), e)))?;
        if !elapsed_secs.is_finite() {
            return Err(invalid(line, TIMING_HEADER[4], "not a finite time"));
        }
        let kernel = field(5);
        if kernel.is_empty() {
            return Err(invalid(line, TIMING_HEADER[5], "empty kernel name"));
        }
        records.push(TimingRecord {
            combination: ParameterCombination::new(
                parse_size(field(0), line, TIMING_HEADER[0])?,
                parse_size(field(1), line, TIMING_HEADER[1])?,
                parse_size(field(2), line, TIMING_HEADER[2])?,
                parse_size(field(3), line, TIMING_HEADER[3])?,
            ),
            elapsed_secs,
            kernel: kernel.to_owned(),
            extra: row
                .iter()
                .take(MAX_TIMING_COLUMNS)
                .skip(REQUIRED_COLUMNS)
                .map(str::to_owned)
                .collect(),
        });
    }
    Ok(TimingTable { header, records })
}

pub fn read_timing_csv(path: impl AsRef<Path>) -> Result<TimingTable, ResultsError> {
    read_timing_csv_from(std::fs::File::open(path)?)
}
