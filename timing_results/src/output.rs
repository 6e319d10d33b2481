//! Engine output (`<key>\t<json>` lines) to the normalized timing CSV.

use crate::timing_csv::TIMING_HEADER;
use crate::ResultsError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use timing_jobs::descriptor::{KERNEL_LIST, N_STEPS, SEED};
use timing_jobs::line_format::decode_line;
use timing_jobs::ParameterCombination;

pub const JOB_OUTPUT_FILENAME: &str = "hadoop_output";
pub const PARSED_OUTPUT_FILENAME: &str = "parsed_output.csv";

const ELAPSED_SECS: &str = "elapsed_secs";
const SIZE_FIELDS: [&str; 4] = ["num_rows", "num_cols", "num_clusters", "num_views"];

/// One timed task as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub combination: ParameterCombination,
    pub elapsed_secs: f64,
    pub kernel: String,
    pub n_steps: Option<u64>,
    pub seed: Option<u64>,
    pub extras: BTreeMap<String, String>,
}

fn malformed(line: usize, reason: impl Into<String>) -> ResultsError {
    ResultsError::MalformedOutput {
        line,
        reason: reason.into(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

impl OutputRow {
    pub fn from_args(args: &Map<String, Value>, line: usize) -> Result<Self, ResultsError> {
        let size = |name: &str| {
            args.get(name)
                .and_then(Value::as_u64)
                .ok_or_else(|| malformed(line, format!("missing integer field {:?}", name)))
        };
        let combination = ParameterCombination::new(
            size("num_rows")?,
            size("num_cols")?,
            size("num_clusters")?,
            size("num_views")?,
        );
        let elapsed_secs = args
            .get(ELAPSED_SECS)
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite())
            .ok_or_else(|| malformed(line, "missing or non-finite elapsed_secs"))?;
        let kernel = match args.get(KERNEL_LIST) {
            Some(Value::Array(list)) if !list.is_empty() => list[0]
                .as_str()
                .ok_or_else(|| malformed(line, "kernel name is not a string"))?
                .to_owned(),
            _ => return Err(malformed(line, "missing kernel_list")),
        };
        let optional = |name: &str| match args.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| malformed(line, format!("{} is not an integer", name))),
        };
        let n_steps = optional(N_STEPS)?;
        let seed = optional(SEED)?;

        let mut extras = BTreeMap::new();
        for (name, value) in args.iter() {
            if SIZE_FIELDS.contains(&name.as_str())
                || [ELAPSED_SECS, KERNEL_LIST, N_STEPS, SEED].contains(&name.as_str())
            {
                continue;
            }
            // structured values (states, hyperparameters) are not diagnostics
            if let Some(s) = scalar_to_string(value) {
                extras.insert(name.clone(), s);
            }
        }

        Ok(OutputRow {
            combination,
            elapsed_secs,
            kernel,
            n_steps,
            seed,
            extras,
        })
    }
}

pub fn parse_output<R: BufRead>(reader: R) -> Result<Vec<OutputRow>, ResultsError> {
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (_key, args) = decode_line(&line, i + 1).map_err(|e| malformed(i + 1, e.to_string()))?;
        rows.push(OutputRow::from_args(&args, i + 1)?);
    }
    Ok(rows)
}

pub fn write_timing_csv<W: Write>(out: W, rows: &[OutputRow]) -> Result<(), ResultsError> {
    let extra_columns: BTreeSet<&String> = rows.iter().flat_map(|r| r.extras.keys()).collect();
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = TIMING_HEADER.to_vec();
    header.extend(extra_columns.iter().map(|s| s.as_str()));
    writer.write_record(&header)?;

    let optional = |v: Option<u64>| v.map(|v| v.to_string()).unwrap_or_default();
    for row in rows {
        let mut record = vec![
            row.combination.num_rows.to_string(),
            row.combination.num_cols.to_string(),
            row.combination.num_clusters.to_string(),
            row.combination.num_views.to_string(),
            row.elapsed_secs.to_string(),
            row.kernel.clone(),
            optional(row.n_steps),
            optional(row.seed),
        ];
        for column in extra_columns.iter() {
            record.push(row.extras.get(*column).cloned().unwrap_or_default());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Returns the number of timing rows written.
pub fn parse_timing_to_csv(
    output_filename: impl AsRef<Path>,
    parsed_filename: impl AsRef<Path>,
) -> Result<usize, ResultsError> {
    let rows = parse_output(BufReader::new(File::open(output_filename)?))?;
    write_timing_csv(File::create(parsed_filename)?, &rows)?;
    Ok(rows.len())
}
