/*!
Line format shared with the engine's line processor and the streaming cluster:
`<key>\t<json object>`, one job per line.
*/

use crate::descriptor::{JobArgs, JobDescriptor};
use crate::JobError;
use serde_json::Value;

pub const SEPARATOR: char = '\t';

pub fn encode_line(key: &str, args: &JobArgs) -> Result<String, JobError> {
    if key.contains(|c: char| c == SEPARATOR || c == '\n' || c == '\r') {
        return Err(JobError::InvalidKey(key.to_owned()));
    }
    let json = serde_json::to_string(args)?;
    Ok(format!("{}{}{}", key, SEPARATOR, json))
}

pub fn encode_descriptor(job: &JobDescriptor) -> Result<String, JobError> {
    encode_line(job.key(), job.args())
}

/// `line_number` is 1-based and only used in errors.
pub fn decode_line(line: &str, line_number: usize) -> Result<(String, JobArgs), JobError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let (key, json) = line
        .split_once(SEPARATOR)
        .ok_or_else(|| JobError::MalformedLine {
            line: line_number,
            reason: "missing key separator".to_owned(),
        })?;
    let value: Value = serde_json::from_str(json).map_err(|e| JobError::MalformedLine {
        line: line_number,
        reason: e.to_string(),
    })?;
    match value {
        Value::Object(args) => Ok((key.to_owned(), args)),
        other => Err(JobError::MalformedLine {
            line: line_number,
            reason: format!("expected a JSON object, found {}", other),
        }),
    }
}

pub fn decode_descriptor(line: &str, line_number: usize) -> Result<JobDescriptor, JobError> {
    let (key, args) = decode_line(line, line_number)?;
    Ok(JobDescriptor::from_parts(key, args))
}
