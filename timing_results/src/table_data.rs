use crate::ResultsError;
use rmp_serde::{Deserializer, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/** Dataset snapshot every task reads before running its kernel.
The engine owns the content; a grid run ships an empty placeholder since each
task generates its own synthetic data from the size fields of its job line.
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    #[serde(rename = "T")]
    pub t: Value,
    #[serde(rename = "M_c")]
    pub m_c: Value,
    #[serde(rename = "M_r")]
    pub m_r: Value,
    #[serde(rename = "X_L")]
    pub x_l: Value,
    #[serde(rename = "X_D")]
    pub x_d: Value,
}

impl TableData {
    pub const FILENAME: &'static str = "table_data.msgpack.zst";

    pub fn placeholder() -> Self {
        TableData {
            t: Value::Array(Vec::new()),
            m_c: Value::Array(Vec::new()),
            m_r: Value::Array(Vec::new()),
            x_l: Value::Array(Vec::new()),
            x_d: Value::Array(Vec::new()),
        }
    }

    pub fn read_msgpack_zstd(path: impl AsRef<Path>) -> Result<Self, ResultsError> {
        read_msgpack_zstd(path)
    }

    pub fn write_msgpack_zstd(&self, path: impl AsRef<Path>) -> Result<(), ResultsError> {
        write_msgpack_zstd(self, path)
    }
}

/// Engine command every task runs, shipped next to the table data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDict {
    pub command: String,
}

impl CommandDict {
    pub const FILENAME: &'static str = "command_dict.msgpack";

    pub fn new(command: impl Into<String>) -> Self {
        CommandDict {
            command: command.into(),
        }
    }

    pub fn read_msgpack(path: impl AsRef<Path>) -> Result<Self, ResultsError> {
        let buf = std::fs::read(path)?;
        let mut deserializer = Deserializer::new(&buf[..]);
        Ok(CommandDict::deserialize(&mut deserializer)?)
    }

    pub fn write_msgpack(&self, path: impl AsRef<Path>) -> Result<(), ResultsError> {
        let mut f1 = std::fs::File::create(path)?;
        let mut s = Serializer::new(&mut f1).with_struct_map();
        self.serialize(&mut s)?;
        Ok(())
    }
}

pub(crate) fn read_msgpack_zstd<T: for<'de> Deserialize<'de>>(
    path: impl AsRef<Path>,
) -> Result<T, ResultsError> {
    let buf = std::fs::read(path)?;
    let mut decoder = zstd::Decoder::new(&buf[..])?;
    let mut deserializer = Deserializer::new(&mut decoder);
    Ok(T::deserialize(&mut deserializer)?)
}

pub(crate) fn write_msgpack_zstd<T: Serialize>(
    value: &T,
    path: impl AsRef<Path>,
) -> Result<(), ResultsError> {
    let f1 = std::fs::File::create(path)?;
    let mut encoder = zstd::Encoder::new(f1, 0)?.auto_finish();
    let mut s = Serializer::new(&mut encoder).with_struct_map();
    value.serialize(&mut s)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TableData::FILENAME);
        let data = TableData {
            t: json!([[1.5, 2.0], [0.25, -1.0]]),
            m_c: json!({"name_to_idx": {"0": 0, "1": 1}}),
            m_r: json!({"idx_to_name": {"0": "0", "1": "1"}}),
            x_l: json!({"column_partition": {"assignments": [0, 0]}}),
            x_d: json!([[0, 1]]),
        };
        data.write_msgpack_zstd(&path).unwrap();
        assert_eq!(TableData::read_msgpack_zstd(&path).unwrap(), data);

        TableData::placeholder().write_msgpack_zstd(&path).unwrap();
        assert_eq!(
            TableData::read_msgpack_zstd(&path).unwrap(),
            TableData::placeholder()
        );
    }

    #[test]
    fn command_dict_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CommandDict::FILENAME);
        CommandDict::new("time_analyze").write_msgpack(&path).unwrap();
        assert_eq!(
            CommandDict::read_msgpack(&path).unwrap().command,
            "time_analyze"
        );
    }
}
