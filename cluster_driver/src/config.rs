//! Cluster settings, loadable from a TOML file.
//!
//! ```toml
//! hadoop_binary = "hadoop"
//! hdfs_dir = "/user/bigdata/SSCI/"
//! jobtracker_uri = "jobtracker.example:8021"
//! wait_timeout_secs = 21600
//! ```
//!
//! Missing keys take their default value.

use crate::DriverError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const NLINE_INPUT_FORMAT: &str = "org.apache.hadoop.mapred.lib.NLineInputFormat";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HadoopConfig {
    pub hadoop_binary: String,
    /// Streaming jar handed to `hadoop jar`.
    pub hadoop_jar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdfs_uri: Option<String>,
    /// Where job inputs are staged on the distributed filesystem.
    pub hdfs_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobtracker_uri: Option<String>,
    /// Mapper used when the command line does not name one.
    pub default_engine_binary: String,
    pub task_timeout_ms: u64,
    pub child_java_opts: String,
    pub one_map_task_per_line: bool,
    /// Upper bound of the blocking wait for a submitted job.
    pub wait_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for HadoopConfig {
    fn default() -> Self {
        HadoopConfig {
            hadoop_binary: String::from("hadoop"),
            hadoop_jar: String::from(
                "/usr/lib/hadoop-0.20/contrib/streaming/hadoop-streaming-0.20.2-cdh3u2.jar",
            ),
            hdfs_uri: None,
            hdfs_dir: String::from("/user/bigdata/SSCI/"),
            jobtracker_uri: None,
            default_engine_binary: String::from("/user/bigdata/SSCI/hadoop_line_processor.jar"),
            task_timeout_ms: 60_000_000,
            child_java_opts: String::from("-Xmx8G"),
            one_map_task_per_line: true,
            wait_timeout_secs: 6 * 3600,
            poll_interval_ms: 1000,
        }
    }
}

impl HadoopConfig {
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.hadoop_binary.trim().is_empty() {
            return Err(DriverError::Config(String::from("hadoop_binary is empty")));
        }
        if self.hadoop_jar.trim().is_empty() {
            return Err(DriverError::Config(String::from("hadoop_jar is empty")));
        }
        if self.wait_timeout_secs == 0 {
            return Err(DriverError::Config(String::from(
                "wait_timeout_secs must be positive",
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(DriverError::Config(String::from(
                "poll_interval_ms must be positive",
            )));
        }
        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Location of `file_name` inside the staging directory.
    pub fn hdfs_path(&self, file_name: &str) -> String {
        if self.hdfs_dir.ends_with('/') {
            format!("{}{}", self.hdfs_dir, file_name)
        } else {
            format!("{}/{}", self.hdfs_dir, file_name)
        }
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let contents = fs::read_to_string(path)?;
        let config: HadoopConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), DriverError> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.toml");
        fs::write(
            &path,
            "hdfs_dir = \"/scratch/timing\"\njobtracker_uri = \"jt:8021\"\nwait_timeout_secs = 60\n",
        )
        .unwrap();
        let config = HadoopConfig::load_toml(&path).unwrap();
        assert_eq!(config.hdfs_path("hadoop_input"), "/scratch/timing/hadoop_input");
        assert_eq!(config.jobtracker_uri.as_deref(), Some("jt:8021"));
        assert_eq!(config.wait_timeout(), Duration::from_secs(60));
        assert_eq!(config.hadoop_binary, "hadoop");
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.toml");
        let config = HadoopConfig {
            hdfs_uri: Some(String::from("hdfs://namenode:8020")),
            ..HadoopConfig::default()
        };
        config.save_toml(&path).unwrap();
        assert_eq!(HadoopConfig::load_toml(&path).unwrap(), config);
    }

    #[test]
    fn rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.toml");
        fs::write(&path, "wait_timeout_secs = 0\n").unwrap();
        assert!(matches!(
            HadoopConfig::load_toml(&path),
            Err(DriverError::Config(_))
        ));
    }
}
