use crate::config::{HadoopConfig, NLINE_INPUT_FORMAT};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Files of one run, as seen from the submitting machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFiles {
    pub input_filename: PathBuf,
    pub table_data_filename: PathBuf,
    pub command_dict_filename: PathBuf,
    /// Job output location on the cluster filesystem.
    pub output_path: PathBuf,
}

impl JobFiles {
    /// Name of the staged input on the cluster filesystem.
    pub fn staged_input(&self, config: &HadoopConfig) -> String {
        let name = self
            .input_filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("hadoop_input"));
        config.hdfs_path(&name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HadoopCommand {
    pub program: String,
    pub args: Vec<String>,
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.to_owned()
    }
}

impl HadoopCommand {
    /// Shell-ready rendering, for the operator.
    pub fn to_command_string(&self) -> String {
        let mut parts = vec![quote(&self.program)];
        parts.extend(self.args.iter().map(|a| quote(a)));
        parts.join(" ")
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Streaming job running `engine_binary` as mapper over `n_tasks` input lines.
pub fn hadoop_command(
    config: &HadoopConfig,
    engine_binary: &str,
    files: &JobFiles,
    n_tasks: usize,
) -> HadoopCommand {
    let mut args: Vec<String> = vec![String::from("jar"), config.hadoop_jar.clone()];
    // generic options first, the streaming jar rejects them after its own
    args.push(String::from("-D"));
    args.push(format!("mapred.task.timeout={}", config.task_timeout_ms));
    args.push(String::from("-D"));
    args.push(format!("mapred.map.tasks={}", n_tasks));
    args.push(String::from("-D"));
    args.push(format!("mapred.child.java.opts={}", config.child_java_opts));
    if let Some(uri) = &config.hdfs_uri {
        args.push(String::from("-fs"));
        args.push(uri.clone());
    }
    if let Some(uri) = &config.jobtracker_uri {
        args.push(String::from("-jt"));
        args.push(uri.clone());
    }
    args.extend([
        String::from("-input"),
        files.staged_input(config),
        String::from("-output"),
        path_arg(&files.output_path),
        String::from("-mapper"),
        engine_binary.to_owned(),
        String::from("-reducer"),
        String::from("/bin/cat"),
        String::from("-file"),
        path_arg(&files.table_data_filename),
        String::from("-file"),
        path_arg(&files.command_dict_filename),
    ]);
    if config.one_map_task_per_line {
        args.push(String::from("-inputformat"));
        args.push(String::from(NLINE_INPUT_FORMAT));
    }
    HadoopCommand {
        program: config.hadoop_binary.clone(),
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> JobFiles {
        JobFiles {
            input_filename: PathBuf::from("runtime_analysis/run_1/hadoop_input"),
            table_data_filename: PathBuf::from("runtime_analysis/run_1/table_data.msgpack.zst"),
            command_dict_filename: PathBuf::from("runtime_analysis/run_1/command_dict.msgpack"),
            output_path: PathBuf::from("runtime_analysis/run_1/output"),
        }
    }

    #[test]
    fn command_contents() {
        let config = HadoopConfig::default();
        let command = hadoop_command(&config, "/opt/engine/line_processor", &files(), 20);
        let s = command.to_command_string();
        assert!(s.starts_with("hadoop jar /usr/lib/hadoop-0.20/"));
        assert!(s.contains("-D mapred.map.tasks=20"));
        assert!(s.contains("-input /user/bigdata/SSCI/hadoop_input"));
        assert!(s.contains("-output runtime_analysis/run_1/output"));
        assert!(s.contains("-mapper /opt/engine/line_processor"));
        assert!(s.contains("-file runtime_analysis/run_1/table_data.msgpack.zst"));
        assert!(s.ends_with(NLINE_INPUT_FORMAT));
        assert!(!s.contains("-jt"));
        assert!(!s.contains('\n'));
    }

    #[test]
    fn optional_uris() {
        let config = HadoopConfig {
            hdfs_uri: Some(String::from("hdfs://namenode:8020")),
            jobtracker_uri: Some(String::from("jt:8021")),
            one_map_task_per_line: false,
            ..HadoopConfig::default()
        };
        let command = hadoop_command(&config, "engine", &files(), 1);
        let s = command.to_command_string();
        assert!(s.contains("-fs hdfs://namenode:8020 -jt jt:8021 -input"));
        assert!(!s.contains("-inputformat"));
    }

    #[test]
    fn quoting() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("two words"), "'two words'");
        assert_eq!(quote("it's"), "'it'\\''s'");
        assert_eq!(quote(""), "''");
    }
}
