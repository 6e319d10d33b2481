use cluster_driver::JobFiles;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use timing_results::{
    CommandDict, RunManifest, TableData, JOB_OUTPUT_FILENAME, PARSED_OUTPUT_FILENAME,
};

pub const DEFAULT_BASE_DIR: &str = "runtime_analysis";
pub const JOB_INPUT_FILENAME: &str = "hadoop_input";
pub const CLUSTER_OUTPUT_DIRNAME: &str = "output";

/// Per-run directory, `<base>/runtime_analysis_<timestamp>_<pid>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    fn dir_name() -> String {
        format!(
            "runtime_analysis_{}_{}",
            chrono::Local::now().format("%Y%m%d-%H%M%S"),
            std::process::id()
        )
    }

    /// Paths of a fresh run; nothing is created.
    pub fn planned(base: impl AsRef<Path>) -> Self {
        RunDirectory {
            root: base.as_ref().join(Self::dir_name()),
        }
    }

    /// Creates the directory, with a numeric suffix if the name is taken.
    pub fn create(base: impl AsRef<Path>) -> io::Result<Self> {
        let base = base.as_ref();
        fs::create_dir_all(base)?;
        let name = Self::dir_name();
        let mut root = base.join(&name);
        let mut suffix = 0;
        loop {
            match fs::create_dir(&root) {
                Ok(()) => return Ok(RunDirectory { root }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                    root = base.join(format!("{}_{}", name, suffix));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Paths of an existing run; nothing is checked.
    pub fn at(path: impl AsRef<Path>) -> Self {
        RunDirectory {
            root: path.as_ref().to_path_buf(),
        }
    }

    /// An earlier run directory, which must hold a job input and a manifest.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let dir = Self::at(path);
        for file in [dir.job_input(), dir.manifest()] {
            if !file.is_file() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "{} is not a run directory, {} is missing",
                        dir.root.display(),
                        file.display()
                    ),
                ));
            }
        }
        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn table_data(&self) -> PathBuf {
        self.root.join(TableData::FILENAME)
    }

    pub fn command_dict(&self) -> PathBuf {
        self.root.join(CommandDict::FILENAME)
    }

    pub fn job_input(&self) -> PathBuf {
        self.root.join(JOB_INPUT_FILENAME)
    }

    pub fn job_output(&self) -> PathBuf {
        self.root.join(JOB_OUTPUT_FILENAME)
    }

    pub fn cluster_output(&self) -> PathBuf {
        self.root.join(CLUSTER_OUTPUT_DIRNAME)
    }

    pub fn parsed_output(&self) -> PathBuf {
        self.root.join(PARSED_OUTPUT_FILENAME)
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(RunManifest::FILENAME)
    }

    pub fn job_files(&self) -> JobFiles {
        JobFiles {
            input_filename: self.job_input(),
            table_data_filename: self.table_data(),
            command_dict_filename: self.command_dict(),
            output_path: self.cluster_output(),
        }
    }
}
