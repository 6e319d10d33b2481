use crate::command::JobFiles;
use crate::DriverError;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::time::Instant;

/// A submitted job.
#[derive(Debug)]
pub struct JobHandle {
    pub id: String,
    pub output_path: PathBuf,
    pub submitted: Instant,
    pub(crate) process: Option<Child>,
}

impl JobHandle {
    /// Handle for a job that is not backed by a local child process.
    pub fn detached(id: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        JobHandle {
            id: id.into(),
            output_path: output_path.into(),
            submitted: Instant::now(),
            process: None,
        }
    }

    pub(crate) fn with_process(
        id: impl Into<String>,
        output_path: impl Into<PathBuf>,
        process: Child,
    ) -> Self {
        JobHandle {
            process: Some(process),
            ..JobHandle::detached(id, output_path)
        }
    }
}

/// Something that can run a job input file on a cluster.
///
/// `wait` blocks until the job finished or gave up; it reports failure as `false`
/// and logs the reason, so that callers only need to branch on the outcome.
pub trait ClusterEngine {
    fn submit(&mut self, files: &JobFiles, n_tasks: usize) -> Result<JobHandle, DriverError>;
    fn wait(&mut self, handle: &mut JobHandle) -> bool;
    /// Copies the merged job output to `destination` on the local machine.
    fn fetch(&mut self, handle: &JobHandle, destination: &Path) -> Result<(), DriverError>;
}

impl<E: ClusterEngine + ?Sized> ClusterEngine for &mut E {
    fn submit(&mut self, files: &JobFiles, n_tasks: usize) -> Result<JobHandle, DriverError> {
        (**self).submit(files, n_tasks)
    }

    fn wait(&mut self, handle: &mut JobHandle) -> bool {
        (**self).wait(handle)
    }

    fn fetch(&mut self, handle: &JobHandle, destination: &Path) -> Result<(), DriverError> {
        (**self).fetch(handle, destination)
    }
}
