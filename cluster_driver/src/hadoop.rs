//! Hadoop streaming backend, driving the `hadoop` command line tool.

use crate::command::{hadoop_command, HadoopCommand, JobFiles};
use crate::config::HadoopConfig;
use crate::engine::{ClusterEngine, JobHandle};
use crate::DriverError;
use log::{debug, info, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::Path;
use std::process::{Child, Command, ExitStatus};
use std::thread::sleep;
use std::time::{Duration, Instant};

const TERMINATE_GRACE: Duration = Duration::from_secs(5);

pub struct HadoopEngine {
    config: HadoopConfig,
    engine_binary: String,
}

impl HadoopEngine {
    pub fn new(config: HadoopConfig, engine_binary: impl Into<String>) -> Self {
        HadoopEngine {
            config,
            engine_binary: engine_binary.into(),
        }
    }

    pub fn config(&self) -> &HadoopConfig {
        &self.config
    }

    /// The streaming command `submit` will spawn.
    pub fn command(&self, files: &JobFiles, n_tasks: usize) -> HadoopCommand {
        hadoop_command(&self.config, &self.engine_binary, files, n_tasks)
    }

    fn fs(&self, args: &[&str]) -> Result<ExitStatus, DriverError> {
        debug!("{} fs {}", self.config.hadoop_binary, args.join(" "));
        Command::new(&self.config.hadoop_binary)
            .arg("fs")
            .args(args)
            .status()
            .map_err(|source| DriverError::Spawn {
                program: self.config.hadoop_binary.clone(),
                source,
            })
    }

    fn fs_checked(&self, args: &[&str]) -> Result<(), DriverError> {
        let status = self.fs(args)?;
        if status.success() {
            Ok(())
        } else {
            Err(DriverError::CommandFailed {
                command: format!("{} fs {}", self.config.hadoop_binary, args.join(" ")),
                status,
            })
        }
    }

    fn output_exists(&self, output_path: &Path) -> bool {
        let marker = output_path.join("_SUCCESS");
        let marker = marker.to_string_lossy();
        match self.fs(&["-test", "-e", &marker]) {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("Could not check {}: {}", marker, e);
                false
            }
        }
    }
}

/// SIGTERM first, SIGKILL if the process is still around after the grace period.
fn terminate(child: &mut Child) {
    let pid = Pid::from_raw(child.id() as i32);
    if let Err(e) = kill(pid, Signal::SIGTERM) {
        warn!("SIGTERM to {} failed: {}", pid, e);
    }
    let start = Instant::now();
    while start.elapsed() < TERMINATE_GRACE {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => sleep(Duration::from_millis(100)),
            Err(_) => break,
        }
    }
    if let Err(e) = child.kill() {
        warn!("kill of {} failed: {}", pid, e);
    }
    let _ = child.wait();
}

impl ClusterEngine for HadoopEngine {
    fn submit(&mut self, files: &JobFiles, n_tasks: usize) -> Result<JobHandle, DriverError> {
        let staged = files.staged_input(&self.config);
        let input = files.input_filename.to_string_lossy();
        let output = files.output_path.to_string_lossy();

        // mkdir fails when the directory exists, which is fine
        if !self.fs(&["-mkdir", "-p", &self.config.hdfs_dir])?.success() {
            debug!("Could not create {}", self.config.hdfs_dir);
        }
        self.fs_checked(&["-put", "-f", &input, &staged])?;
        if !self.fs(&["-rm", "-r", "-f", &output])?.success() {
            debug!("No previous output at {}", output);
        }

        let command = self.command(files, n_tasks);
        info!("Submitting: {}", command.to_command_string());
        let child = command
            .to_command()
            .spawn()
            .map_err(|source| DriverError::Spawn {
                program: command.program.clone(),
                source,
            })?;
        let id = format!("hadoop-{}", child.id());
        Ok(JobHandle::with_process(id, files.output_path.clone(), child))
    }

    fn wait(&mut self, handle: &mut JobHandle) -> bool {
        let timeout = self.config.wait_timeout();
        let poll = self.config.poll_interval();
        let finished = match handle.process.as_mut() {
            None => true,
            Some(child) => loop {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        if !status.success() {
                            warn!("Job {} exited with {}", handle.id, status);
                        }
                        break status.success();
                    }
                    Ok(None) => {
                        if handle.submitted.elapsed() >= timeout {
                            warn!(
                                "Job {} still running after {:?}, terminating",
                                handle.id, timeout
                            );
                            terminate(child);
                            break false;
                        }
                        sleep(poll);
                    }
                    Err(e) => {
                        warn!("Lost track of job {}: {}", handle.id, e);
                        break false;
                    }
                }
            },
        };
        handle.process = None;
        finished && self.output_exists(&handle.output_path)
    }

    fn fetch(&mut self, handle: &JobHandle, destination: &Path) -> Result<(), DriverError> {
        let output = handle.output_path.to_string_lossy();
        let destination = destination.to_string_lossy();
        self.fs_checked(&["-getmerge", &output, &destination])
    }
}
