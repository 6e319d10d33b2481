use crate::descriptor::{JobDescriptor, JobTemplate};
use crate::grid::ParameterGrid;
use crate::kernels::KernelProvider;
use crate::line_format::{decode_descriptor, encode_descriptor};
use crate::JobError;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fresh run, previous content is discarded.
    Truncate,
    /// Augment an existing job-input file.
    Append,
}

pub struct JobInputWriter {
    out: BufWriter<File>,
    written: usize,
}

impl JobInputWriter {
    pub fn create(path: impl AsRef<Path>, mode: WriteMode) -> Result<Self, JobError> {
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Truncate => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        let file = options.open(path)?;
        Ok(JobInputWriter {
            out: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write(&mut self, job: &JobDescriptor) -> Result<(), JobError> {
        let line = encode_descriptor(job)?;
        writeln!(self.out, "{}", line)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes and returns the number of lines written by this writer.
    pub fn finish(mut self) -> Result<usize, JobError> {
        self.out.flush()?;
        Ok(self.written)
    }
}

/// Writes one line per (valid combination, kernel) and returns the task count.
pub fn write_grid_jobs(
    path: impl AsRef<Path>,
    mode: WriteMode,
    grid: &ParameterGrid,
    template: &JobTemplate,
    kernels: &impl KernelProvider,
) -> Result<usize, JobError> {
    let mut writer = JobInputWriter::create(path, mode)?;
    for combination in grid.valid_combinations() {
        for job in template.combination_descriptors(&combination, kernels) {
            writer.write(&job)?;
        }
    }
    let n_tasks = writer.finish()?;
    log::debug!("wrote {} job lines", n_tasks);
    Ok(n_tasks)
}

pub fn read_job_input(path: impl AsRef<Path>) -> Result<Vec<JobDescriptor>, JobError> {
    let reader = BufReader::new(File::open(path)?);
    let mut jobs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        jobs.push(decode_descriptor(&line, i + 1)?);
    }
    Ok(jobs)
}
