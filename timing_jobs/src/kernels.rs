use crate::JobError;
use std::path::Path;

/// Transition kernels known to the inference engine.
pub const DEFAULT_KERNELS: [&str; 5] = [
    "column_partition_hyperparameter",
    "column_partition_assignments",
    "column_hyperparameters",
    "row_partition_hyperparameters",
    "row_partition_assignments",
];

/// Source of the kernel names to benchmark, one job per name.
pub trait KernelProvider {
    fn kernel_names(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedKernels(pub Vec<String>);

impl Default for FixedKernels {
    fn default() -> Self {
        FixedKernels(DEFAULT_KERNELS.iter().map(|s| s.to_string()).collect())
    }
}

impl FixedKernels {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FixedKernels(names.into_iter().map(Into::into).collect())
    }
}

impl KernelProvider for FixedKernels {
    fn kernel_names(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl<T: KernelProvider + ?Sized> KernelProvider for &T {
    fn kernel_names(&self) -> Vec<String> {
        (**self).kernel_names()
    }
}

/// Kernel list exported from the engine registry, one name per line.
/// Blank lines and `#` comments are ignored, duplicates keep their first position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelFile {
    names: Vec<String>,
}

impl KernelFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JobError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut names: Vec<String> = Vec::new();
        for line in contents.lines() {
            let name = match line.split_once('#') {
                Some((before, _comment)) => before,
                None => line,
            }
            .trim();
            if name.is_empty() || names.iter().any(|n| n == name) {
                continue;
            }
            names.push(name.to_owned());
        }
        KernelFile { names }
    }
}

impl KernelProvider for KernelFile {
    fn kernel_names(&self) -> Vec<String> {
        self.names.clone()
    }
}
