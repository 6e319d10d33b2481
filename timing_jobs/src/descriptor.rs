use crate::grid::ParameterCombination;
use crate::kernels::KernelProvider;
use crate::JobError;
use serde_json::{Map, Value};

pub type JobArgs = Map<String, Value>;

pub const KERNEL_LIST: &str = "kernel_list";
pub const SEED: &str = "SEED";
pub const N_STEPS: &str = "n_steps";
pub const COMMAND: &str = "command";
pub const TIME_ANALYZE: &str = "time_analyze";

/// One line of work for the engine. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescriptor {
    key: String,
    args: JobArgs,
}

impl JobDescriptor {
    pub(crate) fn from_parts(key: String, args: JobArgs) -> Self {
        JobDescriptor { key, args }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn args(&self) -> &JobArgs {
        &self.args
    }

    /// The single kernel this job times.
    pub fn kernel(&self) -> Option<&str> {
        match self.args.get(KERNEL_LIST)? {
            Value::Array(list) if list.len() == 1 => list[0].as_str(),
            _ => None,
        }
    }

    pub fn combination(&self) -> Result<ParameterCombination, JobError> {
        let field = |name: &str| {
            self.args
                .get(name)
                .and_then(Value::as_u64)
                .ok_or_else(|| JobError::MissingField(name.to_owned()))
        };
        Ok(ParameterCombination::new(
            field("num_rows")?,
            field("num_cols")?,
            field("num_clusters")?,
            field("num_views")?,
        ))
    }
}

/// Shared arguments applied to every job of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTemplate {
    key: String,
    shared: JobArgs,
}

/// The engine's defaults for an analyze call.
pub fn default_analyze_args() -> JobArgs {
    let mut args = Map::new();
    args.insert(COMMAND.to_owned(), Value::from("analyze"));
    args.insert(KERNEL_LIST.to_owned(), Value::Array(Vec::new()));
    args.insert(N_STEPS.to_owned(), Value::from(1));
    args.insert("c".to_owned(), Value::Array(Vec::new()));
    args.insert("r".to_owned(), Value::Array(Vec::new()));
    args.insert("max_time".to_owned(), Value::from(-1));
    args
}

impl JobTemplate {
    pub fn time_analyze(seed: u64, n_steps: u64) -> Self {
        let mut shared = default_analyze_args();
        shared.insert(COMMAND.to_owned(), Value::from(TIME_ANALYZE));
        shared.insert(SEED.to_owned(), Value::from(seed));
        shared.insert(N_STEPS.to_owned(), Value::from(n_steps));
        JobTemplate {
            key: seed.to_string(),
            shared,
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.shared.insert(name.into(), value.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shared(&self) -> &JobArgs {
        &self.shared
    }

    /// Payload first, then the shared arguments, then the kernel selector.
    pub fn descriptor(&self, payload: &JobArgs, kernel: &str) -> JobDescriptor {
        let mut args = payload.clone();
        for (name, value) in self.shared.iter() {
            args.insert(name.clone(), value.clone());
        }
        // the selector goes in last, shared defaults carry an empty one
        args.remove(KERNEL_LIST);
        args.insert(
            KERNEL_LIST.to_owned(),
            Value::Array(vec![Value::from(kernel)]),
        );
        JobDescriptor::from_parts(self.key.clone(), args)
    }

    pub fn descriptors(
        &self,
        payload: &JobArgs,
        kernels: &impl KernelProvider,
    ) -> Vec<JobDescriptor> {
        kernels
            .kernel_names()
            .iter()
            .map(|kernel| self.descriptor(payload, kernel))
            .collect()
    }

    pub fn combination_descriptors(
        &self,
        combination: &ParameterCombination,
        kernels: &impl KernelProvider,
    ) -> Vec<JobDescriptor> {
        self.descriptors(&combination.to_args(), kernels)
    }
}
