pub mod descriptor;
pub mod netlogo;
pub mod process;
pub mod table;

use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumIter};
use thiserror::Error;

pub use self::netlogo::NetLogoAdapter;

/// The three reporters read from the simulator's final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr, Display)]
pub enum Metric {
    #[strum(serialize = "total-innovation-output")]
    Innovation,
    #[strum(serialize = "cultural-diversity-index")]
    Diversity,
    #[strum(serialize = "gini-coefficient")]
    Gini,
}

/// Raw metric values of one simulation run, in the simulator's own sense
/// (innovation and diversity are "higher is better").
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub innovation: f64,
    pub diversity: f64,
    pub gini: f64,
}

impl Metrics {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Innovation => self.innovation,
            Metric::Diversity => self.diversity,
            Metric::Gini => self.gini,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Innovation => self.innovation = value,
            Metric::Diversity => self.diversity = value,
            Metric::Gini => self.gini = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicateResult {
    pub metrics: Metrics,
    pub seed: u64,
}

/// Why a replicate produced no usable metrics.
#[derive(Error, Debug)]
pub enum ReplicateFailure {
    #[error("could not launch simulator: {0}")]
    Spawn(std::io::Error),

    #[error("simulator exceeded {0:?} and was killed")]
    Timeout(Duration),

    #[error("simulator exited with status {0:?}")]
    NonZeroExit(Option<i32>),

    #[error("simulator wrote no output table")]
    MissingOutput,

    #[error("output table has no data rows")]
    EmptyTable,

    #[error("output table could not be parsed: {0}")]
    Parse(String),

    #[error("metric '{0}' is absent from the output table")]
    MissingMetric(Metric),

    #[error("metric '{0}' is not a finite number")]
    NonFiniteMetric(Metric),

    #[error("temp file error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplicateFailure {
    /// Short label used when tallying failures in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ReplicateFailure::Spawn(_) => "spawn",
            ReplicateFailure::Timeout(_) => "timeout",
            ReplicateFailure::NonZeroExit(_) => "exit",
            ReplicateFailure::MissingOutput => "no-output",
            ReplicateFailure::EmptyTable => "empty",
            ReplicateFailure::Parse(_) => "parse",
            ReplicateFailure::MissingMetric(_) => "missing-metric",
            ReplicateFailure::NonFiniteMetric(_) => "non-finite",
            ReplicateFailure::Io(_) => "io",
        }
    }
}

/// Runs one independent replicate of the simulation for a parameter
/// vector. Implementations must be safe to call concurrently and must
/// report every failure through the return value.
pub trait SimulationAdapter: Send + Sync {
    fn run(
        &self,
        params: &[f64],
        replicate_id: usize,
        seed: u64,
    ) -> Result<ReplicateResult, ReplicateFailure>;
}

impl<A: SimulationAdapter + ?Sized> SimulationAdapter for std::sync::Arc<A> {
    fn run(
        &self,
        params: &[f64],
        replicate_id: usize,
        seed: u64,
    ) -> Result<ReplicateResult, ReplicateFailure> {
        (**self).run(params, replicate_id, seed)
    }
}

impl<A: SimulationAdapter + ?Sized> SimulationAdapter for &A {
    fn run(
        &self,
        params: &[f64],
        replicate_id: usize,
        seed: u64,
    ) -> Result<ReplicateResult, ReplicateFailure> {
        (**self).run(params, replicate_id, seed)
    }
}
