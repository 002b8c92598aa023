use crate::error::{PfResult, PolicyForgeError};
use clap::Args;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One decision variable and its closed search interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBound {
    pub name: String,
    pub low: f64,
    pub high: f64,
}

impl ParameterBound {
    pub fn new(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            low,
            high,
        }
    }

    #[inline(always)]
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    #[inline(always)]
    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.low, self.high)
    }

    #[inline(always)]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Ordered list of decision variables. Declaration order from the
/// configuration document is preserved; it fixes the column order of
/// every table we write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSpace {
    bounds: Vec<ParameterBound>,
}

impl ParameterSpace {
    pub fn new(bounds: Vec<ParameterBound>) -> Self {
        Self { bounds }
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn bounds(&self) -> &[ParameterBound] {
        &self.bounds
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bounds.iter().map(|b| b.name.as_str())
    }

    pub fn clip(&self, values: &mut [f64]) {
        for (v, b) in values.iter_mut().zip(&self.bounds) {
            *v = b.clip(*v);
        }
    }

    pub fn contains(&self, values: &[f64]) -> bool {
        values.len() == self.bounds.len()
            && values.iter().zip(&self.bounds).all(|(&v, b)| b.contains(v))
    }

    /// Pairs each parameter name with its value, in declaration order.
    pub fn bind<'a>(&'a self, values: &'a [f64]) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.bounds
            .iter()
            .zip(values.iter())
            .map(|(b, &v)| (b.name.as_str(), v))
    }

    fn validate(&self) -> PfResult<()> {
        if self.bounds.is_empty() {
            return Err(PolicyForgeError::Config(
                "PARAM_BOUNDS must declare at least one parameter".into(),
            ));
        }

        let mut seen = HashSet::new();
        for b in &self.bounds {
            if !seen.insert(b.name.as_str()) {
                return Err(PolicyForgeError::Config(format!(
                    "Parameter '{}' is declared twice",
                    b.name
                )));
            }
            if !b.low.is_finite() || !b.high.is_finite() {
                return Err(PolicyForgeError::Config(format!(
                    "Bounds of '{}' must be finite",
                    b.name
                )));
            }
            if b.low > b.high {
                return Err(PolicyForgeError::Config(format!(
                    "Bounds of '{}' are inverted: [{}, {}]",
                    b.name, b.low, b.high
                )));
            }
        }
        Ok(())
    }
}

// serde_json's default map is sorted, so PARAM_BOUNDS is read through a
// visitor that keeps entries in document order.
impl<'de> Deserialize<'de> for ParameterSpace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpaceVisitor;

        impl<'de> Visitor<'de> for SpaceVisitor {
            type Value = ParameterSpace;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of parameter name to [low, high]")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut bounds = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, [low, high])) = access.next_entry::<String, [f64; 2]>()? {
                    bounds.push(ParameterBound { name, low, high });
                }
                Ok(ParameterSpace { bounds })
            }
        }

        deserializer.deserialize_map(SpaceVisitor)
    }
}

impl Serialize for ParameterSpace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.bounds.len()))?;
        for b in &self.bounds {
            map.serialize_entry(&b.name, &[b.low, b.high])?;
        }
        map.end()
    }
}

/// The run configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub param_bounds: ParameterSpace,
    pub max_ticks: u64,
    pub netlogo_path: PathBuf,
    pub model_path: PathBuf,

    // === SEARCH ===
    #[serde(default = "default_replicates")]
    pub n_replicates: usize,
    #[serde(default = "default_pop_size")]
    pub pop_size: usize,
    #[serde(default = "default_generations")]
    pub n_generations: usize,
    #[serde(default = "default_offsprings")]
    pub n_offsprings: usize,
    #[serde(default = "default_crossover_prob")]
    pub crossover_prob: f64,
    #[serde(default = "default_crossover_eta")]
    pub crossover_eta: f64,
    #[serde(default = "default_mutation_eta")]
    pub mutation_eta: f64,
    #[serde(default)]
    pub mutation_prob: Option<f64>,
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,

    // === SIMULATION ===
    #[serde(default)]
    pub fixed_seed: bool,
    #[serde(default)]
    pub n_threads: Option<usize>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_skip_rows")]
    pub skip_rows: usize,
    #[serde(default)]
    pub strict_metrics: bool,
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    // === OUTPUT ===
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,
    #[serde(default = "default_result_path")]
    pub result_path: PathBuf,
}

fn default_replicates() -> usize {
    1
}
fn default_pop_size() -> usize {
    20
}
fn default_generations() -> usize {
    10
}
fn default_offsprings() -> usize {
    10
}
fn default_crossover_prob() -> f64 {
    0.9
}
fn default_crossover_eta() -> f64 {
    15.0
}
fn default_mutation_eta() -> f64 {
    20.0
}
fn default_seed() -> Option<u64> {
    Some(1)
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_skip_rows() -> usize {
    6
}
fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("pareto_results_checkpoint.csv")
}
fn default_result_path() -> PathBuf {
    PathBuf::from("pareto_results_final.csv")
}

/// Command line overrides layered on top of the configuration document.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    #[arg(long)]
    pub generations: Option<usize>,
    #[arg(long)]
    pub pop_size: Option<usize>,
    #[arg(long)]
    pub replicates: Option<usize>,
    #[arg(long)]
    pub threads: Option<usize>,
    #[arg(short = 'S', long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> PfResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PolicyForgeError::Config(format!("Could not read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> PfResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn merge_overrides(&mut self, overrides: &RunOverrides) -> PfResult<()> {
        macro_rules! update_if_present {
            ($field:ident, $value:expr) => {
                if let Some(v) = $value.clone() {
                    self.$field = v;
                }
            };
        }

        update_if_present!(n_generations, overrides.generations);
        update_if_present!(pop_size, overrides.pop_size);
        update_if_present!(n_replicates, overrides.replicates);
        update_if_present!(checkpoint_path, overrides.checkpoint);
        update_if_present!(result_path, overrides.output);
        if overrides.threads.is_some() {
            self.n_threads = overrides.threads;
        }
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }

        self.validate()
    }

    pub fn validate(&self) -> PfResult<()> {
        self.param_bounds.validate()?;

        let positive = [
            ("MAX_TICKS", self.max_ticks as usize),
            ("N_REPLICATES", self.n_replicates),
            ("N_GENERATIONS", self.n_generations),
            ("N_OFFSPRINGS", self.n_offsprings),
            ("TIMEOUT_SECS", self.timeout_secs as usize),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(PolicyForgeError::Config(format!("{} must be >= 1", key)));
            }
        }
        if self.pop_size < 2 {
            return Err(PolicyForgeError::Config("POP_SIZE must be >= 2".into()));
        }
        if self.fixed_seed {
            // replicate seeds run up to SEED + N_REPLICATES - 1 and must fit
            // NetLogo's signed 32-bit random-seed
            let base = self.seed.unwrap_or(0);
            let last = base.checked_add(self.n_replicates as u64 - 1);
            if last.map_or(true, |s| s > i32::MAX as u64) {
                return Err(PolicyForgeError::Config(format!(
                    "SEED {} with {} replicates exceeds the simulator seed range (max {})",
                    base,
                    self.n_replicates,
                    i32::MAX
                )));
            }
        }
        if self.n_threads == Some(0) {
            return Err(PolicyForgeError::Config("N_THREADS must be >= 1".into()));
        }

        let probabilities = [
            ("CROSSOVER_PROB", Some(self.crossover_prob)),
            ("MUTATION_PROB", self.mutation_prob),
        ];
        for (key, value) in probabilities {
            if let Some(p) = value {
                if !(0.0..=1.0).contains(&p) {
                    return Err(PolicyForgeError::Config(format!(
                        "{} must lie in [0, 1], got {}",
                        key, p
                    )));
                }
            }
        }

        for (key, eta) in [
            ("CROSSOVER_ETA", self.crossover_eta),
            ("MUTATION_ETA", self.mutation_eta),
        ] {
            if !eta.is_finite() || eta < 0.0 {
                return Err(PolicyForgeError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    key, eta
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn worker_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
