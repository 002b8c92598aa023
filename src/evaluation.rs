use crate::config::Config;
use crate::core_types::Objectives;
use crate::simulation::{ReplicateFailure, ReplicateResult, SimulationAdapter};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Anything that turns a parameter vector into an objective vector.
/// Implementations never fail; an unusable evaluation yields
/// [`Objectives::PENALTY`].
pub trait ObjectiveFunction {
    fn evaluate(&mut self, params: &[f64]) -> Objectives;
}

/// How replicate seeds are chosen.
#[derive(Debug, Clone)]
pub enum SeedPolicy {
    /// `base + replicate_id` for every evaluation.
    Fixed(u64),
    /// Freshly drawn for every replicate of every evaluation.
    /// Seeded from `SEED` when one is configured.
    Fresh(fastrand::Rng),
}

impl SeedPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        match (cfg.fixed_seed, cfg.seed) {
            (true, seed) => SeedPolicy::Fixed(seed.unwrap_or(0)),
            // Distinct stream from the search RNG, still reproducible.
            (false, Some(seed)) => SeedPolicy::Fresh(fastrand::Rng::with_seed(seed ^ 0x5eed_5eed)),
            (false, None) => SeedPolicy::Fresh(fastrand::Rng::new()),
        }
    }

    fn draw(&mut self, count: usize) -> Vec<u64> {
        match self {
            SeedPolicy::Fixed(base) => (0..count as u64).map(|i| base.wrapping_add(i)).collect(),
            // NetLogo's random-seed accepts values in the signed 32-bit range.
            SeedPolicy::Fresh(rng) => (0..count).map(|_| rng.u64(0..=i32::MAX as u64)).collect(),
        }
    }
}

/// Arithmetic mean of each metric over the successful replicates,
/// converted to minimization form. `None` when there are no results.
pub fn aggregate(results: &[ReplicateResult]) -> Option<Objectives> {
    if results.is_empty() {
        return None;
    }
    let n = results.len() as f64;
    let (innov, div, gini) = results.iter().fold((0.0, 0.0, 0.0), |acc, r| {
        (
            acc.0 + r.metrics.innovation,
            acc.1 + r.metrics.diversity,
            acc.2 + r.metrics.gini,
        )
    });
    Some(Objectives::from_metrics(innov / n, div / n, gini / n))
}

/// Runs `replicates` independent simulations per evaluation on a worker
/// pool and averages the survivors.
pub struct Evaluator<A: SimulationAdapter> {
    adapter: A,
    replicates: usize,
    threads: usize,
    seeds: SeedPolicy,
    evaluations: usize,
    failed_evaluations: usize,
}

impl<A: SimulationAdapter> Evaluator<A> {
    pub fn new(adapter: A, replicates: usize, threads: usize, seeds: SeedPolicy) -> Self {
        Self {
            adapter,
            replicates: replicates.max(1),
            threads: threads.max(1),
            seeds,
            evaluations: 0,
            failed_evaluations: 0,
        }
    }

    pub fn from_config(adapter: A, cfg: &Config) -> Self {
        Self::new(
            adapter,
            cfg.n_replicates,
            cfg.worker_threads(),
            SeedPolicy::from_config(cfg),
        )
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn failed_evaluations(&self) -> usize {
        self.failed_evaluations
    }

    /// Dispatches every replicate and blocks until all have finished or
    /// failed. The pool lives only for this call.
    fn run_replicates(&self, params: &[f64], seeds: &[u64]) -> Vec<Result<ReplicateResult, ReplicateFailure>> {
        let dispatch = || {
            seeds
                .par_iter()
                .enumerate()
                .map(|(id, &seed)| self.adapter.run(params, id, seed))
                .collect::<Vec<_>>()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads.min(seeds.len()))
            .build()
        {
            Ok(pool) => pool.install(dispatch),
            Err(e) => {
                warn!("⚠️  Could not build replicate pool ({}), running sequentially", e);
                seeds
                    .iter()
                    .enumerate()
                    .map(|(id, &seed)| self.adapter.run(params, id, seed))
                    .collect()
            }
        }
    }
}

impl<A: SimulationAdapter> ObjectiveFunction for Evaluator<A> {
    fn evaluate(&mut self, params: &[f64]) -> Objectives {
        let seeds = self.seeds.draw(self.replicates);
        let outcomes = self.run_replicates(params, &seeds);
        self.evaluations += 1;

        let mut successes = Vec::with_capacity(outcomes.len());
        let mut failures: BTreeMap<&'static str, usize> = BTreeMap::new();
        for (id, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(r) => successes.push(r),
                Err(e) => {
                    debug!("   Replicate {} (seed {}) failed: {}", id, seeds[id], e);
                    *failures.entry(e.kind()).or_default() += 1;
                }
            }
        }

        match aggregate(&successes) {
            Some(objectives) => {
                let v = objectives.values();
                info!(
                    "   Eval: Innov~{:.0} Div~{:.2} Gini~{:.2} ({}/{} replicates)",
                    -v[0],
                    -v[1],
                    v[2],
                    successes.len(),
                    self.replicates
                );
                if !failures.is_empty() {
                    debug!("   Discarded replicates: {:?}", failures);
                }
                objectives
            }
            None => {
                self.failed_evaluations += 1;
                warn!(
                    "❌ All {} replicates failed ({:?}); assigning penalty",
                    self.replicates, failures
                );
                Objectives::PENALTY
            }
        }
    }
}

impl<F: FnMut(&[f64]) -> Objectives> ObjectiveFunction for F {
    fn evaluate(&mut self, params: &[f64]) -> Objectives {
        self(params)
    }
}
