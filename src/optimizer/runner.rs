use super::crossover::crossover_sbx;
use super::initialization::sample_uniform;
use super::mutation::{default_variable_prob, mutate_polynomial};
use super::selection::{binary_tournament, environmental_selection};
use crate::config::{Config, ParameterSpace};
use crate::core_types::{param_key, Individual, Population};
use crate::error::PfResult;
use crate::evaluation::ObjectiveFunction;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Nsga2Options {
    pub pop_size: usize,
    pub n_offsprings: usize,
    pub generations: usize,
    pub crossover_prob: f64,
    pub crossover_eta: f64,
    pub mutation_eta: f64,
    pub mutation_prob: Option<f64>,
    pub seed: Option<u64>,
    /// Matings tried per requested child before a generation gives up on
    /// filling its offspring quota with unseen points.
    pub max_mating_attempts: usize,
    /// Points evaluated ahead of the random sample in generation 1.
    pub initial_population: Vec<Vec<f64>>,
}

impl From<&Config> for Nsga2Options {
    fn from(cfg: &Config) -> Self {
        Self {
            pop_size: cfg.pop_size,
            n_offsprings: cfg.n_offsprings,
            generations: cfg.n_generations,
            crossover_prob: cfg.crossover_prob,
            crossover_eta: cfg.crossover_eta,
            mutation_eta: cfg.mutation_eta,
            mutation_prob: cfg.mutation_prob,
            seed: cfg.seed,
            max_mating_attempts: 100,
            initial_population: Vec::new(),
        }
    }
}

/// Receives the surviving population at the end of every generation.
/// An error aborts the run.
pub trait GenerationObserver {
    fn on_generation(&mut self, generation: usize, population: &Population) -> PfResult<()>;
}

impl<O: GenerationObserver + ?Sized> GenerationObserver for &mut O {
    fn on_generation(&mut self, generation: usize, population: &Population) -> PfResult<()> {
        (**self).on_generation(generation, population)
    }
}

/// Observer that ignores every generation.
pub struct NoopObserver;

impl GenerationObserver for NoopObserver {
    fn on_generation(&mut self, _generation: usize, _population: &Population) -> PfResult<()> {
        Ok(())
    }
}

pub struct Optimizer {
    space: ParameterSpace,
    options: Nsga2Options,
}

impl Optimizer {
    pub fn new(space: ParameterSpace, options: Nsga2Options) -> Self {
        Self { space, options }
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Runs the full generational loop. Generation 1 is the evaluated
    /// initial population; each later generation evaluates
    /// `n_offsprings` new points and keeps the best `pop_size` of parents
    /// and children.
    pub fn run<F, O>(&self, objective: &mut F, mut observer: O) -> PfResult<Population>
    where
        F: ObjectiveFunction,
        O: GenerationObserver,
    {
        let opts = &self.options;
        let mut rng = match opts.seed {
            Some(s) => fastrand::Rng::with_seed(s),
            None => fastrand::Rng::new(),
        };
        let variable_prob = opts
            .mutation_prob
            .unwrap_or_else(|| default_variable_prob(self.space.len()));
        let start = Instant::now();
        let mut evaluations = 0usize;

        // 1. Initial population
        let initial = self.initial_candidates(&mut rng);
        if initial.len() < opts.pop_size {
            warn!(
                "⚠️  Only {} distinct starting points available for a population of {}",
                initial.len(),
                opts.pop_size
            );
        }
        let evaluated: Vec<Individual> = initial
            .into_iter()
            .map(|params| {
                let objectives = objective.evaluate(&params);
                Individual::new(params, objectives)
            })
            .collect();
        evaluations += evaluated.len();

        let mut population = Population::new(environmental_selection(
            &mut rng,
            evaluated,
            Vec::new(),
            opts.pop_size,
        ));
        self.finish_generation(1, &population, evaluations, &start, &mut observer)?;

        // 2. Generational loop
        for generation in 2..=opts.generations {
            let children = self.mate(&mut rng, population.members(), variable_prob);
            if children.len() < opts.n_offsprings {
                warn!(
                    "⚠️  Gen {}: only {} of {} offspring are new points",
                    generation,
                    children.len(),
                    opts.n_offsprings
                );
            }

            let offspring: Vec<Individual> = children
                .into_iter()
                .map(|params| {
                    let objectives = objective.evaluate(&params);
                    Individual::new(params, objectives)
                })
                .collect();
            evaluations += offspring.len();

            population = Population::new(environmental_selection(
                &mut rng,
                population.into_members(),
                offspring,
                opts.pop_size,
            ));
            self.finish_generation(generation, &population, evaluations, &start, &mut observer)?;
        }

        Ok(population)
    }

    /// Seeds from `initial_population` (clipped, wrong lengths skipped),
    /// then uniform samples, without repeating a point.
    fn initial_candidates(&self, rng: &mut fastrand::Rng) -> Vec<Vec<f64>> {
        let opts = &self.options;
        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(opts.pop_size);

        for seed_point in &opts.initial_population {
            if candidates.len() >= opts.pop_size {
                break;
            }
            if seed_point.len() != self.space.len() {
                warn!(
                    "⚠️  Ignoring starting point with {} values (expected {})",
                    seed_point.len(),
                    self.space.len()
                );
                continue;
            }
            let mut point = seed_point.clone();
            self.space.clip(&mut point);
            if seen.insert(param_key(&point)) {
                candidates.push(point);
            }
        }

        let mut attempts = 0;
        let max_attempts = opts.pop_size * opts.max_mating_attempts.max(1);
        while candidates.len() < opts.pop_size && attempts < max_attempts {
            attempts += 1;
            let point = sample_uniform(rng, &self.space);
            if seen.insert(param_key(&point)) {
                candidates.push(point);
            }
        }
        candidates
    }

    /// Tournament, SBX and polynomial mutation until `n_offsprings` points
    /// absent from the population and from each other exist, or the
    /// attempt budget runs out.
    fn mate(&self, rng: &mut fastrand::Rng, population: &[Individual], variable_prob: f64) -> Vec<Vec<f64>> {
        let opts = &self.options;
        let mut seen: HashSet<Vec<u64>> = population.iter().map(|m| param_key(&m.params)).collect();
        let mut children = Vec::with_capacity(opts.n_offsprings);

        let max_attempts = opts.n_offsprings * opts.max_mating_attempts.max(1);
        let mut attempts = 0;
        while children.len() < opts.n_offsprings && attempts < max_attempts {
            attempts += 1;
            let p1 = binary_tournament(rng, population);
            let p2 = binary_tournament(rng, population);
            let (c1, c2) = crossover_sbx(
                rng,
                &p1.params,
                &p2.params,
                &self.space,
                opts.crossover_prob,
                opts.crossover_eta,
            );

            for mut child in [c1, c2] {
                if children.len() >= opts.n_offsprings {
                    break;
                }
                mutate_polynomial(rng, &mut child, &self.space, opts.mutation_eta, variable_prob);
                if seen.insert(param_key(&child)) {
                    children.push(child);
                }
            }
        }
        debug!("   Mating: {} children after {} attempts", children.len(), attempts);
        children
    }

    fn finish_generation<O: GenerationObserver>(
        &self,
        generation: usize,
        population: &Population,
        evaluations: usize,
        start: &Instant,
        observer: &mut O,
    ) -> PfResult<()> {
        let front_size = population.front().count();
        info!(
            "🧬 Gen {:3}/{} | Evals: {:4} | Front: {:2} | {:.1}s",
            generation,
            self.options.generations,
            evaluations,
            front_size,
            start.elapsed().as_secs_f32()
        );
        observer.on_generation(generation, population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterBound;
    use crate::core_types::Objectives;

    fn options(pop_size: usize, generations: usize) -> Nsga2Options {
        Nsga2Options {
            pop_size,
            n_offsprings: pop_size,
            generations,
            crossover_prob: 0.9,
            crossover_eta: 15.0,
            mutation_eta: 20.0,
            mutation_prob: None,
            seed: Some(1),
            max_mating_attempts: 100,
            initial_population: Vec::new(),
        }
    }

    fn space() -> ParameterSpace {
        ParameterSpace::new(vec![
            ParameterBound::new("x", -1.0, 1.0),
            ParameterBound::new("y", 0.0, 10.0),
        ])
    }

    #[derive(Default)]
    struct Recorder {
        generations: Vec<usize>,
        sizes: Vec<usize>,
    }

    impl GenerationObserver for Recorder {
        fn on_generation(&mut self, generation: usize, population: &Population) -> PfResult<()> {
            self.generations.push(generation);
            self.sizes.push(population.len());
            Ok(())
        }
    }

    fn schaffer(params: &[f64]) -> Objectives {
        let x = params[0];
        Objectives::from_minimization([x * x, (x - 1.0).powi(2), params[1] / 10.0])
    }

    #[test]
    fn test_every_generation_is_observed() {
        let opt = Optimizer::new(space(), options(8, 4));
        let mut recorder = Recorder::default();
        let mut f = schaffer;
        let pop = opt.run(&mut f, &mut recorder).unwrap();

        assert_eq!(recorder.generations, vec![1, 2, 3, 4]);
        assert!(recorder.sizes.iter().all(|&s| s == 8));
        assert_eq!(pop.len(), 8);
        assert!(pop.iter().all(|i| opt.space().contains(&i.params)));
    }

    #[test]
    fn test_evaluation_count() {
        let mut opts = options(6, 3);
        opts.n_offsprings = 4;
        let opt = Optimizer::new(space(), opts);
        let mut calls = 0usize;
        let mut f = |p: &[f64]| {
            calls += 1;
            schaffer(p)
        };
        opt.run(&mut f, NoopObserver).unwrap();
        assert_eq!(calls, 6 + 4 + 4);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = || {
            let opt = Optimizer::new(space(), options(6, 3));
            let mut f = schaffer;
            opt.run(&mut f, NoopObserver)
                .unwrap()
                .into_members()
                .into_iter()
                .map(|i| i.params)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_best_value_per_objective_never_regresses() {
        struct BestTracker(Vec<[f64; 3]>);
        impl GenerationObserver for BestTracker {
            fn on_generation(&mut self, _g: usize, population: &Population) -> PfResult<()> {
                let mut best = [f64::INFINITY; 3];
                for ind in population {
                    for (b, v) in best.iter_mut().zip(ind.objectives.values()) {
                        *b = b.min(*v);
                    }
                }
                self.0.push(best);
                Ok(())
            }
        }

        let opt = Optimizer::new(space(), options(12, 15));
        let mut tracker = BestTracker(Vec::new());
        let mut f = schaffer;
        opt.run(&mut f, &mut tracker).unwrap();

        assert_eq!(tracker.0.len(), 15);
        for pair in tracker.0.windows(2) {
            for m in 0..3 {
                assert!(pair[1][m] <= pair[0][m], "objective {} regressed: {:?}", m, pair);
            }
        }
    }

    #[test]
    fn test_initial_population_is_evaluated_first() {
        let mut opts = options(4, 1);
        opts.initial_population = vec![vec![0.5, 3.0], vec![9.0, 3.0], vec![0.1]];
        let opt = Optimizer::new(space(), opts);
        let mut evaluated = Vec::new();
        let mut f = |p: &[f64]| {
            evaluated.push(p.to_vec());
            schaffer(p)
        };
        opt.run(&mut f, NoopObserver).unwrap();

        assert_eq!(evaluated.len(), 4);
        assert_eq!(evaluated[0], vec![0.5, 3.0]);
        // out of bounds seed is clipped, short seed ignored
        assert_eq!(evaluated[1], vec![1.0, 3.0]);
    }

    #[test]
    fn test_degenerate_space_stops_early() {
        let space = ParameterSpace::new(vec![ParameterBound::new("k", 2.0, 2.0)]);
        let mut opts = options(5, 3);
        opts.max_mating_attempts = 3;
        let opt = Optimizer::new(space, opts);
        let mut f = |p: &[f64]| Objectives::from_minimization([p[0], 0.0, 0.0]);
        let pop = opt.run(&mut f, NoopObserver).unwrap();
        assert_eq!(pop.len(), 1);
    }

    #[test]
    fn test_observer_error_aborts_run() {
        struct Failing;
        impl GenerationObserver for Failing {
            fn on_generation(&mut self, generation: usize, _p: &Population) -> PfResult<()> {
                if generation == 2 {
                    return Err(std::io::Error::other("disk full").into());
                }
                Ok(())
            }
        }

        let opt = Optimizer::new(space(), options(4, 5));
        let mut calls = 0usize;
        let mut f = |p: &[f64]| {
            calls += 1;
            schaffer(p)
        };
        assert!(opt.run(&mut f, Failing).is_err());
        assert_eq!(calls, 8);
    }
}
