use crate::checkpoint::{write_final_results, CheckpointRecorder};
use crate::config::Config;
use crate::core_types::Population;
use crate::error::PfResult;
use crate::evaluation::Evaluator;
use crate::optimizer::{Nsga2Options, Optimizer};
use crate::simulation::{NetLogoAdapter, SimulationAdapter};
use tracing::{info, warn};

/// Summary of a finished run.
pub struct RunReport {
    pub population: Population,
    pub evaluations: usize,
    pub failed_evaluations: usize,
    pub checkpoint_rows: usize,
}

/// Runs the whole optimization against `adapter`: evaluates, records every
/// generation to the checkpoint log and writes the final table.
pub fn run_optimization<A: SimulationAdapter>(config: &Config, adapter: A) -> PfResult<RunReport> {
    config.validate()?;

    let threads = config.worker_threads();
    info!(
        "🚀 Starting NSGA-II: {} parameters, population {}, {} generations, {} replicates on {} threads",
        config.param_bounds.len(),
        config.pop_size,
        config.n_generations,
        config.n_replicates,
        threads
    );

    // 1. Recorder first, so a bad checkpoint path fails before any simulation
    let mut recorder = CheckpointRecorder::open(&config.checkpoint_path, &config.param_bounds)?;

    // 2. Search
    let mut evaluator = Evaluator::from_config(adapter, config);
    let optimizer = Optimizer::new(config.param_bounds.clone(), Nsga2Options::from(config));
    let population = optimizer.run(&mut evaluator, &mut recorder)?;

    if evaluator.failed_evaluations() > 0 {
        warn!(
            "⚠️  {} of {} evaluations received the penalty",
            evaluator.failed_evaluations(),
            evaluator.evaluations()
        );
    }

    // 3. Final table
    write_final_results(&config.result_path, &config.param_bounds, &population)?;

    Ok(RunReport {
        population,
        evaluations: evaluator.evaluations(),
        failed_evaluations: evaluator.failed_evaluations(),
        checkpoint_rows: recorder.rows_written(),
    })
}

/// [`run_optimization`] with the external NetLogo simulator.
pub fn run_netlogo(config: &Config) -> PfResult<RunReport> {
    let adapter = NetLogoAdapter::from_config(config);
    run_optimization(config, adapter)
}
