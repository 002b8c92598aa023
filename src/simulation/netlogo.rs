use super::descriptor::ExperimentDescriptor;
use super::process::{scoped_command, wait_with_timeout};
use super::table::{parse_final_row, MissingMetricPolicy};
use super::{ReplicateFailure, ReplicateResult, SimulationAdapter};
use crate::config::{Config, ParameterSpace};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

/// Drives a headless NetLogo BehaviorSpace run per replicate.
pub struct NetLogoAdapter {
    pub executable: PathBuf,
    pub model: PathBuf,
    pub space: ParameterSpace,
    pub max_ticks: u64,
    pub timeout: Duration,
    pub skip_rows: usize,
    pub missing_metrics: MissingMetricPolicy,
    pub work_dir: PathBuf,
}

impl NetLogoAdapter {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            executable: cfg.netlogo_path.clone(),
            model: cfg.model_path.clone(),
            space: cfg.param_bounds.clone(),
            max_ticks: cfg.max_ticks,
            timeout: cfg.timeout(),
            skip_rows: cfg.skip_rows,
            missing_metrics: if cfg.strict_metrics {
                MissingMetricPolicy::Fail
            } else {
                MissingMetricPolicy::Zero
            },
            work_dir: cfg.work_dir(),
        }
    }

    /// Unique per process, replicate and call; tempfile appends a random
    /// disambiguator and creates the file exclusively.
    fn temp_path(&self, replicate_id: usize, suffix: &str) -> std::io::Result<TempPath> {
        let prefix = format!("pf_{}_{}_", std::process::id(), replicate_id);
        Ok(Builder::new()
            .prefix(&prefix)
            .suffix(suffix)
            .tempfile_in(&self.work_dir)?
            .into_temp_path())
    }

    fn execute(
        &self,
        params: &[f64],
        seed: u64,
        setup_path: &Path,
        table_path: &Path,
    ) -> Result<ReplicateResult, ReplicateFailure> {
        let descriptor =
            ExperimentDescriptor::new(self.max_ticks, seed, self.space.bind(params).collect());
        let mut setup = File::create(setup_path)?;
        setup.write_all(descriptor.to_xml().as_bytes())?;
        setup.sync_all()?;
        drop(setup);

        let started = Instant::now();
        let mut child = scoped_command(&self.executable)
            .arg("--headless")
            .arg("--model")
            .arg(&self.model)
            .arg("--setup-file")
            .arg(setup_path)
            .arg("--table")
            .arg(table_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(ReplicateFailure::Spawn)?;

        let status = wait_with_timeout(&mut child, self.timeout)?
            .ok_or(ReplicateFailure::Timeout(self.timeout))?;
        if !status.success() {
            return Err(ReplicateFailure::NonZeroExit(status.code()));
        }
        debug!(
            "   Simulator finished in {:.1}s (seed {})",
            started.elapsed().as_secs_f32(),
            seed
        );

        match fs::metadata(table_path) {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(ReplicateFailure::MissingOutput),
        }

        let file = File::open(table_path).map_err(|_| ReplicateFailure::MissingOutput)?;
        let metrics = parse_final_row(BufReader::new(file), self.skip_rows, self.missing_metrics)?;
        Ok(ReplicateResult { metrics, seed })
    }
}

fn discard(path: TempPath) {
    let shown = path.to_path_buf();
    if let Err(e) = path.close() {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("⚠️  Could not delete temp file {}: {}", shown.display(), e);
        }
    }
}

impl SimulationAdapter for NetLogoAdapter {
    fn run(
        &self,
        params: &[f64],
        replicate_id: usize,
        seed: u64,
    ) -> Result<ReplicateResult, ReplicateFailure> {
        let setup_path = self.temp_path(replicate_id, ".xml")?;
        let table_path = self.temp_path(replicate_id, ".csv")?;

        let result = self.execute(params, seed, &setup_path, &table_path);

        discard(setup_path);
        discard(table_path);
        result
    }
}
