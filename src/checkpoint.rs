use crate::config::ParameterSpace;
use crate::core_types::{Individual, Population};
use crate::error::PfResult;
use crate::optimizer::GenerationObserver;
use csv::{Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const GENERATION_COLUMN: &str = "Generation";
pub const OBJECTIVE_COLUMNS: [&str; 3] = ["Obj_Innov_Neg", "Obj_Div_Neg", "Obj_Gini"];

/// Column names of the final table: parameters in declaration order, then
/// the objectives.
pub fn result_header(space: &ParameterSpace) -> Vec<String> {
    space
        .names()
        .map(str::to_string)
        .chain(OBJECTIVE_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// Column names of the checkpoint log.
pub fn checkpoint_header(space: &ParameterSpace) -> Vec<String> {
    std::iter::once(GENERATION_COLUMN.to_string())
        .chain(result_header(space))
        .collect()
}

fn individual_fields(ind: &Individual) -> impl Iterator<Item = String> + '_ {
    ind.params
        .iter()
        .chain(ind.objectives.values().iter())
        .map(|v| v.to_string())
}

/// Append-only generation log. Owns the file handle for the whole run;
/// the header is written only when the file did not exist (or was empty)
/// at construction.
pub struct CheckpointRecorder {
    path: PathBuf,
    writer: Writer<File>,
    rows_written: usize,
}

impl CheckpointRecorder {
    pub fn open<P: AsRef<Path>>(path: P, space: &ParameterSpace) -> PfResult<Self> {
        let path = path.as_ref().to_path_buf();
        let header = checkpoint_header(space);

        let has_content = path.metadata().map(|m| m.len() > 0).unwrap_or(false);
        if has_content {
            match read_header(&path) {
                Ok(existing) if existing == header => {
                    info!("💾 Appending to existing checkpoint {}", path.display());
                }
                Ok(existing) => warn!(
                    "⚠️  Checkpoint {} has columns {:?}, expected {:?}; appending anyway",
                    path.display(),
                    existing,
                    header
                ),
                Err(e) => warn!(
                    "⚠️  Could not read header of checkpoint {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if has_content && !ends_with_newline(&path)? {
            warn!("⚠️  Checkpoint {} ends in a partial row; starting a new line", path.display());
            file.write_all(b"\n")?;
        }
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if !has_content {
            writer.write_record(&header)?;
            writer.flush()?;
            info!("💾 Created checkpoint {}", path.display());
        }

        Ok(Self {
            path,
            writer,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended by this recorder (header excluded).
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Appends one row per member and forces the data to disk before
    /// returning.
    pub fn record(&mut self, generation: usize, population: &Population) -> PfResult<()> {
        for ind in population {
            let row = std::iter::once(generation.to_string()).chain(individual_fields(ind));
            self.writer.write_record(row)?;
        }
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.rows_written += population.len();

        info!("💾 Data saved for Generation {}", generation);
        Ok(())
    }
}

impl GenerationObserver for CheckpointRecorder {
    fn on_generation(&mut self, generation: usize, population: &Population) -> PfResult<()> {
        self.record(generation, population)
    }
}

fn ends_with_newline(path: &Path) -> PfResult<bool> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn read_header(path: &Path) -> PfResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut record = csv::StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record.iter().map(str::to_string).collect())
}

/// Writes the final population, replacing any previous file.
pub fn write_final_results<P: AsRef<Path>>(
    path: P,
    space: &ParameterSpace,
    population: &Population,
) -> PfResult<()> {
    let path = path.as_ref();
    let mut writer = Writer::from_path(path)?;
    writer.write_record(result_header(space))?;
    for ind in population {
        writer.write_record(individual_fields(ind))?;
    }
    writer.flush()?;

    info!("🏆 Final results saved to {} ({} rows)", path.display(), population.len());
    Ok(())
}
