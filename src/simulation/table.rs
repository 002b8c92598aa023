use super::{Metric, Metrics, ReplicateFailure};
use csv::StringRecord;
use std::io::Read;
use strum::IntoEnumIterator;
use tracing::debug;

/// How a metric column that is absent from the table is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingMetricPolicy {
    /// Read the metric as zero.
    Zero,
    /// Fail the replicate.
    Fail,
}

fn clean(cell: &str) -> &str {
    cell.trim().trim_matches('"').trim()
}

/// Reads the final state from a simulator table.
///
/// The first `skip_rows` records are preamble. The next record is the
/// column header; only the last data row after it is consulted.
/// Malformed records are skipped.
pub fn parse_final_row<R: Read>(
    reader: R,
    skip_rows: usize,
    policy: MissingMetricPolicy,
) -> Result<Metrics, ReplicateFailure> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = rdr.records().skip(skip_rows).filter_map(|r| match r {
        Ok(rec) => Some(rec),
        Err(e) => {
            debug!("   Skipping malformed table row: {}", e);
            None
        }
    });

    let header: StringRecord = records.next().ok_or(ReplicateFailure::EmptyTable)?;
    let last = records
        .filter(|rec| rec.iter().any(|c| !clean(c).is_empty()))
        .last()
        .ok_or(ReplicateFailure::EmptyTable)?;

    let mut metrics = Metrics::default();
    for metric in Metric::iter() {
        let column = header.iter().position(|h| clean(h) == metric.as_ref());
        let value = match column.and_then(|idx| last.get(idx)) {
            Some(raw) => {
                let raw = clean(raw);
                let v: f64 = raw.parse().map_err(|_| {
                    ReplicateFailure::Parse(format!("{} = '{}'", metric, raw))
                })?;
                if !v.is_finite() {
                    return Err(ReplicateFailure::NonFiniteMetric(metric));
                }
                v
            }
            None => match policy {
                MissingMetricPolicy::Zero => {
                    debug!("   Metric '{}' missing, reading as 0", metric);
                    0.0
                }
                MissingMetricPolicy::Fail => return Err(ReplicateFailure::MissingMetric(metric)),
            },
        };
        metrics.set(metric, value);
    }

    Ok(metrics)
}
