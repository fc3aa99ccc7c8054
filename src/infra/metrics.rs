// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per completed epoch, taken from the same
// running sums that produce the printed summary line.
//
// Output file: {log_dir}/metrics.csv
//
//   epoch,total_loss,count,average,nan_count
//   0,10234.118200,3125,3.274918,0
//   1,8120.551700,3125,2.598576,0
//
// An aborted epoch never gets a row. The header is written only
// when the file is new, so consecutive runs append to one log.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::metrics::EpochSummary;

pub const METRICS_HEADER: &str = "epoch,total_loss,count,average,nan_count";

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{METRICS_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, s: &EpochSummary) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{},{:.6},{}",
            s.epoch, s.total_loss, s.count, s.average, s.nan_count,
        )?;

        tracing::debug!("Logged epoch {} metrics: average={:.4}", s.epoch, s.average);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn summary(epoch: usize) -> EpochSummary {
        EpochSummary { epoch, total_loss: 6.0, count: 3, average: 2.0, nan_count: 0 }
    }

    #[test]
    fn test_header_then_rows() {
        let tmp    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&summary(0)).unwrap();
        logger.log(&summary(1)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], METRICS_HEADER);
        assert_eq!(lines[1], "0,6.000000,3,2.000000,0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_reopen_appends_without_second_header() {
        let tmp = tempfile::tempdir().unwrap();
        MetricsLogger::new(tmp.path()).unwrap().log(&summary(0)).unwrap();
        MetricsLogger::new(tmp.path()).unwrap().log(&summary(1)).unwrap();

        let text = fs::read_to_string(tmp.path().join("metrics.csv")).unwrap();
        assert_eq!(text.matches("epoch,").count(), 1);
        assert_eq!(text.lines().count(), 3);
    }
}
