// ============================================================
// Layer 3 — Training Metrics
// ============================================================
// The run-scoped running record the training loop keeps.
//
//   total_loss / count   reset at the start of every epoch
//   nan_count            never reset during a run
//
// The epoch summary is derived from these same sums, so the
// printed average is always total_loss / count.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub epoch:      usize,
    /// Index of the batch currently being (or last) processed in the epoch
    pub iteration:  usize,
    pub total_loss: f64,
    pub count:      usize,
    pub nan_count:  usize,
}

impl TrainingMetrics {
    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch      = epoch;
        self.iteration  = 0;
        self.total_loss = 0.0;
        self.count      = 0;
    }

    pub fn record_loss(&mut self, loss: f64) {
        self.total_loss += loss;
        self.count      += 1;
    }

    pub fn record_nan(&mut self) {
        self.nan_count += 1;
    }

    /// Running average, NaN before the first finite batch.
    pub fn average(&self) -> f64 {
        self.total_loss / self.count as f64
    }

    pub fn summary(&self) -> EpochSummary {
        EpochSummary {
            epoch:      self.epoch,
            total_loss: self.total_loss,
            count:      self.count,
            average:    self.average(),
            nan_count:  self.nan_count,
        }
    }
}

/// One completed epoch, as printed and as logged to metrics.csv
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch:      usize,
    pub total_loss: f64,
    pub count:      usize,
    pub average:    f64,
    pub nan_count:  usize,
}
