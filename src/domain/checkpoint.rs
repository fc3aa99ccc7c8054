// ============================================================
// Layer 3 — Checkpoint Identity
// ============================================================
// A checkpoint is identified by (epoch, iteration, kind). The
// file stem is derived from that triple and nothing else:
//
//   Periodic         model_epoch_{e}_itr_{i}
//   EpochFinal       model_epoch_{e}_final
//   FailureSnapshot  model_nan_failure
//
// Epochs and iterations are 0-indexed, as in the progress output's
// internal counters (the progress line shows epoch + 1).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stem of the snapshot written when a NaN loss aborts the run.
pub const FAILURE_SNAPSHOT_STEM: &str = "model_nan_failure";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointKind {
    Periodic,
    EpochFinal,
    FailureSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointId {
    pub epoch:     usize,
    pub iteration: usize,
    pub kind:      CheckpointKind,
}

impl CheckpointId {
    pub fn periodic(epoch: usize, iteration: usize) -> Self {
        Self { epoch, iteration, kind: CheckpointKind::Periodic }
    }

    pub fn epoch_final(epoch: usize, iteration: usize) -> Self {
        Self { epoch, iteration, kind: CheckpointKind::EpochFinal }
    }

    pub fn failure(epoch: usize, iteration: usize) -> Self {
        Self { epoch, iteration, kind: CheckpointKind::FailureSnapshot }
    }

    pub fn file_stem(&self) -> String {
        match self.kind {
            CheckpointKind::Periodic => {
                format!("model_epoch_{}_itr_{}", self.epoch, self.iteration)
            }
            CheckpointKind::EpochFinal => format!("model_epoch_{}_final", self.epoch),
            CheckpointKind::FailureSnapshot => FAILURE_SNAPSHOT_STEM.to_string(),
        }
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}
