// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop only talks to these two seams:
//
//   BatchSource — yields the batches of one epoch, in order
//   TrainStep   — runs forward/loss, backward/update and
//                 snapshots for whatever model it owns
//
// The Burn-backed implementations live in Layer 5 (ml); the
// loop itself never touches tensors.

use anyhow::Result;

use crate::domain::checkpoint::CheckpointId;

// ─── BatchSource ──────────────────────────────────────────────────────────────
/// Anything that can hand the loop one epoch of batches.
///
/// Implementations:
///   - BucketIterator → length-bucketed batches from a parallel corpus
///   - Vec<T>         → a fixed list, replayed every epoch
pub trait BatchSource {
    type Batch;

    /// Number of batches `epoch_batches` will yield (for the progress bar)
    fn num_batches(&self) -> usize;

    /// Batches for the given 0-indexed epoch
    fn epoch_batches(&mut self, epoch: usize) -> Box<dyn Iterator<Item = Self::Batch> + '_>;
}

impl<T: Clone> BatchSource for Vec<T> {
    type Batch = T;

    fn num_batches(&self) -> usize {
        self.len()
    }

    fn epoch_batches(&mut self, _epoch: usize) -> Box<dyn Iterator<Item = T> + '_> {
        Box::new(self.iter().cloned())
    }
}

// ─── TrainStep ────────────────────────────────────────────────────────────────
/// One model + optimizer pair driven by the training loop.
///
/// The loop calls `forward` first and inspects the scalar loss.
/// Only a finite loss is ever passed on to `update`; a NaN loss
/// drops the pending work without touching parameters.
pub trait TrainStep {
    type Batch;

    /// Whatever `update` needs to finish the step (e.g. the loss tensor)
    type Pending;

    /// Reset gradients, run the forward pass and compute the loss.
    fn forward(&mut self, batch: Self::Batch) -> Result<(f64, Self::Pending)>;

    /// Backward pass and optimizer step.
    fn update(&mut self, pending: Self::Pending) -> Result<()>;

    /// Persist the current parameters under the given identity.
    fn save_snapshot(&mut self, id: &CheckpointId) -> Result<()>;
}
