// ============================================================
// Layer 5 — Training Loop Controller
// ============================================================
// Drives a TrainStep over a BatchSource for a fixed number of
// epochs, fail-fast on numerical failure.
//
//   Running ──(all epochs done)──► Completed
//      │
//      └──(first NaN loss)──────► NaNAborted
//
// Per batch i of epoch e:
//   1. forward + loss
//   2. NaN → nan_count += 1, write the failure snapshot, stop the run.
//      The pending update is dropped, so parameters stay as they were
//      after batch i-1. No epoch-final checkpoint for e.
//   3. otherwise backward + optimizer step, total_loss += loss, count += 1
//   4. (i + 1) % save_step == 0 → periodic checkpoint (e, i)
// After the last batch of e:
//   print "Summary: Total Loss {t} | Count {c} | Average {a}",
//   append the metrics row, write the epoch-final checkpoint.
//
// The loop never touches tensors; all of that is behind TrainStep.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::domain::{
    checkpoint::CheckpointId,
    errors::SetupError,
    metrics::{EpochSummary, TrainingMetrics},
    traits::{BatchSource, TrainStep},
};
use crate::infra::metrics::MetricsLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    NaNAborted,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub epochs:        usize,
    pub save_step:     usize,
    pub show_progress: bool,
}

impl LoopConfig {
    pub fn new(epochs: usize, save_step: usize) -> Self {
        Self { epochs, save_step, show_progress: true }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.epochs == 0 {
            return Err(SetupError::invalid("epochs", "must be greater than 0"));
        }
        if self.save_step == 0 {
            return Err(SetupError::invalid("save_step", "must be greater than 0"));
        }
        Ok(())
    }
}

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub state:       RunState,
    pub metrics:     TrainingMetrics,
    /// Every checkpoint written, in order
    pub checkpoints: Vec<CheckpointId>,
    /// One per completed epoch
    pub summaries:   Vec<EpochSummary>,
}

pub struct TrainingLoop {
    config:         LoopConfig,
    state:          RunState,
    metrics:        TrainingMetrics,
    checkpoints:    Vec<CheckpointId>,
    summaries:      Vec<EpochSummary>,
    metrics_logger: Option<MetricsLogger>,
}

impl TrainingLoop {
    pub fn new(config: LoopConfig) -> Result<Self, SetupError> {
        config.validate()?;
        Ok(Self {
            config,
            state:          RunState::Running,
            metrics:        TrainingMetrics::default(),
            checkpoints:    Vec::new(),
            summaries:      Vec::new(),
            metrics_logger: None,
        })
    }

    pub fn with_metrics_logger(mut self, logger: MetricsLogger) -> Self {
        self.metrics_logger = Some(logger);
        self
    }

    pub fn run<S, D>(mut self, step: &mut S, data: &mut D) -> Result<RunReport>
    where
        S: TrainStep,
        D: BatchSource<Batch = S::Batch>,
    {
        let epochs  = self.config.epochs;
        let batches = data.num_batches();
        tracing::info!("Training for {} epochs, {} batches per epoch", epochs, batches);

        for epoch in 0..epochs {
            self.metrics.start_epoch(epoch);
            let bar = self.progress_bar(batches)?;

            for (i, batch) in data.epoch_batches(epoch).enumerate() {
                self.metrics.iteration = i;

                let (loss, pending) = step.forward(batch)?;
                if loss.is_nan() {
                    drop(pending);
                    self.metrics.record_nan();
                    bar.abandon();
                    println!("found nan at {i}");
                    tracing::warn!("NaN loss at epoch {} batch {}, aborting run", epoch, i);

                    self.save(step, CheckpointId::failure(epoch, i))?;
                    self.state = RunState::NaNAborted;
                    return Ok(self.into_report());
                }

                step.update(pending)?;
                self.metrics.record_loss(loss);

                bar.set_message(format!(
                    "loss_avg={:.4}, epoch={}/{}, curr_loss={:.4}, nan_count={}",
                    self.metrics.average(),
                    epoch + 1,
                    epochs,
                    loss,
                    self.metrics.nan_count,
                ));
                bar.inc(1);

                if (i + 1) % self.config.save_step == 0 {
                    println!("Saving model at iteration {i} for epoch {epoch}");
                    self.save(step, CheckpointId::periodic(epoch, i))?;
                }
            }
            bar.finish();

            let summary = self.metrics.summary();
            println!(
                "Summary: Total Loss {} | Count {} | Average {}",
                summary.total_loss, summary.count, summary.average,
            );
            if let Some(logger) = &self.metrics_logger {
                logger.log(&summary)?;
            }
            self.summaries.push(summary);

            let id = CheckpointId::epoch_final(epoch, self.metrics.iteration);
            println!("saving to {id}");
            self.save(step, id)?;
        }

        self.state = RunState::Completed;
        tracing::info!("Training complete!");
        Ok(self.into_report())
    }

    fn save<S: TrainStep>(&mut self, step: &mut S, id: CheckpointId) -> Result<()> {
        step.save_snapshot(&id)?;
        self.checkpoints.push(id);
        Ok(())
    }

    fn progress_bar(&self, len: usize) -> Result<ProgressBar> {
        if !self.config.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {bar:40.green/black} {pos}/{len} [{elapsed}<{eta}] {msg}")?
                .progress_chars("=>-"),
        );
        Ok(bar)
    }

    fn into_report(self) -> RunReport {
        RunReport {
            state:       self.state,
            metrics:     self.metrics,
            checkpoints: self.checkpoints,
            summaries:   self.summaries,
        }
    }
}
