// ============================================================
// Layer 5 — Training Session
// ============================================================
// The Burn-backed TrainStep: owns the model (plain or replicated),
// the optimizer, the loss, the teacher-forcing RNG and the
// checkpoint writer.
//
//   forward(batch)  → model forward → masked loss → (scalar, pending)
//   update(pending) → backward → GradientsParams → optimizer step
//
// Burn builds a fresh gradient set on every backward, so there is
// no explicit zero-grad step.

use anyhow::Result;
use burn::{optim::GradientsParams, prelude::*, tensor::backend::AutodiffBackend};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::batcher::TranslationBatch;
use crate::domain::{checkpoint::CheckpointId, run_context::RunContext, traits::TrainStep};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    loss::LossComputer,
    model::Seq2SeqModel,
    optimizer::{build_optimizer, ParamUpdate},
    replicator::ReplicatedModel,
};

#[derive(Debug, Clone)]
pub enum ModelHandle<B: AutodiffBackend> {
    Single(Seq2SeqModel<B>),
    Replicated(ReplicatedModel<B>),
}

impl<B: AutodiffBackend> ModelHandle<B> {
    /// The master copy (what gets checkpointed).
    pub fn primary(&self) -> &Seq2SeqModel<B> {
        match self {
            ModelHandle::Single(m)     => m,
            ModelHandle::Replicated(r) => r.inner(),
        }
    }
}

/// Loss graph of one batch waiting for `update`.
pub struct PendingUpdate<B: AutodiffBackend> {
    loss:     Tensor<B, 1>,
    replicas: Vec<Seq2SeqModel<B>>,
}

pub struct TrainingSession<B: AutodiffBackend> {
    model:         ModelHandle<B>,
    optimizer:     Box<dyn ParamUpdate<B, Seq2SeqModel<B>>>,
    loss:          LossComputer,
    learning_rate: f64,
    rng:           StdRng,
    checkpoints:   CheckpointManager,
}

impl<B: AutodiffBackend> TrainingSession<B> {
    pub fn new(
        model:       Seq2SeqModel<B>,
        ctx:         &RunContext,
        pad_id:      u32,
        checkpoints: CheckpointManager,
    ) -> Self {
        Self {
            model:         ModelHandle::Single(model),
            optimizer:     build_optimizer(ctx.optimizer, ctx.weight_decay),
            loss:          LossComputer::new(pad_id),
            learning_rate: ctx.learning_rate,
            rng:           StdRng::seed_from_u64(ctx.seed),
            checkpoints,
        }
    }

    /// Switch to data-parallel execution over `devices`.
    pub fn with_replication(mut self, devices: Vec<B::Device>) -> Result<Self> {
        self.model = match self.model {
            ModelHandle::Single(m) => ModelHandle::Replicated(ReplicatedModel::wrap(m, devices)?),
            replicated             => replicated,
        };
        Ok(self)
    }

    pub fn is_replicated(&self) -> bool {
        matches!(self.model, ModelHandle::Replicated(_))
    }
}

impl<B: AutodiffBackend> TrainStep for TrainingSession<B> {
    type Batch   = TranslationBatch<B>;
    type Pending = PendingUpdate<B>;

    fn forward(&mut self, batch: TranslationBatch<B>) -> Result<(f64, PendingUpdate<B>)> {
        let (loss, replicas) = match &self.model {
            ModelHandle::Single(model) => {
                let predicted = model.forward_batch(&batch, &mut self.rng);
                (self.loss.compute(predicted, batch.target_tokens), Vec::new())
            }
            ModelHandle::Replicated(model) => {
                let out    = model.forward(&batch, &mut self.rng);
                let target = batch.target_tokens.to_device(model.primary_device());
                (self.loss.compute_gathered(out.predicted, target), out.replicas)
            }
        };

        let value = loss.clone().into_scalar().elem::<f64>();
        Ok((value, PendingUpdate { loss, replicas }))
    }

    fn update(&mut self, pending: PendingUpdate<B>) -> Result<()> {
        let grads = pending.loss.backward();
        let lr    = self.learning_rate;
        let opt   = &mut self.optimizer;

        self.model = match self.model.clone() {
            ModelHandle::Single(model) => {
                let grads = GradientsParams::from_grads(grads, &model);
                ModelHandle::Single(opt.apply(lr, model, grads))
            }
            ModelHandle::Replicated(model) => {
                let grads = model.reduce_gradients(grads, &pending.replicas);
                ModelHandle::Replicated(model.map_inner(|m| opt.apply(lr, m, grads)))
            }
        };
        Ok(())
    }

    fn save_snapshot(&mut self, id: &CheckpointId) -> Result<()> {
        self.checkpoints.save(self.model.primary(), &id.file_stem())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{batcher::TranslationBatcher, dataset::TranslationPair};
    use crate::domain::run_context::{DeviceSpec, OptimizerKind};
    use crate::ml::{
        attention_rnn::AttentionRnnConfig,
        trainer::{LoopConfig, RunState, TrainingLoop},
    };
    use burn::{
        backend::{Autodiff, NdArray},
        data::dataloader::batcher::Batcher,
    };

    type TestBackend = Autodiff<NdArray>;

    fn ctx(optimizer: OptimizerKind, learning_rate: f64) -> RunContext {
        RunContext {
            device:       DeviceSpec::Cpu,
            optimizer,
            multi_gpu:    false,
            learning_rate,
            weight_decay: 0.0,
            seed:         11,
        }
    }

    fn model(teacher_forcing: f64) -> Seq2SeqModel<TestBackend> {
        Seq2SeqModel::AttentionRnn(
            AttentionRnnConfig::new(12, 10)
                .with_encoder_embed_dim(4)
                .with_encoder_hidden_dim(6)
                .with_decoder_embed_dim(4)
                .with_decoder_hidden_dim(6)
                .with_encoder_dropout(0.0)
                .with_decoder_dropout(0.0)
                .with_teacher_student_ratio(teacher_forcing)
                .init(&Default::default()),
        )
    }

    fn batches() -> Vec<TranslationBatch<TestBackend>> {
        let pair = |s: &[u32], t: &[u32]| TranslationPair { source_ids: s.to_vec(), target_ids: t.to_vec() };
        let batcher = TranslationBatcher::<TestBackend>::new(Default::default(), 0);
        vec![
            batcher.batch(vec![pair(&[2, 5, 6, 3], &[2, 4, 5, 3]), pair(&[2, 7, 3], &[2, 6, 3])]),
            batcher.batch(vec![pair(&[2, 8, 9, 10, 3], &[2, 7, 8, 9, 3]), pair(&[2, 11, 3], &[2, 4, 4, 3])]),
        ]
    }

    fn run(session: &mut TrainingSession<TestBackend>, batches: &[TranslationBatch<TestBackend>]) -> Vec<f64> {
        batches
            .iter()
            .map(|b| {
                let (loss, pending) = session.forward(b.clone()).unwrap();
                session.update(pending).unwrap();
                loss
            })
            .collect()
    }

    #[test]
    fn test_repeated_updates_reduce_loss() {
        let tmp   = tempfile::tempdir().unwrap();
        let mut s = TrainingSession::new(
            model(1.0),
            &ctx(OptimizerKind::Adam, 0.05),
            0,
            CheckpointManager::new(tmp.path(), "m"),
        );
        let batch = batches().remove(0);
        let losses = run(&mut s, &vec![batch; 15]);
        assert!(losses.last().unwrap() < losses.first().unwrap());
    }

    #[test]
    fn test_same_seed_same_losses() {
        let tmp  = tempfile::tempdir().unwrap();
        let base = model(0.5);
        let data = batches();

        let mut a = TrainingSession::new(base.clone(), &ctx(OptimizerKind::Sgd, 0.1), 0, CheckpointManager::new(tmp.path(), "a"));
        let mut b = TrainingSession::new(base, &ctx(OptimizerKind::Sgd, 0.1), 0, CheckpointManager::new(tmp.path(), "b"));

        let la = run(&mut a, &data);
        let lb = run(&mut b, &data);
        assert_eq!(la.len(), 2);
        for (x, y) in la.iter().zip(&lb) {
            assert!((x - y).abs() < 1e-9, "{x} != {y}");
        }
    }

    #[test]
    fn test_snapshot_lands_in_model_dir() {
        let tmp   = tempfile::tempdir().unwrap();
        let mut s = TrainingSession::new(model(0.5), &ctx(OptimizerKind::Sgd, 0.1), 0, CheckpointManager::new(tmp.path(), "m"));
        s.save_snapshot(&CheckpointId::epoch_final(3, 9)).unwrap();
        assert!(tmp.path().join("m/model_epoch_3_final.mpk.gz").is_file());
    }

    #[test]
    fn test_replicated_session_trains() {
        let tmp   = tempfile::tempdir().unwrap();
        let mut s = TrainingSession::new(model(1.0), &ctx(OptimizerKind::Adam, 0.05), 0, CheckpointManager::new(tmp.path(), "m"))
            .with_replication(vec![Default::default(), Default::default()])
            .unwrap();
        assert!(s.is_replicated());

        let batch  = batches().remove(1);
        let losses = run(&mut s, &vec![batch; 10]);
        assert!(losses.iter().all(|l| l.is_finite()));
        assert!(losses.last().unwrap() < losses.first().unwrap());
    }

    #[test]
    fn test_nan_weights_abort_run_with_only_failure_snapshot() {
        let tmp   = tempfile::tempdir().unwrap();
        // the first step turns every weight into NaN, so batch 1 diverges
        let mut s = TrainingSession::new(
            model(1.0),
            &ctx(OptimizerKind::Sgd, f64::NAN),
            0,
            CheckpointManager::new(tmp.path(), "m"),
        );
        let mut data = vec![batches().remove(0); 5];

        let report = TrainingLoop::new(LoopConfig::new(3, 2).with_progress(false))
            .unwrap()
            .run(&mut s, &mut data)
            .unwrap();

        assert_eq!(report.state, RunState::NaNAborted);
        assert_eq!(report.metrics.nan_count, 1);
        assert_eq!(report.metrics.count, 1);
        assert!(report.summaries.is_empty());

        let mut files: Vec<String> = std::fs::read_dir(tmp.path().join("m"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["model_nan_failure.mpk.gz".to_string()]);
    }
}
