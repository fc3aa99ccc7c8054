// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Validate device / optimizer / loop settings (no side effects)
//   Step 2: Load the parallel corpus            (Layer 4 - data)
//   Step 3: Build + save vocabularies           (Layer 3 / Layer 6)
//   Step 4: Encode the dataset                  (Layer 4 - data)
//   Step 5: Save config for the record          (log_dir)
//   Step 6: Pick the backend for the device
//   Step 7: Build model, session, loop and run  (Layer 5 - ml)
//
// Setup errors surface before anything touches the disk.

use anyhow::{bail, Context, Result};
use burn::{
    backend::{
        ndarray::NdArrayDevice,
        wgpu::WgpuDevice,
        Autodiff, NdArray, Wgpu,
    },
    module::Module,
    tensor::backend::{AutodiffBackend, Backend},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    batcher::TranslationBatcher,
    bucket::BucketIterator,
    dataset::TranslationDataset,
    loader::ParallelCorpusLoader,
};
use crate::domain::{
    errors::SetupError,
    run_context::{DeviceSpec, OptimizerKind, RunContext, REPLICA_DEVICE_IDS},
    vocab::Vocabulary,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    vocab_store::VocabStore,
};
use crate::ml::{
    factory::{ModelFactory, ModelHyperparameters},
    session::TrainingSession,
    trainer::{LoopConfig, RunReport, TrainingLoop},
};

/// Corpus prefixes used when no `--train-prefix` is given
pub const SMALL_TRAIN_PREFIX: &str = "data/wmt14_en_fr/small_train";
pub const FULL_TRAIN_PREFIX:  &str = "data/wmt14_en_fr/train";

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run needs, serialisable so it can be written next to
// the logs as a record of how the checkpoints were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model:          ModelHyperparameters,
    pub epochs:         usize,
    pub learning_rate:  f64,
    pub weight_decay:   f64,
    pub optimizer:      String,
    pub device:         String,
    pub multi_gpu:      bool,
    pub save_step:      usize,
    pub model_name:     String,
    pub save_dir:       String,
    pub log_dir:        String,
    pub batch_size:     usize,
    pub seed:           u64,
    pub train_prefix:   Option<String>,
    pub small:          bool,
    pub src_ext:        String,
    pub trg_ext:        String,
    /// 0 disables the fixed source width
    pub src_fix_length: usize,
    pub src_min_freq:   usize,
    pub src_max_vocab:  usize,
    pub trg_max_vocab:  usize,
}

impl TrainConfig {
    /// Defaults for everything except the model.
    pub fn new(model: ModelHyperparameters) -> Self {
        Self {
            model,
            epochs:         10,
            learning_rate:  1e-3,
            weight_decay:   0.0,
            optimizer:      "adam".to_string(),
            device:         "cpu".to_string(),
            multi_gpu:      false,
            save_step:      1000,
            model_name:     "model".to_string(),
            save_dir:       "checkpoints".to_string(),
            log_dir:        "logs".to_string(),
            batch_size:     32,
            seed:           42,
            train_prefix:   None,
            small:          false,
            src_ext:        "en".to_string(),
            trg_ext:        "fr".to_string(),
            src_fix_length: 200,
            src_min_freq:   2,
            src_max_vocab:  80_000,
            trg_max_vocab:  40_000,
        }
    }

    pub fn run_context(&self) -> Result<RunContext, SetupError> {
        Ok(RunContext {
            device:        self.device.parse::<DeviceSpec>()?,
            optimizer:     self.optimizer.parse::<OptimizerKind>()?,
            multi_gpu:     self.multi_gpu,
            learning_rate: self.learning_rate,
            weight_decay:  self.weight_decay,
            seed:          self.seed,
        })
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig::new(self.epochs, self.save_step)
    }

    /// Every pre-training check, in one place.
    pub fn validate(&self) -> Result<RunContext, SetupError> {
        let ctx = self.run_context()?;
        self.loop_config().validate()?;
        if self.batch_size == 0 {
            return Err(SetupError::invalid("batch_size", "must be greater than 0"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(SetupError::invalid("learning_rate", "must be positive"));
        }
        if self.weight_decay < 0.0 {
            return Err(SetupError::invalid("weight_decay", "must not be negative"));
        }
        Ok(ctx)
    }

    pub fn train_prefix(&self) -> PathBuf {
        match &self.train_prefix {
            Some(p)             => PathBuf::from(p),
            None if self.small  => PathBuf::from(SMALL_TRAIN_PREFIX),
            None                => PathBuf::from(FULL_TRAIN_PREFIX),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Where the failure snapshot lands if the run aborts on NaN.
    pub fn checkpoint_manager(&self) -> CheckpointManager {
        CheckpointManager::new(&self.config.save_dir, &self.config.model_name)
    }

    pub fn execute(&self) -> Result<RunReport> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        let ctx = cfg.validate()?;
        println!("using device {}", ctx.device);

        // ── Step 2: Load corpus ───────────────────────────────────────────────
        println!("loading datasets...");
        let prefix    = cfg.train_prefix();
        let loader    = ParallelCorpusLoader::new(&prefix, cfg.src_ext.as_str(), cfg.trg_ext.as_str());
        let sentences = loader.load()?;
        if sentences.is_empty() {
            bail!("No sentence pairs found for prefix '{}'", prefix.display());
        }
        tracing::info!("Loaded {} sentence pairs", sentences.len());

        // ── Step 3: Vocabularies ──────────────────────────────────────────────
        println!("loading vocabulary...");
        let src_vocab = Vocabulary::build(
            sentences.iter().map(|p| p.source.as_str()),
            cfg.src_min_freq,
            cfg.src_max_vocab,
        );
        let trg_vocab = Vocabulary::build(
            sentences.iter().map(|p| p.target.as_str()),
            1,
            cfg.trg_max_vocab,
        );
        let store = VocabStore::new(&cfg.log_dir);
        store.save("src", &src_vocab)?;
        store.save("trg", &trg_vocab)?;
        println!("loaded vocabulary");
        tracing::info!("Vocabulary sizes: src={} trg={}", src_vocab.len(), trg_vocab.len());

        // ── Step 4: Encode ────────────────────────────────────────────────────
        let src_encoder = store.encoder("src", &src_vocab)?;
        let trg_encoder = store.encoder("trg", &trg_vocab)?;
        let dataset     = TranslationDataset::encode(
            &sentences,
            |s| src_encoder.encode(s),
            |s| trg_encoder.encode(s),
        )?;

        // ── Step 5: Config record ─────────────────────────────────────────────
        self.save_config()?;

        // ── Step 6: Backend dispatch ──────────────────────────────────────────
        match ctx.device {
            DeviceSpec::Cpu => self.train::<Autodiff<NdArray>>(
                &ctx,
                NdArrayDevice::Cpu,
                Vec::new(),
                dataset,
                &src_vocab,
                &trg_vocab,
            ),
            DeviceSpec::Accelerator(id) => {
                let replicas = if ctx.replicate() {
                    REPLICA_DEVICE_IDS.iter().map(|&i| WgpuDevice::DiscreteGpu(i)).collect()
                } else {
                    Vec::new()
                };
                self.train::<Autodiff<Wgpu>>(
                    &ctx,
                    WgpuDevice::DiscreteGpu(id),
                    replicas,
                    dataset,
                    &src_vocab,
                    &trg_vocab,
                )
            }
        }
    }

    // ── Step 7: Build and run ─────────────────────────────────────────────────
    fn train<B: AutodiffBackend>(
        &self,
        ctx:       &RunContext,
        device:    B::Device,
        replicas:  Vec<B::Device>,
        dataset:   TranslationDataset,
        src_vocab: &Vocabulary,
        trg_vocab: &Vocabulary,
    ) -> Result<RunReport> {
        let cfg = &self.config;
        <B as Backend>::seed(ctx.seed);

        let batcher = TranslationBatcher::<B>::new(device.clone(), trg_vocab.pad_id())
            .with_src_fix_length(Some(cfg.src_fix_length));
        let mut batches = BucketIterator::new(dataset, batcher, cfg.batch_size, ctx.seed);

        let model = ModelFactory::build::<B>(&cfg.model, src_vocab, trg_vocab, &device);
        println!("using model {} ({} parameters)", model.variant_name(), model.num_params());

        let checkpoints = self.checkpoint_manager();
        tracing::info!("Checkpoints go to '{}'", checkpoints.dir().display());

        let mut session = TrainingSession::new(model, ctx, trg_vocab.pad_id(), checkpoints);
        if !replicas.is_empty() {
            session = session.with_replication(replicas)?;
        }
        if session.is_replicated() {
            println!("Using multi gpu training");
        }

        let trainer = TrainingLoop::new(cfg.loop_config())?
            .with_metrics_logger(MetricsLogger::new(&cfg.log_dir)?);
        trainer.run(&mut session, &mut batches)
    }

    /// Write the config as pretty JSON to `{log_dir}/train_config.json`.
    fn save_config(&self) -> Result<()> {
        let path = PathBuf::from(&self.config.log_dir).join("train_config.json");
        let json = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        hyper::{RecurrentArgs, SimpleLstmArgs},
        trainer::RunState,
    };
    use std::fs;

    fn tiny_model() -> ModelHyperparameters {
        ModelHyperparameters::SimpleLstm(SimpleLstmArgs {
            recurrent: RecurrentArgs {
                encoder_embed_dim:  4,
                encoder_hidden_dim: 4,
                encoder_dropout:    0.0,
                encoder_layers:     1,
                decoder_embed_dim:  4,
                decoder_hidden_dim: 4,
                decoder_dropout:    0.0,
                decoder_layers:     1,
            },
        })
    }

    fn config_in(root: &std::path::Path) -> TrainConfig {
        let mut cfg = TrainConfig::new(tiny_model());
        cfg.epochs       = 1;
        cfg.save_step    = 2;
        cfg.batch_size   = 2;
        cfg.src_min_freq = 1;
        cfg.train_prefix = Some(root.join("corpus").display().to_string());
        cfg.save_dir     = root.join("ckpt").display().to_string();
        cfg.log_dir      = root.join("logs").display().to_string();
        cfg
    }

    fn write_corpus(root: &std::path::Path) {
        fs::write(
            root.join("corpus.en"),
            "the cat sat\na dog ran\nthe dog sat down\nhello world\nthe end\n",
        )
        .unwrap();
        fs::write(
            root.join("corpus.fr"),
            "le chat assis\nun chien court\nle chien assis\nbonjour le monde\nla fin\n",
        )
        .unwrap();
    }

    #[test]
    fn test_prefix_selection() {
        let mut cfg = TrainConfig::new(tiny_model());
        assert_eq!(cfg.train_prefix(), PathBuf::from(FULL_TRAIN_PREFIX));
        cfg.small = true;
        assert_eq!(cfg.train_prefix(), PathBuf::from(SMALL_TRAIN_PREFIX));
        cfg.train_prefix = Some("x/y".into());
        assert_eq!(cfg.train_prefix(), PathBuf::from("x/y"));
    }

    #[test]
    fn test_illegal_optimizer_fails_before_any_io() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = config_in(tmp.path());
        cfg.optimizer = "rmsprop".into();

        // no corpus on disk: a data error here would mean setup ran too late
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert_eq!(
            err.downcast_ref::<SetupError>(),
            Some(&SetupError::IllegalOptimizer("rmsprop".into()))
        );
        assert!(!tmp.path().join("ckpt").exists());
        assert!(!tmp.path().join("logs").exists());
    }

    #[test]
    fn test_zero_save_step_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = config_in(tmp.path());
        cfg.save_step = 0;
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::InvalidHyperparameter { .. })
        ));
    }

    #[test]
    fn test_end_to_end_on_tiny_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        write_corpus(tmp.path());
        let cfg = config_in(tmp.path());

        let report = TrainUseCase::new(cfg).execute().unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.summaries[0].count, 3);

        let run_dir = tmp.path().join("ckpt/model");
        assert!(run_dir.join("model_epoch_0_itr_1.mpk.gz").is_file());
        assert!(run_dir.join("model_epoch_0_final.mpk.gz").is_file());
        assert!(!run_dir.join("model_nan_failure.mpk.gz").exists());

        let logs = tmp.path().join("logs");
        for f in ["src_tokenizer.json", "trg_tokenizer.json", "metrics.csv", "train_config.json"] {
            assert!(logs.join(f).is_file(), "missing {f}");
        }

        let saved: TrainConfig =
            serde_json::from_str(&fs::read_to_string(logs.join("train_config.json")).unwrap()).unwrap();
        assert_eq!(saved.model, tiny_model());
    }
}
