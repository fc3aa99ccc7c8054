// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// The base flags every run accepts. Model-specific flags are not
// declared here: they come from the selected variant's Args struct
// (ml::hyper) and are merged in before the final parse.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::Args;

use crate::application::train_use_case::TrainConfig;
use crate::ml::factory::ModelHyperparameters;

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Model variant to train: SimpleLSTM or AttentionRNN
    #[arg(long)]
    pub model_type: String,

    /// Number of full passes over the training corpus
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    /// L2 penalty applied by the optimizer
    #[arg(long, default_value_t = 0.0)]
    pub weight_decay: f64,

    /// Parameter update rule: sgd or adam
    #[arg(long, default_value = "adam")]
    pub optimizer: String,

    /// cpu, gpu, or gpu:<id>
    #[arg(long, default_value = "cpu")]
    pub device: String,

    /// Replicate across accelerators 0 and 1 (ignored on cpu)
    #[arg(long)]
    pub multi_gpu: bool,

    /// Write a periodic checkpoint every N batches
    #[arg(long, default_value_t = 1000)]
    pub save_step: usize,

    /// Checkpoint subdirectory under --save-dir
    #[arg(long, default_value = "model")]
    pub model_name: String,

    #[arg(long, default_value = "checkpoints")]
    pub save_dir: String,

    /// Vocabularies, metrics.csv and the run config go here
    #[arg(long, default_value = "logs")]
    pub log_dir: String,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Seeds weight init, batch order and teacher forcing
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Corpus path without extension; reads <prefix>.<src-ext> and <prefix>.<trg-ext>
    #[arg(long)]
    pub train_prefix: Option<String>,

    /// Use the small training split when no --train-prefix is given
    #[arg(long)]
    pub small: bool,

    #[arg(long, default_value = "en")]
    pub src_ext: String,

    #[arg(long, default_value = "fr")]
    pub trg_ext: String,

    /// Pad or truncate every source row to this width (0 = longest in batch)
    #[arg(long, default_value_t = 200)]
    pub src_fix_length: usize,

    /// Drop source words seen fewer times than this
    #[arg(long, default_value_t = 2)]
    pub src_min_freq: usize,

    #[arg(long, default_value_t = 80_000)]
    pub src_max_vocab: usize,

    #[arg(long, default_value_t = 40_000)]
    pub trg_max_vocab: usize,
}

/// CLI args + parsed variant hyperparameters → application config.
/// The application layer never sees clap types.
impl From<(TrainArgs, ModelHyperparameters)> for TrainConfig {
    fn from((a, model): (TrainArgs, ModelHyperparameters)) -> Self {
        TrainConfig {
            model,
            epochs:         a.epochs,
            learning_rate:  a.learning_rate,
            weight_decay:   a.weight_decay,
            optimizer:      a.optimizer,
            device:         a.device,
            multi_gpu:      a.multi_gpu,
            save_step:      a.save_step,
            model_name:     a.model_name,
            save_dir:       a.save_dir,
            log_dir:        a.log_dir,
            batch_size:     a.batch_size,
            seed:           a.seed,
            train_prefix:   a.train_prefix,
            small:          a.small,
            src_ext:        a.src_ext,
            trg_ext:        a.trg_ext,
            src_fix_length: a.src_fix_length,
            src_min_freq:   a.src_min_freq,
            src_max_vocab:  a.src_max_vocab,
            trg_max_vocab:  a.trg_max_vocab,
        }
    }
}
