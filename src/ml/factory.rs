// ============================================================
// Layer 5 — Model Factory
// ============================================================
// Registry of model variants. Each entry knows:
//
//   name                   "SimpleLSTM" | "AttentionRNN"
//   declare_schema(cmd)    merge its clap Args into the command
//   parse_hyperparameters  read + validate its Args from matches
//
// Build order used by the CLI:
//   1. ModelKind::from_name(model_type)   ← UnknownModelType, nothing read yet
//   2. kind.declare_schema(Cli::command())
//   3. full parse
//   4. kind.parse_hyperparameters(&matches)
//   5. ModelFactory::build(&hyper, src_vocab, trg_vocab, device)

use burn::prelude::*;
use clap::{ArgMatches, Args, Command, FromArgMatches};
use serde::{Deserialize, Serialize};

use crate::domain::{errors::SetupError, vocab::Vocabulary};
use crate::ml::{
    attention_rnn::AttentionRnnConfig,
    hyper::{AttentionRnnArgs, SimpleLstmArgs},
    model::Seq2SeqModel,
    simple_lstm::SimpleLstmConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    SimpleLstm,
    AttentionRnn,
}

/// Every registered variant, in help-text order.
pub const MODEL_REGISTRY: [ModelKind; 2] = [ModelKind::SimpleLstm, ModelKind::AttentionRnn];

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::SimpleLstm   => "SimpleLSTM",
            ModelKind::AttentionRnn => "AttentionRNN",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SetupError> {
        MODEL_REGISTRY
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| SetupError::UnknownModelType(name.to_string()))
    }

    /// Add this variant's flags to `cmd`.
    pub fn declare_schema(&self, cmd: Command) -> Command {
        match self {
            ModelKind::SimpleLstm   => SimpleLstmArgs::augment_args(cmd),
            ModelKind::AttentionRnn => AttentionRnnArgs::augment_args(cmd),
        }
    }

    /// Read this variant's flags back out of a command that was
    /// extended with `declare_schema`.
    pub fn parse_hyperparameters(&self, matches: &ArgMatches) -> Result<ModelHyperparameters, SetupError> {
        let to_setup = |e: clap::Error| SetupError::invalid(self.name(), e.to_string());
        match self {
            ModelKind::SimpleLstm => {
                let args = SimpleLstmArgs::from_arg_matches(matches).map_err(to_setup)?;
                args.recurrent.validate()?;
                Ok(ModelHyperparameters::SimpleLstm(args))
            }
            ModelKind::AttentionRnn => {
                let args = AttentionRnnArgs::from_arg_matches(matches).map_err(to_setup)?;
                args.validate()?;
                Ok(ModelHyperparameters::AttentionRnn(args))
            }
        }
    }
}

/// Parsed, validated hyperparameters of exactly one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type")]
pub enum ModelHyperparameters {
    #[serde(rename = "SimpleLSTM")]
    SimpleLstm(SimpleLstmArgs),
    #[serde(rename = "AttentionRNN")]
    AttentionRnn(AttentionRnnArgs),
}

impl ModelHyperparameters {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelHyperparameters::SimpleLstm(_)   => ModelKind::SimpleLstm,
            ModelHyperparameters::AttentionRnn(_) => ModelKind::AttentionRnn,
        }
    }

    pub fn init<B: Backend>(
        &self,
        src_vocab_size: usize,
        trg_vocab_size: usize,
        device:         &B::Device,
    ) -> Seq2SeqModel<B> {
        match self {
            ModelHyperparameters::SimpleLstm(args) => Seq2SeqModel::SimpleLstm(
                SimpleLstmConfig::from_args(args, src_vocab_size, trg_vocab_size).init(device),
            ),
            ModelHyperparameters::AttentionRnn(args) => Seq2SeqModel::AttentionRnn(
                AttentionRnnConfig::from_args(args, src_vocab_size, trg_vocab_size).init(device),
            ),
        }
    }
}

pub struct ModelFactory;

impl ModelFactory {
    /// Instantiate the variant `hyper` was parsed for, sized to both
    /// vocabularies. The variant name was already resolved when `hyper`
    /// was parsed, so this step cannot fail.
    pub fn build<B: Backend>(
        hyper:     &ModelHyperparameters,
        src_vocab: &Vocabulary,
        trg_vocab: &Vocabulary,
        device:    &B::Device,
    ) -> Seq2SeqModel<B> {
        tracing::info!(
            "Building {} model (src vocab {}, trg vocab {})",
            hyper.kind().name(),
            src_vocab.len(),
            trg_vocab.len(),
        );
        hyper.init(src_vocab.len(), trg_vocab.len(), device)
    }
}
