// ============================================================
// Layer 5 — Per-variant Hyperparameter Schemas
// ============================================================
// Each model variant owns a clap `Args` struct. The factory merges
// the selected variant's struct into the command line (augment_args)
// before the final parse, so only the chosen variant's flags exist.
//
//   SimpleLSTM    → RecurrentArgs
//   AttentionRNN  → RecurrentArgs + --teacher-student-ratio

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::domain::errors::SetupError;

/// Encoder/decoder sizes shared by every recurrent variant.
#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentArgs {
    /// Source token embedding size
    #[arg(long, default_value_t = 256)]
    pub encoder_embed_dim: usize,

    /// Encoder LSTM hidden size
    #[arg(long, default_value_t = 512)]
    pub encoder_hidden_dim: usize,

    /// Dropout between encoder layers and on source embeddings
    #[arg(long, default_value_t = 0.1)]
    pub encoder_dropout: f64,

    /// Number of stacked encoder LSTM layers
    #[arg(long, default_value_t = 1)]
    pub encoder_layers: usize,

    /// Target token embedding size
    #[arg(long, default_value_t = 256)]
    pub decoder_embed_dim: usize,

    /// Decoder LSTM hidden size
    #[arg(long, default_value_t = 512)]
    pub decoder_hidden_dim: usize,

    /// Dropout between decoder layers and before the output projection
    #[arg(long, default_value_t = 0.1)]
    pub decoder_dropout: f64,

    /// Number of stacked decoder LSTM layers
    #[arg(long, default_value_t = 1)]
    pub decoder_layers: usize,
}

impl RecurrentArgs {
    pub fn validate(&self) -> Result<(), SetupError> {
        for (name, dim) in [
            ("encoder_embed_dim",  self.encoder_embed_dim),
            ("encoder_hidden_dim", self.encoder_hidden_dim),
            ("encoder_layers",     self.encoder_layers),
            ("decoder_embed_dim",  self.decoder_embed_dim),
            ("decoder_hidden_dim", self.decoder_hidden_dim),
            ("decoder_layers",     self.decoder_layers),
        ] {
            if dim == 0 {
                return Err(SetupError::invalid(name, "must be positive"));
            }
        }
        for (name, p) in [
            ("encoder_dropout", self.encoder_dropout),
            ("decoder_dropout", self.decoder_dropout),
        ] {
            if !(0.0..1.0).contains(&p) {
                return Err(SetupError::invalid(name, format!("{p} is not in [0, 1)")));
            }
        }
        Ok(())
    }
}

impl Default for RecurrentArgs {
    fn default() -> Self {
        Self {
            encoder_embed_dim:  256,
            encoder_hidden_dim: 512,
            encoder_dropout:    0.1,
            encoder_layers:     1,
            decoder_embed_dim:  256,
            decoder_hidden_dim: 512,
            decoder_dropout:    0.1,
            decoder_layers:     1,
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleLstmArgs {
    #[command(flatten)]
    pub recurrent: RecurrentArgs,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionRnnArgs {
    #[command(flatten)]
    pub recurrent: RecurrentArgs,

    /// Probability of feeding the gold target token (rather than the
    /// model's own prediction) as the next decoder input
    #[arg(long, default_value_t = 0.5)]
    pub teacher_student_ratio: f64,
}

impl AttentionRnnArgs {
    pub fn validate(&self) -> Result<(), SetupError> {
        self.recurrent.validate()?;
        if !(0.0..=1.0).contains(&self.teacher_student_ratio) {
            return Err(SetupError::invalid(
                "teacher_student_ratio",
                format!("{} is not in [0, 1]", self.teacher_student_ratio),
            ));
        }
        Ok(())
    }
}

impl Default for AttentionRnnArgs {
    fn default() -> Self {
        Self { recurrent: RecurrentArgs::default(), teacher_student_ratio: 0.5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RecurrentArgs::default().validate().is_ok());
        assert!(AttentionRnnArgs::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_layers() {
        let args = RecurrentArgs { decoder_layers: 0, ..Default::default() };
        assert_eq!(
            args.validate(),
            Err(SetupError::invalid("decoder_layers", "must be positive"))
        );
    }

    #[test]
    fn test_rejects_ratio_out_of_range() {
        let args = AttentionRnnArgs { teacher_student_ratio: 1.5, ..Default::default() };
        assert!(matches!(
            args.validate(),
            Err(SetupError::InvalidHyperparameter { ref name, .. }) if name == "teacher_student_ratio"
        ));
    }
}
