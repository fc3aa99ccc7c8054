// ============================================================
// Layer 5 — Seq2Seq Model
// ============================================================
// The closed set of trainable variants behind one Burn module.
// Every variant maps (source, source_lengths, target) to
// per-position logits over the target vocabulary:
//
//   [batch, trg_width, trg_vocab]
//
// Position t predicts target token t + 1; the shift is applied
// by the loss, not by the model.

use burn::prelude::*;
use rand::Rng;

use crate::data::batcher::TranslationBatch;
use crate::ml::{attention_rnn::AttentionRnnModel, simple_lstm::SimpleLstmModel};

#[derive(Module, Debug)]
pub enum Seq2SeqModel<B: Backend> {
    SimpleLstm(SimpleLstmModel<B>),
    AttentionRnn(AttentionRnnModel<B>),
}

impl<B: Backend> Seq2SeqModel<B> {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Seq2SeqModel::SimpleLstm(_)   => "SimpleLSTM",
            Seq2SeqModel::AttentionRnn(_) => "AttentionRNN",
        }
    }

    /// Teacher-forced forward pass. `rng` drives the AttentionRNN
    /// feed-back schedule and is untouched by SimpleLSTM.
    pub fn forward<R: Rng>(
        &self,
        source:         Tensor<B, 2, Int>,
        source_lengths: Tensor<B, 1, Int>,
        target:         Tensor<B, 2, Int>,
        rng:            &mut R,
    ) -> Tensor<B, 3> {
        match self {
            Seq2SeqModel::SimpleLstm(m)   => m.forward(source, source_lengths, target),
            Seq2SeqModel::AttentionRnn(m) => m.forward(source, source_lengths, target, rng),
        }
    }

    pub fn forward_batch<R: Rng>(&self, batch: &TranslationBatch<B>, rng: &mut R) -> Tensor<B, 3> {
        self.forward(
            batch.source_tokens.clone(),
            batch.source_lengths.clone(),
            batch.target_tokens.clone(),
            rng,
        )
    }
}
