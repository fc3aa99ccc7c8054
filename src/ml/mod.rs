// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches Burn tensors, modules or optimizers.
//
//   encoder.rs        — shared recurrent encoder (embedding + LSTM stack)
//   simple_lstm.rs    — SimpleLSTM variant
//   attention_rnn.rs  — AttentionRNN variant (Luong attention, teacher forcing)
//   hyper.rs          — per-variant clap hyperparameter schemas
//   model.rs          — Seq2SeqModel, the closed set of variants
//   factory.rs        — variant registry: name → schema → model
//   loss.rs           — masked next-token cross-entropy
//   replicator.rs     — multi-device data-parallel wrapper
//   optimizer.rs      — sgd / adam selection
//   session.rs        — TrainStep over a real model
//   trainer.rs        — the training loop controller
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Luong et al. (2015) Effective Approaches to
//            Attention-based Neural Machine Translation

pub mod encoder;
pub mod simple_lstm;
pub mod attention_rnn;
pub mod hyper;

/// Closed set of trainable seq2seq variants
pub mod model;

/// Variant registry and two-phase hyperparameter parsing
pub mod factory;

pub mod loss;
pub mod replicator;
pub mod optimizer;
pub mod session;

/// Epoch/batch loop with NaN abort and checkpoint cadence
pub mod trainer;
