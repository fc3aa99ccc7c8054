// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns shared by the other layers:
//
//   checkpoint.rs    — writes model snapshots with Burn's
//                      NamedMpkGzFileRecorder under
//                      {save_dir}/{model_name}/
//
//   vocab_store.rs   — saves source/target vocabularies as
//                      HuggingFace tokenizer JSON and encodes
//                      sentences through the reloaded tokenizer
//
//   metrics.rs       — one CSV row per completed epoch
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling with anyhow)

/// Model snapshot writing
pub mod checkpoint;

/// Vocabulary persistence and sentence encoding
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
