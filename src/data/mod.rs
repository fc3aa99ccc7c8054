// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From two line-aligned text files to padded tensor batches:
//
//   corpus.en / corpus.fr
//       │
//       ▼
//   ParallelCorpusLoader  → reads and cleans sentence pairs
//       │
//       ▼
//   VocabStore (infra)    → sentence → <START> ids <END>
//       │
//       ▼
//   TranslationDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   BucketIterator        → length-bucketed, seeded batch order
//       │
//       ▼
//   TranslationBatcher    → pads rows into Burn tensors
//
// The training loop only sees the BatchSource trait.

/// Reads a parallel corpus from `prefix.{src_ext}` / `prefix.{trg_ext}`
pub mod loader;

/// Normalises one sentence before vocabulary lookup
pub mod preprocessor;

/// Implements Burn's Dataset trait for encoded sentence pairs
pub mod dataset;

/// Implements Burn's Batcher trait to pad pairs into tensors
pub mod batcher;

/// Length-bucketed batch ordering, one plan per epoch
pub mod bucket;
