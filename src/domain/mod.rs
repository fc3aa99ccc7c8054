// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that name the concepts of
// a training run. No Burn types, no file I/O.

// Token <-> id mapping with the four reserved tokens
pub mod vocab;

// Checkpoint identity and file naming
pub mod checkpoint;

// Running loss bookkeeping and epoch summaries
pub mod metrics;

// Device / optimizer / replication settings for one run
pub mod run_context;

// Fatal setup errors
pub mod errors;

// Seams between the training loop and its collaborators
pub mod traits;
