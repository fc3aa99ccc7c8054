// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal: a training run.
//
// Rules for this layer:
//   - No tensor code here (that's Layer 5)
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination and backend selection
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;
