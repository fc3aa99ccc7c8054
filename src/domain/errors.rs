// ============================================================
// Layer 3 — Setup Errors
// ============================================================
// Every failure that can stop a run before the first batch is
// requested. These are fatal: the caller reports them and exits,
// nothing is retried and no checkpoint is written.
//
// Mid-training numerical failure is NOT an error here. It is a
// terminal state of the training loop (see ml::trainer::RunState).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    /// The requested model variant is not registered
    #[error("Unknown Model Type: {0}")]
    UnknownModelType(String),

    /// The optimizer name is neither `sgd` nor `adam`
    #[error("Illegal Optimizer {0}")]
    IllegalOptimizer(String),

    /// A hyperparameter is outside its valid range
    #[error("Invalid value for {name}: {reason}")]
    InvalidHyperparameter { name: String, reason: String },

    /// The device string is neither `cpu` nor an accelerator id
    #[error("Unknown device '{0}', expected 'cpu', 'gpu' or 'gpu:<id>'")]
    UnknownDevice(String),
}

impl SetupError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHyperparameter {
            name:   name.into(),
            reason: reason.into(),
        }
    }
}
