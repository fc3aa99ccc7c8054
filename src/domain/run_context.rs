// ============================================================
// Layer 3 — Run Context
// ============================================================
// The immutable facts about a training run that the trainer
// needs at construction time: which device, which update rule,
// whether to replicate across accelerators, and the seed.
//
// Built once during setup and passed down explicitly; nothing
// below the application layer reads global device or optimizer
// state.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::errors::SetupError;

/// Accelerator ids used for replication. Fixed, never discovered.
pub const REPLICA_DEVICE_IDS: [usize; 2] = [0, 1];

/// Where the model lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceSpec {
    Cpu,
    Accelerator(usize),
}

impl DeviceSpec {
    /// Only accelerators can host more than one replica.
    pub fn supports_replication(&self) -> bool {
        matches!(self, DeviceSpec::Accelerator(_))
    }
}

impl FromStr for DeviceSpec {
    type Err = SetupError;

    /// Accepts `cpu`, `gpu`, `cuda` (both meaning accelerator 0) and `gpu:<id>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "cpu" => Ok(DeviceSpec::Cpu),
            "gpu" | "cuda" => Ok(DeviceSpec::Accelerator(0)),
            other => other
                .strip_prefix("gpu:")
                .or_else(|| other.strip_prefix("cuda:"))
                .and_then(|id| id.parse::<usize>().ok())
                .map(DeviceSpec::Accelerator)
                .ok_or_else(|| SetupError::UnknownDevice(s.to_string())),
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpec::Cpu            => write!(f, "cpu"),
            DeviceSpec::Accelerator(i) => write!(f, "gpu:{i}"),
        }
    }
}

/// The parameter update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

impl FromStr for OptimizerKind {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sgd"  => Ok(OptimizerKind::Sgd),
            "adam" => Ok(OptimizerKind::Adam),
            other  => Err(SetupError::IllegalOptimizer(other.to_string())),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerKind::Sgd  => write!(f, "sgd"),
            OptimizerKind::Adam => write!(f, "adam"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub device:        DeviceSpec,
    pub optimizer:     OptimizerKind,
    pub multi_gpu:     bool,
    pub learning_rate: f64,
    pub weight_decay:  f64,
    pub seed:          u64,
}

impl RunContext {
    /// Replication is on only when asked for AND the device can do it.
    pub fn replicate(&self) -> bool {
        self.multi_gpu && self.device.supports_replication()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_devices() {
        assert_eq!("cpu".parse::<DeviceSpec>().unwrap(), DeviceSpec::Cpu);
        assert_eq!("cuda".parse::<DeviceSpec>().unwrap(), DeviceSpec::Accelerator(0));
        assert_eq!("gpu:3".parse::<DeviceSpec>().unwrap(), DeviceSpec::Accelerator(3));
        assert_eq!(
            "tpu".parse::<DeviceSpec>(),
            Err(SetupError::UnknownDevice("tpu".into()))
        );
    }

    #[test]
    fn test_rejects_illegal_optimizer() {
        assert_eq!("adam".parse::<OptimizerKind>().unwrap(), OptimizerKind::Adam);
        assert_eq!(
            "rmsprop".parse::<OptimizerKind>(),
            Err(SetupError::IllegalOptimizer("rmsprop".into()))
        );
    }

    #[test]
    fn test_replication_needs_accelerator() {
        let mut ctx = RunContext {
            device:        DeviceSpec::Cpu,
            optimizer:     OptimizerKind::Sgd,
            multi_gpu:     true,
            learning_rate: 0.1,
            weight_decay:  0.0,
            seed:          7,
        };
        assert!(!ctx.replicate());
        ctx.device = DeviceSpec::Accelerator(0);
        assert!(ctx.replicate());
        ctx.multi_gpu = false;
        assert!(!ctx.replicate());
    }
}
