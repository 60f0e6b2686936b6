//! Kernel configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Board-level kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Capacity of the process table
    pub max_processes: usize,
    /// Entry address of every loaded application image
    pub app_entry: usize,
    /// Address of the argument block passed to a process on first dispatch
    pub app_arg: usize,
    /// Resume address installed for forcibly terminated processes
    pub exit_trampoline: usize,
    /// Whether timer interrupts may preempt kernel services
    pub preempt_services: bool,
    /// Width of the trap instruction skipped when an ecall is resumed
    pub ecall_len: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_processes: 16,
            app_entry: 0x0800_5000,
            app_arg: 0x8000_0000,
            exit_trampoline: 0x0800_5004,
            preempt_services: false,
            ecall_len: 4,
        }
    }
}

/// Errors raised while reading a board description
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid kernel config: {0}")]
    Parse(String),

    #[error("Process table capacity must be non-zero")]
    ZeroCapacity,
}

impl KernelConfig {
    /// Parses and validates a JSON board description
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: KernelConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_processes == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}
