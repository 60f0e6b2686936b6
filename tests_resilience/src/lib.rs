//! Resilience Test Utilities
//!
//! This crate provides a whole simulated machine for integration tests:
//! the kernel on the simulated board, the process manager and directory
//! service running as real processes, and scripted user applications.
//!
//! ## Test Philosophy
//!
//! - **Whole-system runs**: every request goes through a syscall trap
//! - **Deterministic**: device activity is scripted, time only moves per step
//! - **Safety under faults**: crashing apps and operator kills never
//!   disturb the kernel services

mod machine;
mod program;

pub use machine::{BootError, SimMachine, BIN_DIR, HEARTBEAT_CAUSE};
pub use program::{Observation, Step};

use kernel::KernelConfig;

/// Bootstrap helper for tests
///
/// Boots the default configuration with `apps` installed.
pub fn test_bootstrap(apps: &[(&str, Vec<Step>)]) -> Result<SimMachine, BootError> {
    SimMachine::boot(KernelConfig::default(), apps)
}

/// Boots and spawns every app in order, returning their pids
pub fn boot_and_spawn(apps: &[(&str, Vec<Step>)]) -> Result<(SimMachine, Vec<core_types::Pid>), BootError> {
    let mut machine = test_bootstrap(apps)?;
    let pids = apps
        .iter()
        .map(|(name, _)| machine.spawn(name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((machine, pids))
}
