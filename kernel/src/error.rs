//! Fatal kernel conditions

use crate::process::TransitionError;
use core_types::Pid;
use thiserror::Error;

/// Conditions the kernel cannot recover from
///
/// These indicate a mis-built kernel or a broken user/kernel contract.
/// The board logs the diagnostic and halts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KernelFatal {
    #[error("Trap taken with no {0} handler registered")]
    UnregisteredHandler(&'static str),

    #[error("Unknown interrupt id {0}")]
    UnknownInterrupt(u32),

    #[error("Unknown syscall type {raw} from {pid}")]
    UnknownSyscall { pid: Pid, raw: u32 },

    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),

    #[error("Exception {cause} in kernel service {pid} at {pc:#x}")]
    KernelException { pid: Pid, cause: u32, pc: usize },

    #[error("Trap taken with no current process")]
    MissingProcess,
}
