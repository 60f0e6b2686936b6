//! Process control exposed to kernel services

use crate::KernelError;
use core_types::Pid;

/// Process-table operations available to kernel services
///
/// Kernel services share the kernel's privilege level, so the process
/// manager manipulates the process table through this trait directly
/// instead of through a syscall.
///
/// # Example
///
/// ```
/// use core_types::Pid;
/// use kernel_api::{KernelError, ProcessControl};
///
/// fn respawn<C: ProcessControl>(ctl: &mut C, entry: usize) -> Result<Pid, KernelError> {
///     let pid = ctl
///         .alloc(true)
///         .ok_or_else(|| KernelError::InvalidState("process table full".to_string()))?;
///     ctl.set_ready(pid, entry)?;
///     Ok(pid)
/// }
/// ```
pub trait ProcessControl {
    /// Reserves a slot for a new process and returns its fresh pid
    ///
    /// The slot starts in the loading state. Returns `None` when the
    /// table is full.
    fn alloc(&mut self, killable: bool) -> Option<Pid>;

    /// Releases the slot of `pid`
    fn free(&mut self, pid: Pid) -> Result<(), KernelError>;

    /// Records the entry address of a loaded image and makes it schedulable
    fn set_ready(&mut self, pid: Pid, entry: usize) -> Result<(), KernelError>;
}
