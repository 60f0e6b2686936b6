//! Forced termination
//!
//! An operator interrupt redirects every killable process to the exit
//! trampoline. Nothing is sent through the mailbox: a process that is
//! mid-send keeps its slot until the send lands, and a later interrupt
//! catches it. A slot still being loaded has no image to unwind and is
//! left to the spawn in progress.

use crate::{Kernel, KernelFatal, ProcessStatus, ScheduleEvent};
use core_types::Pid;
use hal::Platform;
use log::info;

impl<P: Platform> Kernel<P> {
    /// Rewrites every killable process to resume at the exit trampoline
    ///
    /// Returns the pids that were redirected.
    pub(crate) fn kill_killable(&mut self) -> Result<Vec<Pid>, KernelFatal> {
        let targets: Vec<(usize, Pid)> = self
            .table
            .iter()
            .filter(|(_, p)| {
                p.killable
                    && !matches!(p.status, ProcessStatus::WaitingToSend | ProcessStatus::Loading)
            })
            .map(|(slot, p)| (slot, p.pid))
            .collect();

        let timestamp_ticks = self.platform.poll_ticks();
        for &(slot, pid) in &targets {
            self.platform.switch_context(pid);
            self.platform.syscall_record().disarm();
            self.table.mark_killed(slot, self.config.exit_trampoline)?;
            self.audit.record(ScheduleEvent::Killed {
                pid,
                timestamp_ticks,
            });
            info!("kernel: killed {}", pid);
        }
        Ok(targets.into_iter().map(|(_, pid)| pid).collect())
    }
}
