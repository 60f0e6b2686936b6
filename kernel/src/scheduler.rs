//! Round-robin scheduler
//!
//! ## Design
//!
//! - **Strict circular order**: the scan starts one past the slot that ran
//!   last, so every schedulable slot is picked within N decisions
//! - **Fresh quantum**: the periodic timer is re-armed on every dispatch
//! - **Drain before choosing**: every decision starts with a drain, so a
//!   request unblocked by the previous trap is retried on the next yield
//! - **Idle, don't spin**: with nothing schedulable the core sleeps with
//!   only device interrupts enabled, then drains and rescans
//!
//! Every decision is recorded in an audit log for tests.

use crate::{Dispatch, Kernel, KernelFatal, Privilege, ProcessStatus};
use core_types::Pid;
use hal::{InterruptSources, Platform};
use log::debug;
use serde::{Deserialize, Serialize};

/// Scheduling event for the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// Process was dispatched
    Selected { pid: Pid, timestamp_ticks: u64 },
    /// Running process was moved back to runnable
    Demoted { pid: Pid, timestamp_ticks: u64 },
    /// Nothing was schedulable; the core slept
    Idled { timestamp_ticks: u64 },
    /// Process was forcibly redirected to its exit path
    Killed { pid: Pid, timestamp_ticks: u64 },
    /// Process slot was freed
    Exited { pid: Pid, timestamp_ticks: u64 },
}

/// Append-only log of scheduling events
#[derive(Debug, Default, Clone)]
pub struct AuditLog {
    events: Vec<ScheduleEvent>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: ScheduleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[ScheduleEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&ScheduleEvent) -> bool,
    {
        self.events.iter().any(predicate)
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ScheduleEvent) -> bool,
    {
        self.events.iter().filter(|e| predicate(e)).count()
    }

    /// Dispatched pids in order
    pub fn selections(&self) -> Vec<Pid> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ScheduleEvent::Selected { pid, .. } => Some(*pid),
                _ => None,
            })
            .collect()
    }
}

impl<P: Platform> Kernel<P> {
    /// Drains, then picks the next process and prepares its dispatch
    ///
    /// Idles until something is schedulable; never fails for lack of work.
    pub(crate) fn schedule(&mut self) -> Result<(), KernelFatal> {
        self.drain()?;
        loop {
            if let Some(slot) = self.pick_next() {
                return self.dispatch(slot);
            }
            self.idle()?;
        }
    }

    fn pick_next(&self) -> Option<usize> {
        let n = self.table.capacity();
        if n == 0 {
            return None;
        }
        let start = self.current.unwrap_or(n - 1);
        (1..=n).map(|i| (start + i) % n).find(|&slot| {
            self.table
                .get(slot)
                .is_some_and(|p| p.status.is_schedulable())
        })
    }

    fn dispatch(&mut self, slot: usize) -> Result<(), KernelFatal> {
        let timestamp_ticks = self.platform.poll_ticks();

        if let Some(prev) = self.current.filter(|&prev| prev != slot) {
            if let Some(process) = self.table.get(prev) {
                if process.status == ProcessStatus::Running {
                    let pid = process.pid;
                    self.table.mark_runnable(prev)?;
                    self.audit.record(ScheduleEvent::Demoted {
                        pid,
                        timestamp_ticks,
                    });
                }
            }
        }

        let process = self
            .table
            .get(slot)
            .cloned()
            .ok_or(KernelFatal::MissingProcess)?;
        let pid = process.pid;
        self.platform.switch_context(pid);
        self.platform.reset_periodic_timer();
        self.table.mark_running(slot)?;
        self.current = Some(slot);

        let privilege = Privilege::for_pid(pid);
        self.next = Some(if process.status == ProcessStatus::Ready {
            debug!("scheduler: entering {} at {:#x}", pid, process.context.pc);
            Dispatch::Enter {
                pid,
                entry: process.context.pc,
                arg: self.config.app_arg,
                privilege,
            }
        } else {
            debug!("scheduler: resuming {}", pid);
            Dispatch::Resume {
                pid,
                context: process.context,
                privilege,
            }
        });
        self.audit.record(ScheduleEvent::Selected {
            pid,
            timestamp_ticks,
        });
        Ok(())
    }

    /// Sleeps until a device interrupt, then drains
    ///
    /// Timer and software interrupts stay masked across the sleep so that
    /// nothing can become runnable between the failed scan and the halt
    /// without the drain seeing it.
    fn idle(&mut self) -> Result<(), KernelFatal> {
        let timestamp_ticks = self.platform.poll_ticks();
        self.audit.record(ScheduleEvent::Idled { timestamp_ticks });
        debug!("scheduler: nothing runnable, idling");

        let quiet = InterruptSources::TIMER | InterruptSources::SOFTWARE;
        self.platform.disable_sources(quiet);
        self.platform.wait_for_interrupt();
        self.platform.enable_sources(quiet);
        self.drain()
    }
}
