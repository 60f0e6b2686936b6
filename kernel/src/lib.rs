//! # Kernel
//!
//! The trap-driven core: process table, round-robin scheduler, syscall
//! gateway, rendezvous mailbox and forced termination.
//!
//! ## Execution model
//!
//! The kernel never runs on its own. The board calls [`Kernel::trap`] for
//! every trap with the cause register and the interrupted context, and
//! performs the [`Dispatch`] it gets back. Exactly one trap is handled at
//! a time, so none of the state below needs locking.
//!
//! Nothing in the kernel blocks. A request that cannot complete leaves the
//! caller in a blocked state with its syscall record still armed. The drain
//! that opens every scheduling decision retries it.

mod drain;
mod kill;
mod syscall_gate;

pub mod config;
pub mod error;
pub mod process;
pub mod scheduler;
pub mod trap;

pub use config::{ConfigError, KernelConfig};
pub use error::KernelFatal;
pub use process::{Context, Process, ProcessStatus, ProcessTable, TransitionError};
pub use scheduler::{AuditLog, ScheduleEvent};
pub use trap::{TrapCause, TrapGate};

use core_types::{Pid, SHELL_PID};
use hal::{InterruptSources, Platform};
use ipc::Mailbox;
use kernel_api::{KernelError, ProcessControl};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use trap::{EXCP_ECALL_MACHINE, EXCP_ECALL_USER, INTR_EXTERNAL, INTR_SOFTWARE, INTR_TIMER};

/// Privilege level a process runs at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privilege {
    /// Kernel services share the kernel's privilege
    Machine,
    User,
}

impl Privilege {
    pub fn for_pid(pid: Pid) -> Self {
        if pid.is_kernel_service() {
            Privilege::Machine
        } else {
            Privilege::User
        }
    }
}

/// What the board must do when the kernel returns from a trap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// First dispatch: jump to `entry` with `arg`
    Enter {
        pid: Pid,
        entry: usize,
        arg: usize,
        privilege: Privilege,
    },
    /// Restore `context` and return from the trap
    Resume {
        pid: Pid,
        context: Context,
        privilege: Privilege,
    },
}

impl Dispatch {
    pub fn pid(&self) -> Pid {
        match self {
            Dispatch::Enter { pid, .. } | Dispatch::Resume { pid, .. } => *pid,
        }
    }

    pub fn privilege(&self) -> Privilege {
        match self {
            Dispatch::Enter { privilege, .. } | Dispatch::Resume { privilege, .. } => *privilege,
        }
    }
}

/// The kernel, generic over the board it runs on
pub struct Kernel<P: Platform> {
    platform: P,
    config: KernelConfig,
    table: ProcessTable,
    mailbox: Mailbox,
    gate: TrapGate<Kernel<P>>,
    audit: AuditLog,
    /// Slot of the process that was dispatched last
    current: Option<usize>,
    next: Option<Dispatch>,
}

impl<P: Platform> Kernel<P> {
    /// Creates a kernel with an empty process table and enables all
    /// interrupt sources
    pub fn new(mut platform: P, config: KernelConfig) -> Self {
        let mut gate = TrapGate::new();
        gate.register_interrupt_handler(Self::handle_interrupt);
        gate.register_exception_handler(Self::handle_exception);
        platform.enable_sources(InterruptSources::all());
        info!("kernel: {} process slots", config.max_processes);

        Self {
            table: ProcessTable::new(config.max_processes),
            mailbox: Mailbox::with_capacity(config.max_processes),
            platform,
            config,
            gate,
            audit: AuditLog::new(),
            current: None,
            next: None,
        }
    }

    /// Makes the first scheduling decision once the boot services are loaded
    pub fn start(&mut self) -> Result<Dispatch, KernelFatal> {
        info!("kernel: starting scheduler");
        self.schedule()?;
        self.next.take().ok_or(KernelFatal::MissingProcess)
    }

    /// Handles one trap
    ///
    /// `interrupted` is the context of the process that was running when
    /// the trap was taken.
    pub fn trap(&mut self, mcause: u32, interrupted: Context) -> Result<Dispatch, KernelFatal> {
        if let Some(slot) = self.current.filter(|&slot| self.table.get(slot).is_some()) {
            self.table.save_context(slot, interrupted)?;
        }

        let cause = TrapCause::from_mcause(mcause);
        let handler = self.gate.route(cause)?;
        handler(self, cause.id())?;
        self.next.take().ok_or(KernelFatal::MissingProcess)
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn clear_audit_log(&mut self) {
        self.audit.clear();
    }

    /// Pid of the process dispatched last, if it is still alive
    pub fn current_pid(&self) -> Option<Pid> {
        self.current
            .and_then(|slot| self.table.get(slot))
            .map(|process| process.pid)
    }

    pub fn status_of(&self, pid: Pid) -> Option<ProcessStatus> {
        self.table.status_of(pid)
    }

    fn handle_interrupt(&mut self, id: u32) -> Result<(), KernelFatal> {
        match id {
            INTR_SOFTWARE => {
                let slot = self.current_slot()?;
                self.handle_syscall(slot)?;
                self.schedule()
            }
            INTR_TIMER => self.handle_timer(),
            INTR_EXTERNAL => self.schedule(),
            other => Err(KernelFatal::UnknownInterrupt(other)),
        }
    }

    fn handle_exception(&mut self, id: u32) -> Result<(), KernelFatal> {
        let slot = self.current_slot()?;
        match id {
            EXCP_ECALL_USER | EXCP_ECALL_MACHINE => {
                self.table.advance_resume(slot, self.config.ecall_len)?;
                self.handle_syscall(slot)?;
                self.schedule()
            }
            cause => {
                let process = self.table.get(slot).ok_or(KernelFatal::MissingProcess)?;
                let (pid, pc) = (process.pid, process.context.pc);
                if pid.is_kernel_service() {
                    return Err(KernelFatal::KernelException { pid, cause, pc });
                }
                warn!("kernel: exception {} in {} at {:#x}, terminating", cause, pid, pc);
                self.release(slot)?;
                self.schedule()
            }
        }
    }

    /// Preempts the running process, except for the services below the
    /// shell, which keep the core unless `preempt_services` is set
    fn handle_timer(&mut self) -> Result<(), KernelFatal> {
        if !self.config.preempt_services {
            if let Some(slot) = self.current {
                if let Some(process) = self.table.get(slot) {
                    if process.pid < SHELL_PID && process.status == ProcessStatus::Running {
                        let (pid, context) = (process.pid, process.context);
                        self.platform.reset_periodic_timer();
                        self.next = Some(Dispatch::Resume {
                            pid,
                            context,
                            privilege: Privilege::Machine,
                        });
                        return Ok(());
                    }
                }
            }
        }
        self.schedule()
    }

    fn current_slot(&self) -> Result<usize, KernelFatal> {
        self.current
            .filter(|&slot| self.table.get(slot).is_some())
            .ok_or(KernelFatal::MissingProcess)
    }

    /// Frees a slot along with its mailbox entry and address space
    fn release(&mut self, slot: usize) -> Result<Pid, KernelFatal> {
        let pid = self.table.free(slot)?;
        if self.mailbox.discard_for(pid) {
            info!("kernel: dropped undelivered message for {}", pid);
        }
        self.platform.release(pid);
        let timestamp_ticks = self.platform.poll_ticks();
        self.audit.record(ScheduleEvent::Exited {
            pid,
            timestamp_ticks,
        });
        info!("kernel: {} exited", pid);
        Ok(pid)
    }
}

impl<P: Platform> ProcessControl for Kernel<P> {
    fn alloc(&mut self, killable: bool) -> Option<Pid> {
        let (_, pid) = self.table.allocate(killable)?;
        info!("kernel: allocated {} (killable: {})", pid, killable);
        Some(pid)
    }

    fn free(&mut self, pid: Pid) -> Result<(), KernelError> {
        let slot = self
            .table
            .find(pid)
            .ok_or_else(|| KernelError::NotFound(pid.to_string()))?;
        self.release(slot)
            .map(|_| ())
            .map_err(|e| KernelError::InvalidState(e.to_string()))
    }

    fn set_ready(&mut self, pid: Pid, entry: usize) -> Result<(), KernelError> {
        let slot = self
            .table
            .find(pid)
            .ok_or_else(|| KernelError::NotFound(pid.to_string()))?;
        self.table
            .mark_ready(slot, entry)
            .map_err(|e| KernelError::InvalidState(e.to_string()))
    }
}
