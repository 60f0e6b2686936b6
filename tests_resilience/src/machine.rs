//! Whole-system simulator
//!
//! Plays the part of the CPU: it runs whichever process the kernel last
//! dispatched, turns that process's next action into a trap, and hands the
//! trap to the kernel. Device activity comes from bytes typed by the test
//! and, when a test asks for one, a heartbeat device interrupting every
//! few steps.

use crate::program::{Observation, Pending, Program, Runtime, Step};
use core_types::{Pid, DIR_SERVICE_PID, FILE_SERVICE_PID, PROCESS_MANAGER_PID, SHELL_PID};
use hal::RamFileStore;
use kernel::{ConfigError, Context, Dispatch, Kernel, KernelConfig, KernelFatal, ProcessStatus};
use kernel_api::{encode_payload, ProcRequest};
use log::{debug, error, warn};
use services_dir::DirectoryService;
use services_process_manager::{ProcessManager, ProcessManagerError};
use sim_kernel::loader::SimImageLoader;
use sim_kernel::test_utils::{
    file_store_with_programs, stage_recv, stage_send, stage_tty_read, stage_tty_write,
    MCAUSE_EXTERNAL, MCAUSE_ILLEGAL_INSTRUCTION, MCAUSE_SOFTWARE, MCAUSE_TIMER,
};
use sim_kernel::{SimPlatform, Wakeup};
use std::collections::HashMap;
use thiserror::Error;

/// Inode of the binary directory
pub const BIN_DIR: u32 = 1;

/// Interrupt-controller source of the heartbeat device
pub const HEARTBEAT_CAUSE: u32 = 9;

const CODE_BASE: usize = 0x2000_0000;
const STACK_TOP: usize = 0x2040_0000;

/// Heartbeat wakeups kept queued for the idle loop
const IDLE_WAKEUPS: usize = 3;

/// Boot images in pid order
const SERVICES: [(&str, Pid); 4] = [
    ("process_manager", PROCESS_MANAGER_PID),
    ("file_service", FILE_SERVICE_PID),
    ("dir_service", DIR_SERVICE_PID),
    ("shell", SHELL_PID),
];

type Manager = ProcessManager<SimImageLoader, RamFileStore, DirectoryService<RamFileStore>>;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Kernel fault: {0}")]
    Kernel(#[from] KernelFatal),

    #[error("Process manager error: {0}")]
    Manager(#[from] ProcessManagerError),

    #[error("{name} booted as {pid}, expected {expected}")]
    ServiceOrder {
        name: &'static str,
        pid: Pid,
        expected: Pid,
    },
}

/// Kernel, board, services and scripted applications in one box
pub struct SimMachine {
    kernel: Kernel<SimPlatform>,
    manager: Manager,
    scripts: HashMap<String, Vec<Step>>,
    runtimes: HashMap<Pid, Runtime>,
    dispatch: Dispatch,
    observations: Vec<(Pid, Observation)>,
    steps: u64,
    heartbeat_every: u64,
}

impl SimMachine {
    /// Boots the four services and installs `apps` in the binary directory
    ///
    /// Applications are not started; use [`SimMachine::spawn`] or a spawn
    /// request to the process manager.
    pub fn boot(config: KernelConfig, apps: &[(&str, Vec<Step>)]) -> Result<Self, BootError> {
        config.validate()?;

        let entries: Vec<(&str, u32)> = SERVICES
            .iter()
            .map(|(name, _)| *name)
            .chain(apps.iter().map(|(name, _)| *name))
            .zip(2..)
            .collect();
        let loader = SimImageLoader::new(config.app_entry);
        let resolver = DirectoryService::new(file_store_with_programs(BIN_DIR, &entries));
        let mut manager = ProcessManager::new(
            loader,
            file_store_with_programs(BIN_DIR, &entries),
            resolver,
            BIN_DIR,
        );

        let mut kernel = Kernel::new(SimPlatform::new(), config);
        let mut runtimes = HashMap::new();
        for (&(name, expected), &(_, ino)) in SERVICES.iter().zip(entries.iter()) {
            let pid = manager.boot_service(&mut kernel, ino)?;
            if pid != expected {
                return Err(BootError::ServiceOrder {
                    name,
                    pid,
                    expected,
                });
            }
            runtimes.insert(pid, Runtime::new(service_program(pid)));
        }
        let dispatch = kernel.start()?;

        Ok(Self {
            kernel,
            manager,
            scripts: apps
                .iter()
                .map(|(name, steps)| (name.to_string(), steps.clone()))
                .collect(),
            runtimes,
            dispatch,
            observations: Vec::new(),
            steps: 0,
            heartbeat_every: 0,
        })
    }

    /// Sets how many steps pass between heartbeat interrupts; 0, the
    /// default, means no heartbeat
    pub fn with_heartbeat(mut self, every: u64) -> Self {
        self.heartbeat_every = every;
        self
    }

    pub fn kernel(&self) -> &Kernel<SimPlatform> {
        &self.kernel
    }

    pub fn board(&self) -> &SimPlatform {
        self.kernel.platform()
    }

    pub fn board_mut(&mut self) -> &mut SimPlatform {
        self.kernel.platform_mut()
    }

    pub fn clear_audit_log(&mut self) {
        self.kernel.clear_audit_log();
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// The dispatch the machine is currently executing
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    pub fn current_pid(&self) -> Pid {
        self.dispatch.pid()
    }

    pub fn status_of(&self, pid: Pid) -> Option<ProcessStatus> {
        self.kernel.status_of(pid)
    }

    pub fn observations(&self) -> &[(Pid, Observation)] {
        &self.observations
    }

    /// Completed syscalls of `pid`, in order
    pub fn observations_of(&self, pid: Pid) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|(p, _)| *p == pid)
            .map(|(_, o)| o)
            .collect()
    }

    /// Messages `pid` has received, as (sender, bytes)
    pub fn received_by(&self, pid: Pid) -> Vec<(Pid, Vec<u8>)> {
        self.observations_of(pid)
            .into_iter()
            .filter_map(|o| match o {
                Observation::Received { from, bytes } => Some((*from, bytes.clone())),
                _ => None,
            })
            .collect()
    }

    /// Starts a program the way the shell would, bypassing the mailbox
    pub fn spawn(&mut self, name: &str) -> Result<Pid, ProcessManagerError> {
        self.manager.spawn(&mut self.kernel, name, Vec::new())
    }

    /// Takes a trap with `mcause` from whatever is running
    pub fn interrupt(&mut self, mcause: u32) -> Result<(), KernelFatal> {
        let pc = self.resume_pc();
        self.trap(mcause, pc)
    }

    /// Bytes arrive on the console and the receive interrupt fires
    pub fn type_keys(&mut self, bytes: &[u8]) -> Result<(), KernelFatal> {
        self.kernel.platform_mut().type_input(bytes);
        self.interrupt(MCAUSE_EXTERNAL)
    }

    pub fn run(&mut self, steps: usize) -> Result<(), KernelFatal> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Steps until `done` holds, checking before every step
    ///
    /// Returns whether `done` held within `max_steps`.
    pub fn run_until<F>(&mut self, max_steps: usize, mut done: F) -> Result<bool, KernelFatal>
    where
        F: FnMut(&SimMachine) -> bool,
    {
        for _ in 0..max_steps {
            if done(self) {
                return Ok(true);
            }
            self.step()?;
        }
        Ok(done(self))
    }

    /// Steps until every pid in `pids` is gone from the process table
    pub fn run_until_exited(&mut self, pids: &[Pid], max_steps: usize) -> Result<bool, KernelFatal> {
        self.run_until(max_steps, |m| pids.iter().all(|&pid| m.status_of(pid).is_none()))
    }

    /// Executes one step of the dispatched process
    ///
    /// A step either looks at the result of a completed syscall or issues
    /// the next action, which always ends in a trap.
    pub fn step(&mut self) -> Result<(), KernelFatal> {
        self.steps += 1;
        let pid = self.dispatch.pid();
        let pc = self.resume_pc();
        let trampoline = self.kernel.config().exit_trampoline;

        if self.heartbeat_every > 0 && self.steps % self.heartbeat_every == 0 {
            self.kernel.platform_mut().raise_external(HEARTBEAT_CAUSE);
            return self.trap(MCAUSE_EXTERNAL, pc);
        }

        let runtime = self.runtime_mut(pid);
        if pc == trampoline && !runtime.exiting {
            debug!("machine: {} resumed at the exit trampoline", pid);
            runtime.pending = None;
            return self.exit(pid, 0, trampoline);
        }
        if let Some(pending) = runtime.pending.take() {
            return self.complete(pid, pending, pc);
        }
        if runtime.exiting {
            return self.trap(MCAUSE_TIMER, pc);
        }

        let timer = self.kernel.platform_mut().timer_mut();
        timer.advance_ticks(1);
        if timer.expired() {
            return self.trap(MCAUSE_TIMER, pc);
        }

        let runtime = self.runtime_mut(pid);
        let action = runtime.next_action();
        let pc = CODE_BASE + 4 * runtime.issued;
        self.perform(pid, action, pc)
    }

    fn resume_pc(&self) -> usize {
        match self.dispatch {
            Dispatch::Enter { entry, .. } => entry,
            Dispatch::Resume { context, .. } => context.pc,
        }
    }

    fn runtime_mut(&mut self, pid: Pid) -> &mut Runtime {
        let scripts = &self.scripts;
        let manager = &self.manager;
        self.runtimes.entry(pid).or_insert_with(|| {
            let steps = manager
                .loader()
                .program_of(pid)
                .and_then(|name| scripts.get(name))
                .cloned()
                .unwrap_or_default();
            Runtime::new(Program::Script { steps, next: 0 })
        })
    }

    fn perform(&mut self, pid: Pid, action: Step, pc: usize) -> Result<(), KernelFatal> {
        let board = self.kernel.platform_mut();
        let pending = match action {
            Step::Send { to, bytes } => {
                stage_send(board, pid, to, &bytes);
                Pending::Send(to)
            }
            Step::Recv => {
                stage_recv(board, pid);
                Pending::Recv
            }
            Step::TtyWrite(bytes) => {
                stage_tty_write(board, pid, &bytes);
                Pending::TtyWrite
            }
            Step::TtyRead => {
                stage_tty_read(board, pid);
                Pending::TtyRead
            }
            Step::Spin => return self.trap(MCAUSE_TIMER, pc),
            Step::Fault => return self.trap(MCAUSE_ILLEGAL_INSTRUCTION, pc),
            Step::Exit(status) => return self.exit(pid, status, pc),
        };
        self.runtime_mut(pid).pending = Some(pending);
        self.trap(MCAUSE_SOFTWARE, pc)
    }

    /// Sends the exit request to the process manager
    fn exit(&mut self, pid: Pid, status: i32, pc: usize) -> Result<(), KernelFatal> {
        let bytes = match encode_payload(&ProcRequest::Exit { status }) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("machine: cannot encode exit for {}: {}", pid, err);
                return self.trap(MCAUSE_TIMER, pc);
            }
        };
        stage_send(self.kernel.platform_mut(), pid, PROCESS_MANAGER_PID, &bytes);
        let runtime = self.runtime_mut(pid);
        runtime.exiting = true;
        runtime.pending = Some(Pending::Exit);
        self.trap(MCAUSE_SOFTWARE, pc)
    }

    fn complete(&mut self, pid: Pid, pending: Pending, pc: usize) -> Result<(), KernelFatal> {
        let record = self
            .kernel
            .platform()
            .record(pid)
            .ok_or(KernelFatal::MissingProcess)?;
        if record.is_pending() {
            // the stub keeps polling until the kernel finishes the request
            self.runtime_mut(pid).pending = Some(pending);
            return self.trap(MCAUSE_TIMER, pc);
        }

        let retval = record.retval;
        let from = record.sender_pid();
        let payload = record.payload;
        let observation = match pending {
            Pending::Send(to) => Some(Observation::Sent { to, retval }),
            Pending::Recv => {
                let end = payload.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Some(Observation::Received {
                    from,
                    bytes: payload[..end].to_vec(),
                })
            }
            Pending::TtyRead => Some(Observation::Read(payload[0])),
            Pending::TtyWrite => Some(Observation::Wrote { retval }),
            Pending::Exit => None,
        };
        if let Some(observation) = observation {
            self.observations.push((pid, observation));
        }
        if pending == Pending::Recv {
            self.serve(pid, from, &payload);
        }
        Ok(())
    }

    /// Runs the request handler of a service that just received
    fn serve(&mut self, pid: Pid, sender: Pid, payload: &[u8]) {
        let is_manager = matches!(self.runtime_mut(pid).program, Program::ProcessManager);
        let is_directory = matches!(self.runtime_mut(pid).program, Program::Directory);

        let reply = if is_manager {
            self.manager
                .handle_payload(&mut self.kernel, sender, payload)
                .unwrap_or_else(|err| {
                    warn!("machine: process manager rejected request from {}: {}", sender, err);
                    None
                })
        } else if is_directory {
            match self.manager.resolver_mut().handle_payload(payload) {
                Ok(reply) => Some(reply),
                Err(err) => {
                    warn!("machine: directory rejected request from {}: {}", sender, err);
                    None
                }
            }
        } else {
            None
        };
        if let Some(bytes) = reply {
            self.runtime_mut(pid).reply = Some((sender, bytes));
        }
    }

    fn trap(&mut self, mcause: u32, pc: usize) -> Result<(), KernelFatal> {
        let board = self.kernel.platform_mut();
        while board.pending_wakeups() < IDLE_WAKEUPS {
            board.schedule_wakeup(Wakeup::External(HEARTBEAT_CAUSE));
        }
        match self.kernel.trap(mcause, Context::new(pc, STACK_TOP)) {
            Ok(dispatch) => {
                self.dispatch = dispatch;
                Ok(())
            }
            Err(fatal) => {
                error!("machine: kernel halted: {}", fatal);
                Err(fatal)
            }
        }
    }
}

fn service_program(pid: Pid) -> Program {
    match pid {
        PROCESS_MANAGER_PID => Program::ProcessManager,
        DIR_SERVICE_PID => Program::Directory,
        _ => Program::Parked,
    }
}
