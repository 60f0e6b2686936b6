//! Scripted process behaviour

use core_types::Pid;

/// One action of a scripted application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send `bytes` to `to`, waiting until the mailbox takes them
    Send { to: Pid, bytes: Vec<u8> },
    /// Wait for a message
    Recv,
    TtyWrite(Vec<u8>),
    TtyRead,
    /// Burn the rest of the quantum
    Spin,
    /// Execute an illegal instruction
    Fault,
    /// Ask the process manager to end this process
    Exit(i32),
}

impl Step {
    pub fn send(to: u32, bytes: &[u8]) -> Self {
        Step::Send {
            to: Pid::new(to),
            bytes: bytes.to_vec(),
        }
    }

    /// `count` spins in a row
    pub fn spin(count: usize) -> Vec<Step> {
        vec![Step::Spin; count]
    }
}

/// What a process saw when one of its syscalls completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Sent { to: Pid, retval: i32 },
    /// Payload with trailing zero bytes removed
    Received { from: Pid, bytes: Vec<u8> },
    Read(u8),
    Wrote { retval: i32 },
}

/// Code a process runs
#[derive(Debug, Clone)]
pub(crate) enum Program {
    Script { steps: Vec<Step>, next: usize },
    /// Receive loop of the process manager
    ProcessManager,
    /// Receive loop of the directory service
    Directory,
    /// Receive loop that drops everything
    Parked,
}

/// Syscall a process is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pending {
    Send(Pid),
    Recv,
    TtyRead,
    TtyWrite,
    Exit,
}

/// User-space state of one process
#[derive(Debug, Clone)]
pub(crate) struct Runtime {
    pub program: Program,
    pub pending: Option<Pending>,
    /// Reply a service still owes, as (receiver, payload)
    pub reply: Option<(Pid, Vec<u8>)>,
    pub exiting: bool,
    /// Instructions issued so far, used to fake a program counter
    pub issued: usize,
}

impl Runtime {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            pending: None,
            reply: None,
            exiting: false,
            issued: 0,
        }
    }

    /// The next action; a finished script exits with status 0
    pub fn next_action(&mut self) -> Step {
        self.issued += 1;
        match &mut self.program {
            Program::Script { steps, next } => {
                let step = steps.get(*next).cloned().unwrap_or(Step::Exit(0));
                *next += 1;
                step
            }
            Program::ProcessManager | Program::Directory | Program::Parked => {
                match self.reply.take() {
                    Some((to, bytes)) => Step::Send { to, bytes },
                    None => Step::Recv,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_ends_in_exit() {
        let mut runtime = Runtime::new(Program::Script {
            steps: vec![Step::Recv],
            next: 0,
        });
        assert_eq!(runtime.next_action(), Step::Recv);
        assert_eq!(runtime.next_action(), Step::Exit(0));
        assert_eq!(runtime.issued, 2);
    }

    #[test]
    fn test_service_sends_owed_reply_first() {
        let mut runtime = Runtime::new(Program::ProcessManager);
        runtime.reply = Some((Pid::new(7), b"ok".to_vec()));
        assert_eq!(runtime.next_action(), Step::send(7, b"ok"));
        assert_eq!(runtime.next_action(), Step::Recv);
    }
}
