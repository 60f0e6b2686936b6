//! User-side syscall stub
//!
//! The stub fills the caller's syscall record, raises the software
//! interrupt and polls until the kernel marks the record unused. A request
//! the kernel cannot complete yet simply stays pending across polls, so the
//! caller observes a "blocking" call without the kernel ever blocking.

use crate::requests::{encode_payload, ProcRequest};
use crate::syscall::{SyscallRecord, SyscallType, SYSCALL_MSG_LEN, TTY_WRITE_MAX};
use crate::KernelError;
use core_types::{Pid, PROCESS_MANAGER_PID};

/// Access to the caller's syscall record and the software interrupt line
pub trait SyscallPort {
    /// The record mapped into the caller's address space
    fn record(&mut self) -> &mut SyscallRecord;

    /// Raises the software interrupt that hands control to the kernel
    fn signal(&mut self);

    /// Called between polls of a pending request
    fn relax(&mut self) {
        core::hint::spin_loop();
    }
}

/// Observed state of the caller's last request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallStatus {
    /// The kernel has not completed the request yet
    Pending,
    /// The request completed with the given return value
    Complete(i32),
}

/// Syscall client bound to one port
pub struct SyscallClient<P: SyscallPort> {
    port: P,
}

impl<P: SyscallPort> SyscallClient<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    /// Writes a request into the record and signals the kernel
    ///
    /// The payload must already be in place; only the header is written.
    pub fn post(&mut self, kind: SyscallType, receiver: Pid) {
        let record = self.port.record();
        record.receiver = receiver.as_u32();
        record.retval = 0;
        record.arm(kind);
        self.port.signal();
    }

    /// Checks whether the last posted request has completed
    pub fn poll(&mut self) -> SyscallStatus {
        let record = self.port.record();
        if record.is_pending() {
            SyscallStatus::Pending
        } else {
            SyscallStatus::Complete(record.retval)
        }
    }

    /// Posts a request and polls until it completes
    pub fn invoke(&mut self, kind: SyscallType, receiver: Pid) -> i32 {
        self.post(kind, receiver);
        loop {
            match self.poll() {
                SyscallStatus::Complete(retval) => return retval,
                SyscallStatus::Pending => self.port.relax(),
            }
        }
    }

    /// Sends `bytes` to `receiver`, returning once the message was accepted
    pub fn sys_send(&mut self, receiver: Pid, bytes: &[u8]) -> Result<(), KernelError> {
        if bytes.len() > SYSCALL_MSG_LEN {
            return Err(KernelError::MessageTooLarge {
                len: bytes.len(),
                max: SYSCALL_MSG_LEN,
            });
        }
        self.port.record().set_payload(bytes);
        check(self.invoke(SyscallType::Send, receiver))
    }

    /// Receives the next message addressed to the caller
    ///
    /// Copies the first `buf.len()` payload bytes into `buf` and returns
    /// the sender with the number of bytes copied.
    pub fn sys_recv(&mut self, buf: &mut [u8]) -> Result<(Pid, usize), KernelError> {
        if buf.len() > SYSCALL_MSG_LEN {
            return Err(KernelError::MessageTooLarge {
                len: buf.len(),
                max: SYSCALL_MSG_LEN,
            });
        }
        check(self.invoke(SyscallType::Recv, Pid::new(0)))?;
        let record = self.port.record();
        let len = buf.len();
        buf.copy_from_slice(&record.payload[..len]);
        Ok((record.sender_pid(), len))
    }

    /// Reads one console character
    pub fn sys_tty_read(&mut self) -> Result<u8, KernelError> {
        check(self.invoke(SyscallType::TtyRead, Pid::new(0)))?;
        Ok(self.port.record().payload[0])
    }

    /// Writes console output
    pub fn sys_tty_write(&mut self, bytes: &[u8]) -> Result<(), KernelError> {
        if bytes.len() > TTY_WRITE_MAX {
            return Err(KernelError::MessageTooLarge {
                len: bytes.len(),
                max: TTY_WRITE_MAX,
            });
        }
        self.port.record().set_tty_write(bytes);
        check(self.invoke(SyscallType::TtyWrite, Pid::new(0)))
    }

    /// Asks the process manager to terminate the caller
    ///
    /// On real hardware the caller never runs again once this returns.
    pub fn sys_exit(&mut self, status: i32) -> Result<(), KernelError> {
        let bytes = encode_payload(&ProcRequest::Exit { status })?;
        self.sys_send(PROCESS_MANAGER_PID, &bytes)
    }
}

fn check(retval: i32) -> Result<(), KernelError> {
    if retval < 0 {
        Err(KernelError::RequestFailed(retval))
    } else {
        Ok(())
    }
}

type Handler = Box<dyn FnMut(&mut SyscallRecord) + Send>;

/// In-process port that completes requests with a handler
///
/// The handler stands in for the kernel. With a delay, the request stays
/// pending for that many polls before the handler runs.
pub struct LoopbackPort {
    record: SyscallRecord,
    handler: Handler,
    delay: usize,
    remaining: Option<usize>,
    signals: usize,
}

impl LoopbackPort {
    pub fn new(handler: impl FnMut(&mut SyscallRecord) + Send + 'static) -> Self {
        Self {
            record: SyscallRecord::new(),
            handler: Box::new(handler),
            delay: 0,
            remaining: None,
            signals: 0,
        }
    }

    /// Keeps every request pending for `polls` relax calls
    pub fn with_delay(mut self, polls: usize) -> Self {
        self.delay = polls;
        self
    }

    /// Number of software interrupts raised so far
    pub fn signal_count(&self) -> usize {
        self.signals
    }

    fn complete(&mut self) {
        self.remaining = None;
        (self.handler)(&mut self.record);
        self.record.disarm();
    }
}

impl SyscallPort for LoopbackPort {
    fn record(&mut self) -> &mut SyscallRecord {
        &mut self.record
    }

    fn signal(&mut self) {
        self.signals += 1;
        if self.delay == 0 {
            self.complete();
        } else {
            self.remaining = Some(self.delay);
        }
    }

    fn relax(&mut self) {
        match self.remaining {
            Some(0) | Some(1) => self.complete(),
            Some(n) => self.remaining = Some(n - 1),
            None => {}
        }
    }
}
