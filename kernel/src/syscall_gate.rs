//! Kernel side of the syscall protocol
//!
//! The stub arms the record and traps. The gateway disarms it, marks the
//! caller requesting and tries the operation once:
//! - success leaves `retval = 0` and the caller runnable
//! - a caller error sets `retval = -1` and the caller runnable
//! - a retryable condition re-arms the record and leaves the caller
//!   blocked until a later drain retries it

use crate::{Kernel, KernelFatal};
use core_types::Pid;
use hal::{Platform, WriteOutcome};
use kernel_api::{SyscallType, TTY_WRITE_MAX};
use log::debug;

/// Where a retryable request waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Send(Pid),
    Receive,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    Failed,
    Retry(Block),
}

impl<P: Platform> Kernel<P> {
    /// Handles a syscall trap from the process in `slot`
    ///
    /// The caller's address space is the installed one.
    pub(crate) fn handle_syscall(&mut self, slot: usize) -> Result<(), KernelFatal> {
        let pid = self.slot_pid(slot)?;
        let record = self.platform.syscall_record();
        let kind = record
            .request_type()
            .map_err(|raw| KernelFatal::UnknownSyscall { pid, raw })?;

        if kind == SyscallType::Unused {
            debug!("syscall: spurious trap from {}", pid);
            self.table.mark_runnable(slot)?;
            return Ok(());
        }

        record.disarm();
        record.retval = 0;
        self.table.mark_requesting(slot)?;
        self.service_request(slot, pid, kind)
    }

    /// Re-issues the pending request of a blocked process
    pub(crate) fn retry_request(&mut self, slot: usize) -> Result<(), KernelFatal> {
        let pid = self.slot_pid(slot)?;
        self.platform.switch_context(pid);
        let record = self.platform.syscall_record();
        let kind = record
            .request_type()
            .map_err(|raw| KernelFatal::UnknownSyscall { pid, raw })?;

        record.disarm();
        record.retval = 0;
        self.table.mark_requesting(slot)?;
        if kind == SyscallType::Unused {
            self.table.mark_runnable(slot)?;
            return Ok(());
        }
        self.service_request(slot, pid, kind)
    }

    fn service_request(&mut self, slot: usize, pid: Pid, kind: SyscallType) -> Result<(), KernelFatal> {
        let outcome = match kind {
            SyscallType::Send => self.rendezvous_send(pid),
            SyscallType::Recv => self.rendezvous_recv(pid),
            SyscallType::TtyRead => self.tty_read(),
            SyscallType::TtyWrite => self.tty_write(),
            SyscallType::Unused => Outcome::Done,
        };

        match outcome {
            Outcome::Done => self.table.mark_runnable(slot)?,
            Outcome::Failed => {
                debug!("syscall: {:?} from {} failed", kind, pid);
                self.platform.syscall_record().retval = -1;
                self.table.mark_runnable(slot)?;
            }
            Outcome::Retry(block) => {
                debug!("syscall: {:?} from {} must retry", kind, pid);
                self.platform.syscall_record().arm(kind);
                match block {
                    Block::Send(peer) => self.table.mark_waiting_to_send(slot, peer)?,
                    Block::Receive => self.table.mark_waiting_to_receive(slot)?,
                    Block::Io => {}
                }
            }
        }
        Ok(())
    }

    fn rendezvous_send(&mut self, pid: Pid) -> Outcome {
        let record = self.platform.syscall_record();
        record.sender = pid.as_u32();
        let receiver = record.receiver_pid();
        let payload = record.payload;

        if self.table.find(receiver).is_none() {
            return Outcome::Failed;
        }
        match self.mailbox.send(pid, receiver, &payload) {
            Ok(()) => Outcome::Done,
            Err(e) if e.is_retryable() => Outcome::Retry(Block::Send(receiver)),
            Err(_) => Outcome::Failed,
        }
    }

    fn rendezvous_recv(&mut self, pid: Pid) -> Outcome {
        match self.mailbox.receive(pid) {
            Ok(message) => {
                let record = self.platform.syscall_record();
                record.sender = message.sender.as_u32();
                record.receiver = message.receiver.as_u32();
                record.payload = message.payload;
                Outcome::Done
            }
            Err(_) => Outcome::Retry(Block::Receive),
        }
    }

    fn tty_read(&mut self) -> Outcome {
        match self.platform.read_one() {
            Some(byte) => {
                self.platform.syscall_record().set_payload(&[byte]);
                Outcome::Done
            }
            None => Outcome::Retry(Block::Io),
        }
    }

    fn tty_write(&mut self) -> Outcome {
        let mut buf = [0u8; TTY_WRITE_MAX];
        let len = match self.platform.syscall_record().tty_write_bytes() {
            Some(bytes) => {
                buf[..bytes.len()].copy_from_slice(bytes);
                bytes.len()
            }
            None => return Outcome::Failed,
        };
        match self.platform.write_bytes(&buf[..len]) {
            WriteOutcome::Ok => Outcome::Done,
            WriteOutcome::WouldBlock => Outcome::Retry(Block::Io),
            WriteOutcome::Rejected => Outcome::Failed,
        }
    }

    fn slot_pid(&self, slot: usize) -> Result<Pid, KernelFatal> {
        self.table
            .get(slot)
            .map(|process| process.pid)
            .ok_or(KernelFatal::MissingProcess)
    }
}
