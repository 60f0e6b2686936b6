//! The shared syscall record
//!
//! Every process owns one record, mapped at the same fixed address in
//! every address space. User code writes a request into it and raises a
//! software interrupt; the kernel reads it after switching to the
//! requester's address space and writes the result back in place.

use core::fmt;
use core_types::Pid;
use static_assertions::{const_assert_eq, assert_eq_align, assert_eq_size};

/// Payload capacity of the syscall record
pub const SYSCALL_MSG_LEN: usize = ipc::MESSAGE_LEN;

/// Largest number of bytes a single console write may carry
///
/// The first four payload bytes hold the length.
pub const TTY_WRITE_MAX: usize = SYSCALL_MSG_LEN - 4;

/// Request type stored in the first word of the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SyscallType {
    /// No request outstanding (or the previous one completed)
    Unused = 0,
    /// Receive a message addressed to the caller
    Recv = 1,
    /// Send a message to the pid in `receiver`
    Send = 2,
    /// Read one console character
    TtyRead = 3,
    /// Write console output
    TtyWrite = 4,
}

impl TryFrom<u32> for SyscallType {
    type Error = u32;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(SyscallType::Unused),
            1 => Ok(SyscallType::Recv),
            2 => Ok(SyscallType::Send),
            3 => Ok(SyscallType::TtyRead),
            4 => Ok(SyscallType::TtyWrite),
            other => Err(other),
        }
    }
}

/// Byte-stable syscall record
///
/// Layout: type at 0, sender at 4, receiver at 8, payload at 12,
/// retval at 1036, 1040 bytes in total.
#[derive(Clone, PartialEq, Eq)]
#[repr(C)]
pub struct SyscallRecord {
    /// Raw [`SyscallType`] value
    pub kind: u32,
    pub sender: u32,
    pub receiver: u32,
    pub payload: [u8; SYSCALL_MSG_LEN],
    pub retval: i32,
}

assert_eq_size!(SyscallRecord, [u8; 1040]);
assert_eq_align!(SyscallRecord, u32);
const_assert_eq!(core::mem::offset_of!(SyscallRecord, kind), 0);
const_assert_eq!(core::mem::offset_of!(SyscallRecord, sender), 4);
const_assert_eq!(core::mem::offset_of!(SyscallRecord, receiver), 8);
const_assert_eq!(core::mem::offset_of!(SyscallRecord, payload), 12);
const_assert_eq!(core::mem::offset_of!(SyscallRecord, retval), 1036);

impl SyscallRecord {
    /// Creates an unused, zeroed record
    pub const fn new() -> Self {
        Self {
            kind: SyscallType::Unused as u32,
            sender: 0,
            receiver: 0,
            payload: [0; SYSCALL_MSG_LEN],
            retval: 0,
        }
    }

    /// Decodes the request type, returning the raw value if unknown
    pub fn request_type(&self) -> Result<SyscallType, u32> {
        SyscallType::try_from(self.kind)
    }

    /// Stores `kind` as the outstanding request
    pub fn arm(&mut self, kind: SyscallType) {
        self.kind = kind as u32;
    }

    /// Marks the record as having no outstanding request
    pub fn disarm(&mut self) {
        self.kind = SyscallType::Unused as u32;
    }

    /// True while a request has been posted and not yet completed
    pub fn is_pending(&self) -> bool {
        self.kind != SyscallType::Unused as u32
    }

    pub fn sender_pid(&self) -> Pid {
        Pid::new(self.sender)
    }

    pub fn receiver_pid(&self) -> Pid {
        Pid::new(self.receiver)
    }

    /// Copies `bytes` into the payload, zero-filling the rest
    ///
    /// Input longer than the payload is truncated.
    pub fn set_payload(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(SYSCALL_MSG_LEN);
        self.payload[..len].copy_from_slice(&bytes[..len]);
        self.payload[len..].fill(0);
    }

    /// Encodes a console write as `len u32 LE` followed by the bytes
    ///
    /// Output longer than [`TTY_WRITE_MAX`] is truncated; callers that
    /// care check the length first.
    pub fn set_tty_write(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(TTY_WRITE_MAX);
        self.payload.fill(0);
        self.payload[..4].copy_from_slice(&(len as u32).to_le_bytes());
        self.payload[4..4 + len].copy_from_slice(&bytes[..len]);
    }

    /// Decodes a console write, or `None` if the declared length is too large
    pub fn tty_write_bytes(&self) -> Option<&[u8]> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.payload[..4]);
        let len = u32::from_le_bytes(raw) as usize;
        if len > TTY_WRITE_MAX {
            return None;
        }
        Some(&self.payload[4..4 + len])
    }
}

impl Default for SyscallRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyscallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self
            .payload
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |idx| idx + 1);
        f.debug_struct("SyscallRecord")
            .field("kind", &self.request_type())
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .field("payload", &&self.payload[..used])
            .field("retval", &self.retval)
            .finish()
    }
}
