//! # Kernel API
//!
//! This crate defines the interface between user-space code and the kernel.
//!
//! ## Philosophy
//!
//! The kernel offers exactly one communication mechanism, the synchronous
//! rendezvous channel, plus a handful of console operations:
//! - Requests travel through a shared, fixed-layout syscall record
//! - The user-space stub posts a request, signals the kernel and polls
//!   until the kernel marks the record unused again
//! - Kernel services (process manager, directory) are ordinary processes
//!   reached through the same channel
//!
//! ## Design Goals
//!
//! 1. **Byte-stable wire contract**: the record layout never changes
//! 2. **No blocking in the kernel**: "blocking" calls are a tagged
//!    request/response protocol with an explicit pending state
//! 3. **Testability**: the stub runs against any [`SyscallPort`], including
//!    an in-process loopback

pub mod error;
pub mod kernel;
pub mod requests;
pub mod syscall;
pub mod syscalls;

pub use error::KernelError;
pub use kernel::ProcessControl;
pub use requests::{decode_payload, encode_payload, DirReply, DirRequest, ProcReply, ProcRequest};
pub use syscall::{SyscallRecord, SyscallType, SYSCALL_MSG_LEN, TTY_WRITE_MAX};
pub use syscalls::{LoopbackPort, SyscallClient, SyscallPort, SyscallStatus};
