//! # Inter-Process Communication (IPC)
//!
//! This crate defines the rendezvous channel: the only way two processes
//! exchange data.
//!
//! ## Philosophy
//!
//! - **One message in flight per receiver**: a mailbox slot holds at most
//!   one unconsumed message, so buffering is bounded and senders feel
//!   backpressure.
//! - **Non-blocking primitives**: `send` and `receive` either succeed or
//!   report a retryable condition. Blocking is simulated one layer up by
//!   re-issuing the request on later traps.
//! - **Exact delivery**: the receiver observes exactly the bytes the
//!   sender wrote, once.
//!
//! Only the kernel touches the mailbox, and the kernel runs one trap at a
//! time, so no locking is involved.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod mailbox;
pub mod message;

pub use mailbox::{Mailbox, MailboxError};
pub use message::{Message, MESSAGE_LEN};
