//! # Core Types
//!
//! This crate defines the fundamental types shared by the kernel, the
//! user-space syscall stub and the kernel services.
//!
//! ## Key Types
//!
//! - [`Pid`]: 32-bit process identifier
//! - Reserved pids for the kernel services (see [`service_ids`])

#![cfg_attr(not(test), no_std)]

pub mod ids;
pub mod service_ids;

pub use ids::Pid;
pub use service_ids::{
    DIR_SERVICE_PID, FILE_SERVICE_PID, PROCESS_MANAGER_PID, SHELL_PID, USER_PID_START,
};
