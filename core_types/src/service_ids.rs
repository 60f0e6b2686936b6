//! Reserved pids for core kernel services.
//!
//! The boot sequence loads the services in this order, so the monotonic
//! pid allocator hands out exactly these numbers.

use crate::Pid;

/// Process-lifecycle manager (spawn, exit)
pub const PROCESS_MANAGER_PID: Pid = Pid(1);

/// File service
pub const FILE_SERVICE_PID: Pid = Pid(2);

/// Directory service (name lookup)
pub const DIR_SERVICE_PID: Pid = Pid(3);

/// Shell
pub const SHELL_PID: Pid = Pid(4);

/// First pid handed to a user application; everything below is a service.
pub const USER_PID_START: Pid = Pid(5);
