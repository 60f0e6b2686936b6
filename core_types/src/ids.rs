//! Process identifiers

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::service_ids::USER_PID_START;

/// Process identifier
///
/// Pids are small positive integers handed out from a monotonically
/// increasing counter. Zero is never a valid pid; the wire format uses it
/// to mean "no process".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(pub u32);

impl Pid {
    /// Creates a pid from its raw wire value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw wire value
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns true for the reserved pids of kernel services
    ///
    /// Kernel services, the shell included, run in machine mode.
    pub const fn is_kernel_service(self) -> bool {
        self.0 < USER_PID_START.0
    }

    /// Returns true for user applications
    pub const fn is_user_app(self) -> bool {
        !self.is_kernel_service()
    }
}

impl From<u32> for Pid {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PROCESS_MANAGER_PID, SHELL_PID};

    #[test]
    fn test_pid_partition() {
        assert!(PROCESS_MANAGER_PID.is_kernel_service());
        assert!(SHELL_PID.is_kernel_service());
        assert!(USER_PID_START.is_user_app());
        assert!(Pid::new(10).is_user_app());
    }

    #[test]
    fn test_pid_display() {
        assert_eq!(format!("{}", Pid::new(11)), "Pid(11)");
    }

    #[test]
    fn test_pid_serializes_as_number() {
        let json = serde_json::to_string(&Pid::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: Pid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Pid::new(7));
    }
}
