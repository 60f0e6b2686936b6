//! Deterministic fault injection for the simulated board
//!
//! Faults are consumed in the order they were added. No randomness.
//!
//! ## Example
//!
//! ```
//! use sim_kernel::fault_injection::{ConsoleFault, FaultInjector};
//! use hal::WriteOutcome;
//!
//! let mut faults = FaultInjector::new();
//! faults.add(ConsoleFault::StallWrites { count: 2 });
//! assert_eq!(faults.next_write_fault(), Some(WriteOutcome::WouldBlock));
//! assert_eq!(faults.next_write_fault(), Some(WriteOutcome::WouldBlock));
//! assert_eq!(faults.next_write_fault(), None);
//! ```

use hal::WriteOutcome;
use std::collections::VecDeque;

/// A fault to inject into console writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFault {
    /// Answer the next N writes with `WouldBlock`
    StallWrites { count: usize },
    /// Answer the next N writes with `Rejected`
    RejectWrites { count: usize },
}

/// Applies console faults in order
#[derive(Debug, Default)]
pub struct FaultInjector {
    pending: VecDeque<ConsoleFault>,
    applied: usize,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fault: ConsoleFault) {
        self.pending.push_back(fault);
    }

    /// Number of writes a fault was applied to
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Consumes one unit of the head fault, if any
    pub fn next_write_fault(&mut self) -> Option<WriteOutcome> {
        let fault = self.pending.front_mut()?;
        let (outcome, left) = match fault {
            ConsoleFault::StallWrites { count } => (WriteOutcome::WouldBlock, count),
            ConsoleFault::RejectWrites { count } => (WriteOutcome::Rejected, count),
        };
        if *left == 0 {
            self.pending.pop_front();
            return self.next_write_fault();
        }
        *left -= 1;
        if *left == 0 {
            self.pending.pop_front();
        }
        self.applied += 1;
        Some(outcome)
    }
}
