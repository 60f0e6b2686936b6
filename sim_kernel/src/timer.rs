//! # Simulated Timer Device
//!
//! Deterministic machine timer for testing.
//!
//! Time only advances when a test (or the scripted machine) says so.
//! The periodic interrupt is modelled as a deadline one quantum after the
//! last reset; nothing fires on its own, callers ask `expired()` and raise
//! the trap themselves.

use hal::TimerDevice;

/// Simulated timer device with controllable time progression
///
/// # Examples
///
/// ```
/// use sim_kernel::timer::SimTimerDevice;
/// use hal::TimerDevice;
///
/// let mut timer = SimTimerDevice::new(10);
/// timer.reset_periodic_timer();
/// timer.advance_ticks(9);
/// assert!(!timer.expired());
/// timer.advance_ticks(1);
/// assert!(timer.expired());
/// assert_eq!(timer.poll_ticks(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct SimTimerDevice {
    ticks: u64,
    quantum: u64,
    deadline: u64,
    resets: usize,
}

impl SimTimerDevice {
    /// Creates a timer at tick 0 with the given quantum
    pub fn new(quantum: u64) -> Self {
        Self {
            ticks: 0,
            quantum,
            deadline: quantum,
            resets: 0,
        }
    }

    /// Advances the timer by `delta` ticks
    pub fn advance_ticks(&mut self, delta: u64) {
        self.ticks = self.ticks.saturating_add(delta);
    }

    /// True once the current quantum has elapsed
    pub fn expired(&self) -> bool {
        self.ticks >= self.deadline
    }

    pub fn current_ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of times the periodic timer was re-armed
    pub fn reset_count(&self) -> usize {
        self.resets
    }
}

impl Default for SimTimerDevice {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TimerDevice for SimTimerDevice {
    fn poll_ticks(&mut self) -> u64 {
        self.ticks
    }

    fn reset_periodic_timer(&mut self) {
        self.deadline = self.ticks.saturating_add(self.quantum);
        self.resets += 1;
    }
}
