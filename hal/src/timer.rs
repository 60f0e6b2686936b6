//! # Timer Device
//!
//! Hardware abstraction for the machine timer.
//!
//! The timer serves two purposes: a monotonic tick counter used for audit
//! timestamps, and the periodic interrupt that drives round-robin
//! preemption. The kernel re-arms the periodic interrupt every time it
//! dispatches a process, so each process gets a full quantum.

/// Hardware timer device trait
///
/// # Implementation Notes
///
/// - `poll_ticks` must be monotonic and must not block
/// - Tick frequency and quantum length are implementation-defined
///
/// # Examples
///
/// ```
/// use hal::TimerDevice;
///
/// fn measure_operation<T: TimerDevice>(timer: &mut T) -> u64 {
///     let start = timer.poll_ticks();
///     // ... do work ...
///     timer.poll_ticks() - start
/// }
/// ```
pub trait TimerDevice {
    /// Returns the current tick count
    fn poll_ticks(&mut self) -> u64;

    /// Schedules the next periodic timer interrupt one quantum from now
    fn reset_periodic_timer(&mut self);
}
