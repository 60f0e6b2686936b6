//! CPU abstraction

/// CPU-specific operations
pub trait CpuHal {
    /// Halts the CPU until the next enabled interrupt is pending
    ///
    /// Returns without taking the trap; the caller re-enables sources and
    /// services whatever woke it.
    fn wait_for_interrupt(&mut self);
}
