//! Interrupt handling abstraction

use bitflags::bitflags;

bitflags! {
    /// Interrupt sources the kernel masks and unmasks
    ///
    /// Bit positions match the machine interrupt-enable register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterruptSources: u32 {
        const SOFTWARE = 1 << 3;
        const TIMER = 1 << 7;
        const EXTERNAL = 1 << 11;
    }
}

/// Device that raised an external interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalCause {
    /// The console UART has received data
    Console,
    /// Any other interrupt-controller source
    Other(u32),
}

/// Interrupt-controller operations
///
/// Registering the trap vector itself is board code; the kernel only
/// decides which sources are enabled and claims external causes.
pub trait InterruptHal {
    /// Enables `sources`, leaving the others unchanged
    fn enable_sources(&mut self, sources: InterruptSources);

    /// Disables `sources`, leaving the others unchanged
    fn disable_sources(&mut self, sources: InterruptSources);

    /// Returns the currently enabled sources
    fn enabled_sources(&self) -> InterruptSources;

    /// Claims the next pending external cause, if any
    fn claim_pending_external(&mut self) -> Option<ExternalCause>;

    /// Signals completion of a claimed cause
    fn complete_external(&mut self, cause: ExternalCause);
}
