//! Hardware trap gate
//!
//! Decodes the trap cause register and forwards the trap to one of two
//! handler slots registered at start-up.

use crate::KernelFatal;

/// Software interrupt raised by the syscall stub
pub const INTR_SOFTWARE: u32 = 3;
/// Machine timer interrupt
pub const INTR_TIMER: u32 = 7;
/// External interrupt-controller interrupt
pub const INTR_EXTERNAL: u32 = 11;
/// Environment call from user mode
pub const EXCP_ECALL_USER: u32 = 8;
/// Environment call from machine mode
pub const EXCP_ECALL_MACHINE: u32 = 11;

const CAUSE_INTERRUPT_BIT: u32 = 1 << 31;
const CAUSE_ID_MASK: u32 = 0x3FF;

/// Decoded trap cause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCause {
    Interrupt(u32),
    Exception(u32),
}

impl TrapCause {
    pub fn from_mcause(mcause: u32) -> Self {
        let id = mcause & CAUSE_ID_MASK;
        if mcause & CAUSE_INTERRUPT_BIT != 0 {
            TrapCause::Interrupt(id)
        } else {
            TrapCause::Exception(id)
        }
    }

    pub fn id(self) -> u32 {
        match self {
            TrapCause::Interrupt(id) | TrapCause::Exception(id) => id,
        }
    }
}

/// Trap handler receiving the cause id
pub type TrapHandler<K> = fn(&mut K, u32) -> Result<(), KernelFatal>;

/// Two single-slot handler registers
pub struct TrapGate<K> {
    interrupt: Option<TrapHandler<K>>,
    exception: Option<TrapHandler<K>>,
}

impl<K> TrapGate<K> {
    pub const fn new() -> Self {
        Self {
            interrupt: None,
            exception: None,
        }
    }

    pub fn register_interrupt_handler(&mut self, handler: TrapHandler<K>) {
        self.interrupt = Some(handler);
    }

    pub fn register_exception_handler(&mut self, handler: TrapHandler<K>) {
        self.exception = Some(handler);
    }

    /// Selects the handler for `cause`
    ///
    /// The handler is returned rather than called so the owner of the gate
    /// can pass itself to it.
    pub fn route(&self, cause: TrapCause) -> Result<TrapHandler<K>, KernelFatal> {
        match cause {
            TrapCause::Interrupt(_) => self
                .interrupt
                .ok_or(KernelFatal::UnregisteredHandler("interrupt")),
            TrapCause::Exception(_) => self
                .exception
                .ok_or(KernelFatal::UnregisteredHandler("exception")),
        }
    }
}

impl<K> Default for TrapGate<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        interrupts: Vec<u32>,
        exceptions: Vec<u32>,
    }

    fn on_interrupt(r: &mut Recorder, id: u32) -> Result<(), KernelFatal> {
        r.interrupts.push(id);
        Ok(())
    }

    fn on_exception(r: &mut Recorder, id: u32) -> Result<(), KernelFatal> {
        r.exceptions.push(id);
        Ok(())
    }

    fn dispatch(gate: &TrapGate<Recorder>, r: &mut Recorder, mcause: u32) -> Result<(), KernelFatal> {
        let cause = TrapCause::from_mcause(mcause);
        let handler = gate.route(cause)?;
        handler(r, cause.id())
    }

    #[test]
    fn test_cause_decoding() {
        assert_eq!(TrapCause::from_mcause(0x8000_0007), TrapCause::Interrupt(7));
        assert_eq!(TrapCause::from_mcause(0x8000_000B), TrapCause::Interrupt(11));
        assert_eq!(TrapCause::from_mcause(8), TrapCause::Exception(8));
        assert_eq!(TrapCause::from_mcause(0x0000_0402), TrapCause::Exception(2));
    }

    #[test]
    fn test_routes_by_high_bit() {
        let mut gate = TrapGate::new();
        gate.register_interrupt_handler(on_interrupt);
        gate.register_exception_handler(on_exception);
        let mut r = Recorder::default();

        dispatch(&gate, &mut r, 0x8000_0003).unwrap();
        dispatch(&gate, &mut r, 2).unwrap();

        assert_eq!(r.interrupts, vec![3]);
        assert_eq!(r.exceptions, vec![2]);
    }

    #[test]
    fn test_unregistered_slot_is_fatal() {
        let mut gate = TrapGate::new();
        gate.register_interrupt_handler(on_interrupt);
        let mut r = Recorder::default();

        assert_eq!(
            dispatch(&gate, &mut r, 5),
            Err(KernelFatal::UnregisteredHandler("exception"))
        );
        assert!(r.exceptions.is_empty());
    }
}
