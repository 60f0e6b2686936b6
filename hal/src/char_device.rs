//! Console character device abstraction
//!
//! ## Design
//!
//! The console is interrupt driven on the receive side:
//! - The receive interrupt moves at most one byte into a single-byte latch
//! - The operator interrupt character (Ctrl+C) is never latched; it raises
//!   an edge-triggered flag the kernel consumes once
//! - Writes complete immediately or report why they could not

/// Operator interrupt character
pub const CTRL_C: u8 = 0x03;

/// Result of a console write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// All bytes were accepted
    Ok,
    /// The transmitter is momentarily full; retry later
    WouldBlock,
    /// The request can never succeed
    Rejected,
}

/// Console character device
pub trait CharDevice {
    /// Takes the latched received byte, if any
    fn read_one(&mut self) -> Option<u8>;

    /// Writes `bytes` to the console
    fn write_bytes(&mut self, bytes: &[u8]) -> WriteOutcome;

    /// Services a receive interrupt by draining the UART into the latch
    fn service_receive_interrupt(&mut self);

    /// Returns true once per operator interrupt character received
    fn take_special_char(&mut self) -> bool;
}

/// Single-byte receive latch shared by console drivers
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReceiveLatch {
    byte: Option<u8>,
    special: bool,
}

impl ReceiveLatch {
    pub const fn new() -> Self {
        Self {
            byte: None,
            special: false,
        }
    }

    /// Accepts one received byte
    ///
    /// Returns false when the byte was dropped because the latch is full.
    pub fn accept(&mut self, byte: u8) -> bool {
        if byte == CTRL_C {
            self.special = true;
            return true;
        }
        if self.byte.is_some() {
            return false;
        }
        self.byte = Some(byte);
        true
    }

    pub fn take(&mut self) -> Option<u8> {
        self.byte.take()
    }

    pub fn take_special(&mut self) -> bool {
        core::mem::replace(&mut self.special, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_holds_one_byte() {
        let mut latch = ReceiveLatch::new();
        assert!(latch.accept(b'a'));
        assert!(!latch.accept(b'b'));
        assert_eq!(latch.take(), Some(b'a'));
        assert_eq!(latch.take(), None);
    }

    #[test]
    fn test_ctrl_c_is_edge_triggered() {
        let mut latch = ReceiveLatch::new();
        latch.accept(CTRL_C);
        assert_eq!(latch.take(), None);
        assert!(latch.take_special());
        assert!(!latch.take_special());
    }

    #[test]
    fn test_ctrl_c_not_blocked_by_full_latch() {
        let mut latch = ReceiveLatch::new();
        latch.accept(b'x');
        assert!(latch.accept(CTRL_C));
        assert!(latch.take_special());
        assert_eq!(latch.take(), Some(b'x'));
    }
}
