//! Simulated console UART

use crate::fault_injection::{ConsoleFault, FaultInjector};
use hal::{ReceiveLatch, WriteOutcome};
use std::collections::VecDeque;

/// UART receive FIFO, receive latch and captured output
#[derive(Debug, Default)]
pub struct SimConsole {
    fifo: VecDeque<u8>,
    latch: ReceiveLatch,
    output: Vec<u8>,
    faults: FaultInjector,
}

impl SimConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes arriving on the wire, not yet seen by the driver
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.fifo.extend(bytes.iter().copied());
    }

    pub fn has_unread_input(&self) -> bool {
        !self.fifo.is_empty()
    }

    pub fn inject(&mut self, fault: ConsoleFault) {
        self.faults.add(fault);
    }

    /// Everything written to the console so far
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn read_one(&mut self) -> Option<u8> {
        self.latch.take()
    }

    pub fn write(&mut self, bytes: &[u8]) -> WriteOutcome {
        match self.faults.next_write_fault() {
            Some(outcome) => outcome,
            None => {
                self.output.extend_from_slice(bytes);
                WriteOutcome::Ok
            }
        }
    }

    /// Moves bytes from the FIFO into the latch until it is full
    pub fn service_receive(&mut self) {
        while let Some(byte) = self.fifo.pop_front() {
            if !self.latch.accept(byte) {
                self.fifo.push_front(byte);
                break;
            }
        }
    }

    pub fn take_special(&mut self) -> bool {
        self.latch.take_special()
    }
}
