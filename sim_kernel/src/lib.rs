//! # Simulated Board
//!
//! This crate provides a simulated implementation of every `hal` trait.
//!
//! ## Purpose
//!
//! The simulated board allows testing the kernel without hardware:
//! - Runs under `cargo test`
//! - Deterministic (controlled time, scripted interrupts)
//! - Inspectable (enabled sources, address-space switches, console output)
//!
//! ## Idling
//!
//! A real core sleeps in wait-for-interrupt until a device fires. The
//! simulated core instead pops the next scripted [`Wakeup`]; a test that
//! lets the kernel idle with nothing scripted has deadlocked the system
//! and fails loudly.

pub mod address_space;
pub mod console;
pub mod fault_injection;
pub mod loader;
pub mod test_utils;
pub mod timer;

use address_space::SimAddressSpaces;
use console::SimConsole;
use core_types::Pid;
use fault_injection::ConsoleFault;
use hal::{
    AddressSpaceHal, CharDevice, CpuHal, ExternalCause, InterruptHal, InterruptSources,
    TimerDevice, WriteOutcome,
};
use kernel_api::SyscallRecord;
use std::collections::VecDeque;
use timer::SimTimerDevice;

/// Device activity that ends an idle period
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wakeup {
    /// Bytes arrive on the console UART
    Console(Vec<u8>),
    /// A non-console interrupt-controller source fires
    External(u32),
}

/// Simulated single-core board
#[derive(Debug)]
pub struct SimPlatform {
    enabled: InterruptSources,
    external: VecDeque<ExternalCause>,
    completed: Vec<ExternalCause>,
    wakeups: VecDeque<Wakeup>,
    idle_masks: Vec<InterruptSources>,
    console: SimConsole,
    spaces: SimAddressSpaces,
    timer: SimTimerDevice,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self {
            enabled: InterruptSources::empty(),
            external: VecDeque::new(),
            completed: Vec::new(),
            wakeups: VecDeque::new(),
            idle_masks: Vec::new(),
            console: SimConsole::new(),
            spaces: SimAddressSpaces::new(),
            timer: SimTimerDevice::default(),
        }
    }

    /// Queues activity for the next wait-for-interrupt
    pub fn schedule_wakeup(&mut self, wakeup: Wakeup) {
        self.wakeups.push_back(wakeup);
    }

    pub fn pending_wakeups(&self) -> usize {
        self.wakeups.len()
    }

    /// Bytes arrive on the console right now
    ///
    /// The matching external cause stays pending until the kernel drains.
    pub fn type_input(&mut self, bytes: &[u8]) {
        self.console.push_input(bytes);
        self.external.push_back(ExternalCause::Console);
    }

    /// Raises a non-console external cause right now
    pub fn raise_external(&mut self, id: u32) {
        self.external.push_back(ExternalCause::Other(id));
    }

    pub fn inject_console_fault(&mut self, fault: ConsoleFault) {
        self.console.inject(fault);
    }

    pub fn console_output(&self) -> String {
        self.console.output_string()
    }

    /// Enabled sources observed at each wait-for-interrupt
    pub fn idle_masks(&self) -> &[InterruptSources] {
        &self.idle_masks
    }

    /// External causes completed so far
    pub fn completed_external(&self) -> &[ExternalCause] {
        &self.completed
    }

    pub fn spaces(&self) -> &SimAddressSpaces {
        &self.spaces
    }

    /// The syscall record of `pid`, for staging requests in tests
    pub fn record_mut(&mut self, pid: Pid) -> &mut SyscallRecord {
        self.spaces.record_mut(pid)
    }

    pub fn record(&self, pid: Pid) -> Option<&SyscallRecord> {
        self.spaces.record(pid)
    }

    pub fn timer(&self) -> &SimTimerDevice {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut SimTimerDevice {
        &mut self.timer
    }

    fn apply(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::Console(bytes) => self.type_input(&bytes),
            Wakeup::External(id) => self.raise_external(id),
        }
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuHal for SimPlatform {
    fn wait_for_interrupt(&mut self) {
        self.idle_masks.push(self.enabled);
        if !self.external.is_empty() {
            return;
        }
        match self.wakeups.pop_front() {
            Some(wakeup) => {
                log::debug!("sim: wfi woken by {:?}", wakeup);
                self.apply(wakeup);
            }
            None => panic!("SimPlatform: idle with no scheduled wakeup (system deadlocked)"),
        }
    }
}

impl InterruptHal for SimPlatform {
    fn enable_sources(&mut self, sources: InterruptSources) {
        self.enabled.insert(sources);
    }

    fn disable_sources(&mut self, sources: InterruptSources) {
        self.enabled.remove(sources);
    }

    fn enabled_sources(&self) -> InterruptSources {
        self.enabled
    }

    fn claim_pending_external(&mut self) -> Option<ExternalCause> {
        self.external.pop_front()
    }

    fn complete_external(&mut self, cause: ExternalCause) {
        self.completed.push(cause);
    }
}

impl TimerDevice for SimPlatform {
    fn poll_ticks(&mut self) -> u64 {
        self.timer.poll_ticks()
    }

    fn reset_periodic_timer(&mut self) {
        self.timer.reset_periodic_timer();
    }
}

impl AddressSpaceHal for SimPlatform {
    fn switch_context(&mut self, pid: Pid) {
        self.spaces.switch_to(pid);
    }

    fn syscall_record(&mut self) -> &mut SyscallRecord {
        self.spaces.current_record()
    }

    fn release(&mut self, pid: Pid) {
        self.spaces.release(pid);
    }
}

impl CharDevice for SimPlatform {
    fn read_one(&mut self) -> Option<u8> {
        let byte = self.console.read_one();
        // the UART raises another receive interrupt for the next queued byte
        if byte.is_some() && self.console.has_unread_input() {
            self.external.push_back(ExternalCause::Console);
        }
        byte
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> WriteOutcome {
        self.console.write(bytes)
    }

    fn service_receive_interrupt(&mut self) {
        self.console.service_receive();
    }

    fn take_special_char(&mut self) -> bool {
        self.console.take_special()
    }
}
