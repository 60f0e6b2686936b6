//! Simulated address spaces
//!
//! Each process's address space is reduced to the one thing the kernel
//! ever touches in it: the syscall record.

use core_types::Pid;
use kernel_api::SyscallRecord;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SimAddressSpaces {
    records: HashMap<Pid, SyscallRecord>,
    installed: Option<Pid>,
    // returned while no address space is installed
    scratch: SyscallRecord,
    switches: Vec<Pid>,
    released: Vec<Pid>,
}

impl SimAddressSpaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn switch_to(&mut self, pid: Pid) {
        self.records.entry(pid).or_default();
        self.installed = Some(pid);
        self.switches.push(pid);
    }

    pub fn current_record(&mut self) -> &mut SyscallRecord {
        match self.installed {
            Some(pid) => self.records.entry(pid).or_default(),
            None => &mut self.scratch,
        }
    }

    pub fn release(&mut self, pid: Pid) {
        self.records.remove(&pid);
        self.released.push(pid);
        if self.installed == Some(pid) {
            self.installed = None;
        }
    }

    pub fn installed(&self) -> Option<Pid> {
        self.installed
    }

    pub fn record(&self, pid: Pid) -> Option<&SyscallRecord> {
        self.records.get(&pid)
    }

    /// The record of `pid`, created if the process has none yet
    pub fn record_mut(&mut self, pid: Pid) -> &mut SyscallRecord {
        self.records.entry(pid).or_default()
    }

    /// Every pid installed so far, in order
    pub fn switch_log(&self) -> &[Pid] {
        &self.switches
    }

    pub fn released(&self) -> &[Pid] {
        &self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_api::SyscallType;

    #[test]
    fn test_records_are_per_process() {
        let mut spaces = SimAddressSpaces::new();
        spaces.switch_to(Pid::new(5));
        spaces.current_record().arm(SyscallType::Send);
        spaces.switch_to(Pid::new(6));
        assert!(!spaces.current_record().is_pending());

        assert!(spaces.record(Pid::new(5)).unwrap().is_pending());
        assert_eq!(spaces.switch_log(), &[Pid::new(5), Pid::new(6)]);
    }

    #[test]
    fn test_release_uninstalls() {
        let mut spaces = SimAddressSpaces::new();
        spaces.switch_to(Pid::new(5));
        spaces.release(Pid::new(5));

        assert_eq!(spaces.installed(), None);
        assert!(spaces.record(Pid::new(5)).is_none());
        assert_eq!(spaces.released(), &[Pid::new(5)]);
    }
}
