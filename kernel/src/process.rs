//! Process table
//!
//! A fixed-capacity arena of process slots indexed by slot number. Every
//! status change goes through one of the `mark_*` transitions, which check
//! the predecessor state and refuse anything else.

use core_types::Pid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a process slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStatus {
    Unused,
    /// Slot reserved, image being read
    Loading,
    /// Entry point set, never dispatched
    Ready,
    Running,
    Runnable,
    /// Blocked in the syscall gateway
    Requesting,
    /// Blocked sending to `peer`
    WaitingToSend,
    /// Blocked until a message arrives
    WaitingToReceive,
}

impl ProcessStatus {
    /// True for states the scheduler may pick
    pub fn is_schedulable(self) -> bool {
        matches!(
            self,
            ProcessStatus::Ready | ProcessStatus::Running | ProcessStatus::Runnable
        )
    }

    /// True for states the external-interrupt drain retries
    pub fn is_blocked(self) -> bool {
        matches!(
            self,
            ProcessStatus::Requesting
                | ProcessStatus::WaitingToSend
                | ProcessStatus::WaitingToReceive
        )
    }
}

/// Saved execution state of a process that is not running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Resume address
    pub pc: usize,
    /// Stack pointer, which also locates the saved register file
    pub sp: usize,
}

impl Context {
    pub fn new(pc: usize, sp: usize) -> Self {
        Self { pc, sp }
    }
}

/// One process slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub pid: Pid,
    pub status: ProcessStatus,
    pub killable: bool,
    pub context: Context,
    /// Counter-party while blocked on a rendezvous
    pub peer: Option<Pid>,
}

impl Process {
    fn unused() -> Self {
        Self {
            pid: Pid::new(0),
            status: ProcessStatus::Unused,
            killable: false,
            context: Context::default(),
            peer: None,
        }
    }
}

/// Rejected process-table operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Illegal transition for {pid}: {from:?} -> {to:?}")]
    Illegal {
        pid: Pid,
        from: ProcessStatus,
        to: ProcessStatus,
    },

    #[error("Slot {0} holds no process")]
    EmptySlot(usize),
}

/// Fixed-capacity process table
#[derive(Debug)]
pub struct ProcessTable {
    slots: Vec<Process>,
    next_pid: u32,
}

impl ProcessTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Process::unused()).collect(),
            next_pid: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, slot: usize) -> Option<&Process> {
        self.slots
            .get(slot)
            .filter(|p| p.status != ProcessStatus::Unused)
    }

    /// Slot index of a live process
    pub fn find(&self, pid: Pid) -> Option<usize> {
        self.slots
            .iter()
            .position(|p| p.status != ProcessStatus::Unused && p.pid == pid)
    }

    pub fn status_of(&self, pid: Pid) -> Option<ProcessStatus> {
        self.find(pid).map(|slot| self.slots[slot].status)
    }

    /// Live processes in table order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Process)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, p)| p.status != ProcessStatus::Unused)
    }

    /// Reserves a free slot under a fresh pid, in the loading state
    pub fn allocate(&mut self, killable: bool) -> Option<(usize, Pid)> {
        let slot = self
            .slots
            .iter()
            .position(|p| p.status == ProcessStatus::Unused)?;
        let pid = Pid::new(self.next_pid);
        self.next_pid += 1;
        self.slots[slot] = Process {
            pid,
            status: ProcessStatus::Loading,
            killable,
            context: Context::default(),
            peer: None,
        };
        Some((slot, pid))
    }

    /// Returns the slot to the unused state, clearing its context
    pub fn free(&mut self, slot: usize) -> Result<Pid, TransitionError> {
        let pid = self.live(slot)?.pid;
        self.slots[slot] = Process::unused();
        Ok(pid)
    }

    /// Records the entry address of a loaded image
    pub fn mark_ready(&mut self, slot: usize, entry: usize) -> Result<(), TransitionError> {
        self.transition(slot, &[ProcessStatus::Loading], ProcessStatus::Ready)?;
        self.slots[slot].context = Context::new(entry, 0);
        Ok(())
    }

    pub fn mark_running(&mut self, slot: usize) -> Result<(), TransitionError> {
        self.transition(
            slot,
            &[
                ProcessStatus::Loading,
                ProcessStatus::Ready,
                ProcessStatus::Runnable,
                ProcessStatus::Running,
            ],
            ProcessStatus::Running,
        )
    }

    pub fn mark_runnable(&mut self, slot: usize) -> Result<(), TransitionError> {
        self.transition(
            slot,
            &[ProcessStatus::Running, ProcessStatus::Requesting],
            ProcessStatus::Runnable,
        )?;
        self.slots[slot].peer = None;
        Ok(())
    }

    pub fn mark_requesting(&mut self, slot: usize) -> Result<(), TransitionError> {
        self.transition(
            slot,
            &[
                ProcessStatus::Running,
                ProcessStatus::Requesting,
                ProcessStatus::WaitingToSend,
                ProcessStatus::WaitingToReceive,
            ],
            ProcessStatus::Requesting,
        )?;
        self.slots[slot].peer = None;
        Ok(())
    }

    pub fn mark_waiting_to_send(&mut self, slot: usize, peer: Pid) -> Result<(), TransitionError> {
        self.transition(slot, &[ProcessStatus::Requesting], ProcessStatus::WaitingToSend)?;
        self.slots[slot].peer = Some(peer);
        Ok(())
    }

    pub fn mark_waiting_to_receive(&mut self, slot: usize) -> Result<(), TransitionError> {
        self.transition(
            slot,
            &[ProcessStatus::Requesting],
            ProcessStatus::WaitingToReceive,
        )
    }

    /// Rewrites the resume address and makes the process runnable
    ///
    /// Used by forced termination; legal from any live state.
    pub fn mark_killed(&mut self, slot: usize, resume: usize) -> Result<(), TransitionError> {
        let process = self.live_mut(slot)?;
        process.context.pc = resume;
        process.status = ProcessStatus::Runnable;
        process.peer = None;
        Ok(())
    }

    /// Stores the context of an interrupted process
    pub fn save_context(&mut self, slot: usize, context: Context) -> Result<(), TransitionError> {
        self.live_mut(slot)?.context = context;
        Ok(())
    }

    /// Moves the resume address past a trap instruction
    pub fn advance_resume(&mut self, slot: usize, len: usize) -> Result<(), TransitionError> {
        let process = self.live_mut(slot)?;
        process.context.pc = process.context.pc.wrapping_add(len);
        Ok(())
    }

    fn live(&self, slot: usize) -> Result<&Process, TransitionError> {
        self.get(slot).ok_or(TransitionError::EmptySlot(slot))
    }

    fn live_mut(&mut self, slot: usize) -> Result<&mut Process, TransitionError> {
        self.slots
            .get_mut(slot)
            .filter(|p| p.status != ProcessStatus::Unused)
            .ok_or(TransitionError::EmptySlot(slot))
    }

    fn transition(
        &mut self,
        slot: usize,
        allowed: &[ProcessStatus],
        to: ProcessStatus,
    ) -> Result<(), TransitionError> {
        let process = self.live_mut(slot)?;
        if !allowed.contains(&process.status) {
            return Err(TransitionError::Illegal {
                pid: process.pid,
                from: process.status,
                to,
            });
        }
        process.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_process(table: &mut ProcessTable) -> usize {
        let (slot, _) = table.allocate(true).unwrap();
        table.mark_ready(slot, 0x1000).unwrap();
        table.mark_running(slot).unwrap();
        slot
    }

    #[test]
    fn test_allocate_assigns_increasing_pids() {
        let mut table = ProcessTable::new(4);
        let (s1, p1) = table.allocate(false).unwrap();
        let (_, p2) = table.allocate(true).unwrap();
        assert_eq!(p1, Pid::new(1));
        assert_eq!(p2, Pid::new(2));

        table.free(s1).unwrap();
        let (s3, p3) = table.allocate(true).unwrap();
        assert_eq!(s3, s1);
        assert_eq!(p3, Pid::new(3));
        assert_eq!(table.get(s3).unwrap().status, ProcessStatus::Loading);
    }

    #[test]
    fn test_allocate_fails_when_full() {
        let mut table = ProcessTable::new(2);
        table.allocate(true).unwrap();
        table.allocate(true).unwrap();
        assert!(table.allocate(true).is_none());
    }

    #[test]
    fn test_ready_sets_entry() {
        let mut table = ProcessTable::new(1);
        let (slot, _) = table.allocate(true).unwrap();
        table.mark_ready(slot, 0x8000).unwrap();
        let process = table.get(slot).unwrap();
        assert_eq!(process.status, ProcessStatus::Ready);
        assert_eq!(process.context.pc, 0x8000);
    }

    #[test]
    fn test_runnable_requires_running_or_requesting() {
        let mut table = ProcessTable::new(2);
        let (slot, pid) = table.allocate(true).unwrap();
        table.mark_ready(slot, 0).unwrap();

        assert_eq!(
            table.mark_runnable(slot),
            Err(TransitionError::Illegal {
                pid,
                from: ProcessStatus::Ready,
                to: ProcessStatus::Runnable,
            })
        );

        table.mark_running(slot).unwrap();
        table.mark_requesting(slot).unwrap();
        table.mark_runnable(slot).unwrap();
    }

    #[test]
    fn test_waiting_states_only_from_requesting() {
        let mut table = ProcessTable::new(1);
        let slot = running_process(&mut table);
        assert!(table.mark_waiting_to_receive(slot).is_err());

        table.mark_requesting(slot).unwrap();
        table.mark_waiting_to_send(slot, Pid::new(9)).unwrap();
        assert_eq!(table.get(slot).unwrap().peer, Some(Pid::new(9)));

        // retry re-enters requesting and clears the peer
        table.mark_requesting(slot).unwrap();
        assert_eq!(table.get(slot).unwrap().peer, None);
    }

    #[test]
    fn test_killed_rewrites_resume_address() {
        let mut table = ProcessTable::new(1);
        let slot = running_process(&mut table);
        table.mark_requesting(slot).unwrap();
        table.mark_waiting_to_receive(slot).unwrap();

        table.mark_killed(slot, 0xDEAD).unwrap();
        let process = table.get(slot).unwrap();
        assert_eq!(process.status, ProcessStatus::Runnable);
        assert_eq!(process.context.pc, 0xDEAD);
    }

    #[test]
    fn test_unused_slot_rejects_everything() {
        let mut table = ProcessTable::new(1);
        assert_eq!(table.free(0), Err(TransitionError::EmptySlot(0)));
        assert_eq!(table.mark_killed(0, 0), Err(TransitionError::EmptySlot(0)));
        assert_eq!(table.mark_running(5), Err(TransitionError::EmptySlot(5)));
    }

    #[test]
    fn test_free_clears_context() {
        let mut table = ProcessTable::new(1);
        let slot = running_process(&mut table);
        table.save_context(slot, Context::new(0x42, 0x99)).unwrap();
        let pid = table.free(slot).unwrap();

        assert_eq!(table.find(pid), None);
        assert!(table.get(slot).is_none());
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn test_advance_resume() {
        let mut table = ProcessTable::new(1);
        let slot = running_process(&mut table);
        table.save_context(slot, Context::new(0x100, 0)).unwrap();
        table.advance_resume(slot, 4).unwrap();
        assert_eq!(table.get(slot).unwrap().context.pc, 0x104);
    }

    #[test]
    fn test_status_predicates() {
        assert!(ProcessStatus::Ready.is_schedulable());
        assert!(!ProcessStatus::Loading.is_schedulable());
        assert!(ProcessStatus::WaitingToSend.is_blocked());
        assert!(!ProcessStatus::Runnable.is_blocked());
    }
}
