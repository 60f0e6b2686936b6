//! Per-receiver rendezvous mailbox.
//!
//! Every slot carries an `in_use` flag, the sender and receiver tags and a
//! fixed payload buffer. A receiver owns at most one occupied slot at a
//! time: a second send to the same receiver is rejected until the first
//! message is drained.

use alloc::vec::Vec;
use core::fmt;
use core_types::Pid;
use log::debug;

use crate::message::{Message, MESSAGE_LEN};

/// Mailbox errors
///
/// Every variant is retryable: the caller is expected to re-issue the same
/// request on a later trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// A message for this receiver is already waiting to be drained
    Occupied(Pid),
    /// No message is waiting for this receiver
    Empty(Pid),
    /// Every slot holds a message for some other receiver
    Full,
}

impl MailboxError {
    /// Returns whether the operation may succeed if retried later
    pub fn is_retryable(&self) -> bool {
        true
    }
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Occupied(pid) => write!(f, "mailbox slot for {} is occupied", pid),
            Self::Empty(pid) => write!(f, "no message waiting for {}", pid),
            Self::Full => write!(f, "all mailbox slots are occupied"),
        }
    }
}

#[derive(Clone)]
struct MailboxSlot {
    in_use: bool,
    sender: Pid,
    receiver: Pid,
    payload: [u8; MESSAGE_LEN],
}

impl MailboxSlot {
    const fn empty() -> Self {
        Self {
            in_use: false,
            sender: Pid(0),
            receiver: Pid(0),
            payload: [0; MESSAGE_LEN],
        }
    }
}

/// The kernel's rendezvous mailbox
///
/// Capacity is fixed at construction; the kernel sizes it to the process
/// table so every live process can have one message waiting.
pub struct Mailbox {
    slots: Vec<MailboxSlot>,
}

impl Mailbox {
    /// Creates a mailbox with `capacity` slots, all free
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: alloc::vec![MailboxSlot::empty(); capacity],
        }
    }

    /// Returns the number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of unconsumed messages
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|slot| slot.in_use).count()
    }

    /// Returns whether a message is waiting for `receiver`
    pub fn has_message_for(&self, receiver: Pid) -> bool {
        self.slot_for(receiver).is_some()
    }

    /// Deposits a message addressed to `receiver`
    ///
    /// Rejected (retryable) while a previous message for the same receiver
    /// is still unconsumed. Never overwrites an occupied slot.
    pub fn send(
        &mut self,
        sender: Pid,
        receiver: Pid,
        payload: &[u8; MESSAGE_LEN],
    ) -> Result<(), MailboxError> {
        if self.slot_for(receiver).is_some() {
            return Err(MailboxError::Occupied(receiver));
        }

        let slot = self
            .slots
            .iter_mut()
            .find(|slot| !slot.in_use)
            .ok_or(MailboxError::Full)?;

        slot.sender = sender;
        slot.receiver = receiver;
        slot.payload.copy_from_slice(payload);
        slot.in_use = true;

        debug!("mailbox: {} -> {} deposited", sender, receiver);
        Ok(())
    }

    /// Takes the message waiting for `receiver`, freeing its slot
    pub fn receive(&mut self, receiver: Pid) -> Result<Message, MailboxError> {
        let index = self
            .slot_for(receiver)
            .ok_or(MailboxError::Empty(receiver))?;

        let slot = &mut self.slots[index];
        slot.in_use = false;

        debug!("mailbox: {} drained message from {}", receiver, slot.sender);
        Ok(Message {
            sender: slot.sender,
            receiver: slot.receiver,
            payload: slot.payload,
        })
    }

    /// Drops any unconsumed message addressed to `receiver`
    ///
    /// Returns true if a message was discarded.
    pub fn discard_for(&mut self, receiver: Pid) -> bool {
        match self.slot_for(receiver) {
            Some(index) => {
                self.slots[index].in_use = false;
                true
            }
            None => false,
        }
    }

    fn slot_for(&self, receiver: Pid) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.in_use && slot.receiver == receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(bytes: &[u8]) -> [u8; MESSAGE_LEN] {
        Message::new(Pid(0), Pid(0), bytes).payload
    }

    #[test]
    fn test_send_then_receive_exact_bytes() {
        let mut mailbox = Mailbox::with_capacity(4);
        mailbox.send(Pid(10), Pid(11), &payload(b"abcd")).unwrap();

        let msg = mailbox.receive(Pid(11)).unwrap();
        assert_eq!(msg.sender, Pid(10));
        assert_eq!(msg.receiver, Pid(11));
        assert_eq!(&msg.payload[..4], b"abcd");
        assert_eq!(mailbox.pending(), 0);
    }

    #[test]
    fn test_second_receive_sees_no_message() {
        let mut mailbox = Mailbox::with_capacity(4);
        mailbox.send(Pid(10), Pid(11), &payload(b"once")).unwrap();
        mailbox.receive(Pid(11)).unwrap();

        assert_eq!(mailbox.receive(Pid(11)), Err(MailboxError::Empty(Pid(11))));
    }

    #[test]
    fn test_second_send_to_occupied_receiver_rejected() {
        let mut mailbox = Mailbox::with_capacity(4);
        mailbox.send(Pid(10), Pid(11), &payload(b"first")).unwrap();

        let result = mailbox.send(Pid(12), Pid(11), &payload(b"second"));
        assert_eq!(result, Err(MailboxError::Occupied(Pid(11))));

        // First message survives untouched
        let msg = mailbox.receive(Pid(11)).unwrap();
        assert_eq!(msg.sender, Pid(10));
        assert_eq!(&msg.payload[..5], b"first");

        // Slot drained, the retried send now goes through
        mailbox.send(Pid(12), Pid(11), &payload(b"second")).unwrap();
        assert_eq!(mailbox.receive(Pid(11)).unwrap().sender, Pid(12));
    }

    #[test]
    fn test_receive_only_matches_own_pid() {
        let mut mailbox = Mailbox::with_capacity(4);
        mailbox.send(Pid(10), Pid(11), &payload(b"x")).unwrap();

        assert_eq!(mailbox.receive(Pid(12)), Err(MailboxError::Empty(Pid(12))));
        assert!(mailbox.has_message_for(Pid(11)));
    }

    #[test]
    fn test_distinct_receivers_use_distinct_slots() {
        let mut mailbox = Mailbox::with_capacity(2);
        mailbox.send(Pid(10), Pid(11), &payload(b"a")).unwrap();
        mailbox.send(Pid(10), Pid(12), &payload(b"b")).unwrap();
        assert_eq!(mailbox.pending(), 2);

        assert_eq!(
            mailbox.send(Pid(10), Pid(13), &payload(b"c")),
            Err(MailboxError::Full)
        );
    }

    #[test]
    fn test_discard_frees_slot() {
        let mut mailbox = Mailbox::with_capacity(1);
        mailbox.send(Pid(10), Pid(11), &payload(b"stale")).unwrap();

        assert!(mailbox.discard_for(Pid(11)));
        assert!(!mailbox.discard_for(Pid(11)));
        assert_eq!(mailbox.pending(), 0);
    }

    #[test]
    fn test_errors_are_retryable() {
        assert!(MailboxError::Occupied(Pid(1)).is_retryable());
        assert!(MailboxError::Empty(Pid(1)).is_retryable());
        assert!(MailboxError::Full.is_retryable());
    }
}
