//! Fixed-size rendezvous message

use core::fmt;
use core_types::Pid;

/// Payload capacity of a single message, in bytes.
///
/// This is also the payload size of the syscall record, so it is part of
/// the user/kernel wire contract and must not change.
pub const MESSAGE_LEN: usize = 1024;

/// A message as delivered to the receiver
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    /// Pid of the sending process, stamped by the kernel
    pub sender: Pid,
    /// Pid of the process the message is addressed to
    pub receiver: Pid,
    /// Opaque payload bytes
    pub payload: [u8; MESSAGE_LEN],
}

impl Message {
    /// Creates a message, copying at most [`MESSAGE_LEN`] bytes of `bytes`
    ///
    /// The remainder of the payload is zero-filled.
    pub fn new(sender: Pid, receiver: Pid, bytes: &[u8]) -> Self {
        let mut payload = [0u8; MESSAGE_LEN];
        let len = bytes.len().min(MESSAGE_LEN);
        payload[..len].copy_from_slice(&bytes[..len]);
        Self {
            sender,
            receiver,
            payload,
        }
    }
}

// The payload is a kilobyte of mostly zeros; keep debug output readable.
impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self
            .payload
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |idx| idx + 1);
        f.debug_struct("Message")
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .field("payload", &&self.payload[..used])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_zero_fills_payload() {
        let msg = Message::new(Pid(10), Pid(11), b"ping");
        assert_eq!(&msg.payload[..4], b"ping");
        assert!(msg.payload[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_message_truncates_oversized_input() {
        let big = [7u8; MESSAGE_LEN + 16];
        let msg = Message::new(Pid(10), Pid(11), &big);
        assert!(msg.payload.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_message_debug_trims_trailing_zeros() {
        let msg = Message::new(Pid(1), Pid(2), &[1, 2, 3]);
        let debug = format!("{:?}", msg);
        assert!(debug.contains("[1, 2, 3]"));
    }
}
