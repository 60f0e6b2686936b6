//! Kernel error types

use thiserror::Error;

/// Errors visible to callers of the kernel API
///
/// These are the "caller error" class: they are returned immediately and
/// the calling process stays runnable. Retryable conditions never surface
/// here; the gateway absorbs them as added latency.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KernelError {
    /// Payload does not fit the fixed message buffer
    #[error("Message too large: {len} bytes exceeds {max}")]
    MessageTooLarge { len: usize, max: usize },

    /// The kernel completed the request with a negative return value
    #[error("Request failed with retval {0}")]
    RequestFailed(i32),

    /// A service payload could not be encoded or decoded
    #[error("Payload codec error: {0}")]
    Codec(String),

    /// Named object or process does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Process is not in a state that allows the operation
    #[error("Invalid process state: {0}")]
    InvalidState(String),
}
