//! Typed requests understood by the kernel services
//!
//! Service payloads are JSON documents written at the start of the message
//! buffer. Unused trailing bytes are zero, so decoding stops at the first
//! NUL.

use crate::syscall::SYSCALL_MSG_LEN;
use crate::KernelError;
use core_types::Pid;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Request to the process manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcRequest {
    /// Start the program `name` with the given arguments
    Spawn { name: String, argv: Vec<String> },
    /// Terminate the sender
    Exit { status: i32 },
}

/// Reply from the process manager to a spawn request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcReply {
    Spawned { pid: Pid },
    Failed,
}

/// Request to the directory service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirRequest {
    /// Look up `name` inside the directory stored at inode `dir_ino`
    Lookup { dir_ino: u32, name: String },
}

/// Reply from the directory service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirReply {
    pub ino: Option<u32>,
}

/// Serializes `value` into message payload bytes
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, KernelError> {
    let bytes = serde_json::to_vec(value).map_err(|e| KernelError::Codec(e.to_string()))?;
    if bytes.len() > SYSCALL_MSG_LEN {
        return Err(KernelError::MessageTooLarge {
            len: bytes.len(),
            max: SYSCALL_MSG_LEN,
        });
    }
    Ok(bytes)
}

/// Decodes a payload previously produced by [`encode_payload`]
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, KernelError> {
    let end = payload
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(payload.len());
    serde_json::from_slice(&payload[..end]).map_err(|e| KernelError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stops_at_nul() {
        let mut payload = [0u8; SYSCALL_MSG_LEN];
        let bytes = encode_payload(&DirRequest::Lookup {
            dir_ino: 0,
            name: "bin".to_string(),
        })
        .unwrap();
        payload[..bytes.len()].copy_from_slice(&bytes);

        let request: DirRequest = decode_payload(&payload).unwrap();
        assert_eq!(
            request,
            DirRequest::Lookup {
                dir_ino: 0,
                name: "bin".to_string()
            }
        );
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let request = ProcRequest::Spawn {
            name: "x".repeat(SYSCALL_MSG_LEN),
            argv: Vec::new(),
        };
        assert!(matches!(
            encode_payload(&request),
            Err(KernelError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_garbage_is_codec_error() {
        let result: Result<ProcReply, _> = decode_payload(b"not json");
        assert!(matches!(result, Err(KernelError::Codec(_))));
    }
}
