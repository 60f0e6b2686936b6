//! Directory service implementation

use hal::{BlockError, FileStore, BLOCK_SIZE};
use kernel_api::{decode_payload, encode_payload, DirReply, DirRequest, KernelError};
use log::debug;
use thiserror::Error;

/// Errors from directory lookups
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirError {
    #[error("Name not found: {0}")]
    NotFound(String),

    #[error("Directory read failed: {0}")]
    Read(BlockError),

    #[error("Malformed directory entry for {0}")]
    Malformed(String),
}

/// The directory service
///
/// Reads directory files through a [`FileStore`].
pub struct DirectoryService<F: FileStore> {
    files: F,
}

impl<F: FileStore> DirectoryService<F> {
    pub fn new(files: F) -> Self {
        Self { files }
    }

    pub fn files_mut(&mut self) -> &mut F {
        &mut self.files
    }

    /// Returns the inode named `name` in directory `dir_ino`
    ///
    /// Only the first block of the directory is searched.
    pub fn lookup(&mut self, dir_ino: u32, name: &str) -> Result<u32, DirError> {
        let mut block = [0u8; BLOCK_SIZE];
        self.files
            .read_file_block(dir_ino, 0, &mut block)
            .map_err(DirError::Read)?;

        let end = block.iter().position(|&b| b == 0).unwrap_or(BLOCK_SIZE);
        let text = String::from_utf8_lossy(&block[..end]);

        let mut tokens = text.split(' ').filter(|t| !t.is_empty());
        while let Some(entry) = tokens.next() {
            let ino = tokens.next();
            if entry != name {
                continue;
            }
            return ino
                .and_then(|raw| raw.parse().ok())
                .ok_or_else(|| DirError::Malformed(name.to_string()));
        }
        Err(DirError::NotFound(name.to_string()))
    }

    pub fn handle(&mut self, request: DirRequest) -> DirReply {
        match request {
            DirRequest::Lookup { dir_ino, name } => {
                let ino = self.lookup(dir_ino, &name);
                debug!("dir: lookup {:?} in {} -> {:?}", name, dir_ino, ino);
                DirReply { ino: ino.ok() }
            }
        }
    }

    /// Decodes a request payload and encodes the reply
    pub fn handle_payload(&mut self, payload: &[u8]) -> Result<Vec<u8>, KernelError> {
        let request: DirRequest = decode_payload(payload)?;
        encode_payload(&self.handle(request))
    }
}
