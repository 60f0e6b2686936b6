//! Block device abstraction for storage
//!
//! Program images and directory files live on a block device of
//! fixed-size sectors.

use core::fmt;

#[cfg(feature = "alloc")]
extern crate alloc;

/// Block size in bytes
pub const BLOCK_SIZE: usize = 512;

/// Block device errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// Block index out of bounds
    OutOfBounds,
    /// I/O error (hardware failure, timeout, etc.)
    IoError,
    /// Invalid buffer size
    InvalidSize,
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "block index out of bounds"),
            Self::IoError => write!(f, "I/O error"),
            Self::InvalidSize => write!(f, "invalid block size"),
        }
    }
}

/// Read side of a block device
///
/// The kernel only ever reads: images and directories are written when the
/// disk is built.
pub trait BlockDevice {
    fn block_count(&self) -> u64;

    /// Copies block `block_idx` into the first [`BLOCK_SIZE`] bytes of `buffer`
    fn read_block(&mut self, block_idx: u64, buffer: &mut [u8]) -> Result<(), BlockError>;
}

/// RAM disk, an in-memory block device
#[cfg(feature = "alloc")]
pub struct RamDisk {
    blocks: alloc::vec::Vec<[u8; BLOCK_SIZE]>,
}

#[cfg(feature = "alloc")]
impl RamDisk {
    /// Creates a zeroed RAM disk with `block_count` blocks
    pub fn new(block_count: usize) -> Self {
        Self {
            blocks: alloc::vec![[0u8; BLOCK_SIZE]; block_count],
        }
    }

    /// Appends `bytes` as new blocks and returns the index of the first one
    ///
    /// The last block is zero-padded.
    pub fn append(&mut self, bytes: &[u8]) -> u64 {
        let first = self.blocks.len() as u64;
        for chunk in bytes.chunks(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block[..chunk.len()].copy_from_slice(chunk);
            self.blocks.push(block);
        }
        first
    }
}

#[cfg(feature = "alloc")]
impl BlockDevice for RamDisk {
    fn block_count(&self) -> u64 {
        self.blocks.len() as u64
    }

    fn read_block(&mut self, block_idx: u64, buffer: &mut [u8]) -> Result<(), BlockError> {
        if block_idx >= self.block_count() {
            return Err(BlockError::OutOfBounds);
        }
        if buffer.len() < BLOCK_SIZE {
            return Err(BlockError::InvalidSize);
        }

        buffer[..BLOCK_SIZE].copy_from_slice(&self.blocks[block_idx as usize]);
        Ok(())
    }
}
