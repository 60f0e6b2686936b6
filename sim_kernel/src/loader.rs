//! Simulated program loader
//!
//! A simulated image is any file whose first block starts with the ELF
//! magic. Loading records the pid and hands back the configured entry.

use core_types::Pid;
use hal::{BlockReader, ImageLoader, LoadError, BLOCK_SIZE};

/// ELF magic expected at the start of every image
pub const IMAGE_MAGIC: &[u8; 4] = b"\x7fELF";

/// Builds an image file whose body is `name`
pub fn program_image(name: &str) -> Vec<u8> {
    let mut image = IMAGE_MAGIC.to_vec();
    image.extend_from_slice(name.as_bytes());
    image
}

#[derive(Debug)]
pub struct SimImageLoader {
    entry: usize,
    loaded: Vec<(Pid, String)>,
}

impl SimImageLoader {
    pub fn new(entry: usize) -> Self {
        Self {
            entry,
            loaded: Vec::new(),
        }
    }

    /// Images loaded so far as (pid, program body)
    pub fn loaded(&self) -> &[(Pid, String)] {
        &self.loaded
    }

    /// Program body most recently loaded for `pid`
    pub fn program_of(&self, pid: Pid) -> Option<&str> {
        self.loaded
            .iter()
            .rev()
            .find(|(p, _)| *p == pid)
            .map(|(_, name)| name.as_str())
    }
}

impl ImageLoader for SimImageLoader {
    fn load_program(&mut self, pid: Pid, reader: &mut dyn BlockReader) -> Result<usize, LoadError> {
        let mut block = [0u8; BLOCK_SIZE];
        reader.read_block_at(0, &mut block)?;
        if &block[..4] != IMAGE_MAGIC {
            return Err(LoadError::InvalidImage);
        }
        let body = &block[4..];
        let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
        let name = String::from_utf8_lossy(&body[..end]).into_owned();
        log::debug!("loader: {} <- {:?}", pid, name);
        self.loaded.push((pid, name));
        Ok(self.entry)
    }
}
