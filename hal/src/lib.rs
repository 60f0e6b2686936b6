//! # Hardware Abstraction Layer (HAL)
//!
//! This crate defines the hardware collaborators the kernel core talks to.
//!
//! ## Philosophy
//!
//! **The kernel never touches a register.**
//!
//! Trap vectors, interrupt-enable bits, the UART and the page tables are
//! all reached through the traits below. A board crate implements them;
//! the simulated board in `sim_kernel` implements them for tests.
//!
//! ## Design Principles
//!
//! 1. **One trait per concern**: CPU, interrupt sources, timer, address
//!    spaces, console, storage, image loading
//! 2. **Non-blocking**: every call returns immediately except
//!    [`CpuHal::wait_for_interrupt`]
//! 3. **Testable**: every trait can be mocked

pub mod address_space;
pub mod block_device;
pub mod char_device;
pub mod cpu;
pub mod file;
pub mod interrupts;
pub mod loader;
pub mod timer;

pub use address_space::AddressSpaceHal;
pub use block_device::{BlockDevice, BlockError, BLOCK_SIZE};
#[cfg(feature = "alloc")]
pub use block_device::RamDisk;
pub use char_device::{CharDevice, ReceiveLatch, WriteOutcome, CTRL_C};
pub use cpu::CpuHal;
#[cfg(feature = "alloc")]
pub use file::RamFileStore;
pub use file::{BlockReader, FileBlocks, FileStore};
pub use interrupts::{ExternalCause, InterruptHal, InterruptSources};
pub use loader::{ImageLoader, LoadError};
pub use timer::TimerDevice;

/// Everything the kernel core needs from a board
pub trait Platform: CpuHal + InterruptHal + TimerDevice + AddressSpaceHal + CharDevice {}

impl<T> Platform for T where T: CpuHal + InterruptHal + TimerDevice + AddressSpaceHal + CharDevice {}
