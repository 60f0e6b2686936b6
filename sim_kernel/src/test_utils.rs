//! Test utilities for kernel and integration tests
//!
//! Helpers that stage syscall requests the way the user-space stub would,
//! and build simulated file systems.

use crate::loader::program_image;
use crate::SimPlatform;
use core_types::Pid;
use hal::RamFileStore;
use kernel_api::SyscallType;

/// Trap cause of the software interrupt raised by the syscall stub
pub const MCAUSE_SOFTWARE: u32 = 0x8000_0003;
/// Trap cause of the machine timer interrupt
pub const MCAUSE_TIMER: u32 = 0x8000_0007;
/// Trap cause of an external interrupt
pub const MCAUSE_EXTERNAL: u32 = 0x8000_000B;
/// Trap cause of an environment call from user mode
pub const MCAUSE_ECALL_USER: u32 = 8;
/// Trap cause of an illegal instruction
pub const MCAUSE_ILLEGAL_INSTRUCTION: u32 = 2;

/// Stages a send request in the record of `pid`
pub fn stage_send(board: &mut SimPlatform, pid: Pid, receiver: Pid, bytes: &[u8]) {
    let record = board.record_mut(pid);
    record.set_payload(bytes);
    record.receiver = receiver.as_u32();
    record.retval = 0;
    record.arm(SyscallType::Send);
}

/// Stages a receive request in the record of `pid`
pub fn stage_recv(board: &mut SimPlatform, pid: Pid) {
    let record = board.record_mut(pid);
    record.retval = 0;
    record.arm(SyscallType::Recv);
}

/// Stages a console write in the record of `pid`
pub fn stage_tty_write(board: &mut SimPlatform, pid: Pid, bytes: &[u8]) {
    let record = board.record_mut(pid);
    record.set_tty_write(bytes);
    record.retval = 0;
    record.arm(SyscallType::TtyWrite);
}

/// Stages a console read in the record of `pid`
pub fn stage_tty_read(board: &mut SimPlatform, pid: Pid) {
    let record = board.record_mut(pid);
    record.retval = 0;
    record.arm(SyscallType::TtyRead);
}

/// Encodes directory entries as `name ino ` text
pub fn directory_file(entries: &[(&str, u32)]) -> Vec<u8> {
    entries
        .iter()
        .map(|(name, ino)| format!("{} {} ", name, ino))
        .collect::<String>()
        .into_bytes()
}

/// File store holding one directory and a program image per entry
pub fn file_store_with_programs(dir_ino: u32, programs: &[(&str, u32)]) -> RamFileStore {
    let mut store = RamFileStore::new();
    store.insert(dir_ino, &directory_file(programs));
    for (name, ino) in programs {
        store.insert(*ino, &program_image(name));
    }
    store
}
