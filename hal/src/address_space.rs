//! Address-space management abstraction

use core_types::Pid;
use kernel_api::SyscallRecord;

/// Per-process address spaces
///
/// The paging policy is entirely the board's business. The kernel only
/// asks for "the address space of `pid`" and, while it is installed,
/// reads and writes that process's syscall record.
pub trait AddressSpaceHal {
    /// Installs the address space of `pid`
    fn switch_context(&mut self, pid: Pid);

    /// The syscall record of the currently installed address space
    fn syscall_record(&mut self) -> &mut SyscallRecord;

    /// Releases every resource held by the address space of `pid`
    fn release(&mut self, pid: Pid);
}
