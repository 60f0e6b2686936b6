//! External-interrupt drain
//!
//! Runs at the start of every scheduling decision and after every idle
//! period. It is the only place blocked requests make progress.

use crate::{Kernel, KernelFatal};
use hal::{ExternalCause, Platform};
use log::{debug, warn};

impl<P: Platform> Kernel<P> {
    /// Services pending device causes, handles an operator interrupt, then
    /// retries every blocked request once in table order
    pub(crate) fn drain(&mut self) -> Result<(), KernelFatal> {
        while let Some(cause) = self.platform.claim_pending_external() {
            match cause {
                ExternalCause::Console => self.platform.service_receive_interrupt(),
                ExternalCause::Other(id) => warn!("drain: unexpected external cause {}", id),
            }
            self.platform.complete_external(cause);
        }

        if self.platform.take_special_char() {
            let killed = self.kill_killable()?;
            if killed.is_empty() {
                debug!("drain: operator interrupt with nothing to kill");
            } else {
                self.platform.write_bytes(b"^C\r\n");
            }
        }

        let blocked: Vec<usize> = self
            .table
            .iter()
            .filter(|(_, process)| process.status.is_blocked())
            .map(|(slot, _)| slot)
            .collect();
        if !blocked.is_empty() {
            debug!("drain: retrying {} blocked requests", blocked.len());
        }
        for slot in blocked {
            self.retry_request(slot)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Context, Kernel, KernelConfig, ProcessStatus};
    use core_types::Pid;
    use hal::ExternalCause;
    use kernel_api::ProcessControl;
    use sim_kernel::test_utils::{
        stage_recv, stage_send, stage_tty_read, MCAUSE_EXTERNAL, MCAUSE_SOFTWARE, MCAUSE_TIMER,
    };
    use sim_kernel::SimPlatform;

    fn boot(count: usize) -> (Kernel<SimPlatform>, Vec<Pid>) {
        let mut kernel = Kernel::new(SimPlatform::new(), KernelConfig::default());
        for _ in 0..4 {
            let pid = kernel.alloc(false).unwrap();
            kernel.free(pid).unwrap();
        }
        let pids = (0..count)
            .map(|_| {
                let pid = kernel.alloc(true).unwrap();
                kernel.set_ready(pid, 0x1000).unwrap();
                pid
            })
            .collect();
        kernel.start().unwrap();
        (kernel, pids)
    }

    #[test]
    fn test_external_causes_are_completed() {
        let (mut kernel, _) = boot(1);
        kernel.platform_mut().raise_external(4);
        kernel.platform_mut().type_input(b"z");
        kernel.trap(MCAUSE_EXTERNAL, Context::default()).unwrap();

        assert_eq!(
            kernel.platform().completed_external(),
            &[ExternalCause::Other(4), ExternalCause::Console]
        );
    }

    #[test]
    fn test_send_wakes_receiver_on_the_same_yield() {
        let (mut kernel, pids) = boot(3);
        let (a, b) = (pids[0], pids[1]);

        // a blocks on receive
        stage_recv(kernel.platform_mut(), a);
        kernel.trap(MCAUSE_SOFTWARE, Context::default()).unwrap();
        assert_eq!(kernel.current_pid(), Some(b));
        assert_eq!(kernel.status_of(a), Some(ProcessStatus::WaitingToReceive));

        // b sends to a; the drain ahead of the next decision delivers it
        stage_send(kernel.platform_mut(), b, a, b"wake");
        kernel.trap(MCAUSE_SOFTWARE, Context::default()).unwrap();

        let record = kernel.platform().record(a).unwrap();
        assert!(!record.is_pending());
        assert_eq!(record.sender_pid(), b);
        assert_eq!(&record.payload[..4], b"wake");
        assert_eq!(kernel.status_of(a), Some(ProcessStatus::Runnable));
        assert!(!kernel.mailbox().has_message_for(a));
    }

    #[test]
    fn test_retry_is_idempotent() {
        let (mut kernel, pids) = boot(3);
        let (a, b, c) = (pids[0], pids[1], pids[2]);

        stage_send(kernel.platform_mut(), a, c, b"one");
        kernel.trap(MCAUSE_SOFTWARE, Context::default()).unwrap();
        stage_send(kernel.platform_mut(), b, c, b"two");
        kernel.trap(MCAUSE_SOFTWARE, Context::default()).unwrap();
        assert_eq!(kernel.status_of(b), Some(ProcessStatus::WaitingToSend));

        // repeated drains while c has not received change nothing
        for _ in 0..3 {
            kernel.platform_mut().raise_external(1);
            kernel.trap(MCAUSE_EXTERNAL, Context::default()).unwrap();
            assert_eq!(kernel.status_of(b), Some(ProcessStatus::WaitingToSend));
            assert_eq!(kernel.mailbox().pending(), 1);
        }

        while kernel.current_pid() != Some(c) {
            kernel.trap(MCAUSE_TIMER, Context::default()).unwrap();
        }
        stage_recv(kernel.platform_mut(), c);
        kernel.trap(MCAUSE_SOFTWARE, Context::default()).unwrap();
        assert_eq!(&kernel.platform().record(c).unwrap().payload[..4], b"one\0");

        // the drain after c's receive landed b's message; another drain
        // does not land it twice
        kernel.platform_mut().raise_external(1);
        kernel.trap(MCAUSE_EXTERNAL, Context::default()).unwrap();
        assert_eq!(kernel.mailbox().pending(), 1);
        assert!(kernel.mailbox().has_message_for(c));
        assert!(!kernel.platform().record(b).unwrap().is_pending());
    }

    #[test]
    fn test_console_read_completes_on_drain() {
        let (mut kernel, pids) = boot(2);
        stage_tty_read(kernel.platform_mut(), pids[0]);
        kernel.trap(MCAUSE_SOFTWARE, Context::default()).unwrap();
        assert_eq!(kernel.status_of(pids[0]), Some(ProcessStatus::Requesting));

        kernel.platform_mut().type_input(b"q");
        kernel.trap(MCAUSE_EXTERNAL, Context::default()).unwrap();

        assert_eq!(kernel.platform().record(pids[0]).unwrap().payload[0], b'q');
        assert!(!kernel.platform().record(pids[0]).unwrap().is_pending());
    }
}
