//! Termination Tests
//!
//! Validates the three ways a process ends: operator kill, a fault in
//! user code, and a normal exit through the process manager. Kernel
//! services must survive all of them.

use core_types::{Pid, DIR_SERVICE_PID, FILE_SERVICE_PID, PROCESS_MANAGER_PID, SHELL_PID};
use hal::CTRL_C;
use kernel::{KernelFatal, ProcessStatus, ScheduleEvent};
use sim_kernel::test_utils::MCAUSE_ILLEGAL_INSTRUCTION;
use tests_resilience::{boot_and_spawn, test_bootstrap, Observation, Step};

const SERVICES: [Pid; 4] = [PROCESS_MANAGER_PID, FILE_SERVICE_PID, DIR_SERVICE_PID, SHELL_PID];

fn killed(machine: &tests_resilience::SimMachine, pid: Pid) -> bool {
    machine
        .kernel()
        .audit_log()
        .has_event(|e| matches!(e, ScheduleEvent::Killed { pid: p, .. } if *p == pid))
}

/// Test: Ctrl-C kills killable processes but spares services and a
/// process in the middle of a send
///
/// This validates that:
/// 1. Every killable process not waiting to send is redirected
/// 2. The sender blocked on a full slot keeps waiting
/// 3. Services are untouched
/// 4. All killed processes eventually leave the table
#[test]
fn test_ctrl_c_spares_services_and_blocked_sender() {
    let apps = vec![
        ("holder", Step::spin(1000)),
        ("blocked", vec![Step::send(5, b"first"), Step::send(5, b"second")]),
        ("worker", Step::spin(1000)),
    ];
    let (mut machine, pids) = boot_and_spawn(&apps).expect("boot");
    let (holder, blocked, worker) = (pids[0], pids[1], pids[2]);
    assert_eq!(holder, Pid::new(5));

    let waiting = machine
        .run_until(1000, |m| m.status_of(blocked) == Some(ProcessStatus::WaitingToSend))
        .expect("run");
    assert!(waiting);

    machine.type_keys(&[CTRL_C]).expect("ctrl-c");

    assert!(killed(&machine, holder));
    assert!(killed(&machine, worker));
    assert!(!killed(&machine, blocked));
    assert_eq!(machine.status_of(blocked), Some(ProcessStatus::WaitingToSend));
    assert_eq!(machine.board().console_output(), "^C\r\n");
    for service in SERVICES {
        assert!(!killed(&machine, service));
    }

    let gone = machine
        .run_until_exited(&[holder, blocked, worker], 5000)
        .expect("run");
    assert!(gone);

    // the holder's slot was discarded with it, so the second send found
    // no receiver
    assert!(machine
        .observations_of(blocked)
        .contains(&&Observation::Sent {
            to: holder,
            retval: -1
        }));
    for service in SERVICES {
        assert!(machine.status_of(service).is_some());
    }
}

/// Test: Ctrl-C with nothing to kill is not echoed
#[test]
fn test_ctrl_c_without_victims_is_silent() {
    let mut machine = test_bootstrap(&[]).expect("boot");

    machine.type_keys(&[CTRL_C]).expect("ctrl-c");

    assert_eq!(machine.board().console_output(), "");
    assert!(!machine
        .kernel()
        .audit_log()
        .has_event(|e| matches!(e, ScheduleEvent::Killed { .. })));
}

/// Test: A fault in an application frees it and the machine carries on
#[test]
fn test_faulting_app_is_released() {
    let apps = vec![
        ("crasher", vec![Step::Fault]),
        ("bystander", Step::spin(500)),
    ];
    let (mut machine, pids) = boot_and_spawn(&apps).expect("boot");
    let (crasher, bystander) = (pids[0], pids[1]);

    let gone = machine.run_until_exited(&[crasher], 500).expect("run");
    assert!(gone);

    assert!(machine
        .kernel()
        .audit_log()
        .has_event(|e| matches!(e, ScheduleEvent::Exited { pid, .. } if *pid == crasher)));
    assert!(machine.board().spaces().released().contains(&crasher));
    assert!(machine.status_of(bystander).is_some());
    for service in SERVICES {
        assert!(machine.status_of(service).is_some());
    }
}

/// Test: A fault inside a kernel service stops the kernel
#[test]
fn test_service_fault_is_fatal() {
    let mut machine = test_bootstrap(&[]).expect("boot");
    assert_eq!(machine.current_pid(), PROCESS_MANAGER_PID);

    let err = machine
        .interrupt(MCAUSE_ILLEGAL_INSTRUCTION)
        .expect_err("service fault must be fatal");

    assert!(matches!(
        err,
        KernelFatal::KernelException {
            pid: PROCESS_MANAGER_PID,
            cause: 2,
            ..
        }
    ));
}

/// Test: Exit through the process manager frees the slot and drops the
/// message nobody read
#[test]
fn test_exit_discards_unread_message() {
    let apps = vec![
        ("quitter", [Step::spin(6), vec![Step::Exit(3)]].concat()),
        ("writer", vec![Step::send(5, b"never read")]),
    ];
    let (mut machine, pids) = boot_and_spawn(&apps).expect("boot");
    let (quitter, writer) = (pids[0], pids[1]);
    assert_eq!(quitter, Pid::new(5));

    let delivered = machine
        .run_until(1000, |m| !m.observations_of(writer).is_empty())
        .expect("run");
    assert!(delivered);
    assert_eq!(
        machine.observations_of(writer),
        vec![&Observation::Sent {
            to: quitter,
            retval: 0
        }]
    );

    let gone = machine.run_until_exited(&[quitter], 2000).expect("run");
    assert!(gone);
    assert!(!machine.kernel().mailbox().has_message_for(quitter));
    assert_eq!(
        machine.kernel().audit_log().count_events(
            |e| matches!(e, ScheduleEvent::Exited { pid, .. } if *pid == quitter)
        ),
        1
    );
    assert!(machine.manager().arguments_of(quitter).is_none());
}
