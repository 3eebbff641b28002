//! Exit status and output of the `sched_model` binary.

use pretty_assertions::assert_eq;
use std::process::{Command, Output};

fn sched_model(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sched_model"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn completed_run_exits_zero() {
    let out = sched_model(&["-p", "0:10", "-p", "1:5", "-p", "3:8"]);
    let stdout = String::from_utf8(out.stdout).unwrap();

    assert!(out.status.success());
    assert!(stdout.contains("Average Waiting Time: 7.00"), "{stdout}");
}

#[test]
fn comparison_runs_every_policy() {
    let out = sched_model(&["-P", "all", "-q", "2", "-n", "5", "--seed", "3"]);
    let stdout = String::from_utf8(out.stdout).unwrap();

    assert!(out.status.success());
    for policy in ["fcfs", "sjf", "priority", "rr", "mlq", "edf"] {
        assert!(stdout.lines().any(|l| l.starts_with(policy)), "{policy} missing:\n{stdout}");
    }
}

#[test]
fn construction_and_configuration_errors_exit_non_zero() {
    let failures: [&[&str]; 6] = [
        &[],
        &["--process=-1:3"],
        &["-P", "lottery", "-p", "0:3"],
        &["-P", "rr", "-p", "0:3"],
        &["-P", "mlq", "-p", "0:3"],
        &["-p", "0:3", "-n", "5", "-P", "rr", "-q", "2"],
    ];

    for args in failures {
        let out = sched_model(args);
        assert!(!out.status.success(), "{args:?} should fail");
        assert_eq!(out.stdout, Vec::<u8>::new(), "{args:?} printed a partial run");
    }
}
