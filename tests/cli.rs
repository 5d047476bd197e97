//! Command line tests, running the real binary with real forks

use assert_cmd::Command;
use predicates::prelude::*;

fn bench() -> Command {
    let mut cmd = Command::cargo_bin("unmap-bench").unwrap();
    cmd.env("RUST_LOG", "off");
    cmd
}

fn ms(line: &str) -> f64 {
    line.rsplit(": ")
        .next()
        .and_then(|s| s.strip_suffix(" ms"))
        .unwrap()
        .parse()
        .unwrap()
}

#[test]
fn wrong_argument_count() {
    let cases: [&[&str]; 4] = [&[], &["64"], &["64", "1"], &["64", "1", "4", "2"]];
    for args in cases {
        bench()
            .args(args)
            .assert()
            .failure()
            .stdout(predicate::str::contains("Child").not())
            .stdout(predicate::str::contains("Round").not())
            .stderr(predicate::str::contains("Usage"));
    }
}

#[test]
fn non_positive_arguments() {
    for args in [["0", "1", "1"], ["64", "0", "1"], ["64", "1", "0"], ["-5", "1", "1"], ["64", "1", "-2"]] {
        bench()
            .args(args)
            .assert()
            .failure()
            .stdout(predicate::str::contains("Round").not())
            .stderr(predicate::str::contains("All parameters must be positive integers"));
    }
}

#[test]
fn not_a_number() {
    bench()
        .args(["sixty-four", "1", "1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Round").not());
}

#[test]
fn single_round_four_children() {
    let output = bench().args(["64", "1", "4"]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.iter().filter(|l| **l == "=== Round 1 ===").count(), 1);
    assert_eq!(
        lines
            .iter()
            .filter(|l| **l == "Writing to memory (size=64 MB)...")
            .count(),
        1
    );

    let mut children: Vec<usize> = lines
        .iter()
        .filter_map(|l| l.strip_prefix("Child "))
        .map(|l| l.split(' ').next().unwrap().parse().unwrap())
        .collect();
    children.sort();
    assert_eq!(children, vec![1, 2, 3, 4]);

    let totals: Vec<&&str> = lines
        .iter()
        .filter(|l| l.starts_with("Total time (fork to last child exit): "))
        .collect();
    assert_eq!(totals.len(), 1);

    let max_child = lines
        .iter()
        .filter(|l| l.starts_with("Child "))
        .map(|l| ms(l))
        .fold(0.0, f64::max);
    assert!(ms(totals[0]) >= max_child);
}

#[test]
fn several_rounds() {
    let output = bench().args(["8", "3", "2"]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();

    for round in 1..=3 {
        assert!(stdout.contains(&format!("=== Round {round} ===")));
    }
    assert_eq!(stdout.matches("Writing to memory (size=8 MB)...").count(), 3);
    assert_eq!(stdout.lines().filter(|l| l.starts_with("Child ")).count(), 6);
    assert_eq!(stdout.matches("Total time").count(), 3);
}

#[test]
fn mapping_failure_is_fatal() {
    // far beyond any address space
    bench()
        .args(["1000000000000", "1", "1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Child").not())
        .stderr(predicate::str::contains("mmap failed"));
}
