//! End-to-end tests for reactant
//!
//! The configured endpoint is unreachable, so every model call fails. The
//! loop must turn those failures into observations and still end cleanly.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_unreachable_model_prints_no_answer() {
    let env = TestEnv::new().unwrap();
    env.create_config().unwrap();

    env.command()
        .args(["run", "-m", "What is the weather in Paris?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No answer found"));
}

#[test]
fn test_transcript_written() {
    let env = TestEnv::new().unwrap();
    env.create_config().unwrap();
    let transcript = env.file("runs/paris.json");

    env.command()
        .args(["run", "-m", "What is the weather in Paris?", "--transcript"])
        .arg(&transcript)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&transcript).unwrap()).unwrap();
    assert_eq!(json["outcome"]["status"], "exhausted");
    assert_eq!(json["state"]["step_index"], 2);
    assert_eq!(json["state"]["max_steps"], 2);

    let history = json["state"]["history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[0]["content"], "What is the weather in Paris?");
    assert_eq!(history[1]["role"], "observation");
    assert!(history[1]["content"]
        .as_str()
        .unwrap()
        .contains("model call failed"));
}

#[test]
fn test_max_steps_flag_overrides_config() {
    let env = TestEnv::new().unwrap();
    env.create_config().unwrap();
    let transcript = env.file("one.json");

    env.command()
        .args(["run", "-m", "hi", "--max-steps", "1", "-t"])
        .arg(&transcript)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&transcript).unwrap()).unwrap();
    assert_eq!(json["state"]["max_steps"], 1);
    assert_eq!(json["state"]["step_index"], 1);
}

#[test]
fn test_interactive_mode_reads_stdin() {
    let env = TestEnv::new().unwrap();
    env.create_config().unwrap();

    env.command()
        .args(["run", "--max-steps", "1"])
        .write_stdin("first question\n\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Interactive mode"))
        .stdout(predicate::str::contains("No answer found").count(1));
}

#[test]
fn test_init_then_status() {
    let env = TestEnv::new().unwrap();

    env.command().arg("init").assert().success();

    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK]"))
        .stdout(predicate::str::contains("API key:    [Missing]"));
}
