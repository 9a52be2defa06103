//! Integration tests for setting commands via CLI.
//!
//! These tests verify that setting operations work correctly through the CLI:
//! - `qm set/add/change` create and update settings through their stored type
//! - `qm get` returns typed values and honors `--default`
//! - `qm has` and `qm forget` follow existence semantics
//! - `qm list` and `qm categories` partition settings by category

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::json;

// === Set / Get Tests ===

#[test]
fn test_set_and_get_typed_value() {
    let env = TestEnv::new();

    let created = env.json(&["set", "mail.port", "25", "--type", "integer", "-c", "mail"]);
    assert_eq!(created["action"], "created");
    assert_eq!(created["setting"]["type"], "integer");
    assert_eq!(created["setting"]["value"], 25);

    let got = env.json(&["get", "mail.port"]);
    assert_eq!(got["value"], 25);
    assert_eq!(got["type"], "integer");
    assert_eq!(got["category"], "mail");
    assert_eq!(got["found"], true);
}

#[test]
fn test_get_human_prints_display_value() {
    let env = TestEnv::new();
    env.qm()
        .args(["set", "hosts", r#"{ "primary": "a", "ports": [1, 2] }"#, "-t", "json"])
        .assert()
        .success();

    env.qm()
        .args(["get", "hosts", "-H"])
        .assert()
        .success()
        .stdout(r#"{"ports":[1,2],"primary":"a"}"#.to_string() + "\n");
}

#[test]
fn test_mail_port_scenario() {
    let env = TestEnv::new();

    env.qm()
        .args(["set", "mail.port", "25", "--type", "integer"])
        .assert()
        .success();

    // Non-numeric input is stored as 0 rather than rejected
    let updated = env.json(&["set", "mail.port", "not-a-number"]);
    assert_eq!(updated["action"], "updated");
    assert_eq!(updated["setting"]["value"], 0);
    assert_eq!(updated["setting"]["type"], "integer");

    env.qm().args(["forget", "mail.port", "--force"]).assert().success();

    env.qm().args(["has", "mail.port"]).assert().code(1);

    env.qm()
        .args(["forget", "mail.port", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Setting not found: mail.port"));
}

#[test]
fn test_type_is_kept_on_update() {
    let env = TestEnv::new();
    env.qm()
        .args(["set", "debug", "yes", "-t", "boolean"])
        .assert()
        .success();

    let updated = env.json(&["set", "debug", "OFF", "--type", "string"]);

    assert_eq!(updated["setting"]["type"], "boolean");
    assert_eq!(updated["setting"]["value"], false);
}

#[test]
fn test_set_twice_same_value() {
    let env = TestEnv::new();
    env.qm().args(["set", "k", "[1,2]", "-t", "json"]).assert().success();

    let first = env.json(&["get", "k"]);
    env.qm().args(["set", "k", "[1,2]"]).assert().success();
    let second = env.json(&["get", "k"]);

    assert_eq!(first, second);
}

#[test]
fn test_get_missing_fails() {
    let env = TestEnv::new();

    env.qm()
        .args(["get", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#"{"error":"Setting not found: nope"}"#));
}

#[test]
fn test_get_missing_with_default() {
    let env = TestEnv::new();

    let got = env.json(&["get", "nope", "--default", "fallback"]);
    assert_eq!(got["value"], "fallback");
    assert_eq!(got["found"], false);

    // The default is not written back
    env.qm().args(["has", "nope"]).assert().code(1);
}

#[test]
fn test_get_missing_human_error() {
    let env = TestEnv::new();

    env.qm()
        .args(["get", "nope", "-H"])
        .assert()
        .failure()
        .stderr("Error: Setting not found: nope\n");
}

#[test]
fn test_negative_integer_value() {
    let env = TestEnv::new();
    let created = env.json(&["set", "offset", "-15", "-t", "int"]);
    assert_eq!(created["setting"]["value"], -15);
}

#[test]
fn test_empty_key_rejected() {
    let env = TestEnv::new();
    env.qm()
        .args(["set", "", "v"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be empty"));
}

#[test]
fn test_empty_category_rejected() {
    let env = TestEnv::new();

    env.qm()
        .args(["set", "k", "v", "--category", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Category must not be empty"));

    env.qm().args(["has", "k"]).assert().code(1);
    let categories = env.json(&["categories"]);
    assert_eq!(categories["categories"], json!([]));
}

#[test]
fn test_default_type_does_not_change_existing_setting() {
    let env = TestEnv::new();
    env.qm().args(["set", "debug", "on", "-t", "boolean"]).assert().success();
    std::fs::write(env.config_path(), "default-type \"integer\"\n").unwrap();

    let updated = env.json(&["set", "debug", "off"]);

    assert_eq!(updated["action"], "updated");
    assert_eq!(updated["setting"]["type"], "boolean");
    assert_eq!(updated["setting"]["value"], false);
}

// === Add / Change Tests ===

#[test]
fn test_add_existing_fails() {
    let env = TestEnv::new();
    env.qm().args(["add", "k", "1", "-t", "integer"]).assert().success();

    env.qm()
        .args(["add", "k", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(env.json(&["get", "k"])["value"], 1);
}

#[test]
fn test_change_missing_fails() {
    let env = TestEnv::new();

    env.qm()
        .args(["change", "k", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Setting not found: k"));
}

#[test]
fn test_change_keeps_category() {
    let env = TestEnv::new();
    env.qm()
        .args(["add", "mail.host", "localhost", "-c", "mail"])
        .assert()
        .success();

    let changed = env.json(&["change", "mail.host", "smtp.example.com"]);

    assert_eq!(changed["action"], "updated");
    assert_eq!(changed["setting"]["category"], "mail");
    assert_eq!(changed["setting"]["value"], "smtp.example.com");
}

// === Strict Mode Tests ===

#[test]
fn test_strict_rejects_malformed_input() {
    let env = TestEnv::new();
    env.qm().args(["set", "port", "25", "-t", "integer"]).assert().success();

    env.qm()
        .args(["set", "port", "abc", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot decode"));

    assert_eq!(env.json(&["get", "port"])["value"], 25);
}

#[test]
fn test_strict_from_config_file() {
    let env = TestEnv::new();
    std::fs::write(env.config_path(), "strict #true\n").unwrap();
    env.qm().args(["set", "flag", "on", "-t", "bool"]).assert().success();

    env.qm().args(["set", "flag", "sometimes"]).assert().failure();

    assert_eq!(env.json(&["get", "flag"])["value"], true);
}

// === Has Tests ===

#[test]
fn test_has() {
    let env = TestEnv::new();
    env.qm().args(["set", "k", "v"]).assert().success();

    env.qm()
        .args(["has", "k"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""exists":true"#));

    env.qm()
        .args(["has", "missing", "-H"])
        .assert()
        .code(1)
        .stdout("missing not found\n");
}

// === Forget Tests ===

#[test]
fn test_forget_confirmed_on_stdin() {
    let env = TestEnv::new();
    env.qm().args(["set", "k", "v"]).assert().success();

    env.qm()
        .args(["forget", "k"])
        .write_stdin("y\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Forget setting 'k'?"));

    env.qm().args(["has", "k"]).assert().code(1);
}

#[test]
fn test_forget_declined_keeps_setting() {
    let env = TestEnv::new();
    env.qm().args(["set", "k", "v"]).assert().success();

    env.qm()
        .args(["forget", "k"])
        .write_stdin("n\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Aborted"));

    env.qm().args(["has", "k"]).assert().success();
}

#[test]
fn test_forget_without_input_declines() {
    let env = TestEnv::new();
    env.qm().args(["set", "k", "v"]).assert().success();

    env.qm().args(["forget", "k"]).write_stdin("").assert().failure();

    env.qm().args(["has", "k"]).assert().success();
}

#[test]
fn test_forget_missing_does_not_prompt() {
    let env = TestEnv::new();

    env.qm()
        .args(["forget", "ghost"])
        .write_stdin("y\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Forget setting").not())
        .stderr(predicate::str::contains("Setting not found: ghost"));
}

// === List / Categories Tests ===

fn seed(env: &TestEnv) {
    env.qm().args(["set", "mail.host", "localhost", "-c", "mail"]).assert().success();
    env.qm().args(["set", "mail.port", "25", "-c", "mail", "-t", "integer"]).assert().success();
    env.qm().args(["set", "cache.ttl", "60", "-c", "cache", "-t", "integer"]).assert().success();
    env.qm().args(["set", "debug", "true", "-t", "boolean"]).assert().success();
}

#[test]
fn test_list_all() {
    let env = TestEnv::new();
    seed(&env);

    let list = env.json(&["list"]);

    assert_eq!(list["count"], 4);
    let keys: Vec<&str> = list["settings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["cache.ttl", "debug", "mail.host", "mail.port"]);
}

#[test]
fn test_list_by_category() {
    let env = TestEnv::new();
    seed(&env);

    let list = env.json(&["list", "--category", "mail"]);
    assert_eq!(list["count"], 2);
    assert_eq!(list["category"], "mail");

    let list = env.json(&["list", "--uncategorized"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["settings"][0]["key"], "debug");
}

#[test]
fn test_list_human_table() {
    let env = TestEnv::new();
    seed(&env);

    env.qm()
        .args(["list", "-H", "-c", "cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("KEY"))
        .stdout(predicate::str::contains("cache.ttl  integer  cache     60"))
        .stdout(predicate::str::contains("1 setting"));
}

#[test]
fn test_categories() {
    let env = TestEnv::new();
    seed(&env);

    let categories = env.json(&["categories"]);

    assert_eq!(
        categories,
        json!({
            "categories": [
                {"name": "cache", "count": 1},
                {"name": "mail", "count": 2}
            ],
            "uncategorized": 1
        })
    );
}

// === Store Selection Tests ===

#[test]
fn test_memory_store_is_not_persisted() {
    let env = TestEnv::new();
    env.qm()
        .args(["set", "k", "v", "--store", ":memory:"])
        .assert()
        .success();

    env.qm().args(["has", "k", "--store", ":memory:"]).assert().code(1);
    assert!(!env.db_path().exists());
}

#[test]
fn test_store_env_var() {
    let env = TestEnv::new();
    let custom = env.data_path().join("custom").join("other.db");

    env.qm()
        .env("QM_STORE", &custom)
        .args(["set", "k", "v"])
        .assert()
        .success();

    assert!(custom.exists());
    env.qm().args(["has", "k"]).assert().code(1);
    env.qm().env("QM_STORE", &custom).args(["has", "k"]).assert().success();
}
