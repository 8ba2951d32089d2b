//! End-to-end tests for the does-it-compile binary.

mod support;
use support::harness::{stderr, stdout, TestHarness, MALFORMED_LIST, VALID_LIST};

fn result_names(out: &str) -> Vec<String> {
    out.lines()
        .map(|line| line.split("... ").next().unwrap_or("").to_string())
        .collect()
}

#[test]
fn test_no_arguments() {
    let harness = TestHarness::new();
    let output = harness.run(&[]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
}

#[test]
fn test_single_valid_list() {
    let harness = TestHarness::new();
    let path = harness.write_file("valid.json", VALID_LIST);

    let output = harness.run(&[&path]);
    let out = stdout(&output);

    assert!(output.status.success());
    assert_eq!(out.lines().count(), 1);
    let line = out.lines().next().unwrap();
    assert!(line.starts_with("valid.json... ✓ ("), "unexpected line: {}", line);
    assert!(line.ends_with("s)"));
}

#[test]
fn test_results_in_argument_order() {
    let harness = TestHarness::new();
    let paths = [
        harness.write_file("a.json", VALID_LIST),
        harness.write_file("b.json", MALFORMED_LIST),
        harness.write_file("c.json", VALID_LIST),
        harness.write_file("d.json", "not json"),
        harness.write_file("e.json", VALID_LIST),
    ];
    let args: Vec<&str> = paths.iter().map(String::as_str).collect();

    let output = harness.run(&args);
    let out = stdout(&output);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        result_names(&out),
        vec!["a.json", "b.json", "c.json", "d.json", "e.json"]
    );
    let glyphs: Vec<bool> = out.lines().map(|line| line.contains('✓')).collect();
    assert_eq!(glyphs, vec![true, false, true, false, true]);
}

#[test]
fn test_same_file_twice() {
    let harness = TestHarness::new();
    let path = harness.write_file("twice.json", VALID_LIST);

    let output = harness.run(&[&path, &path]);
    let out = stdout(&output);

    assert!(output.status.success());
    assert_eq!(out.lines().count(), 2);
    assert!(out.lines().all(|line| line.starts_with("twice.json... ✓")));
}

#[test]
fn test_unreadable_file_fails_by_default() {
    let harness = TestHarness::new();
    let good = harness.write_file("good.json", VALID_LIST);
    let missing = harness.missing_file("missing.json");

    let output = harness.run(&[&missing, &good]);
    let out = stdout(&output);

    assert_eq!(output.status.code(), Some(1));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], format!("Failed to load \"{}\" to compile", missing));
    assert!(lines[1].starts_with("good.json... ✓"));
}

#[test]
fn test_allow_unreadable() {
    let harness = TestHarness::new();
    let good = harness.write_file("good.json", VALID_LIST);
    let missing = harness.missing_file("missing.json");

    let output = harness.run(&["--allow-unreadable", &good, &missing]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).lines().count(), 2);
}

#[test]
fn test_directory_is_unreadable() {
    let harness = TestHarness::new();
    let dir = harness.path().to_string_lossy().to_string();

    let output = harness.run(&[&dir]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("Failed to load"));
}

#[test]
fn test_quiet_prints_only_failures() {
    let harness = TestHarness::new();
    let good = harness.write_file("good.json", VALID_LIST);
    let bad = harness.write_file("bad.json", MALFORMED_LIST);

    let output = harness.run(&["--quiet", &good, &bad]);
    let out = stdout(&output);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(result_names(&out), vec!["bad.json"]);
}

#[test]
fn test_verbose_prints_compile_error() {
    let harness = TestHarness::new();
    let bad = harness.write_file("bad.json", MALFORMED_LIST);

    let output = harness.run(&["--verbose", &bad]);
    let out = stdout(&output);

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("bad.json... 𐄂"));
    assert!(lines[1].starts_with("  Rule 0: "), "unexpected detail: {}", lines[1]);
}

#[test]
fn test_json_output() {
    let harness = TestHarness::new();
    let good = harness.write_file("good.json", VALID_LIST);
    let bad = harness.write_file("bad.json", "[]");

    let output = harness.run(&["--json", &good, &bad]);
    let events: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["file"], "good.json");
    assert_eq!(events[0]["success"], true);
    assert_eq!(events[0]["stats"]["block"], 1);
    assert_eq!(events[1]["success"], false);
    assert!(events[1]["error"].is_string());
}

#[test]
fn test_max_rules() {
    let harness = TestHarness::new();
    let list = r#"[
        {"trigger": {"url-filter": "a"}, "action": {"type": "block"}},
        {"trigger": {"url-filter": "b"}, "action": {"type": "block"}}
    ]"#;
    let path = harness.write_file("two.json", list);

    assert!(harness.run(&[&path]).status.success());
    assert_eq!(harness.run(&["--max-rules", "1", &path]).status.code(), Some(1));
}

#[test]
fn test_invalid_arguments() {
    let harness = TestHarness::new();

    let output = harness.run(&["--max-rules", "0", "x.json"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("max-rules"));
    assert!(output.stdout.is_empty());

    let output = harness.run(&["--identifier", "", "x.json"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("identifier"));

    let output = harness.run(&["--json", "--quiet"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_version() {
    let harness = TestHarness::new();

    let short = stdout(&harness.run(&["-V"]));
    assert!(short.starts_with("does-it-compile "));

    let long = stdout(&harness.run(&["--version"]));
    assert!(long.contains("commit: "));
    assert!(long.contains("built: "));
}
