use std::{collections::BTreeMap, fs, path::PathBuf};

use gradeit::{
    feedback::{render_report, write_report},
    grade::{PROMPT_TRUNCATE, build_grading_prompt, collect_java_sources},
    gradle::BuildOutcome,
    junit::parse_results,
    students::Student,
};
use uuid::Uuid;

fn temp_root(prefix: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("gradeit-{prefix}-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

fn student() -> Student {
    Student::from_group_name("mawall-2026-winter-cis-271-01").expect("parse student")
}

#[test]
fn report_contains_identity_build_and_feedback_sections() {
    let build = BuildOutcome {
        success: true,
        output:  "BUILD SUCCESSFUL".to_string(),
    };

    let report =
        render_report(&student(), "fizzbuzz", Some(&build), None, Some("Nice loop structure."));
    assert!(report.contains("# Grading Report: mawall"));
    assert!(report.contains("**Assignment**: fizzbuzz"));
    assert!(report.contains("Build succeeded"));
    assert!(report.contains("Tests were not run"));
    assert!(report.contains("Nice loop structure."));
}

#[test]
fn report_summarizes_test_results_with_failing_tests_listed() {
    let root = temp_root("results");
    let report_dir = root.join("build/test-results/test");
    fs::create_dir_all(&report_dir).expect("mkdirs");
    fs::write(
        report_dir.join("TEST-FizzBuzzTest.xml"),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="FizzBuzzTest" tests="4" failures="1" errors="0" skipped="1">
  <testcase name="printsFizz" classname="FizzBuzzTest"/>
  <testcase name="printsBuzz" classname="FizzBuzzTest"/>
  <testcase name="printsFizzBuzz" classname="FizzBuzzTest">
    <failure message="expected &quot;FizzBuzz&quot; but was &lt;Fizz&gt;" type="org.opentest4j.AssertionFailedError"><![CDATA[stacktrace with <angle brackets> inside]]></failure>
  </testcase>
  <testcase name="printsNumber" classname="FizzBuzzTest">
    <skipped/>
  </testcase>
</testsuite>
"#,
    )
    .expect("write report xml");

    let summary = parse_results(&root);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.errors.is_empty());

    let build = BuildOutcome {
        success: false,
        output:  "BUILD FAILED".to_string(),
    };
    let report = render_report(&student(), "fizzbuzz", Some(&build), Some(&summary), None);
    assert!(report.contains("**Passed**: 2/4"));
    assert!(report.contains("**Score**: 50.0%"));
    assert!(report.contains("### Failing Tests"));
    assert!(report.contains("FizzBuzzTest.printsFizzBuzz: expected \"FizzBuzz\" but was <Fizz>"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn missing_test_reports_are_noted_not_fatal() {
    let root = temp_root("no-results");

    let summary = parse_results(&root);
    assert_eq!(summary.total, 0);
    assert!(!summary.has_results());
    assert!(summary.errors.iter().any(|e| e.contains("not found")));

    let report = render_report(&student(), "fizzbuzz", None, Some(&summary), None);
    assert!(report.contains("No test results were found"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn unparseable_test_report_is_recorded_as_an_error() {
    let root = temp_root("bad-results");
    let report_dir = root.join("build/test-results/test");
    fs::create_dir_all(&report_dir).expect("mkdirs");
    fs::write(report_dir.join("TEST-Broken.xml"), "<testsuite tests=oops>").expect("write");

    let summary = parse_results(&root);
    assert!(summary.errors.iter().any(|e| e.contains("TEST-Broken.xml")));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn suite_counts_accumulate_across_report_files() {
    let root = temp_root("multi-results");
    let report_dir = root.join("build/test-results/test");
    fs::create_dir_all(&report_dir).expect("mkdirs");
    fs::write(
        report_dir.join("TEST-ATest.xml"),
        r#"<testsuite name="ATest" tests="3" failures="0" errors="0" skipped="0"/>"#,
    )
    .expect("write");
    fs::write(
        report_dir.join("TEST-BTest.xml"),
        r#"<testsuite name="BTest" tests="2" failures="0" errors="1" skipped="0">
  <testcase name="crashes" classname="BTest">
    <error message="NullPointerException"/>
  </testcase>
  <testcase name="works" classname="BTest"/>
</testsuite>"#,
    )
    .expect("write");

    let summary = parse_results(&root);
    assert_eq!(summary.total, 5);
    assert_eq!(summary.passed, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].message, "NullPointerException");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn failed_build_embeds_truncated_log() {
    let build = BuildOutcome {
        success: false,
        output:  "e".repeat(10_000),
    };

    let report = render_report(&student(), "fizzbuzz", Some(&build), None, None);
    assert!(report.contains("Build failed"));
    assert!(report.contains("(truncated)"));
    assert!(report.contains("No AI feedback was generated"));
    assert!(report.len() < 10_000);
}

#[test]
fn write_report_names_file_after_student_and_assignment() {
    let out = temp_root("reports");
    let path = write_report(&out, &student(), "fizzbuzz", "contents").expect("write");
    assert_eq!(path.file_name().unwrap().to_str().unwrap(), "mawall-fizzbuzz.md");
    assert_eq!(fs::read_to_string(&path).unwrap(), "contents");
    let _ = fs::remove_dir_all(out);
}

#[test]
fn prompt_includes_requirements_solution_and_sources_in_order() {
    let mut sources = BTreeMap::new();
    sources.insert("src/Main.java".to_string(), "class Main {}".to_string());
    let mut solution = BTreeMap::new();
    solution.insert("Main.java".to_string(), "class Main { /* ref */ }".to_string());

    let prompt = build_grading_prompt("Implement FizzBuzz.", &sources, Some(&solution));
    assert!(prompt.contains("Implement FizzBuzz."));
    assert!(prompt.contains("--- Main.java (Solution) ---"));
    assert!(prompt.contains("--- src/Main.java ---"));

    let solution_at = prompt.find("(Solution)").unwrap();
    let student_at = prompt.find("Student Code:").unwrap();
    assert!(solution_at < student_at);
}

#[test]
fn prompt_is_truncated_at_the_cap() {
    let mut sources = BTreeMap::new();
    sources.insert("Big.java".to_string(), "x".repeat(PROMPT_TRUNCATE * 2));

    let prompt = build_grading_prompt("reqs", &sources, None);
    assert!(prompt.len() <= PROMPT_TRUNCATE);
}

#[test]
fn collects_java_sources_recursively_with_relative_keys() {
    let root = temp_root("sources");
    fs::create_dir_all(root.join("src/main/java")).expect("mkdirs");
    fs::write(root.join("src/main/java/App.java"), "class App {}").expect("write");
    fs::write(root.join("README.md"), "not java").expect("write");

    let sources = collect_java_sources(&root).expect("collect");
    assert_eq!(sources.len(), 1);
    assert_eq!(
        sources.get("src/main/java/App.java").map(String::as_str),
        Some("class App {}")
    );

    let _ = fs::remove_dir_all(root);
}
