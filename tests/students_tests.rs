use std::{fs, path::PathBuf};

use gradeit::students::{Student, StudentLoader};
use uuid::Uuid;

fn write_roster(contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gradeit-roster-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("students.txt");
    fs::write(&path, contents).expect("write roster");
    path
}

#[test]
fn parses_standard_group_name() {
    let student = Student::from_group_name("mawall-2026-winter-cis-271-01").expect("parse");
    assert_eq!(student.username, "mawall");
    assert_eq!(student.semester, "2026-winter");
    assert_eq!(student.course, "cis-271");
    assert_eq!(student.section, "01");
}

#[test]
fn hyphenated_usernames_split_at_the_year() {
    let student = Student::from_group_name("de-la-cruz-2026-winter-cis-271-02").expect("parse");
    assert_eq!(student.username, "de-la-cruz");
    assert_eq!(student.semester, "2026-winter");
    assert_eq!(student.section, "02");
}

#[test]
fn rejects_group_names_with_too_few_parts() {
    assert!(Student::from_group_name("mawall-cis").is_err());
}

#[test]
fn builds_ssh_repo_url() {
    let student = Student::from_group_name("mawall-2026-winter-cis-271-01").expect("parse");
    assert_eq!(
        student.repo_url("gitlab.example.edu", "fizzbuzz"),
        "git@gitlab.example.edu:mawall-2026-winter-cis-271-01/fizzbuzz.git"
    );
}

#[test]
fn loader_skips_comments_and_strips_trailing_periods() {
    let path = write_roster(
        "# roster for section 01\n\
         mawall-2026-winter-cis-271-01.\n\
         \n\
         jdoe-2026-winter-cis-271-01\n",
    );

    let students = StudentLoader::new(&path).load().expect("load roster");
    assert_eq!(students.len(), 2);
    assert_eq!(students[0].username, "mawall");
    assert_eq!(students[1].username, "jdoe");

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn loader_collects_all_malformed_lines_with_numbers() {
    let path = write_roster(
        "mawall-2026-winter-cis-271-01\n\
         garbage\n\
         also-bad\n",
    );

    let err = StudentLoader::new(&path).load().expect_err("should fail");
    let message = err.to_string();
    assert!(message.contains("Line 2"));
    assert!(message.contains("Line 3"));

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn loader_errors_when_roster_is_missing() {
    let err = StudentLoader::new("/nope/students.txt").load().expect_err("should fail");
    assert!(err.to_string().contains("Could not read students file"));
}
