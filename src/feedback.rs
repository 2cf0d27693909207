#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::{
    gradle::BuildOutcome,
    junit::{ExecutionSummary, MAX_LISTED_FAILURES},
    students::Student,
};

/// Cap on build output embedded in a report, to keep reports readable when a
/// build log runs long.
const BUILD_OUTPUT_TRUNCATE: usize = 4_000;

/// Renders the report header for one student.
fn render_header(student: &Student, assignment: &str) -> String {
    format!(
        "# Grading Report: {username}\n\n**Assignment**: {assignment}\n**Group**: \
         {group}\n**Semester**: {semester}\n**Course**: {course} Section {section}\n\n---\n",
        username = student.username,
        group = student.group_name,
        semester = student.semester,
        course = student.course,
        section = student.section,
    )
}

/// Renders the build status section. Failed builds include the (truncated)
/// build log so the grader can see what went wrong.
fn render_build_status(build: Option<&BuildOutcome>) -> String {
    match build {
        Some(build) if build.success => "## Build\n\n✅ Build succeeded.\n".to_string(),
        Some(build) => {
            let mut output = build.output.trim().to_string();
            if output.len() > BUILD_OUTPUT_TRUNCATE {
                let mut cut = BUILD_OUTPUT_TRUNCATE;
                while !output.is_char_boundary(cut) {
                    cut -= 1;
                }
                output.truncate(cut);
                output.push_str("\n… (truncated)");
            }
            format!("## Build\n\n❌ Build failed.\n\n```text\n{output}\n```\n")
        }
        None => "## Build\n\n⚠️ Build was not run.\n".to_string(),
    }
}

/// Renders the test results section: aggregate counts, the pass percentage,
/// and the first few failing tests. The percentage is informational; no grade
/// is derived from it.
fn render_test_results(tests: Option<&ExecutionSummary>) -> String {
    let Some(summary) = tests else {
        return "## Test Results\n\n⚠️ Tests were not run.\n".to_string();
    };

    if !summary.has_results() {
        let mut section = "## Test Results\n\n⚠️ No test results were found.\n".to_string();
        for note in &summary.errors {
            section.push_str(&format!("\n- {note}"));
        }
        if !summary.errors.is_empty() {
            section.push('\n');
        }
        return section;
    }

    let mut section = format!(
        "## Test Results\n\n- **Passed**: {passed}/{total}\n- **Score**: {score:.1}%\n- \
         **Failed**: {failed}\n- **Skipped**: {skipped}\n",
        passed = summary.passed,
        total = summary.total,
        score = summary.score_percent(),
        failed = summary.failed,
        skipped = summary.skipped,
    );

    if !summary.failures.is_empty() {
        section.push_str("\n### Failing Tests\n\n");
        for failure in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            section.push_str(&format!("- `{failure}`\n"));
        }
        let remaining = summary.failures.len().saturating_sub(MAX_LISTED_FAILURES);
        if remaining > 0 {
            section.push_str(&format!("- … and {remaining} more\n"));
        }
    }

    section
}

/// Renders the AI feedback section. The completion text is embedded verbatim;
/// no grade is extracted from it.
fn render_feedback(feedback: Option<&str>) -> String {
    match feedback {
        Some(text) => format!("## Feedback\n\n{}\n", text.trim()),
        None => "## Feedback\n\n⚠️ No AI feedback was generated for this submission.\n".to_string(),
    }
}

/// Renders the whole markdown report for one student.
pub fn render_report(
    student: &Student,
    assignment: &str,
    build: Option<&BuildOutcome>,
    tests: Option<&ExecutionSummary>,
    feedback: Option<&str>,
) -> String {
    [
        render_header(student, assignment),
        render_build_status(build),
        render_test_results(tests),
        render_feedback(feedback),
    ]
    .join("\n")
}

/// Writes one student's report under the output directory as
/// `<username>-<assignment>.md` and returns the path written.
pub fn write_report(
    output_dir: &Path,
    student: &Student,
    assignment: &str,
    contents: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Could not create output directory {}", output_dir.display())
    })?;

    let path = output_dir.join(format!("{}-{assignment}.md", student.username));
    std::fs::write(&path, contents)
        .with_context(|| format!("Could not write report {}", path.display()))?;

    Ok(path)
}
