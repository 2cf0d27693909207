#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use colored::Colorize;
use glob::glob;
use itertools::Itertools;
use tabled::{
    Table, Tabled,
    settings::{Panel, Style},
};
use tracing::{error, warn};

use crate::{
    ai::{FallbackError, FallbackSession},
    config::Config,
    feedback::{render_report, write_report},
    gradle::GradleRunner,
    junit::{self, ExecutionSummary},
    repo::RepositoryCloner,
    students::{Student, StudentLoader},
};

/// Prompt truncation length for generated feedback payloads.
pub const PROMPT_TRUNCATE: usize = 60_000;

/// System prompt prepended to every grading request.
const SYSTEM_PROMPT: &str = "You are an expert Computer Science T.A. grading student \
                             assignments.\nAnalyze the code for correctness, style, and best \
                             practices.\nWrite concise, actionable feedback in markdown, \
                             addressed to the student.";

/// Requirements text used when neither the CLI nor the config provides any.
const DEFAULT_REQUIREMENTS: &str =
    "Evaluate this submission for correctness, style, and best practices.";

/// Options for one grading run, assembled by the CLI.
#[derive(Debug, Clone)]
pub struct GradingOptions {
    /// Assignment name; names the repository and the report files.
    pub assignment:   String,
    /// Remove and re-clone existing checkouts.
    pub force:        bool,
    /// Instructor requirements text, when supplied.
    pub requirements: Option<String>,
    /// Reference solution directory, when supplied.
    pub solution_dir: Option<std::path::PathBuf>,
}

/// Per-student line in the run summary table.
#[derive(Tabled, Clone)]
struct StudentRow {
    /// Student username.
    #[tabled(rename = "Student")]
    student:  String,
    /// Whether the repository was cloned or reused.
    #[tabled(rename = "Repository")]
    repo:     String,
    /// Build outcome.
    #[tabled(rename = "Build")]
    build:    String,
    /// Tests passed out of tests run.
    #[tabled(rename = "Tests")]
    tests:    String,
    /// Feedback outcome or the report path.
    #[tabled(rename = "Feedback")]
    feedback: String,
}

/// Collects the `.java` sources under a checkout, keyed by path relative to
/// the checkout root. `BTreeMap` keeps prompt assembly deterministic.
pub fn collect_java_sources(root: &Path) -> Result<BTreeMap<String, String>> {
    let pattern = root.join("**/*.java");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("Non-UTF-8 path {}", root.display()))?;

    let mut sources = BTreeMap::new();
    for entry in glob(pattern).context("Invalid source glob pattern")? {
        let path = entry.context("Failed to read glob entry")?;
        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read source file {}", path.display()))?;
        sources.insert(relative, contents);
    }

    Ok(sources)
}

/// Assembles the grading prompt: persona, requirements, optional reference
/// solution, and the student's sources, truncated to [`PROMPT_TRUNCATE`].
///
/// This is plain concatenation on purpose; the completion layer receives
/// finished text and does no templating of its own.
pub fn build_grading_prompt(
    requirements: &str,
    sources: &BTreeMap<String, String>,
    solution: Option<&BTreeMap<String, String>>,
) -> String {
    let mut prompt = format!("{SYSTEM_PROMPT}\n\nRequirements:\n{requirements}\n");

    if let Some(solution) = solution {
        prompt.push_str("\nReference Solution:\n");
        for (name, contents) in solution {
            prompt.push_str(&format!("\n--- {name} (Solution) ---\n```java\n{contents}\n```\n"));
        }
        prompt.push_str("\nCompare the student's work against this reference solution.\n");
    }

    prompt.push_str("\nStudent Code:\n");
    for (name, contents) in sources {
        prompt.push_str(&format!("\n--- {name} ---\n```java\n{contents}\n```\n"));
    }

    prompt.push_str("\nEvaluate this submission based on the requirements above.");

    if prompt.len() > PROMPT_TRUNCATE {
        let mut cut = PROMPT_TRUNCATE;
        while !prompt.is_char_boundary(cut) {
            cut -= 1;
        }
        prompt.truncate(cut);
    }

    prompt
}

/// Runs the whole grading pipeline for one assignment: for every student in
/// the roster, clone, build, request AI feedback through the fallback
/// session, and write a markdown report. Students that fail along the way are
/// recorded and skipped; the run only ends early when every AI provider has
/// been exhausted.
pub async fn run_grading(
    config: &Config,
    session: &FallbackSession,
    options: &GradingOptions,
) -> Result<()> {
    let students_file = config.get_or("students_file", "students.txt");
    let students = StudentLoader::new(&students_file).load()?;

    let base_directory = config.get_or("base_directory", "repos");
    let gitlab_host = config
        .get("gitlab_host")
        .context("`gitlab_host` must be set in the config file")?
        .to_owned();
    let output_dir = config.get_or("output_directory", "reports");

    let cloner = RepositoryCloner::new(&base_directory, gitlab_host)?;
    let use_wrapper = config.get("use_gradle_wrapper").map(|v| v != "false").unwrap_or(true);
    let runner = GradleRunner::new(use_wrapper);

    let requirements = match &options.requirements {
        Some(text) => text.clone(),
        None => match config.get_path("requirements_file") {
            Some(path) => std::fs::read_to_string(&path)
                .with_context(|| format!("Could not read requirements file {}", path.display()))?,
            None => DEFAULT_REQUIREMENTS.to_string(),
        },
    };

    let solution = options
        .solution_dir
        .as_deref()
        .map(collect_java_sources)
        .transpose()?;

    let mut rows: Vec<StudentRow> = Vec::new();
    let mut providers_spent = false;

    for student in &students {
        eprintln!("{} {}", "Grading".bright_blue(), student.username.bold());

        match grade_student(
            session,
            options,
            &cloner,
            &runner,
            &requirements,
            solution.as_ref(),
            Path::new(&output_dir),
            student,
        )
        .await
        {
            Ok(row) => rows.push(row),
            Err(StudentFailure::Skipped(row, reason)) => {
                warn!(student = %student.username, "Skipping student: {reason}");
                rows.push(row);
            }
            Err(StudentFailure::ProvidersExhausted(row, err)) => {
                error!("{err}");
                rows.push(row);
                providers_spent = true;
                break;
            }
        }
    }

    eprintln!(
        "{}",
        Table::new(&rows)
            .with(Panel::header(format!("Grading Summary: {}", options.assignment)))
            .with(Style::modern())
    );

    if providers_spent {
        let remaining = students.len() - rows.len();
        anyhow::bail!(
            "Run ended early with {remaining} student(s) ungraded: every AI provider is exhausted"
        );
    }

    Ok(())
}

/// How grading one student can fall short.
enum StudentFailure {
    /// This student could not be graded; the run continues.
    Skipped(StudentRow, String),
    /// Every AI provider failed; the run cannot continue.
    ProvidersExhausted(StudentRow, FallbackError),
}

/// Grades one student end to end and returns their summary row.
#[allow(clippy::too_many_arguments)]
async fn grade_student(
    session: &FallbackSession,
    options: &GradingOptions,
    cloner: &RepositoryCloner,
    runner: &GradleRunner,
    requirements: &str,
    solution: Option<&BTreeMap<String, String>>,
    output_dir: &Path,
    student: &Student,
) -> Result<StudentRow, StudentFailure> {
    let mut row = StudentRow {
        student:  student.username.clone(),
        repo:     "-".to_string(),
        build:    "-".to_string(),
        tests:    "-".to_string(),
        feedback: "-".to_string(),
    };

    let outcome = match cloner
        .clone_student_repo(student, &options.assignment, options.force)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            row.repo = "clone failed".to_string();
            return Err(StudentFailure::Skipped(row, format!("{e:#}")));
        }
    };
    row.repo = if outcome.reused { "reused" } else { "cloned" }.to_string();

    let build = match runner.run_build(&outcome.repo_path, "build").await {
        Ok(build) => build,
        Err(e) => {
            row.build = "not run".to_string();
            return Err(StudentFailure::Skipped(row, format!("{e:#}")));
        }
    };
    row.build = if build.success { "✅ passed" } else { "❌ failed" }.to_string();

    // A build that fails because tests failed still leaves JUnit reports
    // behind, so results are parsed regardless of the build outcome.
    let tests = junit::parse_results(&outcome.repo_path);
    row.tests = describe_tests(&tests);

    let sources = match collect_java_sources(&outcome.repo_path) {
        Ok(sources) if !sources.is_empty() => sources,
        Ok(_) => {
            return Err(StudentFailure::Skipped(row, "no Java sources found".to_string()));
        }
        Err(e) => {
            return Err(StudentFailure::Skipped(row, format!("{e:#}")));
        }
    };

    let prompt = build_grading_prompt(requirements, &sources, solution);

    let feedback = match session.complete(&prompt).await {
        Ok(text) => text,
        Err(err @ FallbackError::AllProvidersFailed { .. }) => {
            row.feedback = "providers exhausted".to_string();
            let report =
                render_report(student, &options.assignment, Some(&build), Some(&tests), None);
            if let Err(e) = write_report(output_dir, student, &options.assignment, &report) {
                warn!(student = %student.username, "Could not write partial report: {e:#}");
            }
            return Err(StudentFailure::ProvidersExhausted(row, err));
        }
    };

    let report =
        render_report(student, &options.assignment, Some(&build), Some(&tests), Some(&feedback));
    match write_report(output_dir, student, &options.assignment, &report) {
        Ok(path) => {
            row.feedback = path.to_string_lossy().into_owned();
            eprintln!("  {} {}", "✓".green(), row.feedback);
        }
        Err(e) => {
            row.feedback = "report write failed".to_string();
            return Err(StudentFailure::Skipped(row, format!("{e:#}")));
        }
    }

    Ok(row)
}

/// Formats a summary-table cell for one student's test results.
fn describe_tests(tests: &ExecutionSummary) -> String {
    if tests.has_results() {
        format!("{}/{}", tests.passed, tests.total)
    } else {
        "none".to_string()
    }
}

/// Formats the configured fallback order for display, e.g. in startup logs.
pub fn describe_session(session: &FallbackSession) -> String {
    session.providers().iter().map(|kind| kind.to_string()).join(", ")
}
