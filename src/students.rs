#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// One student, parsed from a GitLab group name of the form
/// `<username>-<year>-<term>-<course>-<number>-<section>`,
/// e.g. `mawall-2026-winter-cis-271-01`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    /// Full group name as it appeared in the roster.
    pub group_name: String,
    /// Extracted username (may itself contain hyphens).
    pub username:   String,
    /// Semester, e.g. `2026-winter`.
    pub semester:   String,
    /// Course, e.g. `cis-271`.
    pub course:     String,
    /// Section, e.g. `01`.
    pub section:    String,
}

impl Student {
    /// Parses a student from a GitLab group name.
    ///
    /// The year is located as the first four-digit component, so usernames
    /// containing hyphens still split correctly.
    pub fn from_group_name(group_name: &str) -> Result<Self> {
        let group_name = group_name.trim();
        let parts: Vec<&str> = group_name.split('-').collect();

        if parts.len() < 5 {
            bail!(
                "Invalid group name `{group_name}`: expected \
                 <username>-<year>-<term>-<course>-<number>-<section>"
            );
        }

        let year_index = parts
            .iter()
            .position(|part| part.len() == 4 && part.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(1);
        let year_index = year_index.max(1);

        let username = parts[..year_index].join("-");
        let rest = &parts[year_index..];

        let (semester, course, section) = match rest {
            [year, term, course_name, course_number, section, ..] => (
                format!("{year}-{term}"),
                format!("{course_name}-{course_number}"),
                (*section).to_owned(),
            ),
            [year, term, course, section] => {
                (format!("{year}-{term}"), (*course).to_owned(), (*section).to_owned())
            }
            _ => bail!(
                "Invalid group name `{group_name}`: could not parse semester, course, and section"
            ),
        };

        Ok(Self {
            group_name: group_name.to_owned(),
            username,
            semester,
            course,
            section,
        })
    }

    /// Returns the SSH clone URL for this student's copy of an assignment.
    pub fn repo_url(&self, gitlab_host: &str, assignment: &str) -> String {
        format!("git@{gitlab_host}:{}/{assignment}.git", self.group_name)
    }
}

/// Loads the roster from a `students.txt` file.
pub struct StudentLoader {
    /// Path to the roster file.
    students_file: PathBuf,
}

impl StudentLoader {
    /// Creates a loader for the given roster file.
    pub fn new(students_file: impl AsRef<Path>) -> Self {
        Self {
            students_file: students_file.as_ref().to_path_buf(),
        }
    }

    /// Loads every student from the roster, skipping blanks and `#` comments
    /// and stripping trailing periods. All malformed lines are collected and
    /// reported together with their line numbers.
    pub fn load(&self) -> Result<Vec<Student>> {
        let contents = std::fs::read_to_string(&self.students_file).with_context(|| {
            format!("Could not read students file {}", self.students_file.display())
        })?;

        let mut students = Vec::new();
        let mut errors = Vec::new();

        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim().trim_end_matches('.');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match Student::from_group_name(line) {
                Ok(student) => students.push(student),
                Err(e) => errors.push(format!("Line {}: {e}", line_num + 1)),
            }
        }

        if !errors.is_empty() {
            bail!("Errors parsing students file:\n{}", errors.join("\n"));
        }

        Ok(students)
    }
}
