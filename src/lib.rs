//! # gradeit
//!
//! An AI-assisted autograder: clones student repositories from GitLab over
//! SSH, builds them with Gradle, and asks an AI provider for feedback,
//! automatically falling back to the next configured provider when one runs
//! out of quota.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// The multi-provider completion client and its fallback orchestration
pub mod ai;
/// Properties-file configuration with `${var}` substitution
pub mod config;
/// Markdown report rendering and writing
pub mod feedback;
/// The per-student grading pipeline
pub mod grade;
/// Gradle build execution for student projects
pub mod gradle;
/// JUnit XML test report parsing
pub mod junit;
/// Subprocess spawning and output collection
pub mod process;
/// Cloning student repositories over SSH
pub mod repo;
/// Roster parsing from `students.txt`
pub mod students;
