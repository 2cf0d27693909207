#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::{process::run_collect, students::Student};

/// Deadline applied to a single `git clone`.
const CLONE_TIMEOUT: Duration = Duration::from_secs(300);

/// Result of preparing one student's checkout.
#[derive(Debug)]
pub struct CloneOutcome {
    /// Where the repository now lives on disk.
    pub repo_path: PathBuf,
    /// True when an existing checkout was kept instead of cloning.
    pub reused:    bool,
}

/// Clones student repositories from GitLab over SSH into
/// `<base>/<username>/<assignment>`.
pub struct RepositoryCloner {
    /// Directory all checkouts are placed under.
    base_directory: PathBuf,
    /// GitLab server hostname, e.g. `gitlab.example.edu`.
    gitlab_host:    String,
}

impl RepositoryCloner {
    /// Creates a cloner, ensuring the base directory exists.
    pub fn new(base_directory: impl AsRef<Path>, gitlab_host: impl Into<String>) -> Result<Self> {
        let base_directory = base_directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_directory).with_context(|| {
            format!("Could not create base directory {}", base_directory.display())
        })?;

        Ok(Self {
            base_directory,
            gitlab_host: gitlab_host.into(),
        })
    }

    /// Clones one student's assignment repository.
    ///
    /// An existing checkout is reused unless `force` is set, in which case it
    /// is removed and cloned fresh. A failed clone cleans up any partial
    /// checkout before returning the error.
    pub async fn clone_student_repo(
        &self,
        student: &Student,
        assignment: &str,
        force: bool,
    ) -> Result<CloneOutcome> {
        let student_dir = self.base_directory.join(&student.username);
        std::fs::create_dir_all(&student_dir).with_context(|| {
            format!("Could not create student directory {}", student_dir.display())
        })?;

        let repo_path = student_dir.join(assignment);
        if repo_path.exists() {
            if force {
                std::fs::remove_dir_all(&repo_path).with_context(|| {
                    format!("Could not remove existing checkout {}", repo_path.display())
                })?;
            } else {
                debug!(student = %student.username, "Reusing existing checkout");
                return Ok(CloneOutcome {
                    repo_path,
                    reused: true,
                });
            }
        }

        let url = student.repo_url(&self.gitlab_host, assignment);
        info!(student = %student.username, %url, "Cloning repository");

        let target = repo_path.to_string_lossy().into_owned();
        let result = run_collect(
            "git",
            &["clone", url.as_str(), target.as_str()],
            None,
            Some(CLONE_TIMEOUT),
        )
        .await;

        let cleanup = |path: &Path| {
            if path.exists() {
                let _ = std::fs::remove_dir_all(path);
            }
        };

        match result {
            Ok(collected) if collected.status.success() => Ok(CloneOutcome {
                repo_path,
                reused: false,
            }),
            Ok(collected) => {
                cleanup(&repo_path);
                let stderr = String::from_utf8_lossy(&collected.stderr);
                bail!("git clone of {url} failed: {}", stderr.trim());
            }
            Err(e) => {
                cleanup(&repo_path);
                Err(e.context(format!("git clone of {url} failed")))
            }
        }
    }
}
