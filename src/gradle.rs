#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::process::run_collect;

/// Deadline applied to a single Gradle invocation.
const BUILD_TIMEOUT: Duration = Duration::from_secs(600);

/// Result of one Gradle build. A failing build is a normal outcome, not an
/// error; errors are reserved for being unable to run Gradle at all.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Whether the build exited zero.
    pub success: bool,
    /// Combined stdout and stderr of the build.
    pub output:  String,
}

/// Runs Gradle builds for student projects, preferring the project's own
/// wrapper script over a system `gradle`.
pub struct GradleRunner {
    /// Whether to look for `gradlew` before falling back to system `gradle`.
    use_wrapper: bool,
    /// Deadline for one build.
    timeout:     Duration,
}

impl Default for GradleRunner {
    fn default() -> Self {
        Self {
            use_wrapper: true,
            timeout:     BUILD_TIMEOUT,
        }
    }
}

impl GradleRunner {
    /// Creates a runner with an explicit wrapper preference.
    pub fn new(use_wrapper: bool) -> Self {
        Self {
            use_wrapper,
            ..Self::default()
        }
    }

    /// Runs the given Gradle task (typically `build`) in the project
    /// directory and captures its output.
    pub async fn run_build(&self, project_path: &Path, task: &str) -> Result<BuildOutcome> {
        if !project_path.exists() {
            bail!("Project path does not exist: {}", project_path.display());
        }

        let program = self.gradle_command(project_path);
        debug!(program = %program.display(), task, "Running Gradle");

        let collected = run_collect(&program, &[task], Some(project_path), Some(self.timeout))
            .await
            .with_context(|| {
                format!("Could not run `{} {task}` in {}", program.display(), project_path.display())
            })?;

        Ok(BuildOutcome {
            success: collected.status.success(),
            output:  collected.combined_output(),
        })
    }

    /// Picks the Gradle executable: the project's wrapper when present (made
    /// executable if needed), otherwise system `gradle`.
    fn gradle_command(&self, project_path: &Path) -> PathBuf {
        if self.use_wrapper {
            let wrapper = if cfg!(windows) {
                project_path.join("gradlew.bat")
            } else {
                project_path.join("gradlew")
            };

            if wrapper.exists() {
                ensure_executable(&wrapper);
                return wrapper;
            }
        }

        PathBuf::from("gradle")
    }
}

/// On Unix, marks the wrapper script executable when the clone lost its mode
/// bits. Failure is non-fatal; the invocation will surface any real problem.
fn ensure_executable(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let Ok(metadata) = std::fs::metadata(path) else {
            return;
        };
        let mut permissions = metadata.permissions();
        if permissions.mode() & 0o111 == 0 {
            permissions.set_mode(0o755);
            if let Err(e) = std::fs::set_permissions(path, permissions) {
                warn!("Could not mark {} executable: {e}", path.display());
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}
