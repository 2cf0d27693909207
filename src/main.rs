#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # gradeit
//!
//! Command-line entry point for the AI-assisted autograder. `gradeit grade`
//! runs the full pipeline for an assignment; `gradeit providers` checks which
//! AI providers the current configuration makes available, without issuing
//! any network calls.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use gradeit::{
    ai::{FallbackSession, build_clients},
    config::Config,
    grade::{GradingOptions, describe_session, run_grading},
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Run the grading pipeline for an assignment.
    Grade {
        /// Assignment name (names the repository and the reports).
        assignment:   String,
        /// Path to the properties config file.
        config:       PathBuf,
        /// Re-clone repositories that already exist on disk.
        force:        bool,
        /// Path to a file with instructor requirements text.
        requirements: Option<PathBuf>,
        /// Path to a reference solution directory.
        solution:     Option<PathBuf>,
    },
    /// Show the configured AI providers and the fallback order.
    Providers {
        /// Path to the properties config file.
        config: PathBuf,
    },
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the config file path option, shared by both commands
    fn c() -> impl Parser<PathBuf> {
        long("config")
            .short('c')
            .help("Path to the config.properties file")
            .argument::<PathBuf>("PATH")
            .fallback(PathBuf::from("config.properties"))
    }

    let assignment = positional::<String>("ASSIGNMENT").help("Assignment name, e.g. fizzbuzz");
    let force = long("force")
        .short('f')
        .help("Delete and re-clone existing checkouts")
        .switch();
    let requirements = long("requirements")
        .short('r')
        .help("File containing instructor requirements for this assignment")
        .argument::<PathBuf>("PATH")
        .optional();
    let solution = long("solution")
        .short('s')
        .help("Directory containing a reference solution")
        .argument::<PathBuf>("PATH")
        .optional();

    let config = c();
    let grade = construct!(Cmd::Grade {
        config,
        force,
        requirements,
        solution,
        assignment,
    })
    .to_options()
    .command("grade")
    .help("Clone, build, and generate AI feedback for every student");

    let config = c();
    let providers = construct!(Cmd::Providers { config })
        .to_options()
        .command("providers")
        .help("Show which AI providers are configured and the fallback order");

    construct!([grade, providers])
        .to_options()
        .descr("AI-assisted autograder for student GitLab repositories")
        .run()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match options() {
        Cmd::Grade {
            assignment,
            config,
            force,
            requirements,
            solution,
        } => {
            let config = Config::load(&config)?;
            let clients = build_clients(&config)?;
            let session = Arc::new(FallbackSession::new(clients));
            eprintln!("{} {}", "Provider fallback order:".bold(), describe_session(&session));

            let requirements = requirements
                .map(|path| {
                    std::fs::read_to_string(&path).with_context(|| {
                        format!("Could not read requirements file {}", path.display())
                    })
                })
                .transpose()?;

            let options = GradingOptions {
                assignment,
                force,
                requirements,
                solution_dir: solution,
            };

            run_grading(&config, &session, &options).await?;
        }
        Cmd::Providers { config } => {
            let config = Config::load(&config)?;
            let clients = build_clients(&config)?;
            for client in &clients {
                eprintln!("{} {} ({})", "✓".green(), client.kind(), client.model());
            }
            let session = FallbackSession::new(clients);
            eprintln!("{} {}", "Fallback order:".bold(), describe_session(&session));
        }
    }

    Ok(())
}
