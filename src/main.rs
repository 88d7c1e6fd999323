use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod compose;
mod config;
mod error;
mod promote;
mod ui;

use cli::{Cli, Commands};
use config::Environment;

/// Resolve the environment selection shared by `generate` and `validate`.
fn select_environments(env: Option<Environment>, all: bool) -> Result<Vec<Environment>> {
    match (env, all) {
        (Some(env), false) => Ok(vec![env]),
        (None, true) => Ok(Environment::ALL.to_vec()),
        _ => anyhow::bail!("Specify either --env <environment> or --all"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false) // Disable ANSI escape codes for cleaner output
        .init();

    match cli.command {
        Commands::Generate {
            env,
            all,
            app,
            envs_dir,
            output,
        } => {
            let environments = select_environments(env, all)?;
            commands::generate::execute(
                PathBuf::from(envs_dir),
                PathBuf::from(output),
                environments,
                app,
            )?;
        }
        Commands::Promote {
            from,
            to,
            envs_dir,
            only_apps,
            image_overrides,
            dry_run,
        } => {
            commands::promote::execute(
                from,
                to,
                PathBuf::from(envs_dir),
                only_apps,
                image_overrides,
                dry_run,
            )?;
        }
        Commands::Validate { env, all, envs_dir } => {
            let environments = select_environments(env, all)?;
            commands::validate::execute(PathBuf::from(envs_dir), environments)?;
        }
        Commands::Diff {
            from,
            to,
            app,
            envs_dir,
        } => {
            commands::diff::execute(from, to, PathBuf::from(envs_dir), app)?;
        }
    }

    Ok(())
}
