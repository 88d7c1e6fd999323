//! CLI definitions for stagehand
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{Parser, Subcommand};

use crate::config::Environment;

#[derive(Parser)]
#[command(
    name = "stagehand",
    version,
    about = "Environment manifest generator and release promoter",
    long_about = "Composes layered application configuration into Kubernetes manifests\nand promotes releases between environments through reviewable file edits."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate Kubernetes manifests from environment files
    Generate {
        /// Environment to generate (omit with --all)
        #[arg(long, value_enum)]
        env: Option<Environment>,

        /// Generate every environment
        #[arg(long, conflicts_with = "env")]
        all: bool,

        /// Restrict generation to one application
        #[arg(long)]
        app: Option<String>,

        /// Directory holding the environment files
        #[arg(long, env = "STAGEHAND_ENVS_DIR", default_value = "envs")]
        envs_dir: String,

        /// Output directory for generated manifests
        #[arg(long = "output-dir", short = 'o', default_value = "manifests")]
        output: String,
    },

    /// Promote application images from one environment to the next
    Promote {
        /// Source environment (read-only)
        #[arg(long, value_enum, required = true)]
        from: Environment,

        /// Target environment (rewritten in place)
        #[arg(long, value_enum, required = true)]
        to: Environment,

        /// Directory holding the environment files
        #[arg(long, env = "STAGEHAND_ENVS_DIR", default_value = "envs")]
        envs_dir: String,

        /// Promote only these applications (comma-separated)
        #[arg(long = "only-apps", value_delimiter = ',')]
        only_apps: Vec<String>,

        /// Explicit image for one application, as 'app=image'
        /// (can be specified multiple times)
        #[arg(long = "image-override")]
        image_overrides: Vec<String>,

        /// Plan and report without touching any file
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate environment files against the constraint schema
    Validate {
        /// Environment to validate (omit with --all)
        #[arg(long, value_enum)]
        env: Option<Environment>,

        /// Validate every environment
        #[arg(long, conflicts_with = "env")]
        all: bool,

        /// Directory holding the environment files
        #[arg(long, env = "STAGEHAND_ENVS_DIR", default_value = "envs")]
        envs_dir: String,
    },

    /// Show image drift between two environments
    Diff {
        /// Source environment
        #[arg(long, value_enum, required = true)]
        from: Environment,

        /// Target environment
        #[arg(long, value_enum, required = true)]
        to: Environment,

        /// Restrict the diff to one application
        #[arg(long)]
        app: Option<String>,

        /// Directory holding the environment files
        #[arg(long, env = "STAGEHAND_ENVS_DIR", default_value = "envs")]
        envs_dir: String,
    },
}
