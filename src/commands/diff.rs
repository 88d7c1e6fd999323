//! `diff` command: image drift between two environments.
//!
//! Read-only counterpart to `promote`: shows what a promotion would move
//! without loading the full promotion machinery.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;

use crate::config::{self, Environment};
use crate::ui;

pub fn execute(
    source: Environment,
    target: Environment,
    envs_dir: PathBuf,
    app_filter: Option<String>,
) -> Result<()> {
    if source == target {
        bail!("Source and target environment are both '{}'", source);
    }

    let source_file = config::load_environment(&envs_dir, source)?;
    let target_file = config::load_environment(&envs_dir, target)?;

    println!();
    println!(
        "{}",
        format!("  Image drift: {} → {}", source, target).bright_blue().bold()
    );
    println!();

    let mut drifted = 0usize;
    for (name, source_app) in &source_file.apps {
        if let Some(filter) = &app_filter {
            if name != filter {
                continue;
            }
        }
        match target_file.apps.get(name) {
            Some(target_app) => {
                let source_image = &source_app.deployment.image;
                let target_image = &target_app.deployment.image;
                if source_image != target_image {
                    ui::print_transition(name, target_image, source_image);
                    drifted += 1;
                }
            }
            None => ui::print_skipped(name, &format!("only in {}", source)),
        }
    }
    for name in target_file.apps.keys() {
        if app_filter.as_deref().is_some_and(|f| f != name) {
            continue;
        }
        if !source_file.apps.contains_key(name) {
            ui::print_skipped(name, &format!("only in {}", target));
        }
    }

    if drifted == 0 {
        ui::print_success("No image drift");
    } else {
        ui::print_info(&format!("{} application(s) differ", drifted));
    }
    Ok(())
}
