//! `promote` command: plan display and reporting around the promotion
//! engine.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::config::Environment;
use crate::promote::{promote, PromotionRequest};
use crate::ui;

pub fn execute(
    source: Environment,
    target: Environment,
    envs_dir: PathBuf,
    only_apps: Vec<String>,
    image_overrides: Vec<String>,
    dry_run: bool,
) -> Result<()> {
    println!();
    println!(
        "{}",
        format!("  Promote: {} → {}", source, target).bright_blue().bold()
    );
    println!();

    let request = PromotionRequest {
        source,
        target,
        envs_dir,
        only_apps: if only_apps.is_empty() {
            None
        } else {
            Some(only_apps)
        },
        image_overrides: parse_overrides(&image_overrides)?,
        dry_run,
    };

    let report = promote(&request)
        .with_context(|| format!("Promotion {} → {} failed", source, target))?;

    if report.promoted.is_empty() {
        ui::print_success("Nothing to promote; target is already up to date");
    } else {
        let verb = if report.dry_run {
            "Would promote"
        } else {
            "Promoted"
        };
        ui::print_info(&format!("{} {} application(s):", verb, report.promoted.len()));
        for app in &report.promoted {
            ui::print_transition(&app.name, &app.from_image, &app.to_image);
        }
    }

    for name in &report.skipped_filtered {
        ui::print_skipped(name, "excluded by --only-apps");
    }
    for name in &report.skipped_missing {
        ui::print_skipped(name, "no counterpart in target environment");
    }
    for name in &report.skipped_up_to_date {
        ui::print_skipped(name, "already up to date");
    }

    for note in &report.review_notes {
        ui::print_warning(note);
    }

    println!();
    ui::print_info(&format!(
        "Summary: {} promoted, {} skipped",
        report.promoted.len(),
        report.skipped_total()
    ));

    if !report.dry_run && !report.promoted.is_empty() {
        // The file change is local; review and merge carry it forward.
        ui::print_info(&format!(
            "Next: commit the updated {}.yaml and open a merge request",
            target
        ));
    }

    Ok(())
}

/// Parse repeated `--image-override app=image` flags.
fn parse_overrides(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut overrides = BTreeMap::new();
    for entry in raw {
        let Some((app, image)) = entry.split_once('=') else {
            bail!("--image-override expects 'app=image', got '{}'", entry);
        };
        if app.is_empty() {
            bail!("--image-override has an empty application name: '{}'", entry);
        }
        overrides.insert(app.to_string(), image.to_string());
    }
    Ok(overrides)
}
