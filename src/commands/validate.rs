//! `validate` command: constraint-schema check plus a dry composition pass.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::compose;
use crate::config::{self, Environment};
use crate::ui;

pub fn execute(envs_dir: PathBuf, environments: Vec<Environment>) -> Result<()> {
    let catalog = config::load_catalog(&envs_dir)?;
    let mut failures = 0usize;

    for env in environments {
        match validate_environment(&envs_dir, env, &catalog) {
            Ok(apps) => {
                ui::print_success(&format!("{}: {} application(s) valid", env, apps));
            }
            Err(err) => {
                ui::print_error(&format!("{}: {:#}", env, err));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} environment(s) failed validation", failures);
    }
    Ok(())
}

fn validate_environment(
    envs_dir: &std::path::Path,
    env: Environment,
    catalog: &config::AppCatalog,
) -> Result<usize> {
    let file = config::load_environment(envs_dir, env)?;
    file.validate()?;

    // Composing proves the file is generatable, not merely well-formed.
    for (name, app) in &file.apps {
        compose::compose_app(name, &catalog.entry(name), app)?;
    }

    Ok(file.apps.len())
}
