//! Manifest generation driver.
//!
//! Three phases per environment: validate every application, compose the
//! full resource sets in memory, then write files. Nothing touches the
//! output directory until the whole environment composed cleanly, so a
//! mid-run failure never leaves a half-written manifest tree behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::compose::{self, ResourceSet};
use crate::config::{self, Environment};
use crate::error::GenerateError;
use crate::ui;

pub fn execute(
    envs_dir: PathBuf,
    output_dir: PathBuf,
    environments: Vec<Environment>,
    app_filter: Option<String>,
) -> Result<()> {
    for env in environments {
        generate_environment(&envs_dir, &output_dir, env, app_filter.as_deref())
            .with_context(|| format!("Failed to generate manifests for '{}'", env))?;
    }
    Ok(())
}

fn generate_environment(
    envs_dir: &Path,
    output_dir: &Path,
    env: Environment,
    app_filter: Option<&str>,
) -> Result<()> {
    ui::print_info(&format!("Generating manifests for environment '{}'", env));

    let file = config::load_environment(envs_dir, env)?;
    let catalog = config::load_catalog(envs_dir)?;

    // Phase 1: validate everything up front, so the failure points at a
    // field path instead of a half-composed template.
    file.validate()?;
    debug!(environment = %env, apps = file.apps.len(), "environment file validated");

    // Phase 2: compose in memory.
    let mut composed: Vec<(String, ResourceSet)> = Vec::new();
    for (name, app) in &file.apps {
        if let Some(filter) = app_filter {
            if name != filter {
                continue;
            }
        }
        let resources = compose::compose_app(name, &catalog.entry(name), app)?;
        info!(
            app = %name,
            resources = ?resources.resources_list(),
            "composed application"
        );
        composed.push((name.clone(), resources));
    }

    if composed.is_empty() && !file.apps.is_empty() {
        return Err(GenerateError::EmptyOutput {
            environment: env.to_string(),
        }
        .into());
    }

    // Phase 3: write.
    let env_dir = output_dir.join(env.as_str());
    let mut written = 0usize;
    for (name, resources) in &composed {
        let app_dir = env_dir.join(name);
        create_dir(&app_dir)?;
        for (key, resource) in resources.iter() {
            let path = app_dir.join(format!("{}.yaml", key));
            let yaml = resource.to_yaml().map_err(|err| GenerateError::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
            write_file(&path, &yaml)?;
            written += 1;
        }
    }

    if let Some(automation) = &file.automation {
        let application = compose::automation::build_automation_app(env, automation);
        let path = env_dir.join("automation.yaml");
        let yaml = serde_yaml::to_string(&application).map_err(|err| GenerateError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        create_dir(&env_dir)?;
        write_file(&path, &yaml)?;
        written += 1;
    }

    ui::print_success(&format!(
        "{}: {} applications, {} files written to {}",
        env,
        composed.len(),
        written,
        env_dir.display()
    ));
    Ok(())
}

fn create_dir(dir: &Path) -> Result<(), GenerateError> {
    std::fs::create_dir_all(dir).map_err(|err| GenerateError::Io {
        path: dir.display().to_string(),
        message: err.to_string(),
    })
}

fn write_file(path: &Path, content: &str) -> Result<(), GenerateError> {
    std::fs::write(path, content).map_err(|err| GenerateError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}
