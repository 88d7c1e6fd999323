//! Promotion state machine.
//!
//! Transfers the deployed image reference of one or more applications from a
//! source environment file to a target environment file, preserving every
//! target-specific field (namespace, replicas, resources, debug flag,
//! labels). The rewrite goes through the raw YAML tree (parse, mutate the
//! one field, re-serialize) and is verified by a structural diff of changed
//! paths, so an edit that touches anything beyond the intended image field
//! is rejected outright instead of being heuristically tolerated.
//!
//! States: Discover → Resolve → Extract → Apply → Validate → Confirm →
//! Commit. A snapshot of the target file is taken before the first mutation;
//! any failure at Apply/Validate/Confirm restores it byte-identically and
//! aborts the whole batch. There is no partial-apply state visible to the
//! caller.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info};

use crate::config::{self, Environment, EnvironmentFile};
use crate::error::{PromotionError, StagehandError};

/// One promotion invocation.
#[derive(Debug)]
pub struct PromotionRequest {
    pub source: Environment,
    pub target: Environment,
    pub envs_dir: PathBuf,
    /// Restrict the batch to these applications; everything else is
    /// reported as filtered, not failed.
    pub only_apps: Option<Vec<String>>,
    /// Per-application explicit image, bypassing the source's value.
    pub image_overrides: BTreeMap<String, String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct PromotedApp {
    pub name: String,
    pub from_image: String,
    pub to_image: String,
}

/// Outcome counts of one promotion batch.
#[derive(Debug, Default)]
pub struct PromotionReport {
    pub promoted: Vec<PromotedApp>,
    pub skipped_filtered: Vec<String>,
    pub skipped_missing: Vec<String>,
    pub skipped_up_to_date: Vec<String>,
    /// Source-side additive entries that are NOT auto-promoted; surfaced
    /// for human review.
    pub review_notes: Vec<String>,
    pub dry_run: bool,
}

impl PromotionReport {
    pub fn skipped_total(&self) -> usize {
        self.skipped_filtered.len() + self.skipped_missing.len() + self.skipped_up_to_date.len()
    }
}

/// Run the full promotion batch.
pub fn promote(request: &PromotionRequest) -> Result<PromotionReport, StagehandError> {
    if request.source == request.target {
        return Err(PromotionError::SameEnvironment {
            environment: request.source.to_string(),
        }
        .into());
    }

    // Discover: enumerate source applications; both files must satisfy the
    // constraint schema before any plan is made.
    let source_file = config::load_environment(&request.envs_dir, request.source)?;
    source_file.validate()?;
    let target_file = config::load_environment(&request.envs_dir, request.target)?;
    target_file.validate()?;

    for name in request.image_overrides.keys() {
        if !source_file.apps.contains_key(name) {
            return Err(PromotionError::UnknownOverride { app: name.clone() }.into());
        }
    }

    let mut report = PromotionReport {
        dry_run: request.dry_run,
        ..Default::default()
    };
    let mut plan: Vec<PromotedApp> = Vec::new();

    for (name, source_app) in &source_file.apps {
        // Resolve: optional caller subset, then the target counterpart.
        if let Some(only) = &request.only_apps {
            if !only.iter().any(|app| app == name) {
                report.skipped_filtered.push(name.clone());
                continue;
            }
        }
        let Some(target_app) = target_file.apps.get(name) else {
            report.skipped_missing.push(name.clone());
            continue;
        };

        // Extract: the source image, unless explicitly overridden.
        let intended = request
            .image_overrides
            .get(name)
            .cloned()
            .unwrap_or_else(|| source_app.deployment.image.clone());

        collect_review_notes(name, source_app, target_app, &mut report.review_notes);

        if target_app.deployment.image == intended {
            report.skipped_up_to_date.push(name.clone());
            continue;
        }

        plan.push(PromotedApp {
            name: name.clone(),
            from_image: target_app.deployment.image.clone(),
            to_image: intended,
        });
    }

    if request.dry_run || plan.is_empty() {
        // Idempotence: an already-matching target is a success with zero
        // changes, detected before any file mutation.
        report.promoted = if request.dry_run { plan } else { Vec::new() };
        return Ok(report);
    }

    let target_path = config::environment_file_path(&request.envs_dir, request.target);
    let snapshot = std::fs::read(&target_path).map_err(|err| PromotionError::Io {
        path: target_path.display().to_string(),
        message: err.to_string(),
    })?;

    match apply_batch(&target_path, request.target, &plan) {
        Ok(()) => {
            info!(
                target_env = %request.target,
                promoted = plan.len(),
                "promotion batch committed"
            );
            report.promoted = plan;
            Ok(report)
        }
        Err(err) => {
            // Fail closed: the target returns to its pre-apply bytes.
            if let Err(restore_err) = std::fs::write(&target_path, &snapshot) {
                return Err(PromotionError::Io {
                    path: target_path.display().to_string(),
                    message: format!(
                        "rollback after '{}' also failed: {}",
                        err, restore_err
                    ),
                }
                .into());
            }
            Err(err.into())
        }
    }
}

/// Apply/Validate/Confirm for every planned application, in order.
fn apply_batch(
    target_path: &Path,
    target_env: Environment,
    plan: &[PromotedApp],
) -> Result<(), PromotionError> {
    for entry in plan {
        apply_one(target_path, entry)?;

        // Validate: the rewritten file must still satisfy the schema.
        let reparsed = parse_for_validation(target_path, target_env)?;

        // Confirm: the updated field reads back as the intended value.
        let found = reparsed
            .apps
            .get(&entry.name)
            .map(|app| app.deployment.image.clone())
            .unwrap_or_default();
        if found != entry.to_image {
            return Err(PromotionError::ConfirmMismatch {
                app: entry.name.clone(),
                expected: entry.to_image.clone(),
                found,
            });
        }
        debug!(app = %entry.name, image = %entry.to_image, "promotion confirmed");
    }
    Ok(())
}

/// Mutate exactly one application's image field in the target file.
fn apply_one(target_path: &Path, entry: &PromotedApp) -> Result<(), PromotionError> {
    let io_err = |err: &dyn std::fmt::Display| PromotionError::Io {
        path: target_path.display().to_string(),
        message: err.to_string(),
    };

    let pre_text = std::fs::read_to_string(target_path).map_err(|e| io_err(&e))?;
    let pre: Value = serde_yaml::from_str(&pre_text).map_err(|e| io_err(&e))?;

    let mut post = pre.clone();
    let image = post
        .get_mut("apps")
        .and_then(|apps| apps.get_mut(entry.name.as_str()))
        .and_then(|app| app.get_mut("deployment"))
        .and_then(|deployment| deployment.get_mut("image"))
        .ok_or_else(|| PromotionError::AmbiguousRewrite {
            app: entry.name.clone(),
            changed: vec![],
        })?;
    *image = Value::from(entry.to_image.clone());

    // Structural diff: anything but the single intended path is a
    // correctness violation.
    let changed = diff_paths(&pre, &post);
    let expected = format!("apps.{}.deployment.image", entry.name);
    if changed != vec![expected] {
        return Err(PromotionError::AmbiguousRewrite {
            app: entry.name.clone(),
            changed,
        });
    }

    let serialized = serde_yaml::to_string(&post).map_err(|e| io_err(&e))?;

    // Atomic replace: write a sibling temp file, then rename over the
    // target.
    let dir = target_path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_err(&e))?;
    tmp.write_all(serialized.as_bytes()).map_err(|e| io_err(&e))?;
    tmp.persist(target_path).map_err(|e| io_err(&e))?;

    Ok(())
}

fn parse_for_validation(
    target_path: &Path,
    target_env: Environment,
) -> Result<EnvironmentFile, PromotionError> {
    let file = config::parse_environment_file(target_path)
        .map_err(|err| PromotionError::ValidationFailed {
            message: err.to_string(),
        })?;
    if file.environment != target_env {
        return Err(PromotionError::ValidationFailed {
            message: format!(
                "rewritten file declares environment '{}' instead of '{}'",
                file.environment, target_env
            ),
        });
    }
    file.validate().map_err(|err| PromotionError::ValidationFailed {
        message: err.to_string(),
    })?;
    Ok(file)
}

/// Additive entries the source carries beyond the target. These stay put,
/// since promotion only moves the image, but reviewers should know about
/// them.
fn collect_review_notes(
    name: &str,
    source: &crate::config::AppConfig,
    target: &crate::config::AppConfig,
    notes: &mut Vec<String>,
) {
    let target_env_names: Vec<&str> = target
        .deployment
        .additional_env
        .iter()
        .map(|v| v.name.as_str())
        .collect();
    for var in &source.deployment.additional_env {
        if !target_env_names.contains(&var.name.as_str()) {
            notes.push(format!(
                "{}: source sets additional env '{}' which the target does not (not auto-promoted)",
                name, var.name
            ));
        }
    }

    let source_keys = source.config_map.as_ref().map(|c| &c.data);
    let target_keys = target.config_map.as_ref().map(|c| &c.data);
    if let Some(source_data) = source_keys {
        for key in source_data.keys() {
            let present = target_keys.map_or(false, |data| data.contains_key(key));
            if !present {
                notes.push(format!(
                    "{}: source config_map key '{}' is absent in the target (not auto-promoted)",
                    name, key
                ));
            }
        }
    }
}

/// Paths (dot-joined keys, `[i]` for sequence elements) whose values differ
/// between two YAML trees.
pub fn diff_paths(a: &Value, b: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_diff(a, b, "", &mut out);
    out
}

fn collect_diff(a: &Value, b: &Value, prefix: &str, out: &mut Vec<String>) {
    match (a, b) {
        (Value::Mapping(ma), Value::Mapping(mb)) => {
            let mut keys: Vec<&Value> = ma.keys().collect();
            for key in mb.keys() {
                if !ma.contains_key(key) {
                    keys.push(key);
                }
            }
            for key in keys {
                let label = key
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{:?}", key));
                let path = if prefix.is_empty() {
                    label
                } else {
                    format!("{}.{}", prefix, label)
                };
                match (ma.get(key), mb.get(key)) {
                    (Some(x), Some(y)) => collect_diff(x, y, &path, out),
                    _ => out.push(path),
                }
            }
        }
        (Value::Sequence(sa), Value::Sequence(sb)) => {
            if sa.len() != sb.len() {
                out.push(prefix.to_string());
            } else {
                for (idx, (x, y)) in sa.iter().zip(sb.iter()).enumerate() {
                    collect_diff(x, y, &format!("{}[{}]", prefix, idx), out);
                }
            }
        }
        _ => {
            if a != b {
                out.push(prefix.to_string());
            }
        }
    }
}
