//! # Environment Configuration System
//!
//! One YAML file per environment plus an optional shared app catalog:
//!
//! 1. **Environment file** (`{envs_dir}/{env}.yaml`)
//!    - All application instantiations for that environment ([`AppConfig`])
//!    - Optional deployment-automation descriptor ([`AutomationApp`])
//!
//! 2. **App catalog** (`{envs_dir}/apps.yaml`, optional)
//!    - Per-application defaults applied by the owning team: the *app* tier
//!      of the env var merge and the app half of the envFrom concatenation
//!
//! Environment files are immutable within a single generation run; only the
//! promotion engine rewrites them, through its backup/validate/rollback
//! sequence.

mod app;
pub mod defaults;

pub use app::{
    AppConfig, ConfigMapConfig, ConfigMapMount, DataVolumeConfig, DeploymentConfig, ProbeConfig,
    ResourcesConfig, SecretConfig, StorageConfig, VolumesConfig,
};

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use k8s_openapi::api::core::v1::{EnvFromSource, EnvVar};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The fixed set of promotion environments, in promotion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Stage,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Environment::Dev, Environment::Stage, Environment::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Stage => "stage",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One environment's full configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentFile {
    pub environment: Environment,

    #[serde(default)]
    pub apps: BTreeMap<String, AppConfig>,

    #[serde(default)]
    pub automation: Option<AutomationApp>,
}

impl EnvironmentFile {
    /// Validate every application against the constraint schema.
    ///
    /// Fails on the first violating application; the error names the exact
    /// field path.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (name, app) in &self.apps {
            app.validate(name)?;
        }
        Ok(())
    }
}

/// Descriptor for the GitOps controller's declarative Application resource.
///
/// Serialized as plain output by the generation driver; never applied or
/// reconciled by this tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationApp {
    pub repo_url: String,

    #[serde(default = "default_revision")]
    pub revision: String,

    pub path: String,

    #[serde(default = "default_destination_namespace")]
    pub destination_namespace: String,

    #[serde(default = "default_automated_sync")]
    pub automated_sync: bool,
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_destination_namespace() -> String {
    "argocd".to_string()
}

fn default_automated_sync() -> bool {
    true
}

/// Per-application defaults from the shared app catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    /// The *app* tier of the env var merge.
    #[serde(default)]
    pub env: Vec<EnvVar>,

    /// The app half of the envFrom concatenation.
    #[serde(default)]
    pub env_from: Vec<EnvFromSource>,
}

/// Shared app catalog (`apps.yaml`). Missing file means empty catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppCatalog {
    #[serde(default)]
    pub apps: BTreeMap<String, CatalogEntry>,
}

impl AppCatalog {
    pub fn entry(&self, app_name: &str) -> CatalogEntry {
        self.apps.get(app_name).cloned().unwrap_or_default()
    }
}

/// Path of one environment's configuration file.
pub fn environment_file_path(envs_dir: &Path, env: Environment) -> PathBuf {
    envs_dir.join(format!("{}.yaml", env))
}

/// Load (but do not constraint-validate) an environment file.
///
/// Checks that the file's own `environment:` field matches the requested
/// environment, so a copy-pasted file cannot masquerade as another stage.
pub fn load_environment(envs_dir: &Path, env: Environment) -> Result<EnvironmentFile, SchemaError> {
    let path = environment_file_path(envs_dir, env);
    let file = parse_environment_file(&path)?;

    if file.environment != env {
        return Err(SchemaError::invalid(
            "environment",
            file.environment,
            format!("file {} declares a different environment", path.display()),
        ));
    }

    Ok(file)
}

/// Parse an environment file from an explicit path.
pub fn parse_environment_file(path: &Path) -> Result<EnvironmentFile, SchemaError> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            SchemaError::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            SchemaError::Parse {
                path: path.display().to_string(),
                message: err.to_string(),
            }
        }
    })?;

    serde_yaml::from_str(&content).map_err(|err| SchemaError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Load the shared app catalog; a missing `apps.yaml` is an empty catalog.
pub fn load_catalog(envs_dir: &Path) -> Result<AppCatalog, SchemaError> {
    let path = envs_dir.join("apps.yaml");
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppCatalog::default())
        }
        Err(err) => {
            return Err(SchemaError::Parse {
                path: path.display().to_string(),
                message: err.to_string(),
            })
        }
    };

    serde_yaml::from_str(&content).map_err(|err| SchemaError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DEV_FILE: &str = r#"
environment: dev
apps:
  example-app:
    namespace: dev
    debug: true
    deployment:
      image: registry/example-app:v2
      replicas: 1
  postgres:
    namespace: dev
    deployment:
      image: registry/postgres:16
    storage:
      size: 5Gi
automation:
  repo_url: https://git.example.com/platform/deploy.git
  path: manifests/dev
"#;

    #[test]
    fn test_environment_round_trip() {
        for env in Environment::ALL {
            let yaml = serde_yaml::to_string(&env).unwrap();
            let back: Environment = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(back, env);
        }
        assert_eq!(Environment::Stage.to_string(), "stage");
    }

    #[test]
    fn test_parse_environment_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dev.yaml"), DEV_FILE).unwrap();

        let file = load_environment(dir.path(), Environment::Dev).unwrap();
        assert_eq!(file.environment, Environment::Dev);
        assert_eq!(file.apps.len(), 2);
        file.validate().unwrap();

        let automation = file.automation.unwrap();
        assert_eq!(automation.revision, "main");
        assert_eq!(automation.destination_namespace, "argocd");
        assert!(automation.automated_sync);
    }

    #[test]
    fn test_environment_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stage.yaml"), DEV_FILE).unwrap();

        let err = load_environment(dir.path(), Environment::Stage).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_file_is_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_environment(dir.path(), Environment::Prod).unwrap_err();
        assert!(matches!(err, SchemaError::FileNotFound { .. }));
    }

    #[test]
    fn test_missing_catalog_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = load_catalog(dir.path()).unwrap();
        assert!(catalog.apps.is_empty());
        assert!(catalog.entry("anything").env.is_empty());
    }

    #[test]
    fn test_catalog_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("apps.yaml"),
            r#"
apps:
  example-app:
    env:
      - name: APP_MODE
        value: serve
    env_from:
      - configMapRef:
          name: example-app-defaults
"#,
        )
        .unwrap();

        let catalog = load_catalog(dir.path()).unwrap();
        let entry = catalog.entry("example-app");
        assert_eq!(entry.env[0].name, "APP_MODE");
        assert_eq!(entry.env_from.len(), 1);
    }

    #[test]
    fn test_invalid_app_fails_validation_with_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("dev.yaml"),
            r#"
environment: dev
apps:
  broken:
    namespace: dev
    deployment:
      replicas: 1
"#,
        )
        .unwrap();

        let file = load_environment(dir.path(), Environment::Dev).unwrap();
        let err = file.validate().unwrap_err();
        assert!(err.to_string().contains("apps.broken.deployment.image"));
    }
}
