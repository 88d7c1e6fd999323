//! Application configuration contract and constraint schema.
//!
//! `AppConfig` is the full contract one application must satisfy per
//! environment. The structs are deliberately strict (`deny_unknown_fields`)
//! so a typo fails parsing instead of silently vanishing, and every
//! remaining constraint is enforced by an explicit [`AppConfig::validate`]
//! resolution step that reports the offending field path. Nothing here is
//! silently defaulted to an empty value: a missing image or namespace fails
//! composition for that application before any resource is serialized.
//!
//! Embedded Kubernetes fragments (env vars, ports, volumes, strategy,
//! affinity) reuse the k8s-openapi types directly, so environment files
//! spell those sections exactly like the manifests they end up in.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::DeploymentStrategy;
use k8s_openapi::api::core::v1::{
    Affinity, ContainerPort, EnvFromSource, EnvVar, ServicePort, Volume,
};
use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::error::SchemaError;

/// Full configuration contract for one application in one environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Target namespace. Required, non-empty.
    #[serde(default)]
    pub namespace: String,

    /// Extra labels merged over the computed defaults (caller wins per key).
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Toggles the 8443/HTTPS port set across Deployment, Service and probes.
    #[serde(default)]
    pub enable_https: bool,

    /// Toggles the debug port, the DEBUG env var and the debug Service.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub deployment: DeploymentConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    /// Presence of the section (not a truthy flag) triggers ConfigMap creation.
    #[serde(default)]
    pub config_map: Option<ConfigMapConfig>,

    /// Presence triggers PVC creation.
    #[serde(default)]
    pub storage: Option<StorageConfig>,

    /// Presence triggers Secret creation.
    #[serde(default)]
    pub secret: Option<SecretConfig>,

    /// Open extension point: arbitrary app-specific resources, keyed by the
    /// name they get in the resource set. Validated lazily at composition:
    /// each value must be a mapping carrying `apiVersion` and `kind`.
    #[serde(default)]
    pub extra_resources: BTreeMap<String, serde_yaml::Value>,
}

/// Deployment section of [`AppConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentConfig {
    /// Container image reference. Required, non-empty.
    #[serde(default)]
    pub image: String,

    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Either a named catalog tier or explicit requests/limits.
    #[serde(default)]
    pub resources: Option<ResourcesConfig>,

    /// Per-field overlay on the default HTTP(S) liveness probe.
    #[serde(default)]
    pub liveness_probe: Option<ProbeConfig>,

    /// Per-field overlay on the default HTTP(S) readiness probe.
    #[serde(default)]
    pub readiness_probe: Option<ProbeConfig>,

    /// Environment tier of the env var merge.
    #[serde(default)]
    pub env: Vec<EnvVar>,

    /// Environment tier of the envFrom concatenation.
    #[serde(default)]
    pub env_from: Vec<EnvFromSource>,

    /// Highest tier of the env var merge, for fine-grained overrides.
    #[serde(default)]
    pub additional_env: Vec<EnvVar>,

    /// Appended after the computed base/debug ports, never replacing them.
    #[serde(default)]
    pub additional_ports: Vec<ContainerPort>,

    #[serde(default)]
    pub volumes: VolumesConfig,

    /// Defaults to a conservative rolling update when absent.
    #[serde(default)]
    pub strategy: Option<DeploymentStrategy>,

    #[serde(default)]
    pub node_selector: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub affinity: Option<Affinity>,
}

fn default_replicas() -> i32 {
    1
}

/// Resource requests/limits: a named catalog tier or explicit values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourcesConfig {
    Tier {
        tier: String,
    },
    Explicit {
        #[serde(default)]
        requests: Option<BTreeMap<String, String>>,
        #[serde(default)]
        limits: Option<BTreeMap<String, String>>,
    },
}

/// Probe overlay: any field left unset falls back to the catalog default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub port: Option<i32>,

    #[serde(default)]
    pub initial_delay_seconds: Option<i32>,

    #[serde(default)]
    pub period_seconds: Option<i32>,

    #[serde(default)]
    pub timeout_seconds: Option<i32>,

    #[serde(default)]
    pub failure_threshold: Option<i32>,
}

/// Volume configuration: five independent, individually-toggleable
/// sub-builders, each defaulting to absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumesConfig {
    /// PVC-backed data volume mounted at `/var/lib/<app>` by default.
    #[serde(default)]
    pub data: Option<DataVolumeConfig>,

    /// External ConfigMap mounted at `/etc/<app>` by default.
    #[serde(default)]
    pub config: Option<ConfigVolumeConfig>,

    /// EmptyDir scratch space mounted at `/var/cache/<app>` by default.
    #[serde(default)]
    pub cache: Option<CacheVolumeConfig>,

    /// Projection of named Secrets mounted read-only under
    /// `/var/run/secrets/<app>` by default.
    #[serde(default)]
    pub projected_secrets: Option<ProjectedSecretsConfig>,

    /// User-supplied volumes appended verbatim, with an optional mount.
    #[serde(default)]
    pub additional: Vec<AdditionalVolume>,
}

impl VolumesConfig {
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
            && self.config.is_none()
            && self.cache.is_none()
            && self.projected_secrets.is_none()
            && self.additional.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataVolumeConfig {
    /// Claim name; defaults to `<app>-data` (the PVC the storage section creates).
    #[serde(default)]
    pub claim: Option<String>,

    #[serde(default)]
    pub mount_path: Option<String>,

    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigVolumeConfig {
    /// ConfigMap name; defaults to `<app>-config`.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub mount_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheVolumeConfig {
    /// Optional emptyDir size limit, e.g. "256Mi".
    #[serde(default)]
    pub size_limit: Option<String>,

    #[serde(default)]
    pub mount_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectedSecretsConfig {
    #[serde(default)]
    pub secrets: Vec<String>,

    #[serde(default)]
    pub mount_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdditionalVolume {
    pub volume: Volume,

    /// Mount is generated only when a path is given.
    #[serde(default)]
    pub mount_path: Option<String>,

    #[serde(default)]
    pub read_only: bool,
}

/// Service section of [`AppConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Appended after the computed base port, never replacing it.
    #[serde(default)]
    pub additional_ports: Vec<ServicePort>,

    #[serde(default)]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// ConfigMap section of [`AppConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigMapConfig {
    #[serde(default)]
    pub data: BTreeMap<String, String>,

    /// When present, the Deployment also gets a companion volume mount of
    /// the generated ConfigMap.
    #[serde(default)]
    pub mount: Option<ConfigMapMount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigMapMount {
    pub path: String,
}

/// Storage section of [`AppConfig`]; presence triggers a PVC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_storage_size")]
    pub size: String,

    #[serde(default)]
    pub class: Option<String>,

    #[serde(default = "default_access_modes")]
    pub access_modes: Vec<String>,
}

fn default_storage_size() -> String {
    defaults::DEFAULT_STORAGE_SIZE.to_string()
}

fn default_access_modes() -> Vec<String> {
    vec![defaults::DEFAULT_ACCESS_MODE.to_string()]
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            size: default_storage_size(),
            class: None,
            access_modes: default_access_modes(),
        }
    }
}

/// Secret section of [`AppConfig`]; presence triggers a Secret.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretConfig {
    #[serde(default)]
    pub data: Option<BTreeMap<String, String>>,

    /// Explicit opt-in for the fixed placeholder data set. Without it, a
    /// secret section with no data is a schema violation rather than a
    /// silently fabricated credential.
    #[serde(default)]
    pub allow_placeholder: bool,
}

impl AppConfig {
    /// Resolve and check every constraint for this application.
    ///
    /// `app_name` scopes the reported field paths (`apps.<name>.…`).
    pub fn validate(&self, app_name: &str) -> Result<(), SchemaError> {
        let field = |rest: &str| format!("apps.{}.{}", app_name, rest);

        if self.namespace.trim().is_empty() {
            return Err(SchemaError::missing(field("namespace")));
        }

        // The `app` label is the selector key; a caller override would make
        // the Deployment selector no longer match its pod template.
        if self.labels.contains_key("app") {
            return Err(SchemaError::conflicting(
                field("labels.app"),
                "the 'app' label is platform-owned and fixed to the application name",
            ));
        }

        self.validate_deployment(app_name)?;

        for (idx, port) in self.service.additional_ports.iter().enumerate() {
            validate_port_number(
                port.port,
                &field(&format!("service.additional_ports[{}].port", idx)),
            )?;
            let base = if self.enable_https {
                defaults::HTTPS_PORT
            } else {
                defaults::HTTP_PORT
            };
            if port.port == base {
                return Err(SchemaError::conflicting(
                    field(&format!("service.additional_ports[{}].port", idx)),
                    format!("port {} is already exposed by the computed base port", base),
                ));
            }
        }

        if let Some(storage) = &self.storage {
            if storage.size.trim().is_empty() {
                return Err(SchemaError::missing(field("storage.size")));
            }
            for mode in &storage.access_modes {
                if !defaults::ACCESS_MODES.contains(&mode.as_str()) {
                    return Err(SchemaError::invalid(
                        field("storage.access_modes"),
                        mode,
                        format!("expected one of {:?}", defaults::ACCESS_MODES),
                    ));
                }
            }
        }

        if let Some(secret) = &self.secret {
            let empty = secret.data.as_ref().map_or(true, |d| d.is_empty());
            if empty && !secret.allow_placeholder {
                return Err(SchemaError::invalid(
                    field("secret"),
                    "{}",
                    "secret enabled without data; supply data or set allow_placeholder: true",
                ));
            }
        }

        for (key, value) in &self.extra_resources {
            let mapping = value.as_mapping().ok_or_else(|| {
                SchemaError::invalid(
                    field(&format!("extra_resources.{}", key)),
                    "non-mapping",
                    "extra resources must be YAML mappings",
                )
            })?;
            for required in ["apiVersion", "kind"] {
                if !mapping.contains_key(serde_yaml::Value::from(required)) {
                    return Err(SchemaError::missing(field(&format!(
                        "extra_resources.{}.{}",
                        key, required
                    ))));
                }
            }
        }

        Ok(())
    }

    fn validate_deployment(&self, app_name: &str) -> Result<(), SchemaError> {
        let field = |rest: &str| format!("apps.{}.deployment.{}", app_name, rest);
        let d = &self.deployment;

        if d.image.trim().is_empty() {
            return Err(SchemaError::missing(field("image")));
        }

        if !(1..=10).contains(&d.replicas) {
            return Err(SchemaError::invalid(
                field("replicas"),
                d.replicas,
                "expected 1..=10",
            ));
        }

        if let Some(ResourcesConfig::Tier { tier }) = &d.resources {
            if defaults::resource_tier(tier).is_none() {
                return Err(SchemaError::invalid(
                    field("resources.tier"),
                    tier,
                    format!("expected one of {:?}", defaults::RESOURCE_TIERS),
                ));
            }
        }

        for (probe, name) in [
            (&d.liveness_probe, "liveness_probe"),
            (&d.readiness_probe, "readiness_probe"),
        ] {
            if let Some(probe) = probe {
                if let Some(path) = &probe.path {
                    if !path.starts_with('/') {
                        return Err(SchemaError::invalid(
                            field(&format!("{}.path", name)),
                            path,
                            "probe path must start with '/'",
                        ));
                    }
                }
                if let Some(port) = probe.port {
                    validate_port_number(port, &field(&format!("{}.port", name)))?;
                }
            }
        }

        for (list, list_name) in [(&d.env, "env"), (&d.additional_env, "additional_env")] {
            for (idx, env) in list.iter().enumerate() {
                if env.name.trim().is_empty() {
                    return Err(SchemaError::missing(field(&format!(
                        "{}[{}].name",
                        list_name, idx
                    ))));
                }
            }
        }

        let base_port = if self.enable_https {
            defaults::HTTPS_PORT
        } else {
            defaults::HTTP_PORT
        };
        for (idx, port) in d.additional_ports.iter().enumerate() {
            let path = field(&format!("additional_ports[{}].containerPort", idx));
            validate_port_number(port.container_port, &path)?;
            if port.container_port == base_port
                || (self.debug && port.container_port == defaults::DEBUG_PORT)
            {
                return Err(SchemaError::conflicting(
                    path,
                    format!(
                        "port {} is already claimed by a computed platform port",
                        port.container_port
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn validate_port_number(port: i32, field: &str) -> Result<(), SchemaError> {
    if !(1..=65535).contains(&port) {
        return Err(SchemaError::invalid(field, port, "expected 1..=65535"));
    }
    Ok(())
}
