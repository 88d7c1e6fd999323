//! Default catalog: named, reusable platform defaults.
//!
//! Templates reference these instead of duplicating literals, so a port or
//! probe change propagates to every application in one place. Environment
//! configuration may override most of them per field, never replace the
//! catalog itself.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{DeploymentStrategy, RollingUpdateDeployment};
use k8s_openapi::api::core::v1::{PodSecurityContext, ResourceRequirements, SecurityContext};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Plain HTTP serving port, used when `enable_https` is false.
pub const HTTP_PORT: i32 = 8080;

/// TLS serving port, used when `enable_https` is true.
pub const HTTPS_PORT: i32 = 8443;

/// Remote debug port, exposed only when `debug` is true.
pub const DEBUG_PORT: i32 = 5005;

/// Environment variable injected at the base tier when `debug` is true.
pub const DEBUG_ENV_NAME: &str = "DEBUG";
pub const DEBUG_ENV_VALUE: &str = "true";

/// Health endpoint paths probed by the default liveness/readiness probes.
pub const LIVENESS_PATH: &str = "/q/health/live";
pub const READINESS_PATH: &str = "/q/health/ready";

/// Default probe timings, shared by liveness and readiness.
pub const PROBE_INITIAL_DELAY_SECONDS: i32 = 5;
pub const PROBE_PERIOD_SECONDS: i32 = 10;
pub const PROBE_TIMEOUT_SECONDS: i32 = 3;
pub const PROBE_FAILURE_THRESHOLD: i32 = 3;

/// Volume mount locations keyed by sub-builder.
pub fn data_mount_path(app_name: &str) -> String {
    format!("/var/lib/{}", app_name)
}

pub fn cache_mount_path(app_name: &str) -> String {
    format!("/var/cache/{}", app_name)
}

pub fn config_mount_path(app_name: &str) -> String {
    format!("/etc/{}", app_name)
}

pub fn projected_secrets_mount_path(app_name: &str) -> String {
    format!("/var/run/secrets/{}", app_name)
}

/// Names of the resource tiers the catalog knows about.
pub const RESOURCE_TIERS: &[&str] = &["small", "medium", "large"];

/// Resolve a named resource tier to concrete requests/limits.
///
/// Returns `None` for unknown tier names; the schema layer rejects those
/// before any template runs.
pub fn resource_tier(name: &str) -> Option<ResourceRequirements> {
    let (req_cpu, req_mem, lim_cpu, lim_mem) = match name {
        "small" => ("100m", "128Mi", "250m", "256Mi"),
        "medium" => ("250m", "512Mi", "500m", "1Gi"),
        "large" => ("500m", "1Gi", "2", "2Gi"),
        _ => return None,
    };
    Some(ResourceRequirements {
        requests: Some(quantities(req_cpu, req_mem)),
        limits: Some(quantities(lim_cpu, lim_mem)),
        ..Default::default()
    })
}

fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
    let mut map = BTreeMap::new();
    map.insert("cpu".to_string(), Quantity(cpu.to_string()));
    map.insert("memory".to_string(), Quantity(memory.to_string()));
    map
}

/// Conservative rolling update used when the caller supplies no strategy.
pub fn default_strategy() -> DeploymentStrategy {
    DeploymentStrategy {
        type_: Some("RollingUpdate".to_string()),
        rolling_update: Some(RollingUpdateDeployment {
            max_surge: Some(IntOrString::Int(1)),
            max_unavailable: Some(IntOrString::Int(1)),
        }),
    }
}

/// Pod-level security defaults applied to every generated Deployment.
pub fn default_pod_security_context() -> PodSecurityContext {
    PodSecurityContext {
        run_as_non_root: Some(true),
        run_as_user: Some(1000),
        fs_group: Some(1000),
        ..Default::default()
    }
}

/// Container-level security defaults applied to the single app container.
pub fn default_container_security_context() -> SecurityContext {
    SecurityContext {
        allow_privilege_escalation: Some(false),
        read_only_root_filesystem: Some(false),
        ..Default::default()
    }
}

/// Storage defaults for the PVC template.
pub const DEFAULT_STORAGE_SIZE: &str = "1Gi";
pub const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";

/// Legal PVC access modes.
pub const ACCESS_MODES: &[&str] = &[
    "ReadWriteOnce",
    "ReadOnlyMany",
    "ReadWriteMany",
    "ReadWriteOncePod",
];

/// Placeholder secret data emitted only under an explicit
/// `allow_placeholder: true` opt-in. Never real credentials.
pub fn placeholder_secret_data() -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    data.insert("username".to_string(), "placeholder".to_string());
    data.insert("password".to_string(), "changeme".to_string());
    data
}
