//! Deployment template.
//!
//! Pure function from (app name, resolved configuration, merged env/envFrom)
//! to a typed Deployment. The base port set, debug port, probes and volume
//! list are computed here; the caller only ever supplies *additions* to the
//! computed base lists.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, EnvFromSource, EnvVar,
    HTTPGetAction, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Probe,
    ProjectedVolumeSource, ResourceRequirements, SecretProjection, Volume, VolumeMount,
    VolumeProjection,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::config::defaults;
use crate::config::{AppConfig, ProbeConfig, ResourcesConfig};

/// Build the Deployment for one application.
pub fn build_deployment(
    app_name: &str,
    config: &AppConfig,
    labels: &BTreeMap<String, String>,
    env: Vec<EnvVar>,
    env_from: Vec<EnvFromSource>,
) -> Deployment {
    let d = &config.deployment;
    let (volumes, volume_mounts) = build_volumes(app_name, config);

    let container = Container {
        name: app_name.to_string(),
        image: Some(d.image.clone()),
        env: (!env.is_empty()).then_some(env),
        env_from: (!env_from.is_empty()).then_some(env_from),
        ports: Some(container_ports(config)),
        liveness_probe: Some(resolve_probe(
            d.liveness_probe.as_ref(),
            defaults::LIVENESS_PATH,
            config.enable_https,
        )),
        readiness_probe: Some(resolve_probe(
            d.readiness_probe.as_ref(),
            defaults::READINESS_PATH,
            config.enable_https,
        )),
        resources: d.resources.as_ref().map(resolve_resources),
        volume_mounts: (!volume_mounts.is_empty()).then_some(volume_mounts),
        security_context: Some(defaults::default_container_security_context()),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(app_name.to_string()),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(d.replicas),
            selector: LabelSelector {
                match_labels: Some(selector_labels(app_name)),
                ..Default::default()
            },
            strategy: Some(d.strategy.clone().unwrap_or_else(defaults::default_strategy)),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels.clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: (!volumes.is_empty()).then_some(volumes),
                    node_selector: d.node_selector.clone(),
                    affinity: d.affinity.clone(),
                    security_context: Some(defaults::default_pod_security_context()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The selector is fixed to `app: <name>` and never caller-overridable.
pub fn selector_labels(app_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), app_name.to_string());
    labels
}

/// Base HTTP-or-HTTPS port, plus the debug port when enabled, plus caller
/// additions, in that order.
fn container_ports(config: &AppConfig) -> Vec<ContainerPort> {
    let mut ports = Vec::new();

    let (name, number) = if config.enable_https {
        ("https", defaults::HTTPS_PORT)
    } else {
        ("http", defaults::HTTP_PORT)
    };
    ports.push(ContainerPort {
        name: Some(name.to_string()),
        container_port: number,
        protocol: Some("TCP".to_string()),
        ..Default::default()
    });

    if config.debug {
        ports.push(ContainerPort {
            name: Some("debug".to_string()),
            container_port: defaults::DEBUG_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        });
    }

    ports.extend(config.deployment.additional_ports.iter().cloned());
    ports
}

/// Intersect the default HTTP(S) probe with the caller overlay.
///
/// Overrides win per field, never replace the whole probe.
pub fn resolve_probe(overlay: Option<&ProbeConfig>, default_path: &str, https: bool) -> Probe {
    let overlay = overlay.cloned().unwrap_or_default();
    let (default_port, scheme) = if https {
        (defaults::HTTPS_PORT, "HTTPS")
    } else {
        (defaults::HTTP_PORT, "HTTP")
    };

    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(overlay.path.unwrap_or_else(|| default_path.to_string())),
            port: IntOrString::Int(overlay.port.unwrap_or(default_port)),
            scheme: Some(scheme.to_string()),
            ..Default::default()
        }),
        initial_delay_seconds: Some(
            overlay
                .initial_delay_seconds
                .unwrap_or(defaults::PROBE_INITIAL_DELAY_SECONDS),
        ),
        period_seconds: Some(
            overlay
                .period_seconds
                .unwrap_or(defaults::PROBE_PERIOD_SECONDS),
        ),
        timeout_seconds: Some(
            overlay
                .timeout_seconds
                .unwrap_or(defaults::PROBE_TIMEOUT_SECONDS),
        ),
        failure_threshold: Some(
            overlay
                .failure_threshold
                .unwrap_or(defaults::PROBE_FAILURE_THRESHOLD),
        ),
        ..Default::default()
    }
}

fn resolve_resources(config: &ResourcesConfig) -> ResourceRequirements {
    match config {
        // Unknown tiers were rejected by the schema before templating.
        ResourcesConfig::Tier { tier } => defaults::resource_tier(tier).unwrap_or_default(),
        ResourcesConfig::Explicit { requests, limits } => ResourceRequirements {
            requests: requests.as_ref().map(to_quantities),
            limits: limits.as_ref().map(to_quantities),
            ..Default::default()
        },
    }
}

fn to_quantities(map: &BTreeMap<String, String>) -> BTreeMap<String, Quantity> {
    map.iter()
        .map(|(k, v)| (k.clone(), Quantity(v.clone())))
        .collect()
}

/// Assemble volumes and mounts from the five independent sub-builders plus
/// the generated ConfigMap's companion mount.
fn build_volumes(app_name: &str, config: &AppConfig) -> (Vec<Volume>, Vec<VolumeMount>) {
    let mut volumes = Vec::new();
    let mut mounts = Vec::new();
    let v = &config.deployment.volumes;

    if let Some(data) = &v.data {
        volumes.push(Volume {
            name: "data".to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: data
                    .claim
                    .clone()
                    .unwrap_or_else(|| format!("{}-data", app_name)),
                read_only: data.read_only.then_some(true),
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: "data".to_string(),
            mount_path: data
                .mount_path
                .clone()
                .unwrap_or_else(|| defaults::data_mount_path(app_name)),
            read_only: data.read_only.then_some(true),
            ..Default::default()
        });
    }

    if let Some(cfg) = &v.config {
        volumes.push(Volume {
            name: "config".to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: cfg
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{}-config", app_name)),
                ..Default::default()
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: "config".to_string(),
            mount_path: cfg
                .mount_path
                .clone()
                .unwrap_or_else(|| defaults::config_mount_path(app_name)),
            read_only: Some(true),
            ..Default::default()
        });
    }

    if let Some(cache) = &v.cache {
        volumes.push(Volume {
            name: "cache".to_string(),
            empty_dir: Some(EmptyDirVolumeSource {
                size_limit: cache.size_limit.clone().map(Quantity),
                ..Default::default()
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: "cache".to_string(),
            mount_path: cache
                .mount_path
                .clone()
                .unwrap_or_else(|| defaults::cache_mount_path(app_name)),
            ..Default::default()
        });
    }

    if let Some(projected) = &v.projected_secrets {
        volumes.push(Volume {
            name: "secrets".to_string(),
            projected: Some(ProjectedVolumeSource {
                sources: Some(
                    projected
                        .secrets
                        .iter()
                        .map(|secret| VolumeProjection {
                            secret: Some(SecretProjection {
                                name: secret.clone(),
                                ..Default::default()
                            }),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: "secrets".to_string(),
            mount_path: projected
                .mount_path
                .clone()
                .unwrap_or_else(|| defaults::projected_secrets_mount_path(app_name)),
            read_only: Some(true),
            ..Default::default()
        });
    }

    for additional in &v.additional {
        volumes.push(additional.volume.clone());
        if let Some(path) = &additional.mount_path {
            mounts.push(VolumeMount {
                name: additional.volume.name.clone(),
                mount_path: path.clone(),
                read_only: additional.read_only.then_some(true),
                ..Default::default()
            });
        }
    }

    // Companion mount for the generated ConfigMap, when requested.
    if let Some(config_map) = &config.config_map {
        if let Some(mount) = &config_map.mount {
            volumes.push(Volume {
                name: "app-config".to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: format!("{}-config", app_name),
                    ..Default::default()
                }),
                ..Default::default()
            });
            mounts.push(VolumeMount {
                name: "app-config".to_string(),
                mount_path: mount.path.clone(),
                read_only: Some(true),
                ..Default::default()
            });
        }
    }

    (volumes, mounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ConfigMapConfig, ConfigMapMount, DataVolumeConfig, DeploymentConfig, VolumesConfig,
    };

    fn app(debug: bool, https: bool) -> AppConfig {
        AppConfig {
            namespace: "dev".to_string(),
            debug,
            enable_https: https,
            deployment: DeploymentConfig {
                image: "registry/app:v1".to_string(),
                replicas: 2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn container_of(deployment: &Deployment) -> &Container {
        &deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0]
    }

    #[test]
    fn test_single_container_with_image_and_replicas() {
        let config = app(false, false);
        let deployment = build_deployment(
            "example-app",
            &config,
            &selector_labels("example-app"),
            vec![],
            vec![],
        );

        let spec = deployment.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(2));
        let containers = &spec.template.spec.as_ref().unwrap().containers;
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].image.as_deref(), Some("registry/app:v1"));
    }

    #[test]
    fn test_http_port_set_when_https_disabled() {
        let config = app(false, false);
        let deployment =
            build_deployment("app", &config, &selector_labels("app"), vec![], vec![]);
        let ports = container_of(&deployment).ports.as_ref().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].container_port, defaults::HTTP_PORT);
        assert_eq!(ports[0].name.as_deref(), Some("http"));
    }

    #[test]
    fn test_https_toggles_port_and_probe_scheme_atomically() {
        let config = app(false, true);
        let deployment =
            build_deployment("app", &config, &selector_labels("app"), vec![], vec![]);
        let container = container_of(&deployment);

        let ports = container.ports.as_ref().unwrap();
        assert_eq!(ports[0].container_port, defaults::HTTPS_PORT);

        let liveness = container.liveness_probe.as_ref().unwrap();
        let http_get = liveness.http_get.as_ref().unwrap();
        assert_eq!(http_get.scheme.as_deref(), Some("HTTPS"));
        assert_eq!(http_get.port, IntOrString::Int(defaults::HTTPS_PORT));
    }

    #[test]
    fn test_debug_adds_debug_port() {
        let config = app(true, false);
        let deployment =
            build_deployment("app", &config, &selector_labels("app"), vec![], vec![]);
        let ports = container_of(&deployment).ports.as_ref().unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[1].container_port, defaults::DEBUG_PORT);
        assert_eq!(ports[1].name.as_deref(), Some("debug"));
    }

    #[test]
    fn test_probe_overlay_wins_per_field_only() {
        let probe = resolve_probe(
            Some(&ProbeConfig {
                period_seconds: Some(5),
                ..Default::default()
            }),
            defaults::READINESS_PATH,
            false,
        );
        assert_eq!(probe.period_seconds, Some(5));
        // Untouched fields keep the catalog defaults.
        assert_eq!(
            probe.http_get.as_ref().unwrap().path.as_deref(),
            Some(defaults::READINESS_PATH)
        );
        assert_eq!(
            probe.initial_delay_seconds,
            Some(defaults::PROBE_INITIAL_DELAY_SECONDS)
        );
    }

    #[test]
    fn test_default_strategy_applied_when_absent() {
        let config = app(false, false);
        let deployment =
            build_deployment("app", &config, &selector_labels("app"), vec![], vec![]);
        let strategy = deployment.spec.unwrap().strategy.unwrap();
        assert_eq!(strategy.type_.as_deref(), Some("RollingUpdate"));
    }

    #[test]
    fn test_data_volume_defaults_to_app_scoped_claim_and_path() {
        let mut config = app(false, false);
        config.deployment.volumes = VolumesConfig {
            data: Some(DataVolumeConfig::default()),
            ..Default::default()
        };
        let deployment =
            build_deployment("example-app", &config, &selector_labels("example-app"), vec![], vec![]);
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        let volumes = pod.volumes.unwrap();
        assert_eq!(
            volumes[0]
                .persistent_volume_claim
                .as_ref()
                .unwrap()
                .claim_name,
            "example-app-data"
        );
        let mounts = pod.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[0].mount_path, "/var/lib/example-app");
    }

    #[test]
    fn test_config_map_mount_descriptor_generates_companion_volume() {
        let mut config = app(false, false);
        config.config_map = Some(ConfigMapConfig {
            data: Default::default(),
            mount: Some(ConfigMapMount {
                path: "/etc/example-app/config".to_string(),
            }),
        });
        let deployment =
            build_deployment("example-app", &config, &selector_labels("example-app"), vec![], vec![]);
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        let volumes = pod.volumes.unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(
            volumes[0].config_map.as_ref().unwrap().name,
            "example-app-config"
        );
    }

    #[test]
    fn test_no_volumes_means_absent_not_empty() {
        let config = app(false, false);
        let deployment =
            build_deployment("app", &config, &selector_labels("app"), vec![], vec![]);
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        assert!(pod.volumes.is_none());
        assert!(pod.containers[0].volume_mounts.is_none());
    }
}
