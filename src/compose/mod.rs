//! Application composition: layered configuration in, resource set out.
//!
//! [`compose_app`] is the only place where the layer concept (platform
//! default < app default < environment override < fine-grain additional)
//! is fully assembled. The resource templates only ever see the final
//! merged values, never the layers.

pub mod automation;
mod configmap;
mod deployment;
pub mod env_merge;
mod secret;
mod service;
mod storage;

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, EnvVar, PersistentVolumeClaim, Secret, Service};

use crate::config::defaults;
use crate::config::{AppConfig, CatalogEntry};
use crate::error::SchemaError;

/// One generated resource, typed where the platform owns the shape and an
/// opaque mapping for the app-specific extension point.
#[derive(Debug, Clone)]
pub enum Resource {
    Deployment(Deployment),
    Service(Service),
    ConfigMap(ConfigMap),
    PersistentVolumeClaim(PersistentVolumeClaim),
    Secret(Secret),
    Extra(serde_yaml::Value),
}

impl Resource {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        match self {
            Resource::Deployment(r) => serde_yaml::to_string(r),
            Resource::Service(r) => serde_yaml::to_string(r),
            Resource::ConfigMap(r) => serde_yaml::to_string(r),
            Resource::PersistentVolumeClaim(r) => serde_yaml::to_string(r),
            Resource::Secret(r) => serde_yaml::to_string(r),
            Resource::Extra(r) => serde_yaml::to_string(r),
        }
    }
}

/// The named collection of resources composed for one application.
///
/// The advertised manifest list is derived from the keys actually present
/// (BTreeMap keeps them sorted), so it cannot drift from reality.
#[derive(Debug, Default)]
pub struct ResourceSet {
    resources: BTreeMap<String, Resource>,
}

impl ResourceSet {
    pub fn insert(&mut self, key: impl Into<String>, resource: Resource) {
        self.resources.insert(key.into(), resource);
    }

    pub fn get(&self, key: &str) -> Option<&Resource> {
        self.resources.get(key)
    }

    /// Sorted key set of the resources actually present.
    pub fn resources_list(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Resolve one application's layered configuration into its resource set.
///
/// Validates first: an unsatisfied constraint fails this application's
/// composition before anything is templated.
pub fn compose_app(
    app_name: &str,
    catalog: &CatalogEntry,
    config: &AppConfig,
) -> Result<ResourceSet, SchemaError> {
    config.validate(app_name)?;

    let labels = resource_labels(app_name, config);

    // The base tier is platform-computed and never directly settable.
    let base_env = if config.debug {
        vec![EnvVar {
            name: defaults::DEBUG_ENV_NAME.to_string(),
            value: Some(defaults::DEBUG_ENV_VALUE.to_string()),
            value_from: None,
        }]
    } else {
        vec![]
    };

    let env = env_merge::merge_env(
        &base_env,
        &catalog.env,
        &config.deployment.env,
        &config.deployment.additional_env,
    );
    let env_from = env_merge::merge_env_from(&catalog.env_from, &config.deployment.env_from);

    let mut set = ResourceSet::default();
    set.insert(
        "deployment",
        Resource::Deployment(deployment::build_deployment(
            app_name, config, &labels, env, env_from,
        )),
    );
    set.insert(
        "service",
        Resource::Service(service::build_service(app_name, config, &labels)),
    );

    if config.debug {
        set.insert(
            "debug-service",
            Resource::Service(service::build_debug_service(app_name, config, &labels)),
        );
    }

    if let Some(section) = &config.config_map {
        set.insert(
            "configmap",
            Resource::ConfigMap(configmap::build_config_map(
                app_name, config, section, &labels,
            )),
        );
    }

    if let Some(storage) = &config.storage {
        set.insert(
            "pvc",
            Resource::PersistentVolumeClaim(storage::build_pvc(
                app_name, config, storage, &labels,
            )),
        );
    }

    if let Some(section) = &config.secret {
        set.insert(
            "secret",
            Resource::Secret(secret::build_secret(app_name, config, section, &labels)),
        );
    }

    // Open extension point. An extra key shadowing a built-in key is an
    // explicit override by the app and wins.
    for (key, value) in &config.extra_resources {
        set.insert(key.clone(), Resource::Extra(value.clone()));
    }

    Ok(set)
}

/// Caller labels merged with the computed selector labels; the selector
/// keys win, so the pod template always matches the Deployment selector.
fn resource_labels(app_name: &str, config: &AppConfig) -> BTreeMap<String, String> {
    let mut labels = config.labels.clone();
    labels.extend(deployment::selector_labels(app_name));
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeploymentConfig, SecretConfig, StorageConfig};

    fn minimal_app() -> AppConfig {
        AppConfig {
            namespace: "dev".to_string(),
            deployment: DeploymentConfig {
                image: "registry/app:v1".to_string(),
                replicas: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_resources_list_is_derived_and_sorted() {
        let set = compose_app("example-app", &CatalogEntry::default(), &minimal_app()).unwrap();
        assert_eq!(set.resources_list(), vec!["deployment", "service"]);
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_selector_always_matches_template_labels() {
        let mut config = minimal_app();
        config
            .labels
            .insert("team".to_string(), "platform".to_string());
        let set = compose_app("example-app", &CatalogEntry::default(), &config).unwrap();

        let Some(Resource::Deployment(deployment)) = set.get("deployment") else {
            panic!("deployment missing");
        };
        let spec = deployment.spec.as_ref().unwrap();
        let selector = spec.selector.match_labels.as_ref().unwrap();
        let template_labels = spec
            .template
            .metadata
            .as_ref()
            .unwrap()
            .labels
            .as_ref()
            .unwrap();
        assert_eq!(selector.get("app"), template_labels.get("app"));
        assert_eq!(template_labels.get("team").map(String::as_str), Some("platform"));
    }

    #[test]
    fn test_app_label_override_fails_composition() {
        let mut config = minimal_app();
        config
            .labels
            .insert("app".to_string(), "renamed".to_string());
        let err = compose_app("example-app", &CatalogEntry::default(), &config).unwrap_err();
        assert!(matches!(err, SchemaError::ConflictingDefault { .. }));
    }

    #[test]
    fn test_debug_false_means_no_debug_artifacts() {
        let set = compose_app("example-app", &CatalogEntry::default(), &minimal_app()).unwrap();
        assert!(set.get("debug-service").is_none());

        let Some(Resource::Deployment(deployment)) = set.get("deployment") else {
            panic!("deployment missing");
        };
        let container = &deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0];
        assert!(container.env.is_none());
        let ports = container.ports.as_ref().unwrap();
        assert!(ports
            .iter()
            .all(|p| p.container_port != defaults::DEBUG_PORT));
    }

    #[test]
    fn test_debug_true_adds_service_port_and_env_atomically() {
        let mut config = minimal_app();
        config.debug = true;
        let set = compose_app("example-app", &CatalogEntry::default(), &config).unwrap();
        assert_eq!(
            set.resources_list(),
            vec!["debug-service", "deployment", "service"]
        );

        let Some(Resource::Deployment(deployment)) = set.get("deployment") else {
            panic!("deployment missing");
        };
        let container = &deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0];
        let env = container.env.as_ref().unwrap();
        assert!(env
            .iter()
            .any(|v| v.name == defaults::DEBUG_ENV_NAME
                && v.value.as_deref() == Some(defaults::DEBUG_ENV_VALUE)));
        assert!(container
            .ports
            .as_ref()
            .unwrap()
            .iter()
            .any(|p| p.container_port == defaults::DEBUG_PORT));
    }

    #[test]
    fn test_conditional_sections_extend_the_list() {
        let mut config = minimal_app();
        config.storage = Some(StorageConfig::default());
        config.secret = Some(SecretConfig {
            data: Some(
                [("token".to_string(), "x".to_string())]
                    .into_iter()
                    .collect(),
            ),
            allow_placeholder: false,
        });
        let set = compose_app("example-app", &CatalogEntry::default(), &config).unwrap();
        assert_eq!(
            set.resources_list(),
            vec!["deployment", "pvc", "secret", "service"]
        );
    }

    #[test]
    fn test_additional_env_outranks_base_debug_var() {
        let mut config = minimal_app();
        config.debug = true;
        config.deployment.additional_env = vec![EnvVar {
            name: defaults::DEBUG_ENV_NAME.to_string(),
            value: Some("verbose".to_string()),
            value_from: None,
        }];
        let set = compose_app("example-app", &CatalogEntry::default(), &config).unwrap();
        let Some(Resource::Deployment(deployment)) = set.get("deployment") else {
            panic!("deployment missing");
        };
        let env = deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0]
            .env
            .as_ref()
            .unwrap()
            .clone();
        let debug_vars: Vec<_> = env
            .iter()
            .filter(|v| v.name == defaults::DEBUG_ENV_NAME)
            .collect();
        assert_eq!(debug_vars.len(), 1);
        assert_eq!(debug_vars[0].value.as_deref(), Some("verbose"));
    }

    #[test]
    fn test_catalog_env_sits_between_base_and_environment() {
        let mut config = minimal_app();
        config.deployment.env = vec![EnvVar {
            name: "MODE".to_string(),
            value: Some("env".to_string()),
            value_from: None,
        }];
        let catalog = CatalogEntry {
            env: vec![
                EnvVar {
                    name: "MODE".to_string(),
                    value: Some("app".to_string()),
                    value_from: None,
                },
                EnvVar {
                    name: "APP_ONLY".to_string(),
                    value: Some("1".to_string()),
                    value_from: None,
                },
            ],
            env_from: vec![],
        };
        let set = compose_app("example-app", &catalog, &config).unwrap();
        let Some(Resource::Deployment(deployment)) = set.get("deployment") else {
            panic!("deployment missing");
        };
        let env = deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0]
            .env
            .as_ref()
            .unwrap()
            .clone();
        assert!(env.iter().any(|v| v.name == "APP_ONLY"));
        let mode = env.iter().find(|v| v.name == "MODE").unwrap();
        assert_eq!(mode.value.as_deref(), Some("env"));
    }

    #[test]
    fn test_extra_resources_join_the_set() {
        let mut config = minimal_app();
        let ingress: serde_yaml::Value = serde_yaml::from_str(
            "{apiVersion: networking.k8s.io/v1, kind: Ingress, metadata: {name: example-app}}",
        )
        .unwrap();
        config
            .extra_resources
            .insert("ingress".to_string(), ingress);
        let set = compose_app("example-app", &CatalogEntry::default(), &config).unwrap();
        assert_eq!(
            set.resources_list(),
            vec!["deployment", "ingress", "service"]
        );
    }

    #[test]
    fn test_invalid_app_fails_before_templating() {
        let mut config = minimal_app();
        config.deployment.image = String::new();
        let err =
            compose_app("example-app", &CatalogEntry::default(), &config).unwrap_err();
        assert!(err.to_string().contains("deployment.image"));
    }

    #[test]
    fn test_resources_serialize_with_kind() {
        let set = compose_app("example-app", &CatalogEntry::default(), &minimal_app()).unwrap();
        let yaml = set.get("deployment").unwrap().to_yaml().unwrap();
        assert!(yaml.contains("kind: Deployment"));
        assert!(yaml.contains("image: registry/app:v1"));
    }
}
