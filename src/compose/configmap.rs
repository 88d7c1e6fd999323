//! ConfigMap template. Created iff the `config_map` section is present;
//! data is copied verbatim.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::config::{AppConfig, ConfigMapConfig};

pub fn build_config_map(
    app_name: &str,
    config: &AppConfig,
    section: &ConfigMapConfig,
    labels: &BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(format!("{}-config", app_name)),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        data: Some(section.data.clone()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentConfig;

    #[test]
    fn test_data_copied_verbatim() {
        let config = AppConfig {
            namespace: "dev".to_string(),
            deployment: DeploymentConfig {
                image: "registry/app:v1".to_string(),
                replicas: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut data = BTreeMap::new();
        data.insert("redis-url".to_string(), "redis://redis.dev:6379".to_string());
        let section = ConfigMapConfig { data, mount: None };

        let cm = build_config_map("example-app", &config, &section, &BTreeMap::new());
        assert_eq!(cm.metadata.name.as_deref(), Some("example-app-config"));
        assert_eq!(
            cm.data.unwrap().get("redis-url").map(String::as_str),
            Some("redis://redis.dev:6379")
        );
    }
}
