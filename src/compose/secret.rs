//! Secret template. Created iff secret creation is enabled.
//!
//! The fixed placeholder data set is only emitted under an explicit
//! `allow_placeholder: true` opt-in, and is logged loudly. It exists for
//! development bring-up, never for real environments.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::warn;

use crate::config::defaults;
use crate::config::{AppConfig, SecretConfig};

pub fn build_secret(
    app_name: &str,
    config: &AppConfig,
    section: &SecretConfig,
    labels: &BTreeMap<String, String>,
) -> Secret {
    let string_data = match &section.data {
        Some(data) if !data.is_empty() => data.clone(),
        _ => {
            warn!(
                app = app_name,
                "emitting placeholder secret data (allow_placeholder is set)"
            );
            defaults::placeholder_secret_data()
        }
    };

    Secret {
        metadata: ObjectMeta {
            name: Some(format!("{}-secret", app_name)),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        string_data: Some(string_data),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentConfig;

    fn app() -> AppConfig {
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
    fn test_supplied_data_used_verbatim() {
        let mut data = BTreeMap::new();
        data.insert("token".to_string(), "s3cr3t".to_string());
        let section = SecretConfig {
            data: Some(data),
            allow_placeholder: false,
        };
        let secret = build_secret("example-app", &app(), &section, &BTreeMap::new());
        assert_eq!(secret.metadata.name.as_deref(), Some("example-app-secret"));
        assert_eq!(
            secret.string_data.unwrap().get("token").map(String::as_str),
            Some("s3cr3t")
        );
    }

    #[test]
    fn test_placeholder_only_under_opt_in() {
        let section = SecretConfig {
            data: None,
            allow_placeholder: true,
        };
        let secret = build_secret("example-app", &app(), &section, &BTreeMap::new());
        let data = secret.string_data.unwrap();
        assert_eq!(data.get("username").map(String::as_str), Some("placeholder"));
    }
}
