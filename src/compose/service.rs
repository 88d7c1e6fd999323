//! Service and debug Service templates.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::compose::deployment::selector_labels;
use crate::config::defaults;
use crate::config::AppConfig;

/// Build the main Service. Its base port mirrors the Deployment's
/// HTTP/HTTPS toggle; caller additions are appended after it.
pub fn build_service(
    app_name: &str,
    config: &AppConfig,
    labels: &BTreeMap<String, String>,
) -> Service {
    let (name, number) = if config.enable_https {
        ("https", defaults::HTTPS_PORT)
    } else {
        ("http", defaults::HTTP_PORT)
    };

    let mut ports = vec![ServicePort {
        name: Some(name.to_string()),
        port: number,
        target_port: Some(IntOrString::Int(number)),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }];
    ports.extend(config.service.additional_ports.iter().cloned());

    Service {
        metadata: ObjectMeta {
            name: Some(app_name.to_string()),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels.clone()),
            annotations: config.service.annotations.clone(),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(app_name)),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the debug Service, created only when `debug` is true. It exposes
/// exactly the debug port and is named `<app>-debug`.
pub fn build_debug_service(
    app_name: &str,
    config: &AppConfig,
    labels: &BTreeMap<String, String>,
) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(format!("{}-debug", app_name)),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(app_name)),
            ports: Some(vec![ServicePort {
                name: Some("debug".to_string()),
                port: defaults::DEBUG_PORT,
                target_port: Some(IntOrString::Int(defaults::DEBUG_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
