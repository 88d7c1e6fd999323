//! PersistentVolumeClaim template. Created iff storage is enabled;
//! size, class and access modes default but are overridable.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::config::{AppConfig, StorageConfig};

pub fn build_pvc(
    app_name: &str,
    config: &AppConfig,
    storage: &StorageConfig,
    labels: &BTreeMap<String, String>,
) -> PersistentVolumeClaim {
    let mut requests = BTreeMap::new();
    requests.insert("storage".to_string(), Quantity(storage.size.clone()));

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(format!("{}-data", app_name)),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(storage.access_modes.clone()),
            storage_class_name: storage.class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
