//! GitOps controller "Application" manifest for one environment.
//!
//! Generated as plain serialized output next to the app manifests; this
//! tool never talks to the controller.

use serde::Serialize;

use crate::config::{AutomationApp, Environment};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitopsApplication {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: ApplicationSpec,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub project: String,
    pub source: Source,
    pub destination: Destination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_policy: Option<SyncPolicy>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    pub target_revision: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct Destination {
    pub server: String,
    pub namespace: String,
}

#[derive(Debug, Serialize)]
pub struct SyncPolicy {
    pub automated: Automated,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Automated {
    pub prune: bool,
    pub self_heal: bool,
}

pub fn build_automation_app(env: Environment, automation: &AutomationApp) -> GitopsApplication {
    GitopsApplication {
        api_version: "argoproj.io/v1alpha1".to_string(),
        kind: "Application".to_string(),
        metadata: Metadata {
            name: format!("{}-apps", env),
            namespace: automation.destination_namespace.clone(),
        },
        spec: ApplicationSpec {
            project: "default".to_string(),
            source: Source {
                repo_url: automation.repo_url.clone(),
                target_revision: automation.revision.clone(),
                path: automation.path.clone(),
            },
            destination: Destination {
                server: "https://kubernetes.default.svc".to_string(),
                namespace: env.to_string(),
            },
            sync_policy: automation.automated_sync.then_some(SyncPolicy {
                automated: Automated {
                    prune: true,
                    self_heal: true,
                },
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_shape() {
        let automation = AutomationApp {
            repo_url: "https://git.example.com/platform/deploy.git".to_string(),
            revision: "main".to_string(),
            path: "manifests/dev".to_string(),
            destination_namespace: "argocd".to_string(),
            automated_sync: true,
        };
        let app = build_automation_app(Environment::Dev, &automation);
        let yaml = serde_yaml::to_string(&app).unwrap();
        assert!(yaml.contains("apiVersion: argoproj.io/v1alpha1"));
        assert!(yaml.contains("repoURL: https://git.example.com/platform/deploy.git"));
        assert!(yaml.contains("targetRevision: main"));
        assert!(yaml.contains("selfHeal: true"));
    }

    #[test]
    fn test_manual_sync_omits_policy() {
        let automation = AutomationApp {
            repo_url: "https://git.example.com/platform/deploy.git".to_string(),
            revision: "main".to_string(),
            path: "manifests/prod".to_string(),
            destination_namespace: "argocd".to_string(),
            automated_sync: false,
        };
        let app = build_automation_app(Environment::Prod, &automation);
        assert!(app.spec.sync_policy.is_none());
    }
}
