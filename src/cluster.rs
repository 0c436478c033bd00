//! Cluster and workstation discovery.
//!
//! Missing `kubectl`/`helm` or kube context is fatal. Everything else here
//! is best effort: a failed lookup only means no suggested default.
use crate::error::{Error, Result};
use crate::exec::{argv, CommandRunner};
use crate::values::CloudProvider;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const DEFAULT_CLASS_ANNOTATIONS: [&str; 2] = [
    "storageclass.kubernetes.io/is-default-class",
    "storageclass.beta.kubernetes.io/is-default-class",
];

/// Tools the installer cannot run without.
pub const REQUIRED_TOOLS: [(&str, &str); 2] = [
    ("kubectl", "install it from https://kubernetes.io/docs/tasks/tools/"),
    ("helm", "install it from https://helm.sh/docs/intro/install/"),
];

pub fn check_prerequisites() -> Result<()> {
    for (tool, hint) in REQUIRED_TOOLS {
        match which::which(tool) {
            Ok(path) => debug!(tool, path = %path.display(), "found prerequisite"),
            Err(_) => return Err(Error::prerequisite(tool, hint)),
        }
    }
    Ok(())
}

/// CLI used to provision object storage for a provider.
pub fn cloud_cli(provider: CloudProvider) -> Option<&'static str> {
    match provider {
        CloudProvider::Aws => Some("aws"),
        CloudProvider::Gcp => Some("gcloud"),
        CloudProvider::None => None,
    }
}

pub fn cloud_cli_available(provider: CloudProvider) -> bool {
    cloud_cli(provider).is_some_and(|cli| which::which(cli).is_ok())
}

pub fn current_context(runner: &dyn CommandRunner) -> Result<String> {
    let output = runner
        .run("kubectl", &argv(&["config", "current-context"]))
        .map_err(|_| Error::prerequisite("kubectl", REQUIRED_TOOLS[0].1))?;
    let context = output.stdout.trim();
    if !output.success() || context.is_empty() {
        return Err(Error::NoKubeContext);
    }
    Ok(context.to_string())
}

/// EKS cluster name from an `aws eks update-kubeconfig` ARN context or an
/// eksctl `user@cluster.region.eksctl.io` context.
pub fn eks_cluster_name(context: &str) -> Option<String> {
    if context.starts_with("arn:") && context.contains(":eks:") {
        return context
            .rsplit_once("cluster/")
            .map(|(_, name)| name.to_string())
            .filter(|name| !name.is_empty());
    }
    let host = context.strip_suffix(".eksctl.io")?;
    let host = host.rsplit_once('@').map_or(host, |(_, host)| host);
    host.split('.')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// GCP project from a `gke_PROJECT_LOCATION_CLUSTER` context.
pub fn gke_project(context: &str) -> Option<String> {
    let rest = context.strip_prefix("gke_")?;
    rest.split('_')
        .next()
        .filter(|project| !project.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageClass {
    pub name: String,
    pub is_default: bool,
}

#[derive(Deserialize)]
struct StorageClassList {
    #[serde(default)]
    items: Vec<StorageClassItem>,
}

#[derive(Deserialize)]
struct StorageClassItem {
    metadata: ObjectMeta,
}

#[derive(Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

pub fn parse_storage_classes(json: &str) -> anyhow::Result<Vec<StorageClass>> {
    let list: StorageClassList =
        serde_json::from_str(json).context("parse storage class list")?;
    Ok(list
        .items
        .into_iter()
        .map(|item| StorageClass {
            is_default: DEFAULT_CLASS_ANNOTATIONS
                .iter()
                .any(|key| item.metadata.annotations.get(*key).map(String::as_str) == Some("true")),
            name: item.metadata.name,
        })
        .collect())
}

pub fn list_storage_classes(runner: &dyn CommandRunner) -> anyhow::Result<Vec<StorageClass>> {
    let output = runner
        .run("kubectl", &argv(&["get", "storageclass", "-o", "json"]))
        .context("run kubectl get storageclass")?;
    if !output.success() {
        return Err(anyhow!(
            "kubectl get storageclass failed: {}",
            crate::util::truncate_string(output.stderr.trim(), 200)
        ));
    }
    parse_storage_classes(&output.stdout)
}

/// Cluster default first, then a provider-typical class, else the first listed.
pub fn recommend_storage_class(
    classes: &[StorageClass],
    provider: CloudProvider,
) -> Option<String> {
    if let Some(default) = classes.iter().find(|class| class.is_default) {
        return Some(default.name.clone());
    }
    let preferences: &[&str] = match provider {
        CloudProvider::Aws => &["gp3", "gp2"],
        CloudProvider::Gcp => &["ssd", "standard"],
        CloudProvider::None => &[],
    };
    preferences
        .iter()
        .find_map(|needle| {
            classes
                .iter()
                .find(|class| class.name.to_ascii_lowercase().contains(needle))
        })
        .or_else(|| classes.first())
        .map(|class| class.name.clone())
}

/// What the session can suggest from the environment.
#[derive(Debug, Clone, Default)]
pub struct ClusterHints {
    pub context: Option<String>,
    pub storage_classes: Vec<StorageClass>,
    pub aws_cli: bool,
    pub gcloud_cli: bool,
}

impl ClusterHints {
    pub fn discover(runner: &dyn CommandRunner, context: Option<String>) -> Self {
        let storage_classes = match list_storage_classes(runner) {
            Ok(classes) => classes,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "could not list storage classes");
                Vec::new()
            }
        };
        Self {
            context,
            storage_classes,
            aws_cli: cloud_cli_available(CloudProvider::Aws),
            gcloud_cli: cloud_cli_available(CloudProvider::Gcp),
        }
    }

    pub fn eks_cluster(&self) -> Option<String> {
        self.context.as_deref().and_then(eks_cluster_name)
    }

    pub fn gcp_project(&self) -> Option<String> {
        self.context.as_deref().and_then(gke_project)
    }

    pub fn storage_class_for(&self, provider: CloudProvider) -> Option<String> {
        recommend_storage_class(&self.storage_classes, provider)
    }

    pub fn has_cloud_cli(&self, provider: CloudProvider) -> bool {
        match provider {
            CloudProvider::Aws => self.aws_cli,
            CloudProvider::Gcp => self.gcloud_cli,
            CloudProvider::None => false,
        }
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
