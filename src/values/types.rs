//! Typed shape of the persisted configuration document.
//!
//! Keys are camelCase so the document reads like chart values. Every struct
//! defaults field-wise, which lets a hand-trimmed document still load.
use super::{
    DEFAULT_CLICKHOUSE_CPU, DEFAULT_CLICKHOUSE_DATABASE, DEFAULT_CLICKHOUSE_MEMORY,
    DEFAULT_CLICKHOUSE_STORAGE_SIZE, DEFAULT_CLICKHOUSE_USER, DEFAULT_LB_PORT, DEFAULT_NAMESPACE,
    DEFAULT_PROXY_CPU, DEFAULT_PROXY_MEMORY, DEFAULT_PROXY_REPLICAS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Cloud provider hosting the cluster.
///
/// The document stores the provider as a free string so that an unknown
/// value surfaces as a field error instead of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudProvider {
    None,
    Aws,
    Gcp,
}

impl CloudProvider {
    /// Parse a document value; the empty string means "not set".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(CloudProvider::None),
            "aws" => Some(CloudProvider::Aws),
            "gcp" => Some(CloudProvider::Gcp),
            _ => None,
        }
    }

    /// Return the stable string identifier used in the document.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::None => "none",
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
        }
    }

    /// Human label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            CloudProvider::None => "Other / none",
            CloudProvider::Aws => "AWS",
            CloudProvider::Gcp => "GCP",
        }
    }

    pub fn all() -> [CloudProvider; 3] {
        [CloudProvider::Aws, CloudProvider::Gcp, CloudProvider::None]
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub namespace: String,
    pub cloud_provider: String,
    pub data_plane_public_key: String,
    pub cloud: CloudSettings,
    pub clickhouse: ClickhouseSettings,
    pub data_plane_proxy: ProxySettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            cloud_provider: String::new(),
            data_plane_public_key: String::new(),
            cloud: CloudSettings::default(),
            clickhouse: ClickhouseSettings::default(),
            data_plane_proxy: ProxySettings::default(),
        }
    }
}

impl Configuration {
    /// Resolve the provider; unknown strings resolve to `None` here and are
    /// reported by validation.
    pub fn provider(&self) -> CloudProvider {
        CloudProvider::parse(&self.cloud_provider).unwrap_or(CloudProvider::None)
    }
}

/// Cluster identity used by provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudSettings {
    pub region: String,
    /// EKS cluster name (aws).
    pub cluster_name: String,
    /// IAM role of the worker nodes (aws); detected from the node group when empty.
    pub node_role_name: String,
    pub gcp_project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClickhouseSettings {
    pub user: String,
    pub password: String,
    pub database: String,
    pub resources: ResourceSpec,
    pub persistence: PersistenceSettings,
    pub s3: S3Settings,
}

impl Default for ClickhouseSettings {
    fn default() -> Self {
        Self {
            user: DEFAULT_CLICKHOUSE_USER.to_string(),
            password: String::new(),
            database: DEFAULT_CLICKHOUSE_DATABASE.to_string(),
            resources: ResourceSpec::new(DEFAULT_CLICKHOUSE_CPU, DEFAULT_CLICKHOUSE_MEMORY),
            persistence: PersistenceSettings::default(),
            s3: S3Settings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistenceSettings {
    pub size: String,
    pub storage_class: String,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_CLICKHOUSE_STORAGE_SIZE.to_string(),
            storage_class: String::new(),
        }
    }
}

/// Object storage backend for ClickHouse.
///
/// When enabled, credentials come either from the environment (IAM role /
/// workload identity) or from the explicit key pair, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct S3Settings {
    pub enabled: bool,
    pub bucket: String,
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub use_environment_credentials: bool,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            endpoint: String::new(),
            region: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            use_environment_credentials: true,
        }
    }
}

impl S3Settings {
    pub fn has_keys(&self) -> bool {
        !self.access_key_id.trim().is_empty() && !self.secret_access_key.trim().is_empty()
    }
}

/// A request/limit pair of Kubernetes quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizePair {
    pub request: String,
    pub limit: String,
}

impl SizePair {
    pub fn new(request: &str, limit: &str) -> Self {
        Self {
            request: request.to_string(),
            limit: limit.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceSpec {
    pub cpu: SizePair,
    pub memory: SizePair,
}

impl ResourceSpec {
    pub fn new(cpu: (&str, &str), memory: (&str, &str)) -> Self {
        Self {
            cpu: SizePair::new(cpu.0, cpu.1),
            memory: SizePair::new(memory.0, memory.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxySettings {
    pub replica_count: u32,
    pub resources: ResourceSpec,
    pub load_balancer: LoadBalancerSettings,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            replica_count: DEFAULT_PROXY_REPLICAS,
            resources: ResourceSpec::new(DEFAULT_PROXY_CPU, DEFAULT_PROXY_MEMORY),
            load_balancer: LoadBalancerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancerSettings {
    pub enabled: bool,
    pub port: u16,
    /// User annotations; provider defaults are merged in at render time.
    pub annotations: BTreeMap<String, String>,
}

impl Default for LoadBalancerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_LB_PORT,
            annotations: BTreeMap::new(),
        }
    }
}
