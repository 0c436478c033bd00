//! Configuration model for the data plane deployment.
//!
//! The persisted `laminar.yaml` document is the single source of truth for
//! what gets applied to the cluster. This module owns its typed shape,
//! validation, default layering, and durable storage.

/// Default file name of the persisted configuration document.
pub const VALUES_FILE_NAME: &str = "laminar.yaml";

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_GCP_REGION: &str = "us-central1";

pub const DEFAULT_CLICKHOUSE_USER: &str = "default";
pub const DEFAULT_CLICKHOUSE_DATABASE: &str = "default";
pub const DEFAULT_CLICKHOUSE_CPU: (&str, &str) = ("1", "2");
pub const DEFAULT_CLICKHOUSE_MEMORY: (&str, &str) = ("2Gi", "4Gi");
pub const DEFAULT_CLICKHOUSE_STORAGE_SIZE: &str = "100Gi";

pub const DEFAULT_PROXY_REPLICAS: u32 = 1;
pub const DEFAULT_PROXY_CPU: (&str, &str) = ("500m", "1");
pub const DEFAULT_PROXY_MEMORY: (&str, &str) = ("1Gi", "2Gi");
pub const DEFAULT_LB_PORT: u16 = 40080;

mod layers;
mod paths;
mod quantity;
mod store;
mod types;
mod validate;

pub use layers::{merge_documents, provider_defaults, LayeredConfig, Provenance};
pub use paths::InstallPaths;
pub use quantity::{Quantity, QuantityError};
pub use store::{ConfigStore, LoadedDocument, PersistOutcome};
pub use types::*;
pub use validate::{is_valid_bucket_name, FieldError, ValidationOptions};
