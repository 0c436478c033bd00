//! Field-level validation of the configuration document.
//!
//! Validation collects every problem instead of stopping at the first, so the
//! session can re-ask exactly the sections that own a failing field.
use super::{CloudProvider, Configuration, Quantity, ResourceSpec};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A single rejected field, addressed by its dotted document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for FieldError {}

/// Knobs for validating a document that is not final yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    /// Object storage keys will be issued by provisioning; skip the key check.
    pub credentials_pending: bool,
}

const DNS_LABEL_PATTERN: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";
const BUCKET_PATTERN: &str = r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$";

type CompiledPattern = OnceLock<Result<Regex, regex::Error>>;

/// Match against a lazily compiled pattern; a pattern that fails to compile
/// matches nothing.
fn pattern_matches(cell: &'static CompiledPattern, pattern: &str, text: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .is_ok_and(|re| re.is_match(text))
}

fn is_dns_label(name: &str) -> bool {
    static RE: CompiledPattern = OnceLock::new();
    pattern_matches(&RE, DNS_LABEL_PATTERN, name)
}

/// S3 / GCS bucket naming rules shared by both providers.
pub fn is_valid_bucket_name(name: &str) -> bool {
    static RE: CompiledPattern = OnceLock::new();
    pattern_matches(&RE, BUCKET_PATTERN, name) && !name.contains("..")
}

impl Configuration {
    /// Validate the complete document.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        self.validate_with(ValidationOptions::default())
    }

    pub fn validate_with(&self, options: ValidationOptions) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let namespace = self.namespace.trim();
        if namespace.is_empty() {
            errors.push(FieldError::new("namespace", "must be non-empty"));
        } else if namespace.len() > 63 || !is_dns_label(namespace) {
            errors.push(FieldError::new(
                "namespace",
                "must be a lowercase DNS label (a-z, 0-9, '-')",
            ));
        }

        let provider = CloudProvider::parse(&self.cloud_provider);
        match provider {
            None => errors.push(FieldError::new(
                "cloudProvider",
                format!(
                    "must be one of none, aws, gcp (got {:?})",
                    self.cloud_provider
                ),
            )),
            Some(CloudProvider::Aws) => {
                require(&mut errors, "cloud.region", &self.cloud.region);
                require(&mut errors, "cloud.clusterName", &self.cloud.cluster_name);
            }
            Some(CloudProvider::Gcp) => {
                require(&mut errors, "cloud.region", &self.cloud.region);
                require(&mut errors, "cloud.gcpProjectId", &self.cloud.gcp_project_id);
            }
            Some(CloudProvider::None) => {}
        }

        require(
            &mut errors,
            "dataPlanePublicKey",
            &self.data_plane_public_key,
        );

        let clickhouse = &self.clickhouse;
        require(&mut errors, "clickhouse.password", &clickhouse.password);
        require(&mut errors, "clickhouse.user", &clickhouse.user);
        require(&mut errors, "clickhouse.database", &clickhouse.database);
        validate_resources(&mut errors, "clickhouse.resources", &clickhouse.resources);

        match clickhouse.persistence.size.parse::<Quantity>() {
            Ok(size) if size.is_zero() => errors.push(FieldError::new(
                "clickhouse.persistence.size",
                "must be greater than zero",
            )),
            Ok(_) => {}
            Err(err) => errors.push(FieldError::new(
                "clickhouse.persistence.size",
                err.to_string(),
            )),
        }

        let s3 = &clickhouse.s3;
        if s3.enabled {
            if s3.bucket.trim().is_empty() {
                errors.push(FieldError::new("clickhouse.s3.bucket", "must be non-empty"));
            } else if !is_valid_bucket_name(&s3.bucket) {
                errors.push(FieldError::new(
                    "clickhouse.s3.bucket",
                    "must be 3-63 lowercase letters, digits, '-' or '.'",
                ));
            }
            require(&mut errors, "clickhouse.s3.endpoint", &s3.endpoint);
            require(&mut errors, "clickhouse.s3.region", &s3.region);
            let key_id_set = !s3.access_key_id.trim().is_empty();
            let secret_set = !s3.secret_access_key.trim().is_empty();
            if s3.use_environment_credentials {
                if key_id_set || secret_set {
                    errors.push(FieldError::new(
                        "clickhouse.s3.useEnvironmentCredentials",
                        "environment credentials and explicit keys are mutually exclusive",
                    ));
                }
            } else if !options.credentials_pending {
                if !key_id_set {
                    errors.push(FieldError::new(
                        "clickhouse.s3.accessKeyId",
                        "required when environment credentials are disabled",
                    ));
                }
                if !secret_set {
                    errors.push(FieldError::new(
                        "clickhouse.s3.secretAccessKey",
                        "required when environment credentials are disabled",
                    ));
                }
            }
        }

        let proxy = &self.data_plane_proxy;
        if proxy.replica_count < 1 {
            errors.push(FieldError::new(
                "dataPlaneProxy.replicaCount",
                "must be at least 1",
            ));
        }
        validate_resources(&mut errors, "dataPlaneProxy.resources", &proxy.resources);
        if proxy.load_balancer.enabled && proxy.load_balancer.port == 0 {
            errors.push(FieldError::new(
                "dataPlaneProxy.loadBalancer.port",
                "must be between 1 and 65535",
            ));
        }
        if proxy
            .load_balancer
            .annotations
            .keys()
            .any(|key| key.trim().is_empty())
        {
            errors.push(FieldError::new(
                "dataPlaneProxy.loadBalancer.annotations",
                "annotation keys must be non-empty",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn require(errors: &mut Vec<FieldError>, path: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(path, "must be non-empty"));
    }
}

fn validate_resources(errors: &mut Vec<FieldError>, prefix: &str, spec: &ResourceSpec) {
    for (name, pair) in [("cpu", &spec.cpu), ("memory", &spec.memory)] {
        let request = pair.request.parse::<Quantity>();
        let limit = pair.limit.parse::<Quantity>();
        match (request, limit) {
            (Ok(request), Ok(limit)) => {
                if request > limit {
                    errors.push(FieldError::new(
                        format!("{prefix}.{name}.request"),
                        format!(
                            "request {} exceeds limit {}",
                            pair.request.trim(),
                            pair.limit.trim()
                        ),
                    ));
                }
            }
            (request, limit) => {
                if let Err(err) = request {
                    errors.push(FieldError::new(
                        format!("{prefix}.{name}.request"),
                        err.to_string(),
                    ));
                }
                if let Err(err) = limit {
                    errors.push(FieldError::new(
                        format!("{prefix}.{name}.limit"),
                        err.to_string(),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
