//! Cloud object storage provisioning.
//!
//! Each provider is one [`Provisioner`] implementation. Every creating step
//! checks first and creates only when absent, so a re-run after a full or
//! partial success converges on the same resources.
use crate::exec::{CommandOutput, CommandRunner};
use crate::values::{CloudProvider, Configuration, S3Settings};
use std::fmt;
use std::io;
use tracing::{debug, info};

mod aws;
mod gcp;
mod none;

pub use aws::AwsProvisioner;
pub use gcp::GcpProvisioner;
pub use none::NoneProvisioner;

/// Default bucket name stem; a random hex suffix makes it globally unique.
pub const BUCKET_PREFIX: &str = "lmnr-clickhouse-data-";

/// Inputs of one provisioning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Bucket to ensure; a fresh name is generated when absent.
    pub bucket: Option<String>,
    pub region: String,
    /// Key pair already recorded in the document, reused when still valid.
    pub existing_keys: Option<KeyPair>,
}

impl ProvisionRequest {
    pub fn from_config(config: &Configuration) -> Self {
        let s3 = &config.clickhouse.s3;
        let bucket = Some(s3.bucket.trim().to_string()).filter(|bucket| !bucket.is_empty());
        let region = if config.cloud.region.trim().is_empty() {
            s3.region.clone()
        } else {
            config.cloud.region.clone()
        };
        let existing_keys = s3.has_keys().then(|| KeyPair {
            access_key_id: s3.access_key_id.clone(),
            secret_access_key: s3.secret_access_key.clone(),
        });
        Self {
            bucket,
            region,
            existing_keys,
        }
    }

    /// The requested bucket, or a freshly generated default name.
    pub fn bucket_or_generate(&self) -> String {
        self.bucket
            .clone()
            .unwrap_or_else(|| format!("{BUCKET_PREFIX}{}", crate::util::bucket_suffix()))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// How the storage engine authenticates against the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Nothing was provisioned.
    None,
    /// Node IAM role or workload identity.
    Environment,
    Keys(KeyPair),
}

/// Result of a provisioning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bucket: String,
    pub endpoint: String,
    pub region: String,
    pub source: CredentialSource,
}

impl Credentials {
    pub fn empty() -> Self {
        Self {
            bucket: String::new(),
            endpoint: String::new(),
            region: String::new(),
            source: CredentialSource::None,
        }
    }

    /// Fill the object storage fields of the document.
    pub fn apply_to(&self, s3: &mut S3Settings) {
        let keys = match &self.source {
            CredentialSource::None => return,
            CredentialSource::Environment => None,
            CredentialSource::Keys(keys) => Some(keys),
        };
        s3.enabled = true;
        s3.bucket = self.bucket.clone();
        s3.endpoint = self.endpoint.clone();
        s3.region = self.region.clone();
        match keys {
            Some(keys) => {
                s3.use_environment_credentials = false;
                s3.access_key_id = keys.access_key_id.clone();
                s3.secret_access_key = keys.secret_access_key.clone();
            }
            None => {
                s3.use_environment_credentials = true;
                s3.access_key_id.clear();
                s3.secret_access_key.clear();
            }
        }
    }
}

/// S3-compatible endpoint the storage engine writes under.
pub fn storage_endpoint(provider: CloudProvider, bucket: &str, region: &str) -> String {
    match provider {
        CloudProvider::Aws => format!("https://s3.{region}.amazonaws.com/{bucket}/data/"),
        CloudProvider::Gcp => format!("https://storage.googleapis.com/{bucket}/data/"),
        CloudProvider::None => String::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionErrorKind {
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("bucket {0} already exists and is owned by another account")]
    NameCollision(String),
    #[error("cloud API unavailable: {0}")]
    Unavailable(String),
    #[error("{program} is not installed or not in PATH")]
    ToolMissing {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("command exited with {}: {stderr}", exit_label(.code))]
    CommandFailed { code: Option<i32>, stderr: String },
    #[error("unexpected output: {0}")]
    UnexpectedOutput(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// A failed provisioning step.
#[derive(Debug, thiserror::Error)]
#[error("{step} failed: {kind}")]
pub struct ProvisionError {
    pub step: String,
    #[source]
    pub kind: ProvisionErrorKind,
}

impl ProvisionError {
    pub fn new(step: impl Into<String>, kind: ProvisionErrorKind) -> Self {
        Self {
            step: step.into(),
            kind,
        }
    }
}

/// Map CLI stderr onto an error kind.
pub fn classify_failure(output: &CommandOutput) -> ProvisionErrorKind {
    let stderr = output.stderr.trim().to_string();
    let lower = stderr.to_ascii_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));
    if any(&[
        "accessdenied",
        "access denied",
        "unauthorized",
        "not authorized",
        "permission_denied",
        "permission denied",
        "forbidden",
        "unable to locate credentials",
        "expiredtoken",
        "reauthentication",
    ]) {
        ProvisionErrorKind::Unauthorized(stderr)
    } else if any(&[
        "could not connect",
        "connection refused",
        "timed out",
        "service unavailable",
        "serviceunavailable",
        "throttl",
        "temporarily unavailable",
        "internal error",
    ]) {
        ProvisionErrorKind::Unavailable(stderr)
    } else {
        ProvisionErrorKind::CommandFailed {
            code: output.code,
            stderr,
        }
    }
}

/// Capability shared by every provider.
pub trait Provisioner {
    fn provider(&self) -> CloudProvider;

    /// Ensure the bucket and access grant exist and return the credentials
    /// the storage engine should use.
    fn provision(&self, request: &ProvisionRequest) -> Result<Credentials, ProvisionError>;
}

/// Pick the provisioner for a configuration. Disabled object storage always
/// gets the no-op variant.
pub fn provisioner_for<'a>(
    config: &Configuration,
    runner: &'a dyn CommandRunner,
) -> Box<dyn Provisioner + 'a> {
    if !config.clickhouse.s3.enabled {
        return Box::new(NoneProvisioner);
    }
    match config.provider() {
        CloudProvider::Aws => Box::new(AwsProvisioner::new(
            runner,
            &config.cloud.cluster_name,
            &config.cloud.node_role_name,
        )),
        CloudProvider::Gcp => Box::new(GcpProvisioner::new(runner, &config.cloud.gcp_project_id)),
        CloudProvider::None => Box::new(NoneProvisioner),
    }
}

/// Run a command whose non-zero exit is an answer rather than a failure.
pub(crate) fn probe(
    runner: &dyn CommandRunner,
    step: &str,
    program: &str,
    args: &[String],
) -> Result<CommandOutput, ProvisionError> {
    debug!(step, command = %crate::exec::command_line(program, args), "probing");
    runner.run(program, args).map_err(|source| {
        ProvisionError::new(
            step,
            ProvisionErrorKind::ToolMissing {
                program: program.to_string(),
                source,
            },
        )
    })
}

/// Run a command that must succeed.
pub(crate) fn run_step(
    runner: &dyn CommandRunner,
    step: &str,
    program: &str,
    args: &[String],
) -> Result<CommandOutput, ProvisionError> {
    info!(step, "running");
    let output = probe(runner, step, program, args)?;
    if output.success() {
        Ok(output)
    } else {
        Err(ProvisionError::new(step, classify_failure(&output)))
    }
}

/// True when stderr reports a missing resource.
pub(crate) fn is_not_found(output: &CommandOutput) -> bool {
    let lower = output.stderr.to_ascii_lowercase();
    lower.contains("404") || lower.contains("not found") || lower.contains("not_found")
}

/// True when stderr reports a resource that exists but is not ours.
pub(crate) fn is_foreign(output: &CommandOutput) -> bool {
    let lower = output.stderr.to_ascii_lowercase();
    lower.contains("403") || lower.contains("forbidden")
}
