//! Error taxonomy for the installer.
//!
//! Field validation errors live in `values::validate` and never leave the
//! session; everything here propagates to `main` and ends the run.
use crate::provision::ProvisionError;
use crate::session::PromptError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Installer result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Phase of the run an error originated from, used in the final message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prerequisites,
    Configuration,
    Persistence,
    Provisioning,
    Apply,
    Readiness,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prerequisites => "prerequisites",
            Phase::Configuration => "configuration",
            Phase::Persistence => "persistence",
            Phase::Provisioning => "provisioning",
            Phase::Apply => "apply",
            Phase::Readiness => "readiness",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal installer errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{tool} is not installed or not in PATH ({hint})")]
    Prerequisite { tool: String, hint: String },

    #[error("no kubectl context configured (run `kubectl config use-context <context>`)")]
    NoKubeContext,

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("helm exited with {}", exit_code_label(.code))]
    Apply { code: Option<i32> },

    #[error("could not run helm: {0}")]
    ApplySpawn(#[source] std::io::Error),

    #[error(
        "load balancer {service} in namespace {namespace} has no external address after {}s",
        .waited.as_secs()
    )]
    ReadinessTimeout {
        service: String,
        namespace: String,
        waited: Duration,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} not found (run the full installation first)", .path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("cannot parse {}: {source}", .path.display())]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("configuration rejected: {0}")]
    Invalid(String),

    #[error("cancelled by user")]
    Aborted,

    #[error("terminal prompt failed: {0}")]
    Prompt(#[source] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl From<PromptError> for Error {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Interrupted => Error::Aborted,
            PromptError::Io(err) => Error::Prompt(err),
        }
    }
}

impl Error {
    pub fn prerequisite(tool: impl Into<String>, hint: impl Into<String>) -> Self {
        Error::Prerequisite {
            tool: tool.into(),
            hint: hint.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }

    /// The phase reported alongside the error message.
    pub fn phase(&self) -> Phase {
        match self {
            Error::Prerequisite { .. } | Error::NoKubeContext => Phase::Prerequisites,
            Error::Provision(_) => Phase::Provisioning,
            Error::Apply { .. } | Error::ApplySpawn(_) => Phase::Apply,
            Error::ReadinessTimeout { .. } => Phase::Readiness,
            Error::Persistence { .. } => Phase::Persistence,
            Error::ConfigNotFound { .. }
            | Error::InvalidDocument { .. }
            | Error::Invalid(_)
            | Error::Aborted
            | Error::Prompt(_)
            | Error::Other(_) => Phase::Configuration,
        }
    }

    /// Process exit code; user cancellation follows the SIGINT convention.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Aborted => 130,
            _ => 1,
        }
    }

    /// Readiness timeouts happen after a successful apply and are reported as warnings.
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::ReadinessTimeout { .. })
    }
}
