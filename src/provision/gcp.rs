//! GCS bucket, a dedicated service account, and HMAC keys for it.
//!
//! ClickHouse talks to GCS through the S3-compatible XML API, which only
//! accepts HMAC keys, so workload identity is not an option here.
use super::{
    is_foreign, is_not_found, probe, run_step, Credentials, CredentialSource, KeyPair,
    ProvisionError, ProvisionErrorKind, ProvisionRequest, Provisioner,
};
use crate::exec::{argv, CommandRunner};
use crate::values::CloudProvider;
use serde::Deserialize;
use tracing::info;

pub const SERVICE_ACCOUNT_NAME: &str = "laminar-workload";
pub const SERVICE_ACCOUNT_DISPLAY_NAME: &str = "Laminar Data Plane GCS Access";
pub const BUCKET_ROLE: &str = "roles/storage.objectAdmin";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HmacMetadata {
    access_id: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct CreatedHmacKey {
    metadata: HmacMetadata,
    secret: String,
}

pub struct GcpProvisioner<'a> {
    runner: &'a dyn CommandRunner,
    project: String,
}

impl<'a> GcpProvisioner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, project: &str) -> Self {
        Self {
            runner,
            project: project.trim().to_string(),
        }
    }

    pub fn service_account_email(&self) -> String {
        format!(
            "{SERVICE_ACCOUNT_NAME}@{}.iam.gserviceaccount.com",
            self.project
        )
    }

    fn ensure_bucket(&self, bucket: &str, region: &str) -> Result<(), ProvisionError> {
        let url = format!("gs://{bucket}");
        let step = format!("check bucket {url}");
        let described = probe(
            self.runner,
            &step,
            "gcloud",
            &argv(&[
                "storage",
                "buckets",
                "describe",
                &url,
                "--project",
                &self.project,
                "--format=json",
            ]),
        )?;
        if described.success() {
            info!(bucket, "bucket exists, skipping creation");
            return Ok(());
        }
        if is_foreign(&described) {
            return Err(ProvisionError::new(
                step,
                ProvisionErrorKind::NameCollision(bucket.to_string()),
            ));
        }
        if !is_not_found(&described) {
            return Err(ProvisionError::new(step, super::classify_failure(&described)));
        }

        let step = format!("create bucket {url}");
        let created = probe(
            self.runner,
            &step,
            "gcloud",
            &argv(&[
                "storage",
                "buckets",
                "create",
                &url,
                "--project",
                &self.project,
                "--location",
                region,
            ]),
        )?;
        if created.success() {
            info!(bucket, region, "bucket ready");
            return Ok(());
        }
        // Our own bucket would have been found above; a conflict now means
        // the name belongs to someone else.
        let lower = created.stderr.to_ascii_lowercase();
        if lower.contains("409") || lower.contains("already exists") {
            return Err(ProvisionError::new(
                step,
                ProvisionErrorKind::NameCollision(bucket.to_string()),
            ));
        }
        Err(ProvisionError::new(step, super::classify_failure(&created)))
    }

    fn ensure_service_account(&self) -> Result<String, ProvisionError> {
        let email = self.service_account_email();
        let step = format!("check service account {email}");
        let described = probe(
            self.runner,
            &step,
            "gcloud",
            &argv(&[
                "iam",
                "service-accounts",
                "describe",
                &email,
                "--project",
                &self.project,
            ]),
        )?;
        if described.success() {
            info!(email, "service account exists");
            return Ok(email);
        }
        if !is_not_found(&described) {
            return Err(ProvisionError::new(step, super::classify_failure(&described)));
        }

        let step = format!("create service account {email}");
        let created = probe(
            self.runner,
            &step,
            "gcloud",
            &argv(&[
                "iam",
                "service-accounts",
                "create",
                SERVICE_ACCOUNT_NAME,
                "--project",
                &self.project,
                "--display-name",
                SERVICE_ACCOUNT_DISPLAY_NAME,
            ]),
        )?;
        if created.success() || created.stderr.to_ascii_lowercase().contains("already exists") {
            info!(email, "service account ready");
            return Ok(email);
        }
        Err(ProvisionError::new(step, super::classify_failure(&created)))
    }

    fn grant_bucket_access(&self, bucket: &str, email: &str) -> Result<(), ProvisionError> {
        run_step(
            self.runner,
            &format!("grant {BUCKET_ROLE} on gs://{bucket}"),
            "gcloud",
            &argv(&[
                "storage",
                "buckets",
                "add-iam-policy-binding",
                &format!("gs://{bucket}"),
                "--member",
                &format!("serviceAccount:{email}"),
                "--role",
                BUCKET_ROLE,
            ]),
        )?;
        Ok(())
    }

    /// Reuse the recorded key while it is still active; mint one otherwise.
    fn ensure_hmac_key(
        &self,
        email: &str,
        existing: Option<&KeyPair>,
    ) -> Result<KeyPair, ProvisionError> {
        if let Some(existing) = existing {
            let step = format!("list HMAC keys of {email}");
            let listed = run_step(
                self.runner,
                &step,
                "gcloud",
                &argv(&[
                    "storage",
                    "hmac",
                    "list",
                    "--project",
                    &self.project,
                    "--service-account",
                    email,
                    "--format=json",
                ]),
            )?;
            let keys: Vec<HmacMetadata> = serde_json::from_str(&listed.stdout).map_err(|err| {
                ProvisionError::new(&step, ProvisionErrorKind::UnexpectedOutput(err.to_string()))
            })?;
            let active = keys
                .iter()
                .any(|key| key.access_id == existing.access_key_id && key.state == "ACTIVE");
            if active {
                info!(access_id = %existing.access_key_id, "reusing active HMAC key");
                return Ok(existing.clone());
            }
            info!(access_id = %existing.access_key_id, "recorded HMAC key is not active");
        }

        let step = format!("create HMAC key for {email}");
        let created = run_step(
            self.runner,
            &step,
            "gcloud",
            &argv(&[
                "storage",
                "hmac",
                "create",
                email,
                "--project",
                &self.project,
                "--format=json",
            ]),
        )?;
        let key: CreatedHmacKey = serde_json::from_str(&created.stdout).map_err(|err| {
            ProvisionError::new(&step, ProvisionErrorKind::UnexpectedOutput(err.to_string()))
        })?;
        if key.metadata.access_id.is_empty() || key.secret.is_empty() {
            return Err(ProvisionError::new(
                step,
                ProvisionErrorKind::UnexpectedOutput("HMAC key without access id or secret".into()),
            ));
        }
        info!(access_id = %key.metadata.access_id, "HMAC key created");
        Ok(KeyPair {
            access_key_id: key.metadata.access_id,
            secret_access_key: key.secret,
        })
    }
}

impl Provisioner for GcpProvisioner<'_> {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Gcp
    }

    fn provision(&self, request: &ProvisionRequest) -> Result<Credentials, ProvisionError> {
        let bucket = request.bucket_or_generate();
        let region = request.region.as_str();
        self.ensure_bucket(&bucket, region)?;
        let email = self.ensure_service_account()?;
        self.grant_bucket_access(&bucket, &email)?;
        let keys = self.ensure_hmac_key(&email, request.existing_keys.as_ref())?;
        Ok(Credentials {
            endpoint: super::storage_endpoint(CloudProvider::Gcp, &bucket, region),
            region: region.to_string(),
            bucket,
            source: CredentialSource::Keys(keys),
        })
    }
}

#[cfg(test)]
#[path = "gcp_tests.rs"]
mod tests;
