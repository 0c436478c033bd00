//! S3 bucket plus an inline IAM policy on the EKS node role.
//!
//! Pods reach the bucket through the node's instance profile, so no keys are
//! issued.
use super::{
    is_foreign, is_not_found, probe, run_step, Credentials, CredentialSource, ProvisionError,
    ProvisionErrorKind, ProvisionRequest, Provisioner,
};
use crate::exec::{argv, CommandRunner};
use crate::values::CloudProvider;
use serde_json::json;
use tracing::info;

/// Inline policy name on the node role; re-putting it overwrites in place.
pub const POLICY_NAME: &str = "LaminarDataPlaneS3Access";

pub struct AwsProvisioner<'a> {
    runner: &'a dyn CommandRunner,
    cluster_name: String,
    /// Explicit node role; detected from the first node group when empty.
    node_role: String,
}

impl<'a> AwsProvisioner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, cluster_name: &str, node_role: &str) -> Self {
        Self {
            runner,
            cluster_name: cluster_name.trim().to_string(),
            node_role: node_role.trim().to_string(),
        }
    }

    fn ensure_bucket(&self, bucket: &str, region: &str) -> Result<(), ProvisionError> {
        let step = format!("check bucket s3://{bucket}");
        let head = probe(
            self.runner,
            &step,
            "aws",
            &argv(&["s3api", "head-bucket", "--bucket", bucket, "--region", region]),
        )?;
        if head.success() {
            info!(bucket, "bucket exists, skipping creation");
            return Ok(());
        }
        if is_foreign(&head) {
            return Err(ProvisionError::new(
                step,
                ProvisionErrorKind::NameCollision(bucket.to_string()),
            ));
        }
        if !is_not_found(&head) {
            return Err(ProvisionError::new(step, super::classify_failure(&head)));
        }

        let step = format!("create bucket s3://{bucket}");
        let created = probe(
            self.runner,
            &step,
            "aws",
            &argv(&["s3", "mb", &format!("s3://{bucket}"), "--region", region]),
        )?;
        if created.success() || created.stderr.contains("BucketAlreadyOwnedByYou") {
            info!(bucket, region, "bucket ready");
            return Ok(());
        }
        if created.stderr.contains("BucketAlreadyExists") {
            return Err(ProvisionError::new(
                step,
                ProvisionErrorKind::NameCollision(bucket.to_string()),
            ));
        }
        Err(ProvisionError::new(step, super::classify_failure(&created)))
    }

    fn node_role(&self) -> Result<String, ProvisionError> {
        if !self.node_role.is_empty() {
            return Ok(self.node_role.clone());
        }
        let cluster = self.cluster_name.as_str();
        let step = format!("list node groups of {cluster}");
        let listed = run_step(
            self.runner,
            &step,
            "aws",
            &argv(&[
                "eks",
                "list-nodegroups",
                "--cluster-name",
                cluster,
                "--output",
                "json",
            ]),
        )?;
        let parsed: serde_json::Value = serde_json::from_str(&listed.stdout).map_err(|err| {
            ProvisionError::new(&step, ProvisionErrorKind::UnexpectedOutput(err.to_string()))
        })?;
        let nodegroup = parsed["nodegroups"]
            .as_array()
            .and_then(|groups| groups.first())
            .and_then(|group| group.as_str())
            .ok_or_else(|| {
                ProvisionError::new(
                    &step,
                    ProvisionErrorKind::UnexpectedOutput(format!(
                        "cluster {cluster} has no managed node groups; set cloud.nodeRoleName"
                    )),
                )
            })?;

        let step = format!("describe node group {nodegroup}");
        let described = run_step(
            self.runner,
            &step,
            "aws",
            &argv(&[
                "eks",
                "describe-nodegroup",
                "--cluster-name",
                cluster,
                "--nodegroup-name",
                nodegroup,
                "--query",
                "nodegroup.nodeRole",
                "--output",
                "text",
            ]),
        )?;
        let role_arn = described.stdout.trim();
        match role_arn.rsplit_once('/') {
            Some((_, role)) if !role.is_empty() => {
                info!(role, nodegroup, "detected node role");
                Ok(role.to_string())
            }
            _ => Err(ProvisionError::new(
                step,
                ProvisionErrorKind::UnexpectedOutput(format!("node role ARN {role_arn:?}")),
            )),
        }
    }

    fn attach_policy(&self, role: &str, bucket: &str) -> Result<(), ProvisionError> {
        let document = policy_document(bucket);
        run_step(
            self.runner,
            &format!("attach policy {POLICY_NAME} to role {role}"),
            "aws",
            &argv(&[
                "iam",
                "put-role-policy",
                "--role-name",
                role,
                "--policy-name",
                POLICY_NAME,
                "--policy-document",
                &document,
            ]),
        )?;
        info!(role, bucket, "bucket access granted to node role");
        Ok(())
    }
}

/// Object read/write plus listing, scoped to one bucket.
pub fn policy_document(bucket: &str) -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": [
                "s3:GetObject",
                "s3:PutObject",
                "s3:DeleteObject",
                "s3:ListBucket"
            ],
            "Resource": [
                format!("arn:aws:s3:::{bucket}"),
                format!("arn:aws:s3:::{bucket}/*")
            ]
        }]
    })
    .to_string()
}

impl Provisioner for AwsProvisioner<'_> {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Aws
    }

    fn provision(&self, request: &ProvisionRequest) -> Result<Credentials, ProvisionError> {
        let bucket = request.bucket_or_generate();
        let region = request.region.as_str();
        self.ensure_bucket(&bucket, region)?;
        let role = self.node_role()?;
        self.attach_policy(&role, &bucket)?;
        Ok(Credentials {
            endpoint: super::storage_endpoint(CloudProvider::Aws, &bucket, region),
            region: region.to_string(),
            bucket,
            source: CredentialSource::Environment,
        })
    }
}

#[cfg(test)]
#[path = "aws_tests.rs"]
mod tests;
