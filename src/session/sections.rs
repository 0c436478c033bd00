//! The configuration sections and the prompts each one asks.
use super::prompt::{PromptError, Prompter, Tone};
use super::Session;
use crate::chart;
use crate::provision::{storage_endpoint, BUCKET_PREFIX};
use crate::util;
use crate::values::{CloudProvider, FieldError};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

type Asked = Result<(), PromptError>;

const ANNOTATIONS_PATH: &str = "dataPlaneProxy.loadBalancer.annotations";

/// Answer to an annotation value prompt that deletes the key.
const REMOVE_ANNOTATION: &str = "-";

/// A group of related fields asked together; the unit of retry.
///
/// Ordering follows the order sections are asked in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum,
)]
pub enum Section {
    Namespace,
    Provider,
    Keys,
    Storage,
    Resources,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Namespace,
        Section::Provider,
        Section::Keys,
        Section::Storage,
        Section::Resources,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::Namespace => "Kubernetes Namespace",
            Section::Provider => "Cloud Provider & Cluster Info",
            Section::Keys => "Required Configuration",
            Section::Storage => "Storage",
            Section::Resources => "Advanced Configuration",
        }
    }

    fn step(&self) -> usize {
        Section::ALL
            .iter()
            .position(|section| section == self)
            .map_or(0, |index| index + 1)
    }

    /// The section that asks for the field at `path`.
    pub fn for_path(path: &str) -> Section {
        let top = path.split('.').next().unwrap_or_default();
        match top {
            "cloudProvider" | "cloud" => Section::Provider,
            "dataPlanePublicKey" => Section::Keys,
            "dataPlaneProxy" => Section::Resources,
            "clickhouse" => {
                let second = path.split('.').nth(1).unwrap_or_default();
                match second {
                    "s3" | "persistence" => Section::Storage,
                    "resources" => Section::Resources,
                    _ => Section::Keys,
                }
            }
            _ => Section::Namespace,
        }
    }
}

/// Unparsable numeric answers are recorded as field errors rather than
/// stored, so the section is asked again.
fn number_error(path: &str, min: u64, max: u64) -> FieldError {
    FieldError::new(path, format!("must be a whole number between {min} and {max}"))
}

impl<P: Prompter + ?Sized> Session<'_, P> {
    pub(super) fn ask(&mut self, section: Section) -> Asked {
        self.prompter
            .section(&format!("Step {}: {}", section.step(), section.title()));
        match section {
            Section::Namespace => self.ask_namespace(),
            Section::Provider => self.ask_provider(),
            Section::Keys => self.ask_keys(),
            Section::Storage => self.ask_storage(),
            Section::Resources => self.ask_resources(),
        }
    }

    /// Text answer with per-field history; empty keeps `default`.
    fn ask_text(
        &mut self,
        path: &str,
        prompt: &str,
        default: Option<String>,
    ) -> Result<String, PromptError> {
        let default = default.as_deref().filter(|value| !value.is_empty());
        let history = self.history.field(path);
        let answer = self.prompter.input(prompt, default, history)?;
        history.push(&answer);
        Ok(answer)
    }

    /// Ask for a string field, defaulting to its current effective value.
    fn ask_field(&mut self, path: &str, prompt: &str) -> Asked {
        let current = self.layers.get_str(path);
        let answer = self.ask_text(path, prompt, Some(current))?;
        self.layers.set(path, answer);
        Ok(())
    }

    fn ask_number<T>(&mut self, path: &str, prompt: &str, min: u64, max: u64) -> Asked
    where
        T: FromStr + Into<Value> + Into<u64> + Copy,
    {
        let current = self.layers.get_str(path);
        let answer = self.ask_text(path, prompt, Some(current))?;
        match answer.parse::<T>() {
            Ok(number) if (min..=max).contains(&Into::<u64>::into(number)) => {
                self.layers.set(path, number)
            }
            _ => self.input_errors.push(number_error(path, min, max)),
        }
        Ok(())
    }

    /// Hidden answer; empty keeps a value already on record.
    fn ask_secret(&mut self, path: &str, prompt: &str) -> Asked {
        let current = self.layers.get_str(path);
        let prompt = if current.is_empty() {
            prompt.to_string()
        } else {
            format!("{prompt} (empty keeps current {})", util::redact(&current))
        };
        let answer = self.prompter.secret(&prompt)?;
        if !answer.is_empty() {
            self.layers.set(path, answer);
        }
        Ok(())
    }

    fn ask_namespace(&mut self) -> Asked {
        self.ask_field("namespace", "Namespace")
    }

    fn ask_provider(&mut self) -> Asked {
        let previous = self.layers.provider();
        let choices = CloudProvider::all();
        let labels: Vec<&str> = choices.iter().map(CloudProvider::label).collect();
        let default = if self.layers.is_set("cloudProvider") {
            choices
                .iter()
                .position(|provider| *provider == previous)
                .unwrap_or(0)
        } else {
            0
        };
        let chosen = self.prompter.select("Cloud provider", &labels, default)?;
        let provider = choices[chosen];
        if provider != previous {
            // Provider-derived values follow the new provider.
            self.layers.unset("cloud.region");
            self.layers.unset("clickhouse.s3.useEnvironmentCredentials");
            self.layers.unset("clickhouse.s3.endpoint");
            self.layers.unset("clickhouse.s3.region");
        }
        self.layers.set("cloudProvider", provider.as_str());

        match provider {
            CloudProvider::Aws => {
                let current = self.layers.get_str("cloud.clusterName");
                let default = Some(current)
                    .filter(|name| !name.is_empty())
                    .or_else(|| self.hints.eks_cluster());
                let name = self.ask_text("cloud.clusterName", "EKS cluster name", default)?;
                self.layers.set("cloud.clusterName", name);
                self.prompter
                    .note(Tone::Info, "Common AWS regions: us-east-1, us-west-2, eu-west-1");
                self.ask_field("cloud.region", "AWS region")?;
                let role = self.layers.get_str("cloud.nodeRoleName");
                let role = self.ask_text(
                    "cloud.nodeRoleName",
                    "Node group IAM role (empty to detect)",
                    Some(role),
                )?;
                if role.is_empty() {
                    self.layers.unset("cloud.nodeRoleName");
                } else {
                    self.layers.set("cloud.nodeRoleName", role);
                }
            }
            CloudProvider::Gcp => {
                let current = self.layers.get_str("cloud.gcpProjectId");
                let detected = self.hints.gcp_project();
                if current.is_empty() {
                    if let Some(project) = &detected {
                        self.prompter.note(
                            Tone::Success,
                            &format!("Detected GCP project from context: {project}"),
                        );
                    }
                }
                let default = Some(current).filter(|p| !p.is_empty()).or(detected);
                let project = self.ask_text("cloud.gcpProjectId", "GCP project ID", default)?;
                self.layers.set("cloud.gcpProjectId", project);
                self.prompter
                    .note(Tone::Info, "Common GCP regions: us-central1, us-east1, europe-west1");
                self.ask_field("cloud.region", "GCP region")?;
            }
            CloudProvider::None => {
                self.prompter.note(
                    Tone::Info,
                    "Bucket provisioning and LoadBalancer defaults are skipped for this provider.",
                );
            }
        }
        Ok(())
    }

    fn ask_keys(&mut self) -> Asked {
        self.prompter.note(
            Tone::Warning,
            "REQUIRED: the Data Plane Public Key must be provided by Laminar",
        );
        self.ask_field("dataPlanePublicKey", "Data Plane Public Key")?;
        self.ask_field("clickhouse.user", "ClickHouse user")?;
        self.ask_field("clickhouse.database", "ClickHouse database")?;

        let current = self.layers.get_str("clickhouse.password");
        if !current.is_empty()
            && self
                .prompter
                .confirm("Keep the current ClickHouse password?", true)?
        {
            return Ok(());
        }
        if self
            .prompter
            .confirm("Generate a secure ClickHouse password automatically?", true)?
        {
            let password = util::generate_password();
            self.prompter.note(
                Tone::Success,
                &format!("Generated ClickHouse password ({} hex characters):", password.len()),
            );
            self.prompter.note(Tone::Info, &password);
            self.prompter.note(
                Tone::Warning,
                "Save this password securely; it is stored in the values file.",
            );
            self.layers.set("clickhouse.password", password);
        } else {
            let password = self.prompter.secret("ClickHouse password")?;
            self.layers.set("clickhouse.password", password);
        }
        Ok(())
    }

    fn ask_storage(&mut self) -> Asked {
        let provider = self.layers.provider();
        let enabled_default = if self.layers.is_set("clickhouse.s3.enabled") {
            self.layers.get_bool("clickhouse.s3.enabled")
        } else {
            provider != CloudProvider::None
        };
        let enabled = self.prompter.confirm(
            "Store ClickHouse data in object storage (S3 / GCS)? (recommended for production)",
            enabled_default,
        )?;
        self.layers.set("clickhouse.s3.enabled", enabled);
        self.provision = false;
        if enabled {
            self.ask_bucket(provider)?;
        }
        self.ask_persistence(provider)
    }

    fn ask_bucket(&mut self, provider: CloudProvider) -> Asked {
        let current = self.layers.get_str("clickhouse.s3.bucket");
        let default = if current.is_empty() {
            self.generated_bucket
                .get_or_insert_with(|| format!("{BUCKET_PREFIX}{}", util::bucket_suffix()))
                .clone()
        } else {
            current
        };
        let bucket = self.ask_text("clickhouse.s3.bucket", "Bucket name", Some(default))?;
        self.layers.set("clickhouse.s3.bucket", bucket.as_str());

        if provider == CloudProvider::None {
            self.ask_field("clickhouse.s3.endpoint", "S3-compatible endpoint URL")?;
            self.ask_field("clickhouse.s3.region", "Bucket region")?;
            let use_env = self.prompter.confirm(
                "Use environment credentials for bucket access?",
                self.layers.get_bool("clickhouse.s3.useEnvironmentCredentials"),
            )?;
            return self.ask_credentials(use_env);
        }

        let region = self.layers.get_str("cloud.region");
        self.layers.set("clickhouse.s3.region", region.as_str());
        self.layers.set(
            "clickhouse.s3.endpoint",
            storage_endpoint(provider, &bucket, &region),
        );

        let cli_ready = self.hints.has_cloud_cli(provider);
        if cli_ready {
            self.provision = self
                .prompter
                .confirm("Create the bucket and grant access automatically?", true)?;
        } else {
            let cli = crate::cluster::cloud_cli(provider).unwrap_or("cloud CLI");
            self.prompter.note(
                Tone::Warning,
                &format!("{cli} not found: create the bucket and grant access manually"),
            );
        }

        match provider {
            CloudProvider::Aws if self.provision => {
                self.prompter.note(
                    Tone::Info,
                    "Bucket access will be granted to the node IAM role.",
                );
                self.ask_credentials(true)
            }
            CloudProvider::Aws => {
                let use_env = self.prompter.confirm(
                    "Use the node IAM role for bucket access? (recommended)",
                    self.layers.get_bool("clickhouse.s3.useEnvironmentCredentials"),
                )?;
                self.ask_credentials(use_env)
            }
            _ => {
                self.prompter.note(
                    Tone::Info,
                    "ClickHouse reaches GCS with HMAC keys; workload identity is not supported.",
                );
                if self.provision {
                    self.layers.set("clickhouse.s3.useEnvironmentCredentials", false);
                    self.prompter.note(
                        Tone::Info,
                        "HMAC keys will be created for the laminar-workload service account.",
                    );
                    Ok(())
                } else {
                    self.ask_credentials(false)
                }
            }
        }
    }

    fn ask_credentials(&mut self, use_env: bool) -> Asked {
        self.layers
            .set("clickhouse.s3.useEnvironmentCredentials", use_env);
        if use_env {
            self.layers.set("clickhouse.s3.accessKeyId", "");
            self.layers.set("clickhouse.s3.secretAccessKey", "");
            return Ok(());
        }
        self.ask_field("clickhouse.s3.accessKeyId", "Access key ID")?;
        self.ask_secret("clickhouse.s3.secretAccessKey", "Secret access key")
    }

    fn ask_persistence(&mut self, provider: CloudProvider) -> Asked {
        let path = "clickhouse.persistence.storageClass";
        let current = self.layers.get_str(path);
        let recommended = self.hints.storage_class_for(provider);
        match &recommended {
            Some(class) => self
                .prompter
                .note(Tone::Success, &format!("Recommended storage class: {class}")),
            None => self.prompter.note(
                Tone::Warning,
                "No storage class detected; leave empty to use the cluster default.",
            ),
        }
        let default = Some(current).filter(|c| !c.is_empty()).or(recommended);
        let class = self.ask_text(
            path,
            "ClickHouse storage class (empty for cluster default)",
            default,
        )?;
        self.layers.set(path, class);
        self.ask_field("clickhouse.persistence.size", "ClickHouse volume size")
    }

    fn ask_resources(&mut self) -> Asked {
        self.drop_blank_annotation_keys();
        if !self.update && !self.prompter.confirm("Configure advanced options?", false)? {
            return Ok(());
        }
        self.ask_number::<u32>("dataPlaneProxy.replicaCount", "Proxy replicas", 1, 100)?;
        for (prefix, label) in [
            ("dataPlaneProxy.resources", "Proxy"),
            ("clickhouse.resources", "ClickHouse"),
        ] {
            for (kind, what) in [("cpu", "CPU"), ("memory", "memory")] {
                for bound in ["request", "limit"] {
                    self.ask_field(
                        &format!("{prefix}.{kind}.{bound}"),
                        &format!("{label} {what} {bound}"),
                    )?;
                }
            }
        }

        let enabled = self.prompter.confirm(
            "Expose the proxy through a LoadBalancer service?",
            self.layers.get_bool("dataPlaneProxy.loadBalancer.enabled"),
        )?;
        self.layers.set("dataPlaneProxy.loadBalancer.enabled", enabled);
        if !enabled {
            return Ok(());
        }
        self.ask_number::<u16>("dataPlaneProxy.loadBalancer.port", "LoadBalancer port", 1, 65535)?;
        self.ask_annotations()
    }

    fn ask_annotations(&mut self) -> Asked {
        let path = ANNOTATIONS_PATH;
        let defaults = chart::provider_annotations(self.layers.provider());
        if !defaults.is_empty() {
            self.prompter
                .note(Tone::Info, "Provider LoadBalancer annotations applied automatically:");
            for (key, value) in &defaults {
                self.prompter.note(Tone::Info, &format!("  {key}: {value}"));
            }
        }
        if !self
            .prompter
            .confirm("Add or override LoadBalancer annotations?", false)?
        {
            return Ok(());
        }
        let mut annotations = self.stored_annotations();
        loop {
            let key = self.ask_text(
                &format!("{path}.key"),
                "Annotation key (empty to finish)",
                None,
            )?;
            if key.is_empty() {
                break;
            }
            let current = annotations
                .get(&key)
                .or_else(|| defaults.get(&key))
                .cloned();
            let prompt = format!("Value for {key} ('{REMOVE_ANNOTATION}' to remove)");
            let value = self.ask_text(&format!("{path}.value"), &prompt, current)?;
            if value == REMOVE_ANNOTATION {
                if annotations.remove(&key).is_some() {
                    self.prompter.note(Tone::Info, &format!("Removed annotation {key}"));
                }
            } else {
                annotations.insert(key, value);
            }
        }
        self.store_annotations(&annotations);
        Ok(())
    }

    fn stored_annotations(&self) -> BTreeMap<String, String> {
        self.layers
            .get(ANNOTATIONS_PATH)
            .and_then(|value| serde_yaml::from_value(value).ok())
            .unwrap_or_default()
    }

    fn store_annotations(&mut self, annotations: &BTreeMap<String, String>) {
        let value = serde_yaml::to_value(annotations).unwrap_or(Value::Null);
        self.layers.set(ANNOTATIONS_PATH, value);
    }

    /// Blank annotation keys cannot be entered or edited at the prompt.
    fn drop_blank_annotation_keys(&mut self) {
        let mut annotations = self.stored_annotations();
        let before = annotations.len();
        annotations.retain(|key, _| !key.trim().is_empty());
        if annotations.len() != before {
            self.prompter
                .note(Tone::Warning, "Dropped LoadBalancer annotation with an empty key");
            self.store_annotations(&annotations);
        }
    }
}
