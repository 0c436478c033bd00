use super::*;
use crate::values::{CloudProvider, Configuration};

fn valid_aws_config() -> Configuration {
    let mut config = Configuration {
        cloud_provider: "aws".to_string(),
        data_plane_public_key: "pk-test".to_string(),
        ..Configuration::default()
    };
    config.cloud.region = "us-east-1".to_string();
    config.cloud.cluster_name = "prod".to_string();
    config.clickhouse.password = "secret".to_string();
    config
}

fn error_paths(config: &Configuration) -> Vec<String> {
    config
        .validate()
        .err()
        .unwrap_or_default()
        .into_iter()
        .map(|err| err.path)
        .collect()
}

#[test]
fn accepts_complete_document() {
    assert_eq!(valid_aws_config().validate(), Ok(()));
}

#[test]
fn rejects_empty_password_regardless_of_other_fields() {
    let mut config = valid_aws_config();
    config.clickhouse.password = String::new();
    assert_eq!(error_paths(&config), vec!["clickhouse.password"]);

    config.clickhouse.password = "   ".to_string();
    assert!(error_paths(&config).contains(&"clickhouse.password".to_string()));
}

#[test]
fn rejects_empty_public_key() {
    let mut config = valid_aws_config();
    config.data_plane_public_key = String::new();
    assert_eq!(error_paths(&config), vec!["dataPlanePublicKey"]);
}

#[test]
fn s3_requires_keys_without_environment_credentials() {
    let mut config = valid_aws_config();
    config.clickhouse.s3.enabled = true;
    config.clickhouse.s3.bucket = "lmnr-clickhouse-data-0123".to_string();
    config.clickhouse.s3.endpoint = "https://s3.us-east-1.amazonaws.com/x/data/".to_string();
    config.clickhouse.s3.region = "us-east-1".to_string();
    config.clickhouse.s3.use_environment_credentials = false;
    config.clickhouse.s3.secret_access_key = "s".to_string();

    assert_eq!(error_paths(&config), vec!["clickhouse.s3.accessKeyId"]);

    let pending = config.validate_with(ValidationOptions {
        credentials_pending: true,
    });
    assert_eq!(pending, Ok(()));
}

#[test]
fn s3_environment_credentials_exclude_explicit_keys() {
    let mut config = valid_aws_config();
    config.clickhouse.s3.enabled = true;
    config.clickhouse.s3.bucket = "laminar-data".to_string();
    config.clickhouse.s3.endpoint = "https://s3.us-east-1.amazonaws.com/laminar-data/data/".into();
    config.clickhouse.s3.region = "us-east-1".to_string();
    config.clickhouse.s3.use_environment_credentials = true;
    assert_eq!(config.validate(), Ok(()));

    config.clickhouse.s3.access_key_id = "AKIA".to_string();
    assert_eq!(
        error_paths(&config),
        vec!["clickhouse.s3.useEnvironmentCredentials"]
    );
}

#[test]
fn disabled_s3_ignores_credential_fields() {
    let mut config = valid_aws_config();
    config.clickhouse.s3.enabled = false;
    config.clickhouse.s3.use_environment_credentials = false;
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn request_above_limit_is_rejected() {
    let mut config = valid_aws_config();
    config.clickhouse.resources.memory.request = "8Gi".to_string();
    config.clickhouse.resources.memory.limit = "4Gi".to_string();
    config.data_plane_proxy.resources.cpu.limit = "lots".to_string();
    assert_eq!(
        error_paths(&config),
        vec![
            "clickhouse.resources.memory.request",
            "dataPlaneProxy.resources.cpu.limit"
        ]
    );
}

#[test]
fn provider_must_be_known() {
    let mut config = valid_aws_config();
    config.cloud_provider = "azure".to_string();
    assert_eq!(error_paths(&config), vec!["cloudProvider"]);
    assert_eq!(config.provider(), CloudProvider::None);

    config.cloud_provider = String::new();
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn provider_specific_identity_is_required() {
    let mut config = valid_aws_config();
    config.cloud_provider = "gcp".to_string();
    assert_eq!(error_paths(&config), vec!["cloud.gcpProjectId"]);
}

#[test]
fn namespace_must_be_a_dns_label() {
    let mut config = valid_aws_config();
    config.namespace = "Laminar_NS".to_string();
    assert_eq!(error_paths(&config), vec!["namespace"]);
}

#[test]
fn bucket_names_follow_provider_rules() {
    assert!(is_valid_bucket_name("lmnr-clickhouse-data-00ff"));
    assert!(!is_valid_bucket_name("ab"));
    assert!(!is_valid_bucket_name("Upper-Case"));
    assert!(!is_valid_bucket_name("-leading-dash"));
    assert!(!is_valid_bucket_name("double..dot"));
}

#[test]
fn naming_patterns_compile_and_accept_valid_names() {
    for pattern in [DNS_LABEL_PATTERN, BUCKET_PATTERN] {
        assert!(Regex::new(pattern).is_ok(), "{pattern}");
    }
    assert!(is_dns_label("laminar-prod"));
    assert!(!is_dns_label("-laminar"));
}

#[test]
fn disabled_load_balancer_ignores_port() {
    let mut config = valid_aws_config();
    config.data_plane_proxy.load_balancer.port = 0;
    assert_eq!(error_paths(&config), vec!["dataPlaneProxy.loadBalancer.port"]);
    config.data_plane_proxy.load_balancer.enabled = false;
    assert_eq!(config.validate(), Ok(()));
}
