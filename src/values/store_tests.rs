use super::*;
use crate::values::CloudProvider;

fn sample_config() -> Configuration {
    let mut config = Configuration {
        cloud_provider: CloudProvider::Aws.as_str().to_string(),
        data_plane_public_key: "pk-live".to_string(),
        ..Configuration::default()
    };
    config.cloud.region = "us-east-1".to_string();
    config.cloud.cluster_name = "prod".to_string();
    config.clickhouse.password = "secret".to_string();
    config
}

#[test]
fn missing_document_is_reported_as_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ConfigStore::new(dir.path().join("laminar.yaml"));
    assert!(!store.exists());
    assert!(matches!(store.load(), Err(Error::ConfigNotFound { .. })));
}

#[test]
fn persisted_document_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ConfigStore::new(dir.path().join("laminar.yaml"));
    let config = sample_config();

    assert_eq!(store.persist(&config, None).expect("persist"), PersistOutcome::Written);
    let loaded = store.load().expect("load");
    assert_eq!(loaded.config, config);
    assert!(String::from_utf8_lossy(&loaded.bytes).starts_with("# Laminar"));

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name() != "laminar.yaml")
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind");
}

#[test]
fn unchanged_configuration_keeps_bytes_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("laminar.yaml");
    let hand_edited = "\
# my notes
cloudProvider: aws
dataPlanePublicKey: pk-live
cloud: {region: us-east-1, clusterName: prod}
clickhouse:
  password: secret
";
    fs::write(&path, hand_edited).expect("seed");
    let store = ConfigStore::new(&path);
    let loaded = store.load().expect("load");

    let outcome = store.persist(&loaded.config.clone(), Some(&loaded)).expect("persist");
    assert_eq!(outcome, PersistOutcome::Unchanged);
    assert_eq!(fs::read_to_string(&path).expect("read"), hand_edited);
}

#[test]
fn changed_configuration_is_rewritten() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ConfigStore::new(dir.path().join("laminar.yaml"));
    store.persist(&sample_config(), None).expect("persist");
    let loaded = store.load().expect("load");

    let mut changed = loaded.config.clone();
    changed.data_plane_proxy.replica_count = 3;
    let outcome = store.persist(&changed, Some(&loaded)).expect("persist");
    assert_eq!(outcome, PersistOutcome::Written);
    assert_eq!(store.load().expect("reload").config.data_plane_proxy.replica_count, 3);
}

#[test]
fn malformed_documents_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("laminar.yaml");
    let store = ConfigStore::new(&path);

    fs::write(&path, "namespace: [unterminated").expect("seed");
    assert!(matches!(store.load(), Err(Error::InvalidDocument { .. })));

    fs::write(&path, "- just\n- a list\n").expect("seed");
    assert!(matches!(store.load(), Err(Error::InvalidDocument { .. })));

    fs::write(&path, "dataPlaneProxy:\n  loadBalancer:\n    port: not-a-port\n").expect("seed");
    assert!(matches!(store.load(), Err(Error::InvalidDocument { .. })));
}

#[test]
fn empty_document_loads_as_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("laminar.yaml");
    fs::write(&path, "").expect("seed");
    let loaded = ConfigStore::new(&path).load().expect("load");
    assert_eq!(loaded.config, Configuration::default());
}

#[test]
fn unwritable_location_fails_before_anything_else() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ConfigStore::new(dir.path().join("missing").join("laminar.yaml"));
    assert!(matches!(
        store.ensure_writable(),
        Err(Error::Persistence { .. })
    ));

    let ok = ConfigStore::new(dir.path().join("laminar.yaml"));
    assert!(ok.ensure_writable().is_ok());
    assert!(!ok.exists());
}
