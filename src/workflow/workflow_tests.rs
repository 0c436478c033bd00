use super::*;
use crate::exec::testing::ScriptedRunner;
use crate::exec::CommandOutput;
use crate::cluster::ClusterHints;
use crate::session::scripted::{text, Answer, ScriptedPrompter};
use crate::session::Session;
use std::path::{Path, PathBuf};
use std::time::Duration;

const STORAGE_CLASSES: &str = r#"{"items": [{"metadata": {"name": "standard",
  "annotations": {"storageclass.kubernetes.io/is-default-class": "true"}}}]}"#;

/// A cluster where everything succeeds and the load balancer has an IP.
fn healthy_cluster(call: &[String]) -> CommandOutput {
    let words: Vec<&str> = call.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["kubectl", "config", "current-context"] => CommandOutput::ok("kind-laminar\n"),
        ["kubectl", "get", "storageclass", ..] => CommandOutput::ok(STORAGE_CLASSES),
        ["kubectl", "wait", ..] => CommandOutput::ok("condition met"),
        ["kubectl", "get", "svc", .., jsonpath] if jsonpath.contains(".ip") => {
            CommandOutput::ok("203.0.113.7")
        }
        ["kubectl", "get", "svc", ..] => CommandOutput::ok(""),
        ["helm", "upgrade", ..] => CommandOutput::ok(""),
        _ => CommandOutput::failed(1, format!("unexpected command: {}", call.join(" "))),
    }
}

fn options(dir: &Path) -> InstallOptions {
    InstallOptions {
        paths: InstallPaths::new(dir.to_path_buf(), None),
        release: chart::RELEASE_NAME.to_string(),
        readiness: ReadinessPolicy {
            interval: Duration::ZERO,
            timeout: Duration::ZERO,
        },
        assume_yes: false,
        reconfigure: Vec::new(),
    }
}

const HAND_EDITED: &str = "\
# edited by hand
namespace: laminar
cloudProvider: none
dataPlanePublicKey: pk-live
clickhouse:
  password: 'kept-secret'
";

fn write_document(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("laminar.yaml");
    std::fs::write(&path, text).expect("write document");
    path
}

#[test]
fn update_without_changes_keeps_document_bytes_and_reapplies() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_document(dir.path(), HAND_EDITED);
    let runner = ScriptedRunner::new(healthy_cluster);
    let mut prompter = ScriptedPrompter::new([]);

    run_update(&options(dir.path()), &runner, &mut prompter).expect("update succeeds");

    assert_eq!(std::fs::read_to_string(&path).expect("read"), HAND_EDITED);
    assert_eq!(runner.calls_matching(&["helm", "upgrade", "--install"]), 1);
    assert_eq!(runner.calls_matching(&["kubectl", "get", "storageclass"]), 0);
    assert_eq!(runner.calls_matching(&["kubectl", "wait"]), 2);
}

#[test]
fn update_without_document_fails_before_touching_the_cluster() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = ScriptedRunner::new(healthy_cluster);
    let mut prompter = ScriptedPrompter::new([]);

    let err = run_update(&options(dir.path()), &runner, &mut prompter).expect_err("no document");
    assert!(matches!(err, Error::ConfigNotFound { .. }));
    assert!(runner.calls().is_empty());
}

#[test]
fn readiness_timeout_keeps_the_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_document(dir.path(), HAND_EDITED);
    let runner = ScriptedRunner::new(|call: &[String]| {
        let words: Vec<&str> = call.iter().map(String::as_str).collect();
        if matches!(words.as_slice(), ["kubectl", "get", "svc", ..]) {
            CommandOutput::ok("<none>")
        } else {
            healthy_cluster(call)
        }
    });
    let mut prompter = ScriptedPrompter::new([]);

    let err = run_update(&options(dir.path()), &runner, &mut prompter).expect_err("timeout");
    assert!(matches!(err, Error::ReadinessTimeout { .. }));
    assert!(err.is_warning());
    assert_eq!(std::fs::read_to_string(&path).expect("read"), HAND_EDITED);
}

#[test]
fn failed_helm_apply_is_reported_after_persisting() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_document(dir.path(), HAND_EDITED);
    let runner = ScriptedRunner::new(|call: &[String]| {
        if call.first().map(String::as_str) == Some("helm") {
            CommandOutput::failed(1, "")
        } else {
            healthy_cluster(call)
        }
    });
    let mut options = options(dir.path());
    options.reconfigure = vec![Section::Namespace];
    let mut prompter = ScriptedPrompter::new([text("laminar-staging")]);

    let err = run_update(&options, &runner, &mut prompter).expect_err("apply fails");
    assert!(matches!(err, Error::Apply { code: Some(1) }));
    let saved = ConfigStore::new(dir.path().join("laminar.yaml"))
        .load()
        .expect("document readable");
    assert_eq!(saved.config.namespace, "laminar-staging");
}

/// Answers for a fresh install on a cluster without a cloud provider.
fn plain_install_answers() -> Vec<Answer> {
    vec![
        text("laminar"),
        Answer::Choose(2),
        text("pk-123"),
        Answer::Default,
        Answer::Default,
        Answer::Yes,
        Answer::Default,
        Answer::Default,
        Answer::Default,
        Answer::Default,
    ]
}

#[test]
fn declining_deploy_saves_configuration_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = ScriptedRunner::new(healthy_cluster);
    let mut answers = plain_install_answers();
    answers.push(Answer::No);
    let mut prompter = ScriptedPrompter::new(answers);

    run_install(&options(dir.path()), &runner, &mut prompter).expect("install succeeds");

    let saved = ConfigStore::new(dir.path().join("laminar.yaml"))
        .load()
        .expect("document saved");
    assert_eq!(saved.config.namespace, "laminar");
    assert_eq!(saved.config.cloud_provider, "none");
    assert_eq!(saved.config.clickhouse.persistence.storage_class, "standard");
    assert_eq!(saved.config.clickhouse.password.len(), 128);
    assert!(prompter.saw("Deploy now?"));
    assert_eq!(runner.calls_matching(&["helm"]), 0);
}

#[test]
fn confirmed_install_deploys_and_waits_for_address() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = ScriptedRunner::new(healthy_cluster);
    let mut answers = plain_install_answers();
    answers.push(Answer::Yes);
    let mut prompter = ScriptedPrompter::new(answers);

    run_install(&options(dir.path()), &runner, &mut prompter).expect("install succeeds");

    assert_eq!(runner.calls_matching(&["helm", "upgrade", "--install", "laminar-dataplane"]), 1);
    assert!(runner.calls_matching(&["kubectl", "get", "svc", "laminar-data-plane-proxy-lb"]) >= 1);
    assert_eq!(prompter.remaining(), 0);
}

#[test]
fn aborted_session_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = ScriptedRunner::new(healthy_cluster);
    let mut prompter = ScriptedPrompter::new([Answer::Interrupt, Answer::No]);

    let err = run_install(&options(dir.path()), &runner, &mut prompter).expect_err("aborted");
    assert!(matches!(err, Error::Aborted));
    assert_eq!(err.exit_code(), 130);
    assert!(!dir.path().join("laminar.yaml").exists());
    assert_eq!(runner.calls_matching(&["helm"]), 0);
}

/// AWS account where the bucket does not exist yet.
fn empty_aws_account(call: &[String]) -> CommandOutput {
    let words: Vec<&str> = call.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["aws", "s3api", "head-bucket", ..] => {
            CommandOutput::failed(254, "An error occurred (404) when calling the HeadBucket operation: Not Found")
        }
        ["aws", "s3", "mb", ..] | ["aws", "iam", "put-role-policy", ..] => CommandOutput::ok(""),
        ["aws", "eks", "list-nodegroups", ..] => CommandOutput::ok(r#"{"nodegroups": ["workers"]}"#),
        ["aws", "eks", "describe-nodegroup", ..] => {
            CommandOutput::ok("arn:aws:iam::123456789012:role/eks-workers-role\n")
        }
        _ => CommandOutput::failed(2, format!("unexpected command: {}", call.join(" "))),
    }
}

#[test]
fn provisioned_aws_storage_uses_the_node_role() {
    let hints = ClusterHints {
        context: Some("arn:aws:eks:us-east-1:123456789012:cluster/prod".to_string()),
        aws_cli: true,
        ..ClusterHints::default()
    };
    let mut prompter = ScriptedPrompter::new([
        text("laminar"),
        Answer::Choose(0),
        Answer::Default,
        Answer::Default,
        Answer::Default,
        text("pk-123"),
        Answer::Default,
        Answer::Default,
        Answer::Yes,
        Answer::Yes,
        text("laminar-data-test"),
        Answer::Yes,
        text("gp3"),
        Answer::Default,
        Answer::Default,
    ]);
    let outcome = Session::fresh(&mut prompter, &hints, None)
        .run()
        .expect("session confirms");
    assert!(outcome.provision);
    assert!(!prompter.saw("Access key ID"));

    let runner = ScriptedRunner::new(empty_aws_account);
    let config = finalize(&runner, outcome).expect("finalize");

    let s3 = &config.clickhouse.s3;
    assert!(s3.use_environment_credentials);
    assert!(s3.access_key_id.is_empty());
    assert_eq!(s3.bucket, "laminar-data-test");
    assert_eq!(runner.calls_matching(&["aws", "s3", "mb"]), 1);
    assert_eq!(runner.calls_matching(&["aws", "iam", "put-role-policy"]), 1);
}
