//! Shared test infrastructure: a scratch chart directory and stub `kubectl`
//! / `helm` executables on an isolated PATH.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const KUBECTL_STUB: &str = r#"#!/bin/sh
printf 'kubectl %s\n' "$*" >> "$STUB_LOG"
case "$*" in
  "config current-context") echo "kind-laminar" ;;
  *"get storageclass"*) echo '{"items": []}' ;;
  *"ingress[0].ip"*) echo "$STUB_LB_IP" ;;
  *"get svc"*) echo "" ;;
  *) ;;
esac
"#;

const HELM_STUB: &str = r#"#!/bin/sh
printf 'helm %s\n' "$*" >> "$STUB_LOG"
exit "${STUB_HELM_EXIT:-0}"
"#;

pub struct Sandbox {
    pub dir: TempDir,
    bin_dir: PathBuf,
}

impl Sandbox {
    /// Scratch directory with `kubectl` and `helm` stubs installed.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let bin_dir = dir.path().join("bin");
        fs::create_dir_all(&bin_dir).expect("create bin dir");
        let sandbox = Self { dir, bin_dir };
        sandbox.install_stub("kubectl", KUBECTL_STUB);
        sandbox.install_stub("helm", HELM_STUB);
        sandbox
    }

    /// Scratch directory with nothing on PATH.
    pub fn without_tools() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let bin_dir = dir.path().join("bin");
        fs::create_dir_all(&bin_dir).expect("create bin dir");
        Self { dir, bin_dir }
    }

    fn install_stub(&self, name: &str, script: &str) {
        let path = self.bin_dir.join(name);
        fs::write(&path, script).expect("write stub");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod stub");
        }
    }

    pub fn chart_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn values_file(&self) -> PathBuf {
        self.dir.path().join("laminar.yaml")
    }

    pub fn write_values(&self, text: &str) {
        fs::write(self.values_file(), text).expect("write values file");
    }

    /// Commands the stubs were invoked with, one per line.
    pub fn stub_log(&self) -> String {
        fs::read_to_string(self.dir.path().join("stub.log")).unwrap_or_default()
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_laminar-install"));
        cmd.env_clear()
            .env("PATH", &self.bin_dir)
            .env("STUB_LOG", self.dir.path().join("stub.log"))
            .env("STUB_LB_IP", "203.0.113.7")
            .env("TERM", "dumb")
            .arg("--chart-dir")
            .arg(self.chart_dir())
            .arg("--poll-interval-secs")
            .arg("0")
            .arg("--readiness-timeout-secs")
            .arg("1");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command().args(args).output().expect("run laminar-install")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
