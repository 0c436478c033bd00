//! External command seam.
//!
//! Every cloud CLI, `helm` and `kubectl` call goes through [`CommandRunner`]
//! so provisioning, apply and readiness can run against a simulated cluster.
use std::io;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::debug;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[cfg(test)]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner {
    /// Run to completion, capturing stdout and stderr.
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;

    /// Run with the terminal attached so output reaches the user verbatim.
    fn run_streaming(&self, program: &str, args: &[String]) -> io::Result<Option<i32>>;
}

/// Build an owned argument vector from string slices.
pub fn argv<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|item| item.as_ref().to_string()).collect()
}

/// Display form of a command line.
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(program);
    words.extend(args.iter().map(String::as_str));
    shell_words::join(words)
}

/// Runs real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let start = Instant::now();
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            command = %command_line(program, args),
            code = ?result.code,
            elapsed_ms = start.elapsed().as_millis(),
            "command finished"
        );
        Ok(result)
    }

    fn run_streaming(&self, program: &str, args: &[String]) -> io::Result<Option<i32>> {
        let start = Instant::now();
        let status = Command::new(program).args(args).status()?;
        debug!(
            command = %command_line(program, args),
            code = ?status.code(),
            elapsed_ms = start.elapsed().as_millis(),
            "command finished"
        );
        Ok(status.code())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Records every call and answers from a closure over the full argv
    /// (program first).
    pub(crate) struct ScriptedRunner<F> {
        respond: RefCell<F>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl<F> ScriptedRunner<F>
    where
        F: FnMut(&[String]) -> CommandOutput,
    {
        pub(crate) fn new(respond: F) -> Self {
            Self {
                respond: RefCell::new(respond),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }

        /// Calls whose argv starts with the given words.
        pub(crate) fn calls_matching(&self, prefix: &[&str]) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|call| {
                    call.len() >= prefix.len() && call.iter().zip(prefix).all(|(a, b)| a == b)
                })
                .count()
        }

        fn answer(&self, program: &str, args: &[String]) -> CommandOutput {
            let mut full = vec![program.to_string()];
            full.extend_from_slice(args);
            self.calls.borrow_mut().push(full.clone());
            (&mut *self.respond.borrow_mut())(&full)
        }
    }

    impl<F> CommandRunner for ScriptedRunner<F>
    where
        F: FnMut(&[String]) -> CommandOutput,
    {
        fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
            Ok(self.answer(program, args))
        }

        fn run_streaming(&self, program: &str, args: &[String]) -> io::Result<Option<i32>> {
            Ok(self.answer(program, args).code)
        }
    }

    #[test]
    fn scripted_runner_records_calls() {
        let runner = ScriptedRunner::new(|call: &[String]| CommandOutput::ok(call.join(" ")));
        let out = runner.run("kubectl", &argv(&["get", "svc"])).expect("run");
        assert_eq!(out.stdout, "kubectl get svc");
        assert_eq!(runner.calls_matching(&["kubectl", "get"]), 1);
        assert_eq!(runner.calls_matching(&["helm"]), 0);
        assert_eq!(runner.calls().len(), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_quotes_arguments() {
        let line = command_line(
            "aws",
            &argv(&["iam", "put-role-policy", "--policy-document", "{\"a\": 1}"]),
        );
        assert_eq!(line, "aws iam put-role-policy --policy-document '{\"a\": 1}'");
    }

    #[test]
    fn exit_status_helpers() {
        assert!(CommandOutput::ok("").success());
        assert!(!CommandOutput::failed(1, "boom").success());
        assert!(!CommandOutput::default().success());
    }
}
