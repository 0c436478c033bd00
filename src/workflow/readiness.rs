//! Post-apply readiness: pod waits, then polling the load balancer for an
//! external address.
use crate::chart;
use crate::error::{Error, Result};
use crate::exec::{argv, CommandRunner};
use crate::ui;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Values kubectl prints for an unassigned jsonpath field.
const PLACEHOLDERS: [&str; 2] = ["<none>", "null"];

/// How long and how often to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl ReadinessPolicy {
    /// When the whole readiness phase must be over, counted from now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    /// The same policy with only the time left before `deadline`.
    pub fn until(&self, deadline: Instant) -> Self {
        Self {
            interval: self.interval,
            timeout: deadline.saturating_duration_since(Instant::now()),
        }
    }
}

/// `kubectl wait` timeout for what is left of the budget, rounded up to a
/// whole second.
fn wait_timeout_flag(deadline: Instant) -> String {
    let left = deadline.saturating_duration_since(Instant::now());
    let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
    format!("--timeout={}s", secs.max(1))
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Wait for the ClickHouse and proxy pods, all within `deadline`. Failures
/// are reported and tolerated; the load balancer poll decides the outcome.
pub fn wait_for_pods(runner: &dyn CommandRunner, namespace: &str, deadline: Instant) -> bool {
    let mut all_ready = true;
    for (component, label) in [
        (chart::CLICKHOUSE_COMPONENT, "ClickHouse"),
        (chart::PROXY_COMPONENT, "Data Plane Proxy"),
    ] {
        ui::info(&format!("Waiting for {label} pods..."));
        let selector = chart::component_selector(component);
        let timeout = wait_timeout_flag(deadline);
        let args = argv(&[
            "wait",
            "--for=condition=ready",
            "pod",
            "-l",
            &selector,
            "-n",
            namespace,
            &timeout,
        ]);
        match runner.run("kubectl", &args) {
            Ok(output) if output.success() => ui::success(&format!("{label} is ready")),
            Ok(output) => {
                all_ready = false;
                warn!(component, stderr = %output.stderr.trim(), "pods not ready");
                ui::warning(&format!("{label} pods not ready yet"));
            }
            Err(err) => {
                all_ready = false;
                warn!(component, error = %err, "could not run kubectl wait");
                ui::warning(&format!("Could not wait for {label} pods: {err}"));
            }
        }
    }
    all_ready
}

/// External hostname or IP of a LoadBalancer service, if assigned.
pub fn load_balancer_address(
    runner: &dyn CommandRunner,
    namespace: &str,
    service: &str,
) -> Option<String> {
    ["hostname", "ip"].iter().find_map(|field| {
        let jsonpath = format!("jsonpath={{.status.loadBalancer.ingress[0].{field}}}");
        let args = argv(&["get", "svc", service, "-n", namespace, "-o", &jsonpath]);
        let output = runner.run("kubectl", &args).ok()?;
        let value = output.stdout.trim();
        (output.success() && !value.is_empty() && !PLACEHOLDERS.contains(&value))
            .then(|| value.to_string())
    })
}

/// Poll the service until it has an address or the policy times out.
pub fn wait_for_address(
    runner: &dyn CommandRunner,
    namespace: &str,
    service: &str,
    policy: &ReadinessPolicy,
) -> Result<String> {
    let start = Instant::now();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if let Some(address) = load_balancer_address(runner, namespace, service) {
            info!(service, attempt, address = %address, "load balancer ready");
            return Ok(address);
        }
        let waited = start.elapsed();
        if waited >= policy.timeout {
            return Err(Error::ReadinessTimeout {
                service: service.to_string(),
                namespace: namespace.to_string(),
                waited: policy.timeout,
            });
        }
        debug!(service, attempt, "load balancer has no address yet");
        ui::info(&format!(
            "Waiting for LoadBalancer address ({} elapsed)",
            ui::format_elapsed(waited)
        ));
        std::thread::sleep(policy.interval.min(policy.timeout - waited));
    }
}
