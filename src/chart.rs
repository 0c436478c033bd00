//! Effective chart values handed to `helm`.
//!
//! The persisted document carries only user annotations. Provider defaults are
//! merged in when values are rendered, so a document never goes stale when the
//! defaults change.
use crate::values::{CloudProvider, Configuration};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Helm release name.
pub const RELEASE_NAME: &str = "laminar-dataplane";

/// Prefix shared by every resource the chart creates.
pub const NAME_PREFIX: &str = "laminar-";

pub const CLICKHOUSE_COMPONENT: &str = "clickhouse";
pub const PROXY_COMPONENT: &str = "data-plane-proxy";
pub const LOAD_BALANCER_COMPONENT: &str = "data-plane-proxy-lb";

const AWS_LB_ANNOTATIONS: [(&str, &str); 4] = [
    ("service.beta.kubernetes.io/aws-load-balancer-type", "nlb"),
    ("service.beta.kubernetes.io/aws-load-balancer-scheme", "internet-facing"),
    ("service.beta.kubernetes.io/aws-load-balancer-nlb-target-type", "ip"),
    (
        "service.beta.kubernetes.io/aws-load-balancer-cross-zone-load-balancing-enabled",
        "true",
    ),
];

const GCP_LB_ANNOTATIONS: [(&str, &str); 1] = [("cloud.google.com/l4-rbs", "enabled")];

/// Load balancer annotations implied by the provider.
pub fn provider_annotations(provider: CloudProvider) -> BTreeMap<String, String> {
    let fixed: &[(&str, &str)] = match provider {
        CloudProvider::Aws => &AWS_LB_ANNOTATIONS,
        CloudProvider::Gcp => &GCP_LB_ANNOTATIONS,
        CloudProvider::None => &[],
    };
    fixed
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Union of both maps; on a shared key the user's value wins.
pub fn merge_annotations(
    user_overrides: &BTreeMap<String, String>,
    provider_defaults: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = provider_defaults.clone();
    merged.extend(
        user_overrides
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    merged
}

/// Full resource name for a chart component; already-prefixed names pass through.
pub fn prefixed_name(name: &str) -> String {
    if name.starts_with(NAME_PREFIX) {
        name.to_string()
    } else {
        format!("{NAME_PREFIX}{name}")
    }
}

/// Name of the proxy's load balancer service.
pub fn load_balancer_service() -> String {
    prefixed_name(LOAD_BALANCER_COMPONENT)
}

/// Pod selector for a chart component.
pub fn component_selector(component: &str) -> String {
    format!("app.kubernetes.io/name={}", prefixed_name(component))
}

/// Annotations the load balancer service ends up with.
pub fn effective_annotations(config: &Configuration) -> BTreeMap<String, String> {
    merge_annotations(
        &config.data_plane_proxy.load_balancer.annotations,
        &provider_annotations(config.provider()),
    )
}

/// Values override layer for `helm upgrade --install -f`.
pub fn render_values(config: &Configuration) -> Result<Value, serde_yaml::Error> {
    let mut effective = config.clone();
    effective.cloud_provider = config.provider().as_str().to_string();
    effective.data_plane_proxy.load_balancer.annotations = effective_annotations(config);
    serde_yaml::to_value(&effective)
}

pub fn render_values_yaml(config: &Configuration) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&render_values(config)?)
}

#[cfg(test)]
#[path = "chart_tests.rs"]
mod tests;
