use super::{Credentials, ProvisionError, ProvisionRequest, Provisioner};
use crate::values::CloudProvider;
use tracing::debug;

/// Used when object storage is disabled or the provider is not managed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneProvisioner;

impl Provisioner for NoneProvisioner {
    fn provider(&self) -> CloudProvider {
        CloudProvider::None
    }

    fn provision(&self, _request: &ProvisionRequest) -> Result<Credentials, ProvisionError> {
        debug!("object storage provisioning skipped");
        Ok(Credentials::empty())
    }
}
