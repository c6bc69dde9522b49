//! Farm directory port: farm and device metadata lookups.

use std::future::Future;

use farmhub_domain::error::FarmHubError;
use farmhub_domain::farm::{Device, Farm};
use farmhub_domain::id::FarmId;

/// Read-only lookup of farms and the devices registered to them.
pub trait FarmDirectory {
    /// Get a farm by id, `None` if it does not exist.
    fn get_farm(
        &self,
        id: FarmId,
    ) -> impl Future<Output = Result<Option<Farm>, FarmHubError>> + Send;

    /// Every device registered to `farm_id`.
    fn devices_for_farm(
        &self,
        farm_id: FarmId,
    ) -> impl Future<Output = Result<Vec<Device>, FarmHubError>> + Send;
}

impl<T: FarmDirectory + Send + Sync> FarmDirectory for std::sync::Arc<T> {
    fn get_farm(
        &self,
        id: FarmId,
    ) -> impl Future<Output = Result<Option<Farm>, FarmHubError>> + Send {
        (**self).get_farm(id)
    }

    fn devices_for_farm(
        &self,
        farm_id: FarmId,
    ) -> impl Future<Output = Result<Vec<Device>, FarmHubError>> + Send {
        (**self).devices_for_farm(farm_id)
    }
}
