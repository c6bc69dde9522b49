//! Rule repository port.

use std::future::Future;

use farmhub_domain::error::FarmHubError;
use farmhub_domain::rule::Rule;

/// Read-only access to the rules owned by the metadata service.
pub trait RuleRepository {
    /// Every rule whose `enabled` flag is set.
    fn list_enabled(&self) -> impl Future<Output = Result<Vec<Rule>, FarmHubError>> + Send;
}

impl<T: RuleRepository + Send + Sync> RuleRepository for std::sync::Arc<T> {
    fn list_enabled(&self) -> impl Future<Output = Result<Vec<Rule>, FarmHubError>> + Send {
        (**self).list_enabled()
    }
}
