use std::time::Duration;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

pub(crate) const AAD_GRAPH_API_VERSION: &str = "1.6";
pub(crate) const MSGRAPH_API_VERSION: &str = "beta";

/// Upper bound on waiting for a freshly created object to become readable.
pub(crate) const REPLICATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub(crate) const REPLICATION_MIN_DELAY: Duration = Duration::from_secs(1);
/// Consecutive successful reads required before a new object counts as replicated.
pub(crate) const REPLICATION_TARGET_OCCURRENCE: u32 = 10;
