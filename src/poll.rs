use crate::client_defaults::{
    REPLICATION_MIN_DELAY, REPLICATION_TARGET_OCCURRENCE, REPLICATION_TIMEOUT,
};
use crate::error::Error;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Waits out replication delay after creating a top-level object.
///
/// The lookup returns `Ok(None)` while the object is not yet visible. Any
/// other error ends the wait immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReplicationWait {
    pub(crate) timeout: Duration,
    pub(crate) min_delay: Duration,
    pub(crate) target_occurrence: u32,
}

impl Default for ReplicationWait {
    fn default() -> Self {
        Self {
            timeout: REPLICATION_TIMEOUT,
            min_delay: REPLICATION_MIN_DELAY,
            target_occurrence: REPLICATION_TARGET_OCCURRENCE,
        }
    }
}

impl ReplicationWait {
    pub(crate) async fn until_found<T, F, Fut>(
        &self,
        what: &'static str,
        object_id: &str,
        mut lookup: F,
    ) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, Error>>,
    {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut consecutive = 0u32;
        loop {
            match lookup().await? {
                Some(found) => {
                    consecutive += 1;
                    debug!(
                        "{what} {object_id:?} found ({consecutive}/{})",
                        self.target_occurrence
                    );
                    if consecutive >= self.target_occurrence {
                        return Ok(found);
                    }
                }
                None => {
                    if consecutive > 0 {
                        debug!("{what} {object_id:?} disappeared again, restarting count");
                    }
                    consecutive = 0;
                }
            }
            if Instant::now() + self.min_delay > deadline {
                warn!(
                    "timed out waiting for {what} {object_id:?} after {:?}",
                    started.elapsed()
                );
                return Err(Error::ReplicationTimeout {
                    what,
                    object_id: object_id.to_string(),
                    waited_secs: self.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.min_delay).await;
        }
    }
}
