//! Mock organization directory for testing
//!
//! Serves a canned membership listing without making HTTP calls.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::directory::{MembershipListing, OrgDirectory};
use super::model::Organization;
use crate::error::{ApiError, Result};

/// Mock directory for testing.
///
/// # Example
/// ```ignore
/// let mock = MockOrgDirectory::new()
///     .with_orgs(vec![Organization::new("a", "A", OrgType::Business, OrgRole::Owner)])
///     .with_default_org("a");
///
/// let listing = mock.list_memberships().await?;
/// assert_eq!(listing.orgs.len(), 1);
/// ```
#[derive(Default)]
pub struct MockOrgDirectory {
    /// Listing to return from list_memberships
    listing: Arc<Mutex<MembershipListing>>,
    /// Error to return (if any) - consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    /// Simulated network latency
    delay: Option<Duration>,
    /// Track number of calls for verification
    call_count: Arc<AtomicUsize>,
}

impl MockOrgDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orgs(self, orgs: Vec<Organization>) -> Self {
        self.listing.try_lock().expect("mock not shared yet").orgs = orgs;
        self
    }

    pub fn with_default_org(self, org_id: &str) -> Self {
        self.listing.try_lock().expect("mock not shared yet").default_org_id =
            Some(org_id.to_string());
        self
    }

    pub fn with_listing(self, listing: MembershipListing) -> Self {
        *self.listing.try_lock().expect("mock not shared yet") = listing;
        self
    }

    /// Fail the next call
    pub fn with_error(self) -> Self {
        *self.error.try_lock().expect("mock not shared yet") = Some(ApiError::Http {
            status: 500,
            status_text: "Internal Server Error".to_string(),
            message: "mock failure".to_string(),
            body: serde_json::Value::Null,
        });
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of list_memberships calls so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrgDirectory for MockOrgDirectory {
    async fn list_memberships(&self) -> Result<MembershipListing> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.error.lock().await.take() {
            return Err(err.into());
        }

        Ok(self.listing.lock().await.clone())
    }
}
