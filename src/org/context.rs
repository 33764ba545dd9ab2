//! Active-organization state for the signed-in user
//!
//! [`OrgContext`] owns the organization catalog and the current selection.
//! It initializes when a session starts, clears when it ends, persists the
//! selection through a [`PersistentStore`], and fans every change out to
//! registered listeners, the status banner sink and a broadcast channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, error, warn};
use tokio::sync::broadcast;

use super::directory::OrgDirectory;
use super::model::{OrgRole, OrgType, Organization, dedupe_orgs};
use super::status::{LogStatusSink, OrgStatus, OrgStatusSink};
use crate::config::DEFAULT_SELECTED_ORG_KEY;
use crate::error::Result;
use crate::events::{EventEmitter, Subscription};
use crate::platform::{LogNavigator, MemoryStore, Navigator, PersistentStore};
use crate::session::{SessionAccessor, SessionInfo, SessionUser};

/// Capacity of the org-change broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle phase of the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrgPhase {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    /// Signed out; behaves like `Uninitialized`
    Cleared,
}

/// Page-wide notification that the active organization changed
#[derive(Debug, Clone, PartialEq)]
pub struct OrgChanged {
    pub org: Option<Organization>,
}

/// Options for [`OrgContext::select_org`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Reload the page after listeners have been notified
    pub reload: bool,
}

#[derive(Debug, Default)]
struct OrgState {
    phase: OrgPhase,
    current: Option<Organization>,
    available: Vec<Organization>,
    user_default_org_id: Option<String>,
    default_org_missing: bool,
    /// Bumped by `clear` so a running initialization does not resurrect state
    generation: u64,
}

type InitFlight = Shared<BoxFuture<'static, ()>>;

/// The running initialization, tagged so a finishing flight only clears
/// its own slot
struct InFlight {
    id: u64,
    flight: InitFlight,
}

struct Inner {
    directory: Arc<dyn OrgDirectory>,
    session: Arc<dyn SessionAccessor>,
    store: Arc<dyn PersistentStore>,
    navigator: Arc<dyn Navigator>,
    status_sink: Arc<dyn OrgStatusSink>,
    selected_org_key: String,
    state: Mutex<OrgState>,
    listeners: EventEmitter<Option<Organization>>,
    events: broadcast::Sender<OrgChanged>,
    in_flight: Mutex<Option<InFlight>>,
    next_flight_id: AtomicU64,
    session_subscription: Mutex<Option<Subscription>>,
}

/// Active-organization context.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct OrgContext {
    inner: Arc<Inner>,
}

/// Builder for [`OrgContext`]
pub struct OrgContextBuilder {
    directory: Arc<dyn OrgDirectory>,
    session: Arc<dyn SessionAccessor>,
    store: Arc<dyn PersistentStore>,
    navigator: Arc<dyn Navigator>,
    status_sink: Arc<dyn OrgStatusSink>,
    selected_org_key: String,
}

impl OrgContextBuilder {
    pub fn store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.store = store;
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn status_sink(mut self, status_sink: Arc<dyn OrgStatusSink>) -> Self {
        self.status_sink = status_sink;
        self
    }

    pub fn selected_org_key(mut self, key: impl Into<String>) -> Self {
        self.selected_org_key = key.into();
        self
    }

    pub fn build(self) -> OrgContext {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        OrgContext {
            inner: Arc::new(Inner {
                directory: self.directory,
                session: self.session,
                store: self.store,
                navigator: self.navigator,
                status_sink: self.status_sink,
                selected_org_key: self.selected_org_key,
                state: Mutex::new(OrgState::default()),
                listeners: EventEmitter::new(),
                events,
                in_flight: Mutex::new(None),
                next_flight_id: AtomicU64::new(1),
                session_subscription: Mutex::new(None),
            }),
        }
    }
}

impl OrgContext {
    /// Start building a context. Defaults: in-memory store, logging
    /// navigator, logging status sink.
    pub fn builder(
        directory: Arc<dyn OrgDirectory>,
        session: Arc<dyn SessionAccessor>,
    ) -> OrgContextBuilder {
        OrgContextBuilder {
            directory,
            session,
            store: Arc::new(MemoryStore::new()),
            navigator: Arc::new(LogNavigator),
            status_sink: Arc::new(LogStatusSink),
            selected_org_key: DEFAULT_SELECTED_ORG_KEY.to_string(),
        }
    }

    /// Load the catalog and pick the active organization.
    ///
    /// Concurrent callers share one in-flight attempt. Without a signed-in
    /// user this is a no-op. Catalog failures fall back to a single
    /// organization built from the session claims; listeners are notified
    /// either way.
    pub async fn initialize(&self) {
        let flight = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(running) => {
                    debug!("Organization initialization in progress; waiting for it");
                    running.flight.clone()
                }
                None => {
                    let id = self.inner.next_flight_id.fetch_add(1, Ordering::Relaxed);
                    let inner = Arc::clone(&self.inner);
                    let flight = async move {
                        inner.run_initialize().await;
                        let mut slot = inner
                            .in_flight
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        if slot.as_ref().is_some_and(|running| running.id == id) {
                            *slot = None;
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some(InFlight {
                        id,
                        flight: flight.clone(),
                    });
                    flight
                }
            }
        };
        flight.await;
    }

    /// Fetch the user's memberships, deduplicated by org id.
    ///
    /// Records the backend-saved default organization as a side effect,
    /// unless the context was cleared while the fetch ran.
    pub async fn load_orgs(&self) -> Result<Vec<Organization>> {
        self.inner.load_orgs().await
    }

    /// Make `org_id` the active organization.
    ///
    /// Unknown ids are rejected with a logged error and re-selecting the
    /// current org does nothing; neither notifies. Returns whether the
    /// selection changed.
    pub fn select_org(&self, org_id: &str, options: SelectOptions) -> bool {
        let inner = &self.inner;
        let org = {
            let mut state = inner.state();
            let Some(org) = state
                .available
                .iter()
                .find(|o| o.org_id == org_id)
                .cloned()
            else {
                error!("Cannot select organization {}: not available to this user", org_id);
                return false;
            };
            if state
                .current
                .as_ref()
                .is_some_and(|current| current.org_id == org_id)
            {
                return false;
            }
            state.current = Some(org.clone());
            org
        };

        inner.persist_selection(&org.org_id);
        inner.notify_listeners();

        if options.reload {
            inner.navigator.reload();
        }
        true
    }

    /// Re-notify listeners with the current state
    pub fn refresh(&self) {
        self.inner.notify_listeners();
    }

    /// Register a listener called with the active organization on every
    /// notification, in registration order
    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&Organization>) + Send + Sync + 'static,
    {
        self.inner
            .listeners
            .subscribe(move |org: &Option<Organization>| listener(org.as_ref()))
    }

    /// Receiver for the page-wide org-change broadcast
    pub fn subscribe_events(&self) -> broadcast::Receiver<OrgChanged> {
        self.inner.events.subscribe()
    }

    /// Push the current state to the status sink, listeners and broadcast
    pub fn notify_listeners(&self) {
        self.inner.notify_listeners();
    }

    /// Forget all organization state and the persisted selection
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Follow the session: initialize on sign-in, clear on sign-out.
    ///
    /// Sign-in initialization is spawned on the current tokio runtime.
    pub fn attach(&self) {
        let weak = Arc::downgrade(&self.inner);
        let subscription = self
            .inner
            .session
            .on_change(Box::new(move |session: Option<&SessionInfo>| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let context = OrgContext { inner };
                match session {
                    Some(_) => match tokio::runtime::Handle::try_current() {
                        Ok(handle) => {
                            handle.spawn(async move { context.initialize().await });
                        }
                        Err(_) => {
                            warn!("No async runtime available; organization context not initialized")
                        }
                    },
                    None => context.clear(),
                }
            }));

        let previous = self
            .inner
            .session_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(subscription);
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
    }

    /// Stop following the session and clear all state
    pub fn dispose(&self) {
        let subscription = self
            .inner
            .session_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        self.inner.clear();
    }

    pub fn phase(&self) -> OrgPhase {
        self.inner.state().phase
    }

    pub fn current_org(&self) -> Option<Organization> {
        self.inner.state().current.clone()
    }

    pub fn available_orgs(&self) -> Vec<Organization> {
        self.inner.state().available.clone()
    }

    pub fn user_default_org_id(&self) -> Option<String> {
        self.inner.state().user_default_org_id.clone()
    }

    /// The backend-saved default no longer resolves to an accessible org
    pub fn default_org_missing(&self) -> bool {
        self.inner.state().default_org_missing
    }

    pub fn has_multiple_orgs(&self) -> bool {
        self.inner.state().available.len() > 1
    }

    /// Role in the active organization; read-only when none is selected
    pub fn current_role(&self) -> OrgRole {
        self.inner
            .state()
            .current
            .as_ref()
            .map(|org| org.role)
            .unwrap_or(OrgRole::ReadOnly)
    }

    pub fn is_individual_user(&self) -> bool {
        self.inner
            .state()
            .current
            .as_ref()
            .is_some_and(|org| org.org_type == OrgType::Personal)
    }

    /// Site administrator by account type or by role in the active org
    pub fn is_site_admin(&self) -> bool {
        let by_user = self
            .inner
            .session
            .user()
            .is_some_and(|user| user.is_site_admin());
        by_user || self.current_role() == OrgRole::SiteAdmin
    }

    /// Same as [`is_site_admin`](Self::is_site_admin)
    pub fn is_super_user(&self) -> bool {
        self.is_site_admin()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, OrgState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_initialize(&self) {
        let Some(user) = self.session.user() else {
            debug!("No signed-in user; skipping organization initialization");
            return;
        };
        let session = self.session.session();

        let generation = {
            let mut state = self.state();
            state.phase = OrgPhase::Initializing;
            state.generation
        };

        let (orgs, fetched_default) = match self.fetch_orgs().await {
            Ok((orgs, default_org_id)) => (orgs, Some(default_org_id)),
            Err(err) => {
                warn!(
                    "Failed to load organizations, using session organization: {}",
                    err
                );
                (vec![fallback_org(&user, session.as_ref())], None)
            }
        };

        let persisted = self.store.get(&self.selected_org_key);
        let selected = {
            let mut state = self.state();
            if state.generation != generation {
                debug!("Organization state cleared during initialization; discarding result");
                return;
            }

            if let Some(default_org_id) = fetched_default {
                state.user_default_org_id = default_org_id;
            }
            let user_default = state.user_default_org_id.clone();
            let owner = orgs
                .iter()
                .find(|org| org.role == OrgRole::Owner)
                .map(|org| org.org_id.clone());
            let first = orgs.first().map(|org| org.org_id.clone());
            let candidates = [
                persisted,
                user_default.clone(),
                owner,
                first,
                session.and_then(|s| s.org_id),
                Some(user.email.clone()),
            ];

            let selected = candidates
                .iter()
                .flatten()
                .find_map(|id| orgs.iter().find(|org| &org.org_id == id))
                .or_else(|| orgs.first())
                .cloned();

            state.default_org_missing = user_default
                .is_some_and(|id| !orgs.iter().any(|org| org.org_id == id));
            state.available = orgs;
            state.current = selected.clone();
            state.phase = OrgPhase::Ready;
            selected
        };

        if let Some(org) = &selected {
            self.persist_selection(&org.org_id);
        }
        self.notify_listeners();
    }

    async fn load_orgs(&self) -> Result<Vec<Organization>> {
        let generation = self.state().generation;
        let (orgs, default_org_id) = self.fetch_orgs().await?;

        let mut state = self.state();
        if state.generation == generation {
            state.user_default_org_id = default_org_id;
        }
        Ok(orgs)
    }

    /// Deduplicated catalog and the backend-saved default, without touching state
    async fn fetch_orgs(&self) -> Result<(Vec<Organization>, Option<String>)> {
        let listing = self.directory.list_memberships().await?;
        let orgs = dedupe_orgs(listing.orgs);
        debug!("Loaded {} organization(s)", orgs.len());
        Ok((orgs, listing.default_org_id))
    }

    fn persist_selection(&self, org_id: &str) {
        if let Err(err) = self.store.set(&self.selected_org_key, org_id) {
            warn!("Failed to persist selected organization: {}", err);
        }
    }

    fn notify_listeners(&self) {
        let current = self.state().current.clone();

        self.status_sink
            .show(OrgStatus::for_org(current.as_ref()), current.as_ref());
        self.listeners.emit(&current);
        // Err only means nobody is listening
        let _ = self.events.send(OrgChanged { org: current });
    }

    fn clear(&self) {
        // A running initialization finishes against the old generation and
        // discards its result; later callers must start a fresh one
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        {
            let mut state = self.state();
            let generation = state.generation + 1;
            *state = OrgState {
                phase: OrgPhase::Cleared,
                generation,
                ..OrgState::default()
            };
        }
        if let Err(err) = self.store.remove(&self.selected_org_key) {
            warn!("Failed to remove persisted organization: {}", err);
        }
        self.notify_listeners();
    }
}

/// Single organization derived from session claims, used when the catalog
/// cannot be loaded
fn fallback_org(user: &SessionUser, session: Option<&SessionInfo>) -> Organization {
    let org_id = session
        .and_then(|s| s.org_id.clone())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| user.email.clone());

    let org_type = if org_id == user.email {
        OrgType::Personal
    } else {
        OrgType::Business
    };
    let role = user
        .user_type
        .as_deref()
        .map(role_for_user_type)
        .unwrap_or(OrgRole::Owner);
    let name = match org_type {
        OrgType::Personal => user.name.clone().unwrap_or_else(|| user.email.clone()),
        OrgType::Business => org_id.clone(),
    };

    Organization {
        total_seats: user.max_devices.unwrap_or(0),
        ..Organization::new(org_id, name, org_type, role)
    }
}

fn role_for_user_type(user_type: &str) -> OrgRole {
    match user_type.to_ascii_lowercase().as_str() {
        "siteadmin" => OrgRole::SiteAdmin,
        "readonly" => OrgRole::ReadOnly,
        "readwrite" => OrgRole::ReadWrite,
        _ => OrgRole::Owner,
    }
}
