//! Application context
//!
//! Wires the request client and the organization context to one shared
//! session, store and navigator so hosts get a working pair from a single
//! constructor.

use std::path::Path;
use std::sync::Arc;

use crate::client::RequestClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::org::{LogStatusSink, OrgContext, OrgStatusSink};
use crate::platform::{
    CsrfTokenSource, FileStore, LogNavigator, Navigator, NoCsrf, PersistentStore,
};
use crate::session::SessionAccessor;

/// Shared client state for a dashboard host.
///
/// This struct encapsulates:
/// - The loaded configuration
/// - The request client (Arc-wrapped so it can also serve as the org directory)
/// - The organization context following the session
pub struct AppContext {
    pub config: ClientConfig,
    pub client: Arc<RequestClient>,
    pub orgs: OrgContext,
}

/// Host-provided collaborators
pub struct Platform {
    pub session: Arc<dyn SessionAccessor>,
    pub store: Arc<dyn PersistentStore>,
    pub navigator: Arc<dyn Navigator>,
    pub csrf: Arc<dyn CsrfTokenSource>,
    pub status_sink: Arc<dyn OrgStatusSink>,
}

impl Platform {
    /// Headless defaults: file-backed store, logging navigator, no CSRF
    /// token, logging status sink
    pub fn headless(session: Arc<dyn SessionAccessor>) -> Result<Self> {
        Ok(Self {
            session,
            store: Arc::new(FileStore::open()?),
            navigator: Arc::new(LogNavigator),
            csrf: Arc::new(NoCsrf),
            status_sink: Arc::new(LogStatusSink),
        })
    }
}

impl AppContext {
    /// Build the client and organization context from `config`.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or has no base URL.
    pub fn new(config: ClientConfig, platform: Platform) -> Result<Self> {
        let client = Arc::new(
            RequestClient::new(config.clone(), Arc::clone(&platform.session))?
                .with_csrf(platform.csrf)
                .with_navigator(Arc::clone(&platform.navigator)),
        );

        let orgs = OrgContext::builder(client.clone(), platform.session)
            .store(platform.store)
            .navigator(platform.navigator)
            .status_sink(platform.status_sink)
            .selected_org_key(config.selected_org_key.clone())
            .build();

        Ok(Self {
            config,
            client,
            orgs,
        })
    }

    /// Load configuration from `config_path` (or the default location) and
    /// build a headless context
    pub fn load(config_path: Option<&Path>, session: Arc<dyn SessionAccessor>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ClientConfig::load_from(path)?,
            None => ClientConfig::load()?,
        };
        Self::new(config, Platform::headless(session)?)
    }

    /// Follow the session and initialize organizations for a user who is
    /// already signed in
    pub async fn start(&self) {
        self.orgs.attach();
        self.orgs.initialize().await;
    }

    /// Stop following the session and drop all organization state
    pub fn dispose(&self) {
        self.orgs.dispose();
        self.client.clear_cache();
    }
}
