//! Session accessor seam
//!
//! Authentication lives outside this crate. The core reads the current token
//! and user claims through [`SessionAccessor`], asks it to clear the session
//! after a session error, and watches it to (re)initialize organization state.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::events::{EventEmitter, Subscription};

/// User type string carried by site administrators
pub const SITE_ADMIN_USER_TYPE: &str = "SiteAdmin";

/// Claims about the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub email: String,

    /// Account type (e.g. `SiteAdmin`, `Owner`, `ReadOnly`)
    #[serde(default)]
    pub user_type: Option<String>,

    #[serde(default)]
    pub max_devices: Option<u32>,

    #[serde(default)]
    pub name: Option<String>,
}

impl SessionUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            user_type: None,
            max_devices: None,
            name: None,
        }
    }

    pub fn is_site_admin(&self) -> bool {
        self.user_type.as_deref() == Some(SITE_ADMIN_USER_TYPE)
    }
}

/// Minimal session claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// The user's own organization id
    #[serde(default)]
    pub org_id: Option<String>,
}

/// Callback fired on sign-in (`Some`) and sign-out (`None`)
pub type SessionCallback = Box<dyn Fn(Option<&SessionInfo>) + Send + Sync>;

/// Access to the externally managed authentication session
pub trait SessionAccessor: Send + Sync {
    /// Current bearer token
    fn token(&self) -> Option<String>;

    fn user(&self) -> Option<SessionUser>;

    fn session(&self) -> Option<SessionInfo>;

    /// Drop the current session (sign the user out locally)
    fn clear_session(&self);

    /// Observe sign-in and sign-out
    fn on_change(&self, callback: SessionCallback) -> Subscription;
}

#[derive(Debug, Default, Clone)]
struct SessionState {
    token: Option<String>,
    user: Option<SessionUser>,
    session: Option<SessionInfo>,
}

/// In-process session holder.
///
/// Used by hosts that obtain tokens themselves and by tests.
#[derive(Default)]
pub struct MemorySession {
    state: RwLock<SessionState>,
    changes: EventEmitter<Option<SessionInfo>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new session and notify observers
    pub fn sign_in(&self, token: impl Into<String>, user: SessionUser, session: SessionInfo) {
        if let Ok(mut state) = self.state.write() {
            *state = SessionState {
                token: Some(token.into()),
                user: Some(user),
                session: Some(session.clone()),
            };
        }
        self.changes.emit(&Some(session));
    }

    /// Drop the session and notify observers
    pub fn sign_out(&self) {
        self.clear_session();
    }

    pub fn is_signed_in(&self) -> bool {
        self.state
            .read()
            .map(|s| s.token.is_some())
            .unwrap_or(false)
    }
}

impl SessionAccessor for MemorySession {
    fn token(&self) -> Option<String> {
        self.state.read().ok()?.token.clone()
    }

    fn user(&self) -> Option<SessionUser> {
        self.state.read().ok()?.user.clone()
    }

    fn session(&self) -> Option<SessionInfo> {
        self.state.read().ok()?.session.clone()
    }

    fn clear_session(&self) {
        if let Ok(mut state) = self.state.write() {
            *state = SessionState::default();
        }
        self.changes.emit(&None);
    }

    fn on_change(&self, callback: SessionCallback) -> Subscription {
        self.changes.subscribe(move |session| callback(session.as_ref()))
    }
}
