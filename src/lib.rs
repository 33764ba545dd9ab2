//! Posture client - request plumbing and organization state for the
//! security-posture dashboard
//!
//! Two services make up the crate:
//!
//! - [`RequestClient`] sends authenticated JSON requests, caches GETs for a
//!   short time, normalizes response casing, and turns session failures into
//!   a local sign-out plus a redirect to the login page.
//! - [`OrgContext`] tracks which organization the signed-in user is working
//!   in, persists the choice, and notifies listeners when it changes.
//!
//! Everything the browser would otherwise provide (session, persisted
//! storage, navigation, CSRF tokens) comes in through the traits in
//! [`session`] and [`platform`].

pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod org;
pub mod platform;
pub mod session;

pub use client::{GetOptions, Normalized, RequestClient, normalize};
pub use config::ClientConfig;
pub use context::{AppContext, Platform};
pub use error::{ApiError, Error, Result};
pub use events::{EventEmitter, Subscription};
pub use org::{OrgContext, OrgRole, OrgStatus, OrgType, Organization, SelectOptions};
pub use session::{MemorySession, SessionAccessor, SessionInfo, SessionUser};
