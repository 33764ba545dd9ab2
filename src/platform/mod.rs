//! Host-environment seams
//!
//! The core never touches browser globals directly. Anti-forgery tokens,
//! persisted selection state and page navigation go through the traits
//! defined here so the logic runs (and is tested) outside a browser.

pub mod csrf;
pub mod navigator;
pub mod store;

pub use csrf::{CsrfTokenSource, NoCsrf, PageTokens, discover_csrf_token};
pub use navigator::{LogNavigator, NavigationEvent, Navigator, RecordingNavigator};
pub use store::{FileStore, MemoryStore, PersistentStore};
