//! Organization context
//!
//! - [`model`] - organizations and roles
//! - [`directory`] - the membership listing source
//! - [`status`] - license status banner
//! - [`context`] - the active-organization state machine

pub mod context;
pub mod directory;
#[cfg(test)]
pub mod mock;
pub mod model;
pub mod status;

pub use context::{OrgChanged, OrgContext, OrgContextBuilder, OrgPhase, SelectOptions};
pub use directory::{MemberProfile, MembershipListing, OrgDirectory, parse_membership_response};
pub use model::{OrgRole, OrgType, Organization, dedupe_orgs};
pub use status::{LogStatusSink, OrgStatus, OrgStatusSink};
