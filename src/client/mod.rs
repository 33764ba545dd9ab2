//! Dashboard API client
//!
//! - [`normalize`] - casing/envelope-tolerant view of response JSON
//! - [`response`] - body resolution and the session/ordinary error policy
//! - [`request`] - the [`RequestClient`] itself

pub mod normalize;
pub mod request;
pub mod response;

pub use normalize::{Envelope, Normalized, NormalizedObject, normalize};
pub use request::{CSRF_HEADER, GetOptions, RequestClient};
pub use response::{Classification, classify, resolve_body};
