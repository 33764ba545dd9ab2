//! Organization membership listing

use async_trait::async_trait;

use super::model::{Organization, dedupe_orgs};
use crate::client::{GetOptions, Normalized, RequestClient};
use crate::error::{ApiError, Result};

/// Profile of the signed-in user as reported by the membership listing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberProfile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub user_type: Option<String>,
}

/// The signed-in user's organization memberships
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MembershipListing {
    pub user: Option<MemberProfile>,

    /// Deduplicated by org id, source order
    pub orgs: Vec<Organization>,

    /// Default organization saved on the backend
    pub default_org_id: Option<String>,
}

/// Source of the signed-in user's organization catalog
#[async_trait]
pub trait OrgDirectory: Send + Sync {
    async fn list_memberships(&self) -> Result<MembershipListing>;
}

#[async_trait]
impl OrgDirectory for RequestClient {
    async fn list_memberships(&self) -> Result<MembershipListing> {
        // Never cached: the URL is the same for every signed-in user
        let endpoint = self.config().memberships_endpoint.clone();
        let response = self.get(&endpoint, &[], GetOptions::fresh()).await?;
        parse_membership_response(&response)
    }
}

/// Read a membership listing out of a normalized `{ success, data }` response.
///
/// `data` holds `organizations` (or `orgs`), an optional `user` profile and
/// the saved `defaultOrgId`, which may also sit on the user profile.
pub fn parse_membership_response(response: &Normalized) -> Result<MembershipListing> {
    let envelope = response.envelope();
    let data = match (envelope.success, envelope.data) {
        (Some(true), Some(data)) => data,
        _ => {
            return Err(ApiError::InvalidResponse(
                "Organization membership response has no success/data shape".to_string(),
            )
            .into());
        }
    };

    let orgs = data
        .get("organizations")
        .or_else(|| data.get("orgs"))
        .and_then(Normalized::as_array)
        .unwrap_or_default()
        .iter()
        .filter_map(Organization::from_normalized)
        .collect();

    let user = data.get("user");
    let default_org_id = data
        .get("defaultOrgId")
        .or_else(|| user.and_then(|u| u.get("defaultOrgId")))
        .and_then(Normalized::as_id);

    let text = |value: &Normalized, key: &str| {
        value
            .get(key)
            .and_then(Normalized::as_str)
            .map(str::to_string)
    };
    let user = user.filter(|u| u.as_object().is_some()).map(|u| MemberProfile {
        email: text(u, "email"),
        name: text(u, "name"),
        user_type: text(u, "userType"),
    });

    Ok(MembershipListing {
        user,
        orgs: dedupe_orgs(orgs),
        default_org_id,
    })
}
