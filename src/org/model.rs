//! Organization models

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::Normalized;

/// Organization kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrgType {
    Personal,
    Business,
}

impl OrgType {
    /// Case-insensitive parse; anything unrecognized is a business org
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("personal") {
            OrgType::Personal
        } else {
            OrgType::Business
        }
    }
}

/// The signed-in user's role within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrgRole {
    Owner,
    ReadWrite,
    ReadOnly,
    SiteAdmin,
}

impl OrgRole {
    /// Case-insensitive parse; anything unrecognized is read-only
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "owner" => OrgRole::Owner,
            "readwrite" => OrgRole::ReadWrite,
            "siteadmin" => OrgRole::SiteAdmin,
            _ => OrgRole::ReadOnly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Owner => "Owner",
            OrgRole::ReadWrite => "ReadWrite",
            OrgRole::ReadOnly => "ReadOnly",
            OrgRole::SiteAdmin => "SiteAdmin",
        }
    }

    pub fn can_write(&self) -> bool {
        !matches!(self, OrgRole::ReadOnly)
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_enabled() -> bool {
    true
}

/// Organization membership of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub org_id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub org_type: OrgType,

    pub role: OrgRole,

    #[serde(default)]
    pub device_count: u32,

    #[serde(default)]
    pub total_seats: u32,

    #[serde(default = "default_enabled")]
    pub is_enabled: bool,

    /// Remaining license credits (absent for orgs without metering)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_credits: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_credits: Option<i64>,
}

impl Organization {
    pub fn new(
        org_id: impl Into<String>,
        name: impl Into<String>,
        org_type: OrgType,
        role: OrgRole,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            name: name.into(),
            org_type,
            role,
            device_count: 0,
            total_seats: 0,
            is_enabled: true,
            remaining_credits: None,
            total_credits: None,
        }
    }

    /// Read an organization from a normalized membership entry.
    ///
    /// Returns `None` when the entry carries no org id. Fractional counts
    /// and credit figures are floored (see [`Normalized::as_i64`]); negative
    /// or oversized counts read as 0.
    pub fn from_normalized(entry: &Normalized) -> Option<Self> {
        let org_id = entry
            .get("orgId")
            .or_else(|| entry.get("id"))
            .and_then(Normalized::as_id)?;

        let name = entry
            .get("name")
            .and_then(Normalized::as_str)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| org_id.clone());

        let count = |key: &str| {
            entry
                .get(key)
                .and_then(Normalized::as_i64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0)
        };

        Some(Self {
            org_type: entry
                .get("type")
                .and_then(Normalized::as_str)
                .map(OrgType::parse)
                .unwrap_or(OrgType::Business),
            role: entry
                .get("role")
                .and_then(Normalized::as_str)
                .map(OrgRole::parse)
                .unwrap_or(OrgRole::ReadOnly),
            device_count: count("deviceCount"),
            total_seats: count("totalSeats"),
            is_enabled: entry
                .get("isEnabled")
                .and_then(Normalized::as_bool)
                .unwrap_or(true),
            remaining_credits: entry.get("remainingCredits").and_then(Normalized::as_i64),
            total_credits: entry.get("totalCredits").and_then(Normalized::as_i64),
            org_id,
            name,
        })
    }
}

/// Drop repeated org ids, keeping the first occurrence and source order
pub fn dedupe_orgs(orgs: Vec<Organization>) -> Vec<Organization> {
    let mut seen = HashSet::new();
    orgs.into_iter()
        .filter(|org| seen.insert(org.org_id.clone()))
        .collect()
}
