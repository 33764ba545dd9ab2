//! License status banner for the active organization

use super::model::Organization;

/// Days of full seat usage at or below which a license counts as expiring
const EXPIRING_DAYS_PER_SEAT: i64 = 7;

/// Banner state derived from the active organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgStatus {
    /// Nothing to show
    Hidden,
    Disabled,
    LicenseExpired,
    /// Credits cover at most a week of every seat
    ExpiringSoon { days: i64 },
}

impl OrgStatus {
    /// Compute the banner for `org`.
    ///
    /// Checks, in order: disabled, zero credits, credits within a week of
    /// seat usage. Organizations without credit figures only ever show the
    /// disabled state.
    pub fn for_org(org: Option<&Organization>) -> Self {
        let Some(org) = org else {
            return OrgStatus::Hidden;
        };

        if !org.is_enabled {
            return OrgStatus::Disabled;
        }

        let Some(remaining) = org.remaining_credits else {
            return OrgStatus::Hidden;
        };
        let seats = i64::from(org.total_seats);

        if remaining == 0 {
            OrgStatus::LicenseExpired
        } else if remaining <= seats * EXPIRING_DAYS_PER_SEAT {
            let days = if seats > 0 { remaining.div_euclid(seats) } else { 0 };
            OrgStatus::ExpiringSoon { days }
        } else {
            OrgStatus::Hidden
        }
    }

    pub fn title(&self) -> Option<&'static str> {
        match self {
            OrgStatus::Hidden => None,
            OrgStatus::Disabled => Some("Account Disabled"),
            OrgStatus::LicenseExpired => Some("License Expired"),
            OrgStatus::ExpiringSoon { .. } => Some("Expiring Soon"),
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, OrgStatus::Hidden)
    }
}

/// Receives the banner state on every org notification
pub trait OrgStatusSink: Send + Sync {
    fn show(&self, status: OrgStatus, org: Option<&Organization>);
}

/// Sink that only logs; used when the host renders no banner
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusSink;

impl OrgStatusSink for LogStatusSink {
    fn show(&self, status: OrgStatus, org: Option<&Organization>) {
        if let (Some(title), Some(org)) = (status.title(), org) {
            log::debug!("Org {} status: {}", org.org_id, title);
        }
    }
}
