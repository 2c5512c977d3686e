//! Tenant subscription state.
//!
//! The full tenant record (outlets, staff, database name) is owned by the
//! surrounding platform; this crate sees only the slice the payment engine
//! reads and mutates.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::plan::Plan;

/// Subscription status of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Evaluation period, no successful payment yet.
    Trial,

    /// Paid through `subscription_expires_at`.
    Paid,

    /// Expiry has elapsed (flipped by an external job).
    Expired,
}

impl SubscriptionStatus {
    /// Returns the string form stored in the tenant record.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Paid => "paid",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The tenant slice visible to the payment engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// URL-safe tenant identifier, unique across the platform.
    pub slug: String,

    /// Cafe display name, used as the invoice customer name fallback.
    pub name: String,

    /// Current subscription status.
    pub status: SubscriptionStatus,

    /// End of the paid period. `None` while on trial.
    pub subscription_expires_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Creates a trial tenant, the state every tenant starts in.
    pub fn trial(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            status: SubscriptionStatus::Trial,
            subscription_expires_at: None,
        }
    }

    /// Applies one successful payment for `plan`.
    ///
    /// The new expiry extends from whichever is later, `now` or the current
    /// expiry, so a renewal before expiry keeps the remaining time instead of
    /// discarding it. The expiry only ever moves forward.
    pub fn apply_paid_period(&mut self, plan: &Plan, now: DateTime<Utc>) {
        let base = match self.subscription_expires_at {
            Some(current) if current > now => current,
            _ => now,
        };

        self.status = SubscriptionStatus::Paid;
        self.subscription_expires_at = Some(base + Duration::days(plan.duration_days));
    }
}
