//! Subscription plan catalog.
//!
//! Plans are compiled into the binary: the price a tenant pays is always
//! resolved server-side from the plan id, never accepted from a client.

use serde::{Deserialize, Serialize};

/// Subscription plan identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    /// Entry plan for single-outlet cafes.
    Starter,

    /// Multi-outlet plan with full reporting.
    Bisnis,

    /// One-time purchase, no renewal.
    Lifetime,
}

impl PlanId {
    /// Returns the canonical string form used in payment attempt records.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Starter => "starter",
            PlanId::Bisnis => "bisnis",
            PlanId::Lifetime => "lifetime",
        }
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A subscription plan with its authoritative price and duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// Plan identifier.
    pub id: PlanId,

    /// Price in Indonesian rupiah (minor units).
    pub amount: i64,

    /// Human-readable description used as the invoice product detail.
    pub description: &'static str,

    /// Subscription duration granted per successful payment.
    pub duration_days: i64,
}

/// Plan resolved for the starter tier.
pub const STARTER: Plan = Plan {
    id: PlanId::Starter,
    amount: 99_000,
    description: "Kasir Starter - langganan 30 hari",
    duration_days: 30,
};

/// Plan resolved for the bisnis tier.
pub const BISNIS: Plan = Plan {
    id: PlanId::Bisnis,
    amount: 249_000,
    description: "Kasir Bisnis - langganan 30 hari",
    duration_days: 30,
};

/// Lifetime plan. Duration is effectively unbounded; ten years keeps the
/// expiry arithmetic uniform with the recurring plans.
pub const LIFETIME: Plan = Plan {
    id: PlanId::Lifetime,
    amount: 2_499_000,
    description: "Kasir Lifetime - sekali bayar",
    duration_days: 3_650,
};

/// Static catalog mapping plan id strings to plans.
///
/// Resolution never fails: unknown ids fall back to the default plan so a
/// stale or misspelled plan string from a client can never block an upgrade
/// attempt. Legacy aliases map renamed plans to their current equivalents so
/// payment links issued before a rename keep working.
pub struct PlanCatalog;

impl PlanCatalog {
    /// The plan used when an id cannot be resolved.
    pub const DEFAULT: &'static Plan = &STARTER;

    /// Resolves a plan id string to its plan.
    ///
    /// Accepts canonical ids and the fixed legacy alias table. Unknown ids
    /// fall back to [`PlanCatalog::DEFAULT`] with a warning.
    pub fn resolve(plan_id: &str) -> &'static Plan {
        match plan_id.to_lowercase().as_str() {
            "starter" => &STARTER,
            "bisnis" => &BISNIS,
            "lifetime" => &LIFETIME,
            // Legacy aliases from the pre-rename pricing page.
            "monthly" | "basic" => &STARTER,
            "business" | "pro" => &BISNIS,
            other => {
                tracing::warn!(plan_id = other, "Unknown plan id, falling back to default");
                Self::DEFAULT
            }
        }
    }

    /// Finds a plan by its exact amount.
    ///
    /// Best-effort fallback for callbacks whose payment attempt record is
    /// missing; returns `None` when no plan matches.
    pub fn find_by_amount(amount: i64) -> Option<&'static Plan> {
        [&STARTER, &BISNIS, &LIFETIME]
            .into_iter()
            .find(|plan| plan.amount == amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_canonical_ids() {
        assert_eq!(PlanCatalog::resolve("starter").id, PlanId::Starter);
        assert_eq!(PlanCatalog::resolve("bisnis").id, PlanId::Bisnis);
        assert_eq!(PlanCatalog::resolve("lifetime").id, PlanId::Lifetime);
    }

    #[test]
    fn resolution_is_case_insensitive() {
        assert_eq!(PlanCatalog::resolve("Bisnis").id, PlanId::Bisnis);
        assert_eq!(PlanCatalog::resolve("LIFETIME").id, PlanId::Lifetime);
    }

    #[test]
    fn legacy_aliases_map_to_current_plans() {
        assert_eq!(PlanCatalog::resolve("monthly").id, PlanId::Starter);
        assert_eq!(PlanCatalog::resolve("basic").id, PlanId::Starter);
        assert_eq!(PlanCatalog::resolve("business").id, PlanId::Bisnis);
        assert_eq!(PlanCatalog::resolve("pro").id, PlanId::Bisnis);
    }

    #[test]
    fn unknown_plan_falls_back_to_default() {
        let plan = PlanCatalog::resolve("does-not-exist");
        assert_eq!(plan, PlanCatalog::DEFAULT);
        assert_eq!(plan.id, PlanId::Starter);
    }

    #[test]
    fn all_plans_have_positive_amount_and_duration() {
        for plan in [&STARTER, &BISNIS, &LIFETIME] {
            assert!(plan.amount > 0);
            assert!(plan.duration_days > 0);
        }
    }

    #[test]
    fn find_by_amount_matches_exact_price() {
        assert_eq!(PlanCatalog::find_by_amount(99_000).unwrap().id, PlanId::Starter);
        assert_eq!(PlanCatalog::find_by_amount(249_000).unwrap().id, PlanId::Bisnis);
        assert!(PlanCatalog::find_by_amount(123).is_none());
    }

    #[test]
    fn plan_id_serializes_lowercase() {
        let json = serde_json::to_string(&PlanId::Bisnis).unwrap();
        assert_eq!(json, "\"bisnis\"");
    }
}
