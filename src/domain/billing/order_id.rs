//! Merchant order id generation and parsing.
//!
//! The merchant order id is the only correlation key between an outbound
//! invoice and the inbound callback the provider sends later. Its shape is
//! fixed: `SUB-<TENANT_SLUG_UPPERCASE>-<UNIX_MILLIS>`. Generation must parse
//! back to the same tenant slug and be unique per invoice.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use super::errors::BillingError;

/// Prefix marking subscription invoices.
const PREFIX: &str = "SUB";

/// Separator between the prefix, slug, and timestamp segments.
const SEPARATOR: char = '-';

/// A parsed or freshly generated merchant order id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MerchantOrderId {
    raw: String,
    tenant_slug: String,
    issued_at_millis: i64,
}

impl MerchantOrderId {
    /// Returns the wire form sent to the provider.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the tenant slug encoded in the id, lower-cased.
    pub fn tenant_slug(&self) -> &str {
        &self.tenant_slug
    }

    /// Returns the millisecond timestamp suffix.
    pub fn issued_at_millis(&self) -> i64 {
        self.issued_at_millis
    }

    /// Parses an order id received back from the provider.
    ///
    /// Accepts only ids of the form `SUB-<SLUG>-<MILLIS>`. The slug may
    /// itself contain `-`; everything between the first and last separator is
    /// the slug, rejoined and lower-cased.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::OrderIdFormat`] when the prefix is missing,
    /// fewer than two segments follow it, the slug is empty, or the suffix is
    /// not a millisecond timestamp.
    pub fn parse(raw: &str) -> Result<Self, BillingError> {
        let segments: Vec<&str> = raw.split(SEPARATOR).collect();

        if segments.len() < 3 || segments[0] != PREFIX {
            return Err(BillingError::OrderIdFormat(raw.to_string()));
        }

        let slug_segments = &segments[1..segments.len() - 1];
        if slug_segments.iter().any(|s| s.is_empty()) {
            return Err(BillingError::OrderIdFormat(raw.to_string()));
        }
        let tenant_slug = slug_segments.join("-").to_lowercase();

        let issued_at_millis: i64 = segments[segments.len() - 1]
            .parse()
            .map_err(|_| BillingError::OrderIdFormat(raw.to_string()))?;
        if issued_at_millis <= 0 {
            return Err(BillingError::OrderIdFormat(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            tenant_slug,
            issued_at_millis,
        })
    }
}

impl std::fmt::Display for MerchantOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Generates unique, monotonic merchant order ids.
///
/// The timestamp suffix is clamped to strictly exceed the previously issued
/// one, so two invoices created in the same millisecond (or across a clock
/// step backwards) still get distinct ids.
pub struct OrderIdGenerator {
    last_millis: AtomicI64,
}

impl OrderIdGenerator {
    /// Creates a generator starting from the current wall clock.
    pub fn new() -> Self {
        Self {
            last_millis: AtomicI64::new(0),
        }
    }

    /// Generates the next order id for a tenant.
    pub fn next(&self, tenant_slug: &str) -> MerchantOrderId {
        let now = Utc::now().timestamp_millis();
        let millis = self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .map(|last| now.max(last + 1))
            .unwrap_or(now);

        let slug = tenant_slug.to_lowercase();
        let raw = format!("{}{}{}{}{}", PREFIX, SEPARATOR, slug.to_uppercase(), SEPARATOR, millis);

        MerchantOrderId {
            raw,
            tenant_slug: slug,
            issued_at_millis: millis,
        }
    }
}

impl Default for OrderIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
