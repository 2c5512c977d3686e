//! Duitku signature codec.
//!
//! Stateless digests over ordered field concatenations, reproduced
//! byte-for-byte from the gateway's conventions. Two generations exist side
//! by side: the legacy inquiry endpoint signs with MD5 in the payload, the
//! hosted-page endpoint signs with SHA-256 conveyed as request headers.
//!
//! The callback digest uses a different field order than invoice signing
//! (`merchantCode|amount|merchantOrderId` vs `merchantCode|merchantOrderId|
//! amount`). That asymmetry is the gateway's convention, not a bug; tests
//! below pin it so nobody "fixes" it.

use md5::{Digest, Md5};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// MD5 digest for the legacy invoice (inquiry) endpoint.
///
/// Signs `merchantCode + merchantOrderId + amount + apiKey`, no separator.
pub fn invoice_signature(
    merchant_code: &str,
    merchant_order_id: &str,
    amount: i64,
    api_key: &str,
) -> String {
    md5_hex(&format!(
        "{}{}{}{}",
        merchant_code, merchant_order_id, amount, api_key
    ))
}

/// SHA-256 digest for the hosted-page (POP) endpoint generation.
///
/// Signs `merchantCode + timestampMillis + apiKey`; sent as the
/// `x-duitku-signature` header alongside `x-duitku-timestamp`.
pub fn checkout_signature(merchant_code: &str, timestamp_millis: i64, api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(merchant_code.as_bytes());
    hasher.update(timestamp_millis.to_string().as_bytes());
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Expected MD5 digest of a callback.
///
/// Field order: `merchantCode + amount + merchantOrderId + apiKey`. The
/// amount is the raw string as received on the wire; the gateway hashed
/// those exact bytes.
pub fn callback_signature(
    merchant_code: &str,
    amount: &str,
    merchant_order_id: &str,
    api_key: &str,
) -> String {
    md5_hex(&format!(
        "{}{}{}{}",
        merchant_code, amount, merchant_order_id, api_key
    ))
}

/// MD5 digest for the transaction status endpoint.
///
/// Signs `merchantCode + merchantOrderId + apiKey`.
pub fn status_signature(merchant_code: &str, merchant_order_id: &str, api_key: &str) -> String {
    md5_hex(&format!("{}{}{}", merchant_code, merchant_order_id, api_key))
}

/// Compares a received signature against the expected digest.
///
/// Constant-time over the hex strings. The digest itself is not a secret,
/// but the receiver should not leak timing differences regardless - a future
/// HMAC-based scheme would inherit this comparison.
pub fn signatures_match(expected: &str, received: &str) -> bool {
    let received = received.to_lowercase();
    if expected.len() != received.len() {
        return false;
    }
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERCHANT_CODE: &str = "D12345";
    const API_KEY: &str = "test-api-key-12345";
    const ORDER_ID: &str = "ORDER-001";
    const AMOUNT: i64 = 100_000;

    // ══════════════════════════════════════════════════════════════
    // Reference vectors
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invoice_signature_matches_reference_vector() {
        // MD5("D12345ORDER-001100000test-api-key-12345")
        assert_eq!(
            invoice_signature(MERCHANT_CODE, ORDER_ID, AMOUNT, API_KEY),
            "0f2291ba5aa1000ca2eb346c471845e7"
        );
    }

    #[test]
    fn callback_signature_matches_reference_vector() {
        // MD5("D12345100000ORDER-001test-api-key-12345")
        assert_eq!(
            callback_signature(MERCHANT_CODE, "100000", ORDER_ID, API_KEY),
            "b3055b779bedc318fc001a013d7e853f"
        );
    }

    #[test]
    fn status_signature_matches_reference_vector() {
        // MD5("D12345ORDER-001test-api-key-12345")
        assert_eq!(
            status_signature(MERCHANT_CODE, ORDER_ID, API_KEY),
            "be18986177e5e69e88f7e9afa9ae394a"
        );
    }

    #[test]
    fn checkout_signature_matches_reference_vector() {
        // SHA-256("D123451732000000000test-api-key-12345")
        assert_eq!(
            checkout_signature(MERCHANT_CODE, 1_732_000_000_000, API_KEY),
            "cd7fc3623046ca13fd0269ac29a51d426feb8ca912e68d49aea0a24ea50b73ce"
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Field-order asymmetry
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invoice_and_callback_orderings_produce_distinct_digests() {
        // Same logical tuple, each scheme's own documented field order.
        let invoice = invoice_signature(MERCHANT_CODE, ORDER_ID, AMOUNT, API_KEY);
        let callback = callback_signature(MERCHANT_CODE, "100000", ORDER_ID, API_KEY);
        assert_ne!(invoice, callback);
    }

    // ══════════════════════════════════════════════════════════════
    // Determinism and sensitivity
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invoice_signature_is_deterministic() {
        let a = invoice_signature(MERCHANT_CODE, ORDER_ID, AMOUNT, API_KEY);
        let b = invoice_signature(MERCHANT_CODE, ORDER_ID, AMOUNT, API_KEY);
        assert_eq!(a, b);
    }

    #[test]
    fn changing_any_field_changes_the_digest() {
        let base = invoice_signature(MERCHANT_CODE, ORDER_ID, AMOUNT, API_KEY);
        assert_ne!(base, invoice_signature("D99999", ORDER_ID, AMOUNT, API_KEY));
        assert_ne!(base, invoice_signature(MERCHANT_CODE, "ORDER-002", AMOUNT, API_KEY));
        assert_ne!(base, invoice_signature(MERCHANT_CODE, ORDER_ID, 100_001, API_KEY));
        assert_ne!(base, invoice_signature(MERCHANT_CODE, ORDER_ID, AMOUNT, "other-key"));
    }

    #[test]
    fn callback_signature_changes_with_amount() {
        let a = callback_signature(MERCHANT_CODE, "100000", ORDER_ID, API_KEY);
        let b = callback_signature(MERCHANT_CODE, "100001", ORDER_ID, API_KEY);
        assert_ne!(a, b);
    }

    // ══════════════════════════════════════════════════════════════
    // Comparison
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn comparison_accepts_uppercase_hex() {
        let digest = invoice_signature(MERCHANT_CODE, ORDER_ID, AMOUNT, API_KEY);
        assert!(signatures_match(&digest, &digest.to_uppercase()));
    }

    #[test]
    fn comparison_rejects_wrong_digest() {
        let digest = invoice_signature(MERCHANT_CODE, ORDER_ID, AMOUNT, API_KEY);
        assert!(!signatures_match(&digest, &"0".repeat(32)));
    }

    #[test]
    fn comparison_rejects_length_mismatch() {
        let digest = invoice_signature(MERCHANT_CODE, ORDER_ID, AMOUNT, API_KEY);
        assert!(!signatures_match(&digest, &digest[..16]));
        assert!(!signatures_match(&digest, ""));
    }
}
