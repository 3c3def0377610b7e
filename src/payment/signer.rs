//! CheckMacValue computation.
//!
//! The gateway authenticates checkout parameters with a keyed SHA-256 digest
//! over a canonical rendering of the field set. The canonical form must match
//! the gateway's own recomputation byte for byte: fields sorted by name,
//! rendered `name=value` joined with `&`, bracketed by the shared HashKey and
//! HashIV, percent-encoded, lowercased, and then run through a fixed restore
//! table of characters the gateway requires to stay literal.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Characters left literal by JavaScript's `encodeURIComponent`, which the
/// gateway's reference implementation uses as its encoding baseline.
const URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Escapes the gateway spec requires restored after lowercasing, applied in
/// order. `%20` becomes `+`, the rest return to their literal characters.
const RESTORE_TABLE: &[(&str, &str)] = &[
    ("%2d", "-"),
    ("%5f", "_"),
    ("%2e", "."),
    ("%21", "!"),
    ("%2a", "*"),
    ("%28", "("),
    ("%29", ")"),
    ("%20", "+"),
];

/// Produces the canonical encoded form of the raw parameter string.
pub fn encode_for_mac(raw: &str) -> String {
    let mut encoded = utf8_percent_encode(raw, URI_COMPONENT_SET)
        .to_string()
        .to_lowercase();
    for (escape, literal) in RESTORE_TABLE {
        encoded = encoded.replace(escape, literal);
    }
    encoded
}

/// Computes the uppercase-hex CheckMacValue for a sorted field set.
///
/// `fields` must not already contain a `CheckMacValue` entry.
pub fn check_mac_value(
    fields: &BTreeMap<String, String>,
    hash_key: &str,
    hash_iv: &str,
) -> String {
    let mut raw = format!("HashKey={}", hash_key);
    for (name, value) in fields {
        raw.push('&');
        raw.push_str(name);
        raw.push('=');
        raw.push_str(value);
    }
    raw.push_str("&HashIV=");
    raw.push_str(hash_iv);

    let digest = Sha256::digest(encode_for_mac(&raw).as_bytes());
    hex::encode_upper(digest)
}

/// Recomputes the digest over a callback payload and compares it against the
/// `CheckMacValue` the gateway supplied. Payloads without a digest are
/// rejected outright.
pub fn verify_callback<'a, I>(params: I, hash_key: &str, hash_iv: &str) -> bool
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut provided = None;
    let mut rest = BTreeMap::new();
    for (name, value) in params {
        if name == "CheckMacValue" {
            provided = Some(value.clone());
        } else {
            rest.insert(name.clone(), value.clone());
        }
    }

    let Some(provided) = provided else {
        return false;
    };

    let expected = check_mac_value(&rest, hash_key, hash_iv);
    constant_time_eq(&expected, &provided.to_ascii_uppercase())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn encode_lowercases_escapes_and_restores_literals() {
        assert_eq!(
            encode_for_mac("HashKey=key&A=1&B=hello world"),
            "hashkey%3dkey%26a%3d1%26b%3dhello+world"
        );
    }

    #[test]
    fn encode_keeps_gateway_literal_characters() {
        assert_eq!(encode_for_mac("a-b_c.d!e*f(g)h"), "a-b_c.d!e*f(g)h");
    }

    #[test]
    fn encode_handles_url_values() {
        assert_eq!(
            encode_for_mac("ReturnURL=https://shop.example/api/payment/return"),
            "returnurl%3dhttps%3a%2f%2fshop.example%2fapi%2fpayment%2freturn"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        let f = fields(&[
            ("MerchantID", "3002607"),
            ("MerchantTradeNo", "ORD17000000000001"),
            ("TotalAmount", "1280"),
        ]);
        let a = check_mac_value(&f, "key", "iv");
        let b = check_mac_value(&f, "key", "iv");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, a.to_ascii_uppercase());
    }

    #[test]
    fn changing_any_field_changes_the_digest() {
        let base = fields(&[
            ("MerchantID", "3002607"),
            ("MerchantTradeNo", "ORD17000000000001"),
            ("TotalAmount", "1280"),
        ]);
        let baseline = check_mac_value(&base, "key", "iv");

        for (name, tampered) in [
            ("MerchantID", "3002608"),
            ("MerchantTradeNo", "ORD17000000000002"),
            ("TotalAmount", "1281"),
        ] {
            let mut changed = base.clone();
            changed.insert(name.to_string(), tampered.to_string());
            assert_ne!(check_mac_value(&changed, "key", "iv"), baseline);
        }

        // The secrets participate too
        assert_ne!(check_mac_value(&base, "key2", "iv"), baseline);
        assert_ne!(check_mac_value(&base, "key", "iv2"), baseline);
    }

    #[test]
    fn verify_accepts_a_payload_signed_with_the_same_secrets() {
        let mut payload = fields(&[
            ("MerchantTradeNo", "ORD17000000000001"),
            ("RtnCode", "1"),
            ("RtnMsg", "Succeeded"),
        ]);
        let mac = check_mac_value(&payload, "key", "iv");
        payload.insert("CheckMacValue".to_string(), mac);

        assert!(verify_callback(payload.iter(), "key", "iv"));
    }

    #[test]
    fn verify_rejects_tampered_or_unsigned_payloads() {
        let mut payload = fields(&[("MerchantTradeNo", "ORD1"), ("RtnCode", "1")]);

        // No digest at all
        assert!(!verify_callback(payload.iter(), "key", "iv"));

        let mac = check_mac_value(&payload, "key", "iv");
        payload.insert("CheckMacValue".to_string(), mac);

        // Tampered result code
        let mut tampered = payload.clone();
        tampered.insert("RtnCode".to_string(), "0".to_string());
        assert!(!verify_callback(tampered.iter(), "key", "iv"));

        // Wrong secrets
        assert!(!verify_callback(payload.iter(), "other", "iv"));
    }
}
