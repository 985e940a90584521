//! Payment-gateway webhook signatures.
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac-sha256>`, where the MAC is
//! computed over `"<t>.<raw body>"` with the endpoint secret. Several `v1`
//! entries may be present during secret rotation.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    MissingSecret,
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("signature mismatch")]
    Mismatch,
}

/// Checks `header` against `payload`. `now` is unix seconds.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<Vec<u8>> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    candidates.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    let skew = now.checked_sub(timestamp).map(i64::unsigned_abs);
    if skew.is_none_or(|skew| skew > tolerance_secs.unsigned_abs()) {
        return Err(SignatureError::Expired);
    }

    let mac = signed_mac(payload, secret, timestamp)?;
    let matched = candidates
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok());
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Builds a header value the way the gateway does.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let mac = signed_mac(payload, secret, timestamp)?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_mac(payload: &[u8], secret: &str, timestamp: i64) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::MissingSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"invoice.paid"}"#;

    #[test]
    fn accepts_own_signature() {
        let header = sign(BODY, SECRET, 1_700_000_000).unwrap();
        assert_eq!(verify(BODY, &header, SECRET, 1_700_000_010, DEFAULT_TOLERANCE_SECS), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let header = sign(BODY, SECRET, 1_700_000_000).unwrap();
        assert_eq!(
            verify(b"{}", &header, SECRET, 1_700_000_000, DEFAULT_TOLERANCE_SECS),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify(BODY, &header, "whsec_other", 1_700_000_000, DEFAULT_TOLERANCE_SECS),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_and_malformed_headers() {
        let header = sign(BODY, SECRET, 1_700_000_000).unwrap();
        assert_eq!(
            verify(BODY, &header, SECRET, 1_700_001_000, DEFAULT_TOLERANCE_SECS),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify(BODY, "garbage", SECRET, 0, DEFAULT_TOLERANCE_SECS),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify(BODY, &header, "", 1_700_000_000, DEFAULT_TOLERANCE_SECS),
            Err(SignatureError::MissingSecret)
        );
    }

    #[test]
    fn any_v1_entry_may_match() {
        let good = sign(BODY, SECRET, 42).unwrap();
        let v1 = good.split(",v1=").nth(1).unwrap();
        let header = format!("t=42,v1={},v1={v1}", "00".repeat(32));
        assert_eq!(verify(BODY, &header, SECRET, 42, DEFAULT_TOLERANCE_SECS), Ok(()));
    }

    #[test]
    fn rejects_extreme_timestamp() {
        let now = 1_700_000_000;
        for t in [i64::MIN, i64::MAX, -1] {
            let header = format!("t={t},v1={}", "00".repeat(32));
            assert_eq!(
                verify(BODY, &header, SECRET, now, DEFAULT_TOLERANCE_SECS),
                Err(SignatureError::Expired)
            );
        }
    }
}
