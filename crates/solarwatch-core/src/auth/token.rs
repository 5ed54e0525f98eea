//! Client-side credential expiry check.
//!
//! The credential is a dot-delimited token whose second segment is a
//! base64url JSON payload carrying an `exp` claim in epoch seconds. The
//! signature is never verified here; the backend does that. This check only
//! avoids sending requests that are bound to be rejected.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// base64url, accepting payloads with or without `=` padding
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Expired,
}

impl TokenStatus {
    pub fn is_expired(self) -> bool {
        matches!(self, TokenStatus::Expired)
    }
}

/// Classify a credential against the current time.
pub fn validate(credential: &str) -> TokenStatus {
    validate_at(credential, Utc::now())
}

/// Classify a credential against `now`.
///
/// Malformed credentials are reported as `Expired`, never as an error.
pub fn validate_at(credential: &str, now: DateTime<Utc>) -> TokenStatus {
    match exp_claim(credential) {
        Some(exp) if (now.timestamp_millis() as f64) < exp * 1000.0 => TokenStatus::Valid,
        _ => TokenStatus::Expired,
    }
}

/// The `exp` claim as a timestamp, if the payload is readable.
pub fn expires_at(credential: &str) -> Option<DateTime<Utc>> {
    let exp = exp_claim(credential)?;
    Utc.timestamp_millis_opt((exp * 1000.0) as i64).single()
}

fn exp_claim(credential: &str) -> Option<f64> {
    let payload = credential.split('.').nth(1)?;
    let bytes = PAYLOAD_ENGINE.decode(payload).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("exp")?
        .as_f64()
        .filter(|exp| exp.is_finite())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Duration;

    /// Build an unsigned token around an arbitrary JSON payload
    pub(crate) fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    pub(crate) fn token_expiring_at(at: DateTime<Utc>) -> String {
        token_with_payload(&format!(r#"{{"sub":"u1","exp":{}}}"#, at.timestamp()))
    }

    #[test]
    fn test_future_exp_is_valid() {
        let token = token_expiring_at(Utc::now() + Duration::seconds(3600));
        assert_eq!(validate(&token), TokenStatus::Valid);
    }

    #[test]
    fn test_past_exp_is_expired() {
        let now = Utc::now();
        for secs in [1, 60, 3600, 86_400 * 365] {
            let token = token_expiring_at(now - Duration::seconds(secs));
            assert_eq!(validate_at(&token, now), TokenStatus::Expired, "exp {}s ago", secs);
        }
    }

    #[test]
    fn test_exp_equal_to_now_is_expired() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let token = token_expiring_at(now);
        assert_eq!(validate_at(&token, now), TokenStatus::Expired);
    }

    #[test]
    fn test_fractional_exp_is_accepted() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let token = token_with_payload(r#"{"exp":1700000000.5}"#);
        assert_eq!(validate_at(&token, now), TokenStatus::Valid);
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let padded = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":2000}"#);
        let token = format!("h.{}.s", padded);
        assert_eq!(validate_at(&token, now), TokenStatus::Valid);
    }

    #[test]
    fn test_malformed_tokens_are_expired() {
        let cases = vec![
            String::new(),
            "no-dots-at-all".to_string(),
            "header.!!!not-base64!!!.sig".to_string(),
            token_with_payload("not json"),
            token_with_payload(r#"{"sub":"u1"}"#),
            token_with_payload(r#"{"exp":"1700000000"}"#),
            token_with_payload(r#"{"exp":null}"#),
            token_with_payload(r#"[1,2,3]"#),
            format!("h.{}.s", URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd])),
        ];
        for token in cases {
            assert_eq!(validate(&token), TokenStatus::Expired, "token {:?}", token);
        }
    }

    #[test]
    fn test_expires_at_reads_claim() {
        let at = Utc.timestamp_opt(1_800_000_000, 0).unwrap();
        assert_eq!(expires_at(&token_expiring_at(at)), Some(at));
        assert_eq!(expires_at("garbage"), None);
    }
}
