//! Reading the expiry claim out of a JWT.
//!
//! The signature is never checked here: the server does that. The client only
//! needs to know whether a refresh token is worth sending.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: f64,
}

/// Decode the `exp` claim of a JWT, if it has one.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    if !claim.exp.is_finite() {
        return None;
    }
    DateTime::from_timestamp(claim.exp as i64, 0)
}

/// Whether the token's `exp` lies after `now`. Undecodable tokens are invalid.
pub fn is_valid_at(token: &str, now: DateTime<Utc>) -> bool {
    expires_at(token).is_some_and(|exp| exp > now)
}

/// Whether a refresh token can still be exchanged. Never fails: anything that
/// cannot be decoded counts as expired.
pub fn is_refresh_token_valid(token: &str) -> bool {
    is_valid_at(token, Utc::now())
}

/// Build an unsigned token carrying only an `exp` claim.
#[cfg(test)]
pub(crate) fn unsigned_token(exp: i64) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"token_type":"refresh","exp":{exp}}}"#)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_future_expiry_is_valid() {
        let exp = (Utc::now() + Duration::days(7)).timestamp();
        let token = unsigned_token(exp);
        assert!(is_refresh_token_valid(&token));
        assert_eq!(expires_at(&token).unwrap().timestamp(), exp);
    }

    #[test]
    fn test_past_expiry_is_invalid() {
        let token = unsigned_token((Utc::now() - Duration::minutes(1)).timestamp());
        assert!(!is_refresh_token_valid(&token));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let token = unsigned_token(now.timestamp() + 60);
        assert!(is_valid_at(&token, now));
        assert!(!is_valid_at(&token, now + Duration::seconds(60)));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(!is_refresh_token_valid(""));
        assert!(!is_refresh_token_valid("not-a-jwt"));
        assert!(!is_refresh_token_valid("a.b.c.d"));
        assert!(!is_refresh_token_valid("a.!!!.c"));
    }

    #[test]
    fn test_payload_without_exp_is_invalid() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"42"}"#);
        assert!(expires_at(&format!("h.{payload}.s")).is_none());
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let payload = base64::engine::general_purpose::URL_SAFE.encode(format!(r#"{{"exp":{exp}}}"#));
        assert!(is_refresh_token_valid(&format!("h.{payload}.s")));
    }
}
