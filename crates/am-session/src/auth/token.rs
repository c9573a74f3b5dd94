//! JWT payload inspection.
//!
//! The signature is not verified; the backend does that. The client only
//! reads `exp` to avoid sending a token it already knows has expired.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::SessionError;

/// Claims read from an access token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Subject, the user's e-mail for this backend.
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Decodes the payload segment of `token`.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_session::auth::TokenClaims;
    ///
    /// // {"sub":"admin@result-education.ru","exp":1700000000}
    /// let token = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJhZG1pbkByZXN1bHQtZWR1Y2F0aW9uLnJ1IiwiZXhwIjoxNzAwMDAwMDAwfQ.sig";
    /// let claims = TokenClaims::decode(token).unwrap();
    /// assert_eq!(claims.exp, Some(1_700_000_000));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidToken`] if the token does not have
    /// three segments or the payload is not base64url-encoded JSON.
    pub fn decode(token: &str) -> Result<Self, SessionError> {
        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(SessionError::invalid_token("expected three segments"));
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| SessionError::invalid_token(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| SessionError::invalid_token(e.to_string()))
    }

    /// Returns the expiry time, if the token carries one.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Returns `true` if the token expired at or before `now`.
    ///
    /// Tokens without `exp` never expire on the client side.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let token = encode_test_token(&json!({"sub": "a@b.ru", "exp": (now - Duration::minutes(1)).timestamp()}));
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("a@b.ru"));
        assert!(claims.is_expired(now));

        let token = encode_test_token(&json!({"exp": (now + Duration::minutes(30)).timestamp()}));
        assert!(!TokenClaims::decode(&token).unwrap().is_expired(now));
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let claims = TokenClaims::decode(&encode_test_token(&json!({"sub": "x"}))).unwrap();
        assert!(claims.expires_at().is_none());
        assert!(!claims.is_expired(Utc::now()));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(TokenClaims::decode("not-a-jwt").is_err());
        assert!(TokenClaims::decode("a.b.c.d").is_err());
        assert!(TokenClaims::decode("a.!!!.c").is_err());
        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("plain"));
        assert!(matches!(TokenClaims::decode(&not_json), Err(SessionError::InvalidToken(_))));
    }
}
