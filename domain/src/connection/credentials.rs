//! Provider credentials
//!
//! Credentials are a tagged union so freshness checks can match exhaustively
//! on the credential kind:
//!
//! ```json
//! { "kind": "oauth", "access_token": "...", "refresh_token": "...", "expires_at": "2026-01-01T00:00:00Z" }
//! { "kind": "api_key", "key": "..." }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Credential material held by a connection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    /// OAuth bearer token, optionally refreshable.
    #[serde(rename = "oauth")]
    OAuth {
        access_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refresh_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_at: Option<DateTime<Utc>>,
    },
    /// Static API key. Never expires.
    ApiKey { key: String },
}

impl Credentials {
    pub fn oauth(access_token: impl Into<String>) -> Self {
        Credentials::OAuth {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials::ApiKey { key: key.into() }
    }

    /// Attach a refresh token (no-op for API keys).
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        if let Credentials::OAuth { refresh_token, .. } = &mut self {
            *refresh_token = Some(token.into());
        }
        self
    }

    /// Attach an expiry instant (no-op for API keys).
    pub fn with_expires_at(mut self, at: DateTime<Utc>) -> Self {
        if let Credentials::OAuth { expires_at, .. } = &mut self {
            *expires_at = Some(at);
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::OAuth { .. } => "oauth",
            Credentials::ApiKey { .. } => "api_key",
        }
    }

    /// The secret presented to the provider on each request.
    pub fn secret(&self) -> &str {
        match self {
            Credentials::OAuth { access_token, .. } => access_token,
            Credentials::ApiKey { key } => key,
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Credentials::OAuth { refresh_token, .. } => refresh_token.as_deref(),
            Credentials::ApiKey { .. } => None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Credentials::OAuth { expires_at, .. } => *expires_at,
            Credentials::ApiKey { .. } => None,
        }
    }

    /// Whether the token must be refreshed before use at `now`.
    ///
    /// Credentials without an expiry never need a refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>, safety_skew: Duration) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at - safety_skew,
            None => false,
        }
    }

    /// Apply the result of a refresh exchange.
    ///
    /// A provider that omits a new refresh token keeps the current one.
    /// Returns `false` for API keys, which cannot be refreshed.
    pub fn apply_refresh(
        &mut self,
        new_access_token: String,
        new_refresh_token: Option<String>,
        new_expires_at: Option<DateTime<Utc>>,
    ) -> bool {
        match self {
            Credentials::OAuth {
                access_token,
                refresh_token,
                expires_at,
            } => {
                *access_token = new_access_token;
                if new_refresh_token.is_some() {
                    *refresh_token = new_refresh_token;
                }
                *expires_at = new_expires_at;
                true
            }
            Credentials::ApiKey { .. } => false,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::OAuth {
                refresh_token,
                expires_at,
                ..
            } => f
                .debug_struct("OAuth")
                .field("access_token", &"<redacted>")
                .field("refresh_token", &refresh_token.as_ref().map(|_| "<redacted>"))
                .field("expires_at", expires_at)
                .finish(),
            Credentials::ApiKey { .. } => f
                .debug_struct("ApiKey")
                .field("key", &"<redacted>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_tagged_union() {
        let oauth: Credentials = serde_json::from_str(
            r#"{"kind":"oauth","access_token":"at","refresh_token":"rt","expires_at":"2030-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(oauth.kind(), "oauth");
        assert_eq!(oauth.secret(), "at");
        assert_eq!(oauth.refresh_token(), Some("rt"));
        assert!(oauth.expires_at().is_some());

        let key: Credentials = serde_json::from_str(r#"{"kind":"api_key","key":"k"}"#).unwrap();
        assert_eq!(key, Credentials::api_key("k"));
        assert!(key.refresh_token().is_none());
    }

    #[test]
    fn test_needs_refresh_honours_skew() {
        let now = Utc::now();
        let skew = Duration::seconds(60);

        let fresh = Credentials::oauth("at").with_expires_at(now + Duration::minutes(10));
        assert!(!fresh.needs_refresh(now, skew));

        let inside_skew = Credentials::oauth("at").with_expires_at(now + Duration::seconds(30));
        assert!(inside_skew.needs_refresh(now, skew));

        let expired = Credentials::oauth("at").with_expires_at(now - Duration::seconds(1));
        assert!(expired.needs_refresh(now, Duration::zero()));

        assert!(!Credentials::oauth("at").needs_refresh(now, skew));
        assert!(!Credentials::api_key("k").needs_refresh(now, skew));
    }

    #[test]
    fn test_apply_refresh_keeps_existing_refresh_token() {
        let mut creds = Credentials::oauth("old").with_refresh_token("rt-1");
        let expiry = Utc::now() + Duration::hours(1);

        assert!(creds.apply_refresh("new".to_string(), None, Some(expiry)));
        assert_eq!(creds.secret(), "new");
        assert_eq!(creds.refresh_token(), Some("rt-1"));
        assert_eq!(creds.expires_at(), Some(expiry));

        let mut key = Credentials::api_key("k");
        assert!(!key.apply_refresh("x".to_string(), None, None));
        assert_eq!(key.secret(), "k");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::oauth("super-secret").with_refresh_token("also-secret");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("also-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
