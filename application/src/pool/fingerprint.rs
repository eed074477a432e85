//! Credential fingerprints for pool keys.

use sha2::{Digest, Sha256};
use toolgate_domain::Credentials;

/// Fingerprint used when no credentials are present.
pub const ANONYMOUS_FINGERPRINT: &str = "none";

/// Stable digest of the credential material.
///
/// Any change to the secret, the refresh token or the kind yields a new
/// fingerprint. The secret itself never appears in pool keys or logs.
pub fn credential_fingerprint(credentials: Option<&Credentials>) -> String {
    let Some(credentials) = credentials else {
        return ANONYMOUS_FINGERPRINT.to_string();
    };

    let mut hasher = Sha256::new();
    hasher.update(credentials.kind().as_bytes());
    hasher.update([0u8]);
    hasher.update(credentials.secret().as_bytes());
    hasher.update([0u8]);
    hasher.update(credentials.refresh_token().unwrap_or_default().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_opaque() {
        let creds = Credentials::oauth("secret-token").with_refresh_token("r1");
        let a = credential_fingerprint(Some(&creds));
        let b = credential_fingerprint(Some(&creds.clone()));

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(!a.contains("secret-token"));
    }

    #[test]
    fn test_fingerprint_changes_with_material() {
        let base = credential_fingerprint(Some(&Credentials::oauth("tok")));
        assert_ne!(base, credential_fingerprint(Some(&Credentials::oauth("tok2"))));
        assert_ne!(
            base,
            credential_fingerprint(Some(&Credentials::oauth("tok").with_refresh_token("r")))
        );
        assert_ne!(base, credential_fingerprint(Some(&Credentials::api_key("tok"))));
    }

    #[test]
    fn test_expiry_does_not_change_fingerprint() {
        let creds = Credentials::oauth("tok");
        let with_expiry = creds.clone().with_expires_at(chrono::Utc::now());
        assert_eq!(
            credential_fingerprint(Some(&creds)),
            credential_fingerprint(Some(&with_expiry))
        );
    }

    #[test]
    fn test_anonymous_fingerprint() {
        assert_eq!(credential_fingerprint(None), ANONYMOUS_FINGERPRINT);
    }
}
