//! Bearer token builders for tests.

use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Builds HS256 tokens with arbitrary subject and expiry.
pub struct TokenBuilder {
    secret: String,
    subject: String,
    ttl_secs: i64,
}

impl TokenBuilder {
    /// Starts a builder for the given shared secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            subject: "test-user".to_string(),
            ttl_secs: 3600,
        }
    }

    /// Sets the subject claim.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the token lifetime relative to now; negative values produce
    /// an already-expired token.
    #[must_use]
    pub fn ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Encodes the token.
    #[must_use]
    pub fn build(&self) -> String {
        let exp = usize::try_from((chrono::Utc::now().timestamp() + self.ttl_secs).max(0))
            .unwrap_or_default();
        jsonwebtoken::encode(
            &Header::default(),
            &Claims {
                sub: self.subject.clone(),
                exp,
            },
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("HS256 encoding cannot fail")
    }
}

/// A token for `subject` valid for one hour.
#[must_use]
pub fn valid_token(secret: &str, subject: &str) -> String {
    TokenBuilder::new(secret).subject(subject).build()
}

/// A token for `subject` that expired an hour ago.
#[must_use]
pub fn expired_token(secret: &str, subject: &str) -> String {
    TokenBuilder::new(secret)
        .subject(subject)
        .ttl_secs(-3600)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm, DecodingKey, Validation};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Decoded {
        sub: String,
    }

    #[test]
    fn valid_token_decodes_with_the_same_secret() {
        let token = valid_token("secret", "alice");
        let decoded = jsonwebtoken::decode::<Decoded>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "alice");
    }

    #[test]
    fn expired_token_fails_validation() {
        let token = expired_token("secret", "alice");
        let result = jsonwebtoken::decode::<Decoded>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }
}
