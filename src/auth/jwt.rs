//! Access-token signing and verification, plus the opaque-token helpers used
//! for refresh tokens and invitation links.
//!
//! Access tokens are HS256 JWTs carrying [`Claims`]. Refresh and invitation
//! tokens are random UUIDs; only their SHA-256 hex digest is persisted.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{Role, User};

/// Claims
///
/// Payload of every access token. `org` and `role` are informational for the
/// client; the extractor always reloads both from the stored user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// Organization the user belonged to when the token was issued.
    pub org: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

pub fn generate_access_token(
    user: &User,
    config: &AppConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        org: user.organization_id,
        role: user.role,
        iat: now,
        exp: now + config.access_token_ttl_mins * 60,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Verifies signature and expiry and returns the embedded claims.
pub fn validate_token(
    token: &str,
    config: &AppConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Returns `(plaintext, sha256_hex)`. The plaintext goes to the client once.
pub fn generate_opaque_token() -> (String, String) {
    let plaintext = Uuid::new_v4().to_string();
    let hash = hash_token(&plaintext);
    (plaintext, hash)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            role: Role::Admin,
            ..User::default()
        }
    }

    #[test]
    fn issued_token_validates() {
        let config = AppConfig::default();
        let user = user();
        let token = generate_access_token(&user, &config).expect("token generation");

        let claims = validate_token(&token, &config).expect("token validation");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.org, user.organization_id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = AppConfig::default();
        // Well past the default 60 second leeway.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            org: Uuid::new_v4(),
            role: Role::Member,
            iat: now - 600,
            exp: now - 300,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let config = AppConfig::default();
        let other = AppConfig {
            jwt_secret: "a-completely-different-secret".to_string(),
            ..AppConfig::default()
        };
        let token = generate_access_token(&user(), &other).unwrap();
        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn opaque_token_hash_is_stable_hex() {
        let (plaintext, hash) = generate_opaque_token();
        assert_eq!(hash, hash_token(&plaintext));
        assert_eq!(hash.len(), 64);
        assert_ne!(plaintext, hash);
    }
}
