//! Token issuer component.
//!
//! Signs and verifies HS256 tokens. Secret length and minimum lifetime are
//! validated at activation time, before any token operation is possible.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use armature::{async_trait, Component, Container, FlagSet, Setting};
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder secret, exactly 32 bytes. Deployments must override it.
const DEFAULT_SECRET: &str = "very-important-please-change-it!";
/// 7 days.
const DEFAULT_LIFETIME_SECS: i64 = 60 * 60 * 24 * 7;

const MIN_SECRET_BYTES: usize = 32;
const MIN_LIFETIME_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("secret key must be at least {MIN_SECRET_BYTES} bytes")]
    SecretTooShort,

    #[error("token lifetime must be at least {MIN_LIFETIME_SECS} seconds")]
    LifetimeTooShort,

    #[error("token issuer is not activated")]
    NotActivated,

    #[error("token verification failed")]
    Verification(#[source] jsonwebtoken::errors::Error),

    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Registered claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject the token was issued for.
    pub sub: String,
    /// Opaque token identifier.
    pub jti: String,
    pub iat: u64,
    pub nbf: u64,
    pub exp: u64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

pub struct TokenIssuer {
    id: String,
    secret: Setting<String>,
    lifetime_secs: Setting<i64>,
    keys: OnceLock<Keys>,
}

impl TokenIssuer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: Setting::new(DEFAULT_SECRET.to_string()),
            lifetime_secs: Setting::new(DEFAULT_LIFETIME_SECS),
            keys: OnceLock::new(),
        }
    }

    /// Sign a token for `subject` with the opaque identifier `token_id`.
    /// Returns the signed token and the effective lifetime in seconds
    /// (the configured lifetime unless `lifetime_secs` overrides it).
    pub fn issue(
        &self,
        token_id: &str,
        subject: &str,
        lifetime_secs: Option<u64>,
    ) -> Result<(String, u64), TokenError> {
        let keys = self.keys.get().ok_or(TokenError::NotActivated)?;
        let lifetime = lifetime_secs.unwrap_or(self.lifetime_secs.get() as u64);

        let now = get_current_timestamp();
        // Callers may pass an arbitrary override; saturate instead of
        // overflowing into an already-expired token.
        let claims = TokenClaims {
            sub: subject.to_string(),
            jti: token_id.to_string(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(lifetime),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(TokenError::Signing)?;
        Ok((token, lifetime))
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn parse(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let keys = self.keys.get().ok_or(TokenError::NotActivated)?;
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<TokenClaims>(token, &keys.decoding, &validation)
            .map_err(TokenError::Verification)?;
        Ok(data.claims)
    }
}

#[async_trait]
impl Component for TokenIssuer {
    fn id(&self) -> &str {
        &self.id
    }

    fn init_flags(&self, flags: &mut FlagSet) {
        flags.string("jwt-secret", &self.secret, "Secret key used to sign tokens");
        flags.int(
            "jwt-exp-secs",
            &self.lifetime_secs,
            "Token lifetime in seconds",
        );
    }

    async fn activate(&self, _ctx: &Container) -> anyhow::Result<()> {
        let secret = self.secret.get();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::SecretTooShort.into());
        }
        if self.lifetime_secs.get() < MIN_LIFETIME_SECS {
            return Err(TokenError::LifetimeTooShort.into());
        }

        let _ = self.keys.set(Keys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        });
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
