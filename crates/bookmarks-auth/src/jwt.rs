//! JWT token management
//!
//! Two token classes share one claim shape but are signed with independent
//! keys. The refresh key is the configured secret followed by
//! [`REFRESH_KEY_SUFFIX`], so operators only provision a single secret.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::AuthError;

/// Appended to the base secret to derive the refresh signing key
pub const REFRESH_KEY_SUFFIX: &str = "-refresh";

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Token class, selecting both the signing key and the TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Access,
    Refresh,
}

impl TokenClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenClass::Access => "access",
            TokenClass::Refresh => "refresh",
        }
    }

    /// Unit suffixes accepted in this class's TTL string, with their length in seconds
    fn ttl_units(&self) -> &'static [(char, i64)] {
        match self {
            TokenClass::Access => &[('h', 3600), ('m', 60)],
            TokenClass::Refresh => &[('d', 86_400), ('h', 3600)],
        }
    }
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (user ID)
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Username at issue time
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Why a token failed verification
///
/// Kept for diagnostics only; callers surface every variant as the same
/// unauthorized outcome.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("malformed or badly signed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),

    #[error("token expired")]
    Expired,
}

/// Parse a TTL string such as `24h`, `15m` or `7d` into seconds
///
/// Only the leading run of digits counts, so `1.5h` is one hour. A value
/// ending in one of the class's unit suffixes is that number times the unit;
/// anything else is read as a plain number of seconds. Input with no leading
/// digits, or too large to represent, yields 0 instead of failing.
pub fn parse_ttl(value: &str, class: TokenClass) -> i64 {
    let value = value.trim();

    let suffixed = value.chars().last().and_then(|last| {
        class
            .ttl_units()
            .iter()
            .find(|(unit, _)| *unit == last)
            .and_then(|(_, secs)| {
                leading_integer(&value[..value.len() - last.len_utf8()])
                    .and_then(|n| n.checked_mul(*secs))
            })
    });

    suffixed.or_else(|| leading_integer(value)).unwrap_or(0)
}

fn leading_integer(value: &str) -> Option<i64> {
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl SigningKeys {
    fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }
}

/// Issues and verifies access and refresh tokens
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl TokenIssuer {
    /// Create a new issuer from the base secret and the two TTL strings
    ///
    /// A TTL that parses to zero is accepted with a warning; tokens of that
    /// class are then expired on issue.
    pub fn new(secret: &str, access_ttl: &str, refresh_ttl: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration("signing secret is empty".to_string()));
        }

        let access_secs = parse_ttl(access_ttl, TokenClass::Access);
        let refresh_secs = parse_ttl(refresh_ttl, TokenClass::Refresh);

        for (class, raw, secs) in [
            (TokenClass::Access, access_ttl, access_secs),
            (TokenClass::Refresh, refresh_ttl, refresh_secs),
        ] {
            if secs == 0 {
                warn!(
                    "{} token TTL {:?} parsed to 0 seconds; {} tokens will be rejected",
                    class.as_str(),
                    raw,
                    class.as_str()
                );
            }
        }

        let refresh_secret = format!("{}{}", secret, REFRESH_KEY_SUFFIX);

        Ok(Self {
            access: SigningKeys::new(secret.as_bytes(), access_secs),
            refresh: SigningKeys::new(refresh_secret.as_bytes(), refresh_secs),
        })
    }

    fn keys(&self, class: TokenClass) -> &SigningKeys {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    /// Lifetime in seconds of tokens of the given class
    pub fn ttl_secs(&self, class: TokenClass) -> i64 {
        self.keys(class).ttl_secs
    }

    /// Issue a short-lived access token
    pub fn issue_access_token(&self, user_id: i64, username: &str) -> Result<String, AuthError> {
        self.issue_at(TokenClass::Access, user_id, username, Utc::now())
    }

    /// Issue a long-lived refresh token
    pub fn issue_refresh_token(&self, user_id: i64, username: &str) -> Result<String, AuthError> {
        self.issue_at(TokenClass::Refresh, user_id, username, Utc::now())
    }

    /// Issue a token of `class` as if the current time were `now`
    pub fn issue_at(
        &self,
        class: TokenClass,
        user_id: i64,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let keys = self.keys(class);
        let iat = now.timestamp();

        let claims = TokenClaims {
            user_id,
            username: username.to_string(),
            iat,
            exp: iat + keys.ttl_secs,
        };

        debug!("Issuing {} token for user: {}", class.as_str(), username);

        encode(&Header::new(ALGORITHM), &claims, &keys.encoding).map_err(AuthError::Jwt)
    }

    /// Verify a token against the key of `class`
    pub fn verify(&self, token: &str, class: TokenClass) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, class, Utc::now())
    }

    /// Verify a token as if the current time were `now`
    ///
    /// Expiry is strict: the token is valid only while `exp > now`.
    pub fn verify_at(
        &self,
        token: &str,
        class: TokenClass,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked below against the supplied clock, with no leeway
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &self.keys(class).decoding, &validation)
            .map_err(TokenError::Malformed)?;

        if data.claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
