//! Bookmarks Authentication
//!
//! This crate provides credential hashing, signed access/refresh tokens
//! and the request gate that resolves a bearer token to a live identity.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use error::AuthError;
pub use jwt::{TokenClaims, TokenClass, TokenError, TokenIssuer, parse_ttl};
pub use middleware::{AuthGate, AuthUser, IdentityLookup, auth_middleware, extract_bearer_token};
pub use password::{CredentialHasher, DEFAULT_HASH_COST};
