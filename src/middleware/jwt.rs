//! HS256 bearer-token authentication.
//!
//! [`JwtAuth`] verifies a token taken from a request header and stores its
//! decoded claims in the context extras under [`JWT_EXTRA_KEY`]. Handlers
//! behind it read them back with `ctx.extra::<T>(JWT_EXTRA_KEY)`.
//!
//! | Outcome | Response |
//! |---|---|
//! | header missing or signature invalid | 401 with the verification error |
//! | `exp` in the past | 401 `session expiration` |
//! | verified claims don't decode into `T` | 500 with the decoding error |
//!
//! `exp` is optional: tokens without it never expire.

use std::any::Any;
use std::marker::PhantomData;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::handler::Handler;

/// Extras key the verified claims are stored under.
pub const JWT_EXTRA_KEY: &str = "jwt";

/// The registered claim names of RFC 7519, all optional.
///
/// Flatten it into an application claims type:
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Claims {
///     name: String,
///     #[serde(flatten)]
///     registered: RegisteredClaims,
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl RegisteredClaims {
    /// Claims issued now and expiring after `ttl`.
    #[must_use]
    pub fn expiring_in(ttl: Duration) -> Self {
        let now = unix_now();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            iat: Some(now),
            exp: Some(now.saturating_add(ttl)),
            ..Self::default()
        }
    }
}

fn unix_now() -> i64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Sign `claims` as an HS256 token with `secret`.
///
/// # Errors
///
/// Returns an error if the claims cannot be serialized.
pub fn create_token<C: Serialize>(
    secret: &[u8],
    claims: &C,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Middleware verifying HS256 tokens and decoding their claims into `T`.
pub struct JwtAuth<T> {
    key: DecodingKey,
    header: String,
    validation: Validation,
    _claims: PhantomData<fn() -> T>,
}

impl<T> JwtAuth<T> {
    /// Verify tokens signed with `secret`, read from header `header`.
    ///
    /// The header value may carry a `Bearer ` prefix.
    pub fn new(secret: &[u8], header: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(secret),
            header: header.into(),
            validation,
            _claims: PhantomData,
        }
    }

    /// Accept tokens up to `secs` seconds past their `exp`.
    #[must_use]
    pub fn leeway(mut self, secs: u64) -> Self {
        self.validation.leeway = secs;
        self
    }
}

impl<T> Handler for JwtAuth<T>
where
    T: DeserializeOwned + Any + Send + Sync,
{
    fn handle(&self, ctx: &mut Context) {
        let verified = match ctx.header(&self.header) {
            Some(raw) => {
                let raw = raw.trim();
                let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
                decode::<serde_json::Value>(token, &self.key, &self.validation).map_err(Some)
            }
            None => Err(None),
        };

        let payload = match verified {
            Ok(data) => data.claims,
            Err(None) => {
                debug!(request_id = %ctx.request_id(), header = %self.header, "Token missing");
                ctx.fail(401, "token missing");
                return;
            }
            Err(Some(e)) => {
                debug!(request_id = %ctx.request_id(), error = %e, "Token rejected");
                match e.kind() {
                    ErrorKind::ExpiredSignature => ctx.fail(401, "session expiration"),
                    _ => ctx.fail(401, e.to_string()),
                }
                return;
            }
        };

        // The signature is good from here on; a shape mismatch is a server-side bug.
        match serde_json::from_value::<T>(payload) {
            Ok(claims) => {
                ctx.set_extra(JWT_EXTRA_KEY, claims);
                ctx.next();
            }
            Err(e) => ctx.fail(500, e.to_string()),
        }
    }
}
