//! Export link tokens.
//!
//! A token authorises one export action for one database and is bound to
//! the anti-forgery value of the session it was rendered for. Stealing the
//! link without the session's csrf cookie gets an attacker nothing.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use dbexport_core::AuthError;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::signer::Signer;

/// Purpose label for export tokens.
pub const EXPORT_PURPOSE: &str = "export-database";

/// Tolerated clock skew for tokens that claim to be issued in the future.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Claims carried by an export token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportClaims {
    /// Database the token was minted for
    #[serde(rename = "d")]
    pub database: String,
    /// Anti-forgery value of the session the link was rendered for
    pub csrf: String,
    /// Unix seconds at mint time
    #[serde(rename = "t")]
    pub issued_at: i64,
}

/// Mints and verifies export tokens.
#[derive(Debug, Clone)]
pub struct LinkAuthorizer {
    signer: Arc<Signer>,
    max_age: Option<Duration>,
}

impl LinkAuthorizer {
    /// Create an authorizer. `max_age = None` disables expiry.
    pub fn new(signer: Arc<Signer>, max_age: Option<Duration>) -> Self {
        Self { signer, max_age }
    }

    /// The underlying signer.
    pub fn signer(&self) -> &Arc<Signer> {
        &self.signer
    }

    /// Mint a token for `database`, bound to `csrf`.
    pub fn mint(&self, database: &str, csrf: &str) -> String {
        self.mint_at(database, csrf, Utc::now())
    }

    /// Mint a token with an explicit issue time.
    pub fn mint_at(&self, database: &str, csrf: &str, issued_at: DateTime<Utc>) -> String {
        let claims = ExportClaims {
            database: database.to_string(),
            csrf: csrf.to_string(),
            issued_at: issued_at.timestamp(),
        };
        // Plain strings and an integer always serialize.
        self.signer
            .sign(&claims, EXPORT_PURPOSE)
            .unwrap_or_default()
    }

    /// Check the signature and age of `token`.
    ///
    /// # Errors
    ///
    /// [`AuthError::BadSignature`] if the token was not minted by this
    /// signer for [`EXPORT_PURPOSE`] or claims to come from the future;
    /// [`AuthError::Expired`] if it is older than the maximum age.
    pub fn verify(&self, token: &str) -> Result<ExportClaims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// [`verify`](Self::verify) against an explicit clock.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<ExportClaims, AuthError> {
        let claims: ExportClaims = self.signer.unsign(token, EXPORT_PURPOSE)?;
        let age = now.timestamp() - claims.issued_at;
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(AuthError::BadSignature);
        }
        if let Some(max_age) = self.max_age {
            if age > max_age.as_secs() as i64 {
                debug!(database = %claims.database, age, "export token expired");
                return Err(AuthError::Expired);
            }
        }
        Ok(claims)
    }

    /// Full check for an export request: signature, age, database, csrf binding.
    ///
    /// # Errors
    ///
    /// [`AuthError::BadSignature`] also covers a valid token minted for a
    /// different database. [`AuthError::CsrfMismatch`] means the token is
    /// genuine but belongs to another session.
    pub fn authorize(
        &self,
        token: &str,
        database: &str,
        session_csrf: &str,
    ) -> Result<ExportClaims, AuthError> {
        self.authorize_at(token, database, session_csrf, Utc::now())
    }

    /// [`authorize`](Self::authorize) against an explicit clock.
    pub fn authorize_at(
        &self,
        token: &str,
        database: &str,
        session_csrf: &str,
        now: DateTime<Utc>,
    ) -> Result<ExportClaims, AuthError> {
        let claims = self.verify_at(token, now)?;
        if claims.database != database {
            return Err(AuthError::BadSignature);
        }
        if !csrf_matches(session_csrf, &claims.csrf) {
            return Err(AuthError::CsrfMismatch);
        }
        Ok(claims)
    }
}

/// Bytes of entropy in a session anti-forgery value.
pub const CSRF_TOKEN_LEN: usize = 24;

/// Generate a fresh anti-forgery value for a new session.
pub fn new_csrf_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_LEN];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Constant-time comparison of two anti-forgery values.
pub fn csrf_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
