//! Purpose-scoped HMAC signing of small JSON values.
//!
//! Token layout: `base64url(json) "." base64url(mac)` where
//! `mac = HMAC-SHA256(secret, purpose || 0x00 || base64url(json))`.
//! Mixing the purpose into the MAC means a token minted for one capability
//! never verifies for another.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use dbexport_core::AuthError;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of entropy in a generated secret.
pub const SECRET_LEN: usize = 32;

/// Signs and verifies values with a process-wide secret.
#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
}

impl Signer {
    /// Create a signer from an explicit secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Create a signer with a random secret. Tokens die with the process.
    pub fn random() -> Self {
        let mut secret = vec![0u8; SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        Self { secret }
    }

    fn mac(&self, purpose: &str, payload: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(purpose.as_bytes());
        mac.update(&[0]);
        mac.update(payload.as_bytes());
        mac
    }

    /// Sign `value` for `purpose`.
    ///
    /// # Errors
    ///
    /// Returns an error only if `value` cannot be serialized to JSON.
    pub fn sign<T: Serialize>(&self, value: &T, purpose: &str) -> serde_json::Result<String> {
        let json = serde_json::to_vec(value)?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let tag = self.mac(purpose, &payload).finalize().into_bytes();
        Ok(format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(tag)))
    }

    /// Verify `token` for `purpose` and decode its value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::BadSignature`] for malformed, tampered, forged or
    /// wrong-purpose tokens. The cause is not distinguished further.
    pub fn unsign<T: DeserializeOwned>(&self, token: &str, purpose: &str) -> Result<T, AuthError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(AuthError::BadSignature)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::BadSignature)?;

        // verify_slice compares in constant time
        self.mac(purpose, payload)
            .verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::BadSignature)?;
        serde_json::from_slice(&json).map_err(|_| AuthError::BadSignature)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
