//! Signed retrieval URLs for backends without native presigning.
//!
//! Signature = hex(HMAC-SHA256(secret, "{key}\n{expires_at}")), where `expires_at` is a
//! unix timestamp in seconds. URLs have the form
//! `{base_url}/files/{key}?expires={expires_at}&signature={signature}`.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

/// Route prefix under which signed local files are served.
pub const SIGNED_FILE_ROUTE: &str = "/files";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signed URL has expired")]
    Expired,

    #[error("Invalid signature")]
    Invalid,
}

/// HMAC signer for storage keys.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, storage_key: &str, expires_at: i64) -> Hmac<Sha256> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(storage_key.as_bytes());
        mac.update(b"\n");
        mac.update(expires_at.to_string().as_bytes());
        mac
    }

    /// Hex signature for `storage_key` valid until `expires_at`.
    pub fn sign(&self, storage_key: &str, expires_at: i64) -> String {
        hex::encode(self.mac(storage_key, expires_at).finalize().into_bytes())
    }

    /// Build a URL granting access to `storage_key` for `expires_in`.
    pub fn signed_url(&self, base_url: &str, storage_key: &str, expires_in: Duration) -> String {
        let expires_at = Utc::now().timestamp() + expires_in.as_secs() as i64;
        let encoded_key = storage_key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}{}/{}?expires={}&signature={}",
            base_url.trim_end_matches('/'),
            SIGNED_FILE_ROUTE,
            encoded_key,
            expires_at,
            self.sign(storage_key, expires_at)
        )
    }

    /// Check a signature in constant time, then its expiry.
    pub fn verify(
        &self,
        storage_key: &str,
        expires_at: i64,
        signature: &str,
    ) -> Result<(), SignatureError> {
        let tag = hex::decode(signature).map_err(|_| SignatureError::Invalid)?;
        self.mac(storage_key, expires_at)
            .verify_slice(&tag)
            .map_err(|_| SignatureError::Invalid)?;
        if Utc::now().timestamp() > expires_at {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }
}
