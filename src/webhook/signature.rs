//! HMAC-SHA256 webhook signatures

use crate::{PaymentError, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// How a provider encodes the signature header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureEncoding {
    /// Lowercase or uppercase hex digest (most providers)
    #[default]
    Hex,
    /// Standard base64 digest
    Base64,
}

/// Signature header format of a provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureScheme {
    pub encoding: SignatureEncoding,
    /// Prefix stripped from the header before decoding, e.g. `sha256=`
    pub prefix: Option<String>,
}

impl SignatureScheme {
    /// Hex digest without prefix
    pub fn hex() -> Self {
        Self::default()
    }

    /// Base64 digest without prefix
    pub fn base64() -> Self {
        Self {
            encoding: SignatureEncoding::Base64,
            prefix: None,
        }
    }

    /// Strip `prefix` from the header before decoding
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Produce the header value for `body`
    pub fn sign(&self, secret: &[u8], body: &[u8]) -> Result<String> {
        let digest = compute_digest(secret, body)?;
        let encoded = match self.encoding {
            SignatureEncoding::Hex => hex::encode(digest),
            SignatureEncoding::Base64 => general_purpose::STANDARD.encode(digest),
        };
        Ok(match &self.prefix {
            Some(prefix) => format!("{prefix}{encoded}"),
            None => encoded,
        })
    }

    /// Check `signature` against the HMAC of the exact `body` bytes
    ///
    /// An empty secret or signature is always rejected. The digest comparison
    /// is constant-time.
    pub fn verify(&self, body: &[u8], signature: &str, secret: &[u8]) -> Result<()> {
        if secret.is_empty() {
            return Err(PaymentError::signature("webhook secret is not configured"));
        }
        let signature = signature.trim();
        if signature.is_empty() {
            return Err(PaymentError::signature("signature header is missing"));
        }

        let provided = self
            .decode(signature)
            .ok_or_else(|| PaymentError::signature("signature is not validly encoded"))?;
        let expected = compute_digest(secret, body)?;

        if !constant_time_eq(&expected, &provided) {
            return Err(PaymentError::signature("signature does not match payload"));
        }
        Ok(())
    }

    fn decode(&self, signature: &str) -> Option<Vec<u8>> {
        let signature = match &self.prefix {
            Some(prefix) => signature.strip_prefix(prefix.as_str()).unwrap_or(signature),
            None => signature,
        };
        match self.encoding {
            SignatureEncoding::Hex => hex::decode(signature).ok(),
            SignatureEncoding::Base64 => general_purpose::STANDARD.decode(signature).ok(),
        }
    }
}

/// Hex HMAC-SHA256 of `body` under `secret`
pub fn sign_payload(secret: &[u8], body: &[u8]) -> Result<String> {
    SignatureScheme::hex().sign(secret, body)
}

/// Verify a hex HMAC-SHA256 signature
pub fn verify_signature(body: &[u8], signature: &str, secret: &[u8]) -> Result<()> {
    SignatureScheme::hex().verify(body, signature, secret)
}

fn compute_digest(secret: &[u8], body: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| PaymentError::signature(format!("unusable webhook secret: {e}")))?;
    mac.update(body);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
