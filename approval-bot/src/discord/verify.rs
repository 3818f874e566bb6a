//! Interaction request signature verification.
//!
//! Discord signs every webhook delivery with the application's ed25519 key
//! and disables endpoints that accept unverified requests.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Malformed public key")]
    MalformedKey,

    #[error("Malformed signature header")]
    MalformedSignature,

    #[error("Signature mismatch")]
    Mismatch,
}

/// Verifier holding the application's public key.
#[derive(Clone)]
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    /// Build from the hex-encoded public key shown in the Discord
    /// application settings.
    pub fn from_hex(public_key: &str) -> Result<Self, SignatureError> {
        let bytes: [u8; 32] = hex::decode(public_key)
            .map_err(|_| SignatureError::MalformedKey)?
            .try_into()
            .map_err(|_| SignatureError::MalformedKey)?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| SignatureError::MalformedKey)?;
        Ok(Self { key })
    }

    /// Verify the `X-Signature-Ed25519` header over timestamp + raw body.
    pub fn verify(
        &self,
        signature_hex: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        let bytes: [u8; 64] = hex::decode(signature_hex)
            .map_err(|_| SignatureError::MalformedSignature)?
            .try_into()
            .map_err(|_| SignatureError::MalformedSignature)?;
        let signature = Signature::from_bytes(&bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }
}
