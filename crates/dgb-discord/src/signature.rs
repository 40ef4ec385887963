use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use dgb_core::{errors::Error, Result};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Verifies that an interaction request was signed by the platform.
///
/// The platform signs `timestamp || body` with its Ed25519 key and sends the
/// hex-encoded signature in `X-Signature-Ed25519`.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn new(public_key: &[u8; 32]) -> Result<Self> {
        let key = VerifyingKey::from_bytes(public_key)
            .map_err(|e| Error::Config(format!("invalid platform public key: {e}")))?;
        Ok(Self { key })
    }

    /// Never fails: malformed headers, bad hex and mismatches all yield `false`.
    pub fn verify(&self, body: &[u8], timestamp: &str, signature_hex: &str) -> bool {
        self.check(body, timestamp, signature_hex).is_ok()
    }

    /// Like [`verify`](Self::verify), but says why a request was rejected.
    pub fn check(&self, body: &[u8], timestamp: &str, signature_hex: &str) -> Result<()> {
        if timestamp.is_empty() {
            return Err(Error::Authentication("missing signature timestamp".to_string()));
        }

        let raw = hex::decode(signature_hex.trim())
            .map_err(|e| Error::Authentication(format!("signature is not hex: {e}")))?;
        let sig_bytes = <[u8; 64]>::try_from(raw.as_slice()).map_err(|_| {
            Error::Authentication(format!("signature must be 64 bytes, got {}", raw.len()))
        })?;
        let signature = Signature::from_bytes(&sig_bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|_| Error::Authentication("signature mismatch".to_string()))
    }
}
