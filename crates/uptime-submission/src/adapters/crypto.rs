//! Ed25519 signature verification.
//!
//! The signed message is the network id byte followed by the BLAKE2b-256
//! hash of the sign payload, so a signature made for one network never
//! validates on another.

use crate::domain::{Signature, SubmitterKey};
use crate::ports::SignatureVerifier;
use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use tracing::debug;

/// Build the message a submitter signs.
pub fn signing_message(message_hash: &[u8], network_id: u8) -> Vec<u8> {
    let mut message = Vec::with_capacity(1 + message_hash.len());
    message.push(network_id);
    message.extend_from_slice(message_hash);
    message
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(
        &self,
        key: &SubmitterKey,
        signature: &Signature,
        message_hash: &[u8],
        network_id: u8,
    ) -> bool {
        let verifying_key = match VerifyingKey::from_bytes(key.as_bytes()) {
            Ok(k) => k,
            Err(e) => {
                debug!(submitter = %key, error = %e, "Submitter key is not a curve point");
                return false;
            }
        };
        let sig = DalekSignature::from_bytes(signature.as_bytes());

        verifying_key
            .verify(&signing_message(message_hash, network_id), &sig)
            .is_ok()
    }
}
