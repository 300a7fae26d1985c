//! Core value types for uptime submissions.
//!
//! Keys and signatures travel as lowercase hex, raw payloads as standard
//! base64. Request fields decode leniently: an absent field becomes `None` and
//! is rejected later by [`SubmitRequest::into_submission`], so a missing field
//! and a malformed field produce different outcomes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// BLAKE2b with a 256-bit output.
pub type Blake2b256 = Blake2b<U32>;

/// Hash bytes with BLAKE2b-256.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake2b256::digest(data));
    out
}

/// Error parsing a fixed-size hex value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexValueError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexValueError> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(trimmed).map_err(|e| HexValueError::InvalidHex(e.to_string()))?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| HexValueError::InvalidLength { expected: N, actual })
}

/// Public key identifying a block producer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmitterKey([u8; 32]);

impl SubmitterKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for SubmitterKey {
    type Err = HexValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>(s).map(Self)
    }
}

impl fmt::Display for SubmitterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for SubmitterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubmitterKey({})", self)
    }
}

/// Signature over the hashed sign payload.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl FromStr for Signature {
    type Err = HexValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<64>(s).map(Self)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(SubmitterKey);
string_serde!(Signature);

/// Raw bytes carried as standard base64 in JSON.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Base64Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Base64Bytes({} bytes)", self.0.len())
    }
}

impl Serialize for Base64Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(s.as_bytes())
            .map(Base64Bytes)
            .map_err(serde::de::Error::custom)
    }
}

/// Set of submitters allowed to submit.
pub type Whitelist = HashSet<SubmitterKey>;

/// `data` object of a submission as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmitData {
    pub peer_id: Option<String>,
    pub block: Option<Base64Bytes>,
    pub created_at: Option<DateTime<Utc>>,
    pub snark_work: Option<Base64Bytes>,
    pub graphql_control_port: Option<u16>,
    pub built_with_commit_sha: Option<String>,
}

/// Body of `POST /v1/submit` as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmitRequest {
    pub submitter: Option<SubmitterKey>,
    pub sig: Option<Signature>,
    pub data: SubmitData,
}

impl SubmitRequest {
    /// Check that every required field is set and non-empty.
    ///
    /// Returns `None` when the submitter, signature, block, creation time or
    /// peer id is missing.
    pub fn into_submission(self) -> Option<Submission> {
        let SubmitRequest {
            submitter,
            sig,
            data,
        } = self;
        let block = data.block.filter(|b| !b.is_empty())?;
        let peer_id = data.peer_id.filter(|p| !p.is_empty())?;

        Some(Submission {
            submitter: submitter?,
            sig: sig?,
            data: SubmissionData {
                peer_id,
                block,
                created_at: data.created_at?,
                snark_work: data.snark_work,
                graphql_control_port: data.graphql_control_port,
                built_with_commit_sha: data.built_with_commit_sha,
            },
        })
    }
}

/// Submission data with all required fields present.
#[derive(Debug, Clone)]
pub struct SubmissionData {
    pub peer_id: String,
    pub block: Base64Bytes,
    pub created_at: DateTime<Utc>,
    pub snark_work: Option<Base64Bytes>,
    pub graphql_control_port: Option<u16>,
    pub built_with_commit_sha: Option<String>,
}

impl SubmissionData {
    /// Lowercase hex BLAKE2b-256 of the raw block bytes.
    pub fn block_hash(&self) -> String {
        hex::encode(blake2b_256(self.block.as_slice()))
    }
}

/// A submission that passed the required-field check.
#[derive(Debug, Clone)]
pub struct Submission {
    pub submitter: SubmitterKey,
    pub sig: Signature,
    pub data: SubmissionData,
}
