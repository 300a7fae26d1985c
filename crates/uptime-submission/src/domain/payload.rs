//! Canonical sign payload and the metadata object persisted per submission.

use super::types::{Base64Bytes, SubmissionData, SubmitterKey};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Format a timestamp as RFC3339 UTC with second precision (`...Z`).
pub fn rfc3339_seconds(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// Field order is part of the signed message.
#[derive(Serialize)]
struct SignPayload<'a> {
    block: &'a Base64Bytes,
    created_at: String,
    peer_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    snark_work: Option<&'a Base64Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    graphql_control_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    built_with_commit_sha: Option<&'a str>,
}

#[derive(Serialize)]
struct MetaToBeSaved<'a> {
    created_at: String,
    peer_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    snark_work: Option<&'a Base64Bytes>,
    remote_addr: &'a str,
    submitter: &'a SubmitterKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    graphql_control_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    built_with_commit_sha: Option<&'a str>,
    block_hash: &'a str,
}

impl SubmissionData {
    /// Bytes the submitter signed (after hashing).
    pub fn make_sign_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&SignPayload {
            block: &self.block,
            created_at: rfc3339_seconds(&self.created_at),
            peer_id: &self.peer_id,
            snark_work: self.snark_work.as_ref(),
            graphql_control_port: self.graphql_control_port,
            built_with_commit_sha: self.built_with_commit_sha.as_deref(),
        })
    }

    /// Metadata object written under `submissions/`.
    pub fn make_meta(
        &self,
        submitter: &SubmitterKey,
        remote_addr: &str,
        block_hash: &str,
    ) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&MetaToBeSaved {
            created_at: rfc3339_seconds(&self.created_at),
            peer_id: &self.peer_id,
            snark_work: self.snark_work.as_ref(),
            remote_addr,
            submitter,
            graphql_control_port: self.graphql_control_port,
            built_with_commit_sha: self.built_with_commit_sha.as_deref(),
            block_hash,
        })
    }
}
