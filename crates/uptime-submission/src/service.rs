//! Submission pipeline: everything after the body has been read.
//!
//! Decode → Required fields → Whitelist → Freshness → Signature → RateLimit
//! → Paths → Persist. Each stage either continues or ends the request with a
//! [`SubmitError`]; no stage after a terminal one runs.

use crate::domain::{
    blake2b_256, IngestConfig, StoragePaths, SubmitError, SubmitRequest, Submission,
};
use crate::persistence::{ObjectSet, PersistenceFanout, SaveReport};
use crate::ports::{SignatureVerifier, TimeSource};
use crate::state::{AttemptCounter, WhitelistSnapshot};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Bytes of a rejected body included in the decode-failure log line.
const BODY_PREVIEW_LEN: usize = 200;

/// Validates, rate-limits and persists decoded submissions.
pub struct SubmissionPipeline {
    config: IngestConfig,
    network_id: u8,
    attempts: Arc<AttemptCounter>,
    whitelist: Option<Arc<WhitelistSnapshot>>,
    verifier: Option<Arc<dyn SignatureVerifier>>,
    fanout: Arc<PersistenceFanout>,
    clock: Arc<dyn TimeSource>,
}

impl SubmissionPipeline {
    /// `whitelist` and `verifier` may be `None` only when the configuration
    /// disables the corresponding stage.
    pub fn new(
        config: IngestConfig,
        attempts: Arc<AttemptCounter>,
        whitelist: Option<Arc<WhitelistSnapshot>>,
        verifier: Option<Arc<dyn SignatureVerifier>>,
        fanout: Arc<PersistenceFanout>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let network_id = config.network_id();
        Self {
            config,
            network_id,
            attempts,
            whitelist,
            verifier,
            fanout,
            clock,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn attempts(&self) -> &Arc<AttemptCounter> {
        &self.attempts
    }

    /// Run every stage on a fully read request body.
    pub async fn process(&self, body: &[u8], remote_addr: &str) -> Result<SaveReport, SubmitError> {
        let request: SubmitRequest = serde_json::from_slice(body).map_err(|e| {
            let preview = &body[..body.len().min(BODY_PREVIEW_LEN)];
            warn!(
                error = %e,
                body = %String::from_utf8_lossy(preview),
                "Error decoding payload"
            );
            SubmitError::Decode
        })?;

        let submission = request.into_submission().ok_or_else(|| {
            debug!(remote_addr, "Required field missing");
            SubmitError::MissingFields
        })?;
        let submitter = submission.submitter;

        self.check_whitelist(&submission)?;

        let now = self.clock.now();
        if submission.data.created_at - self.config.limits.time_diff_delta() > now {
            debug!(%submitter, created_at = %submission.data.created_at, "Timestamp in future");
            return Err(SubmitError::FutureTimestamp);
        }

        self.check_signature(&submission)?;

        if !self.attempts.record_attempt(&submitter) {
            info!(%submitter, "Attempt quota exhausted");
            return Err(SubmitError::RateLimited);
        }

        let block_hash = submission.data.block_hash();
        let paths = StoragePaths::build(now, &block_hash, &submitter);

        let meta = submission
            .data
            .make_meta(&submitter, remote_addr, &block_hash)
            .map_err(|e| {
                error!(%submitter, error = %e, "Failed to encode metadata");
                SubmitError::Internal(e.to_string())
            })?;

        let mut objects = ObjectSet::new();
        objects.insert(paths.meta.clone(), meta);
        objects.insert(paths.block, submission.data.block.0);

        let report = self.fanout.save(&objects).await;
        if report.failed() > 0 {
            warn!(
                %submitter,
                meta = %paths.meta,
                failed = report.failed(),
                "Submission not stored in every destination"
            );
        }
        info!(%submitter, meta = %paths.meta, "Submission accepted");

        Ok(report)
    }

    fn check_whitelist(&self, submission: &Submission) -> Result<(), SubmitError> {
        if self.config.whitelist.disabled {
            return Ok(());
        }
        // A missing snapshot while enabled means nothing was loaded: deny.
        let allowed = self
            .whitelist
            .as_ref()
            .is_some_and(|w| w.contains(&submission.submitter));
        if !allowed {
            debug!(submitter = %submission.submitter, "Submitter not in whitelist");
            return Err(SubmitError::NotRegistered(submission.submitter));
        }
        Ok(())
    }

    fn check_signature(&self, submission: &Submission) -> Result<(), SubmitError> {
        if self.config.verify_signature_disabled {
            return Ok(());
        }
        let Some(verifier) = self.verifier.as_ref() else {
            error!("Signature verification enabled without a verifier");
            return Err(SubmitError::Internal("no signature verifier".into()));
        };

        let payload = submission.data.make_sign_payload().map_err(|e| {
            error!(submitter = %submission.submitter, error = %e, "Failed to build sign payload");
            SubmitError::Internal(e.to_string())
        })?;
        let hash = blake2b_256(&payload);

        if !verifier.verify(&submission.submitter, &submission.sig, &hash, self.network_id) {
            debug!(submitter = %submission.submitter, "Invalid signature");
            return Err(SubmitError::InvalidSignature);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::domain::{Signature, SubmitterKey};
    use crate::ports::ObjectStore;
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::Duration;

    struct FixedClock(DateTime<Utc>);

    impl TimeSource for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct AcceptAll;

    impl SignatureVerifier for AcceptAll {
        fn verify(&self, _: &SubmitterKey, _: &Signature, _: &[u8], _: u8) -> bool {
            true
        }
    }

    struct RejectAll;

    impl SignatureVerifier for RejectAll {
        fn verify(&self, _: &SubmitterKey, _: &Signature, _: &[u8], _: u8) -> bool {
            false
        }
    }

    fn submitter() -> SubmitterKey {
        SubmitterKey::from_bytes([0x42; 32])
    }

    fn body(created_at: &str) -> Vec<u8> {
        format!(
            r#"{{"submitter":"{}","sig":"{}","data":{{"peer_id":"peer","block":"AQID","created_at":"{}"}}}}"#,
            submitter(),
            hex::encode([1u8; 64]),
            created_at
        )
        .into_bytes()
    }

    fn pipeline(
        verifier: Arc<dyn SignatureVerifier>,
        whitelisted: bool,
    ) -> (SubmissionPipeline, Arc<MemoryStore>) {
        let mut config = IngestConfig::default();
        config.storage.memory = true;
        config.whitelist.file = Some("unused".into());

        let mut whitelist = crate::domain::Whitelist::new();
        if whitelisted {
            whitelist.insert(submitter());
        }

        let store = Arc::new(MemoryStore::new("memory"));
        let fanout = PersistenceFanout::new(vec![Arc::clone(&store) as Arc<dyn ObjectStore>]);
        let pipeline = SubmissionPipeline::new(
            config,
            Arc::new(AttemptCounter::new(2, Duration::from_secs(3600))),
            Some(Arc::new(WhitelistSnapshot::new(whitelist))),
            Some(verifier),
            Arc::new(fanout),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())),
        );
        (pipeline, store)
    }

    #[tokio::test]
    async fn test_accepted_submission_is_stored() {
        let (pipeline, store) = pipeline(Arc::new(AcceptAll), true);

        let report = pipeline
            .process(&body("2024-03-01T09:59:00Z"), "10.0.0.1")
            .await
            .unwrap();
        assert_eq!(report.written(), 2);

        let meta_path = format!(
            "submissions/2024-03-01/2024-03-01T10:00:00Z-{}.json",
            submitter()
        );
        let meta: serde_json::Value =
            serde_json::from_slice(&store.get(&meta_path).unwrap()).unwrap();
        assert_eq!(meta["remote_addr"], "10.0.0.1");
        assert_eq!(meta["created_at"], "2024-03-01T09:59:00Z");

        let block_path = format!("blocks/{}.dat", hex::encode(blake2b_256(&[1, 2, 3])));
        assert_eq!(store.get(&block_path).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_unregistered_submitter_rejected() {
        let (pipeline, store) = pipeline(Arc::new(AcceptAll), false);
        let err = pipeline
            .process(&body("2024-03-01T09:59:00Z"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::NotRegistered(k) if k == submitter()));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_future_timestamp_boundary() {
        let (pipeline, _) = pipeline(Arc::new(AcceptAll), true);

        // Exactly delta ahead is still accepted
        assert!(pipeline
            .process(&body("2024-03-01T10:05:00Z"), "x")
            .await
            .is_ok());

        let err = pipeline
            .process(&body("2024-03-01T10:05:01Z"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::FutureTimestamp));
    }

    #[tokio::test]
    async fn test_invalid_signature_does_not_consume_quota() {
        let (pipeline, _) = pipeline(Arc::new(RejectAll), true);
        let err = pipeline
            .process(&body("2024-03-01T09:59:00Z"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidSignature));
        assert_eq!(pipeline.attempts().recorded_attempts(&submitter()), 0);
    }

    #[tokio::test]
    async fn test_quota_exhaustion() {
        let (pipeline, _) = pipeline(Arc::new(AcceptAll), true);
        let b = body("2024-03-01T09:59:00Z");

        assert!(pipeline.process(&b, "x").await.is_ok());
        assert!(pipeline.process(&b, "x").await.is_ok());
        assert!(matches!(
            pipeline.process(&b, "x").await,
            Err(SubmitError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_decode_and_missing_fields() {
        let (pipeline, _) = pipeline(Arc::new(AcceptAll), true);

        assert!(matches!(
            pipeline.process(b"not json", "x").await,
            Err(SubmitError::Decode)
        ));
        assert!(matches!(
            pipeline.process(br#"{"data":{"peer_id":"p"}}"#, "x").await,
            Err(SubmitError::MissingFields)
        ));
    }

    #[tokio::test]
    async fn test_disabled_checks_are_skipped() {
        let (mut pipeline, _) = pipeline(Arc::new(RejectAll), false);
        pipeline.config.whitelist.disabled = true;
        pipeline.config.verify_signature_disabled = true;

        assert!(pipeline
            .process(&body("2024-03-01T09:59:00Z"), "x")
            .await
            .is_ok());
    }
}
