use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::domain::{normalized_subjects, pair_key, TransferMatch, TransferRequest};
use super::store::{MatchStore, RequestStore};
use crate::directory::Directory;
use crate::sequence::{SequenceAllocator, SequenceNamespace};
use crate::store::StoreError;

/// Finds reciprocal counterparts for a transfer request and creates or
/// retrieves the idempotent pairing record.
pub struct MatchEngine {
    requests: Arc<dyn RequestStore>,
    matches: Arc<dyn MatchStore>,
    directory: Arc<dyn Directory>,
    sequences: Arc<dyn SequenceAllocator>,
}

impl MatchEngine {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        matches: Arc<dyn MatchStore>,
        directory: Arc<dyn Directory>,
        sequences: Arc<dyn SequenceAllocator>,
    ) -> Self {
        Self {
            requests,
            matches,
            directory,
            sequences,
        }
    }

    /// Scans open requests travelling the opposite direction and returns
    /// the first whose teacher's normalized subject set exactly equals the
    /// requesting teacher's. Candidates arrive oldest-created first, which
    /// makes the winner deterministic when several qualify.
    pub async fn find_reciprocal(
        &self,
        request: &TransferRequest,
        subjects: &[String],
    ) -> Result<Option<TransferRequest>, StoreError> {
        let wanted = normalized_subjects(subjects);
        let candidates = self
            .requests
            .reciprocal_candidates(&request.to_district, &request.from_district)
            .await?;

        for candidate in candidates {
            if candidate.request_id == request.request_id
                || candidate.teacher_id == request.teacher_id
            {
                continue;
            }
            let Some(teacher) = self.directory.teacher(&candidate.teacher_id).await? else {
                // Orphaned request; skip rather than fail the whole scan.
                debug!(
                    request_id = %candidate.request_id,
                    teacher_id = %candidate.teacher_id,
                    "skipping candidate with missing teacher record"
                );
                continue;
            };
            if normalized_subjects(&teacher.subjects) == wanted {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Fetches or creates the match for an unordered request pair.
    ///
    /// The fetch-then-insert is not atomic: two callers discovering the same
    /// reciprocal pair may both reach the insert. The `pair_key` uniqueness
    /// constraint decides the winner, and the loser's `Conflict` is
    /// converted into a re-fetch of the winner's record.
    pub async fn get_or_create(
        &self,
        request_a_id: &str,
        request_b_id: &str,
    ) -> Result<TransferMatch, StoreError> {
        let key = pair_key(request_a_id, request_b_id);
        if let Some(existing) = self.matches.fetch_by_pair_key(&key).await? {
            return Ok(existing);
        }

        let seq = self.sequences.next(SequenceNamespace::TransferMatch).await?;
        let matching_id = SequenceNamespace::TransferMatch.format(seq);
        let candidate = TransferMatch::new(
            matching_id,
            request_a_id.to_string(),
            request_b_id.to_string(),
            Utc::now(),
        );

        match self.matches.insert(candidate).await {
            Ok(created) => Ok(created),
            Err(StoreError::Conflict) => {
                // Lost the race; the sequence number is abandoned.
                self.matches
                    .fetch_by_pair_key(&key)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Unavailable(format!(
                            "match for pair {key} missing after conflicting insert"
                        ))
                    })
            }
            Err(other) => Err(other),
        }
    }
}
