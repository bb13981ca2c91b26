use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::domain::{MatchUpdate, RequestStatus, TransferMatch, TransferRequest};
use crate::store::StoreError;

/// Persistence seam for transfer requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Inserts a new request; `Conflict` on a duplicate request id.
    async fn insert(&self, request: TransferRequest) -> Result<TransferRequest, StoreError>;

    async fn fetch(&self, request_id: &str) -> Result<Option<TransferRequest>, StoreError>;

    /// Returns false when the request does not exist.
    async fn update_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<bool, StoreError>;

    /// Returns false when the request does not exist.
    async fn delete(&self, request_id: &str) -> Result<bool, StoreError>;

    /// A teacher's requests, newest first.
    async fn list_by_teacher(&self, teacher_id: &str)
        -> Result<Vec<TransferRequest>, StoreError>;

    /// Open requests (Pending or Waiting List) travelling in the given
    /// direction, oldest `created_at` first with `request_id` as the final
    /// tie-break so iteration order is deterministic.
    async fn reciprocal_candidates(
        &self,
        from_district: &str,
        to_district: &str,
    ) -> Result<Vec<TransferRequest>, StoreError>;
}

/// Persistence seam for transfer matches.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Inserts a new match; `Conflict` when the `pair_key` (or matching id)
    /// is already present.
    async fn insert(&self, transfer_match: TransferMatch) -> Result<TransferMatch, StoreError>;

    async fn fetch(&self, matching_id: &str) -> Result<Option<TransferMatch>, StoreError>;

    async fn fetch_by_pair_key(&self, key: &str) -> Result<Option<TransferMatch>, StoreError>;

    /// Every match one of whose sides is `request_id`, ordered by matching
    /// id. A request may sit in several matches at once: pairing does not
    /// close the underlying requests, so an already-paired request remains a
    /// candidate for further reciprocal scans.
    async fn find_all_by_request(
        &self,
        request_id: &str,
    ) -> Result<Vec<TransferMatch>, StoreError>;

    /// Atomic fetch-and-update: the transition is applied to the current
    /// persisted state in one step, so concurrent agrees from the two sides
    /// cannot overwrite each other's flag. Returns `None` when the match is
    /// missing or the acting request id is not one of its sides.
    async fn update(
        &self,
        matching_id: &str,
        update: MatchUpdate,
    ) -> Result<Option<TransferMatch>, StoreError>;

    /// Returns false when the match does not exist.
    async fn delete(&self, matching_id: &str) -> Result<bool, StoreError>;
}

/// Process-local request store used by the api service and the test suites.
#[derive(Default)]
pub struct InMemoryRequestStore {
    records: Mutex<HashMap<String, TransferRequest>>,
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: TransferRequest) -> Result<TransferRequest, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("request store poisoned".to_string()))?;
        if records.contains_key(&request.request_id) {
            return Err(StoreError::Conflict);
        }
        records.insert(request.request_id.clone(), request.clone());
        Ok(request)
    }

    async fn fetch(&self, request_id: &str) -> Result<Option<TransferRequest>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("request store poisoned".to_string()))?;
        Ok(records.get(request_id).cloned())
    }

    async fn update_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("request store poisoned".to_string()))?;
        match records.get_mut(request_id) {
            Some(request) => {
                request.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, request_id: &str) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("request store poisoned".to_string()))?;
        Ok(records.remove(request_id).is_some())
    }

    async fn list_by_teacher(
        &self,
        teacher_id: &str,
    ) -> Result<Vec<TransferRequest>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("request store poisoned".to_string()))?;
        let mut requests: Vec<TransferRequest> = records
            .values()
            .filter(|request| request.teacher_id == teacher_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn reciprocal_candidates(
        &self,
        from_district: &str,
        to_district: &str,
    ) -> Result<Vec<TransferRequest>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("request store poisoned".to_string()))?;
        let mut candidates: Vec<TransferRequest> = records
            .values()
            .filter(|request| {
                request.status.is_open()
                    && request.from_district == from_district
                    && request.to_district == to_district
            })
            .cloned()
            .collect();
        candidates.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.request_id.cmp(&b.request_id))
        });
        Ok(candidates)
    }
}

/// Process-local match store. Inserts enforce `pair_key` uniqueness and
/// transitions run under the same guard that holds the record, giving the
/// document-level atomicity the agreement path relies on.
#[derive(Default)]
pub struct InMemoryMatchStore {
    records: Mutex<HashMap<String, TransferMatch>>,
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn insert(&self, transfer_match: TransferMatch) -> Result<TransferMatch, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("match store poisoned".to_string()))?;
        if records.contains_key(&transfer_match.matching_id)
            || records
                .values()
                .any(|existing| existing.pair_key == transfer_match.pair_key)
        {
            return Err(StoreError::Conflict);
        }
        records.insert(transfer_match.matching_id.clone(), transfer_match.clone());
        Ok(transfer_match)
    }

    async fn fetch(&self, matching_id: &str) -> Result<Option<TransferMatch>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("match store poisoned".to_string()))?;
        Ok(records.get(matching_id).cloned())
    }

    async fn fetch_by_pair_key(&self, key: &str) -> Result<Option<TransferMatch>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("match store poisoned".to_string()))?;
        Ok(records
            .values()
            .find(|existing| existing.pair_key == key)
            .cloned())
    }

    async fn find_all_by_request(
        &self,
        request_id: &str,
    ) -> Result<Vec<TransferMatch>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("match store poisoned".to_string()))?;
        let mut found: Vec<TransferMatch> = records
            .values()
            .filter(|existing| existing.is_side(request_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.matching_id.cmp(&b.matching_id));
        Ok(found)
    }

    async fn update(
        &self,
        matching_id: &str,
        update: MatchUpdate,
    ) -> Result<Option<TransferMatch>, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("match store poisoned".to_string()))?;
        match records.get_mut(matching_id) {
            Some(transfer_match) => {
                if transfer_match.apply(&update, Utc::now()) {
                    Ok(Some(transfer_match.clone()))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, matching_id: &str) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("match store poisoned".to_string()))?;
        Ok(records.remove(matching_id).is_some())
    }
}
