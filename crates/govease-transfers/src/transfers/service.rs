use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{MatchStatus, MatchUpdate, RequestStatus, TransferMatch, TransferRequest};
use super::matching::MatchEngine;
use super::store::{MatchStore, RequestStore};
use crate::directory::{Directory, TeacherPublicProfile};
use crate::notifications::dispatcher::NotificationDispatcher;
use crate::notifications::domain::NotificationRequest;
use crate::sequence::{SequenceAllocator, SequenceNamespace};
use crate::store::StoreError;

/// Minimum years a teacher must have served in the current district before
/// a transfer request may be created.
pub const MIN_YEARS_IN_DISTRICT: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("teacher {0} not found")]
    TeacherNotFound(String),
    #[error("teacher has {years} years in the current district, transfer requires at least {MIN_YEARS_IN_DISTRICT}")]
    NotEligible { years: u32 },
    #[error("transfer request {0} not found")]
    RequestNotFound(String),
    #[error("transfer match {0} not found or request not part of it")]
    MatchNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input for submitting a transfer intent.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewTransferRequest {
    pub teacher_id: String,
    pub from_district: String,
    pub to_district: String,
}

/// Result of a reciprocal search, including the counterpart's limited
/// public details when a match exists.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_request: Option<TransferRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_teacher: Option<TeacherPublicProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_match: Option<TransferMatch>,
}

impl MatchOutcome {
    fn unmatched() -> Self {
        Self {
            matched: false,
            matched_request: None,
            matched_teacher: None,
            transfer_match: None,
        }
    }
}

/// Orchestrates the transfer matching workflow: request intake with the
/// eligibility floor, reciprocal search, bilateral agreement, cancellation
/// cleanup, and the role-aware notification routing around each event.
pub struct TransferService {
    requests: Arc<dyn RequestStore>,
    matches: Arc<dyn MatchStore>,
    directory: Arc<dyn Directory>,
    sequences: Arc<dyn SequenceAllocator>,
    engine: MatchEngine,
    notifier: Arc<NotificationDispatcher>,
}

impl TransferService {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        matches: Arc<dyn MatchStore>,
        directory: Arc<dyn Directory>,
        sequences: Arc<dyn SequenceAllocator>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        let engine = MatchEngine::new(
            requests.clone(),
            matches.clone(),
            directory.clone(),
            sequences.clone(),
        );
        Self {
            requests,
            matches,
            directory,
            sequences,
            engine,
            notifier,
        }
    }

    /// Creates a transfer request after the eligibility check. No request
    /// or match side effects occur when the teacher is unknown or has not
    /// served long enough in the current district.
    pub async fn create_request(
        &self,
        payload: NewTransferRequest,
    ) -> Result<TransferRequest, TransferError> {
        let teacher = self
            .directory
            .teacher(&payload.teacher_id)
            .await?
            .ok_or_else(|| TransferError::TeacherNotFound(payload.teacher_id.clone()))?;
        if teacher.years_in_service_district < MIN_YEARS_IN_DISTRICT {
            return Err(TransferError::NotEligible {
                years: teacher.years_in_service_district,
            });
        }

        let seq = self
            .sequences
            .next(SequenceNamespace::TransferRequest)
            .await?;
        let request = TransferRequest {
            request_id: SequenceNamespace::TransferRequest.format(seq),
            teacher_id: payload.teacher_id,
            from_district: payload.from_district,
            to_district: payload.to_district,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        let created = self.requests.insert(request).await?;
        info!(request_id = %created.request_id, teacher_id = %created.teacher_id, "transfer request created");
        Ok(created)
    }

    /// Searches for a reciprocal counterpart and, on a hit, creates or
    /// fetches the pairing record and informs both parties: the searching
    /// requester gets an actionable TRANSFER notification, the counterpart
    /// an informational GENERAL one. Request statuses are not altered by
    /// match formation.
    pub async fn find_match(&self, request_id: &str) -> Result<MatchOutcome, TransferError> {
        let request = self
            .requests
            .fetch(request_id)
            .await?
            .ok_or_else(|| TransferError::RequestNotFound(request_id.to_string()))?;
        let teacher = self
            .directory
            .teacher(&request.teacher_id)
            .await?
            .ok_or_else(|| TransferError::TeacherNotFound(request.teacher_id.clone()))?;

        let Some(counterpart) = self
            .engine
            .find_reciprocal(&request, &teacher.subjects)
            .await?
        else {
            return Ok(MatchOutcome::unmatched());
        };

        let transfer_match = self
            .engine
            .get_or_create(&request.request_id, &counterpart.request_id)
            .await?;
        info!(
            matching_id = %transfer_match.matching_id,
            request_a = %transfer_match.request_a_id,
            request_b = %transfer_match.request_b_id,
            "reciprocal match"
        );

        let matched_teacher = self
            .directory
            .teacher(&counterpart.teacher_id)
            .await?
            .map(|profile| profile.public_view());

        let requester_note = NotificationRequest::transfer(
            teacher.citizen_id.clone(),
            format!(
                "Reciprocal transfer match {} found for your request {}. Please review and respond.",
                transfer_match.matching_id, request.request_id
            ),
        )
        .about_match(&transfer_match.matching_id)
        .about_request(&request.request_id);
        if let Err(err) = self.notifier.notify(requester_note).await {
            warn!(request_id = %request.request_id, error = %err, "notification delivery failed");
        }
        self.notify_request_owner(
            &counterpart.request_id,
            |citizen_id, counterpart_request| {
                NotificationRequest::general(
                    citizen_id,
                    format!(
                        "Your transfer request {} has been matched under {}.",
                        counterpart_request.request_id, transfer_match.matching_id
                    ),
                )
                .about_match(&transfer_match.matching_id)
                .about_request(&counterpart_request.request_id)
            },
        )
        .await;

        Ok(MatchOutcome {
            matched: true,
            matched_request: Some(counterpart),
            matched_teacher,
            transfer_match: Some(transfer_match),
        })
    }

    /// Records one side's agreement and routes the resulting notification:
    /// the non-acting side alone while one agreement is outstanding, both
    /// sides once the match becomes AGREED.
    pub async fn agree(
        &self,
        matching_id: &str,
        request_id: &str,
    ) -> Result<TransferMatch, TransferError> {
        let updated = self
            .matches
            .update(
                matching_id,
                MatchUpdate::Agree {
                    request_id: request_id.to_string(),
                },
            )
            .await?
            .ok_or_else(|| TransferError::MatchNotFound(matching_id.to_string()))?;

        match updated.match_status {
            MatchStatus::PendingAgreed => {
                if let Some(other) = updated.other_side(request_id) {
                    let other = other.to_string();
                    self.notify_request_owner(&other, |citizen_id, _| {
                        NotificationRequest::transfer(
                            citizen_id,
                            format!(
                                "The other party has agreed to transfer match {}. Please review and confirm.",
                                updated.matching_id
                            ),
                        )
                        .about_match(&updated.matching_id)
                        .about_request(&other)
                    })
                    .await;
                }
            }
            MatchStatus::Agreed => {
                for side in [&updated.request_a_id, &updated.request_b_id] {
                    self.notify_request_owner(side, |citizen_id, _| {
                        NotificationRequest::general(
                            citizen_id,
                            format!(
                                "Transfer match {} is agreed by both parties. Processing will begin.",
                                updated.matching_id
                            ),
                        )
                        .about_match(&updated.matching_id)
                        .about_request(side)
                    })
                    .await;
                }
            }
            MatchStatus::Pending => {}
        }

        Ok(updated)
    }

    /// Resets the match to PENDING from any state and informs the other
    /// side. There is no partial-withdrawal state.
    pub async fn disagree(
        &self,
        matching_id: &str,
        request_id: &str,
    ) -> Result<TransferMatch, TransferError> {
        let updated = self
            .matches
            .update(
                matching_id,
                MatchUpdate::Reset {
                    request_id: request_id.to_string(),
                },
            )
            .await?
            .ok_or_else(|| TransferError::MatchNotFound(matching_id.to_string()))?;

        if let Some(other) = updated.other_side(request_id) {
            let other = other.to_string();
            self.notify_request_owner(&other, |citizen_id, _| {
                NotificationRequest::transfer(
                    citizen_id,
                    format!(
                        "Transfer match {} was reset to pending by the other party.",
                        updated.matching_id
                    ),
                )
                .about_match(&updated.matching_id)
                .about_request(&other)
            })
            .await;
        }

        Ok(updated)
    }

    /// Cancels a request. Every match the request participates in is
    /// deleted first, with the respective other side informed per match; a
    /// failed notification never rolls back a deletion.
    pub async fn cancel_request(&self, request_id: &str) -> Result<(), TransferError> {
        let request = self
            .requests
            .fetch(request_id)
            .await?
            .ok_or_else(|| TransferError::RequestNotFound(request_id.to_string()))?;

        for transfer_match in self.matches.find_all_by_request(&request.request_id).await? {
            self.matches.delete(&transfer_match.matching_id).await?;
            info!(
                matching_id = %transfer_match.matching_id,
                request_id = %request.request_id,
                "match deleted on request cancellation"
            );
            if let Some(other) = transfer_match.other_side(&request.request_id) {
                let other = other.to_string();
                self.notify_request_owner(&other, |citizen_id, _| {
                    NotificationRequest::general(
                        citizen_id,
                        format!(
                            "Transfer match {} was cancelled because the counterpart withdrew their request.",
                            transfer_match.matching_id
                        ),
                    )
                    .about_match(&transfer_match.matching_id)
                    .about_request(&other)
                })
                .await;
            }
        }

        self.requests.delete(&request.request_id).await?;
        Ok(())
    }

    /// Moves a request onto the waiting list, keeping it open for future
    /// reciprocal scans.
    pub async fn add_to_waiting_list(&self, request_id: &str) -> Result<(), TransferError> {
        if !self
            .requests
            .update_status(request_id, RequestStatus::WaitingList)
            .await?
        {
            return Err(TransferError::RequestNotFound(request_id.to_string()));
        }
        Ok(())
    }

    /// A teacher's requests, newest first.
    pub async fn list_for_teacher(
        &self,
        teacher_id: &str,
    ) -> Result<Vec<TransferRequest>, TransferError> {
        Ok(self.requests.list_by_teacher(teacher_id).await?)
    }

    /// Resolves the owning citizen of a request and dispatches the built
    /// notification. Routing is best-effort around an already-committed
    /// primary result, so every failure here is logged and absorbed.
    async fn notify_request_owner<F>(&self, request_id: &str, build: F)
    where
        F: FnOnce(String, &TransferRequest) -> NotificationRequest,
    {
        let request = match self.requests.fetch(request_id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                warn!(request_id, "notification skipped: request missing");
                return;
            }
            Err(err) => {
                warn!(request_id, error = %err, "notification skipped: request lookup failed");
                return;
            }
        };
        let citizen_id = match self.directory.teacher(&request.teacher_id).await {
            Ok(Some(teacher)) => teacher.citizen_id,
            Ok(None) => {
                warn!(request_id, teacher_id = %request.teacher_id, "notification skipped: teacher missing");
                return;
            }
            Err(err) => {
                warn!(request_id, error = %err, "notification skipped: teacher lookup failed");
                return;
            }
        };
        let notification = build(citizen_id, &request);
        if let Err(err) = self.notifier.notify(notification).await {
            warn!(request_id, error = %err, "notification delivery failed");
        }
    }
}
