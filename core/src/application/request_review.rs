// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Manual Request Review Use Case
//!
//! Application service for employee-initiated corrections.
//!
//! # Flow
//!
//! 1. `create` gates the claimed date through the locking policy — a locked
//!    date cannot be corrected at all.
//! 2. `review` resolves the request exactly once, persists the status, then
//!    (for approvals) pushes a single-item evidence batch through the
//!    aggregator. That merge is the only path by which a manual request
//!    reaches the ledger.
//!
//! # Error Handling
//!
//! Status persists before the ledger merge. When the merge fails afterwards,
//! the caller gets `LedgerMergeFailed` — distinct from success and from
//! conflict — and retries only the merge via `retry_ledger_merge`; the
//! OR-merge makes that retry safe, and the single-resolution check protects
//! the status write.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::application::aggregator::EvidenceAggregator;
use crate::domain::calendar::ActivityId;
use crate::domain::employee::EmployeeId;
use crate::domain::events::{Notification, NotificationKind, RequestEvent};
use crate::domain::evidence::EvidenceSource;
use crate::domain::locking::{check_editable, LockedError, LockingMode};
use crate::domain::repository::{ManualRequestRepository, RepositoryError, SubmissionRepository};
use crate::domain::request::{ManualRequest, RequestError, RequestId, RequestKind, RequestStatus};
use crate::domain::submission::ReviewDecision;
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum RequestReviewError {
    #[error("manual request {0} not found")]
    NotFound(RequestId),

    #[error(transparent)]
    Conflict(#[from] RequestError),

    #[error(transparent)]
    Locked(#[from] LockedError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),

    #[error("request {request_id} is not approved; there is nothing to merge")]
    NotApproved { request_id: RequestId },

    #[error("request {request_id} was resolved but the ledger merge failed; retry the merge")]
    LedgerMergeFailed {
        request_id: RequestId,
        #[source]
        source: anyhow::Error,
    },
}

pub struct ManualRequestService {
    requests: Arc<dyn ManualRequestRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    aggregator: Arc<EvidenceAggregator>,
    event_bus: Arc<EventBus>,
    locking_mode: LockingMode,
}

impl ManualRequestService {
    pub fn new(
        requests: Arc<dyn ManualRequestRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        aggregator: Arc<EvidenceAggregator>,
        event_bus: Arc<EventBus>,
        locking_mode: LockingMode,
    ) -> Self {
        Self {
            requests,
            submissions,
            aggregator,
            event_bus,
            locking_mode,
        }
    }

    /// Raises a correction request. `today` is the trusted current date the
    /// caller obtained; the locking policy itself stays pure.
    pub async fn create(
        &self,
        mentee_id: EmployeeId,
        kind: RequestKind,
        activity_id: ActivityId,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<ManualRequest, RequestReviewError> {
        let submissions = self.submissions.find_by_employee(&mentee_id).await?;
        check_editable(date, today, self.locking_mode, &submissions)?;

        let request = ManualRequest::new(mentee_id.clone(), kind, activity_id, date);
        self.requests.save(&request).await?;

        info!(
            request_id = %request.id,
            mentee_id = %mentee_id,
            kind = %kind,
            "Manual request created"
        );
        self.event_bus.publish_request_event(RequestEvent::RequestCreated {
            request_id: request.id,
            mentee_id,
            created_at: request.requested_at,
        });

        Ok(request)
    }

    /// Resolves a pending request. Exactly one resolution is ever accepted;
    /// a duplicate approval click surfaces as a conflict instead of writing
    /// the ledger twice.
    pub async fn review(
        &self,
        id: RequestId,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<ManualRequest, RequestReviewError> {
        let mut request = self
            .requests
            .find_by_id(id)
            .await?
            .ok_or(RequestReviewError::NotFound(id))?;

        request.resolve(decision, notes)?;
        self.requests.save(&request).await?;

        if request.status == RequestStatus::Approved {
            self.aggregator
                .merge_resolved(EvidenceSource::ManualRequest, vec![request.as_evidence()])
                .await
                .map_err(|source| RequestReviewError::LedgerMergeFailed {
                    request_id: id,
                    source,
                })?;
        }

        self.publish_resolution(&request);
        Ok(request)
    }

    /// Re-applies the ledger write for an already-approved request whose
    /// merge failed. Safe to call any number of times.
    pub async fn retry_ledger_merge(&self, id: RequestId) -> Result<(), RequestReviewError> {
        let request = self
            .requests
            .find_by_id(id)
            .await?
            .ok_or(RequestReviewError::NotFound(id))?;

        if request.status != RequestStatus::Approved {
            return Err(RequestReviewError::NotApproved { request_id: id });
        }

        self.aggregator
            .merge_resolved(EvidenceSource::ManualRequest, vec![request.as_evidence()])
            .await
            .map_err(|source| RequestReviewError::LedgerMergeFailed {
                request_id: id,
                source,
            })?;

        self.publish_resolution(&request);
        Ok(())
    }

    pub async fn find_by_employee(
        &self,
        mentee_id: &EmployeeId,
    ) -> Result<Vec<ManualRequest>, RequestReviewError> {
        Ok(self.requests.find_by_employee(mentee_id).await?)
    }

    pub async fn find_pending(&self) -> Result<Vec<ManualRequest>, RequestReviewError> {
        Ok(self.requests.find_pending().await?)
    }

    fn publish_resolution(&self, request: &ManualRequest) {
        let decision = match request.status {
            RequestStatus::Approved => ReviewDecision::Approved,
            _ => ReviewDecision::Rejected,
        };
        info!(
            request_id = %request.id,
            status = ?request.status,
            "Manual request resolved"
        );
        self.event_bus.publish_request_event(RequestEvent::RequestResolved {
            request_id: request.id,
            mentee_id: request.mentee_id.clone(),
            decision,
            resolved_at: request.reviewed_at.unwrap_or_else(chrono::Utc::now),
        });

        let (kind, title, message) = match request.status {
            RequestStatus::Approved => (
                NotificationKind::RequestApproved,
                "Correction request approved",
                format!(
                    "Your {} request for {} was approved and recorded",
                    request.kind, request.date
                ),
            ),
            _ => (
                NotificationKind::RequestRejected,
                "Correction request rejected",
                format!("Your {} request for {} was rejected", request.kind, request.date),
            ),
        };
        self.event_bus.publish_notification(Notification {
            user_id: request.mentee_id.clone(),
            kind,
            title: title.to_string(),
            message,
            related_entity_id: request.id.to_string(),
        });
    }
}
