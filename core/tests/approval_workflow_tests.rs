// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the approval workflows
//!
//! These tests verify the two role-gated pipelines end to end:
//! 1. Monthly submissions walking the mentor → supervisor → ka. unit →
//!    manager chain, including rejection and resubmission
//! 2. Manual correction requests: single resolution, the ledger side effect
//!    of approval, and partial-failure recovery
//! 3. The notification output contract on every transition

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use mutabaah_core::application::aggregator::EvidenceAggregator;
use mutabaah_core::application::approval::{ApprovalError, SubmissionApprovalService};
use mutabaah_core::application::request_review::{ManualRequestService, RequestReviewError};
use mutabaah_core::domain::calendar::{ActivityId, DayKey, MonthKey};
use mutabaah_core::domain::employee::{Employee, EmployeeId};
use mutabaah_core::domain::events::NotificationKind;
use mutabaah_core::domain::evidence::{ActivityCatalog, Evidence};
use mutabaah_core::domain::ledger::DayMatrix;
use mutabaah_core::domain::locking::{LockedError, LockingMode};
use mutabaah_core::domain::repository::{
    LedgerStore, ManualRequestRepository, MergeOutcome, RepositoryError, SubmissionRepository,
};
use mutabaah_core::domain::request::RequestKind;
use mutabaah_core::domain::submission::{
    ReviewDecision, ReviewerRole, SubmissionError, SubmissionStatus, REVIEW_CHAIN,
};
use mutabaah_core::infrastructure::event_bus::EventBus;
use mutabaah_core::infrastructure::repositories::{
    InMemoryLedgerStore, InMemoryManualRequestRepository, InMemorySubmissionRepository,
};

fn reviewers() -> BTreeMap<ReviewerRole, EmployeeId> {
    BTreeMap::from([
        (ReviewerRole::Mentor, EmployeeId::new("mentor1")),
        (ReviewerRole::Supervisor, EmployeeId::new("super1")),
        (ReviewerRole::KaUnit, EmployeeId::new("kaunit1")),
        (ReviewerRole::Manager, EmployeeId::new("manager1")),
    ])
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct WorkflowHarness {
    store: Arc<InMemoryLedgerStore>,
    submissions: Arc<InMemorySubmissionRepository>,
    approval: SubmissionApprovalService,
    requests: ManualRequestService,
    event_bus: Arc<EventBus>,
}

fn harness() -> WorkflowHarness {
    let store = Arc::new(InMemoryLedgerStore::new());
    let submissions = Arc::new(InMemorySubmissionRepository::new());
    let request_repo = Arc::new(InMemoryManualRequestRepository::new());
    let event_bus = Arc::new(EventBus::new(64));
    let aggregator = Arc::new(EvidenceAggregator::new(
        store.clone(),
        ActivityCatalog::with_defaults(),
        event_bus.clone(),
    ));
    let approval = SubmissionApprovalService::new(submissions.clone(), event_bus.clone());
    let requests = ManualRequestService::new(
        request_repo,
        submissions.clone(),
        aggregator,
        event_bus.clone(),
        LockingMode::Monthly,
    );
    WorkflowHarness {
        store,
        submissions,
        approval,
        requests,
        event_bus,
    }
}

// ── Monthly submission chain ──────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_submission_starts_at_pending_mentor() {
    let h = harness();
    let submission = h
        .approval
        .create(EmployeeId::new("emp1"), MonthKey::parse("2024-03").unwrap(), reviewers())
        .await
        .expect("create failed");
    assert_eq!(submission.status, SubmissionStatus::PendingMentor);
}

#[tokio::test]
async fn test_four_correct_approvals_reach_approved() {
    let h = harness();
    let submission = h
        .approval
        .create(EmployeeId::new("emp1"), MonthKey::parse("2024-03").unwrap(), reviewers())
        .await
        .unwrap();

    let mut status = submission.status;
    for role in REVIEW_CHAIN {
        status = h
            .approval
            .advance(submission.id, role, ReviewDecision::Approved, Some("ok".to_string()))
            .await
            .expect("advance failed")
            .status;
    }
    assert_eq!(status, SubmissionStatus::Approved);

    let stored = h
        .submissions
        .find_by_id(submission.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.reviews.len(), 4);
}

#[tokio::test]
async fn test_wrong_role_is_rejected_as_invalid() {
    let h = harness();
    let submission = h
        .approval
        .create(EmployeeId::new("emp1"), MonthKey::parse("2024-03").unwrap(), reviewers())
        .await
        .unwrap();

    let err = h
        .approval
        .advance(submission.id, ReviewerRole::Supervisor, ReviewDecision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApprovalError::Transition(SubmissionError::RoleMismatch { .. })
    ));

    // nothing moved
    let stored = h
        .submissions
        .find_by_id(submission.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubmissionStatus::PendingMentor);
}

#[tokio::test]
async fn test_duplicate_open_submission_is_a_conflict() {
    let h = harness();
    let month = MonthKey::parse("2024-03").unwrap();
    h.approval
        .create(EmployeeId::new("emp1"), month.clone(), reviewers())
        .await
        .unwrap();

    let err = h
        .approval
        .create(EmployeeId::new("emp1"), month, reviewers())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApprovalError::Transition(SubmissionError::DuplicateOpen(_))
    ));
}

#[tokio::test]
async fn test_march_rejection_then_resubmission() {
    // Employee submits March; mentor approves; supervisor rejects; a second
    // submission for March may then be created and starts at pending_mentor.
    let h = harness();
    let month = MonthKey::parse("2024-03").unwrap();
    let first = h
        .approval
        .create(EmployeeId::new("emp1"), month.clone(), reviewers())
        .await
        .unwrap();

    let after_mentor = h
        .approval
        .advance(first.id, ReviewerRole::Mentor, ReviewDecision::Approved, None)
        .await
        .unwrap();
    assert_eq!(after_mentor.status, SubmissionStatus::PendingSupervisor);

    let after_supervisor = h
        .approval
        .advance(
            first.id,
            ReviewerRole::Supervisor,
            ReviewDecision::Rejected,
            Some("log incomplete".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(after_supervisor.status, SubmissionStatus::RejectedSupervisor);

    let second = h
        .approval
        .create(EmployeeId::new("emp1"), month, reviewers())
        .await
        .expect("resubmission after rejection must be allowed");
    assert_ne!(second.id, first.id);
    assert_eq!(second.status, SubmissionStatus::PendingMentor);
}

#[tokio::test]
async fn test_reviewer_inbox_follows_the_chain() {
    let h = harness();
    let submission = h
        .approval
        .create(EmployeeId::new("emp1"), MonthKey::parse("2024-03").unwrap(), reviewers())
        .await
        .unwrap();

    let mentor_inbox = h
        .approval
        .find_for_reviewer(ReviewerRole::Mentor, &EmployeeId::new("mentor1"))
        .await
        .unwrap();
    assert_eq!(mentor_inbox.len(), 1);

    h.approval
        .advance(submission.id, ReviewerRole::Mentor, ReviewDecision::Approved, None)
        .await
        .unwrap();

    let mentor_inbox = h
        .approval
        .find_for_reviewer(ReviewerRole::Mentor, &EmployeeId::new("mentor1"))
        .await
        .unwrap();
    assert!(mentor_inbox.is_empty());

    let supervisor_inbox = h
        .approval
        .find_for_reviewer(ReviewerRole::Supervisor, &EmployeeId::new("super1"))
        .await
        .unwrap();
    assert_eq!(supervisor_inbox.len(), 1);
}

// ── Manual correction requests ────────────────────────────────────────────

#[tokio::test]
async fn test_approved_request_writes_the_ledger_once() {
    let h = harness();
    let today = day(2024, 3, 10);

    let request = h
        .requests
        .create(
            EmployeeId::new("emp1"),
            RequestKind::Tadarus,
            ActivityId::new("tadarus"),
            day(2024, 3, 5),
            today,
        )
        .await
        .expect("create failed");

    h.requests
        .review(request.id, ReviewDecision::Approved, Some("verified".to_string()))
        .await
        .expect("review failed");

    let employee = h
        .store
        .find_employee(&EmployeeId::new("emp1"))
        .await
        .unwrap()
        .unwrap();
    assert!(employee.activities.is_marked(
        &MonthKey::parse("2024-03").unwrap(),
        &DayKey::parse("05").unwrap(),
        &ActivityId::new("tadarus"),
    ));

    // a duplicate click is a conflict, not a second write
    let err = h
        .requests
        .review(request.id, ReviewDecision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RequestReviewError::Conflict(_)));
}

#[tokio::test]
async fn test_rejected_request_has_no_ledger_effect() {
    let h = harness();
    let today = day(2024, 3, 10);

    let request = h
        .requests
        .create(
            EmployeeId::new("emp1"),
            RequestKind::MissedPrayer,
            ActivityId::new("subuh"),
            day(2024, 3, 5),
            today,
        )
        .await
        .unwrap();

    h.requests
        .review(request.id, ReviewDecision::Rejected, Some("no record".to_string()))
        .await
        .unwrap();

    assert!(h
        .store
        .find_employee(&EmployeeId::new("emp1"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_locked_dates_cannot_be_corrected() {
    let h = harness();
    let today = day(2024, 3, 10);

    // future date
    let err = h
        .requests
        .create(
            EmployeeId::new("emp1"),
            RequestKind::MissedPrayer,
            ActivityId::new("subuh"),
            day(2024, 3, 11),
            today,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RequestReviewError::Locked(LockedError::FutureDate(_))
    ));

    // previous month
    let err = h
        .requests
        .create(
            EmployeeId::new("emp1"),
            RequestKind::MissedPrayer,
            ActivityId::new("subuh"),
            day(2024, 2, 28),
            today,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RequestReviewError::Locked(LockedError::OutsideCurrentMonth(_))
    ));

    // month frozen by a pending submission
    h.approval
        .create(EmployeeId::new("emp1"), MonthKey::parse("2024-03").unwrap(), reviewers())
        .await
        .unwrap();
    let err = h
        .requests
        .create(
            EmployeeId::new("emp1"),
            RequestKind::MissedPrayer,
            ActivityId::new("subuh"),
            day(2024, 3, 5),
            today,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RequestReviewError::Locked(LockedError::MonthFrozen { .. })
    ));
}

// ── Partial failure ───────────────────────────────────────────────────────

/// Ledger store that fails its first merge, then behaves. Models a storage
/// outage between the request-status write and the ledger write.
struct FlakyLedgerStore {
    inner: InMemoryLedgerStore,
    fail_next: AtomicBool,
}

impl FlakyLedgerStore {
    fn new() -> Self {
        Self {
            inner: InMemoryLedgerStore::new(),
            fail_next: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl LedgerStore for FlakyLedgerStore {
    async fn merge(
        &self,
        employee_id: &EmployeeId,
        items: &[Evidence],
    ) -> Result<MergeOutcome, RepositoryError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Database("connection reset".to_string()));
        }
        self.inner.merge(employee_id, items).await
    }

    async fn find_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<Employee>, RepositoryError> {
        self.inner.find_employee(employee_id).await
    }

    async fn month_view(
        &self,
        employee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<DayMatrix, RepositoryError> {
        self.inner.month_view(employee_id, month).await
    }

    async fn last_merged_at(
        &self,
        employee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        self.inner.last_merged_at(employee_id, month).await
    }
}

#[tokio::test]
async fn test_partial_failure_surfaces_and_merge_retry_succeeds() {
    let store = Arc::new(FlakyLedgerStore::new());
    let submissions = Arc::new(InMemorySubmissionRepository::new());
    let request_repo = Arc::new(InMemoryManualRequestRepository::new());
    let event_bus = Arc::new(EventBus::new(64));
    let aggregator = Arc::new(EvidenceAggregator::new(
        store.clone(),
        ActivityCatalog::with_defaults(),
        event_bus.clone(),
    ));
    let requests = ManualRequestService::new(
        request_repo.clone(),
        submissions,
        aggregator,
        event_bus,
        LockingMode::Monthly,
    );

    let today = day(2024, 3, 10);
    let request = requests
        .create(
            EmployeeId::new("emp1"),
            RequestKind::Tadarus,
            ActivityId::new("tadarus"),
            day(2024, 3, 5),
            today,
        )
        .await
        .unwrap();

    // the merge half fails, the status half already persisted
    let err = requests
        .review(request.id, ReviewDecision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RequestReviewError::LedgerMergeFailed { .. }));

    let stored = request_repo.find_by_id(request.id).await.unwrap().unwrap();
    assert!(stored.is_resolved());

    // re-approving is still a conflict; only the merge may be retried
    let err = requests
        .review(request.id, ReviewDecision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RequestReviewError::Conflict(_)));

    requests
        .retry_ledger_merge(request.id)
        .await
        .expect("merge retry should succeed");

    let employee = store
        .find_employee(&EmployeeId::new("emp1"))
        .await
        .unwrap()
        .unwrap();
    assert!(employee.activities.is_marked(
        &MonthKey::parse("2024-03").unwrap(),
        &DayKey::parse("05").unwrap(),
        &ActivityId::new("tadarus"),
    ));
}

// ── Notification contract ─────────────────────────────────────────────────

#[tokio::test]
async fn test_every_transition_notifies_the_employee() {
    let h = harness();
    let mut inbox = h
        .event_bus
        .subscribe_notifications(EmployeeId::new("emp1"));

    let submission = h
        .approval
        .create(EmployeeId::new("emp1"), MonthKey::parse("2024-03").unwrap(), reviewers())
        .await
        .unwrap();
    for role in REVIEW_CHAIN {
        h.approval
            .advance(submission.id, role, ReviewDecision::Approved, None)
            .await
            .unwrap();
    }

    let created = inbox.recv().await.unwrap();
    assert_eq!(created.kind, NotificationKind::SubmissionCreated);

    let mut kinds = Vec::new();
    for _ in 0..4 {
        kinds.push(inbox.recv().await.unwrap().kind);
    }
    assert_eq!(
        kinds,
        vec![
            NotificationKind::SubmissionStageApproved,
            NotificationKind::SubmissionStageApproved,
            NotificationKind::SubmissionStageApproved,
            NotificationKind::SubmissionApproved,
        ]
    );
}
