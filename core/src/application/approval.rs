// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Monthly Submission Approval Use Case
//!
//! Application service around the `MonthlySubmission` state machine.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Create submissions (uniqueness invariant) and drive
//!   reviewer transitions (role-gated advance)
//! - **Collaborators:**
//!   - Domain: MonthlySubmission aggregate (transition rules)
//!   - Infrastructure: SubmissionRepository, EventBus
//!
//! The uniqueness invariant lives here on the creation path: at most one
//! non-rejected submission per (employee, month). The transition rules live
//! in the aggregate; this service persists the result and emits the
//! notification output contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::domain::calendar::MonthKey;
use crate::domain::employee::EmployeeId;
use crate::domain::events::{Notification, NotificationKind, SubmissionEvent};
use crate::domain::repository::{RepositoryError, SubmissionRepository};
use crate::domain::submission::{
    MonthlySubmission, ReviewDecision, ReviewerRole, SubmissionError, SubmissionId,
    SubmissionStatus,
};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("submission {0} not found")]
    NotFound(SubmissionId),

    #[error(transparent)]
    Transition(#[from] SubmissionError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

pub struct SubmissionApprovalService {
    submissions: Arc<dyn SubmissionRepository>,
    event_bus: Arc<EventBus>,
}

impl SubmissionApprovalService {
    pub fn new(submissions: Arc<dyn SubmissionRepository>, event_bus: Arc<EventBus>) -> Self {
        Self {
            submissions,
            event_bus,
        }
    }

    /// Opens the month for review. Fails when a non-rejected submission for
    /// (employee, month) already exists; a rejected one never blocks — the
    /// employee re-submits under a fresh id.
    pub async fn create(
        &self,
        mentee_id: EmployeeId,
        month: MonthKey,
        reviewers: BTreeMap<ReviewerRole, EmployeeId>,
    ) -> Result<MonthlySubmission, ApprovalError> {
        if self.submissions.find_open(&mentee_id, &month).await?.is_some() {
            return Err(SubmissionError::DuplicateOpen(month).into());
        }

        let submission = MonthlySubmission::new(mentee_id.clone(), month.clone(), reviewers);
        self.submissions.save(&submission).await?;

        info!(
            submission_id = %submission.id,
            mentee_id = %mentee_id,
            month = %month,
            "Monthly submission created"
        );
        self.event_bus
            .publish_submission_event(SubmissionEvent::SubmissionCreated {
                submission_id: submission.id,
                mentee_id: mentee_id.clone(),
                month: month.clone(),
                created_at: submission.created_at,
            });
        self.event_bus.publish_notification(Notification {
            user_id: mentee_id,
            kind: NotificationKind::SubmissionCreated,
            title: "Monthly report submitted".to_string(),
            message: format!("Your {} report is waiting for mentor review", month),
            related_entity_id: submission.id.to_string(),
        });

        Ok(submission)
    }

    /// Applies one reviewer decision and emits the notification the owning
    /// employee is contractually owed on every transition.
    pub async fn advance(
        &self,
        id: SubmissionId,
        role: ReviewerRole,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<MonthlySubmission, ApprovalError> {
        let mut submission = self
            .submissions
            .find_by_id(id)
            .await?
            .ok_or(ApprovalError::NotFound(id))?;

        let status = submission.advance(role, decision, notes)?;
        self.submissions.save(&submission).await?;

        info!(
            submission_id = %id,
            role = %role,
            status = %status,
            "Submission stage reviewed"
        );
        self.event_bus
            .publish_submission_event(SubmissionEvent::StageReviewed {
                submission_id: id,
                mentee_id: submission.mentee_id.clone(),
                role,
                decision,
                status,
                reviewed_at: Utc::now(),
            });
        self.event_bus
            .publish_notification(stage_notification(&submission, role, status));

        Ok(submission)
    }

    pub async fn find_by_employee(
        &self,
        mentee_id: &EmployeeId,
    ) -> Result<Vec<MonthlySubmission>, ApprovalError> {
        Ok(self.submissions.find_by_employee(mentee_id).await?)
    }

    pub async fn find_for_reviewer(
        &self,
        role: ReviewerRole,
        reviewer_id: &EmployeeId,
    ) -> Result<Vec<MonthlySubmission>, ApprovalError> {
        Ok(self.submissions.find_for_reviewer(role, reviewer_id).await?)
    }
}

fn stage_notification(
    submission: &MonthlySubmission,
    role: ReviewerRole,
    status: SubmissionStatus,
) -> Notification {
    let (kind, title, message) = match status {
        SubmissionStatus::Approved => (
            NotificationKind::SubmissionApproved,
            "Monthly report approved",
            format!("Your {} report passed the full review chain", submission.month),
        ),
        s if s.is_rejected() => (
            NotificationKind::SubmissionRejected,
            "Monthly report rejected",
            format!("Your {} report was rejected by the {}", submission.month, role),
        ),
        _ => (
            NotificationKind::SubmissionStageApproved,
            "Monthly report moved forward",
            format!(
                "Your {} report was approved by the {} and moved to the next reviewer",
                submission.month, role
            ),
        ),
    };
    Notification {
        user_id: submission.mentee_id.clone(),
        kind,
        title: title.to_string(),
        message,
        related_entity_id: submission.id.to_string(),
    }
}
