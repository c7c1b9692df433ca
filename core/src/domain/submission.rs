// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Monthly Submission Approval State Machine
//!
//! A submission closes out one (employee, month) pair and walks an ordered
//! chain of reviewer roles: mentor → supervisor → ka. unit → manager. Each
//! stage either advances the chain or terminates it with a role-specific
//! rejection. `Approved` and every `Rejected*` status are terminal; a
//! rejected submission is never resurrected — resubmission always creates a
//! fresh id so the rejection history survives.
//!
//! Submission state is single-writer-by-construction: only the one role
//! implied by the current status may act, and that check is the optimistic
//! guard applied before any transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::calendar::MonthKey;
use crate::domain::employee::EmployeeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One reviewer role's position in the approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerRole {
    Mentor,
    Supervisor,
    #[serde(rename = "kaunit")]
    KaUnit,
    Manager,
}

/// The fixed review order. "Next stage" is an index into this slice, not a
/// chain of if/else over reviewer fields.
pub const REVIEW_CHAIN: [ReviewerRole; 4] = [
    ReviewerRole::Mentor,
    ReviewerRole::Supervisor,
    ReviewerRole::KaUnit,
    ReviewerRole::Manager,
];

impl ReviewerRole {
    pub fn pending_status(self) -> SubmissionStatus {
        match self {
            ReviewerRole::Mentor => SubmissionStatus::PendingMentor,
            ReviewerRole::Supervisor => SubmissionStatus::PendingSupervisor,
            ReviewerRole::KaUnit => SubmissionStatus::PendingKaUnit,
            ReviewerRole::Manager => SubmissionStatus::PendingManager,
        }
    }

    pub fn rejected_status(self) -> SubmissionStatus {
        match self {
            ReviewerRole::Mentor => SubmissionStatus::RejectedMentor,
            ReviewerRole::Supervisor => SubmissionStatus::RejectedSupervisor,
            ReviewerRole::KaUnit => SubmissionStatus::RejectedKaUnit,
            ReviewerRole::Manager => SubmissionStatus::RejectedManager,
        }
    }

    pub fn next_in_chain(self) -> Option<ReviewerRole> {
        let position = REVIEW_CHAIN.iter().position(|role| *role == self)?;
        REVIEW_CHAIN.get(position + 1).copied()
    }
}

impl std::fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReviewerRole::Mentor => "mentor",
            ReviewerRole::Supervisor => "supervisor",
            ReviewerRole::KaUnit => "kaunit",
            ReviewerRole::Manager => "manager",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    PendingMentor,
    PendingSupervisor,
    #[serde(rename = "pending_kaunit")]
    PendingKaUnit,
    PendingManager,
    Approved,
    RejectedMentor,
    RejectedSupervisor,
    #[serde(rename = "rejected_kaunit")]
    RejectedKaUnit,
    RejectedManager,
}

impl SubmissionStatus {
    /// The role that must act next, `None` for terminal statuses.
    pub fn pending_role(self) -> Option<ReviewerRole> {
        match self {
            SubmissionStatus::PendingMentor => Some(ReviewerRole::Mentor),
            SubmissionStatus::PendingSupervisor => Some(ReviewerRole::Supervisor),
            SubmissionStatus::PendingKaUnit => Some(ReviewerRole::KaUnit),
            SubmissionStatus::PendingManager => Some(ReviewerRole::Manager),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.pending_role().is_none()
    }

    pub fn is_rejected(self) -> bool {
        matches!(
            self,
            SubmissionStatus::RejectedMentor
                | SubmissionStatus::RejectedSupervisor
                | SubmissionStatus::RejectedKaUnit
                | SubmissionStatus::RejectedManager
        )
    }

    /// A month with a submission in this status may not be edited: anything
    /// mid-review or approved freezes the month. Only rejection reopens it.
    pub fn freezes_month(self) -> bool {
        !self.is_rejected()
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubmissionStatus::PendingMentor => "pending_mentor",
            SubmissionStatus::PendingSupervisor => "pending_supervisor",
            SubmissionStatus::PendingKaUnit => "pending_kaunit",
            SubmissionStatus::PendingManager => "pending_manager",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::RejectedMentor => "rejected_mentor",
            SubmissionStatus::RejectedSupervisor => "rejected_supervisor",
            SubmissionStatus::RejectedKaUnit => "rejected_kaunit",
            SubmissionStatus::RejectedManager => "rejected_manager",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

/// One stage's recorded review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReview {
    pub decision: ReviewDecision,
    pub notes: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SubmissionError {
    #[error("submission is already terminal ({0})")]
    AlreadyTerminal(SubmissionStatus),

    #[error("role {role} cannot act on a submission in status {status}")]
    RoleMismatch {
        role: ReviewerRole,
        status: SubmissionStatus,
    },

    #[error("an open submission already exists for month {0}")]
    DuplicateOpen(MonthKey),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySubmission {
    pub id: SubmissionId,
    pub mentee_id: EmployeeId,
    pub month: MonthKey,
    pub status: SubmissionStatus,
    /// Reviewer assignment per role, resolved at creation time.
    pub reviewers: BTreeMap<ReviewerRole, EmployeeId>,
    /// Stage reviews recorded so far. A rejection leaves later stages empty.
    pub reviews: BTreeMap<ReviewerRole, StageReview>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonthlySubmission {
    pub fn new(
        mentee_id: EmployeeId,
        month: MonthKey,
        reviewers: BTreeMap<ReviewerRole, EmployeeId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SubmissionId::new(),
            mentee_id,
            month,
            status: SubmissionStatus::PendingMentor,
            reviewers,
            reviews: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn reviewer_for(&self, role: ReviewerRole) -> Option<&EmployeeId> {
        self.reviewers.get(&role)
    }

    /// Applies one reviewer decision. The acting role must be the role
    /// implied by the current status; anything else is rejected as invalid
    /// rather than silently skipped. Returns the status after the transition.
    pub fn advance(
        &mut self,
        role: ReviewerRole,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<SubmissionStatus, SubmissionError> {
        let expected = self
            .status
            .pending_role()
            .ok_or(SubmissionError::AlreadyTerminal(self.status))?;
        if expected != role {
            return Err(SubmissionError::RoleMismatch {
                role,
                status: self.status,
            });
        }

        let now = Utc::now();
        self.reviews.insert(
            role,
            StageReview {
                decision,
                notes,
                reviewed_at: now,
            },
        );
        self.status = match decision {
            ReviewDecision::Rejected => role.rejected_status(),
            ReviewDecision::Approved => match role.next_in_chain() {
                Some(next) => next.pending_status(),
                None => SubmissionStatus::Approved,
            },
        };
        self.updated_at = now;
        Ok(self.status)
    }
}
