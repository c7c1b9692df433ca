// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::calendar::MonthKey;
use crate::domain::employee::EmployeeId;
use crate::domain::evidence::EvidenceSource;
use crate::domain::request::RequestId;
use crate::domain::submission::{ReviewDecision, ReviewerRole, SubmissionId, SubmissionStatus};

/// Ledger-side events emitted by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerEvent {
    EvidenceMerged {
        employee_id: EmployeeId,
        source: EvidenceSource,
        months: Vec<MonthKey>,
        cells_written: usize,
        merged_at: DateTime<Utc>,
    },
    EvidenceDropped {
        source: EvidenceSource,
        employee_id: String,
        activity_id: String,
        reason: String,
        dropped_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubmissionEvent {
    SubmissionCreated {
        submission_id: SubmissionId,
        mentee_id: EmployeeId,
        month: MonthKey,
        created_at: DateTime<Utc>,
    },
    StageReviewed {
        submission_id: SubmissionId,
        mentee_id: EmployeeId,
        role: ReviewerRole,
        decision: ReviewDecision,
        status: SubmissionStatus,
        reviewed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequestEvent {
    RequestCreated {
        request_id: RequestId,
        mentee_id: EmployeeId,
        created_at: DateTime<Utc>,
    },
    RequestResolved {
        request_id: RequestId,
        mentee_id: EmployeeId,
        decision: ReviewDecision,
        resolved_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SubmissionCreated,
    SubmissionStageApproved,
    SubmissionApproved,
    SubmissionRejected,
    RequestApproved,
    RequestRejected,
}

/// The outbound notification contract: every workflow transition fires one of
/// these for an external delivery collaborator to consume. Delivery itself is
/// not this core's concern. Serializes to the delivery payload shape
/// `{userId, type, title, message, relatedEntityId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: EmployeeId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_entity_id: String,
}
