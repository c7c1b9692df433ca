// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Manual Correction Requests
//!
//! Employee-initiated corrections for evidence the producers missed: claiming
//! attendance at a tadarus/mentoring session, or reporting a prayer performed
//! outside capture. Two request kinds share one lifecycle:
//! `pending → approved | rejected`, terminal, resolved exactly once.
//!
//! Approval is a trigger, not just a status flip — the service layer turns an
//! approved request into a single-item evidence batch for the aggregator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::calendar::ActivityId;
use crate::domain::employee::EmployeeId;
use crate::domain::evidence::Evidence;
use crate::domain::submission::ReviewDecision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Tadarus,
    MissedPrayer,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestKind::Tadarus => "tadarus",
            RequestKind::MissedPrayer => "missed_prayer",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("request {0} is already resolved")]
    AlreadyResolved(RequestId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualRequest {
    pub id: RequestId,
    pub mentee_id: EmployeeId,
    pub kind: RequestKind,
    pub activity_id: ActivityId,
    pub date: NaiveDate,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewer_notes: Option<String>,
}

impl ManualRequest {
    pub fn new(
        mentee_id: EmployeeId,
        kind: RequestKind,
        activity_id: ActivityId,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: RequestId::new(),
            mentee_id,
            kind,
            activity_id,
            date,
            status: RequestStatus::Pending,
            requested_at: Utc::now(),
            reviewed_at: None,
            reviewer_notes: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status != RequestStatus::Pending
    }

    /// Records the one reviewer decision this request will ever take. A
    /// second call fails; duplicate approval clicks must never double-write
    /// the ledger downstream.
    pub fn resolve(
        &mut self,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<(), RequestError> {
        if self.is_resolved() {
            return Err(RequestError::AlreadyResolved(self.id));
        }
        self.status = match decision {
            ReviewDecision::Approved => RequestStatus::Approved,
            ReviewDecision::Rejected => RequestStatus::Rejected,
        };
        self.reviewed_at = Some(Utc::now());
        self.reviewer_notes = notes;
        Ok(())
    }

    /// The evidence an approved request contributes: always `present = true`
    /// for the claimed date/activity pair.
    pub fn as_evidence(&self) -> Evidence {
        Evidence {
            employee_id: self.mentee_id.clone(),
            activity_id: self.activity_id.clone(),
            date: self.date,
            present: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ManualRequest {
        ManualRequest::new(
            EmployeeId::new("emp1"),
            RequestKind::Tadarus,
            ActivityId::new("tadarus"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        )
    }

    #[test]
    fn test_resolve_approved() {
        let mut req = request();
        req.resolve(ReviewDecision::Approved, Some("verified".to_string()))
            .unwrap();
        assert_eq!(req.status, RequestStatus::Approved);
        assert!(req.reviewed_at.is_some());
        assert_eq!(req.reviewer_notes.as_deref(), Some("verified"));
    }

    #[test]
    fn test_second_resolution_fails() {
        let mut req = request();
        req.resolve(ReviewDecision::Rejected, None).unwrap();
        let err = req.resolve(ReviewDecision::Approved, None).unwrap_err();
        assert_eq!(err, RequestError::AlreadyResolved(req.id));
        // first decision stands
        assert_eq!(req.status, RequestStatus::Rejected);
    }

    #[test]
    fn test_as_evidence_is_present_true() {
        let req = request();
        let evidence = req.as_evidence();
        assert!(evidence.present);
        assert_eq!(evidence.activity_id, ActivityId::new("tadarus"));
        assert_eq!(evidence.date, req.date);
    }
}
