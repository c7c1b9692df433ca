// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Evidence Types
//!
//! A single (employee, activity, date, present) fact emitted by any producer,
//! destined for the ledger. Four independent producers feed the aggregator:
//! attendance capture, team-session rostering, scheduled-activity sync, and
//! manual-request approval. Each producer speaks its own vocabulary; the
//! `ActivityCatalog` maps that vocabulary onto canonical `ActivityId`s before
//! anything is written.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::calendar::{parse_evidence_date, ActivityId, CalendarError};
use crate::domain::employee::EmployeeId;

/// Resolved evidence, ready to merge into a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub employee_id: EmployeeId,
    pub activity_id: ActivityId,
    pub date: NaiveDate,
    pub present: bool,
}

/// The inbound wire shape shared by all four producers:
/// `{employeeId, activityId, date: "YYYY-MM-DD", present}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvidence {
    pub employee_id: String,
    pub activity_id: String,
    pub date: String,
    pub present: bool,
}

impl RawEvidence {
    /// Resolves the producer vocabulary and date string into typed evidence.
    pub fn resolve(
        &self,
        source: EvidenceSource,
        catalog: &ActivityCatalog,
    ) -> Result<Evidence, EvidenceError> {
        let activity_id = catalog
            .resolve(source, &self.activity_id)
            .ok_or_else(|| EvidenceError::UnknownActivity {
                activity: self.activity_id.clone(),
                evidence_source: source,
            })?;
        let date = parse_evidence_date(&self.date)?;
        Ok(Evidence {
            employee_id: EmployeeId::new(self.employee_id.clone()),
            activity_id,
            date,
            present: self.present,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Attendance,
    TeamSession,
    ScheduledActivity,
    ManualRequest,
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EvidenceSource::Attendance => "attendance",
            EvidenceSource::TeamSession => "team_session",
            EvidenceSource::ScheduledActivity => "scheduled_activity",
            EvidenceSource::ManualRequest => "manual_request",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("unknown activity '{activity}' from source {evidence_source}")]
    UnknownActivity {
        activity: String,
        evidence_source: EvidenceSource,
    },

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Registry of canonical activity ids plus per-source aliases.
///
/// Canonical ids pass through unchanged for any source; aliases let a
/// producer keep emitting its legacy codes (the attendance machines send
/// upper-cased prayer names, the session roster its own session codes).
#[derive(Debug, Clone, Default)]
pub struct ActivityCatalog {
    canonical: Vec<ActivityId>,
    aliases: HashMap<(EvidenceSource, String), ActivityId>,
}

impl ActivityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog shipped with the portal: the five daily prayers, the
    /// reading habit, and the recurring mentoring session.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for id in [
            "subuh", "dzuhur", "ashar", "maghrib", "isya", "tadarus", "kajian",
        ] {
            catalog.register(ActivityId::new(id));
        }
        catalog.register_alias(
            EvidenceSource::TeamSession,
            "halaqah",
            ActivityId::new("kajian"),
        );
        catalog
    }

    pub fn register(&mut self, activity: ActivityId) {
        if !self.canonical.contains(&activity) {
            self.canonical.push(activity);
        }
    }

    pub fn register_alias(
        &mut self,
        source: EvidenceSource,
        alias: impl Into<String>,
        activity: ActivityId,
    ) {
        self.register(activity.clone());
        self.aliases.insert((source, alias.into()), activity);
    }

    /// Maps a producer's raw activity code to a canonical id. Aliases win;
    /// otherwise a canonical id passes through. `None` means the evidence
    /// item must be dropped (logged, not fatal to its batch).
    pub fn resolve(&self, source: EvidenceSource, raw: &str) -> Option<ActivityId> {
        if let Some(mapped) = self.aliases.get(&(source, raw.to_string())) {
            return Some(mapped.clone());
        }
        let candidate = ActivityId::new(raw);
        self.canonical.contains(&candidate).then_some(candidate)
    }

    pub fn contains(&self, activity: &ActivityId) -> bool {
        self.canonical.contains(activity)
    }
}
