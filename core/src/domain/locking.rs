// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Locking Policy
//!
//! Pure rule set deciding whether a (date, employee) pair may still be
//! edited. No clock access and no storage access: the trusted "today" and the
//! employee's existing submissions are inputs, so the whole
//! (today, date, mode, submission-status) matrix is unit-testable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::calendar::MonthKey;
use crate::domain::submission::{MonthlySubmission, SubmissionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockingMode {
    Weekly,
    Monthly,
}

impl Default for LockingMode {
    fn default() -> Self {
        LockingMode::Monthly
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockedError {
    #[error("date {0} is in the future")]
    FutureDate(NaiveDate),

    #[error("date {0} is outside the current month")]
    OutsideCurrentMonth(NaiveDate),

    #[error("month {month} is frozen by a submission in status {status}")]
    MonthFrozen {
        month: MonthKey,
        status: SubmissionStatus,
    },
}

/// Checks the rules in order: future dates, the current-month window, then
/// submission freeze. `submissions` is the employee's full submission list;
/// only the ones for `date`'s month matter.
pub fn check_editable(
    date: NaiveDate,
    today: NaiveDate,
    mode: LockingMode,
    submissions: &[MonthlySubmission],
) -> Result<(), LockedError> {
    if date > today {
        return Err(LockedError::FutureDate(date));
    }

    let month = MonthKey::from_date(date);
    match mode {
        // Both modes currently narrow the edit window to the running month;
        // the stricter per-week cutoff behind Weekly is not wired up yet.
        // TODO: give Weekly a real week boundary once the policy is settled.
        LockingMode::Weekly | LockingMode::Monthly => {
            if month != MonthKey::from_date(today) {
                return Err(LockedError::OutsideCurrentMonth(date));
            }
        }
    }

    if let Some(frozen) = submissions
        .iter()
        .find(|s| s.month == month && s.status.freezes_month())
    {
        return Err(LockedError::MonthFrozen {
            month,
            status: frozen.status,
        });
    }

    Ok(())
}

pub fn is_editable(
    date: NaiveDate,
    today: NaiveDate,
    mode: LockingMode,
    submissions: &[MonthlySubmission],
) -> bool {
    check_editable(date, today, mode, submissions).is_ok()
}
