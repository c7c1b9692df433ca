// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Activity Ledger
//!
//! Per-employee nested matrix `month → day → activity → bool` recording which
//! tracked behaviors occurred on which days. The ledger is shared-read and
//! multi-writer: evidence arrives from independent asynchronous producers in
//! arbitrary interleavings, so the only write primitive is a commutative,
//! idempotent OR-merge. A `true` cell never flips back to `false`.
//!
//! Day buckets are keyed by raw strings at the storage boundary. Legacy
//! merges stored unrelated aggregate fields alongside day buckets; every key
//! that does not look like a two-digit day-of-month is stripped before the
//! bucket is persisted again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::calendar::{ActivityId, DayKey, MonthKey};
use crate::domain::evidence::Evidence;

/// One day's activity marks.
pub type ActivityMarks = BTreeMap<ActivityId, bool>;

/// One month's day buckets, keyed by the raw day string as persisted.
pub type DayMatrix = BTreeMap<String, ActivityMarks>;

/// The outcome of a pure merge: the new ledger plus how many cells actually
/// changed (zero when re-delivering already-applied evidence).
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub ledger: Ledger,
    pub cells_written: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    months: BTreeMap<MonthKey, DayMatrix>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn month(&self, month: &MonthKey) -> Option<&DayMatrix> {
        self.months.get(month)
    }

    pub fn months(&self) -> impl Iterator<Item = &MonthKey> {
        self.months.keys()
    }

    pub fn is_marked(&self, month: &MonthKey, day: &DayKey, activity: &ActivityId) -> bool {
        self.months
            .get(month)
            .and_then(|days| days.get(day.as_str()))
            .and_then(|marks| marks.get(activity))
            .copied()
            .unwrap_or(false)
    }

    /// OR-merges a batch of evidence into a copy of this ledger. The receiver
    /// is never mutated; concurrent readers keep seeing the pre-merge state
    /// until the caller swaps the result in.
    ///
    /// Each touched month bucket is sanitized before its first write, and
    /// every cell is written as `existing || present`, which makes the merge
    /// commutative and idempotent across batches.
    pub fn merged(&self, items: &[Evidence]) -> MergeResult {
        let mut months = self.months.clone();
        let mut cells_written = 0usize;

        for item in items {
            let month = MonthKey::from_date(item.date);
            let day = DayKey::from_date(item.date);

            let matrix = months.entry(month).or_default();
            sanitize_matrix(matrix);

            let marks = matrix.entry(day.as_str().to_string()).or_default();
            let previous = marks.get(&item.activity_id).copied();
            let next = previous.unwrap_or(false) || item.present;
            if previous != Some(next) {
                cells_written += 1;
            }
            marks.insert(item.activity_id.clone(), next);
        }

        MergeResult {
            ledger: Ledger { months },
            cells_written,
        }
    }

    /// Full sanitization sweep over every month bucket. Run before any
    /// persistence of a ledger that may carry legacy contamination.
    pub fn sanitized(&self) -> Ledger {
        let mut months = self.months.clone();
        for matrix in months.values_mut() {
            sanitize_matrix(matrix);
        }
        Ledger { months }
    }

    /// True when every key under every month bucket is a well-formed day key.
    pub fn is_sanitized(&self) -> bool {
        self.months
            .values()
            .flat_map(|matrix| matrix.keys())
            .all(|key| DayKey::is_well_formed(key))
    }
}

fn sanitize_matrix(matrix: &mut DayMatrix) {
    matrix.retain(|key, _| DayKey::is_well_formed(key));
}
