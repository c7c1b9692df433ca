// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// The employee aggregate as seen by this core: the HR directory owns
// identity; here the employee is the unit of ledger ownership. The ledger is
// logically part of the employee but is physically written by several
// subsystems, all of which go through `LedgerStore::merge` rather than
// touching the aggregate directly.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::calendar::MonthKey;
use crate::domain::evidence::Evidence;
use crate::domain::ledger::Ledger;

/// HR directory identifier, opaque to this core.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub activated_months: BTreeSet<MonthKey>,
    pub activities: Ledger,
}

impl Employee {
    pub fn new(id: EmployeeId) -> Self {
        Self {
            id,
            activated_months: BTreeSet::new(),
            activities: Ledger::new(),
        }
    }

    /// Merges a batch of evidence into this employee's ledger and activates
    /// every month the batch touches. Returns how many cells changed.
    ///
    /// The ledger itself is replaced copy-on-write; readers holding the
    /// previous snapshot are unaffected.
    pub fn absorb(&mut self, items: &[Evidence]) -> usize {
        let result = self.activities.merged(items);
        self.activities = result.ledger;
        for item in items {
            self.activated_months.insert(MonthKey::from_date(item.date));
        }
        result.cells_written
    }

    pub fn has_activated(&self, month: &MonthKey) -> bool {
        self.activated_months.contains(month)
    }
}
