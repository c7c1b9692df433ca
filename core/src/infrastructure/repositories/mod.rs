// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory repository implementations, used for development and testing.
//! PostgreSQL implementations live in the `postgres_*` submodules and are
//! selected via `application::repository_factory`.

pub mod postgres_ledger;
pub mod postgres_request;
pub mod postgres_submission;

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::calendar::MonthKey;
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::evidence::Evidence;
use crate::domain::ledger::DayMatrix;
use crate::domain::repository::{
    LedgerStore, ManualRequestRepository, MergeOutcome, RepositoryError, SubmissionRepository,
};
use crate::domain::request::{ManualRequest, RequestId, RequestStatus};
use crate::domain::submission::{MonthlySubmission, ReviewerRole, SubmissionId};

#[derive(Debug, Clone)]
struct LedgerRecord {
    employee: Employee,
    last_merged: BTreeMap<MonthKey, DateTime<Utc>>,
}

/// Concurrent multi-writer ledger store. Each merge replaces the employee's
/// ledger copy-on-write under the shard lock, so readers cloning a snapshot
/// see either the pre- or post-merge state, never a half-applied batch.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    records: DashMap<EmployeeId, LedgerRecord>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn merge(
        &self,
        employee_id: &EmployeeId,
        items: &[Evidence],
    ) -> Result<MergeOutcome, RepositoryError> {
        let merged_at = Utc::now();
        let mut record = self
            .records
            .entry(employee_id.clone())
            .or_insert_with(|| LedgerRecord {
                employee: Employee::new(employee_id.clone()),
                last_merged: BTreeMap::new(),
            });

        let cells_written = record.employee.absorb(items);
        for item in items {
            record
                .last_merged
                .insert(MonthKey::from_date(item.date), merged_at);
        }

        Ok(MergeOutcome {
            cells_written,
            merged_at,
        })
    }

    async fn find_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<Employee>, RepositoryError> {
        Ok(self
            .records
            .get(employee_id)
            .map(|record| record.employee.clone()))
    }

    async fn month_view(
        &self,
        employee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<DayMatrix, RepositoryError> {
        Ok(self
            .records
            .get(employee_id)
            .and_then(|record| record.employee.activities.month(month).cloned())
            .unwrap_or_default())
    }

    async fn last_merged_at(
        &self,
        employee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        Ok(self
            .records
            .get(employee_id)
            .and_then(|record| record.last_merged.get(month).copied()))
    }
}

#[derive(Default)]
pub struct InMemorySubmissionRepository {
    submissions: Mutex<HashMap<SubmissionId, MonthlySubmission>>,
}

impl InMemorySubmissionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(_: impl std::fmt::Debug) -> RepositoryError {
    RepositoryError::Database("mutex poisoned".to_string())
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn save(&self, submission: &MonthlySubmission) -> Result<(), RepositoryError> {
        let mut submissions = self.submissions.lock().map_err(poisoned)?;
        submissions.insert(submission.id, submission.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: SubmissionId,
    ) -> Result<Option<MonthlySubmission>, RepositoryError> {
        let submissions = self.submissions.lock().map_err(poisoned)?;
        Ok(submissions.get(&id).cloned())
    }

    async fn find_open(
        &self,
        mentee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<Option<MonthlySubmission>, RepositoryError> {
        let submissions = self.submissions.lock().map_err(poisoned)?;
        Ok(submissions
            .values()
            .find(|s| {
                s.mentee_id == *mentee_id && s.month == *month && !s.status.is_rejected()
            })
            .cloned())
    }

    async fn find_by_employee(
        &self,
        mentee_id: &EmployeeId,
    ) -> Result<Vec<MonthlySubmission>, RepositoryError> {
        let submissions = self.submissions.lock().map_err(poisoned)?;
        let mut found: Vec<_> = submissions
            .values()
            .filter(|s| s.mentee_id == *mentee_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn find_for_reviewer(
        &self,
        role: ReviewerRole,
        reviewer_id: &EmployeeId,
    ) -> Result<Vec<MonthlySubmission>, RepositoryError> {
        let submissions = self.submissions.lock().map_err(poisoned)?;
        let mut found: Vec<_> = submissions
            .values()
            .filter(|s| {
                s.status.pending_role() == Some(role)
                    && s.reviewer_for(role) == Some(reviewer_id)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemoryManualRequestRepository {
    requests: Mutex<HashMap<RequestId, ManualRequest>>,
}

impl InMemoryManualRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManualRequestRepository for InMemoryManualRequestRepository {
    async fn save(&self, request: &ManualRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.lock().map_err(poisoned)?;
        requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<ManualRequest>, RepositoryError> {
        let requests = self.requests.lock().map_err(poisoned)?;
        Ok(requests.get(&id).cloned())
    }

    async fn find_by_employee(
        &self,
        mentee_id: &EmployeeId,
    ) -> Result<Vec<ManualRequest>, RepositoryError> {
        let requests = self.requests.lock().map_err(poisoned)?;
        let mut found: Vec<_> = requests
            .values()
            .filter(|r| r.mentee_id == *mentee_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Ok(found)
    }

    async fn find_pending(&self) -> Result<Vec<ManualRequest>, RepositoryError> {
        let requests = self.requests.lock().map_err(poisoned)?;
        let mut found: Vec<_> = requests
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::ActivityId;
    use chrono::NaiveDate;

    fn evidence(employee: &str, date: &str) -> Evidence {
        Evidence {
            employee_id: EmployeeId::new(employee),
            activity_id: ActivityId::new("subuh"),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            present: true,
        }
    }

    #[tokio::test]
    async fn test_merge_records_cache_metadata() {
        let store = InMemoryLedgerStore::new();
        let emp = EmployeeId::new("emp1");
        let march = MonthKey::parse("2024-03").unwrap();

        assert!(store.last_merged_at(&emp, &march).await.unwrap().is_none());

        let outcome = store.merge(&emp, &[evidence("emp1", "2024-03-05")]).await.unwrap();
        assert_eq!(outcome.cells_written, 1);
        assert_eq!(
            store.last_merged_at(&emp, &march).await.unwrap(),
            Some(outcome.merged_at)
        );

        let employee = store.find_employee(&emp).await.unwrap().unwrap();
        assert!(employee.has_activated(&march));
    }

    #[tokio::test]
    async fn test_month_view_empty_for_unknown_employee() {
        let store = InMemoryLedgerStore::new();
        let view = store
            .month_view(&EmployeeId::new("ghost"), &MonthKey::parse("2024-03").unwrap())
            .await
            .unwrap();
        assert!(view.is_empty());
    }
}
