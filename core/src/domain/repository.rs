// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate, following the DDD Repository
//! pattern: one repository per aggregate, interface defined in the domain
//! layer, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `LedgerStore` | `Employee` (ledger) | `InMemoryLedgerStore`, `PostgresLedgerStore` |
//! | `SubmissionRepository` | `MonthlySubmission` | `InMemorySubmissionRepository`, `PostgresSubmissionRepository` |
//! | `ManualRequestRepository` | `ManualRequest` | `InMemoryManualRequestRepository`, `PostgresManualRequestRepository` |
//!
//! The ledger lives logically inside the employee aggregate but is written by
//! several independent subsystems, so producers depend on the narrow
//! `LedgerStore::merge` contract instead of the aggregate's full shape. The
//! OR-merge inside `merge` is the only write primitive the store exposes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::calendar::MonthKey;
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::evidence::Evidence;
use crate::domain::ledger::DayMatrix;
use crate::domain::request::{ManualRequest, RequestId};
use crate::domain::submission::{MonthlySubmission, ReviewerRole, SubmissionId};

/// Storage backend selection for pluggable persistence.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

/// Explicit cache metadata returned from every merge, replacing the ambient
/// staleness flags the reporting layer used to poke at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub cells_written: usize,
    pub merged_at: DateTime<Utc>,
}

/// Write/read surface of the activity ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// OR-merges evidence into one employee's ledger. Idempotent and
    /// commutative: re-delivery and reordering across producers are safe.
    async fn merge(
        &self,
        employee_id: &EmployeeId,
        items: &[Evidence],
    ) -> Result<MergeOutcome, RepositoryError>;

    /// Snapshot of the full employee aggregate (ledger + activated months).
    async fn find_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<Employee>, RepositoryError>;

    /// One month's day buckets, empty when nothing has been merged yet.
    async fn month_view(
        &self,
        employee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<DayMatrix, RepositoryError>;

    /// When evidence last landed for (employee, month).
    async fn last_merged_at(
        &self,
        employee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError>;
}

/// Repository interface for MonthlySubmission aggregates.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Save submission (create or update)
    async fn save(&self, submission: &MonthlySubmission) -> Result<(), RepositoryError>;

    /// Find submission by ID
    async fn find_by_id(
        &self,
        id: SubmissionId,
    ) -> Result<Option<MonthlySubmission>, RepositoryError>;

    /// The at-most-one submission for (employee, month) that is not in a
    /// rejected status. Backs the creation-path uniqueness invariant.
    async fn find_open(
        &self,
        mentee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<Option<MonthlySubmission>, RepositoryError>;

    /// All submissions belonging to one employee
    async fn find_by_employee(
        &self,
        mentee_id: &EmployeeId,
    ) -> Result<Vec<MonthlySubmission>, RepositoryError>;

    /// Submissions currently waiting on a reviewer in the given role
    async fn find_for_reviewer(
        &self,
        role: ReviewerRole,
        reviewer_id: &EmployeeId,
    ) -> Result<Vec<MonthlySubmission>, RepositoryError>;
}

/// Repository interface for ManualRequest aggregates.
#[async_trait]
pub trait ManualRequestRepository: Send + Sync {
    /// Save request (create or update)
    async fn save(&self, request: &ManualRequest) -> Result<(), RepositoryError>;

    /// Find request by ID
    async fn find_by_id(&self, id: RequestId) -> Result<Option<ManualRequest>, RepositoryError>;

    /// All requests raised by one employee
    async fn find_by_employee(
        &self,
        mentee_id: &EmployeeId,
    ) -> Result<Vec<ManualRequest>, RepositoryError>;

    /// Requests still waiting on a reviewer
    async fn find_pending(&self) -> Result<Vec<ManualRequest>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
