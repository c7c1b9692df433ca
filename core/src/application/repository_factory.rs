// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend
//! configuration. The domain layer defines the traits, the infrastructure
//! layer provides the implementations, and this factory wires one or the
//! other in at startup.

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::repository::{
    LedgerStore, ManualRequestRepository, StorageBackend, SubmissionRepository,
};
use crate::infrastructure::repositories::postgres_ledger::PostgresLedgerStore;
use crate::infrastructure::repositories::postgres_request::PostgresManualRequestRepository;
use crate::infrastructure::repositories::postgres_submission::PostgresSubmissionRepository;
use crate::infrastructure::repositories::{
    InMemoryLedgerStore, InMemoryManualRequestRepository, InMemorySubmissionRepository,
};

/// Creates a LedgerStore implementation based on the configured backend
pub fn create_ledger_store(backend: &StorageBackend, pool: PgPool) -> Arc<dyn LedgerStore> {
    match backend {
        StorageBackend::InMemory => Arc::new(InMemoryLedgerStore::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresLedgerStore::new(pool)),
    }
}

/// Creates a SubmissionRepository implementation based on the configured backend
pub fn create_submission_repository(
    backend: &StorageBackend,
    pool: PgPool,
) -> Arc<dyn SubmissionRepository> {
    match backend {
        StorageBackend::InMemory => Arc::new(InMemorySubmissionRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresSubmissionRepository::new(pool)),
    }
}

/// Creates a ManualRequestRepository implementation based on the configured backend
pub fn create_manual_request_repository(
    backend: &StorageBackend,
    pool: PgPool,
) -> Arc<dyn ManualRequestRepository> {
    match backend {
        StorageBackend::InMemory => Arc::new(InMemoryManualRequestRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresManualRequestRepository::new(pool)),
    }
}
