// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Manual Request Repository
//!
//! Production `ManualRequestRepository` backed by the `manual_requests`
//! table.
//!
//! ```sql
//! CREATE TABLE manual_requests (
//!     id             UUID PRIMARY KEY,
//!     mentee_id      TEXT NOT NULL,
//!     kind           TEXT NOT NULL,
//!     activity_id    TEXT NOT NULL,
//!     request_date   DATE NOT NULL,
//!     status         TEXT NOT NULL,
//!     requested_at   TIMESTAMPTZ NOT NULL,
//!     reviewed_at    TIMESTAMPTZ,
//!     reviewer_notes TEXT
//! );
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::calendar::ActivityId;
use crate::domain::employee::EmployeeId;
use crate::domain::repository::{ManualRequestRepository, RepositoryError};
use crate::domain::request::{ManualRequest, RequestId, RequestKind, RequestStatus};

pub struct PostgresManualRequestRepository {
    pool: PgPool,
}

impl PostgresManualRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn kind_from_str(raw: &str) -> Result<RequestKind, RepositoryError> {
    match raw {
        "tadarus" => Ok(RequestKind::Tadarus),
        "missed_prayer" => Ok(RequestKind::MissedPrayer),
        other => Err(RepositoryError::Serialization(format!(
            "unknown request kind '{}'",
            other
        ))),
    }
}

fn status_from_str(raw: &str) -> Result<RequestStatus, RepositoryError> {
    match raw {
        "pending" => Ok(RequestStatus::Pending),
        "approved" => Ok(RequestStatus::Approved),
        "rejected" => Ok(RequestStatus::Rejected),
        other => Err(RepositoryError::Serialization(format!(
            "unknown request status '{}'",
            other
        ))),
    }
}

fn status_to_str(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "pending",
        RequestStatus::Approved => "approved",
        RequestStatus::Rejected => "rejected",
    }
}

fn map_row(row: &PgRow) -> Result<ManualRequest, RepositoryError> {
    let id: uuid::Uuid = row.get("id");
    let mentee_id: String = row.get("mentee_id");
    let kind: String = row.get("kind");
    let activity_id: String = row.get("activity_id");
    let request_date: NaiveDate = row.get("request_date");
    let status: String = row.get("status");
    let requested_at: chrono::DateTime<chrono::Utc> = row.get("requested_at");
    let reviewed_at: Option<chrono::DateTime<chrono::Utc>> = row.get("reviewed_at");
    let reviewer_notes: Option<String> = row.get("reviewer_notes");

    Ok(ManualRequest {
        id: RequestId(id),
        mentee_id: EmployeeId::new(mentee_id),
        kind: kind_from_str(&kind)?,
        activity_id: ActivityId::new(activity_id),
        date: request_date,
        status: status_from_str(&status)?,
        requested_at,
        reviewed_at,
        reviewer_notes,
    })
}

#[async_trait]
impl ManualRequestRepository for PostgresManualRequestRepository {
    async fn save(&self, request: &ManualRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO manual_requests (
                id, mentee_id, kind, activity_id, request_date, status,
                requested_at, reviewed_at, reviewer_notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                reviewed_at = EXCLUDED.reviewed_at,
                reviewer_notes = EXCLUDED.reviewer_notes
            "#,
        )
        .bind(request.id.0)
        .bind(request.mentee_id.as_str())
        .bind(request.kind.to_string())
        .bind(request.activity_id.as_str())
        .bind(request.date)
        .bind(status_to_str(request.status))
        .bind(request.requested_at)
        .bind(request.reviewed_at)
        .bind(request.reviewer_notes.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save request: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<ManualRequest>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, mentee_id, kind, activity_id, request_date, status,
                   requested_at, reviewed_at, reviewer_notes
            FROM manual_requests
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn find_by_employee(
        &self,
        mentee_id: &EmployeeId,
    ) -> Result<Vec<ManualRequest>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, mentee_id, kind, activity_id, request_date, status,
                   requested_at, reviewed_at, reviewer_notes
            FROM manual_requests
            WHERE mentee_id = $1
            ORDER BY requested_at ASC
            "#,
        )
        .bind(mentee_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }

    async fn find_pending(&self) -> Result<Vec<ManualRequest>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, mentee_id, kind, activity_id, request_date, status,
                   requested_at, reviewed_at, reviewer_notes
            FROM manual_requests
            WHERE status = 'pending'
            ORDER BY requested_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }
}
