// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Submission Repository
//!
//! Production `SubmissionRepository` backed by the `monthly_submissions`
//! table. Reviewer assignments and stage reviews are JSONB; the status column
//! carries the canonical snake_case status strings.
//!
//! ```sql
//! CREATE TABLE monthly_submissions (
//!     id         UUID PRIMARY KEY,
//!     mentee_id  TEXT NOT NULL,
//!     month      TEXT NOT NULL,
//!     status     TEXT NOT NULL,
//!     reviewers  JSONB NOT NULL,
//!     reviews    JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::calendar::MonthKey;
use crate::domain::employee::EmployeeId;
use crate::domain::repository::{RepositoryError, SubmissionRepository};
use crate::domain::submission::{
    MonthlySubmission, ReviewerRole, SubmissionId, SubmissionStatus,
};

pub struct PostgresSubmissionRepository {
    pool: PgPool,
}

impl PostgresSubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const REJECTED_STATUSES: [&str; 4] = [
    "rejected_mentor",
    "rejected_supervisor",
    "rejected_kaunit",
    "rejected_manager",
];

fn status_from_str(raw: &str) -> Result<SubmissionStatus, RepositoryError> {
    match raw {
        "pending_mentor" => Ok(SubmissionStatus::PendingMentor),
        "pending_supervisor" => Ok(SubmissionStatus::PendingSupervisor),
        "pending_kaunit" => Ok(SubmissionStatus::PendingKaUnit),
        "pending_manager" => Ok(SubmissionStatus::PendingManager),
        "approved" => Ok(SubmissionStatus::Approved),
        "rejected_mentor" => Ok(SubmissionStatus::RejectedMentor),
        "rejected_supervisor" => Ok(SubmissionStatus::RejectedSupervisor),
        "rejected_kaunit" => Ok(SubmissionStatus::RejectedKaUnit),
        "rejected_manager" => Ok(SubmissionStatus::RejectedManager),
        other => Err(RepositoryError::Serialization(format!(
            "unknown submission status '{}'",
            other
        ))),
    }
}

fn map_row(row: &PgRow) -> Result<MonthlySubmission, RepositoryError> {
    let id: uuid::Uuid = row.get("id");
    let mentee_id: String = row.get("mentee_id");
    let month: String = row.get("month");
    let status: String = row.get("status");
    let reviewers: serde_json::Value = row.get("reviewers");
    let reviews: serde_json::Value = row.get("reviews");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
    let updated_at: chrono::DateTime<chrono::Utc> = row.get("updated_at");

    Ok(MonthlySubmission {
        id: SubmissionId(id),
        mentee_id: EmployeeId::new(mentee_id),
        month: MonthKey::parse(&month)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        status: status_from_str(&status)?,
        reviewers: serde_json::from_value(reviewers)?,
        reviews: serde_json::from_value(reviews)?,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl SubmissionRepository for PostgresSubmissionRepository {
    async fn save(&self, submission: &MonthlySubmission) -> Result<(), RepositoryError> {
        let reviewers = serde_json::to_value(&submission.reviewers)?;
        let reviews = serde_json::to_value(&submission.reviews)?;

        sqlx::query(
            r#"
            INSERT INTO monthly_submissions (
                id, mentee_id, month, status, reviewers, reviews,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                reviewers = EXCLUDED.reviewers,
                reviews = EXCLUDED.reviews,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(submission.id.0)
        .bind(submission.mentee_id.as_str())
        .bind(submission.month.as_str())
        .bind(submission.status.to_string())
        .bind(reviewers)
        .bind(reviews)
        .bind(submission.created_at)
        .bind(submission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save submission: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: SubmissionId,
    ) -> Result<Option<MonthlySubmission>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, mentee_id, month, status, reviewers, reviews, created_at, updated_at
            FROM monthly_submissions
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn find_open(
        &self,
        mentee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<Option<MonthlySubmission>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, mentee_id, month, status, reviewers, reviews, created_at, updated_at
            FROM monthly_submissions
            WHERE mentee_id = $1 AND month = $2 AND status != ALL($3)
            "#,
        )
        .bind(mentee_id.as_str())
        .bind(month.as_str())
        .bind(&REJECTED_STATUSES[..])
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn find_by_employee(
        &self,
        mentee_id: &EmployeeId,
    ) -> Result<Vec<MonthlySubmission>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, mentee_id, month, status, reviewers, reviews, created_at, updated_at
            FROM monthly_submissions
            WHERE mentee_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(mentee_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }

    async fn find_for_reviewer(
        &self,
        role: ReviewerRole,
        reviewer_id: &EmployeeId,
    ) -> Result<Vec<MonthlySubmission>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, mentee_id, month, status, reviewers, reviews, created_at, updated_at
            FROM monthly_submissions
            WHERE status = $1 AND reviewers ->> $2 = $3
            ORDER BY created_at ASC
            "#,
        )
        .bind(role.pending_status().to_string())
        .bind(role.to_string())
        .bind(reviewer_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }
}
