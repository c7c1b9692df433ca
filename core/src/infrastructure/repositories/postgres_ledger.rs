// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Ledger Store
//!
//! Production `LedgerStore` backed by the `activity_ledgers` table: one row
//! per employee, the ledger and its cache metadata as JSONB.
//!
//! ```sql
//! CREATE TABLE activity_ledgers (
//!     employee_id      TEXT PRIMARY KEY,
//!     ledger           JSONB NOT NULL,
//!     activated_months JSONB NOT NULL,
//!     last_merged      JSONB NOT NULL,
//!     updated_at       TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! Merges run read-modify-write inside a transaction with `FOR UPDATE`, so
//! concurrent producers serialize per employee while the OR-merge keeps the
//! result independent of who wins the race. The ledger is fully sanitized
//! before every write-back.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::calendar::MonthKey;
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::evidence::Evidence;
use crate::domain::ledger::{DayMatrix, Ledger};
use crate::domain::repository::{LedgerStore, MergeOutcome, RepositoryError};

pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn merge(
        &self,
        employee_id: &EmployeeId,
        items: &[Evidence],
    ) -> Result<MergeOutcome, RepositoryError> {
        let merged_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT ledger, activated_months, last_merged
            FROM activity_ledgers
            WHERE employee_id = $1
            FOR UPDATE
            "#,
        )
        .bind(employee_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let (mut employee, mut last_merged) = match row {
            Some(row) => {
                let ledger: serde_json::Value = row.get("ledger");
                let activated: serde_json::Value = row.get("activated_months");
                let marks: serde_json::Value = row.get("last_merged");
                let employee = Employee {
                    id: employee_id.clone(),
                    activated_months: serde_json::from_value::<BTreeSet<MonthKey>>(activated)?,
                    activities: serde_json::from_value::<Ledger>(ledger)?,
                };
                let last_merged: BTreeMap<MonthKey, DateTime<Utc>> =
                    serde_json::from_value(marks)?;
                (employee, last_merged)
            }
            None => (Employee::new(employee_id.clone()), BTreeMap::new()),
        };

        let cells_written = employee.absorb(items);
        for item in items {
            last_merged.insert(MonthKey::from_date(item.date), merged_at);
        }

        let ledger_json = serde_json::to_value(employee.activities.sanitized())?;
        let activated_json = serde_json::to_value(&employee.activated_months)?;
        let marks_json = serde_json::to_value(&last_merged)?;

        sqlx::query(
            r#"
            INSERT INTO activity_ledgers (
                employee_id, ledger, activated_months, last_merged, updated_at
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (employee_id) DO UPDATE SET
                ledger = EXCLUDED.ledger,
                activated_months = EXCLUDED.activated_months,
                last_merged = EXCLUDED.last_merged,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(employee_id.as_str())
        .bind(ledger_json)
        .bind(activated_json)
        .bind(marks_json)
        .bind(merged_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save ledger: {}", e)))?;

        tx.commit().await?;

        Ok(MergeOutcome {
            cells_written,
            merged_at,
        })
    }

    async fn find_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT ledger, activated_months
            FROM activity_ledgers
            WHERE employee_id = $1
            "#,
        )
        .bind(employee_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let ledger: serde_json::Value = row.get("ledger");
            let activated: serde_json::Value = row.get("activated_months");
            Ok(Some(Employee {
                id: employee_id.clone(),
                activated_months: serde_json::from_value(activated)?,
                activities: serde_json::from_value(ledger)?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn month_view(
        &self,
        employee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<DayMatrix, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT ledger -> $2 AS month
            FROM activity_ledgers
            WHERE employee_id = $1
            "#,
        )
        .bind(employee_id.as_str())
        .bind(month.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let month: Option<serde_json::Value> = row.get("month");
                match month {
                    Some(value) => Ok(serde_json::from_value(value)?),
                    None => Ok(DayMatrix::default()),
                }
            }
            None => Ok(DayMatrix::default()),
        }
    }

    async fn last_merged_at(
        &self,
        employee_id: &EmployeeId,
        month: &MonthKey,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT last_merged ->> $2 AS merged_at
            FROM activity_ledgers
            WHERE employee_id = $1
            "#,
        )
        .bind(employee_id.as_str())
        .bind(month.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let merged_at: Option<String> = row.get("merged_at");
                match merged_at {
                    Some(raw) => {
                        let parsed = raw.parse::<DateTime<Utc>>().map_err(|e| {
                            RepositoryError::Serialization(format!(
                                "invalid merge timestamp: {}",
                                e
                            ))
                        })?;
                        Ok(Some(parsed))
                    }
                    None => Ok(None),
                }
            }
            None => Ok(None),
        }
    }
}
