// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Evidence Aggregator Use Case
//!
//! Application service merging evidence batches from the four producers into
//! the ledger through the `LedgerStore` contract.
//!
//! # Flow
//!
//! 1. Resolve each raw item: producer vocabulary via `ActivityCatalog`, date
//!    via the calendar parser. Unresolvable items are dropped and logged,
//!    never fatal to the batch.
//! 2. Group resolved evidence by employee.
//! 3. `LedgerStore::merge` per employee — the OR-merge keeps re-delivery and
//!    producer interleaving safe, so callers retry with the same inputs.
//! 4. Publish `LedgerEvent`s and return an `IngestReport` with explicit
//!    per-batch cache metadata.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::calendar::MonthKey;
use crate::domain::employee::EmployeeId;
use crate::domain::events::LedgerEvent;
use crate::domain::evidence::{ActivityCatalog, Evidence, EvidenceSource, RawEvidence};
use crate::domain::repository::LedgerStore;
use crate::infrastructure::event_bus::EventBus;

/// An evidence item the aggregator refused, with enough context to audit why.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DroppedEvidence {
    pub employee_id: String,
    pub activity_id: String,
    pub date: String,
    pub reason: String,
}

/// Outcome of one ingest call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestReport {
    pub source: EvidenceSource,
    pub employees_touched: usize,
    pub cells_written: usize,
    pub dropped: Vec<DroppedEvidence>,
}

pub struct EvidenceAggregator {
    store: Arc<dyn LedgerStore>,
    catalog: ActivityCatalog,
    event_bus: Arc<EventBus>,
}

impl EvidenceAggregator {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        catalog: ActivityCatalog,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            catalog,
            event_bus,
        }
    }

    /// Ingest a raw producer batch: resolve, group, merge.
    pub async fn ingest(
        &self,
        source: EvidenceSource,
        batch: &[RawEvidence],
    ) -> Result<IngestReport> {
        let mut resolved = Vec::with_capacity(batch.len());
        let mut dropped = Vec::new();

        for raw in batch {
            match raw.resolve(source, &self.catalog) {
                Ok(evidence) => resolved.push(evidence),
                Err(err) => {
                    warn!(
                        source = %source,
                        employee_id = %raw.employee_id,
                        activity_id = %raw.activity_id,
                        date = %raw.date,
                        "Dropping evidence item: {}",
                        err
                    );
                    self.event_bus.publish_ledger_event(LedgerEvent::EvidenceDropped {
                        source,
                        employee_id: raw.employee_id.clone(),
                        activity_id: raw.activity_id.clone(),
                        reason: err.to_string(),
                        dropped_at: Utc::now(),
                    });
                    dropped.push(DroppedEvidence {
                        employee_id: raw.employee_id.clone(),
                        activity_id: raw.activity_id.clone(),
                        date: raw.date.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let mut report = self.merge_resolved(source, resolved).await?;
        report.dropped = dropped;
        Ok(report)
    }

    /// Merge already-typed evidence. This is also the path manual-request
    /// approval takes with its single-item batch.
    pub async fn merge_resolved(
        &self,
        source: EvidenceSource,
        items: Vec<Evidence>,
    ) -> Result<IngestReport> {
        let mut grouped: BTreeMap<EmployeeId, Vec<Evidence>> = BTreeMap::new();
        for item in items {
            grouped.entry(item.employee_id.clone()).or_default().push(item);
        }

        let employees_touched = grouped.len();
        let mut cells_written = 0usize;

        for (employee_id, items) in grouped {
            let outcome = self
                .store
                .merge(&employee_id, &items)
                .await
                .with_context(|| format!("failed to merge evidence for employee {}", employee_id))?;

            let mut months: Vec<MonthKey> = items
                .iter()
                .map(|item| MonthKey::from_date(item.date))
                .collect();
            months.sort();
            months.dedup();

            debug!(
                employee_id = %employee_id,
                source = %source,
                cells_written = outcome.cells_written,
                "Merged evidence batch"
            );
            self.event_bus.publish_ledger_event(LedgerEvent::EvidenceMerged {
                employee_id,
                source,
                months,
                cells_written: outcome.cells_written,
                merged_at: outcome.merged_at,
            });
            cells_written += outcome.cells_written;
        }

        Ok(IngestReport {
            source,
            employees_touched,
            cells_written,
            dropped: Vec::new(),
        })
    }
}
