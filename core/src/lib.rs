// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Mutabaah Core
//!
//! Core of the employee religious-activity tracking portal: the monthly
//! activity ledger, the locking policy, the evidence aggregator, manual
//! correction requests, and the multi-stage monthly approval workflow.
//!
//! # Architecture
//!
//! - **Domain:** pure types, state machines, repository traits
//! - **Application:** aggregation and workflow services
//! - **Infrastructure:** event bus, in-memory and PostgreSQL repositories

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
