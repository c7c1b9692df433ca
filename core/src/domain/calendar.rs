// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Calendar key types shared by the ledger and the approval workflow.
//
// Month and day keys are stored in their canonical string forms ("YYYY-MM",
// "DD") because that is exactly how they appear in persisted ledgers and in
// evidence payloads from the producers. Lexical ordering of the canonical
// forms is calendar ordering, so the newtypes derive `Ord` directly.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DAY_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}$").expect("day key pattern"));

static MONTH_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}$").expect("month key pattern"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid month key '{0}', expected YYYY-MM")]
    InvalidMonthKey(String),

    #[error("invalid day key '{0}', expected 01-31")]
    InvalidDayKey(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Canonical `YYYY-MM` month identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthKey(String);

impl MonthKey {
    pub fn parse(raw: &str) -> Result<Self, CalendarError> {
        if !MONTH_KEY_RE.is_match(raw) {
            return Err(CalendarError::InvalidMonthKey(raw.to_string()));
        }
        let month: u32 = raw[5..7]
            .parse()
            .map_err(|_| CalendarError::InvalidMonthKey(raw.to_string()))?;
        if !(1..=12).contains(&month) {
            return Err(CalendarError::InvalidMonthKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!("{:04}-{:02}", date.year(), date.month()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical two-digit day-of-month identifier, `01`-`31`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    pub fn parse(raw: &str) -> Result<Self, CalendarError> {
        if !Self::is_well_formed(raw) {
            return Err(CalendarError::InvalidDayKey(raw.to_string()));
        }
        let day: u32 = raw
            .parse()
            .map_err(|_| CalendarError::InvalidDayKey(raw.to_string()))?;
        if !(1..=31).contains(&day) {
            return Err(CalendarError::InvalidDayKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!("{:02}", date.day()))
    }

    /// Shape test used by ledger sanitization: day buckets persisted by
    /// legacy merges can contain keys that were never day-of-month strings.
    pub fn is_well_formed(raw: &str) -> bool {
        DAY_KEY_RE.is_match(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier naming a trackable behavior (a prayer, a reading habit,
/// a recurring session). Stable across evidence sources; each source maps its
/// own vocabulary onto this id before anything reaches the ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a `YYYY-MM-DD` producer date string.
pub fn parse_evidence_date(raw: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CalendarError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key_parse_and_order() {
        let march = MonthKey::parse("2024-03").unwrap();
        let april = MonthKey::parse("2024-04").unwrap();
        let next_year = MonthKey::parse("2025-01").unwrap();
        assert!(march < april);
        assert!(april < next_year);
        assert_eq!(march.as_str(), "2024-03");
    }

    #[test]
    fn test_month_key_rejects_malformed() {
        assert!(MonthKey::parse("2024-13").is_err());
        assert!(MonthKey::parse("2024-00").is_err());
        assert!(MonthKey::parse("2024-3").is_err());
        assert!(MonthKey::parse("202403").is_err());
        assert!(MonthKey::parse("").is_err());
    }

    #[test]
    fn test_month_key_from_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(MonthKey::from_date(date).as_str(), "2024-03");
    }

    #[test]
    fn test_day_key_parse() {
        assert_eq!(DayKey::parse("05").unwrap().as_str(), "05");
        assert_eq!(DayKey::parse("31").unwrap().as_str(), "31");
        assert!(DayKey::parse("32").is_err());
        assert!(DayKey::parse("00").is_err());
        assert!(DayKey::parse("5").is_err());
        assert!(DayKey::parse("ab").is_err());
    }

    #[test]
    fn test_day_key_well_formed_shape() {
        assert!(DayKey::is_well_formed("07"));
        assert!(DayKey::is_well_formed("99")); // shape only, range is parse's job
        assert!(!DayKey::is_well_formed("7"));
        assert!(!DayKey::is_well_formed("totalDays"));
        assert!(!DayKey::is_well_formed("summary"));
    }

    #[test]
    fn test_evidence_date_parse() {
        assert_eq!(
            parse_evidence_date("2024-03-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert!(parse_evidence_date("2024-03-32").is_err());
        assert!(parse_evidence_date("05-03-2024").is_err());
        assert!(parse_evidence_date("").is_err());
    }
}
