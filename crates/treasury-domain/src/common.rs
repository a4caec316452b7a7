//! Shared traits, date helpers, and domain-level errors.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Calendar format accepted for voucher and statement dates.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Exposes a stable identifier for entities stored in the ledger.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Entities that can be switched off without being deleted.
pub trait Activatable {
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors raised while constructing domain values.
pub enum DomainError {
    #[error("invalid calendar date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("date range end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Parses a `YYYY-MM-DD` string into a calendar date.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(raw.trim(), ISO_DATE_FORMAT)
        .map_err(|_| DomainError::InvalidDate(raw.to_string()))
}

/// Canonical form used for case-insensitive name uniqueness checks.
pub fn normalized_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "RawDateRange")]
/// Inclusive calendar range `[from, to]`.
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = DomainError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.from, raw.to)
    }
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, DomainError> {
        if to < from {
            return Err(DomainError::InvalidRange {
                start: from,
                end: to,
            });
        }
        Ok(Self { from, to })
    }

    pub fn parse(from: &str, to: &str) -> Result<Self, DomainError> {
        Self::new(parse_iso_date(from)?, parse_iso_date(to)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..={}",
            self.from.format(ISO_DATE_FORMAT),
            self.to.format(ISO_DATE_FORMAT)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates_and_rejects_garbage() {
        assert_eq!(
            parse_iso_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(matches!(
            parse_iso_date("2023-02-29"),
            Err(DomainError::InvalidDate(_))
        ));
        assert!(parse_iso_date("29/02/2024").is_err());
    }

    #[test]
    fn date_range_is_inclusive_and_ordered() {
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
        assert!(DateRange::parse("2024-02-01", "2024-01-01").is_err());
    }

    #[test]
    fn reversed_range_does_not_deserialize() {
        let ok: DateRange =
            serde_json::from_str(r#"{"from":"2024-01-01","to":"2024-01-31"}"#).unwrap();
        assert_eq!(ok.to, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        let err = serde_json::from_str::<DateRange>(r#"{"from":"2024-02-01","to":"2024-01-01"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("before start"), "{err}");
    }
}
