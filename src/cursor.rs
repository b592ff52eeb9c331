//! Backward month-by-month pagination over the archive.

use crate::errors::ConfigError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, the unit the archive is addressed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Earliest month available in the NYT archive.
    pub const ARCHIVE_START: YearMonth = YearMonth { year: 1851, month: 1 };

    pub fn new(year: i32, month: u32) -> Result<Self, ConfigError> {
        if !(1..=12).contains(&month) {
            return Err(ConfigError::Invalid(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month before this one.
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ConfigError;

    /// Parse `YYYY-MM` (or `YYYY/MM`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Invalid(format!("expected YYYY-MM, got {:?}", s));
        let (year, month) = s.trim().split_once(['-', '/']).ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Tracks the archive month currently loaded at the bottom of the feed.
///
/// Moves strictly backward. The floor is the earliest month that may still
/// be requested; the floor month itself is fetchable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    start: YearMonth,
    current: YearMonth,
    floor: YearMonth,
}

impl PaginationCursor {
    pub fn new(start: YearMonth, floor: YearMonth) -> Self {
        Self {
            start,
            current: start,
            floor,
        }
    }

    pub fn current(&self) -> YearMonth {
        self.current
    }

    pub fn floor(&self) -> YearMonth {
        self.floor
    }

    /// The month the next `advance_backward` would move to.
    pub fn previous(&self) -> YearMonth {
        self.current.previous()
    }

    /// Whether `month` is at or after the floor.
    pub fn is_within_floor(&self, month: YearMonth) -> bool {
        month >= self.floor
    }

    /// Step one month back and return the new position.
    pub fn advance_backward(&mut self) -> YearMonth {
        self.current = self.current.previous();
        self.current
    }

    /// Return to the month the cursor was created with.
    pub fn rewind(&mut self) {
        self.current = self.start;
    }
}
