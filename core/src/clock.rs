//! Desk clock: the single source of "now" for timestamps, dates and
//! time-derived transaction ids.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub enum BankClock {
    /// Wall clock, local time.
    System,
    /// Frozen at a fixed instant until advanced (used in tests).
    Fixed(NaiveDateTime),
}

impl BankClock {
    pub fn fixed(date: &str, time: &str) -> Self {
        let at = NaiveDateTime::parse_from_str(&format!("{date} {time}"), TIMESTAMP_FORMAT)
            .unwrap_or_default();
        Self::Fixed(at)
    }

    pub fn now(&self) -> NaiveDateTime {
        match self {
            Self::System => Local::now().naive_local(),
            Self::Fixed(at) => *at,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// `YYYY-MM-DD HH:MM:SS`, the ledger's txn_time format.
    pub fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }

    /// `YYYY-MM-DD`, used for every date column.
    pub fn date_string(&self) -> String {
        self.today().format(DATE_FORMAT).to_string()
    }

    pub fn unix_seconds(&self) -> i64 {
        self.now().and_utc().timestamp()
    }

    /// Move a fixed clock forward. No-op on the system clock.
    pub fn advance(&mut self, seconds: i64) {
        if let Self::Fixed(at) = self {
            *at += Duration::seconds(seconds);
        }
    }
}

impl Default for BankClock {
    fn default() -> Self {
        Self::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_formats_and_advances() {
        let mut clock = BankClock::fixed("2024-03-01", "09:30:00");
        assert_eq!(clock.timestamp(), "2024-03-01 09:30:00");
        assert_eq!(clock.date_string(), "2024-03-01");

        let before = clock.unix_seconds();
        clock.advance(90);
        assert_eq!(clock.unix_seconds() - before, 90);
        assert_eq!(clock.timestamp(), "2024-03-01 09:31:30");
    }
}
