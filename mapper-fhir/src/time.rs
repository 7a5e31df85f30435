//! Fixed date patterns of the supported exports.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use mapper_core::{MapperError, MapperResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePattern {
    /// `2019-02-17`, trailing text ignored.
    IsoDate,
    /// `2019-02-17T05:07:38Z`.
    IsoInstant,
    /// `02/17/2019`, trailing text ignored.
    UsDate,
    /// `02/17/2019 05:07:38 AM`, read as UTC.
    UsTimestamp,
}

impl DatePattern {
    /// Human-readable pattern quoted in [`MapperError::DateFormat`].
    pub fn describe(self) -> &'static str {
        match self {
            DatePattern::IsoDate => "YYYY-MM-DD",
            DatePattern::IsoInstant => "ISO-8601 instant",
            DatePattern::UsDate => "MM/DD/YYYY",
            DatePattern::UsTimestamp => "MM/DD/YYYY hh:mm:ss AM/PM",
        }
    }

    /// Calendar date of `value`; instant patterns keep their UTC date.
    pub fn date(self, value: &str, line: u64, field: &'static str) -> MapperResult<NaiveDate> {
        let value = value.trim();
        let parsed = match self {
            DatePattern::IsoDate => date_prefix(value, "%Y-%m-%d"),
            DatePattern::UsDate => date_prefix(value, "%m/%d/%Y"),
            DatePattern::IsoInstant | DatePattern::UsTimestamp => {
                return self.instant(value, line, field).map(|at| at.date_naive());
            }
        };
        parsed.ok_or_else(|| self.mismatch(value, line, field))
    }

    /// Point in time of `value`; date-only patterns resolve to midnight UTC.
    pub fn instant(
        self,
        value: &str,
        line: u64,
        field: &'static str,
    ) -> MapperResult<DateTime<Utc>> {
        let value = value.trim();
        let parsed = match self {
            DatePattern::IsoInstant => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|at| at.with_timezone(&Utc)),
            DatePattern::UsTimestamp => NaiveDateTime::parse_from_str(value, "%m/%d/%Y %I:%M:%S %p")
                .ok()
                .map(|at| Utc.from_utc_datetime(&at)),
            DatePattern::IsoDate | DatePattern::UsDate => {
                return self
                    .date(value, line, field)
                    .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
            }
        };
        parsed.ok_or_else(|| self.mismatch(value, line, field))
    }

    fn mismatch(self, value: &str, line: u64, field: &'static str) -> MapperError {
        MapperError::DateFormat {
            line,
            field,
            value: value.to_string(),
            pattern: self.describe(),
        }
    }
}

fn date_prefix(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_and_remainder(value, format)
        .ok()
        .map(|(date, _)| date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_date_ignores_trailing_text() {
        let date = DatePattern::IsoDate.date("1987-06-05T00:00", 2, "BIRTHDATE").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1987, 6, 5).unwrap());
    }

    #[test]
    fn iso_instant_converts_to_utc() {
        let at = DatePattern::IsoInstant
            .instant("2020-01-01T10:00:00-05:00", 2, "START")
            .unwrap();
        assert_eq!(at.to_rfc3339(), "2020-01-01T15:00:00+00:00");
    }

    #[test]
    fn us_timestamp_reads_meridiem() {
        let at = DatePattern::UsTimestamp
            .instant("03/14/2021 01:05:09 PM", 2, "DATE")
            .unwrap();
        assert_eq!(at.to_rfc3339(), "2021-03-14T13:05:09+00:00");
    }

    #[test]
    fn date_only_instant_is_midnight() {
        let at = DatePattern::UsDate.instant("12/31/1999", 2, "BIRTHDATE").unwrap();
        assert_eq!(at.to_rfc3339(), "1999-12-31T00:00:00+00:00");
    }

    #[test]
    fn mismatch_reports_line_and_pattern() {
        let err = DatePattern::IsoDate.date("05/06/1987", 7, "BIRTHDATE").unwrap_err();
        match err {
            MapperError::DateFormat {
                line,
                field,
                pattern,
                ..
            } => {
                assert_eq!(line, 7);
                assert_eq!(field, "BIRTHDATE");
                assert_eq!(pattern, "YYYY-MM-DD");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
