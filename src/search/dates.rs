use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};

/// Date range of the `created:` and `updated:` qualifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRange {
    Day(NaiveDate),
    Range(NaiveDate, NaiveDate),
}

impl DateRange {
    /// Parse a date filter relative to `today`
    ///
    /// Accepts `today`, `yesterday`, `week`, `month`, `last-N`, `YYYY-MM-DD`
    /// and `YYYY-MM-DD..YYYY-MM-DD`. Returns `None` for anything else.
    pub fn parse(filter: &str, today: NaiveDate) -> Option<Self> {
        let filter = filter.trim().to_lowercase();

        match filter.as_str() {
            "today" => return Some(Self::Day(today)),
            "yesterday" => return today.pred_opt().map(Self::Day),
            "week" | "this-week" => {
                let offset = u64::from(today.weekday().num_days_from_monday());
                let start = today.checked_sub_days(Days::new(offset))?;
                return Some(Self::Range(start, start.checked_add_days(Days::new(6))?));
            },
            "month" | "this-month" => {
                let start = today.with_day(1)?;
                let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
                return Some(Self::Range(start, end));
            },
            _ => {},
        }

        // Ranges reaching before the first representable date are rejected
        if let Some(days) = filter.strip_prefix("last-") {
            let days = days.parse::<u64>().ok().filter(|d| *d > 0)?;
            let start = today.checked_sub_days(Days::new(days - 1))?;
            return Some(Self::Range(start, today));
        }

        if let Some((start, end)) = filter.split_once("..") {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").ok()?;
            return (start <= end).then_some(Self::Range(start, end));
        }

        NaiveDate::parse_from_str(&filter, "%Y-%m-%d").ok().map(Self::Day)
    }

    /// Check if a datetime falls within this range
    pub fn contains(&self, datetime: &DateTime<Utc>) -> bool {
        let date = datetime.date_naive();
        match self {
            DateRange::Day(day) => date == *day,
            DateRange::Range(start, end) => date >= *start && date <= *end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_relative_ranges() {
        // A Wednesday
        let today = date(2024, 2, 14);
        assert_eq!(DateRange::parse("today", today), Some(DateRange::Day(today)));
        assert_eq!(
            DateRange::parse("Yesterday", today),
            Some(DateRange::Day(date(2024, 2, 13)))
        );
        assert_eq!(
            DateRange::parse("week", today),
            Some(DateRange::Range(date(2024, 2, 12), date(2024, 2, 18)))
        );
        assert_eq!(
            DateRange::parse("month", today),
            Some(DateRange::Range(date(2024, 2, 1), date(2024, 2, 29)))
        );
        assert_eq!(
            DateRange::parse("last-7", today),
            Some(DateRange::Range(date(2024, 2, 8), today))
        );
    }

    #[test]
    fn test_absolute_ranges() {
        let today = date(2024, 2, 14);
        assert_eq!(
            DateRange::parse("2023-12-25", today),
            Some(DateRange::Day(date(2023, 12, 25)))
        );
        assert_eq!(
            DateRange::parse("2024-01-01..2024-01-31", today),
            Some(DateRange::Range(date(2024, 1, 1), date(2024, 1, 31)))
        );
    }

    #[test]
    fn test_invalid_filters() {
        let today = date(2024, 2, 14);
        assert_eq!(DateRange::parse("soon", today), None);
        assert_eq!(DateRange::parse("last-0", today), None);
        assert_eq!(DateRange::parse("last-x", today), None);
        assert_eq!(DateRange::parse("2024-02-30", today), None);
        assert_eq!(DateRange::parse("2024-02-01..2024-01-01", today), None);
    }

    #[test]
    fn test_out_of_range_filters() {
        let today = date(2024, 2, 14);
        assert_eq!(DateRange::parse("last-100000000", today), None);
        assert_eq!(DateRange::parse("last-18446744073709551615", today), None);
        assert_eq!(DateRange::parse("last-99999999999999999999", today), None);
        assert_eq!(DateRange::parse("yesterday", NaiveDate::MIN), None);
        assert_eq!(DateRange::parse("month", NaiveDate::MAX), None);
        assert_eq!(
            DateRange::parse("last-1", today),
            Some(DateRange::Range(today, today))
        );
    }

    #[test]
    fn test_contains() {
        let range = DateRange::Range(date(2024, 1, 1), date(2024, 1, 31));
        assert!(range.contains(&Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 0).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()));
        assert!(DateRange::Day(date(2024, 1, 1)).contains(&Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
    }
}
