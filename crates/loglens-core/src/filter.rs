//! Timestamp range filtering.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::AnalyzeError;

/// Inclusive `[from, to]` range test over entry timestamps.
///
/// Either bound may be open. The filter holds no state beyond its bounds and
/// is `Copy`, so workers each get their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    /// Earliest accepted timestamp.
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Latest accepted timestamp.
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl DateFilter {
    /// Create a filter from optional bounds.
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// A filter that accepts everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// True when at least one bound is set.
    pub fn is_enabled(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Check whether an entry falls inside the range.
    pub fn matches(&self, entry: &Entry) -> bool {
        self.matches_timestamp(entry.timestamp)
    }

    /// Check a bare timestamp.
    ///
    /// A missing timestamp orders before every bound: it fails a `from`
    /// bound and passes a `to` bound.
    pub fn matches_timestamp(&self, timestamp: Option<DateTime<Utc>>) -> bool {
        if let Some(from) = self.from {
            match timestamp {
                Some(ts) if ts >= from => {}
                _ => return false,
            }
        }
        if let (Some(to), Some(ts)) = (self.to, timestamp) {
            if ts > to {
                return false;
            }
        }
        true
    }
}

/// Which end of a range a date string describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Lower bound. A bare date means local midnight.
    From,
    /// Upper bound. A bare date means the last nanosecond of that local day.
    To,
}

/// Parse a user-supplied date bound.
///
/// Accepts RFC3339 verbatim, or `YYYY-MM-DD` interpreted in the local time
/// zone: `00:00:00` for [`Bound::From`] and `23:59:59.999999999` for
/// [`Bound::To`], so a single day given as both bounds covers the whole day.
pub fn parse_date_bound(input: &str, bound: Bound) -> Result<DateTime<Utc>, AnalyzeError> {
    let input = input.trim();
    let invalid = || AnalyzeError::InvalidDate {
        input: input.to_string(),
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())?;
    let naive = match bound {
        Bound::From => date.and_hms_opt(0, 0, 0),
        Bound::To => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
    }
    .ok_or_else(invalid)?;

    // Midnight can fall into a DST gap; take the earliest valid instant.
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(invalid)?;

    Ok(local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_disabled_matches_everything() {
        let filter = DateFilter::disabled();
        assert!(!filter.is_enabled());
        assert!(filter.matches_timestamp(None));
        assert!(filter.matches_timestamp(Some(ts("1970-01-01T00:00:00Z"))));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let from = ts("2024-01-01T00:00:00Z");
        let to = ts("2024-01-31T23:59:59Z");
        let filter = DateFilter::new(Some(from), Some(to));

        assert!(filter.is_enabled());
        assert!(filter.matches_timestamp(Some(from)));
        assert!(filter.matches_timestamp(Some(to)));
        assert!(!filter.matches_timestamp(Some(from - Duration::nanoseconds(1))));
        assert!(!filter.matches_timestamp(Some(to + Duration::nanoseconds(1))));
    }

    #[test]
    fn test_missing_timestamp() {
        let only_from = DateFilter::new(Some(ts("2024-01-01T00:00:00Z")), None);
        let only_to = DateFilter::new(None, Some(ts("2024-01-01T00:00:00Z")));

        assert!(!only_from.matches_timestamp(None));
        assert!(only_to.matches_timestamp(None));
    }

    #[test]
    fn test_widening_never_drops_matches() {
        let samples: Vec<DateTime<Utc>> = (0..48)
            .map(|h| ts("2024-03-01T00:00:00Z") + Duration::hours(h))
            .collect();
        let narrow = DateFilter::new(
            Some(ts("2024-03-01T06:00:00Z")),
            Some(ts("2024-03-01T18:00:00Z")),
        );
        let wider = [
            DateFilter::new(Some(ts("2024-03-01T00:00:00Z")), narrow.to),
            DateFilter::new(narrow.from, Some(ts("2024-03-02T12:00:00Z"))),
            DateFilter::new(None, narrow.to),
            DateFilter::new(narrow.from, None),
            DateFilter::disabled(),
        ];

        for sample in samples {
            if narrow.matches_timestamp(Some(sample)) {
                for filter in &wider {
                    assert!(filter.matches_timestamp(Some(sample)), "{sample} lost by {filter:?}");
                }
            }
        }
    }

    #[test]
    fn test_parse_rfc3339_verbatim() {
        let parsed = parse_date_bound("2024-01-02T10:30:00+02:00", Bound::To).unwrap();
        assert_eq!(parsed, ts("2024-01-02T08:30:00Z"));
    }

    #[test]
    fn test_parse_bare_date_bounds() {
        let from = parse_date_bound("2024-01-02", Bound::From).unwrap();
        let to = parse_date_bound("2024-01-02", Bound::To).unwrap();

        let local_from = from.with_timezone(&Local);
        let local_to = to.with_timezone(&Local);
        assert_eq!(local_from.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!((local_from.hour(), local_from.minute()), (0, 0));
        assert_eq!(local_to.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(
            (local_to.hour(), local_to.minute(), local_to.second()),
            (23, 59, 59)
        );
        assert_eq!(local_to.nanosecond(), 999_999_999);
    }

    #[test]
    fn test_same_day_covers_whole_day() {
        let filter = DateFilter::new(
            Some(parse_date_bound("2024-01-02", Bound::From).unwrap()),
            Some(parse_date_bound("2024-01-02", Bound::To).unwrap()),
        );
        let late = Local
            .with_ymd_and_hms(2024, 1, 2, 23, 59, 59)
            .unwrap()
            .with_timezone(&Utc);
        let next = Local
            .with_ymd_and_hms(2024, 1, 3, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);

        assert!(filter.matches_timestamp(Some(late)));
        assert!(!filter.matches_timestamp(Some(next)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_date_bound("yesterday", Bound::From),
            Err(AnalyzeError::InvalidDate { .. })
        ));
        assert!(parse_date_bound("2024-13-01", Bound::To).is_err());
    }
}
