//! Time ranges and the partitioning rules used to slice a lookback window into
//! queries small enough for the price-history API.
//!
//! Partitions produced by [`Range::split`] and [`Range::days`] share their edges:
//! `parts[i].end == parts[i + 1].start`. An instant belongs to the part whose
//! `start <= t < end`, except the outer range's end instant, which belongs to the
//! final part. [`partition_index`] applies that rule.

use std::fmt;

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::error::{AppError, Result};

/// A closed span of time between two UTC instants, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Range {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(AppError::invalid_request(format!(
                "range start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    // Callers guarantee ordering.
    fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// The window from `days` days before `now` up to `now`.
    pub fn days_ago(now: DateTime<Utc>, days: u32) -> Result<Self> {
        let start = offset(now, -Duration::days(i64::from(days)))?;
        Ok(Self::between(start, now))
    }

    /// The calendar day (UTC) that `t` falls within, as `[midnight, next midnight]`.
    pub fn day_of(t: DateTime<Utc>) -> Result<Self> {
        let start = start_of_day(t);
        Ok(Self::between(start, offset(start, Duration::days(1))?))
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive on both ends.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    /// Move both edges by a whole number of days.
    pub fn shift_days(&self, days: i64) -> Result<Self> {
        let delta = Duration::try_days(days).ok_or_else(|| out_of_range(self.start))?;
        Ok(Self::between(
            offset(self.start, delta)?,
            offset(self.end, delta)?,
        ))
    }

    /// Split into consecutive chunks of at most `chunk`. The last chunk may be shorter
    /// and never extends past `end`. A non-positive `chunk` yields the whole range.
    pub fn split(&self, chunk: Duration) -> Vec<Range> {
        if self.is_empty() {
            return Vec::new();
        }
        if chunk <= Duration::zero() {
            return vec![*self];
        }

        let mut parts = Vec::new();
        let mut start = self.start;
        while self.contains(start) && start < self.end {
            // Past the representable calendar means past `end`.
            let end = start
                .checked_add_signed(chunk)
                .map_or(self.end, |next| next.min(self.end));
            parts.push(Range::between(start, end));
            start = end;
        }
        parts
    }

    /// Split on UTC midnights. The first and last parts are clamped to the range, so
    /// they may cover only part of a day.
    pub fn days(&self) -> Vec<Range> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut parts = Vec::new();
        let mut start = self.start;
        while self.contains(start) && start < self.end {
            let end = start_of_day(start)
                .checked_add_signed(Duration::days(1))
                .map_or(self.end, |next_midnight| next_midnight.min(self.end));
            parts.push(Range::between(start, end));
            start = end;
        }
        parts
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

/// Index of the part owning `t`, using the shared-edge rule described at module level.
pub fn partition_index(parts: &[Range], t: DateTime<Utc>) -> Option<usize> {
    let last = parts.len().checked_sub(1)?;
    parts.iter().enumerate().position(|(idx, part)| {
        part.start <= t && (t < part.end || (idx == last && t == part.end))
    })
}

pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn offset(t: DateTime<Utc>, delta: Duration) -> Result<DateTime<Utc>> {
    t.checked_add_signed(delta).ok_or_else(|| out_of_range(t))
}

fn out_of_range(t: DateTime<Utc>) -> AppError {
    AppError::invalid_request(format!(
        "time offset from {} leaves the supported calendar range",
        t.to_rfc3339()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    fn assert_exact_partition(outer: &Range, parts: &[Range], max: Duration) {
        assert!(!parts.is_empty());
        assert_eq!(parts[0].start(), outer.start());
        assert_eq!(parts[parts.len() - 1].end(), outer.end());
        for part in parts {
            assert!(part.duration() <= max, "{part} longer than {max}");
            assert!(!part.is_empty(), "zero-length part {part}");
        }
        for pair in parts.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start(), "gap or overlap at {}", pair[0]);
        }
    }

    #[test]
    fn contains_is_inclusive() {
        let range = Range::new(at(2009, 11, 10, 23), at(2009, 11, 17, 23)).unwrap();

        assert!(!range.contains(at(2009, 11, 22, 23)));
        assert!(range.contains(at(2009, 11, 14, 23)));
        assert!(range.contains(range.start()));
        assert!(range.contains(range.end()));
    }

    #[test]
    fn rejects_inverted_range() {
        let err = Range::new(at(2009, 11, 11, 0), at(2009, 11, 10, 0)).unwrap_err();
        assert!(err.to_string().contains("after end"), "unexpected error: {err}");
    }

    #[test]
    fn splits_into_hours() {
        let range = Range::new(at(2009, 11, 10, 10), at(2009, 11, 10, 20)).unwrap();
        let parts = range.split(Duration::hours(1));

        assert_eq!(parts.len(), 10);
        assert_exact_partition(&range, &parts, Duration::hours(1));
    }

    #[test]
    fn last_chunk_is_clamped() {
        let start = at(2024, 3, 1, 0);
        let range = Range::new(start, start + Duration::minutes(10 * 60 + 17)).unwrap();
        let parts = range.split(Duration::hours(4));

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].duration(), Duration::minutes(2 * 60 + 17));
        assert_exact_partition(&range, &parts, Duration::hours(4));
    }

    #[test]
    fn split_covers_every_instant_exactly_once() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 22, 13, 7).unwrap();
        let cases = [
            (Duration::hours(27), Duration::hours(4)),
            (Duration::minutes(59), Duration::minutes(60)),
            (Duration::days(3), Duration::minutes(37)),
            (Duration::seconds(5), Duration::seconds(1)),
        ];

        for (length, chunk) in cases {
            let range = Range::new(start, start + length).unwrap();
            let parts = range.split(chunk);
            assert_exact_partition(&range, &parts, chunk);

            let mut probe = range.start();
            while probe <= range.end() {
                let owners = parts
                    .iter()
                    .enumerate()
                    .filter(|(idx, part)| {
                        part.start() <= probe
                            && (probe < part.end()
                                || (*idx == parts.len() - 1 && probe == part.end()))
                    })
                    .count();
                assert_eq!(owners, 1, "{probe} owned by {owners} parts");
                assert!(partition_index(&parts, probe).is_some());
                probe += Duration::seconds(1).max(length / 97);
            }
            assert_eq!(partition_index(&parts, range.end()), Some(parts.len() - 1));
        }
    }

    #[test]
    fn split_of_degenerate_inputs() {
        let t = at(2024, 5, 5, 5);
        let empty = Range::new(t, t).unwrap();
        assert!(empty.split(Duration::hours(1)).is_empty());

        let range = Range::new(t, t + Duration::hours(3)).unwrap();
        assert_eq!(range.split(Duration::zero()), vec![range]);
    }

    #[test]
    fn aligned_days_yield_one_part_per_day() {
        let range = Range::new(at(2009, 11, 10, 0), at(2009, 11, 17, 0)).unwrap();
        let days = range.days();

        assert_eq!(days.len(), 7);
        for day in &days {
            assert_eq!(day.duration(), Duration::days(1));
            assert_eq!(*day, Range::day_of(day.start()).unwrap());
        }
    }

    #[test]
    fn unaligned_days_are_clamped_at_both_ends() {
        let range = Range::new(at(2009, 11, 10, 23), at(2009, 11, 17, 23)).unwrap();
        let days = range.days();

        assert_eq!(days.len(), 8);
        assert_eq!(days[0].duration(), Duration::hours(1));
        assert_eq!(days[7].duration(), Duration::hours(23));
        assert_exact_partition(&range, &days, Duration::days(1));
    }

    #[test]
    fn days_ago_and_shift() {
        let now = at(2024, 2, 29, 12);
        let window = Range::days_ago(now, 7).unwrap();

        assert_eq!(window.end(), now);
        assert_eq!(window.duration(), Duration::days(7));
        assert_eq!(window.shift_days(-1).unwrap().end(), at(2024, 2, 28, 12));
        assert_eq!(
            window.to_string(),
            "2024-02-22T12:00:00+00:00 - 2024-02-29T12:00:00+00:00"
        );
    }

    #[test]
    fn far_lookback_is_an_error_not_a_panic() {
        let err = Range::days_ago(at(2024, 2, 29, 12), u32::MAX).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let window = Range::days_ago(at(2024, 2, 29, 12), 1).unwrap();
        assert!(window.shift_days(i64::MAX).is_err());
        assert!(Range::day_of(DateTime::<Utc>::MAX_UTC).is_err());
    }

    #[test]
    fn oversized_chunks_clamp_to_the_range() {
        let range = Range::new(at(2024, 3, 1, 0), DateTime::<Utc>::MAX_UTC).unwrap();
        let parts = range.split(Duration::hours(i64::from(u32::MAX)));

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], range);

        let last = DateTime::<Utc>::MAX_UTC;
        let tail = Range::new(last - Duration::hours(30), last).unwrap();
        assert_eq!(tail.days().last().map(Range::end), Some(tail.end()));
    }
}
