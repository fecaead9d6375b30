use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::models::EventTime;

/// Days before "now" that bound the short activity window.
pub const RECENT_WINDOW_DAYS: i64 = 30;
/// Days before "now" that bound the long activity window.
pub const EXTENDED_WINDOW_DAYS: i64 = 90;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimestampParser ───────────────────────────────────────────────────────────

/// Parses the `created_at` strings found in audit-log exports.
pub struct TimestampParser;

impl TimestampParser {
    /// Parse an ISO-8601 style string into a UTC [`DateTime`].
    ///
    /// Accepts RFC 3339 (with `Z` or an offset), RFC 2822, and the common
    /// offset-less patterns, which are read as UTC. Returns `None` for empty
    /// or unrecognised input.
    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f%:z",
            "%Y/%m/%d %H:%M:%S",
            "%m/%d/%Y %H:%M:%S",
        ];

        for fmt in FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
        for fmt in DATE_FORMATS {
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, fmt) {
                let naive = date.and_hms_opt(0, 0, 0)?;
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        debug!("TimestampParser: could not parse timestamp \"{}\"", s);
        None
    }
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Resolves IANA timezone names used for day/hour bucketing.
pub struct TimezoneHandler {
    default_tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for `tz_name`.
    ///
    /// If `tz_name` is not a recognised IANA timezone, falls back to UTC
    /// and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { default_tz: tz }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn default_tz(&self) -> Tz {
        self.default_tz
    }
}

// ── AnalysisClock ─────────────────────────────────────────────────────────────

/// The "now" every aggregator measures activity windows against.
///
/// Built once per analysis run and passed explicitly, so the 30- and 90-day
/// anchors are identical across all reports of that run and tests can pin
/// the clock to a fixed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisClock {
    now: DateTime<Utc>,
    thirty_days_ago: DateTime<Utc>,
    ninety_days_ago: DateTime<Utc>,
    timezone: Tz,
}

impl AnalysisClock {
    /// Clock pinned at `now`, bucketing days and hours in `timezone`.
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            now,
            thirty_days_ago: now - Duration::days(RECENT_WINDOW_DAYS),
            ninety_days_ago: now - Duration::days(EXTENDED_WINDOW_DAYS),
            timezone,
        }
    }

    /// Clock pinned at `now`, bucketing in UTC.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self::new(now, Tz::UTC)
    }

    /// Clock reading the current wall-clock time.
    pub fn system(timezone: Tz) -> Self {
        Self::new(Utc::now(), timezone)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn thirty_days_ago(&self) -> DateTime<Utc> {
        self.thirty_days_ago
    }

    pub fn ninety_days_ago(&self) -> DateTime<Utc> {
        self.ninety_days_ago
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Strictly after the 30-day anchor.
    pub fn active_in_last_30_days(&self, ts: &EventTime) -> bool {
        ts.is_after(self.thirty_days_ago)
    }

    /// Strictly after the 90-day anchor.
    pub fn active_in_last_90_days(&self, ts: &EventTime) -> bool {
        ts.is_after(self.ninety_days_ago)
    }

    /// `YYYY-MM-DD` of `ts` in the clock's timezone; `None` when invalid.
    pub fn day_key(&self, ts: &EventTime) -> Option<String> {
        ts.as_datetime().map(|dt| {
            dt.with_timezone(&self.timezone)
                .format("%Y-%m-%d")
                .to_string()
        })
    }

    /// Hour of day (0–23) of `ts` in the clock's timezone; `None` when invalid.
    pub fn hour_of_day(&self, ts: &EventTime) -> Option<u32> {
        ts.as_datetime()
            .map(|dt| dt.with_timezone(&self.timezone).hour())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    // ── TimestampParser ──────────────────────────────────────────────────────

    #[test]
    fn test_parse_z_suffix() {
        let dt = TimestampParser::parse("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt, utc(2024, 1, 15, 10, 30));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let dt = TimestampParser::parse("2024-01-15T10:30:00.123Z").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_parse_with_offset() {
        let dt = TimestampParser::parse("2024-01-15T12:00:00+02:00").unwrap();
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_parse_space_separated_naive_is_utc() {
        let dt = TimestampParser::parse("2024-01-15 08:15:00").unwrap();
        assert_eq!(dt, utc(2024, 1, 15, 8, 15));
    }

    #[test]
    fn test_parse_date_only() {
        let dt = TimestampParser::parse("2024-03-01").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2024, 3, 1, 0));
    }

    #[test]
    fn test_parse_rfc2822() {
        let dt = TimestampParser::parse("Mon, 15 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt, utc(2024, 1, 15, 10, 0));
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert!(TimestampParser::parse("").is_none());
        assert!(TimestampParser::parse("   ").is_none());
        assert!(TimestampParser::parse("not-a-date").is_none());
    }

    // ── TimezoneHandler ──────────────────────────────────────────────────────

    #[test]
    fn test_validate_timezone() {
        assert!(TimezoneHandler::validate_timezone("Europe/Berlin"));
        assert!(TimezoneHandler::validate_timezone("UTC"));
        assert!(!TimezoneHandler::validate_timezone("Mars/Olympus"));
    }

    #[test]
    fn test_new_invalid_timezone_falls_back_to_utc() {
        let handler = TimezoneHandler::new("Invalid/Timezone");
        assert_eq!(handler.default_tz(), Tz::UTC);
    }

    // ── AnalysisClock ────────────────────────────────────────────────────────

    #[test]
    fn test_clock_anchors() {
        let now = utc(2024, 6, 30, 12, 0);
        let clock = AnalysisClock::at(now);
        assert_eq!(clock.thirty_days_ago(), utc(2024, 5, 31, 12, 0));
        assert_eq!(clock.ninety_days_ago(), utc(2024, 4, 1, 12, 0));
    }

    #[test]
    fn test_clock_windows() {
        let clock = AnalysisClock::at(utc(2024, 6, 30, 12, 0));
        let recent = EventTime::Valid(utc(2024, 6, 20, 0, 0));
        let older = EventTime::Valid(utc(2024, 5, 1, 0, 0));
        let ancient = EventTime::Valid(utc(2023, 1, 1, 0, 0));

        assert!(clock.active_in_last_30_days(&recent));
        assert!(clock.active_in_last_90_days(&recent));
        assert!(!clock.active_in_last_30_days(&older));
        assert!(clock.active_in_last_90_days(&older));
        assert!(!clock.active_in_last_90_days(&ancient));
        assert!(!clock.active_in_last_90_days(&EventTime::Invalid));
    }

    #[test]
    fn test_clock_exact_anchor_is_outside_window() {
        let clock = AnalysisClock::at(utc(2024, 6, 30, 12, 0));
        let boundary = EventTime::Valid(clock.thirty_days_ago());
        assert!(!clock.active_in_last_30_days(&boundary));
    }

    #[test]
    fn test_clock_buckets_in_timezone() {
        let clock = AnalysisClock::new(utc(2024, 6, 30, 12, 0), Tz::Asia__Tokyo);
        let ts = EventTime::Valid(utc(2024, 6, 1, 20, 0));
        // 20:00 UTC is 05:00 the next day in Tokyo.
        assert_eq!(clock.day_key(&ts).as_deref(), Some("2024-06-02"));
        assert_eq!(clock.hour_of_day(&ts), Some(5));
    }

    #[test]
    fn test_clock_buckets_invalid_is_none() {
        let clock = AnalysisClock::at(utc(2024, 6, 30, 12, 0));
        assert!(clock.day_key(&EventTime::Invalid).is_none());
        assert!(clock.hour_of_day(&EventTime::Invalid).is_none());
    }

    // ── get_system_timezone ──────────────────────────────────────────────────

    #[test]
    fn test_get_system_timezone_returns_nonempty_string() {
        assert!(!get_system_timezone().is_empty());
    }
}
