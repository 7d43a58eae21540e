//! Resolution of raw timestamp tokens into absolute instants.
//!
//! Dumpsys output mixes several clock formats, some of which omit the year
//! or the whole date. Missing components are inferred from the previous
//! resolved timestamp of the same section, falling back to the device clock.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use thiserror::Error;

use super::config::{DeviceInfo, TimestampSettings};
use super::error::ConfigError;

/// Formats carrying a full date, tried in order.
const FULL_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A year-less token more than this far behind the previous timestamp is
/// assumed to have crossed New Year.
const YEAR_ROLLOVER_DAYS: i64 = 180;

/// A time-only token more than this far behind the previous timestamp is
/// assumed to have crossed midnight.
const DAY_ROLLOVER_HOURS: i64 = 12;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("unrecognized timestamp token: {0}")]
    Unrecognized(String),
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
}

/// Parses `UTC`, `Z`, `GMT`, `±HH:MM`, `±HHMM`, `±HH`, optionally prefixed by
/// `GMT` or `UTC`.
pub fn parse_timezone(tz: &str) -> Option<FixedOffset> {
    let tz = tz.trim();
    if matches!(tz, "UTC" | "Z" | "GMT" | "") {
        return Some(Utc.fix());
    }
    let rest = tz
        .strip_prefix("GMT")
        .or_else(|| tz.strip_prefix("UTC"))
        .unwrap_or(tz);
    let (sign, digits) = match rest.as_bytes().first()? {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = if digits.len() <= 2 {
        (digits.parse::<i32>().ok()?, 0)
    } else {
        let split = digits.len() - 2;
        (
            digits[..split].parse::<i32>().ok()?,
            digits[split..].parse::<i32>().ok()?,
        )
    };
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Rewrites `HH:MM:SS:mmm` (audio service style) into `HH:MM:SS.mmm`.
fn fix_millis_separator(token: &str) -> String {
    let time_start = token.rfind(' ').map_or(0, |i| i + 1);
    let time_part = &token[time_start..];
    if time_part.matches(':').count() == 3 {
        if let Some(last) = token.rfind(':') {
            let mut fixed = token.to_string();
            fixed.replace_range(last..=last, ".");
            return fixed;
        }
    }
    token.to_string()
}

/// Stateful normalizer; one instance per section so that inferred dates
/// follow that section's own clock.
#[derive(Debug, Clone)]
pub struct TimestampNormalizer {
    offset: FixedOffset,
    device_now: NaiveDateTime,
    settings: TimestampSettings,
    previous: Option<NaiveDateTime>,
}

impl TimestampNormalizer {
    pub fn new(device: &DeviceInfo, settings: TimestampSettings) -> Result<Self, ConfigError> {
        let offset = parse_timezone(&device.timezone)
            .ok_or_else(|| ConfigError::InvalidTimezone(device.timezone.clone()))?;
        let device_now = device
            .current_time
            .unwrap_or_else(Utc::now)
            .with_timezone(&offset)
            .naive_local();
        Ok(Self {
            offset,
            device_now,
            settings,
            previous: None,
        })
    }

    /// Forgets the previous timestamp, e.g. when entering a new section.
    pub const fn reset(&mut self) {
        self.previous = None;
    }

    /// Resolves a raw token into an absolute instant.
    pub fn normalize(&mut self, token: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
        let token = token.trim();
        let local = self.resolve_local(token)?;
        let resolved = self.finish(local)?;
        self.previous = Some(local);
        Ok(resolved)
    }

    fn finish(&self, local: NaiveDateTime) -> Result<DateTime<FixedOffset>, TimestampError> {
        let dt = self
            .offset
            .from_local_datetime(&local)
            .single()
            .ok_or_else(|| TimestampError::OutOfRange(local.to_string()))?;
        if self.settings.normalize_to_utc {
            Ok(dt.with_timezone(&Utc.fix()))
        } else {
            Ok(dt)
        }
    }

    fn resolve_local(&self, token: &str) -> Result<NaiveDateTime, TimestampError> {
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            return self.resolve_epoch(token);
        }

        let token = fix_millis_separator(token);
        for format in FULL_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&token, format) {
                return Ok(dt);
            }
        }

        let is_month_day = token.len() > 5 && token.as_bytes()[2] == b'-' && token.contains(' ');
        if is_month_day {
            return self.resolve_without_year(&token);
        }

        NaiveTime::parse_from_str(&token, "%H:%M:%S%.f")
            .map(|time| self.resolve_without_date(time))
            .map_err(|_| TimestampError::Unrecognized(token.clone()))
    }

    fn resolve_epoch(&self, token: &str) -> Result<NaiveDateTime, TimestampError> {
        let value: i64 = token
            .parse()
            .map_err(|_| TimestampError::OutOfRange(token.to_string()))?;
        let utc = match token.len() {
            13 => DateTime::from_timestamp_millis(value),
            10 => DateTime::from_timestamp(value, 0),
            _ => return Err(TimestampError::Unrecognized(token.to_string())),
        }
        .ok_or_else(|| TimestampError::OutOfRange(token.to_string()))?;
        Ok(utc.with_timezone(&self.offset).naive_local())
    }

    fn resolve_without_year(&self, token: &str) -> Result<NaiveDateTime, TimestampError> {
        let reference = self.previous.unwrap_or(self.device_now);
        let parse_in = |year: i32| {
            NaiveDateTime::parse_from_str(&format!("{year}-{token}"), FULL_FORMATS[0]).ok()
        };
        let mut candidate = parse_in(reference.year())
            .ok_or_else(|| TimestampError::Unrecognized(token.to_string()))?;

        if let Some(previous) = self.previous {
            if candidate < previous - Duration::days(YEAR_ROLLOVER_DAYS) {
                candidate = parse_in(reference.year() + 1).unwrap_or(candidate);
            }
        }
        // Nothing in the log can postdate the device clock.
        if candidate > self.device_now + Duration::days(1) {
            candidate = parse_in(candidate.year() - 1).unwrap_or(candidate);
        }
        Ok(candidate)
    }

    fn resolve_without_date(&self, time: NaiveTime) -> NaiveDateTime {
        let date: NaiveDate = self.previous.unwrap_or(self.device_now).date();
        let candidate = date.and_time(time);
        match self.previous {
            Some(previous)
                if self.settings.detect_day_rollover
                    && candidate < previous - Duration::hours(DAY_ROLLOVER_HOURS) =>
            {
                candidate + Duration::days(1)
            }
            _ => candidate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(tz: &str, now: &str) -> DeviceInfo {
        DeviceInfo {
            timezone: tz.to_string(),
            current_time: Some(DateTime::parse_from_rfc3339(now).unwrap().to_utc()),
            android_version: 14,
            manufacturer: "samsung".into(),
            model: "SM-S918N".into(),
        }
    }

    fn normalizer(tz: &str, now: &str) -> TimestampNormalizer {
        TimestampNormalizer::new(&device(tz, now), TimestampSettings::default()).unwrap()
    }

    #[test]
    fn parses_timezones() {
        assert_eq!(parse_timezone("UTC"), Some(Utc.fix()));
        assert_eq!(
            parse_timezone("+09:00"),
            FixedOffset::east_opt(9 * 3600)
        );
        assert_eq!(
            parse_timezone("GMT-05:30"),
            FixedOffset::east_opt(-(5 * 3600 + 30 * 60))
        );
        assert_eq!(parse_timezone("+0900"), FixedOffset::east_opt(9 * 3600));
        assert_eq!(parse_timezone("Asia/Seoul"), None);
        assert_eq!(parse_timezone("+25:00"), None);
    }

    #[test]
    fn invalid_device_timezone_is_config_error() {
        let result = TimestampNormalizer::new(
            &device("Mars/Olympus", "2025-01-20T00:00:00Z"),
            TimestampSettings::default(),
        );
        assert!(matches!(result, Err(ConfigError::InvalidTimezone(_))));
    }

    #[test]
    fn full_timestamp_uses_device_offset() {
        let mut n = normalizer("+09:00", "2025-01-20T00:00:00Z");
        let ts = n.normalize("2025-01-15 14:23:45.123").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-15T14:23:45.123+09:00");
    }

    #[test]
    fn utc_normalization_converts_offset() {
        let mut n = TimestampNormalizer::new(
            &device("+09:00", "2025-01-20T00:00:00Z"),
            TimestampSettings {
                normalize_to_utc: true,
                detect_day_rollover: true,
            },
        )
        .unwrap();
        let ts = n.normalize("2025-01-15 14:23:45").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-15T05:23:45+00:00");
    }

    #[test]
    fn audio_style_token_infers_year_from_device_clock() {
        let mut n = normalizer("UTC", "2025-01-20T00:00:00Z");
        let ts = n.normalize("01-15 14:23:45:123").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-15T14:23:45.123+00:00");
    }

    #[test]
    fn year_less_token_in_the_future_rolls_back_a_year() {
        let mut n = normalizer("UTC", "2025-01-05T00:00:00Z");
        let ts = n.normalize("12-30 23:59:00:000").unwrap();
        assert_eq!(ts.year(), 2024);
    }

    #[test]
    fn year_less_token_after_new_year_moves_forward() {
        let mut n = normalizer("UTC", "2025-01-05T00:00:00Z");
        assert_eq!(n.normalize("2024-12-31 23:59:00").unwrap().year(), 2024);
        let ts = n.normalize("01-01 00:00:10:000").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-01T00:00:10+00:00");
    }

    #[test]
    fn out_of_order_year_less_token_never_lands_after_device_clock() {
        let mut n = normalizer("UTC", "2025-01-05T00:00:00Z");
        n.normalize("01-01 00:00:10:000").unwrap();
        let ts = n.normalize("12-31 23:59:00:000").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-12-31T23:59:00+00:00");
    }

    #[test]
    fn time_only_token_detects_day_rollover() {
        let mut n = normalizer("UTC", "2025-01-20T00:00:00Z");
        n.normalize("2025-01-15 23:59:50").unwrap();
        let ts = n.normalize("00:00:05.000").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-16T00:00:05+00:00");
    }

    #[test]
    fn time_only_token_without_rollover_detection_keeps_date() {
        let mut n = TimestampNormalizer::new(
            &device("UTC", "2025-01-20T00:00:00Z"),
            TimestampSettings {
                normalize_to_utc: false,
                detect_day_rollover: false,
            },
        )
        .unwrap();
        n.normalize("2025-01-15 23:59:50").unwrap();
        let ts = n.normalize("00:00:05").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-15T00:00:05+00:00");
    }

    #[test]
    fn epoch_tokens_are_absolute() {
        let mut n = normalizer("+09:00", "2025-01-20T00:00:00Z");
        let ms = n.normalize("1736918625123").unwrap();
        assert_eq!(ms.to_utc().to_rfc3339(), "2025-01-15T05:23:45.123+00:00");
        let secs = n.normalize("1736918625").unwrap();
        assert_eq!(secs.offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let mut n = normalizer("UTC", "2025-01-20T00:00:00Z");
        assert!(matches!(
            n.normalize("yesterday"),
            Err(TimestampError::Unrecognized(_))
        ));
        assert!(n.previous.is_none());
    }
}
