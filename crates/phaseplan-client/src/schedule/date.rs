use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{ClientError, ClientResult};

pub fn normalize_to_midnight(value: NaiveDateTime) -> NaiveDateTime {
    value.date().and_time(NaiveTime::MIN)
}

/// Calendar day addition on the date component; the time of day is kept.
/// Saturates at the chrono range limits instead of panicking.
pub fn add_days(value: NaiveDateTime, days: i64) -> NaiveDateTime {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        value.checked_add_days(magnitude)
    } else {
        value.checked_sub_days(magnitude)
    };
    shifted.unwrap_or(if days >= 0 {
        NaiveDateTime::MAX
    } else {
        NaiveDateTime::MIN
    })
}

pub fn day_difference(left: NaiveDateTime, right: NaiveDateTime) -> i64 {
    signed_day_difference(left, right).abs()
}

/// Calendar days from `from` to `to`, negative when `to` is earlier.
pub fn signed_day_difference(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to.date() - from.date()).num_days()
}

pub fn ranges_overlap(
    start_a: NaiveDateTime,
    end_a: NaiveDateTime,
    start_b: NaiveDateTime,
    end_b: NaiveDateTime,
) -> bool {
    start_a <= end_b && end_a >= start_b
}

pub fn same_day(left: NaiveDateTime, right: NaiveDateTime) -> bool {
    left.date() == right.date()
}

pub fn format_iso_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_iso_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Accepts `YYYY-MM-DD` or an ISO-8601 date-time with optional fractional
/// seconds and a trailing `Z`.
pub fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    if trimmed.len() == 10 {
        return NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

pub fn parse_iso_argument(value: &str, field_name: &str, command: &str) -> ClientResult<NaiveDateTime> {
    parse_iso_datetime(value).ok_or_else(|| {
        ClientError::invalid_argument_for_command(
            &format!("`{field_name}` must be a real calendar date (YYYY-MM-DD or ISO-8601 date-time)."),
            Some(command),
        )
    })
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 31,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{
        add_days, day_difference, days_in_month, format_iso_datetime, normalize_to_midnight,
        parse_iso_datetime, ranges_overlap, signed_day_difference,
    };

    fn at(value: &str) -> NaiveDateTime {
        let parsed = parse_iso_datetime(value);
        assert!(parsed.is_some(), "unparseable fixture {value}");
        parsed.unwrap_or(NaiveDateTime::MIN)
    }

    #[test]
    fn normalizing_drops_time_of_day() {
        let value = at("2026-03-08T17:45:12");
        assert_eq!(format_iso_datetime(&normalize_to_midnight(value)), "2026-03-08T00:00:00");
    }

    #[test]
    fn add_days_rolls_over_month_and_year() {
        assert_eq!(format_iso_datetime(&add_days(at("2025-12-31"), 1)), "2026-01-01T00:00:00");
        assert_eq!(format_iso_datetime(&add_days(at("2026-03-01T09:30:00"), -1)), "2026-02-28T09:30:00");
    }

    #[test]
    fn add_days_lands_on_leap_day() {
        assert_eq!(format_iso_datetime(&add_days(at("2028-02-28"), 1)), "2028-02-29T00:00:00");
        assert_eq!(format_iso_datetime(&add_days(at("2028-02-29"), 1)), "2028-03-01T00:00:00");
    }

    #[test]
    fn day_difference_counts_calendar_days_across_leap_february() {
        assert_eq!(day_difference(at("2028-02-01"), at("2028-03-01")), 29);
        assert_eq!(day_difference(at("2026-02-01"), at("2026-03-01")), 28);
        assert_eq!(day_difference(at("2026-03-01T23:00:00"), at("2026-02-01T01:00:00")), 28);
        assert_eq!(signed_day_difference(at("2026-01-10"), at("2026-01-03")), -7);
    }

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        assert!(ranges_overlap(at("2026-01-01"), at("2026-01-10"), at("2026-01-10"), at("2026-01-20")));
        assert!(!ranges_overlap(at("2026-01-01"), at("2026-01-09"), at("2026-01-10"), at("2026-01-20")));
    }

    #[test]
    fn parse_accepts_date_and_datetime_forms() {
        assert!(parse_iso_datetime("2026-01-05").is_some());
        assert!(parse_iso_datetime("2026-01-05T08:00:00.000Z").is_some());
        assert!(parse_iso_datetime("2026-02-30").is_none());
        assert!(parse_iso_datetime("yesterday").is_none());
    }

    #[test]
    fn month_lengths_follow_leap_rules() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2100, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2026, 4), 30);
        assert!(NaiveDate::from_ymd_opt(2026, 4, 31).is_none());
    }
}
