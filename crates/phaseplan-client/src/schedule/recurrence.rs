use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

use crate::schedule::date::days_in_month;
use crate::schedule::model::{
    CheckResult, MonthlyPatternKind, RecurrenceConfig, RecurrenceOccurrence, RecurrenceType,
};
use crate::schedule::policy::{SCHEDULING_POLICY_V1, SchedulingPolicy};
use crate::{ClientError, ClientResult};

const WEEKDAY_CODES: [(&str, Weekday); 7] = [
    ("SU", Weekday::Sun),
    ("MO", Weekday::Mon),
    ("TU", Weekday::Tue),
    ("WE", Weekday::Wed),
    ("TH", Weekday::Thu),
    ("FR", Weekday::Fri),
    ("SA", Weekday::Sat),
];

const SUPPORTED_KEYS: [&str; 6] = ["FREQ", "INTERVAL", "BYDAY", "BYMONTHDAY", "UNTIL", "COUNT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthlyRule {
    Date { day: u32 },
    /// `week` is a signed ordinal: 1..=5 from the start of the month,
    /// -1..=-5 from its end.
    Ordinal { week: i32, weekday: Weekday },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrencePattern {
    Daily,
    /// Empty `weekdays` repeats on the weekday of the start date.
    Weekly { weekdays: Vec<Weekday> },
    Monthly(MonthlyRule),
}

impl RecurrencePattern {
    const fn freq(&self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly { .. } => "WEEKLY",
            Self::Monthly(_) => "MONTHLY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub pattern: RecurrencePattern,
    pub interval: u32,
    pub until: Option<NaiveDateTime>,
    pub count: Option<usize>,
}

impl RecurrenceRule {
    pub fn encode(&self) -> String {
        let mut text = format!("FREQ={};INTERVAL={}", self.pattern.freq(), self.interval);
        match &self.pattern {
            RecurrencePattern::Daily => {}
            RecurrencePattern::Weekly { weekdays } => {
                if !weekdays.is_empty() {
                    let codes = weekdays
                        .iter()
                        .map(|weekday| weekday_code(*weekday))
                        .collect::<Vec<&str>>();
                    let _ = write!(text, ";BYDAY={}", codes.join(","));
                }
            }
            RecurrencePattern::Monthly(MonthlyRule::Date { day }) => {
                let _ = write!(text, ";BYMONTHDAY={day}");
            }
            RecurrencePattern::Monthly(MonthlyRule::Ordinal { week, weekday }) => {
                let _ = write!(text, ";BYDAY={week}{}", weekday_code(*weekday));
            }
        }
        if let Some(count) = self.count {
            let _ = write!(text, ";COUNT={count}");
        }
        if let Some(until) = self.until {
            let _ = write!(text, ";UNTIL={}", until.format("%Y%m%dT%H%M%S"));
        }
        text
    }

    /// Parses the supported RRULE subset, collecting every structural problem.
    pub fn decode(text: &str) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();
        let body = text.trim();
        let body = body.strip_prefix("RRULE:").unwrap_or(body);
        if body.is_empty() {
            return Err(vec!["Rule string is empty.".to_string()]);
        }

        let mut seen = BTreeSet::new();
        let mut freq = None;
        let mut interval = 1_u32;
        let mut by_day = None;
        let mut by_month_day = None;
        let mut until = None;
        let mut count = None;

        for part in body.split(';').filter(|part| !part.trim().is_empty()) {
            let Some((raw_key, raw_value)) = part.split_once('=') else {
                errors.push(format!("`{part}` is not a KEY=VALUE pair."));
                continue;
            };
            let key = raw_key.trim().to_ascii_uppercase();
            let value = raw_value.trim();
            if !SUPPORTED_KEYS.contains(&key.as_str()) {
                errors.push(format!("`{key}` is not a supported rule part."));
                continue;
            }
            if !seen.insert(key.clone()) {
                errors.push(format!("`{key}` appears more than once."));
                continue;
            }
            match key.as_str() {
                "FREQ" => match value.to_ascii_uppercase().as_str() {
                    "DAILY" | "WEEKLY" | "MONTHLY" => freq = Some(value.to_ascii_uppercase()),
                    _ => errors.push(format!("FREQ `{value}` must be DAILY, WEEKLY, or MONTHLY.")),
                },
                "INTERVAL" => match value.parse::<u32>() {
                    Ok(parsed) if parsed >= 1 => interval = parsed,
                    _ => errors.push(format!("INTERVAL `{value}` must be a positive integer.")),
                },
                "BYDAY" => match parse_by_day(value) {
                    Ok(parsed) => by_day = Some(parsed),
                    Err(message) => errors.push(message),
                },
                "BYMONTHDAY" => match value.parse::<u32>() {
                    Ok(parsed) if (1..=31).contains(&parsed) => by_month_day = Some(parsed),
                    _ => errors.push(format!("BYMONTHDAY `{value}` must be between 1 and 31.")),
                },
                "UNTIL" => match parse_until(value) {
                    Some(parsed) => until = Some(parsed),
                    None => errors.push(format!(
                        "UNTIL `{value}` must use YYYYMMDD or YYYYMMDDTHHMMSS format."
                    )),
                },
                "COUNT" => match value.parse::<usize>() {
                    Ok(parsed) if parsed >= 1 => count = Some(parsed),
                    _ => errors.push(format!("COUNT `{value}` must be a positive integer.")),
                },
                _ => {}
            }
        }

        let pattern = match freq.as_deref() {
            None => {
                if !seen.contains("FREQ") {
                    errors.push("FREQ is required.".to_string());
                }
                None
            }
            Some("DAILY") => {
                if seen.contains("BYDAY") || seen.contains("BYMONTHDAY") {
                    errors.push("FREQ=DAILY does not take BYDAY or BYMONTHDAY.".to_string());
                }
                Some(RecurrencePattern::Daily)
            }
            Some("WEEKLY") => {
                if seen.contains("BYMONTHDAY") {
                    errors.push("FREQ=WEEKLY does not take BYMONTHDAY.".to_string());
                }
                let entries = by_day.unwrap_or_default();
                if entries.iter().any(|(ordinal, _)| ordinal.is_some()) {
                    errors.push("FREQ=WEEKLY BYDAY entries cannot carry an ordinal.".to_string());
                }
                let mut weekdays = entries
                    .into_iter()
                    .map(|(_, weekday)| weekday)
                    .collect::<Vec<Weekday>>();
                weekdays.sort_by_key(|weekday| weekday.num_days_from_monday());
                weekdays.dedup();
                Some(RecurrencePattern::Weekly { weekdays })
            }
            Some(_) => monthly_pattern(by_day, by_month_day, &seen, &mut errors),
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        match pattern {
            Some(pattern) => Ok(Self {
                pattern,
                interval,
                until,
                count,
            }),
            None => Err(vec!["Rule has no usable frequency.".to_string()]),
        }
    }
}

fn monthly_pattern(
    by_day: Option<Vec<(Option<i32>, Weekday)>>,
    by_month_day: Option<u32>,
    seen: &BTreeSet<String>,
    errors: &mut Vec<String>,
) -> Option<RecurrencePattern> {
    if seen.contains("BYDAY") && seen.contains("BYMONTHDAY") {
        errors.push("FREQ=MONTHLY takes BYDAY or BYMONTHDAY, not both.".to_string());
        return None;
    }
    if let Some(day) = by_month_day {
        return Some(RecurrencePattern::Monthly(MonthlyRule::Date { day }));
    }
    match by_day.as_deref() {
        Some([(Some(week), weekday)]) => Some(RecurrencePattern::Monthly(MonthlyRule::Ordinal {
            week: *week,
            weekday: *weekday,
        })),
        Some([(None, _)]) => {
            errors.push("FREQ=MONTHLY BYDAY needs an ordinal such as 2MO or -1FR.".to_string());
            None
        }
        Some(_) => {
            errors.push("FREQ=MONTHLY BYDAY supports exactly one ordinal weekday.".to_string());
            None
        }
        None => {
            if !seen.contains("BYDAY") && !seen.contains("BYMONTHDAY") {
                errors.push("FREQ=MONTHLY requires BYMONTHDAY or BYDAY.".to_string());
            }
            None
        }
    }
}

fn parse_by_day(value: &str) -> Result<Vec<(Option<i32>, Weekday)>, String> {
    let mut parsed = Vec::new();
    for entry in value.split(',') {
        let entry = entry.trim().to_ascii_uppercase();
        // Cut before the last two chars, not bytes; entries may hold non-ASCII.
        let Some((code_start, _)) = entry.char_indices().rev().nth(1) else {
            return Err(format!("BYDAY entry `{entry}` is not a weekday code."));
        };
        let (ordinal_text, code) = entry.split_at(code_start);
        let Some(weekday) = weekday_from_code(code) else {
            return Err(format!("BYDAY entry `{entry}` is not a weekday code."));
        };
        let ordinal = if ordinal_text.is_empty() {
            None
        } else {
            match ordinal_text.parse::<i32>() {
                Ok(week) if week != 0 && (-5..=5).contains(&week) => Some(week),
                _ => {
                    return Err(format!(
                        "BYDAY ordinal in `{entry}` must be between -5 and 5, excluding 0."
                    ));
                }
            }
        };
        parsed.push((ordinal, weekday));
    }
    Ok(parsed)
}

fn parse_until(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.strip_suffix('Z').unwrap_or(value);
    if trimmed.len() == 8 {
        return NaiveDate::parse_from_str(trimmed, "%Y%m%d")
            .ok()
            .and_then(|date| date.and_hms_opt(23, 59, 59));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S").ok()
}

pub fn weekday_code(weekday: Weekday) -> &'static str {
    WEEKDAY_CODES
        .iter()
        .find(|(_, candidate)| *candidate == weekday)
        .map_or("MO", |(code, _)| *code)
}

fn weekday_from_code(code: &str) -> Option<Weekday> {
    WEEKDAY_CODES
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, weekday)| *weekday)
}

/// Maps a 0 = Sunday .. 6 = Saturday index to a weekday.
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    WEEKDAY_CODES.get(usize::from(index)).map(|(_, weekday)| *weekday)
}

/// Canonical rule text for a recurrence config.
///
/// A config that already carries a decodable `rrule` gets it back
/// unchanged. Missing weekday or month-day fields fall back to the start
/// date, like a DTSTART-anchored RRULE.
pub fn build_rule(
    config: &RecurrenceConfig,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
    continuous: bool,
) -> ClientResult<String> {
    if let Some(existing) = config.rrule.as_deref()
        && RecurrenceRule::decode(existing).is_ok()
    {
        return Ok(existing.to_string());
    }

    if config.interval < 1 {
        return Err(ClientError::invalid_recurrence(vec![
            "Interval must be at least 1.".to_string(),
        ]));
    }

    let pattern = match &config.kind {
        RecurrenceType::Daily => RecurrencePattern::Daily,
        RecurrenceType::Weekly => {
            let weekday = match config.weekly_day_of_week {
                Some(index) => weekday_from_index(index).ok_or_else(|| {
                    ClientError::invalid_recurrence(vec![format!(
                        "Weekly day of week `{index}` must be between 0 and 6."
                    )])
                })?,
                None => start.weekday(),
            };
            RecurrencePattern::Weekly {
                weekdays: vec![weekday],
            }
        }
        RecurrenceType::Monthly => RecurrencePattern::Monthly(monthly_rule(config, start)?),
        RecurrenceType::Unsupported(kind) => {
            return Err(ClientError::invalid_recurrence(vec![format!(
                "Recurrence type `{kind}` must be daily, weekly, or monthly."
            )]));
        }
    };

    let until = if continuous {
        None
    } else {
        end.and_then(|value| value.date().and_hms_opt(23, 59, 59))
    };

    Ok(RecurrenceRule {
        pattern,
        interval: config.interval,
        until,
        count: None,
    }
    .encode())
}

fn monthly_rule(config: &RecurrenceConfig, start: NaiveDateTime) -> ClientResult<MonthlyRule> {
    match config.monthly_pattern.as_ref() {
        Some(MonthlyPatternKind::DayOfWeek) => {
            let week = match config.monthly_week_of_month {
                Some(week @ 1..=5) => i32::from(week),
                Some(other) => {
                    return Err(ClientError::invalid_recurrence(vec![format!(
                        "Monthly week of month `{other}` must be between 1 and 5."
                    )]));
                }
                None => i32::try_from((start.day() - 1) / 7 + 1).unwrap_or(1),
            };
            let weekday = match config.monthly_day_of_week {
                Some(index) => weekday_from_index(index).ok_or_else(|| {
                    ClientError::invalid_recurrence(vec![format!(
                        "Monthly day of week `{index}` must be between 0 and 6."
                    )])
                })?,
                None => start.weekday(),
            };
            Ok(MonthlyRule::Ordinal { week, weekday })
        }
        Some(MonthlyPatternKind::Date) | None => {
            let day = match config.monthly_date {
                Some(day @ 1..=31) => u32::from(day),
                Some(other) => {
                    return Err(ClientError::invalid_recurrence(vec![format!(
                        "Monthly date `{other}` must be between 1 and 31."
                    )]));
                }
                None => start.day(),
            };
            Ok(MonthlyRule::Date { day })
        }
        Some(MonthlyPatternKind::Unsupported(pattern)) => {
            Err(ClientError::invalid_recurrence(vec![format!(
                "Monthly pattern `{pattern}` must be `date` or `dayOfWeek`."
            )]))
        }
    }
}

/// Expands rule text into concrete occurrences starting at `start`.
///
/// Stops at `end` (inclusive), the rule's own UNTIL/COUNT, and after
/// `max_occurrences` results. Unparseable text yields no occurrences.
pub fn expand(
    rule_text: &str,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
    max_occurrences: Option<usize>,
) -> Vec<RecurrenceOccurrence> {
    expand_with_policy(rule_text, start, end, max_occurrences, SCHEDULING_POLICY_V1)
}

fn expand_with_policy(
    rule_text: &str,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
    max_occurrences: Option<usize>,
    policy: SchedulingPolicy,
) -> Vec<RecurrenceOccurrence> {
    let rule = match RecurrenceRule::decode(rule_text) {
        Ok(rule) => rule,
        Err(errors) => {
            tracing::warn!(rule = rule_text, ?errors, "skipping expansion of malformed rule");
            return Vec::new();
        }
    };

    let unbounded =
        end.is_none() && rule.until.is_none() && rule.count.is_none() && max_occurrences.is_none();
    let mut limit = max_occurrences.unwrap_or(usize::MAX);
    if let Some(count) = rule.count {
        limit = limit.min(count);
    }
    if unbounded {
        limit = policy.default_max_occurrences;
    }
    let upper = match (end, rule.until) {
        (Some(end), Some(until)) => Some(end.min(until)),
        (bound, None) | (None, bound) => bound,
    };

    let mut occurrences = Vec::new();
    if limit == 0 {
        return occurrences;
    }

    let first_day = start.date();
    let time = start.time();
    let mut period = 0usize;
    let mut idle_periods = 0usize;
    'periods: loop {
        if idle_periods >= policy.max_scanned_periods {
            tracing::warn!(rule = rule_text, idle_periods, "stopped scanning a rule with no matches");
            break;
        }
        let Some((period_start, candidates)) = period_candidates(&rule, first_day, period) else {
            break;
        };
        period += 1;
        let matched_before = occurrences.len();
        if let Some(bound) = upper
            && period_start.and_time(time) > bound
        {
            break;
        }
        for day in candidates {
            if day < first_day {
                continue;
            }
            let date = day.and_time(time);
            if let Some(bound) = upper
                && date > bound
            {
                break 'periods;
            }
            occurrences.push(RecurrenceOccurrence {
                date,
                occurrence_number: occurrences.len() + 1,
            });
            if occurrences.len() >= limit {
                break 'periods;
            }
        }
        if occurrences.len() == matched_before {
            idle_periods += 1;
        } else {
            idle_periods = 0;
        }
    }

    tracing::debug!(
        rule = rule_text,
        generated = occurrences.len(),
        "expanded recurrence rule"
    );
    occurrences
}

/// First day of the rule's `period`-th interval and the days it matches
/// there, ascending. `None` once the calendar range is exhausted.
fn period_candidates(
    rule: &RecurrenceRule,
    first_day: NaiveDate,
    period: usize,
) -> Option<(NaiveDate, Vec<NaiveDate>)> {
    let step = i64::try_from(period)
        .ok()?
        .checked_mul(i64::from(rule.interval))?;
    match &rule.pattern {
        RecurrencePattern::Daily => {
            let day = offset_days(first_day, step)?;
            Some((day, vec![day]))
        }
        RecurrencePattern::Weekly { weekdays } => {
            let week_start = offset_days(
                first_day,
                -i64::from(first_day.weekday().num_days_from_monday()),
            )?;
            let base = offset_days(week_start, step.checked_mul(7)?)?;
            let days = if weekdays.is_empty() {
                vec![first_day.weekday()]
            } else {
                weekdays.clone()
            };
            let candidates = days
                .iter()
                .map(|weekday| offset_days(base, i64::from(weekday.num_days_from_monday())))
                .collect::<Option<Vec<NaiveDate>>>()?;
            Some((base, candidates))
        }
        RecurrencePattern::Monthly(monthly) => {
            let month_index = i64::from(first_day.year()) * 12
                + i64::from(first_day.month0())
                + step;
            let year = i32::try_from(month_index.div_euclid(12)).ok()?;
            let month = u32::try_from(month_index.rem_euclid(12)).ok()? + 1;
            let month_start = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some((
                month_start,
                monthly_day(*monthly, year, month).into_iter().collect(),
            ))
        }
    }
}

fn monthly_day(rule: MonthlyRule, year: i32, month: u32) -> Option<NaiveDate> {
    let length = days_in_month(year, month);
    match rule {
        MonthlyRule::Date { day } => {
            if day > length {
                return None;
            }
            NaiveDate::from_ymd_opt(year, month, day)
        }
        MonthlyRule::Ordinal { week, weekday } => {
            if week > 0 {
                let first = NaiveDate::from_ymd_opt(year, month, 1)?;
                let lead = (7 + weekday.num_days_from_monday()
                    - first.weekday().num_days_from_monday())
                    % 7;
                let day = 1 + lead + u32::try_from(week - 1).ok()? * 7;
                if day > length {
                    return None;
                }
                NaiveDate::from_ymd_opt(year, month, day)
            } else {
                let last = NaiveDate::from_ymd_opt(year, month, length)?;
                let trail = (7 + last.weekday().num_days_from_monday()
                    - weekday.num_days_from_monday())
                    % 7;
                let back = trail + u32::try_from(-week - 1).ok()? * 7;
                if back >= length {
                    return None;
                }
                NaiveDate::from_ymd_opt(year, month, length - back)
            }
        }
    }
}

fn offset_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let magnitude = chrono::Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    }
}

pub fn validate_rule(rule_text: &str) -> CheckResult {
    match RecurrenceRule::decode(rule_text) {
        Ok(_) => CheckResult::valid(),
        Err(errors) => CheckResult::from_errors(errors),
    }
}

/// Business check of a recurrence config. Non-recurring phases always pass.
pub fn validate_config(
    is_recurring: bool,
    config: Option<&RecurrenceConfig>,
    time_allocation_hours: f64,
) -> CheckResult {
    if !is_recurring {
        return CheckResult::valid();
    }
    let Some(config) = config else {
        return CheckResult::from_errors(vec![
            "Recurring phases require a recurrence configuration.".to_string(),
        ]);
    };

    let mut errors = Vec::new();
    if config.interval < 1 {
        errors.push("Interval must be at least 1.".to_string());
    }
    match &config.kind {
        RecurrenceType::Daily => {}
        RecurrenceType::Weekly => match config.weekly_day_of_week {
            None => errors.push("Weekly recurrence requires a day of week.".to_string()),
            Some(day) if day > 6 => {
                errors.push(format!("Weekly day of week `{day}` must be between 0 and 6."));
            }
            Some(_) => {}
        },
        RecurrenceType::Monthly => validate_monthly(config, &mut errors),
        RecurrenceType::Unsupported(kind) => errors.push(format!(
            "Recurrence type `{kind}` must be daily, weekly, or monthly."
        )),
    }
    if time_allocation_hours.is_nan() || time_allocation_hours <= 0.0 {
        errors.push("Hours per occurrence must be greater than 0.".to_string());
    }

    CheckResult::from_errors(errors)
}

fn validate_monthly(config: &RecurrenceConfig, errors: &mut Vec<String>) {
    match config.monthly_pattern.as_ref() {
        None => errors.push("Monthly recurrence requires a pattern (`date` or `dayOfWeek`).".to_string()),
        Some(MonthlyPatternKind::Date) => match config.monthly_date {
            None => errors.push("Monthly date pattern requires a day of month.".to_string()),
            Some(day) if !(1..=31).contains(&day) => {
                errors.push(format!("Monthly date `{day}` must be between 1 and 31."));
            }
            Some(_) => {}
        },
        Some(MonthlyPatternKind::DayOfWeek) => {
            match config.monthly_week_of_month {
                None => errors.push("Monthly day-of-week pattern requires a week of month.".to_string()),
                Some(week) if !(1..=5).contains(&week) => {
                    errors.push(format!("Monthly week of month `{week}` must be between 1 and 5."));
                }
                Some(_) => {}
            }
            match config.monthly_day_of_week {
                None => errors.push("Monthly day-of-week pattern requires a day of week.".to_string()),
                Some(day) if day > 6 => {
                    errors.push(format!("Monthly day of week `{day}` must be between 0 and 6."));
                }
                Some(_) => {}
            }
        }
        Some(MonthlyPatternKind::Unsupported(pattern)) => errors.push(format!(
            "Monthly pattern `{pattern}` must be `date` or `dayOfWeek`."
        )),
    }
}
