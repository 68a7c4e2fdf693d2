use crate::commands::recurring::occurrence_views;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{RuleCheckData, RuleExpandData};
use crate::schedule::date::{format_iso_datetime, parse_iso_argument};
use crate::schedule::recurrence::{RecurrenceRule, expand as expand_rule};
use crate::{ClientError, ClientResult};

/// Structural check of rule text. Needs no plan store.
pub fn check(rule: &str) -> ClientResult<SuccessEnvelope> {
    let (is_valid, errors, normalized) = match RecurrenceRule::decode(rule) {
        Ok(parsed) => (true, Vec::new(), Some(parsed.encode())),
        Err(errors) => (false, errors, None),
    };
    success(
        "rule check",
        RuleCheckData {
            rule: rule.to_string(),
            is_valid,
            errors,
            normalized,
        },
    )
}

pub fn expand(rule: &str, start: &str, end: Option<&str>, max: Option<usize>) -> ClientResult<SuccessEnvelope> {
    let command = "rule expand";
    let start_date = parse_iso_argument(start, "--start", command)?;
    let end_date = end
        .map(|value| parse_iso_argument(value, "--end", command))
        .transpose()?;
    if let Some(end_date) = end_date
        && end_date < start_date
    {
        return Err(ClientError::invalid_argument_for_command(
            "`--end` must not be before `--start`.",
            Some(command),
        ));
    }
    if max == Some(0) {
        return Err(ClientError::invalid_argument_for_command(
            "`--max` must be at least 1.",
            Some(command),
        ));
    }

    let (is_valid, errors) = match RecurrenceRule::decode(rule) {
        Ok(_) => (true, Vec::new()),
        Err(errors) => (false, errors),
    };
    let occurrences = if is_valid {
        expand_rule(rule, start_date, end_date, max)
    } else {
        Vec::new()
    };

    success(
        command,
        RuleExpandData {
            rule: rule.to_string(),
            is_valid,
            errors,
            start: format_iso_datetime(&start_date),
            end: end_date.as_ref().map(format_iso_datetime),
            max,
            occurrences: occurrence_views(&occurrences),
        },
    )
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{check, expand};

    #[test]
    fn check_normalizes_valid_rules() {
        let result = check("freq=weekly;byday=MO");
        assert!(result.is_ok());
        if let Ok(envelope) = result {
            assert_eq!(envelope.data["is_valid"], Value::Bool(true));
            assert_eq!(
                envelope.data["normalized"],
                Value::String("FREQ=WEEKLY;INTERVAL=1;BYDAY=MO".to_string())
            );
        }
    }

    #[test]
    fn check_reports_errors_without_failing() {
        let result = check("FREQ=YEARLY");
        assert!(result.is_ok());
        if let Ok(envelope) = result {
            assert_eq!(envelope.data["is_valid"], Value::Bool(false));
            assert!(envelope.data["normalized"].is_null());
            assert!(envelope.data["errors"].as_array().is_some_and(|errors| !errors.is_empty()));
        }
    }

    #[test]
    fn expand_lists_weekly_mondays_in_window() {
        let result = expand(
            "FREQ=WEEKLY;INTERVAL=1;BYDAY=MO",
            "2025-01-01",
            Some("2025-01-31"),
            None,
        );
        assert!(result.is_ok());
        if let Ok(envelope) = result {
            let dates = envelope.data["occurrences"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item["date"].as_str().map(|date| date[..10].to_string()))
                        .collect::<Vec<String>>()
                })
                .unwrap_or_default();
            assert_eq!(dates, vec!["2025-01-06", "2025-01-13", "2025-01-20", "2025-01-27"]);
        }
    }

    #[test]
    fn expand_rejects_reversed_window() {
        let result = expand("FREQ=DAILY", "2025-02-01", Some("2025-01-01"), None);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "invalid_argument");
        }
    }
}
