use std::io;

use serde_json::Value;

use super::format::{
    bullet_section, date_field, hours_field, key_value_rows, string_list, text_field,
};

pub fn render_recurring_set(data: &Value) -> io::Result<String> {
    let template = data
        .get("template")
        .ok_or_else(|| io::Error::other("recurring set output requires a template"))?;
    let deleted = data.get("deleted").and_then(Value::as_array).map_or(0, Vec::len);

    let mut lines = vec![format!(
        "Recurring template `{}` saved ({}).",
        text_field(template, "name"),
        text_field(template, "id")
    )];
    lines.extend(key_value_rows(
        &[
            ("Rule:", text_field(data, "rrule").to_string()),
            ("Per occurrence:", hours_field(template, "time_allocation_hours")),
            ("Replaced:", format!("{deleted} record(s) from {}", text_field(data, "from_mode"))),
        ],
        2,
    ));
    lines.extend(bullet_section("Warnings", &string_list(data, "warnings")));
    lines.push(String::new());
    lines.push(format!(
        "Run `phaseplan recurring preview {}` to list the dates.",
        text_field(data, "project_id")
    ));
    Ok(lines.join("\n"))
}

pub fn render_recurring_preview(data: &Value) -> io::Result<String> {
    let occurrences = occurrence_rows(data)?;
    let template = data.get("template").cloned().unwrap_or(Value::Null);

    let mut lines = vec![format!(
        "`{}` repeats {} time(s): {}",
        text_field(&template, "name"),
        occurrences.len(),
        text_field(data, "rrule")
    )];
    lines.extend(occurrence_lines(&occurrences));
    lines.push(String::new());
    lines.extend(key_value_rows(
        &[
            ("Per occurrence:", hours_field(data, "hours_per_occurrence")),
            ("Projected:", hours_field(data, "projected_hours")),
        ],
        0,
    ));
    if let Some(check) = data.get("budget_check") {
        lines.extend(bullet_section("Budget", &string_list(check, "budget_conflicts")));
    }
    Ok(lines.join("\n"))
}

pub fn render_rule_check(data: &Value) -> io::Result<String> {
    let is_valid = data
        .get("is_valid")
        .and_then(Value::as_bool)
        .ok_or_else(|| io::Error::other("rule check output requires is_valid"))?;
    if is_valid {
        return Ok(format!(
            "Rule is valid.\n  Canonical:  {}",
            text_field(data, "normalized")
        ));
    }
    let mut lines = vec!["Rule is NOT valid.".to_string()];
    lines.extend(bullet_section("Errors", &string_list(data, "errors")));
    Ok(lines.join("\n"))
}

pub fn render_rule_expand(data: &Value) -> io::Result<String> {
    let is_valid = data.get("is_valid").and_then(Value::as_bool).unwrap_or(false);
    if !is_valid {
        let mut lines = vec!["Rule is NOT valid; nothing to expand.".to_string()];
        lines.extend(bullet_section("Errors", &string_list(data, "errors")));
        return Ok(lines.join("\n"));
    }

    let occurrences = occurrence_rows(data)?;
    let until = if data.get("end").is_some_and(|end| !end.is_null()) {
        date_field(data, "end")
    } else {
        "open end".to_string()
    };
    let mut lines = vec![format!(
        "{} occurrence(s) from {} to {until}:",
        occurrences.len(),
        date_field(data, "start")
    )];
    if occurrences.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(occurrence_lines(&occurrences));
    Ok(lines.join("\n"))
}

fn occurrence_rows(data: &Value) -> io::Result<Vec<Value>> {
    data.get("occurrences")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| io::Error::other("output requires occurrences"))
}

fn occurrence_lines(occurrences: &[Value]) -> Vec<String> {
    occurrences
        .iter()
        .map(|occurrence| {
            format!(
                "  {:>4}. {}",
                occurrence
                    .get("occurrence_number")
                    .and_then(Value::as_u64)
                    .unwrap_or(0),
                date_field(occurrence, "date")
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_recurring_preview, render_rule_check, render_rule_expand};

    #[test]
    fn preview_lists_numbered_dates() {
        let data = json!({
            "template": { "name": "Standup prep" },
            "rrule": "FREQ=WEEKLY;INTERVAL=1;BYDAY=MO",
            "occurrences": [
                { "date": "2026-01-05T00:00:00", "occurrence_number": 1 },
                { "date": "2026-01-12T00:00:00", "occurrence_number": 2 }
            ],
            "hours_per_occurrence": 2.0,
            "projected_hours": 4.0,
            "budget_check": { "can_schedule": true, "budget_conflicts": [] }
        });
        let rendered = render_recurring_preview(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("repeats 2 time(s)"));
            assert!(text.contains("     1. 2026-01-05"));
            assert!(text.contains("     2. 2026-01-12"));
            assert!(text.contains("4h"));
            assert!(!text.contains("Budget:"));
        }
    }

    #[test]
    fn rule_check_shows_canonical_or_errors() {
        let valid = render_rule_check(&json!({
            "is_valid": true,
            "normalized": "FREQ=DAILY;INTERVAL=1",
            "errors": []
        }));
        assert!(valid.is_ok());
        if let Ok(text) = valid {
            assert!(text.contains("FREQ=DAILY;INTERVAL=1"));
        }

        let invalid = render_rule_check(&json!({
            "is_valid": false,
            "normalized": null,
            "errors": ["FREQ `YEARLY` must be DAILY, WEEKLY, or MONTHLY."]
        }));
        assert!(invalid.is_ok());
        if let Ok(text) = invalid {
            assert!(text.contains("NOT valid"));
            assert!(text.contains("YEARLY"));
        }
    }

    #[test]
    fn empty_expansion_says_none() {
        let rendered = render_rule_expand(&json!({
            "is_valid": true,
            "errors": [],
            "start": "2026-01-01T00:00:00",
            "end": "2026-01-02T00:00:00",
            "occurrences": []
        }));
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("0 occurrence(s) from 2026-01-01 to 2026-01-02:"));
            assert!(text.contains("(none)"));
        }
    }
}
