use std::io;

use serde_json::Value;

use super::format::{
    self, Align, Column, bullet_section, date_field, hours_field, short_date, string_list,
    text_field,
};

pub(super) fn phase_table(phases: &[Value]) -> Vec<String> {
    let columns = [
        Column {
            name: "Id",
            align: Align::Left,
        },
        Column {
            name: "Name",
            align: Align::Left,
        },
        Column {
            name: "Kind",
            align: Align::Left,
        },
        Column {
            name: "Start",
            align: Align::Left,
        },
        Column {
            name: "End",
            align: Align::Left,
        },
        Column {
            name: "Days",
            align: Align::Right,
        },
        Column {
            name: "Hours",
            align: Align::Right,
        },
    ];
    let rows = phases
        .iter()
        .map(|phase| {
            vec![
                text_field(phase, "id").to_string(),
                text_field(phase, "name").to_string(),
                text_field(phase, "kind").to_string(),
                date_field(phase, "start_date"),
                date_field(phase, "end_date"),
                phase
                    .get("span_days")
                    .and_then(Value::as_i64)
                    .map(|days| days.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                hours_field(phase, "time_allocation_hours"),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    format::render_table_or_blocks(&columns, &rows, format::terminal_width(), "Phase")
}

pub fn render_phase_list(data: &Value) -> io::Result<String> {
    let phases = phase_rows(data)?;
    let project = data.get("project").cloned().unwrap_or(Value::Null);
    if phases.is_empty() {
        return Ok(format!(
            "{} has no phases.\n\nRun `phaseplan phase split {}` to create two phases.",
            text_field(&project, "name"),
            text_field(&project, "id")
        ));
    }

    let mut lines = vec![format!(
        "{} phases ({}):",
        text_field(&project, "name"),
        text_field(data, "mode")
    )];
    lines.extend(phase_table(&phases));
    Ok(lines.join("\n"))
}

pub fn render_phase_change(data: &Value) -> io::Result<String> {
    let phases = phase_rows(data)?;
    let created = count(data, "created");
    let updated = count(data, "updated");
    let deleted = count(data, "deleted");

    let action = text_field(data, "action");
    let mut lines = vec![format!(
        "Phase {action} applied: {created} created, {updated} updated, {deleted} deleted."
    )];
    if let Some(end) = data.get("project_end_extended_to").and_then(Value::as_str) {
        lines.push(format!("Project end extended to {}.", short_date(end)));
    }
    lines.push(String::new());
    if phases.is_empty() {
        lines.push("The project has no phases left.".to_string());
    } else {
        lines.push(format!("Phases ({}):", text_field(data, "mode")));
        lines.extend(phase_table(&phases));
    }
    lines.extend(bullet_section("Warnings", &string_list(data, "warnings")));
    Ok(lines.join("\n"))
}

pub fn render_repair(data: &Value) -> io::Result<String> {
    let repairs = data
        .get("repairs")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("phase repair output requires repairs"))?;
    let dry_run = data.get("dry_run").and_then(Value::as_bool).unwrap_or(false);

    let mut lines = Vec::new();
    if repairs.is_empty() {
        lines.push("No overlapping phases found.".to_string());
    } else {
        let verb = if dry_run { "Would move" } else { "Moved" };
        lines.push(format!("{verb} {} phase start(s):", repairs.len()));
        lines.extend(repairs.iter().map(|repair| {
            format!(
                "  {} ({}): {} -> {}",
                text_field(repair, "name"),
                text_field(repair, "phase_id"),
                date_field(repair, "previous_start_date"),
                date_field(repair, "start_date")
            )
        }));
        if dry_run {
            lines.push(String::new());
            lines.push("Dry run: nothing was written. Rerun without --dry-run to apply.".to_string());
        }
    }
    lines.extend(bullet_section(
        "Still invalid",
        &string_list(data, "remaining_errors"),
    ));
    Ok(lines.join("\n"))
}

pub fn render_validation(data: &Value) -> io::Result<String> {
    let is_valid = data
        .get("is_valid")
        .and_then(Value::as_bool)
        .ok_or_else(|| io::Error::other("phase validate output requires is_valid"))?;
    let mut lines = vec![if is_valid {
        format!("Phase set is valid ({}).", text_field(data, "mode"))
    } else {
        format!("Phase set is NOT valid ({}).", text_field(data, "mode"))
    }];
    lines.extend(bullet_section("Errors", &string_list(data, "errors")));
    lines.extend(bullet_section("Warnings", &string_list(data, "warnings")));
    if !is_valid {
        lines.push(String::new());
        lines.push(format!(
            "Run `phaseplan phase repair {}` to fix overlapping starts.",
            text_field(data, "project_id")
        ));
    }
    Ok(lines.join("\n"))
}

fn phase_rows(data: &Value) -> io::Result<Vec<Value>> {
    data.get("phases")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| io::Error::other("phase output requires phases"))
}

fn count(data: &Value, key: &str) -> usize {
    data.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_phase_change, render_repair, render_validation};

    #[test]
    fn change_summary_mentions_extension_and_warnings() {
        let data = json!({
            "action": "move",
            "mode": "split_phases",
            "created": [],
            "updated": [{}, {}],
            "deleted": [],
            "project_end_extended_to": "2026-02-04T00:00:00",
            "phases": [{
                "id": "ph_1",
                "name": "Phase 1",
                "kind": "phase",
                "start_date": "2026-01-01T00:00:00",
                "end_date": "2026-01-20T00:00:00",
                "span_days": 19,
                "time_allocation_hours": 40.0
            }],
            "warnings": ["2 day gap between `Phase 1` and `Phase 2`."]
        });
        let rendered = render_phase_change(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Phase move applied: 0 created, 2 updated, 0 deleted."));
            assert!(text.contains("Project end extended to 2026-02-04."));
            assert!(text.contains("Phase 1"));
            assert!(text.contains("  - 2 day gap"));
        }
    }

    #[test]
    fn dry_run_repair_says_nothing_was_written() {
        let data = json!({
            "dry_run": true,
            "repairs": [{
                "phase_id": "ph_b",
                "name": "Phase 2",
                "previous_start_date": "2026-01-10T00:00:00",
                "start_date": "2026-01-16T00:00:00"
            }],
            "remaining_errors": []
        });
        let rendered = render_repair(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("Would move 1 phase start(s):"));
            assert!(text.contains("2026-01-10 -> 2026-01-16"));
            assert!(text.contains("Dry run"));
        }
    }

    #[test]
    fn invalid_sets_point_at_repair() {
        let data = json!({
            "project_id": "prj_1",
            "mode": "split_phases",
            "is_valid": false,
            "errors": ["overlap"],
            "warnings": []
        });
        let rendered = render_validation(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("NOT valid"));
            assert!(text.contains("phaseplan phase repair prj_1"));
        }
    }
}
