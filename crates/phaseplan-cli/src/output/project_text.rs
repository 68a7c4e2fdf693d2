use std::io;

use serde_json::Value;

use super::format::{
    self, Align, Column, bullet_section, date_field, format_hours, hours_field, key_value_rows,
    string_list, text_field,
};
use super::phase_text::phase_table;

pub fn render_project(data: &Value) -> io::Result<String> {
    let project = data
        .get("project")
        .ok_or_else(|| io::Error::other("project output requires a project"))?;
    let mut lines = project_header(project, data);

    let phases = data
        .get("phases")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    lines.push(String::new());
    if phases.is_empty() {
        lines.push("No phases yet.".to_string());
        lines.push(format!(
            "Run `phaseplan phase split {}` or `phaseplan recurring set {} --help` to plan work.",
            text_field(project, "id"),
            text_field(project, "id")
        ));
    } else {
        lines.push("Phases:".to_string());
        lines.extend(phase_table(&phases));
    }

    if let Some(budget) = data.get("budget") {
        lines.extend(budget_lines(budget));
    }
    Ok(lines.join("\n"))
}

pub fn render_project_list(data: &Value) -> io::Result<String> {
    let projects = data
        .get("projects")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("project list output requires projects"))?;
    if projects.is_empty() {
        return Ok([
            "No projects yet.",
            "",
            "Run `phaseplan project create --help` to create one.",
        ]
        .join("\n"));
    }

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
            name: "Window",
            align: Align::Left,
        },
        Column {
            name: "Mode",
            align: Align::Left,
        },
        Column {
            name: "Allocated",
            align: Align::Right,
        },
    ];
    let rows = projects
        .iter()
        .map(|summary| {
            let project = summary.get("project").cloned().unwrap_or(Value::Null);
            vec![
                text_field(&project, "id").to_string(),
                text_field(&project, "name").to_string(),
                window(&project),
                text_field(summary, "mode").to_string(),
                format!(
                    "{} / {}",
                    hours_field(summary, "total_allocated"),
                    hours_field(&project, "estimated_hours")
                ),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![format!("Projects ({}):", projects.len())];
    lines.extend(format::render_table_or_blocks(
        &columns,
        &rows,
        format::terminal_width(),
        "Project",
    ));
    Ok(lines.join("\n"))
}

pub fn render_budget(data: &Value) -> io::Result<String> {
    let project = data
        .get("project")
        .ok_or_else(|| io::Error::other("budget output requires a project"))?;
    let analysis = data
        .get("analysis")
        .ok_or_else(|| io::Error::other("budget output requires an analysis"))?;

    let mut lines = project_header(project, data);
    lines.extend(budget_lines(analysis));

    if let Some(projection) = data.get("recurring_projection").filter(|value| !value.is_null()) {
        lines.push(String::new());
        lines.push("Recurring projection:".to_string());
        lines.extend(key_value_rows(
            &[
                ("Rule:", text_field(projection, "rrule").to_string()),
                (
                    "Occurrences:",
                    projection
                        .get("occurrence_count")
                        .and_then(Value::as_u64)
                        .unwrap_or(0)
                        .to_string(),
                ),
                ("Per occurrence:", hours_field(projection, "hours_per_occurrence")),
                ("Projected:", hours_field(projection, "projected_hours")),
            ],
            2,
        ));
    }
    Ok(lines.join("\n"))
}

fn project_header(project: &Value, data: &Value) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        text_field(project, "name"),
        text_field(project, "id")
    )];
    lines.extend(key_value_rows(
        &[
            ("Window:", window(project)),
            ("Estimate:", hours_field(project, "estimated_hours")),
            ("Mode:", text_field(data, "mode").to_string()),
        ],
        2,
    ));
    lines
}

fn window(project: &Value) -> String {
    let end = if project.get("continuous").and_then(Value::as_bool) == Some(true) {
        "ongoing".to_string()
    } else {
        date_field(project, "end_date")
    };
    format!("{} .. {end}", date_field(project, "start_date"))
}

fn budget_lines(analysis: &Value) -> Vec<String> {
    let utilization = analysis
        .get("utilization_percentage")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let mut lines = vec![String::new(), "Budget:".to_string()];
    let mut entries = vec![
        ("Allocated:", hours_field(analysis, "total_allocated")),
        ("Remaining:", hours_field(analysis, "remaining")),
        ("Utilization:", format!("{utilization:.1}%")),
    ];
    let overage = analysis.get("overage").and_then(Value::as_f64).unwrap_or(0.0);
    if overage > 0.0 {
        entries.push(("Over by:", format_hours(overage)));
    }
    lines.extend(key_value_rows(&entries, 2));
    lines.extend(bullet_section(
        "Recommendations",
        &string_list(analysis, "recommendations"),
    ));
    lines
}
