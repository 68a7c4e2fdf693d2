mod error_text;
mod format;
mod json;
mod mode;
mod phase_text;
mod project_text;
mod recurring_text;

use std::io;

use phaseplan_client::{ClientError, SuccessEnvelope};

use crate::stdout_io::write_stdout_line;

pub use mode::{OutputMode, mode_for_command};

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Text => render_text_success(success)?,
        OutputMode::Json => json::render_success_json(success)?,
    };
    write_stdout_line(&body)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Json => json::render_error_json(error)?,
        OutputMode::Text => error_text::render_error(error),
    };
    write_stdout_line(&body)
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    let data = &success.data;
    match success.command.as_str() {
        "project create" | "project show" => project_text::render_project(data),
        "project list" => project_text::render_project_list(data),
        "budget" => project_text::render_budget(data),
        "phase list" => phase_text::render_phase_list(data),
        "phase split" | "phase add" | "phase move" | "phase delete" => {
            phase_text::render_phase_change(data)
        }
        "phase repair" => phase_text::render_repair(data),
        "phase validate" => phase_text::render_validation(data),
        "recurring set" => recurring_text::render_recurring_set(data),
        "recurring preview" => recurring_text::render_recurring_preview(data),
        "rule check" => recurring_text::render_rule_check(data),
        "rule expand" => recurring_text::render_rule_expand(data),
        _ => Err(io::Error::other(format!(
            "unsupported text output command `{}`",
            success.command
        ))),
    }
}
