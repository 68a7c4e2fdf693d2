use std::path::Path;

use chrono::NaiveDate;

use crate::contracts::types::{PhaseView, ProjectView};
use crate::schedule::date::format_iso_datetime;
use crate::schedule::model::{Phase, Project};
use crate::schedule::validator::{PhaseSetReport, validate_end_date_not_in_past};
use crate::setup::{ensure_initialized, ensure_initialized_at};
use crate::store::{PhaseRepository, SqliteRepository};
use crate::{ClientError, ClientResult};

/// Caller context shared by every stateful command.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandOptions<'a> {
    pub home_override: Option<&'a Path>,
    /// Local calendar day for past-date checks. Skipped when absent.
    pub today: Option<NaiveDate>,
}

impl<'a> CommandOptions<'a> {
    pub fn at_home(home: &'a Path) -> Self {
        Self {
            home_override: Some(home),
            today: None,
        }
    }
}

pub(crate) fn open_repository(home_override: Option<&Path>) -> ClientResult<SqliteRepository> {
    let setup = if let Some(home) = home_override {
        ensure_initialized_at(home)?
    } else {
        ensure_initialized()?
    };
    SqliteRepository::open(&setup.db_path)
}

pub(crate) fn load_project(repository: &impl PhaseRepository, project_id: &str) -> ClientResult<Project> {
    repository
        .get_project(project_id)?
        .ok_or_else(|| ClientError::project_not_found(project_id))
}

pub(crate) fn load_phase(repository: &impl PhaseRepository, phase_id: &str) -> ClientResult<Phase> {
    repository
        .get(phase_id)?
        .ok_or_else(|| ClientError::phase_not_found(phase_id))
}

pub(crate) fn parse_hours(value: f64, field_name: &str, command: &str) -> ClientResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(ClientError::invalid_argument_for_command(
            &format!("`{field_name}` must be a non-negative number of hours."),
            Some(command),
        ));
    }
    Ok(value)
}

/// Blocks the commit when the freshly loaded phase set does not validate.
pub(crate) fn ensure_valid(report: &PhaseSetReport, command: &str) -> ClientResult<()> {
    if report.is_valid {
        if !report.budget.is_valid {
            tracing::warn!(
                command,
                overage = report.budget.overage,
                "committing phases over the project estimate"
            );
        }
        return Ok(());
    }
    tracing::debug!(command, errors = ?report.errors, "rejected phase set");
    Err(ClientError::phase_set_invalid(report.errors.clone()))
}

pub(crate) fn past_end_errors(phases: &[Phase], today: Option<NaiveDate>) -> Vec<String> {
    let Some(today) = today else {
        return Vec::new();
    };
    phases
        .iter()
        .flat_map(|phase| validate_end_date_not_in_past(phase, today).errors)
        .collect()
}

pub fn project_view(project: &Project) -> ProjectView {
    ProjectView {
        id: project.id.clone(),
        name: project.name.clone(),
        start_date: format_iso_datetime(&project.start_date),
        end_date: project.end_date.as_ref().map(format_iso_datetime),
        continuous: project.continuous,
        estimated_hours: project.estimated_hours,
    }
}

pub fn phase_view(phase: &Phase) -> PhaseView {
    let kind = if phase.is_recurring {
        "recurring_template"
    } else if phase.is_phase() {
        "phase"
    } else {
        "milestone"
    };
    PhaseView {
        id: phase.id.clone(),
        project_id: phase.project_id.clone(),
        name: phase.name.clone(),
        kind: kind.to_string(),
        start_date: phase.start_date.as_ref().map(format_iso_datetime),
        end_date: format_iso_datetime(&phase.end_date),
        span_days: phase.span_days(),
        time_allocation_hours: phase.time_allocation_hours,
        recurring_config: phase.recurring_config.clone(),
    }
}

pub(crate) fn phase_views(phases: &[Phase]) -> Vec<PhaseView> {
    phases.iter().map(phase_view).collect()
}

#[cfg(test)]
mod tests {
    use super::parse_hours;

    #[test]
    fn hours_must_be_finite_and_non_negative() {
        assert!(parse_hours(0.0, "--hours", "budget").is_ok());
        assert!(parse_hours(12.5, "--hours", "budget").is_ok());
        assert!(parse_hours(-1.0, "--hours", "budget").is_err());
        assert!(parse_hours(f64::NAN, "--hours", "budget").is_err());
        assert!(parse_hours(f64::INFINITY, "--hours", "budget").is_err());
    }
}
