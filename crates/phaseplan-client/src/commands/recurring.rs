use crate::commands::common::{
    CommandOptions, ensure_valid, load_project, open_repository, parse_hours, phase_view,
};
use crate::commands::phase::{planned_phases, require_confirmation};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{OccurrenceView, RecurringPreviewData, RecurringSetData};
use crate::schedule::budget::{can_schedule_additional, format_hours};
use crate::schedule::date::format_iso_datetime;
use crate::schedule::model::{
    MonthlyPatternKind, Phase, Project, RecurrenceConfig, RecurrenceOccurrence, RecurrenceType,
};
use crate::schedule::recurrence::{build_rule, expand};
use crate::schedule::scheduler::{plan_recurring_switch, recurring_template};
use crate::schedule::validator::validate_phase_set;
use crate::store::PhaseRepository;
use crate::{ClientError, ClientResult};

const DEFAULT_TEMPLATE_NAME: &str = "Recurring work";

#[derive(Debug, Clone)]
pub struct RecurringSetArgs {
    pub project_id: String,
    pub kind: String,
    pub interval: u32,
    /// 0 = Sunday .. 6 = Saturday; the weekly day, or the weekday of a
    /// monthly `--week` pattern.
    pub day: Option<u8>,
    pub monthly_date: Option<u8>,
    pub week: Option<u8>,
    pub hours: f64,
    pub name: Option<String>,
    pub confirm: bool,
}

/// Creates or replaces the project's recurring template. Replacing split
/// phases (or an older template) needs `confirm`.
pub fn set(args: &RecurringSetArgs, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "recurring set";
    let hours = parse_hours(args.hours, "--hours", command)?;
    let name = args
        .name
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_TEMPLATE_NAME);

    let mut repository = open_repository(options.home_override)?;
    let project = load_project(&repository, &args.project_id)?;
    let existing = repository.list_by_project(&project.id)?;

    let template = recurring_template(&project, name, config_from_args(args), hours)?;
    let plan = plan_recurring_switch(&existing, template);
    require_confirmation(&plan, args.confirm)?;
    let report = validate_phase_set(&planned_phases(&existing, &plan), &project);
    ensure_valid(&report, command)?;

    let created = repository.apply_plan(&project.id, &plan)?;
    let Some(template) = created.into_iter().next() else {
        return Err(ClientError::internal_serialization(
            "Recurring template was not returned after commit.",
        ));
    };
    let rrule = template_rule(&template, &project)?;

    let mut warnings = report.warnings;
    if let Some(project_end) = project.bounded_end() {
        let occurrences = expand(&rrule, project.start_date, Some(project_end), None);
        let projected = occurrences.len() as f64 * hours;
        let check = can_schedule_additional(&[], projected, project.estimated_hours);
        warnings.extend(check.budget_conflicts);
        if occurrences.is_empty() {
            warnings.push("The pattern produces no occurrences inside the project window.".to_string());
        }
        tracing::debug!(occurrences = occurrences.len(), projected, "projected recurring hours");
    }

    success(
        command,
        RecurringSetData {
            project_id: project.id.clone(),
            template: phase_view(&template),
            rrule,
            from_mode: plan.from_mode,
            deleted: plan.to_delete,
            warnings,
        },
    )
}

pub fn preview(
    project_id: &str,
    max: Option<usize>,
    options: CommandOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    let repository = open_repository(options.home_override)?;
    let project = load_project(&repository, project_id)?;
    let template = repository
        .find_recurring_template(project_id)?
        .ok_or_else(|| ClientError::recurring_template_not_found(project_id))?;

    let rrule = template_rule(&template, &project)?;
    let occurrences = expand(&rrule, project.start_date, project.bounded_end(), max);
    let projected_hours = occurrences.len() as f64 * template.time_allocation_hours;
    let budget_check = can_schedule_additional(&[], projected_hours, project.estimated_hours);
    tracing::debug!(
        project_id,
        projected = %format_hours(projected_hours),
        "previewed recurring template"
    );

    success(
        "recurring preview",
        RecurringPreviewData {
            project_id: project_id.to_string(),
            template: phase_view(&template),
            rrule,
            occurrence_count: occurrences.len(),
            occurrences: occurrence_views(&occurrences),
            hours_per_occurrence: template.time_allocation_hours,
            projected_hours,
            budget_check,
        },
    )
}

/// Rule text of a template. `build_rule` hands back a decodable stored rule
/// as-is and rebuilds anything else from the config fields.
pub(crate) fn template_rule(template: &Phase, project: &Project) -> ClientResult<String> {
    let Some(config) = template.recurring_config.as_ref() else {
        return Err(ClientError::invalid_recurrence(vec![format!(
            "Template `{}` has no recurrence configuration.",
            template.name
        )]));
    };
    build_rule(config, project.start_date, project.end_date, project.continuous)
}

pub(crate) fn occurrence_views(occurrences: &[RecurrenceOccurrence]) -> Vec<OccurrenceView> {
    occurrences
        .iter()
        .map(|occurrence| OccurrenceView {
            date: format_iso_datetime(&occurrence.date),
            occurrence_number: occurrence.occurrence_number,
        })
        .collect()
}

fn config_from_args(args: &RecurringSetArgs) -> RecurrenceConfig {
    let kind = RecurrenceType::from(args.kind.clone());
    let mut config = RecurrenceConfig {
        kind: kind.clone(),
        interval: args.interval,
        weekly_day_of_week: None,
        monthly_pattern: None,
        monthly_date: None,
        monthly_week_of_month: None,
        monthly_day_of_week: None,
        rrule: None,
    };
    match kind {
        RecurrenceType::Weekly => config.weekly_day_of_week = args.day,
        RecurrenceType::Monthly => {
            if args.monthly_date.is_some() {
                config.monthly_pattern = Some(MonthlyPatternKind::Date);
                config.monthly_date = args.monthly_date;
            } else if args.week.is_some() || args.day.is_some() {
                config.monthly_pattern = Some(MonthlyPatternKind::DayOfWeek);
                config.monthly_week_of_month = args.week;
                config.monthly_day_of_week = args.day;
            }
        }
        RecurrenceType::Daily | RecurrenceType::Unsupported(_) => {}
    }
    config
}

#[cfg(test)]
mod tests {
    use crate::schedule::model::{MonthlyPatternKind, RecurrenceConfig};

    use super::{RecurringSetArgs, config_from_args};

    fn args(kind: &str) -> RecurringSetArgs {
        RecurringSetArgs {
            project_id: "prj_1".to_string(),
            kind: kind.to_string(),
            interval: 1,
            day: None,
            monthly_date: None,
            week: None,
            hours: 2.0,
            name: None,
            confirm: false,
        }
    }

    #[test]
    fn weekly_day_maps_to_weekly_field() {
        let config = config_from_args(&RecurringSetArgs {
            day: Some(1),
            ..args("weekly")
        });
        assert_eq!(config, RecurrenceConfig::weekly(1, 1));
    }

    #[test]
    fn monthly_date_wins_over_weekday_pattern() {
        let config = config_from_args(&RecurringSetArgs {
            monthly_date: Some(15),
            week: Some(2),
            ..args("monthly")
        });
        assert_eq!(config, RecurrenceConfig::monthly_on_date(1, 15));

        let config = config_from_args(&RecurringSetArgs {
            week: Some(5),
            day: Some(5),
            ..args("Monthly")
        });
        assert_eq!(config.monthly_pattern, Some(MonthlyPatternKind::DayOfWeek));
        assert_eq!(config.monthly_week_of_month, Some(5));
    }

    #[test]
    fn monthly_without_fields_leaves_pattern_for_validation() {
        let config = config_from_args(&args("monthly"));
        assert!(config.monthly_pattern.is_none());
    }
}
