use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::schedule::budget::{self, format_hours};
use crate::schedule::date::{add_days, format_iso_date, same_day, signed_day_difference};
use crate::schedule::model::{CheckResult, Phase, PhaseMode, Project};
use crate::schedule::policy::SCHEDULING_POLICY_V1;
use crate::schedule::recurrence::validate_config;

pub const EXCLUSIVITY_ERROR: &str =
    "A project cannot have both split phases and a recurring template. Delete one structure before creating the other.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusivityCheck {
    pub has_split_phases: bool,
    pub has_recurring_template: bool,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContinuityValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetValidation {
    pub is_valid: bool,
    pub total_allocated: f64,
    pub remaining: f64,
    pub overage: f64,
    pub utilization_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub min_allowed_date: NaiveDate,
    pub max_allowed_date: NaiveDate,
}

/// Everything a command checks before committing a phase set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSetReport {
    pub mode: PhaseMode,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub exclusivity: ExclusivityCheck,
    pub budget: BudgetValidation,
}

pub fn check_exclusivity(phases: &[Phase]) -> ExclusivityCheck {
    let has_split_phases = phases.iter().any(Phase::is_phase);
    let has_recurring_template = phases.iter().any(|phase| phase.is_recurring);
    let is_valid = !(has_split_phases && has_recurring_template);
    ExclusivityCheck {
        has_split_phases,
        has_recurring_template,
        is_valid,
        error: (!is_valid).then(|| EXCLUSIVITY_ERROR.to_string()),
    }
}

/// Sequential coverage of the project window. Overlaps and same-day
/// handoffs are errors; gaps are only warnings.
pub fn validate_continuity(
    phases: &[Phase],
    project_start: NaiveDateTime,
    project_end: NaiveDateTime,
) -> ContinuityValidation {
    let sorted = sorted_by_start(phases);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (phase, start) in &sorted {
        if start.date() > phase.end_date.date() {
            errors.push(format!(
                "Phase `{}` starts {} after it ends {}.",
                phase.name,
                format_iso_date(&start.date()),
                format_iso_date(&phase.end_date.date())
            ));
        }
    }

    if let (Some((first, first_start)), Some((last, _))) = (sorted.first(), sorted.last()) {
        if !same_day(*first_start, project_start) {
            errors.push(format!(
                "First phase `{}` must start on the project start date {} (starts {}).",
                first.name,
                format_iso_date(&project_start.date()),
                format_iso_date(&first_start.date())
            ));
        }
        if !same_day(last.end_date, project_end) {
            errors.push(format!(
                "Last phase `{}` must end on the project end date {} (ends {}).",
                last.name,
                format_iso_date(&project_end.date()),
                format_iso_date(&last.end_date.date())
            ));
        }
    }

    for pair in sorted.windows(2) {
        let (current, _) = pair[0];
        let (next, next_start) = pair[1];
        if current.end_date.date() >= next_start.date() {
            errors.push(format!(
                "Phase `{}` ends {} but `{}` starts {}; phases must be on different days.",
                current.name,
                format_iso_date(&current.end_date.date()),
                next.name,
                format_iso_date(&next_start.date())
            ));
            continue;
        }
        let gap_days = signed_day_difference(current.end_date, next_start) - 1;
        if gap_days > 0 {
            warnings.push(format!(
                "{gap_days} day gap between `{}` and `{}`.",
                current.name, next.name
            ));
        }
    }

    ContinuityValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

pub fn validate_budgets(phases: &[Phase], project_estimated_hours: f64) -> BudgetValidation {
    check_budget_constraint(budget::total_allocation(phases), project_estimated_hours)
}

pub fn check_budget_constraint(allocated: f64, budget_hours: f64) -> BudgetValidation {
    BudgetValidation {
        is_valid: allocated <= budget_hours,
        total_allocated: allocated,
        remaining: budget::remaining(allocated, budget_hours),
        overage: budget::overage(allocated, budget_hours),
        utilization_percentage: budget::utilization(allocated, budget_hours),
    }
}

pub fn validate_end_date_not_in_past(phase: &Phase, today: NaiveDate) -> CheckResult {
    if !phase.is_phase() || phase.time_allocation_hours <= 0.0 {
        return CheckResult::valid();
    }
    if phase.end_date.date() >= today {
        return CheckResult::valid();
    }
    CheckResult::from_errors(vec![format!(
        "Phase `{}` ends {}, which is in the past.",
        phase.name,
        format_iso_date(&phase.end_date.date())
    )])
}

pub fn validate_spacing(phases: &[Phase]) -> CheckResult {
    let mut sorted = phases
        .iter()
        .filter_map(|phase| phase.start_date.map(|start| (phase, start)))
        .collect::<Vec<(&Phase, NaiveDateTime)>>();
    sorted.sort_by_key(|(phase, _)| phase.end_date);

    let gap = SCHEDULING_POLICY_V1.min_phase_gap_days;
    let mut errors = Vec::new();
    for pair in sorted.windows(2) {
        let (current, _) = pair[0];
        let (next, next_start) = pair[1];
        let earliest = add_days(current.end_date, gap);
        if next_start.date() < earliest.date() {
            errors.push(format!(
                "Phase `{}` must start on or after {} to leave {gap} day(s) after `{}`.",
                next.name,
                format_iso_date(&earliest.date()),
                current.name
            ));
        }
    }
    CheckResult::from_errors(errors)
}

/// Drop target check for a dragged phase or milestone marker.
pub fn validate_position(
    candidate: NaiveDateTime,
    project_start: NaiveDateTime,
    project_end: NaiveDateTime,
    other_dates: &[NaiveDateTime],
    original_date: Option<NaiveDateTime>,
) -> PositionValidation {
    let min_allowed_date = add_days(project_start, 1).date();
    let max_allowed_date = add_days(project_end, -1).date();
    let day = candidate.date();
    let mut errors = Vec::new();

    if day < min_allowed_date {
        errors.push(format!(
            "Date must be on or after {}.",
            format_iso_date(&min_allowed_date)
        ));
    }
    if day > max_allowed_date {
        errors.push(format!(
            "Date must be on or before {}.",
            format_iso_date(&max_allowed_date)
        ));
    }

    let returning_home = original_date.is_some_and(|original| same_day(original, candidate));
    if !returning_home
        && other_dates
            .iter()
            .filter(|other| original_date.is_none_or(|original| !same_day(original, **other)))
            .any(|other| same_day(*other, candidate))
    {
        errors.push(format!(
            "Another marker already sits on {}.",
            format_iso_date(&day)
        ));
    }

    PositionValidation {
        is_valid: errors.is_empty(),
        errors,
        min_allowed_date,
        max_allowed_date,
    }
}

/// Combined check of a project's full phase list. Budget overruns are
/// warnings; the caller decides whether they block.
pub fn validate_phase_set(phases: &[Phase], project: &Project) -> PhaseSetReport {
    let exclusivity = check_exclusivity(phases);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    if let Some(error) = &exclusivity.error {
        errors.push(error.clone());
    }

    let templates = phases.iter().filter(|phase| phase.is_recurring).count();
    if templates > 1 {
        errors.push(format!(
            "A project can hold one recurring template; found {templates}."
        ));
    }
    for template in phases.iter().filter(|phase| phase.is_recurring) {
        let result = validate_config(
            true,
            template.recurring_config.as_ref(),
            template.time_allocation_hours,
        );
        errors.extend(result.errors);
    }

    let split = phases
        .iter()
        .filter(|phase| phase.is_phase())
        .cloned()
        .collect::<Vec<Phase>>();
    if !split.is_empty() {
        match project.bounded_end() {
            Some(project_end) => {
                let continuity = validate_continuity(&split, project.start_date, project_end);
                errors.extend(continuity.errors);
                warnings.extend(continuity.warnings);
            }
            None => errors.extend(validate_spacing(&split).errors),
        }
    }

    let budget = validate_budgets(phases, project.estimated_hours);
    if !budget.is_valid {
        warnings.push(format!(
            "Allocated {}h exceeds the {}h estimate by {}h.",
            format_hours(budget.total_allocated),
            format_hours(project.estimated_hours),
            format_hours(budget.overage)
        ));
    }

    PhaseSetReport {
        mode: PhaseMode::of(phases),
        is_valid: errors.is_empty(),
        errors,
        warnings,
        exclusivity,
        budget,
    }
}

fn sorted_by_start(phases: &[Phase]) -> Vec<(&Phase, NaiveDateTime)> {
    let mut sorted = phases
        .iter()
        .filter_map(|phase| phase.start_date.map(|start| (phase, start)))
        .collect::<Vec<(&Phase, NaiveDateTime)>>();
    sorted.sort_by_key(|(phase, start)| (*start, phase.end_date));
    sorted
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::schedule::date::parse_iso_datetime;
    use crate::schedule::model::{Phase, Project, RecurrenceConfig};

    use super::{
        check_budget_constraint, check_exclusivity, validate_continuity,
        validate_end_date_not_in_past, validate_phase_set, validate_position, validate_spacing,
    };

    fn at(value: &str) -> NaiveDateTime {
        let parsed = parse_iso_datetime(value);
        assert!(parsed.is_some());
        parsed.unwrap_or(NaiveDateTime::MIN)
    }

    fn phase(name: &str, start: &str, end: &str, hours: f64) -> Phase {
        Phase {
            id: Some(format!("ph_{name}")),
            project_id: "prj_1".to_string(),
            name: name.to_string(),
            start_date: Some(at(start)),
            end_date: at(end),
            time_allocation_hours: hours,
            is_recurring: false,
            recurring_config: None,
        }
    }

    fn template(hours: f64) -> Phase {
        Phase {
            id: Some("ph_tpl".to_string()),
            project_id: "prj_1".to_string(),
            name: "Weekly review".to_string(),
            start_date: None,
            end_date: at("2026-01-31"),
            time_allocation_hours: hours,
            is_recurring: true,
            recurring_config: Some(RecurrenceConfig::weekly(1, 1)),
        }
    }

    fn project(hours: f64) -> Project {
        Project {
            id: "prj_1".to_string(),
            name: "Launch".to_string(),
            start_date: at("2026-01-01"),
            end_date: Some(at("2026-01-31")),
            continuous: false,
            estimated_hours: hours,
        }
    }

    #[test]
    fn exclusivity_rejects_mixed_structures() {
        let mixed = vec![phase("a", "2026-01-01", "2026-01-31", 10.0), template(2.0)];
        let result = check_exclusivity(&mixed);
        assert!(result.has_split_phases);
        assert!(result.has_recurring_template);
        assert!(!result.is_valid);
        assert!(result.error.is_some());

        assert!(check_exclusivity(&[template(2.0)]).is_valid);
        assert!(check_exclusivity(&[]).is_valid);
    }

    #[test]
    fn continuity_accepts_adjacent_phases_covering_the_project() {
        let phases = vec![
            phase("b", "2026-01-17", "2026-01-31", 40.0),
            phase("a", "2026-01-01", "2026-01-16", 40.0),
        ];
        let result = validate_continuity(&phases, at("2026-01-01"), at("2026-01-31"));
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn continuity_flags_same_day_handoff_and_boundaries() {
        let phases = vec![
            phase("a", "2026-01-02", "2026-01-15", 40.0),
            phase("b", "2026-01-15", "2026-01-30", 40.0),
        ];
        let result = validate_continuity(&phases, at("2026-01-01"), at("2026-01-31"));
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn continuity_rejects_phase_ending_before_it_starts() {
        let phases = vec![
            phase("a", "2026-01-01", "2026-01-02", 4.0),
            phase("b", "2026-01-03", "2026-01-02T23:00:00", 4.0),
        ];
        let result = validate_continuity(&phases, at("2026-01-01"), at("2026-01-02"));
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["Phase `b` starts 2026-01-03 after it ends 2026-01-02.".to_string()]
        );
    }

    #[test]
    fn continuity_reports_gaps_as_warnings() {
        let phases = vec![
            phase("a", "2026-01-01", "2026-01-10", 40.0),
            phase("b", "2026-01-14", "2026-01-31", 40.0),
        ];
        let result = validate_continuity(&phases, at("2026-01-01"), at("2026-01-31"));
        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["3 day gap between `a` and `b`.".to_string()]);
    }

    #[test]
    fn budget_constraint_reports_overage() {
        let result = check_budget_constraint(110.0, 100.0);
        assert!(!result.is_valid);
        assert_eq!(result.overage, 10.0);
        assert_eq!(result.utilization_percentage, 110.0);
        assert!(check_budget_constraint(100.0, 100.0).is_valid);
    }

    #[test]
    fn past_end_dates_only_matter_for_allocated_phases() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap_or_default();
        assert!(!validate_end_date_not_in_past(&phase("a", "2026-01-01", "2026-01-19", 5.0), today).is_valid);
        assert!(validate_end_date_not_in_past(&phase("a", "2026-01-01", "2026-01-20T08:00:00", 5.0), today).is_valid);
        assert!(validate_end_date_not_in_past(&phase("a", "2026-01-01", "2026-01-19", 0.0), today).is_valid);
    }

    #[test]
    fn spacing_requires_a_day_between_phases() {
        let tight = vec![
            phase("a", "2026-01-01", "2026-01-10", 5.0),
            phase("b", "2026-01-10", "2026-01-20", 5.0),
        ];
        assert!(!validate_spacing(&tight).is_valid);

        let spaced = vec![
            phase("a", "2026-01-01", "2026-01-10", 5.0),
            phase("b", "2026-01-11", "2026-01-20", 5.0),
        ];
        assert!(validate_spacing(&spaced).is_valid);
    }

    #[test]
    fn position_stays_inside_project_and_off_other_markers() {
        let others = vec![at("2026-01-10"), at("2026-01-20")];
        let inside = validate_position(at("2026-01-15"), at("2026-01-01"), at("2026-01-31"), &others, None);
        assert!(inside.is_valid);
        assert_eq!(inside.min_allowed_date.to_string(), "2026-01-02");
        assert_eq!(inside.max_allowed_date.to_string(), "2026-01-30");

        let edge = validate_position(at("2026-01-01"), at("2026-01-01"), at("2026-01-31"), &others, None);
        assert!(!edge.is_valid);

        let collision = validate_position(at("2026-01-10"), at("2026-01-01"), at("2026-01-31"), &others, None);
        assert!(!collision.is_valid);

        let home = validate_position(
            at("2026-01-10"),
            at("2026-01-01"),
            at("2026-01-31"),
            &others,
            Some(at("2026-01-10")),
        );
        assert!(home.is_valid);
    }

    #[test]
    fn phase_set_report_collects_errors_and_budget_warnings() {
        let phases = vec![
            phase("a", "2026-01-01", "2026-01-16", 60.0),
            phase("b", "2026-01-17", "2026-01-31", 60.0),
        ];
        let report = validate_phase_set(&phases, &project(100.0));
        assert!(report.is_valid);
        assert!(!report.budget.is_valid);
        assert_eq!(report.warnings.len(), 1);

        let mut broken = template(0.0);
        broken.recurring_config = Some(RecurrenceConfig::weekly(1, 9));
        let report = validate_phase_set(&[broken], &project(100.0));
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
    }
}
