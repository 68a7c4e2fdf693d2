use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::commands::common::{
    CommandOptions, ensure_valid, load_phase, load_project, open_repository, past_end_errors,
    phase_view, phase_views, project_view,
};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{PhaseChangeData, PhaseListData, RepairData, RepairView, ValidationData};
use crate::schedule::date::{format_iso_datetime, parse_iso_argument};
use crate::schedule::model::{ModeSwitchPlan, Phase, PhaseMode, PhaseUpdate};
use crate::schedule::policy::SCHEDULING_POLICY_VERSION;
use crate::schedule::scheduler::{
    append_phase, cascade_adjustment, plan_split_switch, repair_overlaps, required_project_end,
};
use crate::schedule::validator::validate_phase_set;
use crate::store::{PhaseBatch, PhaseRepository, SqliteRepository};
use crate::{ClientError, ClientResult};

struct ChangeSummary {
    action: &'static str,
    created: Vec<Phase>,
    updated_ids: Vec<String>,
    deleted: Vec<String>,
    extended_to: Option<NaiveDateTime>,
    warnings: Vec<String>,
}

pub fn list(project_id: &str, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let repository = open_repository(options.home_override)?;
    let project = load_project(&repository, project_id)?;
    let phases = repository.list_by_project(project_id)?;
    success(
        "phase list",
        PhaseListData {
            project: project_view(&project),
            mode: PhaseMode::of(&phases),
            phases: phase_views(&phases),
        },
    )
}

/// Replaces the project's phases with an even two-phase split.
pub fn split(project_id: &str, confirm: bool, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "phase split";
    let mut repository = open_repository(options.home_override)?;
    let project = load_project(&repository, project_id)?;
    let existing = repository.list_by_project(project_id)?;

    let plan = plan_split_switch(&existing, &project)?;
    require_confirmation(&plan, confirm)?;
    let report = validate_phase_set(&planned_phases(&existing, &plan), &project);
    ensure_valid(&report, command)?;

    let created = repository.apply_plan(project_id, &plan)?;
    finish(
        command,
        &repository,
        project_id,
        ChangeSummary {
            action: "split",
            created,
            updated_ids: Vec::new(),
            deleted: plan.to_delete,
            extended_to: None,
            warnings: report.warnings,
        },
    )
}

/// Appends a zero-hour phase at the end of the project, shrinking the last
/// phase to make room.
pub fn add(project_id: &str, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "phase add";
    let mut repository = open_repository(options.home_override)?;
    let project = load_project(&repository, project_id)?;
    let Some(project_end) = project.bounded_end() else {
        return Err(ClientError::invalid_argument_for_command(
            "Continuous projects have no end date to append phases against.",
            Some(command),
        ));
    };
    let existing = repository.list_by_project(project_id)?;

    let split_phases = existing
        .iter()
        .filter(|phase| phase.is_phase())
        .cloned()
        .collect::<Vec<Phase>>();
    let proposed_split = append_phase(&split_phases, project_id, project_end)?;
    let mut proposed = existing
        .iter()
        .filter(|phase| !phase.is_phase())
        .cloned()
        .collect::<Vec<Phase>>();
    proposed.extend(proposed_split.iter().cloned());

    let report = validate_phase_set(&proposed, &project);
    ensure_valid(&report, command)?;

    let batch = PhaseBatch {
        to_update: date_updates(&existing, &proposed),
        to_create: proposed_split
            .into_iter()
            .filter(|phase| phase.id.is_none())
            .collect(),
        ..PhaseBatch::for_project(project_id)
    };
    let created = repository.apply_batch(&batch)?;
    finish(
        command,
        &repository,
        project_id,
        ChangeSummary {
            action: "add",
            created,
            updated_ids: batch.to_update.into_iter().map(|(id, _)| id).collect(),
            deleted: Vec::new(),
            extended_to: None,
            warnings: report.warnings,
        },
    )
}

pub fn repair(project_id: &str, dry_run: bool, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let mut repository = open_repository(options.home_override)?;
    let project = load_project(&repository, project_id)?;
    let existing = repository.list_by_project(project_id)?;
    let repairs = repair_overlaps(&existing);

    let views = repairs
        .iter()
        .map(|repair| {
            let previous = existing
                .iter()
                .find(|phase| phase.id.as_deref() == Some(repair.phase_id.as_str()));
            RepairView {
                phase_id: repair.phase_id.clone(),
                name: previous.map(|phase| phase.name.clone()).unwrap_or_default(),
                previous_start_date: previous
                    .and_then(|phase| phase.start_date.as_ref())
                    .map(format_iso_datetime),
                start_date: format_iso_datetime(&repair.start_date),
            }
        })
        .collect::<Vec<RepairView>>();

    let mut repaired = existing.clone();
    for repair in &repairs {
        if let Some(phase) = repaired
            .iter_mut()
            .find(|phase| phase.id.as_deref() == Some(repair.phase_id.as_str()))
        {
            phase.start_date = Some(repair.start_date);
        }
    }
    let report = validate_phase_set(&repaired, &project);

    let applied = !dry_run && !repairs.is_empty();
    if applied {
        let updates = repairs
            .into_iter()
            .map(|repair| {
                (
                    repair.phase_id,
                    PhaseUpdate {
                        start_date: Some(repair.start_date),
                        ..PhaseUpdate::default()
                    },
                )
            })
            .collect::<Vec<(String, PhaseUpdate)>>();
        repository.apply_updates(project_id, updates)?;
    }

    success(
        "phase repair",
        RepairData {
            project_id: project_id.to_string(),
            dry_run,
            applied,
            repairs: views,
            remaining_errors: report.errors,
        },
    )
}

pub fn validate(project_id: &str, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let repository = open_repository(options.home_override)?;
    let project = load_project(&repository, project_id)?;
    let phases = repository.list_by_project(project_id)?;

    let report = validate_phase_set(&phases, &project);
    let mut warnings = report.warnings;
    warnings.extend(past_end_errors(&phases, options.today));

    success(
        "phase validate",
        ValidationData {
            project_id: project_id.to_string(),
            mode: report.mode,
            is_valid: report.is_valid,
            errors: report.errors,
            warnings,
            exclusivity: report.exclusivity,
            budget: report.budget,
            policy_version: SCHEDULING_POLICY_VERSION.to_string(),
        },
    )
}

/// Moves a phase end date, shifting later phases and extending the project
/// end when they no longer fit.
pub fn move_end(phase_id: &str, end: &str, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "phase move";
    let mut repository = open_repository(options.home_override)?;
    let phase = load_phase(&repository, phase_id)?;
    let project = load_project(&repository, &phase.project_id)?;
    let new_end = parse_iso_argument(end, "--end", command)?;

    if phase.is_recurring {
        return Err(ClientError::invalid_argument_with_recovery(
            "Recurring templates follow the project window and cannot be moved.",
            vec![format!(
                "Run `phaseplan recurring set {} --help` to change the pattern.",
                project.id
            )],
        ));
    }
    if let Some(start) = phase.start_date
        && new_end.date() < start.date()
    {
        return Err(ClientError::invalid_argument_for_command(
            &format!("`--end` must not be before the phase start {}.", format_iso_datetime(&start)),
            Some(command),
        ));
    }

    let existing = repository.list_by_project(&project.id)?;
    let updated = cascade_adjustment(&existing, phase_id, new_end)?;
    let extended_to = required_project_end(&updated, &project);
    let mut target = project.clone();
    if let Some(end_date) = extended_to {
        target.end_date = Some(end_date);
    }

    let mut report = validate_phase_set(&updated, &target);
    let moved = updated
        .iter()
        .filter(|candidate| candidate.id.as_deref() == Some(phase_id))
        .cloned()
        .collect::<Vec<Phase>>();
    let past = past_end_errors(&moved, options.today);
    if !past.is_empty() {
        report.errors.extend(past);
        report.is_valid = false;
    }
    ensure_valid(&report, command)?;

    let batch = PhaseBatch {
        to_update: date_updates(&existing, &updated),
        project_end: extended_to,
        ..PhaseBatch::for_project(&project.id)
    };
    repository.apply_batch(&batch)?;
    finish(
        command,
        &repository,
        &project.id,
        ChangeSummary {
            action: "move",
            created: Vec::new(),
            updated_ids: batch.to_update.into_iter().map(|(id, _)| id).collect(),
            deleted: Vec::new(),
            extended_to,
            warnings: report.warnings,
        },
    )
}

pub fn delete(phase_id: &str, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "phase delete";
    let mut repository = open_repository(options.home_override)?;
    let phase = load_phase(&repository, phase_id)?;
    let project = load_project(&repository, &phase.project_id)?;
    repository.delete(phase_id)?;

    let remaining = repository.list_by_project(&project.id)?;
    let report = validate_phase_set(&remaining, &project);
    let mut warnings = report.errors;
    warnings.extend(report.warnings);

    finish(
        command,
        &repository,
        &project.id,
        ChangeSummary {
            action: "delete",
            created: Vec::new(),
            updated_ids: Vec::new(),
            deleted: vec![phase_id.to_string()],
            extended_to: None,
            warnings,
        },
    )
}

pub(crate) fn require_confirmation(plan: &ModeSwitchPlan, confirm: bool) -> ClientResult<()> {
    if !plan.is_destructive() || confirm {
        return Ok(());
    }
    let plan_value = serde_json::to_value(plan)
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
    Err(ClientError::mode_switch_requires_confirmation(
        plan.to_delete.len(),
        plan_value,
    ))
}

/// Phase list as it will look once `plan` is applied.
pub(crate) fn planned_phases(existing: &[Phase], plan: &ModeSwitchPlan) -> Vec<Phase> {
    let deleted = plan.to_delete.iter().map(String::as_str).collect::<BTreeSet<&str>>();
    existing
        .iter()
        .filter(|phase| phase.id.as_deref().is_none_or(|id| !deleted.contains(id)))
        .cloned()
        .chain(plan.to_create.iter().cloned())
        .collect()
}

/// Start/end changes between two versions of the same persisted phases.
fn date_updates(before: &[Phase], after: &[Phase]) -> Vec<(String, PhaseUpdate)> {
    after
        .iter()
        .filter_map(|phase| {
            let id = phase.id.as_deref()?;
            let previous = before.iter().find(|candidate| candidate.id.as_deref() == Some(id))?;
            let update = PhaseUpdate {
                start_date: phase.start_date.filter(|start| previous.start_date != Some(*start)),
                end_date: Some(phase.end_date).filter(|end| *end != previous.end_date),
                ..PhaseUpdate::default()
            };
            (!update.is_empty()).then(|| (id.to_string(), update))
        })
        .collect()
}

fn finish(
    command: &str,
    repository: &SqliteRepository,
    project_id: &str,
    summary: ChangeSummary,
) -> ClientResult<SuccessEnvelope> {
    let phases = repository.list_by_project(project_id)?;
    let updated_ids = summary.updated_ids.iter().map(String::as_str).collect::<BTreeSet<&str>>();
    let updated = phases
        .iter()
        .filter(|phase| phase.id.as_deref().is_some_and(|id| updated_ids.contains(id)))
        .map(phase_view)
        .collect();

    success(
        command,
        PhaseChangeData {
            project_id: project_id.to_string(),
            action: summary.action.to_string(),
            mode: PhaseMode::of(&phases),
            created: phase_views(&summary.created),
            updated,
            deleted: summary.deleted,
            project_end_extended_to: summary.extended_to.as_ref().map(format_iso_datetime),
            phases: phase_views(&phases),
            warnings: summary.warnings,
            policy_version: SCHEDULING_POLICY_VERSION.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use crate::schedule::date::parse_iso_datetime;
    use crate::schedule::model::{ModeSwitchPlan, Phase, PhaseMode};

    use super::{date_updates, planned_phases, require_confirmation};

    fn at(value: &str) -> NaiveDateTime {
        let parsed = parse_iso_datetime(value);
        assert!(parsed.is_some());
        parsed.unwrap_or(NaiveDateTime::MIN)
    }

    fn phase(id: &str, start: &str, end: &str) -> Phase {
        Phase {
            id: Some(id.to_string()),
            project_id: "prj_1".to_string(),
            name: id.to_string(),
            start_date: Some(at(start)),
            end_date: at(end),
            time_allocation_hours: 5.0,
            is_recurring: false,
            recurring_config: None,
        }
    }

    #[test]
    fn destructive_plans_need_confirmation() {
        let plan = ModeSwitchPlan {
            from_mode: PhaseMode::SplitPhases,
            to_mode: PhaseMode::RecurringTemplate,
            to_delete: vec!["ph_a".to_string()],
            to_create: Vec::new(),
        };
        let blocked = require_confirmation(&plan, false);
        assert!(blocked.is_err());
        if let Err(error) = blocked {
            assert_eq!(error.code, "mode_switch_requires_confirmation");
            assert!(error.data.is_some());
        }
        assert!(require_confirmation(&plan, true).is_ok());
    }

    #[test]
    fn planned_phases_drop_deleted_and_add_created() {
        let existing = vec![phase("ph_a", "2026-01-01", "2026-01-10"), phase("ph_b", "2026-01-11", "2026-01-20")];
        let plan = ModeSwitchPlan {
            from_mode: PhaseMode::SplitPhases,
            to_mode: PhaseMode::SplitPhases,
            to_delete: vec!["ph_a".to_string()],
            to_create: vec![Phase {
                id: None,
                ..phase("new", "2026-01-01", "2026-01-10")
            }],
        };
        let planned = planned_phases(&existing, &plan);
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].id.as_deref(), Some("ph_b"));
        assert!(planned[1].id.is_none());
    }

    #[test]
    fn date_updates_only_report_changed_fields() {
        let before = vec![phase("ph_a", "2026-01-01", "2026-01-10"), phase("ph_b", "2026-01-11", "2026-01-20")];
        let mut after = before.clone();
        after[1].end_date = at("2026-01-25");
        let updates = date_updates(&before, &after);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "ph_b");
        assert!(updates[0].1.start_date.is_none());
        assert_eq!(updates[0].1.end_date, Some(at("2026-01-25")));
    }
}
