use std::collections::BTreeSet;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::schedule::date::{add_days, day_difference, normalize_to_midnight, signed_day_difference};
use crate::schedule::model::{ModeSwitchPlan, Phase, PhaseMode, Project, RecurrenceConfig};
use crate::schedule::policy::{SCHEDULING_POLICY_V1, SchedulingPolicy};
use crate::schedule::recurrence::{build_rule, validate_config};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseSpan {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub time_allocation_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitResult {
    pub phase1: PhaseSpan,
    pub phase2: PhaseSpan,
}

impl SplitResult {
    pub fn into_phases(self, project_id: &str) -> Vec<Phase> {
        [self.phase1, self.phase2]
            .into_iter()
            .enumerate()
            .map(|(index, span)| Phase {
                id: None,
                project_id: project_id.to_string(),
                name: format!("Phase {}", index + 1),
                start_date: Some(span.start_date),
                end_date: span.end_date,
                time_allocation_hours: span.time_allocation_hours,
                is_recurring: false,
                recurring_config: None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppendPlan {
    pub new_phase_start: NaiveDateTime,
    pub new_phase_end: NaiveDateTime,
    pub last_phase_new_end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRepair {
    pub phase_id: String,
    pub start_date: NaiveDateTime,
}

/// Splits the project window at its elapsed-time midpoint and the budget in
/// half. The second phase starts on the day after the midpoint.
///
/// Both bounds are taken at midnight, so the midpoint always lands before
/// the end day and neither phase ends before it starts.
pub fn split_budget(
    project_start: NaiveDateTime,
    project_end: NaiveDateTime,
    estimated_hours: f64,
) -> ClientResult<SplitResult> {
    let project_start = normalize_to_midnight(project_start);
    let project_end = normalize_to_midnight(project_end);
    if day_difference(project_start, project_end) < 1 || project_end <= project_start {
        return Err(ClientError::invalid_argument(
            "A project must span at least two calendar days to be split into phases.",
        ));
    }

    let half = TimeDelta::milliseconds((project_end - project_start).num_milliseconds() / 2);
    let midpoint = project_start + half;
    let first_hours = estimated_hours / 2.0;
    let result = SplitResult {
        phase1: PhaseSpan {
            start_date: project_start,
            end_date: midpoint,
            time_allocation_hours: first_hours,
        },
        phase2: PhaseSpan {
            start_date: normalize_to_midnight(add_days(midpoint, 1)),
            end_date: project_end,
            time_allocation_hours: estimated_hours - first_hours,
        },
    };
    tracing::debug!(?midpoint, estimated_hours, "computed budget split");
    Ok(result)
}

pub fn calculate_new_phase_dates(
    existing: &[Phase],
    project_end: NaiveDateTime,
) -> ClientResult<AppendPlan> {
    calculate_with_policy(existing, project_end, SCHEDULING_POLICY_V1).map(|(plan, _)| plan)
}

fn calculate_with_policy(
    existing: &[Phase],
    project_end: NaiveDateTime,
    policy: SchedulingPolicy,
) -> ClientResult<(AppendPlan, usize)> {
    let Some((last_index, last_start)) = last_phase(existing) else {
        return Err(ClientError::no_phases_to_shrink());
    };
    let last = &existing[last_index];

    let span = policy.new_phase_span_days(day_difference(last_start, last.end_date));
    let new_phase_start = normalize_to_midnight(add_days(project_end, -(span - 1)));
    let last_phase_new_end = add_days(new_phase_start, -1);
    if last_phase_new_end.date() < last_start.date() {
        return Err(ClientError::phase_too_short_to_shrink(&last.name));
    }

    Ok((
        AppendPlan {
            new_phase_start,
            new_phase_end: project_end,
            last_phase_new_end,
        },
        last_index,
    ))
}

/// The proposed phase list after making room for a new zero-hour phase at
/// the end of the project.
pub fn append_phase(
    existing: &[Phase],
    project_id: &str,
    project_end: NaiveDateTime,
) -> ClientResult<Vec<Phase>> {
    let (plan, last_index) = calculate_with_policy(existing, project_end, SCHEDULING_POLICY_V1)?;

    let mut proposed = existing.to_vec();
    proposed[last_index].end_date = plan.last_phase_new_end;
    proposed.push(Phase {
        id: None,
        project_id: project_id.to_string(),
        name: next_phase_name(existing),
        start_date: Some(plan.new_phase_start),
        end_date: plan.new_phase_end,
        time_allocation_hours: 0.0,
        is_recurring: false,
        recurring_config: None,
    });
    tracing::debug!(
        shrunk = existing[last_index].id_or_placeholder(),
        new_start = ?plan.new_phase_start,
        "computed phase append"
    );
    Ok(proposed)
}

fn last_phase(phases: &[Phase]) -> Option<(usize, NaiveDateTime)> {
    phases
        .iter()
        .enumerate()
        .filter_map(|(index, phase)| phase.start_date.map(|start| (index, start)))
        .max_by_key(|(index, start)| (phases[*index].end_date, *start))
}

fn next_phase_name(existing: &[Phase]) -> String {
    let taken = existing
        .iter()
        .map(|phase| phase.name.as_str())
        .collect::<BTreeSet<&str>>();
    let mut number = existing.iter().filter(|phase| phase.is_phase()).count() + 1;
    loop {
        let name = format!("Phase {number}");
        if !taken.contains(name.as_str()) {
            return name;
        }
        number += 1;
    }
}

/// Start-date fixes that remove overlaps, applied to a working copy until
/// nothing changes. Starts only move forward onto the day after some
/// phase end, so the loop terminates.
pub fn repair_overlaps(phases: &[Phase]) -> Vec<PhaseRepair> {
    let mut working = phases
        .iter()
        .filter_map(|phase| phase.start_date.map(|start| (phase, start)))
        .collect::<Vec<(&Phase, NaiveDateTime)>>();

    loop {
        working.sort_by_key(|(phase, start)| (*start, phase.end_date));
        let mut changed = false;
        for index in 1..working.len() {
            let current_end = working[index - 1].0.end_date;
            let next_start = working[index].1;
            if current_end.date() >= next_start.date() {
                working[index].1 = normalize_to_midnight(add_days(current_end, 1));
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let repairs = working
        .iter()
        .filter(|(phase, start)| phase.start_date != Some(*start))
        .map(|(phase, start)| PhaseRepair {
            phase_id: phase.id_or_placeholder().to_string(),
            start_date: *start,
        })
        .collect::<Vec<PhaseRepair>>();
    tracing::debug!(repairs = repairs.len(), "computed overlap repairs");
    repairs
}

/// Moves one phase's end date and shifts the following phases, keeping their
/// durations, until the minimum gap holds again.
pub fn cascade_adjustment(
    phases: &[Phase],
    adjusted_phase_id: &str,
    new_end_date: NaiveDateTime,
) -> ClientResult<Vec<Phase>> {
    let gap = SCHEDULING_POLICY_V1.min_phase_gap_days;
    let mut updated = phases.to_vec();
    let Some(adjusted) = updated
        .iter()
        .position(|phase| phase.id.as_deref() == Some(adjusted_phase_id))
    else {
        return Err(ClientError::phase_not_found(adjusted_phase_id));
    };
    updated[adjusted].end_date = new_end_date;
    if updated[adjusted].start_date.is_none() {
        return Ok(updated);
    }

    let mut order = (0..phases.len())
        .filter(|index| phases[*index].is_phase())
        .collect::<Vec<usize>>();
    order.sort_by_key(|index| (phases[*index].end_date, phases[*index].start_date));

    let mut previous_end = new_end_date;
    let mut shifted = 0_usize;
    let following = order
        .iter()
        .skip_while(|index| **index != adjusted)
        .skip(1)
        .copied()
        .collect::<Vec<usize>>();
    for index in following {
        let Some(start) = updated[index].start_date else {
            continue;
        };
        let required = add_days(previous_end, gap);
        let shift = signed_day_difference(start, required);
        if shift <= 0 {
            break;
        }
        updated[index].start_date = Some(add_days(start, shift));
        updated[index].end_date = add_days(updated[index].end_date, shift);
        previous_end = updated[index].end_date;
        shifted += 1;
    }

    tracing::debug!(phase = adjusted_phase_id, shifted, "computed cascade adjustment");
    Ok(updated)
}

/// New end date a bounded project needs so every phase fits inside it.
pub fn required_project_end(phases: &[Phase], project: &Project) -> Option<NaiveDateTime> {
    let project_end = project.bounded_end()?;
    let latest = phases
        .iter()
        .filter(|phase| !phase.is_recurring)
        .map(|phase| phase.end_date)
        .max()?;
    (latest.date() > project_end.date()).then_some(latest)
}

/// Builds the recurring template for a project, with its canonical rule
/// stored on the config.
pub fn recurring_template(
    project: &Project,
    name: &str,
    mut config: RecurrenceConfig,
    hours_per_occurrence: f64,
) -> ClientResult<Phase> {
    let check = validate_config(true, Some(&config), hours_per_occurrence);
    if !check.is_valid {
        return Err(ClientError::invalid_recurrence(check.errors));
    }
    let rule = build_rule(
        &config,
        project.start_date,
        project.end_date,
        project.continuous,
    )?;
    config.rrule = Some(rule);

    Ok(Phase {
        id: None,
        project_id: project.id.clone(),
        name: name.to_string(),
        start_date: None,
        end_date: project.bounded_end().unwrap_or(project.start_date),
        time_allocation_hours: hours_per_occurrence,
        is_recurring: true,
        recurring_config: Some(config),
    })
}

/// Replace split phases (or a previous template) with one recurring
/// template. Milestones are left alone.
pub fn plan_recurring_switch(existing: &[Phase], template: Phase) -> ModeSwitchPlan {
    ModeSwitchPlan {
        from_mode: PhaseMode::of(existing),
        to_mode: PhaseMode::RecurringTemplate,
        to_delete: structural_ids(existing),
        to_create: vec![template],
    }
}

/// Replace whatever structure the project has with a fresh two-phase split.
pub fn plan_split_switch(existing: &[Phase], project: &Project) -> ClientResult<ModeSwitchPlan> {
    let Some(project_end) = project.bounded_end() else {
        return Err(ClientError::invalid_argument_with_recovery(
            "Continuous projects have no end date to split between phases.",
            vec![format!(
                "Run `phaseplan recurring set {} --help` to plan recurring work instead.",
                project.id
            )],
        ));
    };
    let split = split_budget(project.start_date, project_end, project.estimated_hours)?;
    Ok(ModeSwitchPlan {
        from_mode: PhaseMode::of(existing),
        to_mode: PhaseMode::SplitPhases,
        to_delete: structural_ids(existing),
        to_create: split.into_phases(&project.id),
    })
}

fn structural_ids(existing: &[Phase]) -> Vec<String> {
    existing
        .iter()
        .filter(|phase| phase.is_phase() || phase.is_recurring)
        .filter_map(|phase| phase.id.clone())
        .collect()
}
