use crate::commands::common::{CommandOptions, load_project, open_repository, project_view};
use crate::commands::recurring::template_rule;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{BudgetData, RecurringProjection};
use crate::schedule::budget::analyze;
use crate::schedule::model::{Phase, PhaseMode, Project};
use crate::schedule::policy::SCHEDULING_POLICY_VERSION;
use crate::schedule::recurrence::expand;
use crate::store::PhaseRepository;
use crate::ClientResult;

/// Allocation against the project estimate. Recurring projects also get
/// the hours their template projects over the project window.
pub fn run(project_id: &str, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let repository = open_repository(options.home_override)?;
    let project = load_project(&repository, project_id)?;
    let phases = repository.list_by_project(project_id)?;
    let mode = PhaseMode::of(&phases);

    let recurring_projection = match phases.iter().find(|phase| phase.is_recurring) {
        Some(template) => Some(project_recurring(template, &project)?),
        None => None,
    };

    success(
        "budget",
        BudgetData {
            project: project_view(&project),
            mode,
            analysis: analyze(&phases, project.estimated_hours),
            recurring_projection,
            policy_version: SCHEDULING_POLICY_VERSION.to_string(),
        },
    )
}

fn project_recurring(
    template: &Phase,
    project: &Project,
) -> ClientResult<RecurringProjection> {
    let rrule = template_rule(template, project)?;
    let occurrence_count = expand(&rrule, project.start_date, project.bounded_end(), None).len();
    Ok(RecurringProjection {
        rrule,
        occurrence_count,
        hours_per_occurrence: template.time_allocation_hours,
        projected_hours: occurrence_count as f64 * template.time_allocation_hours,
    })
}
