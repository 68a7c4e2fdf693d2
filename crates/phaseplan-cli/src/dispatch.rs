use chrono::Local;
use phaseplan_client::commands::project::CreateProjectArgs;
use phaseplan_client::commands::recurring::RecurringSetArgs;
use phaseplan_client::commands::{budget, phase, project, recurring, rule};
use phaseplan_client::{ClientResult, CommandOptions, SuccessEnvelope};

use crate::cli::{Cli, Commands, PhaseCommand, ProjectCommand, RecurringCommand, RuleCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    let options = CommandOptions {
        home_override: None,
        today: Some(Local::now().date_naive()),
    };
    dispatch_with_options(cli, options)
}

pub fn dispatch_with_options(cli: &Cli, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Project { command } => match command {
            ProjectCommand::Create {
                name,
                start,
                end,
                continuous,
                hours,
                json: _,
            } => project::create(
                &CreateProjectArgs {
                    name: name.clone(),
                    start: start.as_str().to_string(),
                    end: end.as_ref().map(|value| value.as_str().to_string()),
                    continuous: *continuous,
                    hours: *hours,
                },
                options,
            ),
            ProjectCommand::List { .. } => project::list(options),
            ProjectCommand::Show { project_id, .. } => project::show(project_id, options),
        },
        Commands::Phase { command } => match command {
            PhaseCommand::List { project_id, .. } => phase::list(project_id, options),
            PhaseCommand::Split {
                project_id,
                confirm,
                ..
            } => phase::split(project_id, *confirm, options),
            PhaseCommand::Add { project_id, .. } => phase::add(project_id, options),
            PhaseCommand::Move { phase_id, end, .. } => {
                phase::move_end(phase_id, end.as_str(), options)
            }
            PhaseCommand::Delete { phase_id, .. } => phase::delete(phase_id, options),
            PhaseCommand::Repair {
                project_id,
                dry_run,
                ..
            } => phase::repair(project_id, *dry_run, options),
            PhaseCommand::Validate { project_id, .. } => phase::validate(project_id, options),
        },
        Commands::Recurring { command } => match command {
            RecurringCommand::Set {
                project_id,
                kind,
                interval,
                day,
                monthly_date,
                week,
                hours,
                name,
                confirm,
                json: _,
            } => recurring::set(
                &RecurringSetArgs {
                    project_id: project_id.clone(),
                    kind: kind.clone(),
                    interval: *interval,
                    day: *day,
                    monthly_date: *monthly_date,
                    week: *week,
                    hours: *hours,
                    name: name.clone(),
                    confirm: *confirm,
                },
                options,
            ),
            RecurringCommand::Preview {
                project_id, max, ..
            } => recurring::preview(project_id, *max, options),
        },
        Commands::Rule { command } => match command {
            RuleCommand::Check { rule: text, .. } => rule::check(text),
            RuleCommand::Expand {
                rule: text,
                start,
                end,
                max,
                ..
            } => rule::expand(
                text,
                start.as_str(),
                end.as_ref().map(|value| value.as_str()),
                *max,
            ),
        },
        Commands::Budget { project_id, .. } => budget::run(project_id, options),
    }
}
