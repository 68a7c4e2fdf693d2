use crate::commands::common::{
    CommandOptions, load_project, open_repository, parse_hours, phase_views, project_view,
};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{ProjectData, ProjectListData, ProjectSummary};
use crate::schedule::budget::{analyze, total_allocation};
use crate::schedule::date::parse_iso_argument;
use crate::schedule::model::PhaseMode;
use crate::store::{NewProject, PhaseRepository};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Default)]
pub struct CreateProjectArgs {
    pub name: String,
    pub start: String,
    pub end: Option<String>,
    pub continuous: bool,
    pub hours: f64,
}

pub fn create(args: &CreateProjectArgs, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let command = "project create";
    let name = args.name.trim();
    if name.is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            "Project name must not be empty.",
            Some(command),
        ));
    }
    let start_date = parse_iso_argument(&args.start, "--start", command)?;
    let estimated_hours = parse_hours(args.hours, "--hours", command)?;

    let end_date = match (args.end.as_deref(), args.continuous) {
        (Some(_), true) => {
            return Err(ClientError::invalid_argument_for_command(
                "Use either `--end` or `--continuous`, not both.",
                Some(command),
            ));
        }
        (None, false) => {
            return Err(ClientError::invalid_argument_for_command(
                "A project needs `--end <date>` unless it is `--continuous`.",
                Some(command),
            ));
        }
        (Some(end), false) => {
            let end_date = parse_iso_argument(end, "--end", command)?;
            if end_date <= start_date {
                return Err(ClientError::invalid_argument_for_command(
                    "`--end` must be after `--start`.",
                    Some(command),
                ));
            }
            Some(end_date)
        }
        (None, true) => None,
    };

    let mut repository = open_repository(options.home_override)?;
    let project = repository.create_project(&NewProject {
        name: name.to_string(),
        start_date,
        end_date,
        continuous: args.continuous,
        estimated_hours,
    })?;

    success(
        command,
        ProjectData {
            project: project_view(&project),
            mode: PhaseMode::NoPhases,
            phases: Vec::new(),
            budget: analyze(&[], project.estimated_hours),
        },
    )
}

pub fn list(options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let repository = open_repository(options.home_override)?;
    let mut projects = Vec::new();
    for project in repository.list_projects()? {
        let phases = repository.list_by_project(&project.id)?;
        projects.push(ProjectSummary {
            project: project_view(&project),
            mode: PhaseMode::of(&phases),
            phase_count: phases.len(),
            total_allocated: total_allocation(&phases),
        });
    }
    success("project list", ProjectListData { projects })
}

pub fn show(project_id: &str, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let repository = open_repository(options.home_override)?;
    let project = load_project(&repository, project_id)?;
    let phases = repository.list_by_project(project_id)?;
    success(
        "project show",
        ProjectData {
            project: project_view(&project),
            mode: PhaseMode::of(&phases),
            phases: phase_views(&phases),
            budget: analyze(&phases, project.estimated_hours),
        },
    )
}
