use crate::cli::{Commands, PhaseCommand, ProjectCommand, RecurringCommand, RuleCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    let json = match command {
        Commands::Project { command } => match command {
            ProjectCommand::Create { json, .. }
            | ProjectCommand::List { json }
            | ProjectCommand::Show { json, .. } => *json,
        },
        Commands::Phase { command } => match command {
            PhaseCommand::List { json, .. }
            | PhaseCommand::Split { json, .. }
            | PhaseCommand::Add { json, .. }
            | PhaseCommand::Move { json, .. }
            | PhaseCommand::Delete { json, .. }
            | PhaseCommand::Repair { json, .. }
            | PhaseCommand::Validate { json, .. } => *json,
        },
        Commands::Recurring { command } => match command {
            RecurringCommand::Set { json, .. } | RecurringCommand::Preview { json, .. } => *json,
        },
        Commands::Rule { command } => match command {
            RuleCommand::Check { json, .. } | RuleCommand::Expand { json, .. } => *json,
        },
        Commands::Budget { json, .. } => *json,
    };
    if json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}

#[cfg(test)]
mod tests {
    use super::{OutputMode, mode_for_command};
    use crate::cli::parse_from;

    #[test]
    fn json_flag_selects_json_mode() {
        let cases: [&[&str]; 4] = [
            &["phaseplan", "project", "list", "--json"],
            &["phaseplan", "phase", "repair", "prj_1", "--dry-run", "--json"],
            &["phaseplan", "recurring", "preview", "prj_1", "--json"],
            &["phaseplan", "budget", "prj_1", "--json"],
        ];
        for args in cases {
            let parsed = parse_from(args);
            assert!(parsed.is_ok());
            if let Ok(cli) = parsed {
                assert_eq!(mode_for_command(&cli.command), OutputMode::Json);
            }
        }
    }

    #[test]
    fn text_is_the_default_mode() {
        let parsed = parse_from(["phaseplan", "rule", "check", "FREQ=DAILY"]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            assert_eq!(mode_for_command(&cli.command), OutputMode::Text);
        }
    }
}
