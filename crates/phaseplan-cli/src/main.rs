mod cli;
mod dispatch;
mod output;
mod stdout_io;

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use phaseplan_client::ClientError;
use stdout_io::write_stdout_text;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "PHASEPLAN_LOG";

const ROOT_HELP: &str = "Phaseplan - phase and recurrence planning for time-boxed projects

Usage:
  phaseplan <command>

Start here:
  phaseplan project create --help
  phaseplan project list
";

const TOP_LEVEL_HELP: &str = "Phaseplan - phase and recurrence planning for time-boxed projects

USAGE: phaseplan <command>

Set up a project:
  phaseplan project create --name <N> --start <D> --end <D> --hours <H>
  phaseplan project create --name <N> --start <D> --continuous --hours <H>
  phaseplan project list                              List projects and their mode
  phaseplan project show <project-id>                 Project, phases, and budget

Plan sequential phases:
  phaseplan phase split <project-id>                  Two phases, budget split in half
  phaseplan phase add <project-id>                    Append a phase at the project end
  phaseplan phase move <phase-id> --end <D>           Move an end date, shifting later phases
  phaseplan phase delete <phase-id>                   Remove one phase
  phaseplan phase validate <project-id>               Check overlaps, gaps, and budget
  phaseplan phase repair <project-id> [--dry-run]     Push overlapping starts forward

Plan recurring work instead:
  phaseplan recurring set <project-id> --type weekly --day 1 --hours 2
  phaseplan recurring preview <project-id>            List the template's dates

Work with rule strings directly:
  phaseplan rule check \"FREQ=WEEKLY;BYDAY=MO\"
  phaseplan rule expand \"FREQ=WEEKLY;BYDAY=MO\" --start 2026-01-01 --max 5

Budget:
  phaseplan budget <project-id>                       Allocated vs. estimated hours

Every command accepts --json. Set PHASEPLAN_HOME to choose the plan directory
and PHASEPLAN_LOG (e.g. `debug`) to see diagnostics on stderr.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let cli = match cli::Cli::try_parse() {
        Ok(value) => value,
        Err(err) => return handle_parse_error(&err, &raw_args),
    };
    let mode = output::mode_for_command(&cli.command);

    match dispatch::dispatch(&cli) {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::debug!(code = %error.code, "command failed");
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

fn handle_parse_error(err: &clap::Error, raw_args: &[String]) -> Result<ExitCode, ExitCode> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let text = if is_top_level_help_request(raw_args) {
                TOP_LEVEL_HELP.to_string()
            } else {
                err.to_string()
            };
            if write_stdout_text(&text).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        ErrorKind::DisplayVersion => {
            if write_stdout_text(&err.to_string()).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let command_hint = command_path_from_args(raw_args);
            let parse_error =
                ClientError::invalid_argument_for_command(&clean_message, command_hint.as_deref());
            let mode = infer_requested_output_mode(raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(ExitCode::from(1))
        }
    }
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Drops clap's trailing usage and "For more information" lines; the
/// "What to do next" block replaces them.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Command group and subcommand named on the command line, e.g. `phase move`.
fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let words = raw_args
        .iter()
        .skip(1)
        .filter(|value| !value.starts_with('-'))
        .map(String::as_str)
        .collect::<Vec<&str>>();

    let hint = match words.as_slice() {
        ["project", sub @ ("create" | "list" | "show"), ..]
        | ["phase", sub @ ("list" | "split" | "add" | "move" | "delete" | "repair" | "validate"), ..]
        | ["recurring", sub @ ("set" | "preview"), ..]
        | ["rule", sub @ ("check" | "expand"), ..] => format!("{} {sub}", words[0]),
        [group @ ("project" | "phase" | "recurring" | "rule" | "budget"), ..] => (*group).to_string(),
        _ => return None,
    };
    Some(hint)
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if error.is_internal() {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}

#[cfg(test)]
mod tests {
    use super::{command_path_from_args, strip_clap_boilerplate};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn command_hint_names_group_and_subcommand() {
        assert_eq!(
            command_path_from_args(&args(&["phaseplan", "phase", "move", "ph_1", "--end", "x"])),
            Some("phase move".to_string())
        );
        assert_eq!(
            command_path_from_args(&args(&["phaseplan", "budget", "--json"])),
            Some("budget".to_string())
        );
        assert_eq!(
            command_path_from_args(&args(&["phaseplan", "phase", "bogus"])),
            Some("phase".to_string())
        );
        assert_eq!(command_path_from_args(&args(&["phaseplan", "nope"])), None);
    }

    #[test]
    fn clap_usage_tail_is_removed() {
        let message = "error: unexpected argument '--bogus' found\n\nUsage: phaseplan budget <PROJECT_ID>\n\nFor more information, try '--help'.";
        assert_eq!(
            strip_clap_boilerplate(message),
            "error: unexpected argument '--bogus' found"
        );
    }
}
