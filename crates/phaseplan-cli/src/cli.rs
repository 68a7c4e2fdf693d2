use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoDate(pub String);

impl IsoDate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn parse_iso_date(value: &str) -> Result<IsoDate, String> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && [0usize, 1, 2, 3, 5, 6, 8, 9]
            .iter()
            .all(|index| bytes[*index].is_ascii_digit());
    if !shaped {
        return Err("date must use YYYY-MM-DD format".to_string());
    }
    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        return Err("date must use valid calendar values".to_string());
    }
    Ok(IsoDate(value.to_string()))
}

pub const RECURRING_SET_AFTER_HELP: &str = "\
Patterns:
  --type daily                              Every <interval> days
  --type weekly --day <0-6>                 Every <interval> weeks on one weekday
  --type monthly --date <1-31>              Every <interval> months on a day of month
  --type monthly --week <1-5> --day <0-6>   Every <interval> months on the Nth weekday
                                            (week 5 skips months without a fifth one)

  Days are numbered 0 = Sunday .. 6 = Saturday.
  Months without the requested date are skipped, never clamped.

Switching modes:
  A project holds either split phases or one recurring template.
  Replacing existing phases deletes them with their allocations, so the
  command refuses until you rerun it with --confirm.
";

#[derive(Debug, Parser)]
#[command(
    name = "phaseplan",
    version,
    about = "phase and recurrence planning for time-boxed projects",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create and inspect projects
    #[command(arg_required_else_help = true)]
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Split, extend, move, and validate sequential phases
    #[command(arg_required_else_help = true)]
    Phase {
        #[command(subcommand)]
        command: PhaseCommand,
    },
    /// Manage a project's recurring work template
    #[command(arg_required_else_help = true)]
    Recurring {
        #[command(subcommand)]
        command: RecurringCommand,
    },
    /// Check or expand recurrence rule strings without a project
    #[command(arg_required_else_help = true)]
    Rule {
        #[command(subcommand)]
        command: RuleCommand,
    },
    /// Compare allocated hours with the project estimate
    Budget {
        project_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Create a project with a date window and hour estimate
    Create {
        /// Project name
        #[arg(long)]
        name: String,
        /// First day of the project (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        start: IsoDate,
        /// Last day of the project (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        end: Option<IsoDate>,
        /// Open-ended project without an end date
        #[arg(long)]
        continuous: bool,
        /// Estimated hours for the whole project
        #[arg(long)]
        hours: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List projects with their phase mode
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one project with its phases and budget
    Show {
        project_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum PhaseCommand {
    /// List a project's phases
    List {
        project_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the project's phases with an even two-phase split
    Split {
        project_id: String,
        /// Allow deleting existing phases or a recurring template
        #[arg(long)]
        confirm: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Append a phase at the end of the project
    Add {
        project_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a phase end date and shift the phases after it
    Move {
        phase_id: String,
        /// New end date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        end: IsoDate,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete one phase
    Delete {
        phase_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push overlapping phase starts past the previous phase end
    Repair {
        project_id: String,
        /// Report repairs without writing them
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the project's phase set
    Validate {
        project_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum RecurringCommand {
    /// Create or replace the project's recurring template
    #[command(after_long_help = RECURRING_SET_AFTER_HELP)]
    Set {
        project_id: String,
        /// daily, weekly, or monthly
        #[arg(long = "type")]
        kind: String,
        /// Repeat every N days, weeks, or months
        #[arg(long, default_value_t = 1)]
        interval: u32,
        /// Weekday 0-6 (0 = Sunday)
        #[arg(long)]
        day: Option<u8>,
        /// Day of month 1-31 for monthly patterns
        #[arg(long = "date")]
        monthly_date: Option<u8>,
        /// Week of month 1-5 for monthly weekday patterns
        #[arg(long)]
        week: Option<u8>,
        /// Hours per occurrence
        #[arg(long)]
        hours: f64,
        /// Template name
        #[arg(long)]
        name: Option<String>,
        /// Allow deleting existing phases or an older template
        #[arg(long)]
        confirm: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the template's occurrences inside the project window
    Preview {
        project_id: String,
        /// Stop after this many occurrences
        #[arg(long)]
        max: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum RuleCommand {
    /// Check a rule string and print its canonical form
    Check {
        rule: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Expand a rule string into dates
    Expand {
        rule: String,
        /// First day to expand from (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        start: IsoDate,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        end: Option<IsoDate>,
        /// Stop after this many occurrences
        #[arg(long)]
        max: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}
