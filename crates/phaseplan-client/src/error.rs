use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `phaseplan {cmd} --help` for usage."),
            None => "Run `phaseplan --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn project_not_found(project_id: &str) -> Self {
        Self::new(
            "project_not_found",
            &format!("Project id `{project_id}` was not found."),
            vec![
                "Run `phaseplan project list` to find a valid project id.".to_string(),
            ],
        )
        .with_data(json!({
            "project_id": project_id,
        }))
    }

    pub fn phase_not_found(phase_id: &str) -> Self {
        Self::new(
            "phase_not_found",
            &format!("Phase id `{phase_id}` was not found."),
            vec!["Run `phaseplan phase list <project-id>` to find a valid phase id.".to_string()],
        )
        .with_data(json!({
            "phase_id": phase_id,
        }))
    }

    pub fn recurring_template_not_found(project_id: &str) -> Self {
        Self::new(
            "recurring_template_not_found",
            &format!("Project `{project_id}` has no recurring template."),
            vec![format!(
                "Run `phaseplan recurring set {project_id} --type weekly --hours <H>` to create one."
            )],
        )
        .with_data(json!({
            "project_id": project_id,
        }))
    }

    pub fn no_phases_to_shrink() -> Self {
        Self::new(
            "no_phases_to_shrink",
            "Cannot add a phase: the project has no existing phases to make room from.",
            vec!["Run `phaseplan phase split <project-id>` to create the first two phases.".to_string()],
        )
    }

    pub fn phase_too_short_to_shrink(phase_name: &str) -> Self {
        Self::new(
            "phase_too_short_to_shrink",
            &format!("Phase `{phase_name}` is too short to give up days for a new phase."),
            vec!["Move the phase start earlier or extend the project end date first.".to_string()],
        )
    }

    pub fn invalid_recurrence(errors: Vec<String>) -> Self {
        Self::new(
            "invalid_recurrence",
            "Recurrence configuration is not valid.",
            vec![
                "Fix the listed recurrence fields and retry.".to_string(),
                "Run `phaseplan recurring set --help` for the supported patterns.".to_string(),
            ],
        )
        .with_data(json!({
            "errors": errors,
        }))
    }

    pub fn phase_set_invalid(errors: Vec<String>) -> Self {
        let count = errors.len();
        Self::new(
            "phase_set_invalid",
            &format!("The resulting phase set failed validation with {count} error(s). Nothing was written."),
            vec![
                "Run `phaseplan phase validate <project-id>` to inspect the current phases.".to_string(),
                "Run `phaseplan phase repair <project-id>` to fix overlapping phases.".to_string(),
            ],
        )
        .with_data(json!({
            "errors": errors,
        }))
    }

    pub fn mode_switch_requires_confirmation(to_delete: usize, plan: Value) -> Self {
        Self::new(
            "mode_switch_requires_confirmation",
            &format!(
                "Replacing the current phase structure deletes {to_delete} existing phase record(s) and their allocations."
            ),
            vec!["Rerun the same command with `--confirm` to apply the switch.".to_string()],
        )
        .with_data(json!({
            "plan": plan,
        }))
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn store_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_permission_denied",
            &format!("Cannot open plan store at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `PHASEPLAN_HOME` to a writable directory."
            )],
        )
    }

    pub fn store_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_locked",
            &format!("Plan database is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn store_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_corrupt",
            &format!("Plan database appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid SQLite plan file or restore from backup."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Plan store migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn store_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_failed",
            &format!("Plan store initialization failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }

    pub fn store_record_invalid(record_id: &str, detail: &str) -> Self {
        Self::new(
            "store_record_invalid",
            &format!("Stored phase record `{record_id}` cannot be read: {detail}"),
            vec!["Restore the plan database from a backup or fix the record with a SQLite client.".to_string()],
        )
        .with_data(json!({
            "record_id": record_id,
        }))
    }

    pub fn is_internal(&self) -> bool {
        self.code.starts_with("internal_")
            || matches!(
                self.code.as_str(),
                "store_permission_denied"
                    | "store_locked"
                    | "store_corrupt"
                    | "store_record_invalid"
                    | "migration_failed"
                    | "store_init_failed"
            )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
