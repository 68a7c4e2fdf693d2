use serde::Serialize;

use crate::schedule::budget::{BudgetAnalysis, ScheduleCheck};
use crate::schedule::model::{PhaseMode, RecurrenceConfig};
use crate::schedule::validator::{BudgetValidation, ExclusivityCheck};

#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub continuous: bool,
    pub estimated_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseView {
    pub id: Option<String>,
    pub project_id: String,
    pub name: String,
    pub kind: String,
    pub start_date: Option<String>,
    pub end_date: String,
    pub span_days: Option<i64>,
    pub time_allocation_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_config: Option<RecurrenceConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub project: ProjectView,
    pub mode: PhaseMode,
    pub phase_count: usize,
    pub total_allocated: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectListData {
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectData {
    pub project: ProjectView,
    pub mode: PhaseMode,
    pub phases: Vec<PhaseView>,
    pub budget: BudgetAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseListData {
    pub project: ProjectView,
    pub mode: PhaseMode,
    pub phases: Vec<PhaseView>,
}

/// Result of a committed phase mutation.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseChangeData {
    pub project_id: String,
    pub action: String,
    pub mode: PhaseMode,
    pub created: Vec<PhaseView>,
    pub updated: Vec<PhaseView>,
    pub deleted: Vec<String>,
    pub project_end_extended_to: Option<String>,
    pub phases: Vec<PhaseView>,
    pub warnings: Vec<String>,
    pub policy_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairView {
    pub phase_id: String,
    pub name: String,
    pub previous_start_date: Option<String>,
    pub start_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairData {
    pub project_id: String,
    pub dry_run: bool,
    pub applied: bool,
    pub repairs: Vec<RepairView>,
    pub remaining_errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationData {
    pub project_id: String,
    pub mode: PhaseMode,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub exclusivity: ExclusivityCheck,
    pub budget: BudgetValidation,
    pub policy_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceView {
    pub date: String,
    pub occurrence_number: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecurringSetData {
    pub project_id: String,
    pub template: PhaseView,
    pub rrule: String,
    pub from_mode: PhaseMode,
    pub deleted: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecurringPreviewData {
    pub project_id: String,
    pub template: PhaseView,
    pub rrule: String,
    pub occurrences: Vec<OccurrenceView>,
    pub occurrence_count: usize,
    pub hours_per_occurrence: f64,
    pub projected_hours: f64,
    pub budget_check: ScheduleCheck,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleCheckData {
    pub rule: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub normalized: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleExpandData {
    pub rule: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub start: String,
    pub end: Option<String>,
    pub max: Option<usize>,
    pub occurrences: Vec<OccurrenceView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecurringProjection {
    pub rrule: String,
    pub occurrence_count: usize,
    pub hours_per_occurrence: f64,
    pub projected_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetData {
    pub project: ProjectView,
    pub mode: PhaseMode,
    pub analysis: BudgetAnalysis,
    pub recurring_projection: Option<RecurringProjection>,
    pub policy_version: String,
}
