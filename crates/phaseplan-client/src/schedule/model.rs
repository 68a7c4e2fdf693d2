use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::schedule::date::day_difference;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub continuous: bool,
    pub estimated_hours: f64,
}

impl Project {
    /// End date that bounds phases, `None` for continuous projects.
    pub fn bounded_end(&self) -> Option<NaiveDateTime> {
        if self.continuous {
            return None;
        }
        self.end_date
    }
}

/// A time-bounded budget allocation, a recurring template, or (without a
/// start date) a deadline-only milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub project_id: String,
    pub name: String,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: NaiveDateTime,
    pub time_allocation_hours: f64,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_config: Option<RecurrenceConfig>,
}

impl Phase {
    pub fn is_phase(&self) -> bool {
        self.start_date.is_some()
    }

    pub fn is_milestone(&self) -> bool {
        self.start_date.is_none() && !self.is_recurring
    }

    pub fn span_days(&self) -> Option<i64> {
        self.start_date
            .map(|start| day_difference(start, self.end_date))
    }

    pub fn id_or_placeholder(&self) -> &str {
        self.id.as_deref().unwrap_or("(unsaved)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
    Unsupported(String),
}

impl RecurrenceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Unsupported(value) => value,
        }
    }
}

impl From<String> for RecurrenceType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<RecurrenceType> for String {
    fn from(value: RecurrenceType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MonthlyPatternKind {
    Date,
    DayOfWeek,
    Unsupported(String),
}

impl MonthlyPatternKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Date => "date",
            Self::DayOfWeek => "dayOfWeek",
            Self::Unsupported(value) => value,
        }
    }
}

impl From<String> for MonthlyPatternKind {
    fn from(value: String) -> Self {
        match value.trim() {
            "date" => Self::Date,
            "dayOfWeek" | "day_of_week" => Self::DayOfWeek,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<MonthlyPatternKind> for String {
    fn from(value: MonthlyPatternKind) -> Self {
        value.as_str().to_string()
    }
}

/// Declarative recurrence pattern of a recurring template.
///
/// Day-of-week fields use 0 = Sunday through 6 = Saturday. `rrule` holds a
/// previously generated rule string so it can be reused unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceConfig {
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, alias = "weeklyDayOfWeek", skip_serializing_if = "Option::is_none")]
    pub weekly_day_of_week: Option<u8>,
    #[serde(default, alias = "monthlyPattern", skip_serializing_if = "Option::is_none")]
    pub monthly_pattern: Option<MonthlyPatternKind>,
    #[serde(default, alias = "monthlyDate", skip_serializing_if = "Option::is_none")]
    pub monthly_date: Option<u8>,
    #[serde(default, alias = "monthlyWeekOfMonth", skip_serializing_if = "Option::is_none")]
    pub monthly_week_of_month: Option<u8>,
    #[serde(default, alias = "monthlyDayOfWeek", skip_serializing_if = "Option::is_none")]
    pub monthly_day_of_week: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrule: Option<String>,
}

fn default_interval() -> u32 {
    1
}

impl RecurrenceConfig {
    pub fn daily(interval: u32) -> Self {
        Self::of_kind(RecurrenceType::Daily, interval)
    }

    pub fn weekly(interval: u32, day_of_week: u8) -> Self {
        Self {
            weekly_day_of_week: Some(day_of_week),
            ..Self::of_kind(RecurrenceType::Weekly, interval)
        }
    }

    pub fn monthly_on_date(interval: u32, date: u8) -> Self {
        Self {
            monthly_pattern: Some(MonthlyPatternKind::Date),
            monthly_date: Some(date),
            ..Self::of_kind(RecurrenceType::Monthly, interval)
        }
    }

    pub fn monthly_on_weekday(interval: u32, week_of_month: u8, day_of_week: u8) -> Self {
        Self {
            monthly_pattern: Some(MonthlyPatternKind::DayOfWeek),
            monthly_week_of_month: Some(week_of_month),
            monthly_day_of_week: Some(day_of_week),
            ..Self::of_kind(RecurrenceType::Monthly, interval)
        }
    }

    fn of_kind(kind: RecurrenceType, interval: u32) -> Self {
        Self {
            kind,
            interval,
            weekly_day_of_week: None,
            monthly_pattern: None,
            monthly_date: None,
            monthly_week_of_month: None,
            monthly_day_of_week: None,
            rrule: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurrenceOccurrence {
    pub date: NaiveDateTime,
    pub occurrence_number: usize,
}

/// Result shape shared by the structural and business checks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CheckResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl CheckResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn valid() -> Self {
        Self::from_errors(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseMode {
    NoPhases,
    SplitPhases,
    RecurringTemplate,
}

impl PhaseMode {
    /// Mode of a phase list. A list mixing both roles reports
    /// `SplitPhases`; exclusivity checks flag such lists separately.
    pub fn of(phases: &[Phase]) -> Self {
        if phases.iter().any(Phase::is_phase) {
            return Self::SplitPhases;
        }
        if phases.iter().any(|phase| phase.is_recurring) {
            return Self::RecurringTemplate;
        }
        Self::NoPhases
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoPhases => "no_phases",
            Self::SplitPhases => "split_phases",
            Self::RecurringTemplate => "recurring_template",
        }
    }
}

/// Partial update of one persisted phase. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_allocation_hours: Option<f64>,
}

impl PhaseUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.time_allocation_hours.is_none()
    }

    pub fn apply_to(&self, phase: &mut Phase) {
        if let Some(name) = &self.name {
            phase.name = name.clone();
        }
        if let Some(start) = self.start_date {
            phase.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            phase.end_date = end;
        }
        if let Some(hours) = self.time_allocation_hours {
            phase.time_allocation_hours = hours;
        }
    }
}

/// Destructive switch between split phases and a recurring template:
/// delete every listed record, then create the new structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSwitchPlan {
    pub from_mode: PhaseMode,
    pub to_mode: PhaseMode,
    pub to_delete: Vec<String>,
    pub to_create: Vec<Phase>,
}

impl ModeSwitchPlan {
    pub fn is_destructive(&self) -> bool {
        !self.to_delete.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MonthlyPatternKind, Phase, PhaseMode, RecurrenceConfig, RecurrenceType};

    fn phase_from(value: serde_json::Value) -> Option<Phase> {
        let parsed = serde_json::from_value::<Phase>(value);
        assert!(parsed.is_ok());
        parsed.ok()
    }

    #[test]
    fn recurrence_config_reads_camel_case_records() {
        let parsed = serde_json::from_value::<RecurrenceConfig>(json!({
            "type": "monthly",
            "interval": 2,
            "monthlyPattern": "dayOfWeek",
            "monthlyWeekOfMonth": 2,
            "monthlyDayOfWeek": 1
        }));
        assert!(parsed.is_ok());
        if let Ok(config) = parsed {
            assert_eq!(config.kind, RecurrenceType::Monthly);
            assert_eq!(config.monthly_pattern, Some(MonthlyPatternKind::DayOfWeek));
            assert_eq!(config.monthly_week_of_month, Some(2));
            assert_eq!(config, RecurrenceConfig::monthly_on_weekday(2, 2, 1));
        }
    }

    #[test]
    fn unknown_recurrence_type_is_kept_for_validation() {
        let parsed = serde_json::from_value::<RecurrenceConfig>(json!({ "type": "yearly" }));
        assert!(parsed.is_ok());
        if let Ok(config) = parsed {
            assert_eq!(config.kind, RecurrenceType::Unsupported("yearly".to_string()));
            assert_eq!(config.interval, 1);
        }
    }

    #[test]
    fn mode_follows_phase_roles() {
        let split = phase_from(json!({
            "project_id": "prj_1",
            "name": "Phase 1",
            "start_date": "2026-01-01T00:00:00",
            "end_date": "2026-01-16T00:00:00",
            "time_allocation_hours": 40.0
        }));
        let template = phase_from(json!({
            "project_id": "prj_1",
            "name": "Weekly sync",
            "start_date": null,
            "end_date": "2026-01-31T00:00:00",
            "time_allocation_hours": 2.0,
            "is_recurring": true
        }));
        if let (Some(split), Some(template)) = (split, template) {
            assert_eq!(PhaseMode::of(&[]), PhaseMode::NoPhases);
            assert_eq!(PhaseMode::of(std::slice::from_ref(&template)), PhaseMode::RecurringTemplate);
            assert_eq!(PhaseMode::of(&[split.clone()]), PhaseMode::SplitPhases);
            assert!(split.is_phase());
            assert!(!template.is_milestone());
            assert_eq!(split.span_days(), Some(15));
        }
    }
}
