use serde::Deserialize;

use crate::schedule::date::parse_iso_datetime;
use crate::schedule::model::{Phase, RecurrenceConfig};
use crate::{ClientError, ClientResult};

/// Phase as stored, before normalization. Older records carry
/// `due_date`/`time_allocation` instead of `end_date`/`time_allocation_hours`;
/// both spellings are read here and nowhere else.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhaseRecord {
    #[serde(default, alias = "phaseId")]
    pub id: Option<String>,
    #[serde(alias = "projectId")]
    pub project_id: String,
    pub name: String,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<String>,
    #[serde(default, alias = "timeAllocationHours")]
    pub time_allocation_hours: Option<f64>,
    #[serde(default, alias = "timeAllocation")]
    pub time_allocation: Option<f64>,
    #[serde(default, alias = "isRecurring")]
    pub is_recurring: bool,
    #[serde(default, alias = "recurringConfig")]
    pub recurring_config: Option<RecurrenceConfig>,
}

impl PhaseRecord {
    pub fn into_phase(self) -> ClientResult<Phase> {
        let record_id = self.id.clone().unwrap_or_else(|| self.name.clone());

        let start_date = match self.start_date.as_deref().filter(|value| !value.trim().is_empty()) {
            Some(value) => Some(parse_iso_datetime(value).ok_or_else(|| {
                ClientError::store_record_invalid(&record_id, &format!("bad start date `{value}`"))
            })?),
            None => None,
        };

        let Some(end_text) = self.end_date.or(self.due_date) else {
            return Err(ClientError::store_record_invalid(&record_id, "missing end date"));
        };
        let end_date = parse_iso_datetime(&end_text).ok_or_else(|| {
            ClientError::store_record_invalid(&record_id, &format!("bad end date `{end_text}`"))
        })?;

        let time_allocation_hours = self
            .time_allocation_hours
            .or(self.time_allocation)
            .unwrap_or(0.0);

        Ok(Phase {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            start_date,
            end_date,
            time_allocation_hours,
            is_recurring: self.is_recurring,
            recurring_config: self.recurring_config,
        })
    }
}
