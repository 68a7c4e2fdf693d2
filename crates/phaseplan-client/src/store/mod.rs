mod record;
mod sqlite;

use chrono::NaiveDateTime;

use crate::ClientResult;
use crate::schedule::model::{ModeSwitchPlan, Phase, PhaseUpdate, Project};

pub use record::PhaseRecord;
pub use sqlite::SqliteRepository;

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub continuous: bool,
    pub estimated_hours: f64,
}

/// One atomic change set for a project. Deletes run first, then updates,
/// then inserts, then the optional project end extension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseBatch {
    pub project_id: String,
    pub to_delete: Vec<String>,
    pub to_update: Vec<(String, PhaseUpdate)>,
    pub to_create: Vec<Phase>,
    pub project_end: Option<NaiveDateTime>,
}

impl PhaseBatch {
    pub fn for_project(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty()
            && self.to_update.is_empty()
            && self.to_create.is_empty()
            && self.project_end.is_none()
    }
}

/// Persistence collaborator for projects and phases. Multi-row changes go
/// through [`PhaseRepository::apply_batch`] and commit or roll back as a unit.
pub trait PhaseRepository {
    fn create_project(&mut self, project: &NewProject) -> ClientResult<Project>;

    fn get_project(&self, project_id: &str) -> ClientResult<Option<Project>>;

    fn list_projects(&self) -> ClientResult<Vec<Project>>;

    fn update_project_end(&mut self, project_id: &str, end_date: NaiveDateTime) -> ClientResult<()>;

    /// Persists a new phase and returns it with its assigned id.
    fn create(&mut self, phase: &Phase) -> ClientResult<Phase>;

    fn get(&self, phase_id: &str) -> ClientResult<Option<Phase>>;

    fn update(&mut self, phase_id: &str, update: &PhaseUpdate) -> ClientResult<()>;

    fn delete(&mut self, phase_id: &str) -> ClientResult<()>;

    /// Phases ordered by start date, then end date. Milestones and
    /// templates come last.
    fn list_by_project(&self, project_id: &str) -> ClientResult<Vec<Phase>>;

    /// Applies the batch in one transaction and returns the created phases.
    fn apply_batch(&mut self, batch: &PhaseBatch) -> ClientResult<Vec<Phase>>;

    fn find_recurring_template(&self, project_id: &str) -> ClientResult<Option<Phase>> {
        Ok(self
            .list_by_project(project_id)?
            .into_iter()
            .find(|phase| phase.is_recurring))
    }

    fn apply_plan(&mut self, project_id: &str, plan: &ModeSwitchPlan) -> ClientResult<Vec<Phase>> {
        self.apply_batch(&PhaseBatch {
            to_delete: plan.to_delete.clone(),
            to_create: plan.to_create.clone(),
            ..PhaseBatch::for_project(project_id)
        })
    }

    fn apply_updates(
        &mut self,
        project_id: &str,
        updates: Vec<(String, PhaseUpdate)>,
    ) -> ClientResult<()> {
        self.apply_batch(&PhaseBatch {
            to_update: updates,
            ..PhaseBatch::for_project(project_id)
        })
        .map(|_| ())
    }
}
