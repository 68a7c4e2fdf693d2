use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use ulid::Ulid;

use crate::schedule::date::{format_iso_datetime, parse_iso_datetime};
use crate::schedule::model::{Phase, PhaseUpdate, Project, RecurrenceConfig};
use crate::state::{map_sqlite_error, open_connection};
use crate::store::record::PhaseRecord;
use crate::store::{NewProject, PhaseBatch, PhaseRepository};
use crate::{ClientError, ClientResult};

const PHASE_COLUMNS: &str = "phase_id, project_id, name, start_date, end_date, due_date,
     time_allocation_hours, time_allocation, is_recurring, recurring_config";

const PROJECT_COLUMNS: &str =
    "project_id, name, start_date, end_date, continuous, estimated_hours";

pub struct SqliteRepository {
    connection: Connection,
    db_path: PathBuf,
}

impl SqliteRepository {
    /// Opens an already initialized plan store.
    pub fn open(db_path: &Path) -> ClientResult<Self> {
        Ok(Self {
            connection: open_connection(db_path)?,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn phase_rows(&self, sql: &str, key: &str) -> ClientResult<Vec<Phase>> {
        let mut statement = self
            .connection
            .prepare(sql)
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;
        let rows = statement
            .query_map([key], read_phase_record)
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;

        let mut phases = Vec::new();
        for row in rows {
            let record = row.map_err(|error| map_sqlite_error(&self.db_path, &error))?;
            phases.push(record.into_phase()?);
        }
        Ok(phases)
    }
}

impl PhaseRepository for SqliteRepository {
    fn create_project(&mut self, project: &NewProject) -> ClientResult<Project> {
        let project_id = format!("prj_{}", Ulid::new());
        let timestamp = now_timestamp();
        self.connection
            .execute(
                "INSERT INTO projects (
                    project_id,
                    name,
                    start_date,
                    end_date,
                    continuous,
                    estimated_hours,
                    created_at,
                    updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &project_id,
                    &project.name,
                    format_iso_datetime(&project.start_date),
                    project.end_date.as_ref().map(format_iso_datetime),
                    project.continuous,
                    project.estimated_hours,
                    &timestamp,
                    &timestamp
                ],
            )
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;

        tracing::info!(project_id = %project_id, name = %project.name, "created project");
        Ok(Project {
            id: project_id,
            name: project.name.clone(),
            start_date: project.start_date,
            end_date: project.end_date,
            continuous: project.continuous,
            estimated_hours: project.estimated_hours,
        })
    }

    fn get_project(&self, project_id: &str) -> ClientResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?1 LIMIT 1");
        let row = self
            .connection
            .query_row(&sql, [project_id], read_project_row)
            .optional()
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;
        row.map(|raw| raw.into_project(&self.db_path)).transpose()
    }

    fn list_projects(&self) -> ClientResult<Vec<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at, project_id");
        let mut statement = self
            .connection
            .prepare(&sql)
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;
        let rows = statement
            .query_map([], read_project_row)
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;

        let mut projects = Vec::new();
        for row in rows {
            let raw = row.map_err(|error| map_sqlite_error(&self.db_path, &error))?;
            projects.push(raw.into_project(&self.db_path)?);
        }
        Ok(projects)
    }

    fn update_project_end(&mut self, project_id: &str, end_date: NaiveDateTime) -> ClientResult<()> {
        let changed = self
            .connection
            .execute(
                "UPDATE projects SET end_date = ?2, updated_at = ?3 WHERE project_id = ?1",
                params![project_id, format_iso_datetime(&end_date), now_timestamp()],
            )
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;
        if changed == 0 {
            return Err(ClientError::project_not_found(project_id));
        }
        Ok(())
    }

    fn create(&mut self, phase: &Phase) -> ClientResult<Phase> {
        let timestamp = now_timestamp();
        let db_path = &self.db_path;
        let transaction = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        let created = insert_phase(&transaction, db_path, phase, &timestamp)?;
        transaction
            .commit()
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        Ok(created)
    }

    fn get(&self, phase_id: &str) -> ClientResult<Option<Phase>> {
        let sql = format!("SELECT {PHASE_COLUMNS} FROM phases WHERE phase_id = ?1 LIMIT 1");
        Ok(self.phase_rows(&sql, phase_id)?.into_iter().next())
    }

    fn update(&mut self, phase_id: &str, update: &PhaseUpdate) -> ClientResult<()> {
        update_phase(&self.connection, &self.db_path, phase_id, update, &now_timestamp())
    }

    fn delete(&mut self, phase_id: &str) -> ClientResult<()> {
        delete_phase(&self.connection, &self.db_path, phase_id)?;
        tracing::info!(phase_id, "deleted phase");
        Ok(())
    }

    fn list_by_project(&self, project_id: &str) -> ClientResult<Vec<Phase>> {
        let sql = format!(
            "SELECT {PHASE_COLUMNS} FROM phases
             WHERE project_id = ?1
             ORDER BY start_date IS NULL, start_date, COALESCE(end_date, due_date), phase_id"
        );
        self.phase_rows(&sql, project_id)
    }

    fn find_recurring_template(&self, project_id: &str) -> ClientResult<Option<Phase>> {
        let sql = format!(
            "SELECT {PHASE_COLUMNS} FROM phases
             WHERE project_id = ?1 AND is_recurring = 1
             ORDER BY created_at, phase_id
             LIMIT 1"
        );
        Ok(self.phase_rows(&sql, project_id)?.into_iter().next())
    }

    fn apply_batch(&mut self, batch: &PhaseBatch) -> ClientResult<Vec<Phase>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let timestamp = now_timestamp();
        let db_path = &self.db_path;
        let transaction = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        for phase_id in &batch.to_delete {
            delete_phase(&transaction, db_path, phase_id)?;
        }
        for (phase_id, update) in &batch.to_update {
            update_phase(&transaction, db_path, phase_id, update, &timestamp)?;
        }
        let mut created = Vec::with_capacity(batch.to_create.len());
        for phase in &batch.to_create {
            created.push(insert_phase(&transaction, db_path, phase, &timestamp)?);
        }
        if let Some(end_date) = batch.project_end {
            let changed = transaction
                .execute(
                    "UPDATE projects SET end_date = ?2, updated_at = ?3 WHERE project_id = ?1",
                    params![&batch.project_id, format_iso_datetime(&end_date), &timestamp],
                )
                .map_err(|error| map_sqlite_error(db_path, &error))?;
            if changed == 0 {
                return Err(ClientError::project_not_found(&batch.project_id));
            }
        }

        transaction
            .commit()
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        tracing::info!(
            project_id = %batch.project_id,
            deleted = batch.to_delete.len(),
            updated = batch.to_update.len(),
            created = created.len(),
            extended = batch.project_end.is_some(),
            "committed phase batch"
        );
        Ok(created)
    }
}

struct ProjectRow {
    project_id: String,
    name: String,
    start_date: String,
    end_date: Option<String>,
    continuous: bool,
    estimated_hours: f64,
}

impl ProjectRow {
    fn into_project(self, db_path: &Path) -> ClientResult<Project> {
        let start_date = parse_iso_datetime(&self.start_date)
            .ok_or_else(|| ClientError::store_corrupt(db_path))?;
        let end_date = match self.end_date.as_deref() {
            Some(value) => {
                Some(parse_iso_datetime(value).ok_or_else(|| ClientError::store_corrupt(db_path))?)
            }
            None => None,
        };
        Ok(Project {
            id: self.project_id,
            name: self.name,
            start_date,
            end_date,
            continuous: self.continuous,
            estimated_hours: self.estimated_hours,
        })
    }
}

fn read_project_row(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        project_id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        continuous: row.get(4)?,
        estimated_hours: row.get(5)?,
    })
}

fn read_phase_record(row: &Row<'_>) -> rusqlite::Result<PhaseRecord> {
    let config_text = row.get::<_, Option<String>>(9)?;
    let recurring_config = match config_text.as_deref() {
        Some(text) if !text.trim().is_empty() => {
            let parsed = serde_json::from_str::<RecurrenceConfig>(text).map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(error))
            })?;
            Some(parsed)
        }
        _ => None,
    };

    Ok(PhaseRecord {
        id: Some(row.get(0)?),
        project_id: row.get(1)?,
        name: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        due_date: row.get(5)?,
        time_allocation_hours: row.get(6)?,
        time_allocation: row.get(7)?,
        is_recurring: row.get(8)?,
        recurring_config,
    })
}

fn insert_phase(
    transaction: &Transaction<'_>,
    db_path: &Path,
    phase: &Phase,
    timestamp: &str,
) -> ClientResult<Phase> {
    let phase_id = format!("ph_{}", Ulid::new());
    let end_date = format_iso_datetime(&phase.end_date);
    let recurring_config = phase
        .recurring_config
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;

    // Legacy columns mirror the canonical ones for older readers.
    transaction
        .execute(
            "INSERT INTO phases (
                phase_id,
                project_id,
                name,
                start_date,
                end_date,
                due_date,
                time_allocation_hours,
                time_allocation,
                is_recurring,
                recurring_config,
                created_at,
                updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?6, ?7, ?8, ?9, ?9)",
            params![
                &phase_id,
                &phase.project_id,
                &phase.name,
                phase.start_date.as_ref().map(format_iso_datetime),
                &end_date,
                phase.time_allocation_hours,
                phase.is_recurring,
                recurring_config,
                timestamp
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    Ok(Phase {
        id: Some(phase_id),
        ..phase.clone()
    })
}

fn update_phase(
    connection: &Connection,
    db_path: &Path,
    phase_id: &str,
    update: &PhaseUpdate,
    timestamp: &str,
) -> ClientResult<()> {
    if update.is_empty() {
        return Ok(());
    }
    let changed = connection
        .execute(
            "UPDATE phases SET
                name = COALESCE(?2, name),
                start_date = COALESCE(?3, start_date),
                end_date = COALESCE(?4, end_date, due_date),
                due_date = COALESCE(?4, end_date, due_date),
                time_allocation_hours = COALESCE(?5, time_allocation_hours, time_allocation),
                time_allocation = COALESCE(?5, time_allocation_hours, time_allocation),
                updated_at = ?6
             WHERE phase_id = ?1",
            params![
                phase_id,
                update.name.as_deref(),
                update.start_date.as_ref().map(format_iso_datetime),
                update.end_date.as_ref().map(format_iso_datetime),
                update.time_allocation_hours,
                timestamp
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    if changed == 0 {
        return Err(ClientError::phase_not_found(phase_id));
    }
    Ok(())
}

fn delete_phase(connection: &Connection, db_path: &Path, phase_id: &str) -> ClientResult<()> {
    let changed = connection
        .execute("DELETE FROM phases WHERE phase_id = ?1", [phase_id])
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    if changed == 0 {
        return Err(ClientError::phase_not_found(phase_id));
    }
    Ok(())
}

fn now_timestamp() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH);
    match now {
        Ok(duration) => format!("{}", duration.as_millis()),
        Err(_) => "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use rusqlite::params;
    use tempfile::TempDir;

    use crate::schedule::date::parse_iso_datetime;
    use crate::schedule::model::{Phase, PhaseUpdate};
    use crate::setup::ensure_initialized_at;
    use crate::store::{NewProject, PhaseBatch, PhaseRepository};

    use super::SqliteRepository;

    fn at(value: &str) -> NaiveDateTime {
        let parsed = parse_iso_datetime(value);
        assert!(parsed.is_some());
        parsed.unwrap_or(NaiveDateTime::MIN)
    }

    fn open_repository() -> Option<(TempDir, SqliteRepository)> {
        let temp = tempfile::Builder::new()
            .prefix("phaseplan-store-")
            .tempdir_in("/tmp");
        assert!(temp.is_ok());
        let temp = temp.ok()?;
        let context = ensure_initialized_at(temp.path());
        assert!(context.is_ok());
        let repository = SqliteRepository::open(&context.ok()?.db_path);
        assert!(repository.is_ok());
        Some((temp, repository.ok()?))
    }

    fn new_project() -> NewProject {
        NewProject {
            name: "Launch".to_string(),
            start_date: at("2026-01-01"),
            end_date: Some(at("2026-01-31")),
            continuous: false,
            estimated_hours: 80.0,
        }
    }

    fn draft(project_id: &str, name: &str, start: &str, end: &str) -> Phase {
        Phase {
            id: None,
            project_id: project_id.to_string(),
            name: name.to_string(),
            start_date: Some(at(start)),
            end_date: at(end),
            time_allocation_hours: 10.0,
            is_recurring: false,
            recurring_config: None,
        }
    }

    #[test]
    fn phases_round_trip_in_start_order() {
        let Some((_temp, mut repository)) = open_repository() else {
            return;
        };
        let project = repository.create_project(&new_project());
        assert!(project.is_ok());
        let Ok(project) = project else {
            return;
        };
        assert!(project.id.starts_with("prj_"));

        let late = repository.create(&draft(&project.id, "Late", "2026-01-17", "2026-01-31"));
        let early = repository.create(&draft(&project.id, "Early", "2026-01-01", "2026-01-16"));
        assert!(late.is_ok() && early.is_ok());

        let listed = repository.list_by_project(&project.id);
        assert!(listed.is_ok());
        if let Ok(listed) = listed {
            let names = listed.iter().map(|phase| phase.name.as_str()).collect::<Vec<&str>>();
            assert_eq!(names, vec!["Early", "Late"]);
            assert!(listed.iter().all(|phase| phase.id.as_deref().is_some_and(|id| id.starts_with("ph_"))));
        }
        assert!(matches!(repository.find_recurring_template(&project.id), Ok(None)));
    }

    #[test]
    fn failed_batch_rolls_back_every_change() {
        let Some((_temp, mut repository)) = open_repository() else {
            return;
        };
        let Ok(project) = repository.create_project(&new_project()) else {
            return;
        };
        let Ok(existing) = repository.create(&draft(&project.id, "Only", "2026-01-01", "2026-01-31")) else {
            return;
        };

        let batch = PhaseBatch {
            to_update: vec![(
                existing.id.clone().unwrap_or_default(),
                PhaseUpdate {
                    end_date: Some(at("2026-01-20")),
                    ..PhaseUpdate::default()
                },
            )],
            to_delete: vec!["ph_missing".to_string()],
            ..PhaseBatch::for_project(&project.id)
        };
        let result = repository.apply_batch(&batch);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "phase_not_found");
        }

        let reloaded = repository.get(existing.id.as_deref().unwrap_or_default());
        assert!(matches!(reloaded, Ok(Some(ref phase)) if phase.end_date == at("2026-01-31")));
    }

    #[test]
    fn legacy_rows_are_read_through_the_adapter() {
        let Some((_temp, repository)) = open_repository() else {
            return;
        };
        let inserted = repository.connection.execute(
            "INSERT INTO projects (project_id, name, start_date, end_date, continuous, estimated_hours, created_at, updated_at)
             VALUES ('prj_legacy', 'Legacy', '2025-01-01T00:00:00', '2025-03-01T00:00:00', 0, 40, '0', '0')",
            [],
        );
        assert!(inserted.is_ok());
        let inserted = repository.connection.execute(
            "INSERT INTO phases (phase_id, project_id, name, start_date, due_date, time_allocation, is_recurring, created_at, updated_at)
             VALUES (?1, 'prj_legacy', 'Old phase', '2025-01-01T00:00:00', '2025-03-01T00:00:00', ?2, 0, '0', '0')",
            params!["ph_legacy", 12.0],
        );
        assert!(inserted.is_ok());

        let phase = repository.get("ph_legacy");
        assert!(matches!(
            phase,
            Ok(Some(ref phase)) if phase.time_allocation_hours == 12.0 && phase.end_date == at("2025-03-01")
        ));
    }
}
