use std::fs;
use std::path::{Path, PathBuf};

use phaseplan_client::commands::project::{self, CreateProjectArgs};
use phaseplan_client::{ClientResult, CommandOptions, SuccessEnvelope};
use serde_json::Value;
use tempfile::{Builder, TempDir};

pub fn temp_home_in_tmp(prefix: &str) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = Builder::new().prefix(prefix).tempdir_in("/tmp")?;
    let home = dir.path().join("plan-home");
    fs::create_dir_all(&home)?;
    Ok((dir, home))
}

/// Envelope as JSON, or `Value::Null` after a failed assertion.
pub fn payload(result: ClientResult<SuccessEnvelope>) -> Value {
    assert!(result.is_ok(), "command failed: {:?}", result.as_ref().err());
    if let Ok(success) = result {
        let value = serde_json::to_value(success);
        assert!(value.is_ok());
        if let Ok(value) = value {
            return value;
        }
    }
    Value::Null
}

pub fn create_project(home: &Path, start: &str, end: Option<&str>, hours: f64) -> String {
    let envelope = payload(project::create(
        &CreateProjectArgs {
            name: "Launch".to_string(),
            start: start.to_string(),
            end: end.map(str::to_string),
            continuous: end.is_none(),
            hours,
        },
        CommandOptions::at_home(home),
    ));
    envelope["data"]["project"]["id"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_default()
}

pub fn phase_rows(envelope: &Value) -> Vec<Value> {
    envelope["data"]["phases"].as_array().cloned().unwrap_or_default()
}

pub fn field<'a>(row: &'a Value, key: &str) -> &'a str {
    row[key].as_str().unwrap_or_default()
}

pub fn phase_id_named(envelope: &Value, name: &str) -> String {
    phase_rows(envelope)
        .iter()
        .find(|row| field(row, "name") == name)
        .map(|row| field(row, "id").to_string())
        .unwrap_or_default()
}
