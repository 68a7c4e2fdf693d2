mod support;

use phaseplan_client::CommandOptions;
use phaseplan_client::commands::{phase, project};
use serde_json::Value;
use support::testkit::{
    create_project, field, payload, phase_id_named, phase_rows, temp_home_in_tmp,
};

fn day(value: &str) -> &str {
    value.get(..10).unwrap_or(value)
}

#[test]
fn split_then_add_keeps_phases_contiguous() {
    let temp = temp_home_in_tmp("phaseplan-flow-split");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let options = CommandOptions::at_home(&home);
        let project_id = create_project(&home, "2026-01-01", Some("2026-01-31"), 80.0);

        let split = payload(phase::split(&project_id, false, options));
        let rows = phase_rows(&split);
        assert_eq!(rows.len(), 2);
        assert_eq!(day(field(&rows[0], "start_date")), "2026-01-01");
        assert_eq!(day(field(&rows[0], "end_date")), "2026-01-16");
        assert_eq!(day(field(&rows[1], "start_date")), "2026-01-17");
        assert_eq!(rows[0]["time_allocation_hours"], Value::from(40.0));
        assert_eq!(rows[1]["time_allocation_hours"], Value::from(40.0));
        assert_eq!(split["data"]["mode"], Value::String("split_phases".to_string()));

        let added = payload(phase::add(&project_id, options));
        let rows = phase_rows(&added);
        assert_eq!(rows.len(), 3);
        assert_eq!(field(&rows[2], "name"), "Phase 3");
        assert_eq!(day(field(&rows[1], "end_date")), "2026-01-30");
        assert_eq!(day(field(&rows[2], "start_date")), "2026-01-31");
        assert_eq!(day(field(&rows[2], "end_date")), "2026-01-31");
        assert_eq!(rows[2]["time_allocation_hours"], Value::from(0.0));

        let validation = payload(phase::validate(&project_id, options));
        assert_eq!(validation["data"]["is_valid"], Value::Bool(true));
        assert_eq!(validation["data"]["budget"]["is_valid"], Value::Bool(true));
    }
}

#[test]
fn moving_an_end_cascades_and_extends_the_project() {
    let temp = temp_home_in_tmp("phaseplan-flow-move");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let options = CommandOptions::at_home(&home);
        let project_id = create_project(&home, "2026-01-01", Some("2026-01-31"), 80.0);
        let _ = payload(phase::split(&project_id, false, options));
        let added = payload(phase::add(&project_id, options));
        let first_id = phase_id_named(&added, "Phase 1");
        assert!(!first_id.is_empty());

        let moved = payload(phase::move_end(&first_id, "2026-01-20", options));
        assert_eq!(
            moved["data"]["project_end_extended_to"],
            Value::String("2026-02-04T00:00:00".to_string())
        );
        let rows = phase_rows(&moved);
        assert_eq!(day(field(&rows[0], "end_date")), "2026-01-20");
        assert_eq!(day(field(&rows[1], "start_date")), "2026-01-21");
        assert_eq!(day(field(&rows[1], "end_date")), "2026-02-03");
        assert_eq!(day(field(&rows[2], "start_date")), "2026-02-04");

        let shown = payload(project::show(&project_id, options));
        assert_eq!(
            shown["data"]["project"]["end_date"],
            Value::String("2026-02-04T00:00:00".to_string())
        );

        let validation = payload(phase::validate(&project_id, options));
        assert_eq!(validation["data"]["is_valid"], Value::Bool(true));
    }
}

#[test]
fn moving_before_the_phase_start_is_rejected() {
    let temp = temp_home_in_tmp("phaseplan-flow-move-invalid");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let options = CommandOptions::at_home(&home);
        let project_id = create_project(&home, "2026-01-01", Some("2026-01-31"), 80.0);
        let split = payload(phase::split(&project_id, false, options));
        let second_id = phase_id_named(&split, "Phase 2");

        let result = phase::move_end(&second_id, "2026-01-10", options);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "invalid_argument");
        }
    }
}

#[test]
fn add_without_phases_reports_nothing_to_shrink() {
    let temp = temp_home_in_tmp("phaseplan-flow-empty-add");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let project_id = create_project(&home, "2026-01-01", Some("2026-01-31"), 80.0);
        let result = phase::add(&project_id, CommandOptions::at_home(&home));
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "no_phases_to_shrink");
        }
    }
}

#[test]
fn delete_reports_the_gap_it_leaves() {
    let temp = temp_home_in_tmp("phaseplan-flow-delete");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let options = CommandOptions::at_home(&home);
        let project_id = create_project(&home, "2026-01-01", Some("2026-01-31"), 80.0);
        let _ = payload(phase::split(&project_id, false, options));
        let added = payload(phase::add(&project_id, options));
        let second_id = phase_id_named(&added, "Phase 2");

        let deleted = payload(phase::delete(&second_id, options));
        assert_eq!(phase_rows(&deleted).len(), 2);
        let warnings = deleted["data"]["warnings"].as_array().cloned().unwrap_or_default();
        assert!(
            warnings
                .iter()
                .any(|warning| warning.as_str().is_some_and(|text| text.contains("gap")))
        );

        let missing = phase::delete(&second_id, options);
        assert!(missing.is_err());
        if let Err(error) = missing {
            assert_eq!(error.code, "phase_not_found");
        }
    }
}

#[test]
fn unknown_project_ids_are_reported() {
    let temp = temp_home_in_tmp("phaseplan-flow-unknown");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let result = phase::list("prj_missing", CommandOptions::at_home(&home));
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "project_not_found");
            assert!(!error.is_internal());
        }
    }
}
