//! Scenario files on disk: bundled samples and externally supplied tables.

use std::path::PathBuf;

use paws_core::data::DataTables;
use paws_core::events::MatchOutcome;
use paws_headless::{run_scenario, RunOptions, Scenario, ScenarioError};

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

// ============================================================================
// Bundled samples
// ============================================================================

mod bundled {
    use super::*;

    #[test]
    fn test_quad_opener_runs() {
        let mut scenario = Scenario::load(bundled("quad_opener.ron")).unwrap();
        assert_eq!(scenario.name, "Quad opener");
        scenario.max_duration_ms = 15_000;

        let report = run_scenario(scenario, &RunOptions::default()).unwrap();
        assert_eq!(report.level, "quad");
        assert_eq!(report.towers_placed, 2);
        assert!(report.enemies_spawned > 0);
    }

    #[test]
    fn test_custom_straight_uses_inline_data() {
        let scenario = Scenario::load(bundled("custom_straight.ron")).unwrap();
        assert_eq!(scenario.extra_enemies.len(), 1);

        let tables = scenario.tables().unwrap();
        assert!(tables.enemy("sprinter").is_some());
        let level = scenario.level_data(&tables).unwrap();
        assert_eq!(level.starting_resources, 400);

        let report = run_scenario(scenario, &RunOptions::default()).unwrap();
        assert_eq!(report.total_waves, 3);
        assert_eq!(report.spawns_dropped, 0);
        assert!(report.base_health <= 10);
    }
}

// ============================================================================
// Files written at test time
// ============================================================================

mod external {
    use super::*;

    #[test]
    fn test_relative_tables_file_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let tables = DataTables::builtin().to_ron_string().unwrap();
        std::fs::write(dir.path().join("tables.ron"), tables).unwrap();
        std::fs::write(
            dir.path().join("scenario.ron"),
            r#"(
                name: "External tables",
                level: Builtin("crossroads"),
                tables_file: Some("tables.ron"),
                max_duration_ms: 5000,
            )"#,
        )
        .unwrap();

        let scenario = Scenario::load(dir.path().join("scenario.ron")).unwrap();
        assert_eq!(scenario.tables_file, Some(dir.path().join("tables.ron")));
        assert_eq!(scenario.tables().unwrap(), DataTables::builtin());

        let report = run_scenario(scenario, &RunOptions::default()).unwrap();
        assert_eq!(report.outcome, MatchOutcome::InProgress);
        assert!(report.duration_ms >= 5000);
    }

    #[test]
    fn test_missing_tables_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("scenario.ron"),
            r#"(tables_file: Some("nope.ron"))"#,
        )
        .unwrap();

        let scenario = Scenario::load(dir.path().join("scenario.ron")).unwrap();
        let err = run_scenario(scenario, &RunOptions::default()).unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_malformed_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "(name: 12").unwrap();
        let err = Scenario::load(&path).unwrap_err();
        assert!(matches!(err, ScenarioError::ParseError(_)));
    }
}
