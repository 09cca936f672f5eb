//! File-backed stores reopened across manager sessions.

use tablemap_core::{Manager, ManagerConfig, TableObject};
use tempfile::tempdir;

use super::helpers::{init_tracing, widget, Widget, WidgetV2};

#[test]
fn test_new_property_migrates_existing_rows() {
    init_tracing();
    let dir = tempdir().unwrap();
    let config = ManagerConfig::with_path(dir.path().join("widgets.sqlite"));

    {
        let manager = Manager::open(config.clone()).unwrap();
        manager.register::<Widget>().unwrap();
        let mut widgets: Vec<Widget> = (0..50)
            .map(|i| widget(&format!("w{:02}", i), &["t"]))
            .collect();
        manager.save_all(&mut widgets).unwrap();
    }

    let manager = Manager::open(config).unwrap();
    let report = manager.register::<WidgetV2>().unwrap();
    assert!(report.is_ok(), "{:?}", report.failures);
    assert!(!report.created_table);
    assert_eq!(
        report.statements.first().map(String::as_str),
        Some("ALTER TABLE Widget ADD COLUMN priority Integer")
    );
    assert_eq!(report.added_columns, vec!["priority"]);

    let rows = manager.all_instances::<WidgetV2>().unwrap();
    assert_eq!(rows.len(), 50);
    assert!(rows.iter().all(|w| w.priority == 0));
    assert!(rows.iter().all(|w| w.tags == vec!["t"]));

    let mut first = rows[0].clone();
    first.priority = 7;
    manager.save(&mut first).unwrap();
    let reread: WidgetV2 = manager.fetch_by_id(first.meta.id).unwrap().unwrap();
    assert_eq!(reread.priority, 7);
}

#[test]
fn test_version_marker_survives_reopen() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempdir()?;
    let config = ManagerConfig::with_path(dir.path().join("versioned.sqlite"));

    {
        let manager = Manager::open(config.clone())?;
        manager.set_current_version(1.5)?;
    }

    let manager = Manager::open(config)?;
    assert_eq!(manager.has_latest_version(1.0)?, (true, 1.5));
    assert_eq!(manager.has_latest_version(2.0)?, (false, 1.5));
    assert_eq!(manager.count_for_table(tablemap_core::DbVersion::TABLE)?, 1);
    Ok(())
}

#[test]
fn test_wal_journal_and_config_file() {
    init_tracing();
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("tablemap.toml");
    let mut config = ManagerConfig::with_path(dir.path().join("wal.sqlite"));
    config.wal_journal = true;
    config.vacuum_after_delete_all = false;
    config.save_to_file(&config_path).unwrap();

    let manager = Manager::open(ManagerConfig::from_file(&config_path).unwrap()).unwrap();
    manager.register::<Widget>().unwrap();
    let mut w = widget("logged", &["x"]);
    manager.save(&mut w).unwrap();

    let mode = manager.query_sql("PRAGMA journal_mode").unwrap();
    assert_eq!(
        mode[0].get("journal_mode"),
        Some(&rusqlite::types::Value::Text("wal".to_string()))
    );
    manager.delete_all::<Widget>().unwrap();
    assert_eq!(manager.count_for_table(Widget::TABLE).unwrap(), 0);
}
