use questboard_core::{AchievementKey, UserId};
use questboard_engine::Importer;
use questboard_harness::TestBoard;

fn snapshot_json(dates: &[(&str, &str)]) -> String {
    let mut root = serde_json::Map::new();
    root.insert("DataVersion".into(), serde_json::json!(3465));
    for (key, date) in dates {
        root.insert(
            (*key).into(),
            serde_json::json!({ "done": true, "criteria": { "only": date } }),
        );
    }
    serde_json::Value::Object(root).to_string()
}

#[test]
fn imported_snapshots_rank_by_criterion_date() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let early = UserId::new();
    let late = UserId::new();
    std::fs::write(
        dir.path().join(format!("{early}.json")),
        snapshot_json(&[
            ("minecraft:story/root", "2023-06-01 10:00:00 +0000"),
            ("minecraft:recipes/misc/charcoal", "2023-06-01 10:00:00 +0000"),
        ]),
    )?;
    std::fs::write(
        dir.path().join(format!("{late}.json")),
        snapshot_json(&[("minecraft:story/root", "2023-06-05 08:00:00 +0000")]),
    )?;

    let mut fixture = TestBoard::new()?;
    let stats = Importer::import_dir(&mut fixture.board, dir.path())?;
    assert_eq!(stats.files_seen, 2);
    assert_eq!(stats.files_imported, 2);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.recorded, 2);
    assert_eq!(stats.excluded, 1);

    let key = AchievementKey::new("minecraft:story/root");
    assert_eq!(fixture.board.self_entry(early, &key)?.unwrap().rank, 1);
    assert_eq!(fixture.board.self_entry(late, &key)?.unwrap().rank, 2);
    Ok(())
}

#[test]
fn live_reports_merge_with_imported_history() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let imported = UserId::new();
    std::fs::write(
        dir.path().join(format!("{imported}.json")),
        snapshot_json(&[("minecraft:story/root", "2023-06-01 10:00:00 +0000")]),
    )?;

    let mut fixture = TestBoard::new()?;
    Importer::import_dir(&mut fixture.board, dir.path())?;

    // A later live completion lands behind the imported one.
    let live = UserId::new();
    fixture.record_at(live, "Liv", "minecraft:story/root", 1_700_000_000_000)?;

    let key = AchievementKey::new("minecraft:story/root");
    let summary = fixture.board.progress_summary(&key, live, 5, 5)?;
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.viewer.unwrap().rank, 2);
    assert_eq!(summary.recent[0].name, "Liv");

    // The imported player's placeholder name is their id.
    assert_eq!(
        fixture.board.self_entry(imported, &key)?.unwrap().name,
        imported.to_string()
    );
    Ok(())
}
