use questboard_core::{AchievementKey, UserId};
use questboard_engine::{EngineError, RecordOutcome};
use questboard_harness::TestBoard;

const ROOT: &str = "minecraft:story/root";

#[test]
fn replayed_completion_keeps_the_original_timestamp() -> Result<(), Box<dyn std::error::Error>> {
    let mut fixture = TestBoard::new()?;
    let user = UserId::new();

    let first = fixture.record_at(user, "Alice", ROOT, 1_000)?;
    assert!(matches!(first, RecordOutcome::Recorded(_)));
    let replay = fixture.record_at(user, "Alice", ROOT, 9_000)?;
    assert!(matches!(replay, RecordOutcome::AlreadyRecorded(_)));

    let entry = fixture
        .board
        .self_entry(user, &AchievementKey::new(ROOT))?
        .unwrap();
    assert_eq!(entry.completed_at, 1_000);
    Ok(())
}

#[test]
fn ties_share_a_rank_and_the_next_rank_skips() -> Result<(), Box<dyn std::error::Error>> {
    let mut fixture = TestBoard::new()?;
    let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
    for (i, (user, at)) in users.iter().zip([100i64, 200, 200, 300]).enumerate() {
        fixture.record_at(*user, &format!("p{i}"), ROOT, at)?;
    }

    let summary = fixture
        .board
        .progress_summary(&AchievementKey::new(ROOT), users[3], 10, 10)?;
    let ranks: Vec<u32> = summary.top.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 2, 4]);
    assert_eq!(summary.viewer.unwrap().rank, 4);
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.total_players, 4);
    Ok(())
}

#[test]
fn most_recent_lists_latest_first() -> Result<(), Box<dyn std::error::Error>> {
    let mut fixture = TestBoard::new()?;
    let a = UserId::new();
    let b = UserId::new();
    fixture.record_at(a, "A", ROOT, 100)?;
    fixture.record_at(b, "B", ROOT, 200)?;

    let summary = fixture
        .board
        .progress_summary(&AchievementKey::new(ROOT), a, 5, 5)?;
    let recent: Vec<(&str, u32)> = summary
        .recent
        .iter()
        .map(|e| (e.name.as_str(), e.rank))
        .collect();
    assert_eq!(recent, vec![("B", 1), ("A", 2)]);
    Ok(())
}

#[test]
fn pages_partition_the_full_ranking() -> Result<(), Box<dyn std::error::Error>> {
    let mut fixture = TestBoard::new()?;
    let viewer = UserId::new();
    fixture.record_at(viewer, "p0", ROOT, 0)?;
    for i in 1..23i64 {
        fixture.record_at(UserId::new(), &format!("p{i}"), ROOT, i * 100)?;
    }
    let key = AchievementKey::new(ROOT);

    let mut ranks = Vec::new();
    for page in 1..=3u64 {
        let p = fixture.board.paged_leaderboard(&key, page, 10, viewer)?;
        assert_eq!(p.total_entries, 23);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.entries.len(), if page == 3 { 3 } else { 10 });
        // Self rank is the same on every page.
        assert_eq!(p.viewer.as_ref().unwrap().rank, 1);
        ranks.extend(p.entries.iter().map(|e| e.rank));
    }
    assert_eq!(ranks, (1..=23).collect::<Vec<u32>>());

    match fixture.board.paged_leaderboard(&key, 4, 10, viewer) {
        Err(EngineError::PageOutOfRange {
            page: 4,
            total_pages: 3,
        }) => {}
        other => panic!("expected PageOutOfRange, got {other:?}"),
    }
    Ok(())
}

#[test]
fn a_viewer_without_a_completion_has_no_entry() -> Result<(), Box<dyn std::error::Error>> {
    let mut fixture = TestBoard::new()?;
    fixture.record_at(UserId::new(), "Alice", ROOT, 100)?;

    let bystander = UserId::new();
    let key = AchievementKey::new(ROOT);
    assert!(fixture.board.self_entry(bystander, &key)?.is_none());

    let page = fixture.board.paged_leaderboard(&key, 1, 10, bystander)?;
    assert!(page.viewer.is_none());
    assert_eq!(page.entries.len(), 1);
    Ok(())
}

#[test]
fn excluded_prefixes_never_reach_the_board() -> Result<(), Box<dyn std::error::Error>> {
    let mut fixture = TestBoard::new()?;
    let user = UserId::new();
    let recipe = "minecraft:recipes/building_blocks/stone";

    assert_eq!(
        fixture.record_at(user, "Alice", recipe, 100)?,
        RecordOutcome::Excluded
    );
    assert!(matches!(
        fixture
            .board
            .self_entry(user, &AchievementKey::new(recipe)),
        Err(EngineError::UnknownAchievement(_))
    ));

    // A non-matching namespace goes through.
    assert!(matches!(
        fixture.record_at(user, "Alice", "minecraft:story/smelt_iron", 100)?,
        RecordOutcome::Recorded(_)
    ));
    Ok(())
}

#[test]
fn renaming_a_player_updates_existing_entries() -> Result<(), Box<dyn std::error::Error>> {
    let mut fixture = TestBoard::new()?;
    let user = UserId::new();
    fixture.record_at(user, "OldName", ROOT, 100)?;
    fixture.record_at(user, "NewName", "minecraft:story/mine_stone", 200)?;

    let entry = fixture
        .board
        .self_entry(user, &AchievementKey::new(ROOT))?
        .unwrap();
    assert_eq!(entry.name, "NewName");
    Ok(())
}

#[test]
fn keepalive_is_silent() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = TestBoard::new()?;
    fixture.board.keepalive();
    Ok(())
}
