//! Shared fixtures for integration tests: an in-memory board wired to
//! a recording renderer and a scripted spatial index.

use std::cell::Cell;
use std::collections::HashMap;

use chrono::DateTime;

use questboard_core::{
    AchievementId, AchievementKey, ExclusionRule, Facing, Location, PanelId, PlayerKey, UserId,
};
use questboard_engine::{
    ElementBlock, EngineError, Leaderboard, PanelContent, PanelSet, RecordOutcome, Renderer,
    SpatialQuery, ViewerEvent,
};
use questboard_storage::{PanelRecord, RankedCompletion, SqliteStore, StorageError, Store};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One recorded draw call.
#[derive(Debug, Clone)]
pub struct RenderCall {
    pub viewer: UserId,
    pub panel: PanelId,
    pub elements: ElementBlock,
    pub content: PanelContent,
}

/// Renderer that records every draw and clear instead of drawing.
#[derive(Default)]
pub struct RecordingRenderer {
    pub renders: Vec<RenderCall>,
    pub clears: Vec<(UserId, PanelId)>,
}

impl RecordingRenderer {
    pub fn renders_for(&self, panel: PanelId) -> usize {
        self.renders.iter().filter(|r| r.panel == panel).count()
    }

    pub fn last_render_for(&self, panel: PanelId, viewer: UserId) -> Option<&RenderCall> {
        self.renders
            .iter()
            .rev()
            .find(|r| r.panel == panel && r.viewer == viewer)
    }

    pub fn reset(&mut self) {
        self.renders.clear();
        self.clears.clear();
    }
}

impl Renderer for RecordingRenderer {
    fn render(
        &mut self,
        viewer: UserId,
        panel: &PanelRecord,
        elements: ElementBlock,
        content: &PanelContent,
    ) {
        self.renders.push(RenderCall {
            viewer,
            panel: panel.panel_id,
            elements,
            content: content.clone(),
        });
    }

    fn clear(&mut self, viewer: UserId, panel: PanelId, elements: ElementBlock) {
        let _ = elements;
        self.clears.push((viewer, panel));
    }
}

/// Spatial index backed by a plain map of scripted viewer positions.
#[derive(Default)]
pub struct FixedSpatial {
    positions: HashMap<UserId, Location>,
}

impl FixedSpatial {
    pub fn put(&mut self, viewer: UserId, location: Location) {
        self.positions.insert(viewer, location);
    }

    pub fn remove(&mut self, viewer: UserId) {
        self.positions.remove(&viewer);
    }
}

impl SpatialQuery for FixedSpatial {
    fn viewers_near(&self, location: &Location, radius: f64) -> Vec<UserId> {
        let radius_sq = radius * radius;
        self.positions
            .iter()
            .filter(|(_, pos)| {
                location
                    .distance_squared(pos)
                    .is_some_and(|d| d <= radius_sq)
            })
            .map(|(viewer, _)| *viewer)
            .collect()
    }

    fn locate(&self, viewer: UserId) -> Option<Location> {
        self.positions.get(&viewer).cloned()
    }
}

/// In-memory store whose ranking queries can be switched to fail, for
/// exercising degraded rendering. Identity, completion and panel
/// operations always pass through.
pub struct FaultyStore {
    inner: SqliteStore,
    rankings_down: Cell<bool>,
}

impl FaultyStore {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            inner: SqliteStore::open_in_memory()?,
            rankings_down: Cell::new(false),
        })
    }

    pub fn set_rankings_down(&self, down: bool) {
        self.rankings_down.set(down);
    }

    fn rankings(&self) -> Result<(), StorageError> {
        if self.rankings_down.get() {
            Err(StorageError::NotFound("ranking queries offline".into()))
        } else {
            Ok(())
        }
    }
}

impl Store for FaultyStore {
    fn resolve_player(&mut self, user: UserId, name: &str) -> Result<PlayerKey, StorageError> {
        self.inner.resolve_player(user, name)
    }

    fn resolve_achievement(
        &mut self,
        key: &AchievementKey,
    ) -> Result<AchievementId, StorageError> {
        self.inner.resolve_achievement(key)
    }

    fn achievement_id(&self, key: &AchievementKey) -> Result<Option<AchievementId>, StorageError> {
        self.inner.achievement_id(key)
    }

    fn achievement_key(&self, id: AchievementId) -> Result<Option<AchievementKey>, StorageError> {
        self.inner.achievement_key(id)
    }

    fn insert_completion(
        &mut self,
        player: PlayerKey,
        achievement: AchievementId,
        completed_at_ms: i64,
    ) -> Result<bool, StorageError> {
        self.inner.insert_completion(player, achievement, completed_at_ms)
    }

    fn total_players(&self) -> Result<u64, StorageError> {
        self.rankings()?;
        self.inner.total_players()
    }

    fn completed_count(&self, achievement: AchievementId) -> Result<u64, StorageError> {
        self.rankings()?;
        self.inner.completed_count(achievement)
    }

    fn self_rank(
        &self,
        user: UserId,
        achievement: AchievementId,
    ) -> Result<Option<RankedCompletion>, StorageError> {
        self.rankings()?;
        self.inner.self_rank(user, achievement)
    }

    fn top_earliest(
        &self,
        achievement: AchievementId,
        limit: u32,
    ) -> Result<Vec<RankedCompletion>, StorageError> {
        self.rankings()?;
        self.inner.top_earliest(achievement, limit)
    }

    fn most_recent(
        &self,
        achievement: AchievementId,
        limit: u32,
    ) -> Result<Vec<RankedCompletion>, StorageError> {
        self.rankings()?;
        self.inner.most_recent(achievement, limit)
    }

    fn paged_ranking(
        &self,
        achievement: AchievementId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RankedCompletion>, StorageError> {
        self.rankings()?;
        self.inner.paged_ranking(achievement, offset, limit)
    }

    fn insert_panel(
        &mut self,
        achievement: AchievementId,
        location: &Location,
        facing: Facing,
    ) -> Result<PanelRecord, StorageError> {
        self.inner.insert_panel(achievement, location, facing)
    }

    fn delete_panel(&mut self, panel: PanelId) -> Result<(), StorageError> {
        self.inner.delete_panel(panel)
    }

    fn load_panels(&self) -> Result<Vec<PanelRecord>, StorageError> {
        self.inner.load_panels()
    }

    fn keepalive(&self) -> Result<(), StorageError> {
        self.inner.keepalive()
    }
}

/// An in-memory leaderboard plus panels, renderer and spatial index,
/// wired the way a host would wire them.
pub struct TestBoard {
    pub board: Leaderboard<SqliteStore>,
    pub panels: PanelSet,
    pub renderer: RecordingRenderer,
    pub spatial: FixedSpatial,
}

pub const TEST_RADIUS: f64 = 16.0;

impl TestBoard {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            board: Leaderboard::new(SqliteStore::open_in_memory()?, ExclusionRule::default()),
            panels: PanelSet::new(TEST_RADIUS),
            renderer: RecordingRenderer::default(),
            spatial: FixedSpatial::default(),
        })
    }

    /// Record a completion at a fixed unix-millisecond timestamp.
    pub fn record_at(
        &mut self,
        user: UserId,
        name: &str,
        key: &str,
        at_ms: i64,
    ) -> Result<RecordOutcome, EngineError> {
        self.board.record(
            user,
            name,
            &AchievementKey::new(key),
            DateTime::from_timestamp_millis(at_ms),
        )
    }

    pub fn place_panel(
        &mut self,
        key: &str,
        location: Location,
        facing: Facing,
    ) -> Result<PanelId, EngineError> {
        self.panels.place(
            &mut self.board,
            &mut self.renderer,
            &self.spatial,
            &AchievementKey::new(key),
            location,
            facing,
        )
    }

    /// Put the viewer at a position and feed an arrival event.
    pub fn arrive(&mut self, viewer: UserId, location: Location) -> Result<(), EngineError> {
        self.spatial.put(viewer, location);
        self.panels.handle_event(
            &self.board,
            &mut self.renderer,
            &self.spatial,
            ViewerEvent::Arrived(viewer),
        )
    }

    /// Move the viewer and feed a movement event.
    pub fn move_to(&mut self, viewer: UserId, location: Location) -> Result<(), EngineError> {
        self.spatial.put(viewer, location);
        self.panels.handle_event(
            &self.board,
            &mut self.renderer,
            &self.spatial,
            ViewerEvent::Moved(viewer),
        )
    }

    pub fn depart(&mut self, viewer: UserId) -> Result<(), EngineError> {
        self.spatial.remove(viewer);
        self.panels.handle_event(
            &self.board,
            &mut self.renderer,
            &self.spatial,
            ViewerEvent::Departed(viewer),
        )
    }
}
