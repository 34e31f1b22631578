//! Live leaderboard panels.
//!
//! A panel is a placed display surface bound to one achievement. The
//! set of panels is owned by the host's tick loop; every mutation goes
//! through `&mut PanelSet`, so per-viewer visibility needs no locking.
//! Rendering and proximity lookups are behind the [`Renderer`] and
//! [`SpatialQuery`] seams so the engine stays host-agnostic.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use questboard_core::{AchievementId, AchievementKey, Facing, Location, PanelId, UserId};
use questboard_storage::{PanelRecord, RankedCompletion, Store};

use crate::error::EngineError;
use crate::Leaderboard;

/// First identifier handed out to panel display elements. High enough
/// to stay clear of anything the host allocates itself.
pub const ELEMENT_ID_BASE: i32 = i32::MAX / 5;

/// Elements per panel: three backing frames, four text lines, two
/// item badges.
pub const ELEMENTS_PER_PANEL: i32 = 9;

const PANEL_TOP_N: u32 = 3;
const PANEL_RECENT_N: u32 = 3;

/// The contiguous block of display-element identifiers owned by one
/// panel. Derived purely from the panel id, so a reloaded panel reuses
/// the same identifiers and never collides with another panel's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementBlock {
    start: i32,
}

impl ElementBlock {
    pub fn for_panel(panel: PanelId) -> Self {
        // Element ids are i32 on the wire. Do the arithmetic in i64 and
        // fold into that space so an out-of-range panel id cannot panic
        // on overflow; the mapping stays deterministic either way.
        let start = i64::from(ELEMENT_ID_BASE)
            .wrapping_add(panel.raw().wrapping_mul(i64::from(ELEMENTS_PER_PANEL)));
        Self { start: start as i32 }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn ids(self) -> impl Iterator<Item = i32> {
        (0..ELEMENTS_PER_PANEL).map(move |i| self.start.wrapping_add(i))
    }
}

/// What a panel shows to one viewer.
#[derive(Debug, Clone)]
pub struct PanelContent {
    pub achievement: AchievementKey,
    pub completed: u64,
    pub total_players: u64,
    /// The viewer's own standing, if they completed it.
    pub viewer_entry: Option<RankedCompletion>,
    pub top: Vec<RankedCompletion>,
    pub recent: Vec<RankedCompletion>,
    /// False when the ranking query failed and the panel shows an
    /// unranked placeholder instead.
    pub data_available: bool,
}

impl PanelContent {
    fn unavailable(achievement: AchievementKey) -> Self {
        Self {
            achievement,
            completed: 0,
            total_players: 0,
            viewer_entry: None,
            top: Vec::new(),
            recent: Vec::new(),
            data_available: false,
        }
    }
}

/// Host-side drawing of panel elements for a single viewer.
pub trait Renderer {
    fn render(
        &mut self,
        viewer: UserId,
        panel: &PanelRecord,
        elements: ElementBlock,
        content: &PanelContent,
    );

    fn clear(&mut self, viewer: UserId, panel: PanelId, elements: ElementBlock);
}

/// Host-side proximity lookups.
pub trait SpatialQuery {
    fn viewers_near(&self, location: &Location, radius: f64) -> Vec<UserId>;

    /// None when the viewer is not present in any world.
    fn locate(&self, viewer: UserId) -> Option<Location>;
}

/// Viewer lifecycle notifications fed in by the host.
#[derive(Debug, Clone, Copy)]
pub enum ViewerEvent {
    /// Joined or teleported; every panel is re-evaluated.
    Arrived(UserId),
    /// Crossed into a new chunk; cheap enough to re-evaluate on.
    Moved(UserId),
    /// Disconnected; visibility state is dropped without rendering.
    Departed(UserId),
}

/// One placed panel plus the set of viewers it is currently shown to.
#[derive(Debug)]
pub struct PanelView {
    record: PanelRecord,
    elements: ElementBlock,
    shown: HashSet<UserId>,
}

impl PanelView {
    fn new(record: PanelRecord) -> Self {
        let elements = ElementBlock::for_panel(record.panel_id);
        Self {
            record,
            elements,
            shown: HashSet::new(),
        }
    }

    pub fn record(&self) -> &PanelRecord {
        &self.record
    }

    pub fn elements(&self) -> ElementBlock {
        self.elements
    }

    pub fn is_shown_to(&self, viewer: UserId) -> bool {
        self.shown.contains(&viewer)
    }
}

/// All live panels. Owned by the host's tick loop.
pub struct PanelSet {
    panels: HashMap<PanelId, PanelView>,
    visibility_radius: f64,
}

impl PanelSet {
    pub fn new(visibility_radius: f64) -> Self {
        Self {
            panels: HashMap::new(),
            visibility_radius,
        }
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn get(&self, panel: PanelId) -> Option<&PanelView> {
        self.panels.get(&panel)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PanelView> {
        self.panels.values()
    }

    /// Rebuild the in-memory set from persisted placements. Existing
    /// visibility state is discarded.
    pub fn load<S: Store>(&mut self, board: &Leaderboard<S>) -> Result<usize, EngineError> {
        self.panels.clear();
        for record in board.store().load_panels()? {
            self.panels.insert(record.panel_id, PanelView::new(record));
        }
        info!(count = self.panels.len(), "panels loaded");
        Ok(self.panels.len())
    }

    /// Place a new panel and immediately show it to everyone in range.
    /// Vertical facings are rejected; a panel must hang on a wall.
    pub fn place<S, R, Q>(
        &mut self,
        board: &mut Leaderboard<S>,
        renderer: &mut R,
        spatial: &Q,
        key: &AchievementKey,
        location: Location,
        facing: Facing,
    ) -> Result<PanelId, EngineError>
    where
        S: Store,
        R: Renderer,
        Q: SpatialQuery,
    {
        if !facing.is_horizontal() {
            return Err(EngineError::VerticalFacing);
        }
        let achievement = board.store_mut().resolve_achievement(key)?;
        let record = board
            .store_mut()
            .insert_panel(achievement, &location, facing)?;
        let panel_id = record.panel_id;
        info!(panel = %panel_id, achievement = %key, location = %record.location, "panel placed");
        self.panels.insert(panel_id, PanelView::new(record));

        for viewer in spatial.viewers_near(&location, self.visibility_radius) {
            self.show(board, renderer, panel_id, viewer, false)?;
        }
        Ok(panel_id)
    }

    /// Remove a panel: hide it from every viewer it is shown to, then
    /// delete the placement record.
    pub fn remove<S, R>(
        &mut self,
        board: &mut Leaderboard<S>,
        renderer: &mut R,
        panel: PanelId,
    ) -> Result<PanelRecord, EngineError>
    where
        S: Store,
        R: Renderer,
    {
        let view = self
            .panels
            .remove(&panel)
            .ok_or_else(|| EngineError::PanelNotFound(panel.to_string()))?;
        for viewer in &view.shown {
            renderer.clear(*viewer, panel, view.elements);
        }
        board.store_mut().delete_panel(panel)?;
        info!(panel = %panel, "panel removed");
        Ok(view.record)
    }

    /// Remove whichever panel occupies the given block, for hosts that
    /// address panels by position rather than id.
    pub fn remove_at<S, R>(
        &mut self,
        board: &mut Leaderboard<S>,
        renderer: &mut R,
        location: &Location,
    ) -> Result<PanelId, EngineError>
    where
        S: Store,
        R: Renderer,
    {
        let panel = self
            .panels
            .values()
            .find(|v| v.record.location == *location)
            .map(|v| v.record.panel_id)
            .ok_or_else(|| EngineError::PanelNotFound(location.to_string()))?;
        self.remove(board, renderer, panel)?;
        Ok(panel)
    }

    /// Show a panel to one viewer. Already-shown viewers are a no-op
    /// unless `force` is set, which redraws in place.
    pub fn show<S, R>(
        &mut self,
        board: &Leaderboard<S>,
        renderer: &mut R,
        panel: PanelId,
        viewer: UserId,
        force: bool,
    ) -> Result<(), EngineError>
    where
        S: Store,
        R: Renderer,
    {
        let view = self
            .panels
            .get_mut(&panel)
            .ok_or_else(|| EngineError::PanelNotFound(panel.to_string()))?;
        if !force && view.shown.contains(&viewer) {
            return Ok(());
        }
        let content = panel_content(board, &view.record, viewer)?;
        renderer.render(viewer, &view.record, view.elements, &content);
        view.shown.insert(viewer);
        debug!(panel = %panel, %viewer, force, "panel shown");
        Ok(())
    }

    /// Hide a panel from one viewer. Unknown panels and not-shown
    /// viewers are a no-op.
    pub fn hide<R: Renderer>(&mut self, renderer: &mut R, panel: PanelId, viewer: UserId) {
        if let Some(view) = self.panels.get_mut(&panel)
            && view.shown.remove(&viewer)
        {
            renderer.clear(viewer, panel, view.elements);
        }
    }

    /// Redraw a panel for every viewer it is currently shown to.
    pub fn refresh<S, R>(
        &mut self,
        board: &Leaderboard<S>,
        renderer: &mut R,
        panel: PanelId,
    ) -> Result<(), EngineError>
    where
        S: Store,
        R: Renderer,
    {
        let viewers: Vec<UserId> = match self.panels.get(&panel) {
            Some(view) => view.shown.iter().copied().collect(),
            None => return Err(EngineError::PanelNotFound(panel.to_string())),
        };
        for viewer in viewers {
            self.show(board, renderer, panel, viewer, true)?;
        }
        Ok(())
    }

    /// Refresh every panel bound to the given achievement. Called after
    /// a new completion lands so standings update live.
    pub fn on_achievement_completed<S, R>(
        &mut self,
        board: &Leaderboard<S>,
        renderer: &mut R,
        achievement: AchievementId,
    ) -> Result<(), EngineError>
    where
        S: Store,
        R: Renderer,
    {
        let affected: Vec<PanelId> = self
            .panels
            .values()
            .filter(|v| v.record.achievement == achievement)
            .map(|v| v.record.panel_id)
            .collect();
        for panel in affected {
            self.refresh(board, renderer, panel)?;
        }
        Ok(())
    }

    /// Re-evaluate visibility for a viewer lifecycle event.
    pub fn handle_event<S, R, Q>(
        &mut self,
        board: &Leaderboard<S>,
        renderer: &mut R,
        spatial: &Q,
        event: ViewerEvent,
    ) -> Result<(), EngineError>
    where
        S: Store,
        R: Renderer,
        Q: SpatialQuery,
    {
        match event {
            ViewerEvent::Arrived(viewer) | ViewerEvent::Moved(viewer) => {
                let location = spatial.locate(viewer);
                let radius_sq = self.visibility_radius * self.visibility_radius;
                let panel_ids: Vec<PanelId> = self.panels.keys().copied().collect();
                for panel in panel_ids {
                    let view = &self.panels[&panel];
                    let in_range = location
                        .as_ref()
                        .and_then(|loc| view.record.location.distance_squared(loc))
                        .is_some_and(|d| d <= radius_sq);
                    if in_range {
                        self.show(board, renderer, panel, viewer, false)?;
                    } else {
                        self.hide(renderer, panel, viewer);
                    }
                }
            }
            ViewerEvent::Departed(viewer) => {
                // The client is gone; just drop the bookkeeping.
                for view in self.panels.values_mut() {
                    view.shown.remove(&viewer);
                }
            }
        }
        Ok(())
    }
}

fn panel_content<S: Store>(
    board: &Leaderboard<S>,
    record: &PanelRecord,
    viewer: UserId,
) -> Result<PanelContent, EngineError> {
    // A panel pointing at an achievement the catalog has never seen is
    // real corruption and surfaces as an error. A failed ranking query
    // only degrades that one draw to an unranked placeholder.
    let key = board.achievement_key(record.achievement)?;
    match board.progress_summary(&key, viewer, PANEL_TOP_N, PANEL_RECENT_N) {
        Ok(summary) => Ok(PanelContent {
            achievement: key,
            completed: summary.completed,
            total_players: summary.total_players,
            viewer_entry: summary.viewer,
            top: summary.top,
            recent: summary.recent,
            data_available: true,
        }),
        Err(e) => {
            warn!(achievement = %key, error = %e, "ranking query failed, rendering unranked");
            Ok(PanelContent::unavailable(key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_blocks_are_disjoint_per_panel() {
        let a = ElementBlock::for_panel(PanelId::from_raw(1));
        let b = ElementBlock::for_panel(PanelId::from_raw(2));
        assert_eq!(a.start(), ELEMENT_ID_BASE + ELEMENTS_PER_PANEL);
        assert_eq!(a.ids().count(), ELEMENTS_PER_PANEL as usize);
        assert!(a.ids().all(|id| !b.ids().any(|other| other == id)));
    }

    #[test]
    fn element_block_is_stable_for_a_panel_id() {
        let id = PanelId::from_raw(7);
        assert_eq!(ElementBlock::for_panel(id), ElementBlock::for_panel(id));
    }

    #[test]
    fn element_block_tolerates_extreme_panel_ids() {
        for raw in [i64::MAX, i64::MIN, i64::from(i32::MAX) + 1] {
            let id = PanelId::from_raw(raw);
            assert_eq!(ElementBlock::for_panel(id), ElementBlock::for_panel(id));
            assert_eq!(
                ElementBlock::for_panel(id).ids().count(),
                ELEMENTS_PER_PANEL as usize
            );
        }
    }
}
