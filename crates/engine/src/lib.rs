pub mod error;
pub mod import;
pub mod panel;

pub use error::EngineError;
pub use import::{ImportStats, Importer, SnapshotReader};
pub use panel::{ElementBlock, PanelContent, PanelSet, PanelView, Renderer, SpatialQuery, ViewerEvent};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use questboard_core::{AchievementId, AchievementKey, BoardConfig, ExclusionRule, UserId};
use questboard_storage::{RankedCompletion, SqliteStore, Store};

/// What happened when a completion was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The achievement key matched an exclusion prefix; nothing stored.
    Excluded,
    /// First completion by this user, now persisted.
    Recorded(AchievementId),
    /// The user already had a row; the original timestamp stands.
    AlreadyRecorded(AchievementId),
}

/// Snapshot of one achievement's standing, shaped for a panel or a
/// chat summary.
#[derive(Debug, Clone)]
pub struct ProgressSummary {
    pub achievement: AchievementKey,
    pub total_players: u64,
    pub completed: u64,
    /// The asking user's own entry, if they completed it.
    pub viewer: Option<RankedCompletion>,
    /// Earliest completers, ascending time.
    pub top: Vec<RankedCompletion>,
    /// Latest completers, most recent first.
    pub recent: Vec<RankedCompletion>,
}

/// One page of the full ascending-time ranking.
#[derive(Debug, Clone)]
pub struct LeaderboardPage {
    pub achievement: AchievementKey,
    /// 1-based.
    pub page: u64,
    pub total_pages: u64,
    pub total_entries: u64,
    pub entries: Vec<RankedCompletion>,
    /// The viewer's rank over the full list, not just this page.
    pub viewer: Option<RankedCompletion>,
}

/// Achievement completion ledger and ranking service.
///
/// Every mutation goes through [`Leaderboard::record`]; first-writer
/// races collapse onto the storage layer's unique constraints, so two
/// concurrent reports of the same completion produce exactly one row.
pub struct Leaderboard<S: Store> {
    store: S,
    exclusions: ExclusionRule,
}

impl Leaderboard<SqliteStore> {
    /// Open the configured database file and apply the configured
    /// exclusion prefixes.
    pub fn open(config: &BoardConfig) -> Result<Self, EngineError> {
        Ok(Self::new(
            SqliteStore::open(&config.db_path)?,
            config.exclusion_rule(),
        ))
    }
}

impl<S: Store> Leaderboard<S> {
    pub fn new(store: S, exclusions: ExclusionRule) -> Self {
        Self { store, exclusions }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn exclusions(&self) -> &ExclusionRule {
        &self.exclusions
    }

    /// Record a completion. `completed_at` defaults to now; a replayed
    /// report never moves the stored timestamp.
    pub fn record(
        &mut self,
        user: UserId,
        name: &str,
        key: &AchievementKey,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<RecordOutcome, EngineError> {
        if self.exclusions.is_excluded(key) {
            debug!(%user, achievement = %key, "completion excluded by prefix rule");
            return Ok(RecordOutcome::Excluded);
        }
        let at_ms = completed_at.unwrap_or_else(Utc::now).timestamp_millis();
        let player = self.store.resolve_player(user, name)?;
        let achievement = self.store.resolve_achievement(key)?;
        if self.store.insert_completion(player, achievement, at_ms)? {
            debug!(%user, achievement = %key, at_ms, "completion recorded");
            Ok(RecordOutcome::Recorded(achievement))
        } else {
            Ok(RecordOutcome::AlreadyRecorded(achievement))
        }
    }

    pub fn achievement_id(&self, key: &AchievementKey) -> Result<AchievementId, EngineError> {
        self.store
            .achievement_id(key)?
            .ok_or_else(|| EngineError::UnknownAchievement(key.to_string()))
    }

    pub fn achievement_key(&self, id: AchievementId) -> Result<AchievementKey, EngineError> {
        self.store
            .achievement_key(id)?
            .ok_or_else(|| EngineError::UnknownAchievement(format!("id {id}")))
    }

    /// The viewer's own entry and rank, or None if they have not
    /// completed the achievement.
    pub fn self_entry(
        &self,
        user: UserId,
        key: &AchievementKey,
    ) -> Result<Option<RankedCompletion>, EngineError> {
        let achievement = self.achievement_id(key)?;
        Ok(self.store.self_rank(user, achievement)?)
    }

    /// Standing of one achievement: counts, the viewer's own rank, the
    /// `top_n` earliest completers and the `recent_n` latest ones.
    pub fn progress_summary(
        &self,
        key: &AchievementKey,
        viewer: UserId,
        top_n: u32,
        recent_n: u32,
    ) -> Result<ProgressSummary, EngineError> {
        let achievement = self.achievement_id(key)?;
        Ok(ProgressSummary {
            achievement: key.clone(),
            total_players: self.store.total_players()?,
            completed: self.store.completed_count(achievement)?,
            viewer: self.store.self_rank(viewer, achievement)?,
            top: self.store.top_earliest(achievement, top_n)?,
            recent: self.store.most_recent(achievement, recent_n)?,
        })
    }

    /// One page of the full earliest-first ranking. Pages are 1-based;
    /// page 1 of an empty board is valid and empty, anything past the
    /// last page is rejected.
    pub fn paged_leaderboard(
        &self,
        key: &AchievementKey,
        page: u64,
        page_size: u32,
        viewer: UserId,
    ) -> Result<LeaderboardPage, EngineError> {
        let achievement = self.achievement_id(key)?;
        let total_entries = self.store.completed_count(achievement)?;
        let total_pages = total_entries.div_ceil(u64::from(page_size)).max(1);
        if page == 0 || page > total_pages {
            return Err(EngineError::PageOutOfRange { page, total_pages });
        }
        let offset = (page - 1) * u64::from(page_size);
        Ok(LeaderboardPage {
            achievement: key.clone(),
            page,
            total_pages,
            total_entries,
            entries: self.store.paged_ranking(achievement, offset, page_size)?,
            viewer: self.store.self_rank(viewer, achievement)?,
        })
    }

    /// Ping the store so an idle connection is not reaped. Failures are
    /// logged, never surfaced; the next real query will report them.
    pub fn keepalive(&self) {
        if let Err(e) = self.store.keepalive() {
            warn!(error = %e, "storage keepalive failed");
        }
    }
}
