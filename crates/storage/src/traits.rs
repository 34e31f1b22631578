use questboard_core::{AchievementId, AchievementKey, Facing, Location, PanelId, PlayerKey, UserId};

use crate::error::StorageError;

/// One row of a ranking answer: a completer, when they completed, and
/// their standard-competition rank within the query's ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCompletion {
    pub user: UserId,
    pub name: String,
    /// Unix milliseconds.
    pub completed_at: i64,
    pub rank: u32,
}

/// Persisted placement of one leaderboard panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRecord {
    pub panel_id: PanelId,
    pub achievement: AchievementId,
    pub location: Location,
    pub facing: Facing,
}

/// Persistence seam for the leaderboard: identity surrogates,
/// at-most-once completion rows, ranking queries, and panel records.
///
/// All mutations resolve first-creation races through unique
/// constraints rather than application locks; a losing writer observes
/// the winner's row.
pub trait Store {
    // Identity store

    /// Get-or-create the surrogate key for a user; always refreshes the
    /// stored display name (last write wins).
    fn resolve_player(&mut self, user: UserId, name: &str) -> Result<PlayerKey, StorageError>;

    /// Get-or-create the surrogate key for an achievement key.
    fn resolve_achievement(&mut self, key: &AchievementKey)
    -> Result<AchievementId, StorageError>;

    fn achievement_id(&self, key: &AchievementKey) -> Result<Option<AchievementId>, StorageError>;

    fn achievement_key(&self, id: AchievementId) -> Result<Option<AchievementKey>, StorageError>;

    fn achievement_exists(&self, id: AchievementId) -> Result<bool, StorageError> {
        Ok(self.achievement_key(id)?.is_some())
    }

    // Completion recorder

    /// Insert-if-absent on the (player, achievement) pair. Returns true
    /// when a new row was created; a replay returns false and never
    /// touches the stored timestamp.
    fn insert_completion(
        &mut self,
        player: PlayerKey,
        achievement: AchievementId,
        completed_at_ms: i64,
    ) -> Result<bool, StorageError>;

    // Ranking queries

    fn total_players(&self) -> Result<u64, StorageError>;

    fn completed_count(&self, achievement: AchievementId) -> Result<u64, StorageError>;

    /// The given user's completion and rank (ascending completion time,
    /// rank 1 = earliest), independent of any pagination. None when the
    /// user has not completed the achievement.
    fn self_rank(
        &self,
        user: UserId,
        achievement: AchievementId,
    ) -> Result<Option<RankedCompletion>, StorageError>;

    /// Earliest completers, rank 1 = earliest, ties share a rank.
    fn top_earliest(
        &self,
        achievement: AchievementId,
        limit: u32,
    ) -> Result<Vec<RankedCompletion>, StorageError>;

    /// Most recent completers, rank 1 = most recent, ties share a rank.
    fn most_recent(
        &self,
        achievement: AchievementId,
        limit: u32,
    ) -> Result<Vec<RankedCompletion>, StorageError>;

    /// A window of the full ascending-time ranking.
    fn paged_ranking(
        &self,
        achievement: AchievementId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RankedCompletion>, StorageError>;

    // Panel records

    fn insert_panel(
        &mut self,
        achievement: AchievementId,
        location: &Location,
        facing: Facing,
    ) -> Result<PanelRecord, StorageError>;

    fn delete_panel(&mut self, panel: PanelId) -> Result<(), StorageError>;

    fn load_panels(&self) -> Result<Vec<PanelRecord>, StorageError>;

    /// No-op query that keeps an idle connection alive.
    fn keepalive(&self) -> Result<(), StorageError>;
}
