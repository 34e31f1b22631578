use rusqlite::{Connection, OptionalExtension, params};

use questboard_core::{
    AchievementId, AchievementKey, Facing, Location, PanelId, PlayerKey, UserId,
};

use crate::error::StorageError;
use crate::traits::{PanelRecord, RankedCompletion, Store};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn read_ranked(row: &rusqlite::Row) -> Result<RankedCompletion, rusqlite::Error> {
    let uuid_bytes: Vec<u8> = row.get(0)?;
    let name: String = row.get(1)?;
    let completed_at: i64 = row.get(2)?;
    let rank: i64 = row.get(3)?;
    let uuid: [u8; 16] = uuid_bytes.try_into().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Blob,
            "invalid uuid length".into(),
        )
    })?;
    Ok(RankedCompletion {
        user: UserId::from_bytes(uuid),
        name,
        completed_at,
        rank: rank as u32,
    })
}

impl Store for SqliteStore {
    fn resolve_player(&mut self, user: UserId, name: &str) -> Result<PlayerKey, StorageError> {
        // First-writer-wins on the uuid constraint; the display name is
        // refreshed on every sighting.
        self.conn.execute(
            "INSERT INTO players (uuid, name) VALUES (?1, ?2)
             ON CONFLICT(uuid) DO UPDATE SET name = excluded.name",
            params![user.as_bytes().as_slice(), name],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM players WHERE uuid = ?1",
            params![user.as_bytes().as_slice()],
            |row| row.get(0),
        )?;
        Ok(PlayerKey::from_raw(id))
    }

    fn resolve_achievement(
        &mut self,
        key: &AchievementKey,
    ) -> Result<AchievementId, StorageError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO achievements (key) VALUES (?1)",
            params![key.as_str()],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM achievements WHERE key = ?1",
            params![key.as_str()],
            |row| row.get(0),
        )?;
        Ok(AchievementId::from_raw(id))
    }

    fn achievement_id(&self, key: &AchievementKey) -> Result<Option<AchievementId>, StorageError> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM achievements WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(AchievementId::from_raw))
    }

    fn achievement_key(&self, id: AchievementId) -> Result<Option<AchievementKey>, StorageError> {
        let key: Option<String> = self
            .conn
            .query_row(
                "SELECT key FROM achievements WHERE id = ?1",
                params![id.raw()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key.map(AchievementKey::new))
    }

    fn insert_completion(
        &mut self,
        player: PlayerKey,
        achievement: AchievementId,
        completed_at_ms: i64,
    ) -> Result<bool, StorageError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO completions (player_id, achievement_id, completed_at)
             VALUES (?1, ?2, ?3)",
            params![player.raw(), achievement.raw(), completed_at_ms],
        )?;
        Ok(inserted > 0)
    }

    fn total_players(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn completed_count(&self, achievement: AchievementId) -> Result<u64, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM completions WHERE achievement_id = ?1",
            params![achievement.raw()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn self_rank(
        &self,
        user: UserId,
        achievement: AchievementId,
    ) -> Result<Option<RankedCompletion>, StorageError> {
        // Correlated count rather than a window function: the rank must
        // be computed over the whole completer population even though
        // only one row is selected.
        let entry = self
            .conn
            .query_row(
                "SELECT p.uuid, p.name, c.completed_at,
                        (SELECT COUNT(*) + 1 FROM completions c2
                          WHERE c2.achievement_id = ?1
                            AND c2.completed_at < c.completed_at) AS rank
                   FROM completions c
                   JOIN players p ON c.player_id = p.id
                  WHERE c.achievement_id = ?1 AND p.uuid = ?2",
                params![achievement.raw(), user.as_bytes().as_slice()],
                read_ranked,
            )
            .optional()?;
        Ok(entry)
    }

    fn top_earliest(
        &self,
        achievement: AchievementId,
        limit: u32,
    ) -> Result<Vec<RankedCompletion>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.uuid, p.name, c.completed_at,
                    RANK() OVER (ORDER BY c.completed_at ASC) AS rank
               FROM completions c
               JOIN players p ON c.player_id = p.id
              WHERE c.achievement_id = ?1
              ORDER BY c.completed_at ASC
              LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![achievement.raw(), i64::from(limit)], read_ranked)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn most_recent(
        &self,
        achievement: AchievementId,
        limit: u32,
    ) -> Result<Vec<RankedCompletion>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.uuid, p.name, c.completed_at,
                    RANK() OVER (ORDER BY c.completed_at DESC) AS rank
               FROM completions c
               JOIN players p ON c.player_id = p.id
              WHERE c.achievement_id = ?1
              ORDER BY c.completed_at DESC
              LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![achievement.raw(), i64::from(limit)], read_ranked)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn paged_ranking(
        &self,
        achievement: AchievementId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RankedCompletion>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.uuid, p.name, c.completed_at,
                    RANK() OVER (ORDER BY c.completed_at ASC) AS rank
               FROM completions c
               JOIN players p ON c.player_id = p.id
              WHERE c.achievement_id = ?1
              ORDER BY c.completed_at ASC
              LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(
                params![achievement.raw(), i64::from(limit), offset as i64],
                read_ranked,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_panel(
        &mut self,
        achievement: AchievementId,
        location: &Location,
        facing: Facing,
    ) -> Result<PanelRecord, StorageError> {
        self.conn.execute(
            "INSERT INTO panels (achievement_id, world, x, y, z, facing)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                achievement.raw(),
                location.world,
                location.x,
                location.y,
                location.z,
                facing.ordinal(),
            ],
        )?;
        let panel_id = PanelId::from_raw(self.conn.last_insert_rowid());
        Ok(PanelRecord {
            panel_id,
            achievement,
            location: location.clone(),
            facing,
        })
    }

    fn delete_panel(&mut self, panel: PanelId) -> Result<(), StorageError> {
        let deleted = self
            .conn
            .execute("DELETE FROM panels WHERE id = ?1", params![panel.raw()])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("panel {panel}")));
        }
        Ok(())
    }

    fn load_panels(&self) -> Result<Vec<PanelRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, achievement_id, world, x, y, z, facing FROM panels")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                    row.get::<_, i32>(4)?,
                    row.get::<_, i32>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut panels = Vec::new();
        for (id, achievement, world, x, y, z, facing) in rows {
            let facing = match Facing::from_ordinal(facing) {
                Ok(f) => f,
                Err(e) => {
                    // Bad row, not a bad database: skip it and keep loading.
                    tracing::warn!(panel = id, error = %e, "skipping panel with bad facing");
                    continue;
                }
            };
            panels.push(PanelRecord {
                panel_id: PanelId::from_raw(id),
                achievement: AchievementId::from_raw(achievement),
                location: Location::new(world, x, y, z),
                facing,
            });
        }
        Ok(panels)
    }

    fn keepalive(&self) -> Result<(), StorageError> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}
