use serde::{Deserialize, Serialize};

use crate::catalog::ExclusionRule;
use crate::error::CoreError;

/// Runtime configuration for the leaderboard and panel engine.
///
/// Connection parameters and the visibility radius are opaque inputs
/// supplied by the host; everything has a usable default so tests can
/// run on an in-memory store without a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Panels render for viewers within this many blocks.
    pub visibility_radius: f64,
    /// Achievement key prefixes excluded from recording and ranking.
    pub excluded_prefixes: Vec<String>,
    /// Interval between keep-alive pings on the shared connection.
    pub keepalive_interval_secs: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            db_path: "questboard.db".to_string(),
            visibility_radius: 16.0,
            excluded_prefixes: vec![ExclusionRule::DEFAULT_PREFIX.to_string()],
            keepalive_interval_secs: 60,
        }
    }
}

impl BoardConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, CoreError> {
        toml::from_str(raw).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn exclusion_rule(&self) -> ExclusionRule {
        ExclusionRule::new(self.excluded_prefixes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AchievementKey;

    #[test]
    fn defaults_cover_a_bare_config() {
        let config = BoardConfig::default();
        assert_eq!(config.visibility_radius, 16.0);
        assert_eq!(config.keepalive_interval_secs, 60);
        assert!(
            config
                .exclusion_rule()
                .is_excluded(&AchievementKey::new("minecraft:recipes/misc/charcoal"))
        );
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config = BoardConfig::from_toml_str(
            r#"
            db_path = "/var/lib/questboard/board.db"
            visibility_radius = 24.0
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, "/var/lib/questboard/board.db");
        assert_eq!(config.visibility_radius, 24.0);
        assert_eq!(config.keepalive_interval_secs, 60);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(BoardConfig::from_toml_str("visibility_radius = \"wide\"").is_err());
    }
}
