use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespaced achievement key, e.g. `minecraft:story/mine_stone`.
/// Unique within the catalog; immutable once first observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AchievementKey(String);

impl AchievementKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AchievementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AchievementKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Prefix-based category of achievements excluded from recording and
/// ranking, such as recipe-style unlocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    prefixes: Vec<String>,
}

impl ExclusionRule {
    pub const DEFAULT_PREFIX: &'static str = "minecraft:recipes/";

    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// Matches nothing; completions of every key are scorable.
    pub fn none() -> Self {
        Self {
            prefixes: Vec::new(),
        }
    }

    pub fn is_excluded(&self, key: &AchievementKey) -> bool {
        self.prefixes.iter().any(|p| key.as_str().starts_with(p))
    }
}

impl Default for ExclusionRule {
    fn default() -> Self {
        Self {
            prefixes: vec![Self::DEFAULT_PREFIX.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_excludes_recipes() {
        let rule = ExclusionRule::default();
        assert!(rule.is_excluded(&"minecraft:recipes/misc/charcoal".into()));
        assert!(!rule.is_excluded(&"minecraft:story/mine_stone".into()));
    }

    #[test]
    fn custom_prefixes() {
        let rule = ExclusionRule::new(vec!["ns:hidden/".into(), "ns:recipes/".into()]);
        assert!(rule.is_excluded(&"ns:hidden/easter_egg".into()));
        assert!(rule.is_excluded(&"ns:recipes/x".into()));
        assert!(!rule.is_excluded(&"ns:story/y".into()));
    }

    #[test]
    fn empty_rule_excludes_nothing() {
        assert!(!ExclusionRule::none().is_excluded(&"minecraft:recipes/x".into()));
    }
}
