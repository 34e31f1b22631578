use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable 128-bit user identifier, assigned by the host platform.
/// Immutable for the lifetime of the user.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", &self.0.to_string()[..8])
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! surrogate_id {
    ($name:ident) => {
        /// Compact integer surrogate key assigned by the storage layer.
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(i64);

        impl $name {
            pub fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            pub fn raw(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(PlayerKey);
surrogate_id!(AchievementId);
surrogate_id!(PanelId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_byte_round_trip() {
        let id = UserId::new();
        let bytes = *id.as_bytes();
        assert_eq!(UserId::from_bytes(bytes), id);
    }

    #[test]
    fn surrogate_keys_are_distinct_types() {
        let p = PlayerKey::from_raw(7);
        let a = AchievementId::from_raw(7);
        assert_eq!(p.raw(), a.raw());
        assert_eq!(format!("{p:?}"), "PlayerKey(7)");
        assert_eq!(format!("{a:?}"), "AchievementId(7)");
    }
}
