pub mod catalog;
pub mod config;
pub mod error;
pub mod geometry;
pub mod ids;

pub use catalog::{AchievementKey, ExclusionRule};
pub use config::BoardConfig;
pub use error::CoreError;
pub use geometry::{Facing, Location};
pub use ids::*;
