use questboard_core::CoreError;
use questboard_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("unknown achievement: {0}")]
    UnknownAchievement(String),

    #[error("page {page} out of range (total pages: {total_pages})")]
    PageOutOfRange { page: u64, total_pages: u64 },

    #[error("panels cannot face up or down")]
    VerticalFacing,

    #[error("panel not found: {0}")]
    PanelNotFound(String),

    #[error("import error: {0}")]
    Import(String),
}
