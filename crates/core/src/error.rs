use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown facing ordinal: {0}")]
    UnknownFacing(i64),

    #[error("config error: {0}")]
    Config(String),
}
