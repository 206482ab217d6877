use thiserror::Error;

/// Errors raised inside rowmark. None of them reach the user as a crash:
/// the session logs them and falls back to defaults.
#[derive(Error, Debug)]
pub enum RowmarkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("unsupported file: {0}")]
    Unsupported(String),

    #[error("blob store worker is gone")]
    StoreClosed,
}

pub type Result<T> = std::result::Result<T, RowmarkError>;
