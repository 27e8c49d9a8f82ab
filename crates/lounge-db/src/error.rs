use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected before reaching the database.
    #[error("{0}")]
    Invalid(&'static str),

    /// A UNIQUE constraint fired.
    #[error("duplicate value for a unique column")]
    Duplicate,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StoreError::Duplicate
            }
            _ => StoreError::Backend(e.into()),
        }
    }
}
