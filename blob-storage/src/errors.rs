use std::io;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Error creating upload directory")]
    CreateDir(#[source] io::Error),

    #[error("Error saving file")]
    Write(#[source] io::Error),

    #[error("Error saving file")]
    NamesExhausted(String),

    #[error("Error reading uploads directory")]
    ReadDir(#[source] io::Error),

    #[error("Error reading file")]
    Read(#[source] io::Error),

    #[error("No files were provided")]
    EmptyBatch,

    #[error("Filename is required")]
    EmptyName,

    #[error("Invalid filename")]
    InvalidName(String),

    #[error("File not found")]
    NotFound,
}

impl StoreError {
    /// True when the caller supplied something unusable, as opposed to the
    /// filesystem failing underneath us.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            StoreError::EmptyBatch | StoreError::EmptyName | StoreError::InvalidName(_)
        )
    }

    /// The low-level error text, when there is one.
    pub fn detail(&self) -> Option<String> {
        match self {
            StoreError::CreateDir(e)
            | StoreError::Write(e)
            | StoreError::ReadDir(e)
            | StoreError::Read(e) => Some(e.to_string()),
            StoreError::NamesExhausted(name) => {
                Some(format!("no free stored name left for {name}"))
            }
            StoreError::InvalidName(name) => Some(format!("{name:?} is not a stored filename")),
            StoreError::EmptyBatch | StoreError::EmptyName | StoreError::NotFound => None,
        }
    }
}
