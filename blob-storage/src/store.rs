use std::path::PathBuf;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::errors::StoreResult;

/// A file as it arrived from a client.
#[derive(Debug, Clone)]
pub struct IncomingBlob {
    pub original_name: String,
    pub data: Vec<u8>,
}

impl IncomingBlob {
    pub fn new(original_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self { original_name: original_name.into(), data: data.into() }
    }
}

/// What a write hands back to the caller.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredBlob {
    pub filename: String,
    pub size: u64,
    pub path: PathBuf,
}

/// One row of a directory listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlobEntry {
    pub filename: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Result of listing the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobListing {
    /// False when nothing has ever been uploaded and the directory is absent.
    pub directory_found: bool,
    pub entries: Vec<BlobEntry>,
}

/// Persists uploaded files and hands them back by stored filename.
#[async_trait]
pub trait BlobStore {
    /// Stores a single file under a seconds-resolution name.
    async fn put_blob(&self, original_name: &str, data: &[u8]) -> StoreResult<StoredBlob>;

    /// Stores every file or none of them, each under a nanosecond-resolution name.
    async fn put_batch(&self, blobs: &[IncomingBlob]) -> StoreResult<Vec<StoredBlob>>;

    /// Lists stored files. A store that has never been written to is empty.
    async fn list_blobs(&self) -> StoreResult<BlobListing>;

    /// Resolves a stored filename to the path of an existing file.
    async fn locate_blob(&self, stored_name: &str) -> StoreResult<PathBuf>;
}
