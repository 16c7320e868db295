use std::ffi::OsStr;
use std::fs::Metadata;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::{self, DirBuilder, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use crate::errors::{StoreError, StoreResult};
use crate::naming::{clean_original_name, is_valid_stored_name, stored_name, TokenResolution};
use crate::store::{BlobEntry, BlobListing, BlobStore, IncomingBlob, StoredBlob};

/// How many successive tokens we try before giving up on a name.
const MAX_NAME_ATTEMPTS: i64 = 64;

/// Stores uploads as plain files in a single flat directory.
#[derive(Clone, Debug)]
pub struct LocalFileBlobStore {
    base_path: PathBuf,
    now: fn() -> DateTime<Utc>,
}

impl LocalFileBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into(), now: Utc::now }
    }

    /// Replaces the clock used to derive filename tokens.
    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn ensure_dir(&self) -> StoreResult<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder.create(&self.base_path).await.map_err(StoreError::CreateDir)
    }

    /// Creates a file nobody else owns yet, bumping the token on every collision.
    async fn create_unique(&self, token: i64, original: &str) -> StoreResult<(String, PathBuf, File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let filename = stored_name(token.saturating_add(attempt), original);
            let path = self.base_path.join(&filename);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((filename, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!("stored name {} already taken, trying the next token", filename);
                }
                Err(e) => return Err(StoreError::Write(e)),
            }
        }
        Err(StoreError::NamesExhausted(original.to_string()))
    }

    async fn write_one(
        &self,
        resolution: TokenResolution,
        original_name: &str,
        data: &[u8],
    ) -> StoreResult<StoredBlob> {
        let original = clean_original_name(original_name);
        let token = resolution.token_at((self.now)());
        let (filename, path, mut file) = self.create_unique(token, &original).await?;

        if let Err(e) = write_contents(&mut file, data).await {
            drop(file);
            discard(&path).await;
            return Err(StoreError::Write(e));
        }

        tracing::debug!("stored {} ({} bytes) as {}", original_name, data.len(), filename);
        Ok(StoredBlob {
            filename,
            size: data.len() as u64,
            path,
        })
    }
}

async fn write_contents(file: &mut File, data: &[u8]) -> io::Result<()> {
    file.write_all(data).await?;
    // tokio buffers writes; flush waits until they reach the file.
    file.flush().await
}

/// Turns one directory entry into a listing row. Directories and entries we
/// cannot stat are left out.
fn listing_entry(file_name: &OsStr, metadata: io::Result<Metadata>) -> Option<BlobEntry> {
    let metadata = match metadata {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::debug!("skipping {:?}: {}", file_name, e);
            return None;
        }
    };
    if metadata.is_dir() {
        return None;
    }
    let modified = match metadata.modified() {
        Ok(modified) => DateTime::<Utc>::from(modified),
        Err(e) => {
            tracing::debug!("skipping {:?}: {}", file_name, e);
            return None;
        }
    };
    Some(BlobEntry {
        filename: file_name.to_string_lossy().into_owned(),
        size: metadata.len(),
        modified,
    })
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!("failed to remove {}: {}", path.display(), e);
    }
}

#[async_trait]
impl BlobStore for LocalFileBlobStore {
    async fn put_blob(&self, original_name: &str, data: &[u8]) -> StoreResult<StoredBlob> {
        self.ensure_dir().await?;
        self.write_one(TokenResolution::Seconds, original_name, data).await
    }

    async fn put_batch(&self, blobs: &[IncomingBlob]) -> StoreResult<Vec<StoredBlob>> {
        if blobs.is_empty() {
            return Err(StoreError::EmptyBatch);
        }
        self.ensure_dir().await?;

        let mut stored = Vec::with_capacity(blobs.len());
        for blob in blobs {
            match self.write_one(TokenResolution::Nanos, &blob.original_name, &blob.data).await {
                Ok(done) => stored.push(done),
                Err(e) => {
                    tracing::error!(
                        "batch upload failed after {} of {} files, rolling back: {}",
                        stored.len(),
                        blobs.len(),
                        e
                    );
                    for done in &stored {
                        discard(&done.path).await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    async fn list_blobs(&self) -> StoreResult<BlobListing> {
        let mut dir = match fs::read_dir(&self.base_path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BlobListing::default()),
            Err(e) => return Err(StoreError::ReadDir(e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(StoreError::ReadDir)? {
            let metadata = entry.metadata().await;
            if let Some(listed) = listing_entry(&entry.file_name(), metadata) {
                entries.push(listed);
            }
        }
        Ok(BlobListing { directory_found: true, entries })
    }

    async fn locate_blob(&self, stored_name: &str) -> StoreResult<PathBuf> {
        if stored_name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if !is_valid_stored_name(stored_name) {
            return Err(StoreError::InvalidName(stored_name.to_string()));
        }

        let path = self.base_path.join(stored_name);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(path),
            Ok(_) => Err(StoreError::NotFound),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Read(e)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::{tempdir, TempDir};
    use uuid::Uuid;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn setup() -> (TempDir, LocalFileBlobStore) {
        let temp_dir = tempdir().unwrap();
        let store = LocalFileBlobStore::new(temp_dir.path().join("uploads"));
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_put_blob() {
        let (_temp_dir, store) = setup();
        let before = Utc::now().timestamp();

        let stored = store.put_blob("report.txt", b"hello").await.unwrap();

        let after = Utc::now().timestamp();
        let (token, rest) = stored.filename.split_once('_').unwrap();
        let token: i64 = token.parse().unwrap();
        assert!(before <= token && token <= after);
        assert_eq!(rest, "report.txt");
        assert_eq!(stored.size, 5);
        assert_eq!(stored.path, store.base_path().join(&stored.filename));
        assert_eq!(fs::read(&stored.path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_put_blob_shows_up_in_listing() {
        let (_temp_dir, store) = setup();
        let stored = store.put_blob("report.txt", b"hello").await.unwrap();

        let listing = store.list_blobs().await.unwrap();
        assert!(listing.directory_found);
        let listed = listing.entries;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, stored.filename);
        assert_eq!(listed[0].size, 5);
    }

    #[tokio::test]
    async fn test_put_blob_same_name_same_second() {
        let (_temp_dir, store) = setup();
        let store = store.with_clock(fixed_now);
        let token = fixed_now().timestamp();

        let first = store.put_blob("report.txt", b"first").await.unwrap();
        let second = store.put_blob("report.txt", b"second").await.unwrap();

        assert_eq!(first.filename, format!("{}_report.txt", token));
        assert_eq!(second.filename, format!("{}_report.txt", token + 1));
        assert_eq!(fs::read(&first.path).await.unwrap(), b"first");
        assert_eq!(fs::read(&second.path).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_put_blob_drops_directories_from_name() {
        let (temp_dir, store) = setup();
        let stored = store.put_blob("../../escape.txt", b"nope").await.unwrap();

        assert!(stored.filename.ends_with("_escape.txt"));
        assert!(stored.path.starts_with(store.base_path()));
        assert!(!temp_dir.path().join("escape.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_directory_created_lazily() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp_dir, store) = setup();
        assert!(!store.base_path().exists());

        store.put_blob("a.txt", b"a").await.unwrap();

        let mode = fs::metadata(store.base_path()).await.unwrap().permissions().mode();
        assert!(store.base_path().is_dir());
        // umask may only take bits away
        assert_eq!(mode & 0o022, 0);
        assert_eq!(mode & 0o700, 0o700);
    }

    #[tokio::test]
    async fn test_put_batch() {
        let (_temp_dir, store) = setup();
        let blobs = vec![
            IncomingBlob::new("a.txt", "alpha"),
            IncomingBlob::new("b.txt", "bravo!"),
            IncomingBlob::new("a.txt", "again"),
        ];

        let stored = store.put_batch(&blobs).await.unwrap();

        assert_eq!(stored.len(), 3);
        assert!(stored[0].filename.ends_with("_a.txt"));
        assert!(stored[1].filename.ends_with("_b.txt"));
        assert_eq!(stored[1].size, 6);
        assert_ne!(stored[0].filename, stored[2].filename);
        for (blob, done) in blobs.iter().zip(&stored) {
            let path = store.locate_blob(&done.filename).await.unwrap();
            assert_eq!(fs::read(path).await.unwrap(), blob.data);
        }
    }

    #[tokio::test]
    async fn test_put_batch_empty() {
        let (_temp_dir, store) = setup();
        let err = store.put_batch(&[]).await.unwrap_err();

        assert!(matches!(err, StoreError::EmptyBatch));
        assert!(err.is_caller_error());
        assert!(!store.base_path().exists());
    }

    #[tokio::test]
    async fn test_put_batch_rolls_back() {
        let (_temp_dir, store) = setup();
        let store = store.with_clock(fixed_now);
        let token = TokenResolution::Nanos.token_at(fixed_now());

        // Occupy every name the second file could get.
        std::fs::create_dir_all(store.base_path()).unwrap();
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = stored_name(token + attempt, "taken.txt");
            std::fs::write(store.base_path().join(name), b"occupied").unwrap();
        }

        let blobs = vec![
            IncomingBlob::new("fresh.txt", "fresh"),
            IncomingBlob::new("taken.txt", "blocked"),
        ];
        let err = store.put_batch(&blobs).await.unwrap_err();

        assert!(matches!(err, StoreError::NamesExhausted(_)));
        let listed = store.list_blobs().await.unwrap().entries;
        assert_eq!(listed.len(), MAX_NAME_ATTEMPTS as usize);
        assert!(listed.iter().all(|entry| entry.filename.ends_with("_taken.txt")));
    }

    #[tokio::test]
    async fn test_list_blobs_without_directory() {
        let (_temp_dir, store) = setup();
        let listing = store.list_blobs().await.unwrap();
        assert!(!listing.directory_found);
        assert!(listing.entries.is_empty());
    }

    #[tokio::test]
    async fn test_list_blobs_skips_directories() {
        let (_temp_dir, store) = setup();
        let stored = store.put_blob("kept.txt", b"kept").await.unwrap();
        std::fs::create_dir(store.base_path().join("nested")).unwrap();

        let listed = store.list_blobs().await.unwrap().entries;

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, stored.filename);
    }

    #[tokio::test]
    async fn test_listing_entry_skips_unreadable_metadata() {
        let denied = io::Error::new(ErrorKind::PermissionDenied, "denied");
        assert_eq!(listing_entry(OsStr::new("123_gone.txt"), Err(denied)), None);

        let (_temp_dir, store) = setup();
        let stored = store.put_blob("kept.txt", b"kept").await.unwrap();
        let dir_metadata = fs::metadata(store.base_path()).await;
        assert_eq!(listing_entry(OsStr::new("nested"), dir_metadata), None);

        let file_metadata = fs::metadata(&stored.path).await;
        let listed = listing_entry(OsStr::new(&stored.filename), file_metadata).unwrap();
        assert_eq!(listed.filename, stored.filename);
        assert_eq!(listed.size, 4);
    }

    #[tokio::test]
    async fn test_list_blobs_empty_directory() {
        let (_temp_dir, store) = setup();
        std::fs::create_dir_all(store.base_path()).unwrap();

        let listing = store.list_blobs().await.unwrap();
        assert!(listing.directory_found);
        assert!(listing.entries.is_empty());
    }

    #[tokio::test]
    async fn test_locate_blob_not_found() {
        let (_temp_dir, store) = setup();
        let name = format!("{}.txt", Uuid::new_v4());

        assert!(matches!(store.locate_blob(&name).await, Err(StoreError::NotFound)));
        store.put_blob("other.txt", b"x").await.unwrap();
        assert!(matches!(store.locate_blob(&name).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_locate_blob_rejects_unsafe_names() {
        let (_temp_dir, store) = setup();

        assert!(matches!(store.locate_blob("").await, Err(StoreError::EmptyName)));
        for name in ["../Cargo.toml", "..", ".hidden", "a/b", "a\\b"] {
            let err = store.locate_blob(name).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidName(_)), "{name} was accepted");
            assert!(err.is_caller_error());
        }
    }

    #[tokio::test]
    async fn test_locate_blob_ignores_directories() {
        let (_temp_dir, store) = setup();
        std::fs::create_dir_all(store.base_path().join("123_dir")).unwrap();

        assert!(matches!(store.locate_blob("123_dir").await, Err(StoreError::NotFound)));
    }
}
