pub mod errors;
pub mod local_store;
pub mod naming;
pub mod store;

pub use errors::{StoreError, StoreResult};
pub use local_store::LocalFileBlobStore;
pub use naming::TokenResolution;
pub use store::{BlobEntry, BlobListing, BlobStore, IncomingBlob, StoredBlob};
