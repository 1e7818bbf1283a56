//! 3D asset storage: metadata rows in SQL, bytes in a [`BlobStore`].

pub mod blob_store;
pub mod catalog;
pub mod glb;

pub use blob_store::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use catalog::{AssetFile, NewAsset};
