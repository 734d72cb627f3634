//! # treehub-storage
//!
//! Blob store adapters for TreeHub. Every adapter implements
//! [`BlobStore`](treehub_core::traits::BlobStore): the local filesystem
//! and in-memory stores hand out URLs signed with [`UrlSigner`], the S3
//! store (feature `s3`) uses native presigning.

pub mod factory;
pub mod key;
pub mod mime;
pub mod providers;
pub mod signing;

pub use factory::open_blob_store;
pub use key::{generate_key, validate_key};
pub use providers::{LocalBlobStore, MemoryBlobStore};
pub use signing::{BlobClaims, UrlSigner};
