//! Sandboxed scratch storage for short-lived artifacts.
//!
//! Generated archives that are not streamed straight to the client are parked here until
//! they are downloaded. The engine guarantees that:
//!
//! - **Paths stay inside the root**: relative paths only, `..` may never climb above the root,
//!   and symlinked parents pointing outside are rejected.
//! - **Writes are atomic**: data goes to a unique temp file, is synced, then renamed into place,
//!   so a reader never sees a half-written archive.
//! - **Leftovers are reclaimed**: on connect (and on demand) temp files and artifacts older than
//!   the retention window are removed.
//!
//! # Examples
//!
//! ```rust
//! use nsgen_storage::{Storage, StorageError};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("scratch");
//!     let storage = Storage::builder()
//!         .root(&root)
//!         .retention(Duration::from_secs(300))
//!         .connect()
//!         .await?;
//!
//!     storage.write("Xb7k2.zip", b"PK...").await?;
//!     assert_eq!(storage.read("Xb7k2.zip").await?, b"PK...");
//!
//!     storage.delete("Xb7k2.zip").await?;
//!     assert!(!storage.exists("Xb7k2.zip")?);
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod security;

pub use builder::StorageBuilder;
pub use engine::Storage;
pub use error::{StorageError, StorageErrorExt};
