//! Stowage Storage Library
//!
//! Storage adapters and the services that drive them. The [`StorageAdapter`]
//! trait is the byte-level capability a backend provides; [`StorageService`]
//! keeps the named adapters and [`FileStorage`] runs the file lifecycle
//! (path and URL assignment, hooks, writes and deletes) on top of it.
//!
//! # Storage paths
//!
//! Paths handed to adapters are relative and `/` separated. Adapters normalize
//! them before use: backslashes become `/`, empty and `.` segments are dropped
//! and `..` is rejected.

pub mod adapter;
pub mod collection;
pub mod factory;
pub mod file_storage;
pub(crate) mod keys;
pub mod local;
pub mod memory;
pub mod service;

// Re-export commonly used types
pub use adapter::{BackendError, BackendResult, ByteStream, StorageAdapter};
pub use collection::AdapterCollection;
pub use factory::{AdapterFactory, LocalAdapterFactory, MemoryAdapterFactory, StorageAdapterFactory};
pub use file_storage::FileStorage;
pub use local::LocalStorage;
pub use memory::{MemoryStorage, StorageOp};
pub use service::StorageService;
