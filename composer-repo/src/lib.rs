//! # Composer Repository Index
//!
//! Maintains the JSON indices of a PHP Composer package repository on top of a
//! key-addressed blob store. Every published package document is merged into
//! two views:
//!
//! - the global index, `packages.json`, holding every package
//! - a per-package index, `vendor/pkg.json`, holding one package's versions
//!
//! ## Key Modules
//!
//! - [`repository`]: the `add` / `packages` orchestration
//! - [`packages`]: the index view and its merge rules
//! - [`package`]: parsed package metadata documents
//! - [`name`]: package names and derived storage keys
//! - [`storage`]: the blob store contract plus file and memory stores
//! - [`config`]: configuration loading
//! - [`error`]: error types and reports
//! - [`validation`]: key and name validation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use composer_repo::{FileStorage, Key, Repository};
//!
//! # async fn example() -> composer_repo::RepoResult<()> {
//! let repo = Repository::new(Arc::new(FileStorage::new("./data")));
//! let key = Key::new("uploads/vendor-pkg-1.0.0.json").expect("valid key");
//! let added = repo.add(&key).await?;
//! let index = repo.packages_of(&added.name).await?;
//! println!("{:?}", index.version_strings(&added.name));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod name;
pub mod package;
pub mod packages;
pub mod repository;
pub mod storage;
pub mod validation;

pub use config::{RepoConfig, DEFAULT_GLOBAL_KEY};
pub use error::{ErrorCode, ErrorReport, RepoError, RepoResult};
pub use name::Name;
pub use package::Package;
pub use packages::{Merge, MergePolicy, Packages};
pub use repository::{Added, Repository};
pub use storage::{FileStorage, InMemoryStorage, Key, Storage};
pub use validation::{ValidationError, ValidationResult};
