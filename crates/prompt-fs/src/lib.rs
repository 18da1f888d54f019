//! Filesystem layer for prompt-manager
//!
//! Provides cached recursive scans, local tree mirroring, and source
//! location validation.

pub mod cache;
pub mod error;
pub mod mirror;
pub mod path;
pub mod scan;

pub use cache::{FileCache, DEFAULT_CACHE_TTL};
pub use error::{Error, Result};
pub use mirror::{mirror_tree, EXCLUDED_DIRS};
pub use path::{is_git_url, validate_source};
pub use scan::list_files;
