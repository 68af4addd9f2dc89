//! Storage module for saving downloaded content under the root directory
//!
//! Concurrent tasks share nothing but the filesystem. Two tasks writing the
//! same path is resolved by checking for the target before writing rather than
//! by locking: targets are derived from URLs that are already deduplicated, so
//! such collisions are rare and harmless.

mod files;

pub use files::{
    ensure_parent_dir, resolve_save_path, write_page, write_stream, PersistOutcome, CHUNK_SIZE,
};
