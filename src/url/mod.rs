//! URL handling module for Site-Downloader
//!
//! This module provides the URL helpers the download engine relies on:
//! domain keys for grouping failure statistics, file extension detection, and
//! filename sanitization for saved files.

mod domain;
mod extension;
mod filename;

// Re-export main functions
pub use domain::{domain_key, extract_host};
pub use extension::{is_image_url, url_extension, AssetClass};
pub use filename::{is_filename_char, last_segment, usable_filename};
