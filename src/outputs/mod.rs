//! Renderers for the assembled feed.
//!
//! Both renderers consume only the output of [`crate::feed::assemble`] and
//! the session's [`crate::session::FeedStatus`]; they never look inside the
//! article store.
//!
//! # Submodules
//!
//! - [`markdown`]: human-readable feed with date separators and article cards
//! - [`json`]: machine-readable snapshot written to `{json_output_dir}/feed.json`

pub mod json;
pub mod markdown;
