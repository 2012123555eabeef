//! Senior News - a feed collector for a static site
//!
//! This crate fetches a fixed list of RSS/Atom feeds, merges them into a
//! deduplicated, freshest-first `news.json`, and keeps a day-keyed archive of
//! previously deployed snapshots.

pub mod archive;
pub mod config;
pub mod fallback;
pub mod fetcher;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod publish;
pub mod rank;
