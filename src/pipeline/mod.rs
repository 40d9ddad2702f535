//! Pipeline stages for fetch → edit → partition.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the two network-facing steps sit behind traits that tests can
//! replace.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ pages (optional) ──▶ extract
//! (HTTP GET)  (lopdf edit)        (stage file → partition API → records)
//! ```
//!
//! 1. [`fetch`]   — download the source PDF into memory ([`fetch::Fetcher`])
//! 2. [`pages`]   — remove 1-based pages from the in-memory document; runs in
//!    `spawn_blocking` because parsing and re-serialising is CPU-bound
//! 3. [`extract`] — write a randomly named staging file, call the partition
//!    service ([`extract::PartitionService`]), remove the file on every path

pub mod extract;
pub mod fetch;
pub mod pages;
