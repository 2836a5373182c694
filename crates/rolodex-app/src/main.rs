#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::multiple_crate_versions)]

//! Binary entrypoint: scan the configured storage root, import what was found,
//! and print the dispatch as JSON.

use rolodex_app::{AppResult, run_app};

/// Runs one import and exits.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
