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
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Fixtures and instrumented readers shared by the Rolodex test suites.
//!
//! `fixtures` builds vCard documents in each dialect and writes them into
//! scratch trees; `mocks` wraps readers to count handles or inject failures.

pub mod fixtures;
pub mod mocks;
