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
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! vCard import pipeline: discovery, caching, meta collection, and dispatch.
//!
//! Layout:
//! - `discovery.rs` walks a storage root for candidate files.
//! - `cache.rs` copies single-read sources into private cache files.
//! - `vcard.rs` and `charset.rs` probe cached files for meta information, and
//!   `meta.rs` drives the 2.1 to 3.0 fallback.
//! - `dispatch.rs` builds the request handed to the downstream consumer.
//! - `run.rs` holds the per-run state machine; `service.rs` wires it all
//!   together with events, metrics, and background workers.

pub mod account;
pub mod cache;
pub mod cancel;
pub mod charset;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod keep_awake;
pub mod meta;
pub mod model;
pub mod run;
pub mod selection;
pub mod service;
pub mod source;
pub mod vcard;

pub use account::{AccountChoice, AccountRegistry, StaticAccountRegistry, resolve_account};
pub use cache::{CacheCopier, CacheSession};
pub use cancel::CancellationFlag;
pub use charset::CharsetEstimator;
pub use discovery::{DiscoveryOutcome, FileDiscovery};
pub use dispatch::{ChannelConsumer, ImportConsumer, ImportDispatcher};
pub use error::{ErrorKind, ImportError, ImportResult};
pub use keep_awake::{KeepAwake, KeepAwakeGuard, NoopKeepAwake};
pub use meta::{CollectionSummary, MetaInfoCollector};
pub use model::{
    Account, CachedEntry, CandidateFile, FormatVersion, ImportDispatch, SourceLocator, SourceType,
    VcardMeta,
};
pub use run::{PipelineRun, transition_allowed};
pub use selection::{Selection, SelectionPrompt, selection_prompt};
pub use service::{ImportHandle, ImportOutcome, ImportRequest, ImportService, ScanHandle, ScanOutcome};
pub use source::{FileSourceOpener, SourceOpener};
pub use vcard::{MalformedReason, ProbeOutcome, StructuralProbe, VcardProbe};
