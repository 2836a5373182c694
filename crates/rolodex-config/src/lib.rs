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
#![allow(clippy::module_name_repetitions)]

//! Configuration for the vCard import pipeline.
//!
//! Layout: `model.rs` (typed policy and logging settings), `defaults.rs`
//! (baseline values), `validate.rs` (validation/parsing helpers), `loader.rs`
//! (JSON file plus `ROLODEX_*` environment overrides).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_CONFIG_PATH, ENV_PREFIX};
pub use model::{ImportPolicy, LogFormatSetting, LoggingSettings, RolodexConfig};
pub use validate::validate_config;
