//! Building the dispatch request and handing it downstream.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{ImportError, ImportResult};
use crate::model::{Account, CachedEntry, FormatVersion, ImportDispatch, SourceLocator};

const FALLBACK_CHARSET: &str = "UTF-8";

/// Receiver of completed dispatches.
pub trait ImportConsumer: Send + Sync {
    /// Accept one dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ConsumerClosed`] when the consumer no longer
    /// accepts work.
    fn consume(&self, dispatch: ImportDispatch) -> ImportResult<()>;
}

/// Consumer forwarding dispatches over an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelConsumer {
    sender: mpsc::UnboundedSender<ImportDispatch>,
}

impl ChannelConsumer {
    /// Consumer paired with the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ImportDispatch>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ImportConsumer for ChannelConsumer {
    fn consume(&self, dispatch: ImportDispatch) -> ImportResult<()> {
        let run_id = dispatch.run_id;
        self.sender
            .send(dispatch)
            .map_err(|_| ImportError::ConsumerClosed { run_id })
    }
}

/// Assembles [`ImportDispatch`] values from collected entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportDispatcher;

impl ImportDispatcher {
    /// Parallel arrays for every supported entry, in source order.
    #[must_use]
    pub fn build(run_id: Uuid, entries: &[CachedEntry], account: Option<&Account>) -> ImportDispatch {
        let supported: Vec<&CachedEntry> = entries.iter().filter(|entry| entry.is_supported()).collect();
        ImportDispatch {
            run_id,
            cache_locators: supported
                .iter()
                .map(|entry| SourceLocator::from_path(&entry.destination_path))
                .collect(),
            account_name: account.map(|account| account.name.clone()),
            account_type: account.map(|account| account.account_type.clone()),
            use_v30: supported
                .iter()
                .map(|entry| entry.estimated_format_version == Some(FormatVersion::V30))
                .collect(),
            estimated_types: supported
                .iter()
                .map(|entry| entry.estimated_source_type)
                .collect(),
            charsets: supported
                .iter()
                .map(|entry| {
                    entry
                        .estimated_charset
                        .clone()
                        .unwrap_or_else(|| FALLBACK_CHARSET.to_string())
                })
                .collect(),
            entry_counts: supported.iter().map(|entry| entry.entry_count).collect(),
        }
    }
}
