//! Data carried between pipeline stages.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const FILE_SCHEME: &str = "file://";

/// Opaque URI naming a readable source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocator(String);

impl SourceLocator {
    /// Wrap an arbitrary URI string.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// `file://` locator for a local path.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self(format!("{FILE_SCHEME}{}", path.display()))
    }

    /// Raw URI string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local path for `file://` locators and bare absolute paths.
    #[must_use]
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.0.strip_prefix(FILE_SCHEME) {
            return Some(PathBuf::from(path));
        }
        let path = Path::new(&self.0);
        path.is_absolute().then(|| path.to_path_buf())
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File found by discovery. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFile {
    /// File name shown to the user.
    pub display_name: String,
    /// Canonical path, unique within one discovery run.
    pub canonical_path: PathBuf,
    /// Last modification time in milliseconds since the Unix epoch.
    pub last_modified_ms: i64,
}

impl CandidateFile {
    /// Locator handed to the cache copier.
    #[must_use]
    pub fn locator(&self) -> SourceLocator {
        SourceLocator::from_path(&self.canonical_path)
    }

    /// Two-line label for selection lists: name, then local modification time.
    #[must_use]
    pub fn display_label(&self) -> String {
        Local
            .timestamp_millis_opt(self.last_modified_ms)
            .single()
            .map_or_else(
                || self.display_name.clone(),
                |when| {
                    format!(
                        "{}\n({})",
                        self.display_name,
                        when.format("%Y-%m-%d %H:%M:%S")
                    )
                },
            )
    }
}

/// Estimated vCard dialect of a cached file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatVersion {
    /// vCard 2.1.
    V21,
    /// vCard 3.0.
    V30,
    /// No known dialect.
    Unsupported,
}

impl FormatVersion {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V21 => "2.1",
            Self::V30 => "3.0",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Producer family inferred from vendor extension properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// No vendor markers.
    #[default]
    Generic,
    /// Apple address book exports.
    Apple,
    /// Outlook and Windows Mobile exports.
    Outlook,
    /// Japanese feature phones.
    JapaneseMobile,
    /// `NTT DOCOMO` handsets.
    Docomo,
}

impl SourceType {
    /// Whether files from this producer default to Shift_JIS.
    #[must_use]
    pub const fn prefers_shift_jis(self) -> bool {
        matches!(self, Self::JapaneseMobile | Self::Docomo)
    }
}

/// Meta information collected from one cached file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcardMeta {
    /// Dialect that accepted the file.
    pub version: FormatVersion,
    /// Producer family.
    pub source_type: SourceType,
    /// Estimated character set name.
    pub charset: String,
    /// Number of top-level cards.
    pub entry_count: u64,
}

/// A source copied into pipeline-local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// Position of the source in the selection.
    pub source_index: usize,
    /// Cache file holding the copied bytes.
    pub destination_path: PathBuf,
    /// Dialect, filled in by the collector.
    pub estimated_format_version: Option<FormatVersion>,
    /// Character set name, filled in by the collector.
    pub estimated_charset: Option<String>,
    /// Producer family, filled in by the collector.
    pub estimated_source_type: SourceType,
    /// Top-level card count, filled in by the collector.
    pub entry_count: u64,
    /// Whether a card was found inside another card.
    pub nested_detected: bool,
}

impl CachedEntry {
    /// Entry for a freshly copied source.
    #[must_use]
    pub const fn new(source_index: usize, destination_path: PathBuf) -> Self {
        Self {
            source_index,
            destination_path,
            estimated_format_version: None,
            estimated_charset: None,
            estimated_source_type: SourceType::Generic,
            entry_count: 0,
            nested_detected: false,
        }
    }

    /// Record what a probe learned.
    pub fn record_meta(&mut self, meta: VcardMeta, nested: bool) {
        self.estimated_format_version = Some(meta.version);
        self.estimated_charset = Some(meta.charset);
        self.estimated_source_type = meta.source_type;
        self.entry_count = meta.entry_count;
        self.nested_detected = nested;
    }

    /// Record that no dialect accepted the file.
    pub const fn mark_unsupported(&mut self) {
        self.estimated_format_version = Some(FormatVersion::Unsupported);
    }

    /// Whether the collector accepted this entry.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(
            self.estimated_format_version,
            Some(FormatVersion::V21 | FormatVersion::V30)
        )
    }
}

/// Account the imported contacts are stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: String,
}

impl Account {
    /// Construct an account.
    #[must_use]
    pub fn new(name: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_type: account_type.into(),
        }
    }

    /// Whether both fields are set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.account_type.trim().is_empty()
    }
}

/// Request handed to the downstream consumer. All arrays are parallel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDispatch {
    /// Run that produced the dispatch.
    pub run_id: Uuid,
    /// Cache file locators.
    pub cache_locators: Vec<SourceLocator>,
    /// Target account name; `None` stores on the phone.
    pub account_name: Option<String>,
    /// Target account type; `None` stores on the phone.
    pub account_type: Option<String>,
    /// `true` when the file is vCard 3.0.
    pub use_v30: Vec<bool>,
    /// Producer family per file.
    pub estimated_types: Vec<SourceType>,
    /// Character set name per file.
    pub charsets: Vec<String>,
    /// Top-level card count per file.
    pub entry_counts: Vec<u64>,
}

impl ImportDispatch {
    /// Number of dispatched files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache_locators.len()
    }

    /// Whether no file is dispatched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache_locators.is_empty()
    }

    /// Sum of the entry counts.
    #[must_use]
    pub fn total_entries(&self) -> u64 {
        self.entry_counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locators_round_trip_local_paths() {
        let locator = SourceLocator::from_path(Path::new("/sdcard/a.vcf"));
        assert_eq!(locator.as_str(), "file:///sdcard/a.vcf");
        assert_eq!(locator.to_file_path(), Some(PathBuf::from("/sdcard/a.vcf")));
        assert_eq!(
            SourceLocator::new("/tmp/b.vcf").to_file_path(),
            Some(PathBuf::from("/tmp/b.vcf"))
        );
        assert_eq!(SourceLocator::new("content://contacts/1").to_file_path(), None);
    }

    #[test]
    fn display_label_has_name_and_timestamp() {
        let candidate = CandidateFile {
            display_name: "friends.vcf".into(),
            canonical_path: PathBuf::from("/sdcard/friends.vcf"),
            last_modified_ms: 1_700_000_000_000,
        };
        let label = candidate.display_label();
        let (name, when) = label.split_once('\n').expect("two lines");
        assert_eq!(name, "friends.vcf");
        assert!(when.starts_with('(') && when.ends_with(')'));
        assert_eq!(when.len(), "(yyyy-mm-dd hh:mm:ss)".len());
        assert_eq!(candidate.locator().as_str(), "file:///sdcard/friends.vcf");
    }

    #[test]
    fn entry_support_tracks_meta() {
        let mut entry = CachedEntry::new(0, PathBuf::from("/cache/x.vcf"));
        assert!(!entry.is_supported());
        entry.record_meta(
            VcardMeta {
                version: FormatVersion::V30,
                source_type: SourceType::Apple,
                charset: "UTF-8".into(),
                entry_count: 4,
            },
            false,
        );
        assert!(entry.is_supported());
        entry.mark_unsupported();
        assert!(!entry.is_supported());
    }

    #[test]
    fn accounts_need_both_fields() {
        assert!(Account::new("me@example.com", "com.example").is_complete());
        assert!(!Account::new("", "com.example").is_complete());
    }
}
