//! Character set estimation for cached vCard files.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};

use crate::model::SourceType;

/// Accumulates evidence about a file's character set while it is scanned.
///
/// Precedence: an explicit `CHARSET=` parameter, then the producer's known
/// default, then a statistical guess. ASCII-only input is reported as UTF-8.
pub struct CharsetEstimator {
    detector: EncodingDetector,
    non_ascii: bool,
    explicit: Option<String>,
}

impl CharsetEstimator {
    /// Estimator with no evidence yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            detector: EncodingDetector::new(),
            non_ascii: false,
            explicit: None,
        }
    }

    /// Feed raw bytes to the statistical detector.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.detector.feed(bytes, false) {
            self.non_ascii = true;
        }
    }

    /// Record a `CHARSET=` parameter value. The first one seen wins.
    pub fn observe_parameter(&mut self, label: &[u8]) {
        if self.explicit.is_some() {
            return;
        }
        let label = trim_quotes(label);
        if label.is_empty() {
            return;
        }
        self.explicit = Some(Encoding::for_label(label).map_or_else(
            || String::from_utf8_lossy(label).to_ascii_uppercase(),
            |encoding| encoding.name().to_string(),
        ));
    }

    /// Final estimate given the detected producer.
    #[must_use]
    pub fn finish(mut self, source_type: SourceType) -> String {
        if let Some(explicit) = self.explicit {
            return explicit;
        }
        if source_type.prefers_shift_jis() {
            return SHIFT_JIS.name().to_string();
        }
        if !self.non_ascii {
            return UTF_8.name().to_string();
        }
        self.detector.feed(&[], true);
        self.detector.guess(None, true).name().to_string()
    }
}

impl Default for CharsetEstimator {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_quotes(label: &[u8]) -> &[u8] {
    let label = label.trim_ascii();
    label
        .strip_prefix(b"\"")
        .and_then(|inner| inner.strip_suffix(b"\""))
        .unwrap_or(label)
}
