//! Metadata-only probes for vCard 2.1 and 3.0 files.
//!
//! A probe walks the file line by line, tracking card nesting, and reports a
//! tagged [`ProbeOutcome`] rather than failing through errors, so the collector
//! can drive the 2.1 to 3.0 fallback with plain branching.

use std::io::{self, BufRead};

use crate::charset::CharsetEstimator;
use crate::model::{FormatVersion, SourceType, VcardMeta};

/// Result of probing one file with one dialect.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// Structure is sound and every card matched the dialect.
    Parsed(VcardMeta),
    /// Like [`ProbeOutcome::Parsed`], but a card was found inside another card.
    Nested(VcardMeta),
    /// A card declared a different version (or none where one is required).
    VersionMismatch {
        /// Declared version, when present.
        found: Option<String>,
    },
    /// The content is not a vCard stream at all.
    Unsupported,
    /// The card structure is broken.
    Malformed {
        /// One-based line number of the fault.
        line: u64,
        /// What was wrong.
        reason: MalformedReason,
    },
    /// Reading the file failed.
    IoFailure(io::Error),
}

/// Structural faults that abort meta collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// A property line outside any card.
    ContentOutsideCard,
    /// `END:VCARD` with no open card.
    EndWithoutBegin,
    /// Input ended inside a card.
    UnterminatedCard,
}

impl MalformedReason {
    /// Stable label carried by errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContentOutsideCard => "content_outside_card",
            Self::EndWithoutBegin => "end_without_begin",
            Self::UnterminatedCard => "unterminated_card",
        }
    }
}

/// Dialect-specific metadata probe.
pub trait VcardProbe: Send + Sync {
    /// Dialect this probe accepts.
    fn version(&self) -> FormatVersion;

    /// Probe a whole file.
    fn probe(&self, reader: &mut dyn BufRead) -> ProbeOutcome;
}

/// Line-oriented probe for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct StructuralProbe {
    version: FormatVersion,
}

impl StructuralProbe {
    /// Probe accepting vCard 2.1; cards without a `VERSION` line count as 2.1.
    #[must_use]
    pub const fn v21() -> Self {
        Self {
            version: FormatVersion::V21,
        }
    }

    /// Probe accepting vCard 3.0, which requires a `VERSION` line.
    #[must_use]
    pub const fn v30() -> Self {
        Self {
            version: FormatVersion::V30,
        }
    }
}

impl VcardProbe for StructuralProbe {
    fn version(&self) -> FormatVersion {
        self.version
    }

    fn probe(&self, reader: &mut dyn BufRead) -> ProbeOutcome {
        Scan::new(self.version).run(reader)
    }
}

struct Scan {
    expected: FormatVersion,
    depth: usize,
    entries: u64,
    nested: bool,
    version_seen: bool,
    soft_break: bool,
    line: u64,
    charset: CharsetEstimator,
    source: SourceTypeDetector,
}

impl Scan {
    fn new(expected: FormatVersion) -> Self {
        Self {
            expected,
            depth: 0,
            entries: 0,
            nested: false,
            version_seen: false,
            soft_break: false,
            line: 0,
            charset: CharsetEstimator::new(),
            source: SourceTypeDetector::default(),
        }
    }

    fn run(mut self, reader: &mut dyn BufRead) -> ProbeOutcome {
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return ProbeOutcome::IoFailure(err),
            }
            self.line += 1;
            self.charset.feed(&raw);
            if raw.contains(&0) {
                return ProbeOutcome::Unsupported;
            }
            if let Some(outcome) = self.step(trim_line_end(&raw)) {
                return outcome;
            }
        }
        self.finish()
    }

    fn step(&mut self, text: &[u8]) -> Option<ProbeOutcome> {
        if self.soft_break {
            self.soft_break = text.ends_with(b"=");
            return None;
        }
        if text.trim_ascii().is_empty() {
            return None;
        }
        if self.depth > 0 && matches!(text.first(), Some(b' ' | b'\t')) {
            return None;
        }

        let property = Property::split(text);
        if property.name.eq_ignore_ascii_case(b"BEGIN") {
            return self.begin(property.value.trim_ascii());
        }
        if property.name.eq_ignore_ascii_case(b"END") {
            return self.end(property.value.trim_ascii());
        }
        if self.depth == 0 {
            return Some(self.malformed(MalformedReason::ContentOutsideCard));
        }
        if self.depth == 1 && property.name.eq_ignore_ascii_case(b"VERSION") {
            self.version_seen = true;
            let declared = property.value.trim_ascii();
            if parse_version(declared) != Some(self.expected) {
                return Some(ProbeOutcome::VersionMismatch {
                    found: Some(String::from_utf8_lossy(declared).into_owned()),
                });
            }
        }
        self.source.observe(property.name);
        for parameter in property.params.split(|byte| *byte == b';') {
            if let Some(value) = parameter_value(parameter, b"CHARSET") {
                self.charset.observe_parameter(value);
            }
        }
        self.soft_break = text.ends_with(b"=") && is_quoted_printable(property.params);
        None
    }

    fn begin(&mut self, kind: &[u8]) -> Option<ProbeOutcome> {
        if !kind.eq_ignore_ascii_case(b"VCARD") {
            return (self.depth == 0).then_some(ProbeOutcome::Unsupported);
        }
        if self.depth == 0 {
            self.entries += 1;
            self.version_seen = false;
        } else {
            self.nested = true;
        }
        self.depth += 1;
        None
    }

    fn end(&mut self, kind: &[u8]) -> Option<ProbeOutcome> {
        if !kind.eq_ignore_ascii_case(b"VCARD") {
            return None;
        }
        if self.depth == 0 {
            return Some(self.malformed(MalformedReason::EndWithoutBegin));
        }
        if self.depth == 1 && !self.version_seen && self.expected == FormatVersion::V30 {
            return Some(ProbeOutcome::VersionMismatch { found: None });
        }
        self.depth -= 1;
        None
    }

    const fn malformed(&self, reason: MalformedReason) -> ProbeOutcome {
        ProbeOutcome::Malformed {
            line: self.line,
            reason,
        }
    }

    fn finish(self) -> ProbeOutcome {
        if self.depth > 0 {
            return self.malformed(MalformedReason::UnterminatedCard);
        }
        let source_type = self.source.estimate();
        let meta = VcardMeta {
            version: self.expected,
            source_type,
            charset: self.charset.finish(source_type),
            entry_count: self.entries,
        };
        if self.nested {
            ProbeOutcome::Nested(meta)
        } else {
            ProbeOutcome::Parsed(meta)
        }
    }
}

/// Property line split into group-free name, parameters, and value.
struct Property<'a> {
    name: &'a [u8],
    params: &'a [u8],
    value: &'a [u8],
}

impl<'a> Property<'a> {
    fn split(line: &'a [u8]) -> Self {
        let (head, value) = match line.iter().position(|byte| *byte == b':') {
            Some(colon) => (&line[..colon], &line[colon + 1..]),
            None => (line, &line[line.len()..]),
        };
        let (name, params) = match head.iter().position(|byte| *byte == b';') {
            Some(semi) => (&head[..semi], &head[semi + 1..]),
            None => (head, &head[head.len()..]),
        };
        let name = name
            .iter()
            .rposition(|byte| *byte == b'.')
            .map_or(name, |dot| &name[dot + 1..]);
        Self {
            name: name.trim_ascii(),
            params,
            value,
        }
    }
}

fn trim_line_end(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

fn parse_version(declared: &[u8]) -> Option<FormatVersion> {
    match declared {
        b"2.1" => Some(FormatVersion::V21),
        b"3.0" => Some(FormatVersion::V30),
        _ => None,
    }
}

fn parameter_value<'a>(parameter: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    let eq = parameter.iter().position(|byte| *byte == b'=')?;
    parameter[..eq]
        .trim_ascii()
        .eq_ignore_ascii_case(key)
        .then(|| &parameter[eq + 1..])
}

fn is_quoted_printable(params: &[u8]) -> bool {
    params.split(|byte| *byte == b';').any(|parameter| {
        let value = parameter_value(parameter, b"ENCODING").unwrap_or(parameter);
        value.trim_ascii().eq_ignore_ascii_case(b"QUOTED-PRINTABLE")
    })
}

/// Infers the producer from vendor extension property names.
#[derive(Debug, Default)]
struct SourceTypeDetector {
    apple: bool,
    outlook: bool,
    japanese_mobile: bool,
    docomo: bool,
}

const APPLE_PREFIXES: &[&[u8]] = &[b"X-PHONETIC-", b"X-ABUID", b"X-ABADR", b"X-ABLABEL"];
const OUTLOOK_PREFIXES: &[&[u8]] = &[b"X-MICROSOFT-", b"X-MS-"];
const JAPANESE_MOBILE_NAMES: &[&[u8]] = &[b"X-GNO", b"X-GN", b"X-REDUCTION"];
const DOCOMO_PREFIXES: &[&[u8]] = &[b"X-SD-", b"X-DCM-"];

impl SourceTypeDetector {
    fn observe(&mut self, name: &[u8]) {
        if name.len() < 2 || !name[..2].eq_ignore_ascii_case(b"X-") {
            return;
        }
        let upper = name.to_ascii_uppercase();
        let has_prefix = |prefixes: &[&[u8]]| prefixes.iter().any(|prefix| upper.starts_with(prefix));
        if has_prefix(DOCOMO_PREFIXES) {
            self.docomo = true;
        } else if JAPANESE_MOBILE_NAMES.contains(&upper.as_slice()) {
            self.japanese_mobile = true;
        } else if has_prefix(APPLE_PREFIXES) {
            self.apple = true;
        } else if has_prefix(OUTLOOK_PREFIXES) {
            self.outlook = true;
        }
    }

    const fn estimate(&self) -> SourceType {
        if self.docomo {
            SourceType::Docomo
        } else if self.japanese_mobile {
            SourceType::JapaneseMobile
        } else if self.apple {
            SourceType::Apple
        } else if self.outlook {
            SourceType::Outlook
        } else {
            SourceType::Generic
        }
    }
}
