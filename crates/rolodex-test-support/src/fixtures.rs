//! vCard documents and scratch directory helpers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Create a scratch directory that is removed when dropped.
///
/// # Errors
///
/// Returns an error when the temporary directory cannot be created.
pub fn scratch_dir(prefix: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .context("failed to create scratch directory")
}

/// Single vCard 2.1 entry.
#[must_use]
pub fn vcard_v21(name: &str) -> String {
    format!("BEGIN:VCARD\r\nVERSION:2.1\r\nN:;{name};;;\r\nFN:{name}\r\nTEL;CELL:+1555000\r\nEND:VCARD\r\n")
}

/// Single vCard 3.0 entry.
#[must_use]
pub fn vcard_v30(name: &str) -> String {
    format!(
        "BEGIN:VCARD\r\nVERSION:3.0\r\nN:;{name};;;\r\nFN:{name}\r\nEMAIL;TYPE=INTERNET:{name}@example.com\r\nEND:VCARD\r\n"
    )
}

/// Single vCard 4.0 entry, which neither the 2.1 nor the 3.0 probe accepts.
#[must_use]
pub fn vcard_v40(name: &str) -> String {
    format!("BEGIN:VCARD\r\nVERSION:4.0\r\nFN:{name}\r\nEND:VCARD\r\n")
}

/// vCard 2.1 entry embedding a second card through `AGENT`.
#[must_use]
pub fn nested_vcard(name: &str, agent: &str) -> String {
    format!(
        "BEGIN:VCARD\r\nVERSION:2.1\r\nFN:{name}\r\nAGENT:\r\nBEGIN:VCARD\r\nVERSION:2.1\r\nFN:{agent}\r\nEND:VCARD\r\nEND:VCARD\r\n"
    )
}

/// Concatenate `count` vCard 2.1 entries.
#[must_use]
pub fn vcard_v21_batch(count: usize) -> String {
    (0..count).map(|idx| vcard_v21(&format!("Contact {idx}"))).collect()
}

/// Write `contents` to `root/relative`, creating parent directories.
///
/// # Errors
///
/// Returns an error when a directory or the file cannot be written.
pub fn write_file(root: &Path, relative: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write every `(relative path, contents)` pair below `root`.
///
/// # Errors
///
/// Returns an error when any file cannot be written.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) -> Result<Vec<PathBuf>> {
    files
        .iter()
        .map(|(relative, contents)| write_file(root, relative, contents))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_writer_creates_nested_files() -> Result<()> {
        let temp = scratch_dir("fixtures-")?;
        let written = write_tree(
            temp.path(),
            &[("a/b/c.vcf", "x"), ("top.txt", "y")],
        )?;
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(temp.path().join("a/b/c.vcf"))?, "x");
        Ok(())
    }

    #[test]
    fn documents_carry_expected_versions() {
        assert!(vcard_v21("A").contains("VERSION:2.1"));
        assert!(vcard_v30("A").contains("VERSION:3.0"));
        assert!(vcard_v40("A").contains("VERSION:4.0"));
        assert_eq!(nested_vcard("A", "B").matches("BEGIN:VCARD").count(), 2);
        assert_eq!(vcard_v21_batch(3).matches("BEGIN:VCARD").count(), 3);
    }
}
