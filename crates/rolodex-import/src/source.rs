//! Opening selected sources for a single read.

use std::fs::File;
use std::io::{self, Read};

use crate::model::SourceLocator;

/// Opens a locator for exactly one sequential read.
pub trait SourceOpener: Send + Sync {
    /// Open `locator`. The returned reader is dropped before the next source is opened.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the source cannot be opened.
    fn open(&self, locator: &SourceLocator) -> io::Result<Box<dyn Read + Send>>;
}

/// Opener for `file://` locators and bare absolute paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSourceOpener;

impl SourceOpener for FileSourceOpener {
    fn open(&self, locator: &SourceLocator) -> io::Result<Box<dyn Read + Send>> {
        let path = locator.to_file_path().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Unsupported, "locator scheme is not file://")
        })?;
        Ok(Box::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rolodex_test_support::fixtures::{scratch_dir, write_file};

    #[test]
    fn opens_file_locators() -> Result<()> {
        let temp = scratch_dir("source-")?;
        let path = write_file(temp.path(), "a.vcf", "BEGIN:VCARD")?;
        let mut reader = FileSourceOpener.open(&SourceLocator::from_path(&path))?;
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        assert_eq!(text, "BEGIN:VCARD");
        Ok(())
    }

    #[test]
    fn rejects_foreign_schemes() {
        let err = FileSourceOpener
            .open(&SourceLocator::new("content://contacts/7"))
            .err()
            .map(|err| err.kind());
        assert_eq!(err, Some(io::ErrorKind::Unsupported));
    }
}
