//! Choosing which discovered files to import.

use std::collections::BTreeSet;

use rolodex_config::ImportPolicy;

use crate::error::{ImportError, ImportResult};
use crate::model::CandidateFile;

/// What the invoking context should ask the user after a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPrompt {
    /// Import every candidate without asking.
    ImportAll,
    /// Offer one, multiple, or all.
    ChooseImportType,
    /// Offer a single-file picker.
    ChooseOne,
}

/// Decide how to ask for a selection among `candidates` files.
#[must_use]
pub const fn selection_prompt(candidates: usize, policy: &ImportPolicy) -> SelectionPrompt {
    if candidates == 1 || policy.import_all_automatically {
        SelectionPrompt::ImportAll
    } else if policy.allow_select_all {
        SelectionPrompt::ChooseImportType
    } else {
        SelectionPrompt::ChooseOne
    }
}

/// User's choice among the discovered candidates, by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Exactly one file.
    One(usize),
    /// A non-empty set of files.
    Multiple(BTreeSet<usize>),
    /// Every file.
    All,
}

impl Selection {
    /// Selected candidates in ascending index order.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidInput`] for an out-of-range index or an
    /// empty multiple selection.
    pub fn resolve<'a>(&self, candidates: &'a [CandidateFile]) -> ImportResult<Vec<&'a CandidateFile>> {
        match self {
            Self::All => Ok(candidates.iter().collect()),
            Self::One(index) => Ok(vec![pick(candidates, *index)?]),
            Self::Multiple(indices) if indices.is_empty() => Err(ImportError::invalid_input(
                "selection",
                "empty",
                None,
            )),
            Self::Multiple(indices) => indices
                .iter()
                .map(|index| pick(candidates, *index))
                .collect(),
        }
    }
}

fn pick(candidates: &[CandidateFile], index: usize) -> ImportResult<&CandidateFile> {
    candidates.get(index).ok_or_else(|| {
        ImportError::invalid_input("selection", "out_of_range", Some(index.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidates(count: usize) -> Vec<CandidateFile> {
        (0..count)
            .map(|idx| CandidateFile {
                display_name: format!("{idx}.vcf"),
                canonical_path: PathBuf::from(format!("/sdcard/{idx}.vcf")),
                last_modified_ms: 0,
            })
            .collect()
    }

    #[test]
    fn prompt_follows_policy() {
        let mut policy = ImportPolicy::default();
        assert_eq!(selection_prompt(1, &policy), SelectionPrompt::ImportAll);
        assert_eq!(selection_prompt(3, &policy), SelectionPrompt::ChooseImportType);
        policy.allow_select_all = false;
        assert_eq!(selection_prompt(3, &policy), SelectionPrompt::ChooseOne);
        policy.import_all_automatically = true;
        assert_eq!(selection_prompt(3, &policy), SelectionPrompt::ImportAll);
    }

    #[test]
    fn multiple_selection_resolves_in_index_order() -> ImportResult<()> {
        let list = candidates(4);
        let chosen = Selection::Multiple(BTreeSet::from([3, 0, 2])).resolve(&list)?;
        let names: Vec<_> = chosen.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, ["0.vcf", "2.vcf", "3.vcf"]);
        assert_eq!(Selection::All.resolve(&list)?.len(), 4);
        assert_eq!(Selection::One(1).resolve(&list)?[0].display_name, "1.vcf");
        Ok(())
    }

    #[test]
    fn invalid_selections_are_rejected() {
        let list = candidates(2);
        assert!(matches!(
            Selection::One(2).resolve(&list),
            Err(ImportError::InvalidInput {
                reason: "out_of_range",
                ..
            })
        ));
        assert!(matches!(
            Selection::Multiple(BTreeSet::new()).resolve(&list),
            Err(ImportError::InvalidInput { reason: "empty", .. })
        ));
    }
}
