use std::sync::Arc;

use crate::codes::CodeTable;
use crate::coverage::Coverage;
use crate::dictionary::Dictionary;

/// A coverage together with the translation table currently in force for it.
#[derive(Clone, Debug)]
pub struct StackEntry {
    coverage: Arc<Coverage>,
    table: Arc<CodeTable>,
}

impl StackEntry {
    #[must_use]
    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    #[must_use]
    pub fn table(&self) -> &CodeTable {
        &self.table
    }
}

/// Ordered coverages and their translation tables, lowest priority first.
///
/// A stack is immutable. Attaching a dictionary builds a new stack sharing the same
/// coverages, so composites running against an older stack are never disturbed.
#[derive(Clone, Debug, Default)]
pub struct CoverageStack {
    entries: Vec<StackEntry>,
    dictionary_attached: bool,
}

impl CoverageStack {
    /// Creates a stack where every coverage has an empty table.
    #[must_use]
    pub fn new(coverages: Vec<Coverage>) -> Self {
        let table = Arc::new(CodeTable::empty());
        let entries = coverages
            .into_iter()
            .map(|coverage| StackEntry {
                coverage: Arc::new(coverage),
                table: Arc::clone(&table),
            })
            .collect();
        Self {
            entries,
            dictionary_attached: false,
        }
    }

    /// Returns a copy of this stack with every table rebuilt against `dictionary`.
    #[must_use]
    pub fn with_dictionary(&self, dictionary: &dyn Dictionary) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|entry| StackEntry {
                coverage: Arc::clone(&entry.coverage),
                table: Arc::new(CodeTable::build(
                    entry.coverage.id(),
                    entry.coverage.mappings(),
                    Some(dictionary),
                )),
            })
            .collect();
        Self {
            entries,
            dictionary_attached: true,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_dictionary_attached(&self) -> bool {
        self.dictionary_attached
    }

    /// True when no table can map any raw code, so every composite is all no-data.
    #[must_use]
    pub fn maps_nothing(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.table.mapped_codes().next().is_none())
    }
}
