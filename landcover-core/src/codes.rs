//! Per-coverage translation of raw coverage codes into dictionary codes.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dictionary::Dictionary;

/// Table entry for raw codes without a dictionary class.
pub const UNMAPPED: i32 = -1;

/// Largest raw value a mapping may use. Above it, `f32` texels no longer hold every
/// integer exactly, so neighbouring codes would decode to the same value.
pub const MAX_RAW_VALUE: u32 = 1 << f32::MANTISSA_DIGITS;

/// Associates a raw coverage value with a dictionary class name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMapping {
    /// Raw integer code as stored by the coverage
    pub value: u32,
    /// Name of the dictionary class this code stands for
    #[serde(rename = "class")]
    pub class_name: String,
}

impl ValueMapping {
    #[must_use]
    pub fn new(value: u32, class_name: impl Into<String>) -> Self {
        Self {
            value,
            class_name: class_name.into(),
        }
    }
}

/// Dense lookup from raw coverage code to dictionary code.
///
/// The table length is one more than the highest raw value that was mapped.
/// Lookups outside the table, and entries without a resolved class, report `None`.
/// A table is never modified after it is built; rebuilding produces a new table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeTable {
    codes: Vec<i32>,
}

impl CodeTable {
    /// A table that maps nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table for `mappings`, resolving class names through `dictionary`.
    ///
    /// Without a dictionary the result is empty. Class names the dictionary does not know,
    /// and raw values above [`MAX_RAW_VALUE`], are skipped with a warning.
    #[must_use]
    pub fn build(
        coverage_id: &str,
        mappings: &[ValueMapping],
        dictionary: Option<&dyn Dictionary>,
    ) -> Self {
        let Some(dictionary) = dictionary else {
            warn!("Coverage {coverage_id} has no land cover dictionary, all of its codes are unmapped");
            return Self::empty();
        };

        let mut usable = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            if mapping.value > MAX_RAW_VALUE {
                warn!(
                    "Coverage {coverage_id}: ignoring mapping of raw value {} to '{}', values above {MAX_RAW_VALUE} are not supported",
                    mapping.value, mapping.class_name
                );
            } else {
                usable.push(mapping);
            }
        }

        let Some(highest) = usable.iter().map(|m| m.value).max() else {
            return Self::empty();
        };

        let mut codes = vec![UNMAPPED; highest as usize + 1];
        for mapping in usable {
            match dictionary.resolve(&mapping.class_name) {
                Some(code) if code >= 0 => codes[mapping.value as usize] = code,
                Some(code) => warn!(
                    "Coverage {coverage_id}: class '{}' has negative code {code} and cannot be used",
                    mapping.class_name
                ),
                None => warn!(
                    "Coverage {coverage_id}: class '{}' for raw value {} is not in the dictionary",
                    mapping.class_name, mapping.value
                ),
            }
        }
        debug!(
            "Coverage {coverage_id}: built code table with {} entries",
            codes.len()
        );
        Self { codes }
    }

    /// Dictionary code for `raw`, or `None` when unmapped or out of range.
    #[must_use]
    pub fn lookup(&self, raw: i64) -> Option<i32> {
        let idx = usize::try_from(raw).ok()?;
        self.codes.get(idx).copied().filter(|&code| code != UNMAPPED)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterates over the dictionary codes this table can produce.
    pub fn mapped_codes(&self) -> impl Iterator<Item = i32> + '_ {
        self.codes.iter().copied().filter(|&code| code != UNMAPPED)
    }
}
