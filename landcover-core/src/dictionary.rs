//! Registry of land-cover class names and their canonical codes.

use std::collections::HashMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Resolves a land-cover class name to the code shared by all coverages.
///
/// Implementors can back this with a config file, a database, or anything else.
pub trait Dictionary: Send + Sync + Debug {
    /// Returns the canonical code for `class_name`, if the class is known.
    fn resolve(&self, class_name: &str) -> Option<i32>;
}

/// One named land-cover class, e.g. `forest = 10`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandCoverClass {
    pub name: String,
    pub value: i32,
}

impl LandCoverClass {
    #[must_use]
    pub fn new(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// An ordered list of [`LandCoverClass`]es with a name index.
///
/// ```
/// use landcover_core::dictionary::{Dictionary, LandCoverClass, LandCoverDictionary};
///
/// let dict = LandCoverDictionary::new(vec![
///     LandCoverClass::new("forest", 10),
///     LandCoverClass::new("water", 20),
/// ]);
/// assert_eq!(dict.resolve("water"), Some(20));
/// assert_eq!(dict.resolve("desert"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LandCoverDictionary {
    classes: Vec<LandCoverClass>,
    by_name: HashMap<String, i32>,
}

impl LandCoverDictionary {
    /// Builds the dictionary. When a name appears more than once, the last entry wins.
    #[must_use]
    pub fn new(classes: Vec<LandCoverClass>) -> Self {
        let mut by_name = HashMap::with_capacity(classes.len());
        for class in &classes {
            if let Some(old) = by_name.insert(class.name.clone(), class.value) {
                warn!(
                    "Land cover class '{}' is defined more than once, using value {} instead of {old}",
                    class.name, class.value
                );
            }
        }
        Self { classes, by_name }
    }

    #[must_use]
    pub fn classes(&self) -> &[LandCoverClass] {
        &self.classes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl FromIterator<LandCoverClass> for LandCoverDictionary {
    fn from_iter<T: IntoIterator<Item = LandCoverClass>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Dictionary for LandCoverDictionary {
    fn resolve(&self, class_name: &str) -> Option<i32> {
        self.by_name.get(class_name).copied()
    }
}
