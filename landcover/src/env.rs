//! Environment variable access for configuration substitution.
//!
//! [`OsEnv`] reads the process environment, [`FauxEnv`] serves a fixed map in tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::env;
use std::ffi::OsString;

use subst::VariableMap;
use tracing::warn;

/// Environment lookup used while reading the configuration file.
pub trait Env<'a>: VariableMap<'a> {
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Reads a variable as UTF-8, warning and returning `None` when it is not valid unicode.
    #[must_use]
    fn get_env_str(&self, key: &str) -> Option<String> {
        match self.var_os(key)?.into_string() {
            Ok(v) => Some(v),
            Err(v) => {
                let v = v.to_string_lossy();
                warn!("Environment variable {key} has invalid unicode. Lossy representation: {v}");
                None
            }
        }
    }
}

/// The process environment. Remembers which variables the configuration referenced.
#[derive(Debug, Default)]
pub struct OsEnv(RefCell<HashSet<String>>);

impl OsEnv {
    /// Names of the variables substituted so far, sorted.
    #[must_use]
    pub fn used_vars(&self) -> Vec<String> {
        let mut vars: Vec<_> = self.0.borrow().iter().cloned().collect();
        vars.sort();
        vars
    }
}

impl Env<'_> for OsEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        env::var_os(key)
    }
}

impl<'a> VariableMap<'a> for OsEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.borrow_mut().insert(key.to_string());
        env::var(key).ok()
    }
}

/// Fixed set of variables for tests.
#[derive(Debug, Default)]
pub struct FauxEnv(pub HashMap<&'static str, OsString>);

impl<'a> VariableMap<'a> for FauxEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.get(key).map(|s| s.to_string_lossy().to_string())
    }
}

impl Env<'_> for FauxEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.0.get(key).cloned()
    }
}
