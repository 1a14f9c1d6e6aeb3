//! Well-known capability keys
//!
//! Created once per process, so every check and every session agree on the
//! identity of each capability.

use crate::diagnostic::ChangeTracker;
use crate::program::{Program, SourceFile};
use fx_step::Key;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

static PROGRAM: Lazy<Key<Program>> = Lazy::new(|| Key::new("program"));
static SOURCE_FILE: Lazy<Key<SourceFile>> = Lazy::new(|| Key::new("source_file"));
static CHANGE_TRACKER: Lazy<Key<ChangeTracker>> = Lazy::new(|| Key::new("change_tracker"));
static HOST_OPTIONS: Lazy<Key<BTreeMap<String, String>>> = Lazy::new(|| Key::new("host_options"));

/// Every file of the current analysis request
pub fn program() -> &'static Key<Program> {
    &PROGRAM
}

/// The file a check is currently running over
pub fn source_file() -> &'static Key<SourceFile> {
    &SOURCE_FILE
}

pub fn change_tracker() -> &'static Key<ChangeTracker> {
    &CHANGE_TRACKER
}

pub fn host_options() -> &'static Key<BTreeMap<String, String>> {
    &HOST_OPTIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_stable() {
        assert_eq!(program().id(), program().id());
        assert_ne!(program().id(), source_file().id());
        assert_eq!(change_tracker().name(), "change_tracker");
        assert_eq!(host_options().name(), "host_options");
    }
}
