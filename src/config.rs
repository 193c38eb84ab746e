//! Per-run settings shared by every file of a lint.

use crate::spec::{Version, allowed_versions};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LintConfig {
    /// Base directory for the root file's includes and for sample paths.
    pub rel_path: Option<PathBuf>,
    /// Target revisions; empty accepts everything.
    pub spec_versions: Vec<Version>,
    pub check_files: bool,
    /// Stop starting new files once one of them has an error.
    pub fail_fast: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            rel_path: None,
            spec_versions: Vec::new(),
            check_files: true,
            fail_fast: false,
        }
    }
}

impl LintConfig {
    /// Revisions accepted under the selected targets, or `None` for no filter.
    pub fn allowed_versions(&self) -> Option<BTreeSet<Version>> {
        (!self.spec_versions.is_empty()).then(|| allowed_versions(&self.spec_versions))
    }
}
