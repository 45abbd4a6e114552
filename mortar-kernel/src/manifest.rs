use serde::{Deserialize, Serialize};

/// Per-project entry persisted into the build directory so packagers can
/// audit which (sub)projects a build pulled in and under what license.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepManifestEntry {
    pub version: String,
    pub license: Vec<String>,
}

impl DepManifestEntry {
    pub fn new(version: impl Into<String>, license: Vec<String>) -> Self {
        Self {
            version: version.into(),
            license,
        }
    }
}
