use std::collections::HashSet;

use indexmap::IndexMap;

use mortar_dsl::diagnostics::Location;
use mortar_kernel::version::version_compare;

use crate::logger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureKind {
    /// Warn when the declared minimum DSL version is older than the version
    /// that introduced the feature.
    New,
    /// Warn when the declared minimum DSL version already covers the version
    /// that deprecated the feature.
    Deprecated,
    /// Always warn; the feature is known broken.
    Broken,
}

/// Per-run registry of feature-version checks. Each (subproject, feature)
/// pair warns at most once; everything seen is replayed in the aggregate
/// report at subproject exit.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    /// subproject -> declared minimum DSL version (from `meson_version`).
    minimums: IndexMap<String, String>,
    reported: HashSet<(String, String)>,
    /// subproject -> feature notices for the final report.
    notices: IndexMap<String, Vec<String>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_minimum(&mut self, subproject: &str, version: &str) {
        self.minimums
            .insert(subproject.to_owned(), version.to_owned());
    }

    pub fn minimum(&self, subproject: &str) -> Option<&str> {
        self.minimums.get(subproject).map(String::as_str)
    }

    /// Runs one feature check. Returns true when a warning was emitted.
    pub fn check(
        &mut self,
        kind: FeatureKind,
        subproject: &str,
        feature: &str,
        required_version: &str,
        location: Option<&Location>,
    ) -> bool {
        let minimum = self.minimums.get(subproject).cloned();

        let (warn, text) = match kind {
            FeatureKind::New => {
                let target_is_older = match &minimum {
                    // No declared minimum: nothing to hold the project to.
                    None => false,
                    Some(min) => !version_satisfies_minimum(min, required_version),
                };
                (
                    target_is_older,
                    format!(
                        "project targets {} but uses feature introduced in {}: {}",
                        minimum.as_deref().unwrap_or("(no minimum)"),
                        required_version,
                        feature
                    ),
                )
            }
            FeatureKind::Deprecated => {
                let target_covers = match &minimum {
                    None => false,
                    Some(min) => version_satisfies_minimum(min, required_version),
                };
                (
                    target_covers,
                    format!(
                        "project targets {} but uses feature deprecated since {}: {}",
                        minimum.as_deref().unwrap_or("(no minimum)"),
                        required_version,
                        feature
                    ),
                )
            }
            FeatureKind::Broken => (
                true,
                format!("feature {feature} is known broken since {required_version}"),
            ),
        };

        if !warn {
            return false;
        }
        if !self
            .reported
            .insert((subproject.to_owned(), feature.to_owned()))
        {
            return false;
        }

        self.notices
            .entry(subproject.to_owned())
            .or_default()
            .push(text.clone());
        logger::warning(subproject, location, &text)
    }

    /// Emits the aggregate report for a subproject and clears its slate so a
    /// later sibling with the same name would start fresh.
    pub fn report(&mut self, subproject: &str) {
        if let Some(notices) = self.notices.shift_remove(subproject) {
            let label = if subproject.is_empty() {
                "project".to_owned()
            } else {
                format!("subproject {subproject}")
            };
            logger::message(&format!(
                "{label}: {} feature compatibility notice(s)",
                notices.len()
            ));
        }
    }
}

/// True when a project whose declared minimum is `minimum` can rely on a
/// feature introduced in `introduced`. The minimum may be a bare version or
/// a `>=`-style constraint; only its version component matters here.
fn version_satisfies_minimum(minimum: &str, introduced: &str) -> bool {
    let bare = minimum.trim_start_matches(['>', '<', '=', ' ']);
    version_compare(bare, &format!(">={introduced}"))
}
