use indexmap::IndexMap;

use crate::machines::MachineChoice;
use crate::version::UNDEFINED_VERSION;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum IncludeType {
    #[default]
    Preserve,
    System,
    NonSystem,
}

impl IncludeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncludeType::Preserve => "preserve",
            IncludeType::System => "system",
            IncludeType::NonSystem => "non-system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "preserve" => Some(IncludeType::Preserve),
            "system" => Some(IncludeType::System),
            "non-system" => Some(IncludeType::NonSystem),
            _ => None,
        }
    }
}

/// Where a dependency record came from. Internal dependencies are the
/// product of `declare_dependency` inside this tree; external ones were
/// handed over by a provider port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DepOrigin {
    External,
    Internal { subproject: String },
    NotFound,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub version: Option<String>,
    pub machine: MachineChoice,
    pub compile_args: Vec<String>,
    pub link_args: Vec<String>,
    pub include_type: IncludeType,
    pub variables: IndexMap<String, String>,
    pub origin: DepOrigin,
}

impl Dependency {
    pub fn not_found(name: impl Into<String>, machine: MachineChoice) -> Self {
        Self {
            name: name.into(),
            version: None,
            machine,
            compile_args: Vec::new(),
            link_args: Vec::new(),
            include_type: IncludeType::Preserve,
            variables: IndexMap::new(),
            origin: DepOrigin::NotFound,
        }
    }

    pub fn found(&self) -> bool {
        self.origin != DepOrigin::NotFound
    }

    pub fn version_or_undefined(&self) -> &str {
        self.version.as_deref().unwrap_or(UNDEFINED_VERSION)
    }

    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

/// Cache identity of a dependency lookup: the name, the machine, and the
/// kwargs that change what gets found. Version constraints, `required` and
/// fallback bookkeeping deliberately stay out so compatible lookups share
/// one cache slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DependencyId {
    pub name: String,
    pub machine: MachineChoice,
    pub static_link: Option<bool>,
    pub method: Option<String>,
    pub include_type: Option<String>,
    pub modules: Vec<String>,
}

impl DependencyId {
    pub fn new(name: impl Into<String>, machine: MachineChoice) -> Self {
        Self {
            name: name.into(),
            machine,
            static_link: None,
            method: None,
            include_type: None,
            modules: Vec::new(),
        }
    }

    pub fn with_static(mut self, static_link: Option<bool>) -> Self {
        self.static_link = static_link;
        self
    }

    pub fn with_method(mut self, method: Option<String>) -> Self {
        self.method = method;
        self
    }

    pub fn with_modules(mut self, mut modules: Vec<String>) -> Self {
        modules.sort();
        self.modules = modules;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_dependency_reports_undefined_version() {
        let dep = Dependency::not_found("zlib", MachineChoice::Host);
        assert!(!dep.found());
        assert_eq!(dep.version_or_undefined(), UNDEFINED_VERSION);
    }

    #[test]
    fn identifier_ignores_module_order() {
        let a = DependencyId::new("boost", MachineChoice::Host)
            .with_modules(vec!["system".to_owned(), "filesystem".to_owned()]);
        let b = DependencyId::new("boost", MachineChoice::Host)
            .with_modules(vec!["filesystem".to_owned(), "system".to_owned()]);
        assert_eq!(a, b);
    }

    #[test]
    fn identifier_distinguishes_machines() {
        let host = DependencyId::new("zlib", MachineChoice::Host);
        let build = DependencyId::new("zlib", MachineChoice::Build);
        assert_ne!(host, build);
    }
}
