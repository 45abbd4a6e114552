use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    String,
    Boolean,
    Combo,
    Integer,
    Array,
    Feature,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::String => "string",
            OptionKind::Boolean => "boolean",
            OptionKind::Combo => "combo",
            OptionKind::Integer => "integer",
            OptionKind::Array => "array",
            OptionKind::Feature => "feature",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(OptionKind::String),
            "boolean" => Some(OptionKind::Boolean),
            "combo" => Some(OptionKind::Combo),
            "integer" => Some(OptionKind::Integer),
            "array" => Some(OptionKind::Array),
            "feature" => Some(OptionKind::Feature),
            _ => None,
        }
    }
}

/// Tri-state of a feature option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureState {
    Enabled,
    Disabled,
    Auto,
}

impl FeatureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureState::Enabled => "enabled",
            FeatureState::Disabled => "disabled",
            FeatureState::Auto => "auto",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "enabled" => Some(FeatureState::Enabled),
            "disabled" => Some(FeatureState::Disabled),
            "auto" => Some(FeatureState::Auto),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    Str(String),
    Bool(bool),
    Int(i64),
    StrList(Vec<String>),
    Feature(FeatureState),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Str(_) => OptionKind::String,
            OptionValue::Bool(_) => OptionKind::Boolean,
            OptionValue::Int(_) => OptionKind::Integer,
            OptionValue::StrList(_) => OptionKind::Array,
            OptionValue::Feature(_) => OptionKind::Feature,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OptionError(pub String);

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for OptionError {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserOption {
    pub kind: OptionKind,
    pub description: String,
    pub value: OptionValue,
    pub default: OptionValue,
    pub choices: Vec<String>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub yielding: bool,
    pub deprecated: bool,
}

impl UserOption {
    pub fn new(kind: OptionKind, description: impl Into<String>, default: OptionValue) -> Self {
        Self {
            kind,
            description: description.into(),
            value: default.clone(),
            default,
            choices: Vec::new(),
            min: None,
            max: None,
            yielding: false,
            deprecated: false,
        }
    }

    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn yielding(mut self, yielding: bool) -> Self {
        self.yielding = yielding;
        self
    }

    /// Validates and stores a new value. Combo choices and integer ranges
    /// are enforced here so every write path shares the same rules.
    pub fn set_value(&mut self, value: OptionValue) -> Result<(), OptionError> {
        let checked = self.check(value)?;
        self.value = checked;
        Ok(())
    }

    fn check(&self, value: OptionValue) -> Result<OptionValue, OptionError> {
        match (self.kind, &value) {
            (OptionKind::String, OptionValue::Str(_)) => Ok(value),
            (OptionKind::Boolean, OptionValue::Bool(_)) => Ok(value),
            (OptionKind::Feature, OptionValue::Feature(_)) => Ok(value),
            (OptionKind::Combo, OptionValue::Str(s)) => {
                if self.choices.iter().any(|c| c == s) {
                    Ok(value)
                } else {
                    Err(OptionError(format!(
                        "value \"{}\" is not one of the choices [{}]",
                        s,
                        self.choices.join(", ")
                    )))
                }
            }
            (OptionKind::Integer, OptionValue::Int(i)) => {
                if let Some(min) = self.min
                    && *i < min
                {
                    return Err(OptionError(format!("value {i} is less than minimum {min}")));
                }
                if let Some(max) = self.max
                    && *i > max
                {
                    return Err(OptionError(format!(
                        "value {i} is greater than maximum {max}"
                    )));
                }
                Ok(value)
            }
            (OptionKind::Array, OptionValue::StrList(items)) => {
                if !self.choices.is_empty() {
                    for item in items {
                        if !self.choices.iter().any(|c| c == item) {
                            return Err(OptionError(format!(
                                "array entry \"{}\" is not one of the choices [{}]",
                                item,
                                self.choices.join(", ")
                            )));
                        }
                    }
                }
                Ok(value)
            }
            (kind, got) => Err(OptionError(format!(
                "option of type {} cannot be set from a {} value",
                kind.as_str(),
                got.kind().as_str()
            ))),
        }
    }

    /// Coerces a command-line string form into this option's value type.
    pub fn set_from_string(&mut self, raw: &str) -> Result<(), OptionError> {
        let value = match self.kind {
            OptionKind::String | OptionKind::Combo => OptionValue::Str(raw.to_owned()),
            OptionKind::Boolean => match raw {
                "true" => OptionValue::Bool(true),
                "false" => OptionValue::Bool(false),
                other => {
                    return Err(OptionError(format!(
                        "boolean option expects \"true\" or \"false\", got \"{other}\""
                    )));
                }
            },
            OptionKind::Integer => OptionValue::Int(
                raw.parse()
                    .map_err(|_| OptionError(format!("\"{raw}\" is not an integer")))?,
            ),
            OptionKind::Array => OptionValue::StrList(if raw.is_empty() {
                Vec::new()
            } else {
                raw.split(',').map(|s| s.trim().to_owned()).collect()
            }),
            OptionKind::Feature => OptionValue::Feature(FeatureState::parse(raw).ok_or_else(
                || {
                    OptionError(format!(
                        "feature option expects enabled, disabled or auto, got \"{raw}\""
                    ))
                },
            )?),
        };
        self.set_value(value)
    }
}

/// `[subproject:]name` key of an option. The empty subproject denotes the
/// top-level project.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionKey {
    pub subproject: String,
    pub name: String,
}

impl OptionKey {
    pub fn top_level(name: impl Into<String>) -> Self {
        Self {
            subproject: String::new(),
            name: name.into(),
        }
    }

    pub fn scoped(subproject: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            subproject: subproject.into(),
            name: name.into(),
        }
    }

    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subproject.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.subproject, self.name)
        }
    }
}

/// Result of a scoped lookup. `Yielded` means the child option deferred to a
/// same-kind parent declaration; `KindMismatch` carries what the caller needs
/// for the mandated warning while still returning the child's own value.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionLookup {
    Local(UserOption),
    Yielded(UserOption),
    KindMismatch {
        local: UserOption,
        parent_kind: OptionKind,
    },
}

impl OptionLookup {
    pub fn option(&self) -> &UserOption {
        match self {
            OptionLookup::Local(opt) => opt,
            OptionLookup::Yielded(opt) => opt,
            OptionLookup::KindMismatch { local, .. } => local,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct OptionStore {
    options: IndexMap<OptionKey, UserOption>,
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with the always-present built-in options. Projects
    /// and option files add their own on top.
    pub fn with_builtin_options() -> Self {
        let mut store = Self::new();
        let builtins = [
            UserOption::new(
                OptionKind::Combo,
                "Build type to use",
                OptionValue::Str("debug".to_owned()),
            )
            .with_choices(
                ["plain", "debug", "debugoptimized", "release", "minsize", "custom"]
                    .map(str::to_owned)
                    .to_vec(),
            ),
            UserOption::new(
                OptionKind::Combo,
                "Default library type",
                OptionValue::Str("shared".to_owned()),
            )
            .with_choices(["shared", "static", "both"].map(str::to_owned).to_vec()),
            UserOption::new(
                OptionKind::String,
                "Installation prefix",
                OptionValue::Str("/usr/local".to_owned()),
            ),
            UserOption::new(
                OptionKind::String,
                "Executable directory",
                OptionValue::Str("bin".to_owned()),
            ),
            UserOption::new(
                OptionKind::String,
                "Library directory",
                OptionValue::Str("lib".to_owned()),
            ),
            UserOption::new(
                OptionKind::String,
                "Header file directory",
                OptionValue::Str("include".to_owned()),
            ),
            UserOption::new(
                OptionKind::String,
                "Data file directory",
                OptionValue::Str("share".to_owned()),
            ),
            UserOption::new(
                OptionKind::String,
                "Manual page directory",
                OptionValue::Str("share/man".to_owned()),
            ),
            UserOption::new(
                OptionKind::Combo,
                "Compiler warning level to use",
                OptionValue::Str("1".to_owned()),
            )
            .with_choices(["0", "1", "2", "3"].map(str::to_owned).to_vec()),
            UserOption::new(
                OptionKind::Boolean,
                "Treat warnings as errors",
                OptionValue::Bool(false),
            ),
            UserOption::new(
                OptionKind::Boolean,
                "Strip targets on install",
                OptionValue::Bool(false),
            ),
            UserOption::new(
                OptionKind::Combo,
                "Unity build",
                OptionValue::Str("off".to_owned()),
            )
            .with_choices(["on", "off", "subprojects"].map(str::to_owned).to_vec()),
        ];
        let names = [
            "buildtype",
            "default_library",
            "prefix",
            "bindir",
            "libdir",
            "includedir",
            "datadir",
            "mandir",
            "warning_level",
            "werror",
            "strip",
            "unity",
        ];
        for (name, option) in names.into_iter().zip(builtins) {
            store.options.insert(OptionKey::top_level(name), option);
        }
        store
    }

    pub fn is_builtin(name: &str) -> bool {
        matches!(
            name,
            "buildtype"
                | "default_library"
                | "prefix"
                | "bindir"
                | "libdir"
                | "includedir"
                | "datadir"
                | "mandir"
                | "warning_level"
                | "werror"
                | "strip"
                | "unity"
        )
    }

    pub fn declare(&mut self, key: OptionKey, option: UserOption) -> Result<(), OptionError> {
        if self.options.contains_key(&key) {
            return Err(OptionError(format!("option {key} already exists")));
        }
        self.options.insert(key, option);
        Ok(())
    }

    /// Re-declaring is allowed when reprocessing an options file; the stored
    /// value survives, only the metadata is refreshed.
    pub fn declare_or_update(&mut self, key: OptionKey, mut option: UserOption) {
        if let Some(existing) = self.options.get(&key)
            && existing.kind == option.kind
        {
            option.value = existing.value.clone();
        }
        self.options.insert(key, option);
    }

    pub fn set_from_string(&mut self, key: &OptionKey, raw: &str) -> Result<(), OptionError> {
        let option = self
            .options
            .get_mut(key)
            .ok_or_else(|| OptionError(format!("unknown option {key}")))?;
        option.set_from_string(raw)
    }

    pub fn get(&self, key: &OptionKey) -> Option<&UserOption> {
        self.options.get(key)
    }

    /// Scoped lookup implementing the yielding rule: a subproject option
    /// declared `yield: true` takes the parent's value when the parent
    /// declares the same name with the same kind. A kind mismatch keeps the
    /// child's value and reports the clash.
    pub fn lookup(&self, subproject: &str, name: &str) -> Option<OptionLookup> {
        // Builtins resolve per-subproject first, then globally.
        if !subproject.is_empty() {
            if let Some(local) = self.options.get(&OptionKey::scoped(subproject, name)) {
                if local.yielding {
                    if let Some(parent) = self.options.get(&OptionKey::top_level(name)) {
                        if parent.kind == local.kind {
                            return Some(OptionLookup::Yielded(parent.clone()));
                        }
                        return Some(OptionLookup::KindMismatch {
                            local: local.clone(),
                            parent_kind: parent.kind,
                        });
                    }
                }
                return Some(OptionLookup::Local(local.clone()));
            }
        }
        self.options
            .get(&OptionKey::top_level(name))
            .map(|opt| OptionLookup::Local(opt.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OptionKey, &UserOption)> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
