use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::machines::MachineChoice;

/// Reference to a file either in the source tree or generated into the
/// build tree. Stored relative to the respective root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileRef {
    pub is_built: bool,
    pub subdir: String,
    pub fname: String,
}

impl FileRef {
    pub fn in_source(subdir: impl Into<String>, fname: impl Into<String>) -> Self {
        Self {
            is_built: false,
            subdir: subdir.into(),
            fname: fname.into(),
        }
    }

    pub fn in_build(subdir: impl Into<String>, fname: impl Into<String>) -> Self {
        Self {
            is_built: true,
            subdir: subdir.into(),
            fname: fname.into(),
        }
    }

    pub fn relative_path(&self) -> PathBuf {
        if self.subdir.is_empty() {
            PathBuf::from(&self.fname)
        } else {
            Path::new(&self.subdir).join(&self.fname)
        }
    }

    pub fn absolute_path(&self, source_root: &Path, build_root: &Path) -> PathBuf {
        let root = if self.is_built { build_root } else { source_root };
        root.join(self.relative_path())
    }
}

/// A source item of a build target, matched exhaustively where consumed.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    File(FileRef),
    TargetOutput { target_id: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Executable,
    StaticLibrary,
    SharedLibrary,
    SharedModule,
    Jar,
}

impl TargetKind {
    pub fn id_suffix(&self) -> &'static str {
        match self {
            TargetKind::Executable => "exe",
            TargetKind::StaticLibrary => "sta",
            TargetKind::SharedLibrary => "sha",
            TargetKind::SharedModule => "mod",
            TargetKind::Jar => "jar",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TargetKind::Executable => "executable",
            TargetKind::StaticLibrary => "static library",
            TargetKind::SharedLibrary => "shared library",
            TargetKind::SharedModule => "shared module",
            TargetKind::Jar => "jar",
        }
    }
}

fn target_id(subdir: &str, name: &str, suffix: &str) -> String {
    if subdir.is_empty() {
        format!("{name}@{suffix}")
    } else {
        format!("{}/{name}@{suffix}", subdir.replace('/', "@"))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuildTarget {
    pub name: String,
    pub subdir: String,
    pub subproject: String,
    pub kind: TargetKind,
    pub machine: MachineChoice,
    pub sources: Vec<Source>,
    pub structured_dep_names: Vec<String>,
    pub link_with: Vec<String>,
    pub include_dirs: Vec<IncludeDirs>,
    pub extra_args: IndexMap<String, Vec<String>>,
    pub link_args: Vec<String>,
    pub install: bool,
    pub install_dir: Option<String>,
    pub build_by_default: bool,
    pub gui_app: bool,
    pub pic: bool,
    pub version: Option<String>,
    pub soversion: Option<String>,
}

impl BuildTarget {
    pub fn new(
        name: impl Into<String>,
        subdir: impl Into<String>,
        subproject: impl Into<String>,
        kind: TargetKind,
        machine: MachineChoice,
    ) -> Self {
        Self {
            name: name.into(),
            subdir: subdir.into(),
            subproject: subproject.into(),
            kind,
            machine,
            sources: Vec::new(),
            structured_dep_names: Vec::new(),
            link_with: Vec::new(),
            include_dirs: Vec::new(),
            extra_args: IndexMap::new(),
            link_args: Vec::new(),
            install: false,
            install_dir: None,
            build_by_default: true,
            gui_app: false,
            pic: false,
            version: None,
            soversion: None,
        }
    }

    pub fn id(&self) -> String {
        target_id(&self.subdir, &self.name, self.kind.id_suffix())
    }

    pub fn filename(&self) -> String {
        match self.kind {
            TargetKind::Executable => self.name.clone(),
            TargetKind::StaticLibrary => format!("lib{}.a", self.name),
            TargetKind::SharedLibrary | TargetKind::SharedModule => {
                format!("lib{}.so", self.name)
            }
            TargetKind::Jar => format!("{}.jar", self.name),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CustomTarget {
    pub name: String,
    pub subdir: String,
    pub subproject: String,
    pub command: Vec<String>,
    pub inputs: Vec<Source>,
    pub outputs: Vec<String>,
    pub capture: bool,
    pub depfile: Option<String>,
    pub install: bool,
    pub install_dir: Option<String>,
    pub build_by_default: bool,
    pub build_always_stale: bool,
    pub depends: Vec<String>,
}

impl CustomTarget {
    pub fn id(&self) -> String {
        target_id(&self.subdir, &self.name, "cus")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunTarget {
    pub name: String,
    pub subdir: String,
    pub subproject: String,
    pub command: Vec<String>,
    pub depends: Vec<String>,
    pub env: EnvironmentVariables,
}

impl RunTarget {
    pub fn id(&self) -> String {
        target_id(&self.subdir, &self.name, "run")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AliasTarget {
    pub name: String,
    pub subdir: String,
    pub subproject: String,
    pub depends: Vec<String>,
}

impl AliasTarget {
    pub fn id(&self) -> String {
        target_id(&self.subdir, &self.name, "al")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnyTarget {
    Build(BuildTarget),
    Custom(CustomTarget),
    Run(RunTarget),
    Alias(AliasTarget),
}

impl AnyTarget {
    pub fn id(&self) -> String {
        match self {
            AnyTarget::Build(t) => t.id(),
            AnyTarget::Custom(t) => t.id(),
            AnyTarget::Run(t) => t.id(),
            AnyTarget::Alias(t) => t.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AnyTarget::Build(t) => &t.name,
            AnyTarget::Custom(t) => &t.name,
            AnyTarget::Run(t) => &t.name,
            AnyTarget::Alias(t) => &t.name,
        }
    }

    pub fn subproject(&self) -> &str {
        match self {
            AnyTarget::Build(t) => &t.subproject,
            AnyTarget::Custom(t) => &t.subproject,
            AnyTarget::Run(t) => &t.subproject,
            AnyTarget::Alias(t) => &t.subproject,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Generator {
    pub command: Vec<String>,
    pub arguments: Vec<String>,
    pub outputs: Vec<String>,
    pub depfile: Option<String>,
    pub capture: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncludeDirs {
    pub subdir: String,
    pub dirs: Vec<String>,
    pub is_system: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvOp {
    Set,
    Append,
    Prepend,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvEntry {
    pub op: EnvOp,
    pub name: String,
    pub values: Vec<String>,
    pub separator: String,
}

/// Ordered list of environment mutations, replayed over a base map at the
/// point of use.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct EnvironmentVariables {
    pub entries: Vec<EnvEntry>,
}

impl EnvironmentVariables {
    pub fn push(&mut self, op: EnvOp, name: impl Into<String>, values: Vec<String>, separator: String) {
        self.entries.push(EnvEntry {
            op,
            name: name.into(),
            values,
            separator,
        });
    }

    pub fn resolve(&self, base: &IndexMap<String, String>) -> IndexMap<String, String> {
        let mut out = base.clone();
        for entry in &self.entries {
            let joined = entry.values.join(&entry.separator);
            match entry.op {
                EnvOp::Set => {
                    out.insert(entry.name.clone(), joined);
                }
                EnvOp::Append => {
                    let value = match out.get(&entry.name) {
                        Some(old) => format!("{old}{}{joined}", entry.separator),
                        None => joined,
                    };
                    out.insert(entry.name.clone(), value);
                }
                EnvOp::Prepend => {
                    let value = match out.get(&entry.name) {
                        Some(old) => format!("{joined}{}{old}", entry.separator),
                        None => joined,
                    };
                    out.insert(entry.name.clone(), value);
                }
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConfValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConfEntry {
    pub value: ConfValue,
    pub comment: Option<String>,
}

/// Backing store of a `configuration_data()` object.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ConfigurationValues {
    pub values: IndexMap<String, ConfEntry>,
}

impl ConfigurationValues {
    pub fn set(&mut self, name: impl Into<String>, value: ConfValue, comment: Option<String>) {
        self.values.insert(name.into(), ConfEntry { value, comment });
    }

    pub fn get(&self, name: &str) -> Option<&ConfEntry> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalProgram {
    pub name: String,
    pub command: Vec<String>,
    pub version: Option<String>,
}

impl ExternalProgram {
    pub fn found(&self) -> bool {
        !self.command.is_empty()
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: Vec::new(),
            version: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TestExecutable {
    Target { target_id: String },
    Program { command: Vec<String> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub subproject: String,
    pub exe: TestExecutable,
    pub args: Vec<String>,
    pub env: EnvironmentVariables,
    pub should_fail: bool,
    pub timeout: i64,
    pub workdir: Option<String>,
    pub is_parallel: bool,
    pub priority: i64,
    pub suites: Vec<String>,
    pub depends: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TestSetup {
    pub name: String,
    pub exe_wrapper: Vec<String>,
    pub gdb: bool,
    pub timeout_multiplier: i64,
    pub env: EnvironmentVariables,
    pub exclude_suites: Vec<String>,
}

/// A deferred command recorded by the install/postconf/dist script
/// collectors; arguments are already normalized to plain strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunScript {
    pub cmd: Vec<String>,
    pub subproject: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstallData {
    pub sources: Vec<FileRef>,
    pub install_dir: String,
    pub install_mode: Option<String>,
    pub rename: Vec<String>,
    pub subproject: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstallHeaders {
    pub sources: Vec<FileRef>,
    pub install_subdir: Option<String>,
    pub custom_install_dir: Option<String>,
    pub subproject: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstallMan {
    pub sources: Vec<FileRef>,
    pub custom_install_dir: Option<String>,
    pub locale: Option<String>,
    pub subproject: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstallDir {
    pub source_subdir: String,
    pub installable_subdir: Option<String>,
    pub install_dir: String,
    pub exclude_files: Vec<String>,
    pub exclude_directories: Vec<String>,
    pub strip_directory: bool,
    pub subproject: String,
}
