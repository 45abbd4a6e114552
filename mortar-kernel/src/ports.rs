use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::deps::Dependency;
use crate::machines::MachineChoice;
use crate::targets::{AnyTarget, ExternalProgram};

/// Error type of the in-tree adapters and of the type-erased handles the
/// interpreter stores. Each port trait declares its own associated error;
/// adapters that have nothing more specific to say use this one.
#[derive(Debug, Clone)]
pub struct PortError {
    message: String,
}

impl PortError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PortError {}

/// The downstream consumer of the build graph. Only the accessors the
/// interpreter itself needs are modeled; graph translation happens outside.
pub trait Backend {
    fn name(&self) -> &str;
    fn get_target_filename(&self, target: &AnyTarget) -> String;
    fn get_target_filename_abs(&self, target: &AnyTarget, build_root: &str) -> String;
    fn get_target_dir(&self, target: &AnyTarget) -> String;
    fn get_target_private_dir(&self, target: &AnyTarget) -> String;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Synchronous subprocess execution, injected so evaluation stays hermetic
/// under test. Used by `run_command`, configure-file command mode and
/// vcs-tag substitution.
pub trait CommandRunner {
    type Error: std::error::Error + Send + Sync + 'static;

    fn run(
        &self,
        command: &[String],
        workdir: &PathBuf,
        env: &IndexMap<String, String>,
    ) -> Result<CommandOutput, Self::Error>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileResult {
    pub success: bool,
    pub cached: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunResult {
    pub compiled: bool,
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Per-language compiler capability surface. Concrete drivers (gcc, clang,
/// msvc, ...) live outside the core; probes are expected to be cached by the
/// implementation under `(compiler id, args, code hash)`.
pub trait Compiler {
    type Error: std::error::Error + Send + Sync + 'static;

    fn id(&self) -> &str;
    fn language(&self) -> &str;
    fn version(&self) -> &str;
    fn command(&self) -> &[String];
    fn machine(&self) -> MachineChoice;

    fn compiles(&self, code: &str, args: &[String]) -> Result<CompileResult, Self::Error>;
    fn links(&self, code: &str, args: &[String]) -> Result<CompileResult, Self::Error>;
    fn run(&self, code: &str, args: &[String]) -> Result<RunResult, Self::Error>;
    fn has_header(&self, name: &str, args: &[String]) -> Result<bool, Self::Error>;
    fn has_function(&self, name: &str, args: &[String]) -> Result<bool, Self::Error>;
    fn has_type(&self, name: &str, args: &[String]) -> Result<bool, Self::Error>;
    fn has_member(&self, target: &str, member: &str, args: &[String])
    -> Result<bool, Self::Error>;
    fn has_argument(&self, arg: &str) -> Result<bool, Self::Error>;
    fn sizeof(&self, type_name: &str, args: &[String]) -> Result<i64, Self::Error>;
    fn alignment(&self, type_name: &str, args: &[String]) -> Result<i64, Self::Error>;
    fn compute_int(&self, expr: &str, args: &[String]) -> Result<i64, Self::Error>;
    fn get_define(&self, name: &str, args: &[String]) -> Result<Option<String>, Self::Error>;
    fn find_library(
        &self,
        name: &str,
        static_link: bool,
    ) -> Result<Option<Vec<String>>, Self::Error>;
}

/// Compiler as the interpreter holds it: reference-shared and type-erased,
/// the adapter's error unified into [`PortError`].
pub type CompilerHandle = Rc<dyn Compiler<Error = PortError>>;

/// Detects and constructs a compiler for a language/machine pair, or reports
/// that the toolchain is unavailable.
pub trait CompilerDetector {
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(
        &self,
        language: &str,
        machine: MachineChoice,
    ) -> Result<Option<CompilerHandle>, Self::Error>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyRequest {
    pub constraints: Vec<String>,
    pub static_link: Option<bool>,
    pub method: Option<String>,
    pub modules: Vec<String>,
    pub machine: MachineChoice,
}

/// The provider layer (pkg-config, cmake, frameworks, ...) collapsed into a
/// single lookup. `Ok(None)` means "searched, nothing found".
pub trait DependencyFinder {
    type Error: std::error::Error + Send + Sync + 'static;

    fn find_external_dependency(
        &self,
        name: &str,
        request: &DependencyRequest,
    ) -> Result<Option<Dependency>, Self::Error>;
}

pub trait ProgramFinder {
    fn find_program(
        &self,
        name: &str,
        search_dirs: &[PathBuf],
        machine: MachineChoice,
    ) -> Option<ExternalProgram>;
}

/// Materializes a subproject's source directory (wrap download, archive
/// extraction, ...). Failures are trapped by the core when the subproject is
/// not required.
pub trait SubprojectResolver {
    type Error: std::error::Error + Send + Sync + 'static;

    fn resolve(&self, name: &str, method: Option<&str>) -> Result<PathBuf, Self::Error>;

    /// Which in-tree subproject, if any, declares that it provides the named
    /// dependency. Drives implicit dependency fallback.
    fn provider_for(&self, dep_name: &str) -> Option<String> {
        let _ = dep_name;
        None
    }
}
