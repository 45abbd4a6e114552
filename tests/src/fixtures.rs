use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;

use mortar_core::environment::Environment;
use mortar_core::errors::IntpError;
use mortar_core::interpreter::{BUILD_FILE_NAME, Interpreter, OPTIONS_FILE_NAME, Ports, SourceLoader};
use mortar_dsl::ast::{
    ArgumentNode, ArithmeticNode, ArithmeticOp, ArrayNode, AssignmentNode, BooleanNode, CodeBlock,
    ComparisonNode, ComparisonOp, Expr, ExpressionStmt, ForeachNode, IdNode, IfClauseNode, IfNode,
    KeywordPair, MethodCallNode, NumberNode, Stmt, StringNode, TernaryNode,
};
use mortar_dsl::diagnostics::Location;
use mortar_kernel::deps::{DepOrigin, Dependency, IncludeType};
use mortar_kernel::machines::{Endian, MachineChoice, MachineInfo, Machines};
use mortar_kernel::ports::{
    Backend, CommandOutput, CommandRunner, CompileResult, Compiler, CompilerDetector,
    CompilerHandle, DependencyFinder, DependencyRequest, PortError, ProgramFinder, RunResult,
    SubprojectResolver,
};
use mortar_kernel::targets::{AnyTarget, ExternalProgram};

pub fn loc() -> Location {
    Location::new("meson.build", 1, 1)
}

pub fn at(file: &str, line: usize) -> Location {
    Location::new(file, line, 1)
}

// ---- AST builders -------------------------------------------------------

pub fn s(value: &str) -> Expr {
    Expr::Str(StringNode {
        value: value.to_owned(),
        location: loc(),
    })
}

pub fn num(value: i64) -> Expr {
    Expr::Number(NumberNode {
        value,
        location: loc(),
    })
}

pub fn boolean(value: bool) -> Expr {
    Expr::Boolean(BooleanNode {
        value,
        location: loc(),
    })
}

pub fn id(name: &str) -> Expr {
    Expr::Id(IdNode {
        name: name.to_owned(),
        location: loc(),
    })
}

pub fn arr(items: Vec<Expr>) -> Expr {
    Expr::Array(ArrayNode {
        args: ArgumentNode {
            positional: items,
            keywords: Vec::new(),
            location: loc(),
        },
        location: loc(),
    })
}

/// Dict literal: keys are string literals, as the parser produces them.
pub fn dict(pairs: Vec<(&str, Expr)>) -> Expr {
    Expr::Dict(mortar_dsl::ast::DictNode {
        args: ArgumentNode {
            positional: Vec::new(),
            keywords: pairs
                .into_iter()
                .map(|(key, value)| KeywordPair {
                    name: s(key),
                    value,
                    location: loc(),
                })
                .collect(),
            location: loc(),
        },
        location: loc(),
    })
}

pub fn arguments(positional: Vec<Expr>, keywords: Vec<(&str, Expr)>) -> ArgumentNode {
    ArgumentNode {
        positional,
        keywords: keywords
            .into_iter()
            .map(|(name, value)| KeywordPair {
                name: id(name),
                value,
                location: loc(),
            })
            .collect(),
        location: loc(),
    }
}

pub fn call(name: &str, positional: Vec<Expr>, keywords: Vec<(&str, Expr)>) -> Expr {
    call_at(name, positional, keywords, loc())
}

pub fn call_at(
    name: &str,
    positional: Vec<Expr>,
    keywords: Vec<(&str, Expr)>,
    location: Location,
) -> Expr {
    Expr::FunctionCall(mortar_dsl::ast::FunctionCallNode {
        name: name.to_owned(),
        args: arguments(positional, keywords),
        source_text: None,
        location,
    })
}

pub fn method(object: Expr, name: &str, positional: Vec<Expr>, keywords: Vec<(&str, Expr)>) -> Expr {
    Expr::MethodCall(MethodCallNode {
        object: Box::new(object),
        name: name.to_owned(),
        args: arguments(positional, keywords),
        source_text: None,
        location: loc(),
    })
}

pub fn add(left: Expr, right: Expr) -> Expr {
    Expr::Arithmetic(ArithmeticNode {
        op: ArithmeticOp::Add,
        left: Box::new(left),
        right: Box::new(right),
        location: loc(),
    })
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    Expr::Comparison(ComparisonNode {
        op: ComparisonOp::Eq,
        left: Box::new(left),
        right: Box::new(right),
        source_text: None,
        location: loc(),
    })
}

pub fn ternary(condition: Expr, if_true: Expr, if_false: Expr) -> Expr {
    Expr::Ternary(TernaryNode {
        condition: Box::new(condition),
        if_true: Box::new(if_true),
        if_false: Box::new(if_false),
        location: loc(),
    })
}

pub fn expr_stmt(expression: Expr) -> Stmt {
    Stmt::Expression(ExpressionStmt { expression })
}

pub fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Assignment(AssignmentNode {
        name: name.to_owned(),
        value,
        location: loc(),
    })
}

pub fn if_stmt(condition: Expr, then: Vec<Stmt>) -> Stmt {
    Stmt::If(IfClauseNode {
        clauses: vec![IfNode {
            condition,
            block: block(then),
            location: loc(),
        }],
        else_block: None,
        location: loc(),
    })
}

pub fn foreach(varnames: Vec<&str>, items: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::Foreach(ForeachNode {
        varnames: varnames.into_iter().map(str::to_owned).collect(),
        items,
        block: block(body),
        location: loc(),
    })
}

pub fn block(statements: Vec<Stmt>) -> CodeBlock {
    CodeBlock { statements }
}

/// `project('name', 'c', version: ...)` with the usual defaults.
pub fn project_stmt(name: &str, version: Option<&str>) -> Stmt {
    let mut keywords = Vec::new();
    if let Some(version) = version {
        keywords.push(("version", s(version)));
    }
    expr_stmt(call("project", vec![s(name), s("c")], keywords))
}

// ---- Fake collaborator ports -------------------------------------------

pub struct TestBackend;

impl Backend for TestBackend {
    fn name(&self) -> &str {
        "test"
    }

    fn get_target_filename(&self, target: &AnyTarget) -> String {
        match target {
            AnyTarget::Build(t) => {
                if t.subdir.is_empty() {
                    t.filename()
                } else {
                    format!("{}/{}", t.subdir, t.filename())
                }
            }
            AnyTarget::Custom(t) => {
                if t.subdir.is_empty() {
                    t.outputs[0].clone()
                } else {
                    format!("{}/{}", t.subdir, t.outputs[0])
                }
            }
            AnyTarget::Run(t) => t.name.clone(),
            AnyTarget::Alias(t) => t.name.clone(),
        }
    }

    fn get_target_filename_abs(&self, target: &AnyTarget, build_root: &str) -> String {
        format!("{build_root}/{}", self.get_target_filename(target))
    }

    fn get_target_dir(&self, target: &AnyTarget) -> String {
        match target {
            AnyTarget::Build(t) => t.subdir.clone(),
            AnyTarget::Custom(t) => t.subdir.clone(),
            AnyTarget::Run(t) => t.subdir.clone(),
            AnyTarget::Alias(t) => t.subdir.clone(),
        }
    }

    fn get_target_private_dir(&self, target: &AnyTarget) -> String {
        format!("{}.p", self.get_target_filename(target))
    }
}

/// Runner that returns canned outputs per argv[0] and records every call.
#[derive(Default)]
pub struct EchoRunner {
    outputs: RefCell<HashMap<String, CommandOutput>>,
    pub calls: RefCell<Vec<Vec<String>>>,
}

impl EchoRunner {
    pub fn with_output(&self, argv0: &str, output: CommandOutput) {
        self.outputs.borrow_mut().insert(argv0.to_owned(), output);
    }

    pub fn stdout(returncode: i32, stdout: &str) -> CommandOutput {
        CommandOutput {
            returncode,
            stdout: stdout.to_owned(),
            stderr: String::new(),
        }
    }
}

impl CommandRunner for EchoRunner {
    type Error = PortError;

    fn run(
        &self,
        command: &[String],
        _workdir: &PathBuf,
        _env: &IndexMap<String, String>,
    ) -> Result<CommandOutput, Self::Error> {
        self.calls.borrow_mut().push(command.to_vec());
        Ok(self
            .outputs
            .borrow()
            .get(&command[0])
            .cloned()
            .unwrap_or_default())
    }
}

/// External dependency provider backed by a map, counting searches.
#[derive(Default)]
pub struct FakeDeps {
    available: RefCell<HashMap<String, Dependency>>,
    pub searches: RefCell<Vec<String>>,
}

impl FakeDeps {
    pub fn provide(&self, name: &str, version: &str) {
        let dep = Dependency {
            name: name.to_owned(),
            version: Some(version.to_owned()),
            machine: MachineChoice::Host,
            compile_args: vec![format!("-I/usr/include/{name}")],
            link_args: vec![format!("-l{name}")],
            include_type: IncludeType::Preserve,
            variables: IndexMap::new(),
            origin: DepOrigin::External,
        };
        self.available.borrow_mut().insert(name.to_owned(), dep);
    }

    pub fn search_count(&self, name: &str) -> usize {
        self.searches
            .borrow()
            .iter()
            .filter(|searched| searched.as_str() == name)
            .count()
    }
}

impl DependencyFinder for FakeDeps {
    type Error = PortError;

    fn find_external_dependency(
        &self,
        name: &str,
        _request: &DependencyRequest,
    ) -> Result<Option<Dependency>, Self::Error> {
        self.searches.borrow_mut().push(name.to_owned());
        Ok(self.available.borrow().get(name).cloned())
    }
}

#[derive(Default)]
pub struct FakePrograms {
    available: RefCell<HashMap<String, ExternalProgram>>,
}

impl FakePrograms {
    pub fn provide(&self, name: &str, path: &str, version: Option<&str>) {
        self.available.borrow_mut().insert(
            name.to_owned(),
            ExternalProgram {
                name: name.to_owned(),
                command: vec![path.to_owned()],
                version: version.map(str::to_owned),
            },
        );
    }
}

impl ProgramFinder for FakePrograms {
    fn find_program(
        &self,
        name: &str,
        _search_dirs: &[PathBuf],
        _machine: MachineChoice,
    ) -> Option<ExternalProgram> {
        self.available.borrow().get(name).cloned()
    }
}

/// Wrap-style resolver: maps subproject names to source directories and
/// dependency names to providing subprojects.
#[derive(Default)]
pub struct FakeResolver {
    dirs: RefCell<HashMap<String, PathBuf>>,
    providers: RefCell<HashMap<String, String>>,
    pub resolutions: RefCell<Vec<String>>,
}

impl FakeResolver {
    pub fn register(&self, name: &str, dir: PathBuf) {
        self.dirs.borrow_mut().insert(name.to_owned(), dir);
    }

    pub fn provides(&self, dep_name: &str, subproject: &str) {
        self.providers
            .borrow_mut()
            .insert(dep_name.to_owned(), subproject.to_owned());
    }

    pub fn resolution_count(&self, name: &str) -> usize {
        self.resolutions
            .borrow()
            .iter()
            .filter(|resolved| resolved.as_str() == name)
            .count()
    }
}

impl SubprojectResolver for FakeResolver {
    type Error = PortError;

    fn resolve(&self, name: &str, _method: Option<&str>) -> Result<PathBuf, Self::Error> {
        self.resolutions.borrow_mut().push(name.to_owned());
        self.dirs
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| PortError::new(format!("no wrap file for subproject \"{name}\"")))
    }

    fn provider_for(&self, dep_name: &str) -> Option<String> {
        self.providers.borrow().get(dep_name).cloned()
    }
}

pub struct FakeCompiler {
    language: String,
    machine: MachineChoice,
    command: Vec<String>,
}

impl Compiler for FakeCompiler {
    type Error = PortError;

    fn id(&self) -> &str {
        "fake"
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn version(&self) -> &str {
        "10.0.0"
    }

    fn command(&self) -> &[String] {
        &self.command
    }

    fn machine(&self) -> MachineChoice {
        self.machine
    }

    fn compiles(&self, _code: &str, _args: &[String]) -> Result<CompileResult, Self::Error> {
        Ok(CompileResult {
            success: true,
            cached: false,
        })
    }

    fn links(&self, _code: &str, _args: &[String]) -> Result<CompileResult, Self::Error> {
        Ok(CompileResult {
            success: true,
            cached: false,
        })
    }

    fn run(&self, _code: &str, _args: &[String]) -> Result<RunResult, Self::Error> {
        Ok(RunResult {
            compiled: true,
            returncode: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn has_header(&self, name: &str, _args: &[String]) -> Result<bool, Self::Error> {
        Ok(name == "stdio.h")
    }

    fn has_function(&self, name: &str, _args: &[String]) -> Result<bool, Self::Error> {
        Ok(name != "definitely_not_a_function")
    }

    fn has_type(&self, _name: &str, _args: &[String]) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn has_member(&self, _target: &str, _member: &str, _args: &[String]) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn has_argument(&self, arg: &str) -> Result<bool, Self::Error> {
        Ok(!arg.starts_with("-Wbogus"))
    }

    fn sizeof(&self, _type_name: &str, _args: &[String]) -> Result<i64, Self::Error> {
        Ok(4)
    }

    fn alignment(&self, _type_name: &str, _args: &[String]) -> Result<i64, Self::Error> {
        Ok(4)
    }

    fn compute_int(&self, _expr: &str, _args: &[String]) -> Result<i64, Self::Error> {
        Ok(0)
    }

    fn get_define(&self, _name: &str, _args: &[String]) -> Result<Option<String>, Self::Error> {
        Ok(None)
    }

    fn find_library(
        &self,
        name: &str,
        _static_link: bool,
    ) -> Result<Option<Vec<String>>, Self::Error> {
        if name == "m" {
            Ok(Some(vec!["-lm".to_owned()]))
        } else {
            Ok(None)
        }
    }
}

pub struct FakeToolchain;

impl CompilerDetector for FakeToolchain {
    type Error = PortError;

    fn detect(
        &self,
        language: &str,
        machine: MachineChoice,
    ) -> Result<Option<CompilerHandle>, Self::Error> {
        if language == "fortran" {
            return Ok(None);
        }
        Ok(Some(Rc::new(FakeCompiler {
            language: language.to_owned(),
            machine,
            command: vec![format!("fake-{language}")],
        })))
    }
}

/// Loader handing out pre-built ASTs keyed by absolute path; the parser is
/// an external collaborator, so tests register parse results directly.
#[derive(Default)]
pub struct MapLoader {
    build_files: RefCell<HashMap<PathBuf, CodeBlock>>,
    options_files: RefCell<HashMap<PathBuf, CodeBlock>>,
}

impl SourceLoader for MapLoader {
    fn load_build_file(&self, path: &Path) -> Result<CodeBlock, PortError> {
        self.build_files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| PortError::new(format!("no build file at {}", path.display())))
    }

    fn load_options_file(&self, path: &Path) -> Result<Option<CodeBlock>, PortError> {
        Ok(self.options_files.borrow().get(path).cloned())
    }
}

// ---- The harness --------------------------------------------------------

pub struct TestProject {
    _dir: tempfile::TempDir,
    pub source_root: PathBuf,
    pub build_root: PathBuf,
    pub loader: Rc<MapLoader>,
    pub runner: Rc<EchoRunner>,
    pub deps: Rc<FakeDeps>,
    pub programs: Rc<FakePrograms>,
    pub resolver: Rc<FakeResolver>,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let source_root = dir.path().join("src");
        let build_root = dir.path().join("build");
        fs::create_dir_all(&source_root).expect("create source root");
        fs::create_dir_all(&build_root).expect("create build root");

        Self {
            _dir: dir,
            source_root,
            build_root,
            loader: Rc::new(MapLoader::default()),
            runner: Rc::new(EchoRunner::default()),
            deps: Rc::new(FakeDeps::default()),
            programs: Rc::new(FakePrograms::default()),
            resolver: Rc::new(FakeResolver::default()),
        }
    }

    /// Registers the build file of `rel_dir` ("" is the project root).
    pub fn set_build_file(&self, rel_dir: &str, ast: CodeBlock) {
        let path = self.source_root.join(rel_dir).join(BUILD_FILE_NAME);
        self.loader.build_files.borrow_mut().insert(path, ast);
    }

    pub fn set_options_file(&self, rel_dir: &str, ast: CodeBlock) {
        let path = self.source_root.join(rel_dir).join(OPTIONS_FILE_NAME);
        self.loader.options_files.borrow_mut().insert(path, ast);
    }

    /// Creates a real file in the source tree, for `files()` and friends.
    pub fn write_source(&self, rel: &str, contents: &str) {
        let path = self.source_root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write source file");
    }

    pub fn interpreter(&self) -> Interpreter {
        let machines = Machines::native(MachineInfo::new(
            "linux",
            "x86_64",
            "x86_64",
            Endian::Little,
        ));
        let env = Rc::new(Environment::new(
            self.source_root.clone(),
            self.build_root.clone(),
            machines,
        ));
        let ports = Ports {
            backend: Rc::new(TestBackend),
            runner: self.runner.clone(),
            dep_finder: self.deps.clone(),
            prog_finder: self.programs.clone(),
            resolver: self.resolver.clone(),
            compiler_detector: Rc::new(FakeToolchain),
            loader: self.loader.clone(),
        };
        Interpreter::top_level(env, ports)
    }

    /// Runs the whole project and hands back the evaluator for inspection.
    pub fn run(&self) -> Result<Interpreter, IntpError> {
        let mut interp = self.interpreter();
        interp.run().map(|_| interp)
    }
}
