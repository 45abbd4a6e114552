use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;

use mortar_dsl::ast::{
    ArgumentNode, CodeBlock, Expr, ForeachNode, FunctionCallNode, IfClauseNode, MethodCallNode,
    Stmt,
};
use mortar_dsl::diagnostics::Location;
use mortar_kernel::build::Build;
use mortar_kernel::options::FeatureState;
use mortar_kernel::ports::{
    Backend, CommandRunner, CompilerDetector, DependencyFinder, PortError, ProgramFinder,
    SubprojectResolver,
};

use crate::args::{Args, flatten};
use crate::builtins;
use crate::environment::Environment;
use crate::errors::{IntpError, IntpResult};
use crate::features::FeatureRegistry;
use crate::format::substitute_vars;
use crate::modules::ExtModule;
use crate::objects::downcast;
use crate::objects::feature::FeatureObject;
use crate::objects::machine::MachineObject;
use crate::objects::meson::MesonObject;
use crate::ops;
use crate::value::Value;

/// Version of the build DSL this interpreter implements. Feature gates and
/// `meson.version()` report it.
pub const DSL_VERSION: &str = "1.2.0";

pub const BUILD_FILE_NAME: &str = "meson.build";
pub const OPTIONS_FILE_NAME: &str = "meson_options.txt";

/// Hands the interpreter pre-parsed ASTs; lexing and parsing are external
/// collaborators.
pub trait SourceLoader {
    fn load_build_file(&self, path: &Path) -> Result<CodeBlock, PortError>;

    /// Returns None when the file does not exist, which is not an error for
    /// options files.
    fn load_options_file(&self, path: &Path) -> Result<Option<CodeBlock>, PortError>;
}

/// The collaborator set one evaluation runs against. Each port trait leaves
/// its error type to the adapter; the type-erased handles stored here pin it
/// to [`PortError`].
#[derive(Clone)]
pub struct Ports {
    pub backend: Rc<dyn Backend>,
    pub runner: Rc<dyn CommandRunner<Error = PortError>>,
    pub dep_finder: Rc<dyn DependencyFinder<Error = PortError>>,
    pub prog_finder: Rc<dyn ProgramFinder>,
    pub resolver: Rc<dyn SubprojectResolver<Error = PortError>>,
    pub compiler_detector: Rc<dyn CompilerDetector<Error = PortError>>,
    pub loader: Rc<dyn SourceLoader>,
}

/// Outcome of a subproject instantiation. `found()` is true only for
/// resolved records.
pub enum SubprojectRecord {
    Resolved {
        variables: IndexMap<String, Value>,
        version: String,
        warnings: usize,
    },
    Disabled {
        reason: String,
    },
}

impl SubprojectRecord {
    pub fn found(&self) -> bool {
        matches!(self, SubprojectRecord::Resolved { .. })
    }
}

/// State shared between the top-level evaluator and every subproject child.
#[derive(Default)]
pub struct SharedState {
    pub subprojects: IndexMap<String, SubprojectRecord>,
    /// Output path -> first declaring call site, for duplicate warnings.
    pub configure_outputs: IndexMap<PathBuf, Location>,
    pub backend_initialized: bool,
    /// subproject -> section -> (key, rendered value) summary entries.
    pub summaries: IndexMap<String, IndexMap<String, Vec<(String, String)>>>,
}

/// Statement-level control flow, propagated explicitly instead of by
/// unwinding.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    SubdirDone,
}

const RESERVED_NAMES: &[&str] = &[
    "meson",
    "build_machine",
    "host_machine",
    "target_machine",
];

pub struct Interpreter {
    pub env: Rc<Environment>,
    pub build: Rc<RefCell<Build>>,
    pub ports: Ports,
    pub shared: Rc<RefCell<SharedState>>,
    pub features: Rc<RefCell<FeatureRegistry>>,

    pub variables: IndexMap<String, Value>,
    /// Name of the subproject being evaluated; empty for the top level.
    pub subproject: String,
    pub subproject_stack: Vec<String>,
    /// Directory subprojects live in, relative to the project root.
    pub subproject_dir: String,
    /// Root of this (sub)project, relative to the source root.
    pub root_subdir: String,
    /// Current subdir, relative to the source root.
    pub subdir: String,
    pub current_location: Location,

    pub project_name: String,
    pub project_version: String,
    pub project_license: Vec<String>,
    pub project_declared: bool,
    /// `default_options` handed down by the parent's `subproject()` call,
    /// consumed by this project's `project()`.
    pub pending_default_options: Vec<String>,
    /// Defaults naming options that do not exist yet (e.g. a subproject not
    /// configured so far); retried when that scope appears.
    pub deferred_default_options: Vec<(mortar_kernel::options::OptionKey, String)>,

    /// Guards subdir() re-entry.
    pub processed_buildfiles: HashSet<String>,
    /// Modules instantiated by this evaluator, one per name.
    pub modules: IndexMap<String, Rc<dyn ExtModule>>,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter").finish_non_exhaustive()
    }
}

impl Interpreter {
    pub fn top_level(env: Rc<Environment>, ports: Ports) -> Self {
        let build = Rc::new(RefCell::new(Build::new()));
        Self::with_state(
            env,
            build,
            ports,
            Rc::new(RefCell::new(SharedState::default())),
            Rc::new(RefCell::new(FeatureRegistry::new())),
            String::new(),
            Vec::new(),
            String::new(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn with_state(
        env: Rc<Environment>,
        build: Rc<RefCell<Build>>,
        ports: Ports,
        shared: Rc<RefCell<SharedState>>,
        features: Rc<RefCell<FeatureRegistry>>,
        subproject: String,
        subproject_stack: Vec<String>,
        root_subdir: String,
    ) -> Self {
        let mut interp = Self {
            env,
            build,
            ports,
            shared,
            features,
            variables: IndexMap::new(),
            subproject,
            subproject_stack,
            subproject_dir: "subprojects".to_owned(),
            subdir: root_subdir.clone(),
            root_subdir,
            current_location: Location::builtin(),
            project_name: String::new(),
            project_version: String::new(),
            project_license: Vec::new(),
            project_declared: false,
            pending_default_options: Vec::new(),
            deferred_default_options: Vec::new(),
            processed_buildfiles: HashSet::new(),
            modules: IndexMap::new(),
        };
        interp.seed_builtin_variables();
        interp
    }

    fn seed_builtin_variables(&mut self) {
        let machines = &self.env.machines.info;
        self.variables.insert(
            "meson".to_owned(),
            Value::Object(Rc::new(MesonObject::new())),
        );
        self.variables.insert(
            "build_machine".to_owned(),
            Value::Object(Rc::new(MachineObject::new(Rc::new(machines.build.clone())))),
        );
        self.variables.insert(
            "host_machine".to_owned(),
            Value::Object(Rc::new(MachineObject::new(Rc::new(machines.host.clone())))),
        );
        self.variables.insert(
            "target_machine".to_owned(),
            Value::Object(Rc::new(MachineObject::new(Rc::new(
                machines.target.clone(),
            )))),
        );
    }

    /// Evaluates this (sub)project's root build file to completion, then
    /// emits the feature report. The top level also persists state.
    pub fn run(&mut self) -> IntpResult<()> {
        let root_file = if self.root_subdir.is_empty() {
            PathBuf::from(BUILD_FILE_NAME)
        } else {
            Path::new(&self.root_subdir).join(BUILD_FILE_NAME)
        };
        self.eval_build_file(&root_file)?;
        self.features.borrow_mut().report(&self.subproject);
        if self.subproject.is_empty() {
            self.print_summaries();
            self.env
                .persist_state(&self.build.borrow())
                .map_err(|e| IntpError::runtime(format!("failed to persist build state: {e}")))?;
        }
        Ok(())
    }

    /// Final report of `summary()` entries and per-subproject warning
    /// counts, emitted once at the end of the top-level run.
    fn print_summaries(&self) {
        let shared = self.shared.borrow();
        for (subproject, sections) in &shared.summaries {
            let header = if subproject.is_empty() {
                format!("{} {}", self.project_name, self.project_version)
            } else {
                format!("subproject {subproject}")
            };
            crate::logger::message(&header);
            for (section, entries) in sections {
                if !section.is_empty() {
                    crate::logger::message(&format!("  {section}"));
                }
                for (key, value) in entries {
                    crate::logger::message(&format!("    {key}: {value}"));
                }
            }
        }
        for (subproject, count) in crate::logger::warning_counts() {
            let label = if subproject.is_empty() {
                "project".to_owned()
            } else {
                format!("subproject {subproject}")
            };
            crate::logger::message(&format!("{label}: {count} warning(s)"));
        }
    }

    pub(crate) fn eval_build_file(&mut self, relative: &Path) -> IntpResult<()> {
        let key = relative.to_string_lossy().into_owned();
        if !self.processed_buildfiles.insert(key.clone()) {
            return Err(IntpError::invalid_code(format!(
                "tried to enter directory \"{key}\", which has already been visited"
            ))
            .at(&self.current_location));
        }

        let absolute = self.env.source_root.join(relative);
        let ast = self
            .ports
            .loader
            .load_build_file(&absolute)
            .map_err(|e| {
                IntpError::runtime(format!("could not read {}: {e}", relative.display()))
                    .at(&self.current_location)
            })?;
        self.build.borrow_mut().add_build_def_file(absolute);

        match self.eval_block(&ast)? {
            Flow::Break | Flow::Continue => Err(IntpError::invalid_code(
                "break and continue are only valid inside a loop",
            )
            .at(&self.current_location)),
            // subdir_done and normal completion both just end the file.
            Flow::Normal | Flow::SubdirDone => Ok(()),
        }
    }

    pub(crate) fn eval_block(&mut self, block: &CodeBlock) -> IntpResult<Flow> {
        for stmt in &block.statements {
            match self.eval_statement(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_statement(&mut self, stmt: &Stmt) -> IntpResult<Flow> {
        self.current_location = stmt.location().clone();
        match stmt {
            Stmt::Assignment(node) => {
                let value = self.eval_expr(&node.value)?;
                self.assign_variable(&node.name, value, &node.location)?;
                Ok(Flow::Normal)
            }
            Stmt::PlusAssignment(node) => {
                let addition = self.eval_expr(&node.value)?;
                let old = self.lookup_variable(&node.name, &node.location)?;
                let new = ops::arithmetic(
                    mortar_dsl::ast::ArithmeticOp::Add,
                    old,
                    addition,
                    &node.location,
                )?;
                self.assign_variable(&node.name, new, &node.location)?;
                Ok(Flow::Normal)
            }
            Stmt::Expression(node) => {
                // subdir_done() unwinds the enclosing file, expressed as a
                // flow outcome rather than an unwinding exception.
                if let Expr::FunctionCall(call) = &node.expression
                    && call.name == "subdir_done"
                {
                    let args = self.eval_args(&call.args, true)?;
                    args.check_no_positional("subdir_done")?;
                    args.check_no_kwargs("subdir_done")?;
                    return Ok(Flow::SubdirDone);
                }
                self.eval_expr(&node.expression)?;
                Ok(Flow::Normal)
            }
            Stmt::If(node) => self.eval_if(node),
            Stmt::Foreach(node) => self.eval_foreach(node),
            Stmt::Break(_) => Ok(Flow::Break),
            Stmt::Continue(_) => Ok(Flow::Continue),
        }
    }

    fn eval_if(&mut self, node: &IfClauseNode) -> IntpResult<Flow> {
        for clause in &node.clauses {
            let condition = self.eval_expr(&clause.condition)?;
            let truthy = match condition {
                Value::Bool(b) => b,
                Value::Disabler => false,
                other => {
                    return Err(IntpError::invalid_code(format!(
                        "if condition must be a boolean, got {}",
                        other.type_name()
                    ))
                    .at(clause.condition.location()));
                }
            };
            if truthy {
                return self.eval_block(&clause.block);
            }
        }
        match &node.else_block {
            Some(block) => self.eval_block(block),
            None => Ok(Flow::Normal),
        }
    }

    fn eval_foreach(&mut self, node: &ForeachNode) -> IntpResult<Flow> {
        let items = self.eval_expr(&node.items)?;
        match items {
            Value::Disabler => Ok(Flow::Normal),
            Value::List(items) => {
                if node.varnames.len() != 1 {
                    return Err(IntpError::invalid_arguments(
                        "foreach over a list needs exactly one loop variable",
                    )
                    .at(&node.location));
                }
                for item in items {
                    self.variables.insert(node.varnames[0].clone(), item);
                    match self.eval_block(&node.block)? {
                        Flow::Break => break,
                        Flow::SubdirDone => return Ok(Flow::SubdirDone),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Value::Dict(map) => {
                if node.varnames.len() != 2 {
                    return Err(IntpError::invalid_arguments(
                        "foreach over a dict needs exactly two loop variables",
                    )
                    .at(&node.location));
                }
                for (key, value) in map {
                    self.variables
                        .insert(node.varnames[0].clone(), Value::Str(key));
                    self.variables.insert(node.varnames[1].clone(), value);
                    match self.eval_block(&node.block)? {
                        Flow::Break => break,
                        Flow::SubdirDone => return Ok(Flow::SubdirDone),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            other => Err(IntpError::invalid_arguments(format!(
                "foreach requires a list or a dict, got {}",
                other.type_name()
            ))
            .at(node.items.location())),
        }
    }

    pub fn eval_expr(&mut self, expr: &Expr) -> IntpResult<Value> {
        match expr {
            Expr::Id(node) => self.lookup_variable(&node.name, &node.location),
            Expr::Str(node) => Ok(Value::Str(node.value.clone())),
            Expr::FormatStr(node) => self.eval_format_string(&node.value, &node.location),
            Expr::Number(node) => Ok(Value::Int(node.value)),
            Expr::Boolean(node) => Ok(Value::Bool(node.value)),
            Expr::Array(node) => {
                let args = self.eval_args(&node.args, false)?;
                if !args.kwargs.is_empty() {
                    return Err(IntpError::invalid_arguments(
                        "keyword arguments are invalid in array construction",
                    )
                    .at(&node.location));
                }
                Ok(Value::List(args.positional))
            }
            Expr::Dict(node) => self.eval_dict(node),
            Expr::Arithmetic(node) => {
                let left = self.eval_expr(&node.left)?;
                let right = self.eval_expr(&node.right)?;
                ops::arithmetic(node.op, left, right, &node.location)
            }
            Expr::Comparison(node) => {
                let left = self.eval_expr(&node.left)?;
                let right = self.eval_expr(&node.right)?;
                ops::comparison(node.op, left, right, &node.location)
            }
            Expr::And(node) => {
                let left = self.eval_expr(&node.left)?;
                match left {
                    Value::Disabler => Ok(Value::Disabler),
                    Value::Bool(false) => Ok(Value::Bool(false)),
                    Value::Bool(true) => self.eval_bool_operand(&node.right, "and"),
                    other => Err(IntpError::invalid_arguments(format!(
                        "\"and\" requires boolean operands, got {}",
                        other.type_name()
                    ))
                    .at(&node.location)),
                }
            }
            Expr::Or(node) => {
                let left = self.eval_expr(&node.left)?;
                match left {
                    Value::Disabler => Ok(Value::Disabler),
                    Value::Bool(true) => Ok(Value::Bool(true)),
                    Value::Bool(false) => self.eval_bool_operand(&node.right, "or"),
                    other => Err(IntpError::invalid_arguments(format!(
                        "\"or\" requires boolean operands, got {}",
                        other.type_name()
                    ))
                    .at(&node.location)),
                }
            }
            Expr::Not(node) => {
                let value = self.eval_expr(&node.expression)?;
                ops::unary_not(value, &node.location)
            }
            Expr::UMinus(node) => {
                let value = self.eval_expr(&node.expression)?;
                ops::unary_minus(value, &node.location)
            }
            Expr::Ternary(node) => {
                let condition = self.eval_expr(&node.condition)?;
                match condition {
                    Value::Disabler => Ok(Value::Disabler),
                    Value::Bool(true) => self.eval_expr(&node.if_true),
                    Value::Bool(false) => self.eval_expr(&node.if_false),
                    other => Err(IntpError::invalid_arguments(format!(
                        "ternary condition must be a boolean, got {}",
                        other.type_name()
                    ))
                    .at(&node.location)),
                }
            }
            Expr::Index(node) => {
                let container = self.eval_expr(&node.object)?;
                let index = self.eval_expr(&node.index)?;
                ops::index(container, index, &node.location)
            }
            Expr::MethodCall(node) => self.eval_method_call(node),
            Expr::FunctionCall(node) => self.eval_function_call(node),
        }
    }

    fn eval_bool_operand(&mut self, expr: &Expr, op: &str) -> IntpResult<Value> {
        let value = self.eval_expr(expr)?;
        match value {
            Value::Bool(_) | Value::Disabler => Ok(value),
            other => Err(IntpError::invalid_arguments(format!(
                "\"{op}\" requires boolean operands, got {}",
                other.type_name()
            ))
            .at(expr.location())),
        }
    }

    fn eval_dict(&mut self, node: &mortar_dsl::ast::DictNode) -> IntpResult<Value> {
        let mut map = IndexMap::new();
        for pair in &node.args.keywords {
            let key = match &pair.name {
                Expr::Str(s) => s.value.clone(),
                other => {
                    let value = self.eval_expr(other)?;
                    value
                        .as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| {
                            IntpError::invalid_arguments(format!(
                                "dict keys must be strings, got {}",
                                value.type_name()
                            ))
                            .at(&pair.location)
                        })?
                }
            };
            let value = self.eval_expr(&pair.value)?;
            if map.insert(key.clone(), value).is_some() {
                return Err(IntpError::invalid_arguments(format!(
                    "duplicate dict key \"{key}\""
                ))
                .at(&pair.location));
            }
        }
        Ok(Value::Dict(map))
    }

    fn eval_format_string(&mut self, template: &str, location: &Location) -> IntpResult<Value> {
        let mut error: Option<IntpError> = None;
        let (out, missing) = substitute_vars(template, |name| {
            match self.variables.get(name) {
                Some(Value::Str(s)) => Some(s.clone()),
                Some(Value::Int(i)) => Some(i.to_string()),
                Some(Value::Bool(b)) => Some(b.to_string()),
                Some(other) => {
                    error.get_or_insert_with(|| {
                        IntpError::invalid_arguments(format!(
                            "format string placeholder \"{name}\" is a {}; \
                             only strings, integers and booleans can be interpolated",
                            other.type_name()
                        ))
                        .at(location)
                    });
                    None
                }
                None => None,
            }
        });
        if let Some(error) = error {
            return Err(error);
        }
        if let Some(name) = missing.first() {
            return Err(IntpError::invalid_code(format!(
                "format string references unknown variable \"{name}\""
            ))
            .at(location));
        }
        Ok(Value::Str(out))
    }

    pub(crate) fn eval_args(
        &mut self,
        node: &ArgumentNode,
        flatten_positional: bool,
    ) -> IntpResult<Args> {
        let mut positional = Vec::with_capacity(node.positional.len());
        for expr in &node.positional {
            positional.push(self.eval_expr(expr)?);
        }
        if flatten_positional {
            positional = flatten(positional);
        }

        let mut kwargs = IndexMap::new();
        for pair in &node.keywords {
            let Expr::Id(id) = &pair.name else {
                return Err(IntpError::invalid_arguments(
                    "keyword argument names must be identifiers",
                )
                .at(&pair.location));
            };
            let value = self.eval_expr(&pair.value)?;
            if kwargs.insert(id.name.clone(), value).is_some() {
                return Err(IntpError::invalid_arguments(format!(
                    "duplicate keyword argument \"{}\"",
                    id.name
                ))
                .at(&pair.location));
            }
        }

        Ok(Args {
            positional,
            kwargs,
            location: node.location.clone(),
        })
    }

    fn eval_function_call(&mut self, node: &FunctionCallNode) -> IntpResult<Value> {
        self.current_location = node.location.clone();
        if !self.project_declared && node.name != "project" {
            return Err(IntpError::invalid_code(format!(
                "first statement must be a call to project(), not {}()",
                node.name
            ))
            .at(&node.location));
        }
        builtins::call_builtin(self, node)
    }

    fn eval_method_call(&mut self, node: &MethodCallNode) -> IntpResult<Value> {
        let receiver = self.eval_expr(&node.object)?;
        if receiver.is_disabler() {
            return Ok(Value::Disabler);
        }
        self.current_location = node.location.clone();

        if node.name.starts_with('_') {
            return Err(IntpError::invalid_arguments(format!(
                "method \"{}\" is private",
                node.name
            ))
            .at(&node.location));
        }

        // Lookup methods keep their default argument intact even when it is
        // a list; everything else gets the usual flattening.
        let flatten_args = !matches!(node.name.as_str(), "get" | "get_unquoted" | "get_variable");
        let args = self.eval_args(&node.args, flatten_args)?;
        if args.has_disabler() {
            return Ok(Value::Disabler);
        }

        match receiver {
            Value::Object(handle) => handle.call_method(&node.name, &args, self),
            primitive => builtins::primitives::call_method(self, primitive, &node.name, &args),
        }
    }

    pub(crate) fn lookup_variable(&self, name: &str, location: &Location) -> IntpResult<Value> {
        self.variables.get(name).cloned().ok_or_else(|| {
            IntpError::invalid_code(format!("unknown variable \"{name}\"")).at(location)
        })
    }

    pub(crate) fn assign_variable(
        &mut self,
        name: &str,
        value: Value,
        location: &Location,
    ) -> IntpResult<()> {
        if RESERVED_NAMES.contains(&name) {
            return Err(
                IntpError::invalid_code(format!("cannot assign to reserved name \"{name}\""))
                    .at(location),
            );
        }
        if value == Value::Null {
            return Err(IntpError::invalid_code(
                "tried to assign the result of a function that has no return value",
            )
            .at(location));
        }
        self.variables.insert(name.to_owned(), value);
        Ok(())
    }

    /// `(disabled, required, feature_name)` from a `required:` kwarg that is
    /// either a boolean or a feature-option handle.
    pub fn extract_required_kwarg(
        &mut self,
        args: &Args,
        default_required: bool,
    ) -> IntpResult<(bool, bool, Option<String>)> {
        match args.kw("required") {
            None => Ok((false, default_required, None)),
            Some(Value::Bool(required)) => Ok((false, *required, None)),
            Some(Value::Object(obj)) => {
                let feature = downcast::<FeatureObject>(obj).ok_or_else(|| {
                    IntpError::invalid_arguments(
                        "\"required\" must be a boolean or a feature option",
                    )
                    .at(&args.location)
                })?;
                let name = Some(feature.name.clone());
                match *feature.state {
                    FeatureState::Enabled => Ok((false, true, name)),
                    FeatureState::Disabled => Ok((true, false, name)),
                    FeatureState::Auto => Ok((false, false, name)),
                }
            }
            Some(other) => Err(IntpError::invalid_arguments(format!(
                "\"required\" must be a boolean or a feature option, got {}",
                other.type_name()
            ))
            .at(&args.location)),
        }
    }

    /// Current subdir relative to this (sub)project's root, for error text.
    pub fn relative_subdir(&self) -> &str {
        self.subdir
            .strip_prefix(&self.root_subdir)
            .map(|s| s.trim_start_matches('/'))
            .unwrap_or(&self.subdir)
    }

    pub fn annotate_error(&self, mut err: IntpError) -> IntpError {
        if !self.subproject.is_empty() {
            err.push_frame(format!("in subproject \"{}\"", self.subproject));
        }
        if !self.relative_subdir().is_empty() {
            err.push_frame(format!("in subdir \"{}\"", self.relative_subdir()));
        }
        err
    }
}
