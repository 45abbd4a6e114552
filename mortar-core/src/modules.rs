use std::path::PathBuf;
use std::rc::Rc;

use mortar_dsl::diagnostics::Location;
use mortar_kernel::machines::Machines;
use mortar_kernel::targets::AnyTarget;

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::logger;
use crate::objects::module::ModuleObject;
use crate::value::Value;

pub mod fs;
pub mod keyval;

/// Immutable snapshot of interpreter state handed to a module method. The
/// module never sees the evaluator itself, only this record.
pub struct ModuleState {
    pub source_root: PathBuf,
    pub build_root: PathBuf,
    pub subdir: String,
    pub root_subdir: String,
    pub subproject: String,
    pub project_name: String,
    pub project_version: String,
    pub machines: Machines,
    pub location: Location,
}

impl ModuleState {
    pub fn snapshot(interp: &Interpreter, location: &Location) -> Self {
        Self {
            source_root: interp.env.source_root.clone(),
            build_root: interp.env.build_root.clone(),
            subdir: interp.subdir.clone(),
            root_subdir: interp.root_subdir.clone(),
            subproject: interp.subproject.clone(),
            project_name: interp.project_name.clone(),
            project_version: interp.project_version.clone(),
            machines: interp.env.machines.clone(),
            location: location.clone(),
        }
    }
}

/// What a module method hands back: the DSL-visible value plus any targets
/// it created, which the core itself inserts into the accumulator.
pub struct ModuleReturnValue {
    pub value: Value,
    pub new_targets: Vec<AnyTarget>,
}

impl ModuleReturnValue {
    pub fn plain(value: Value) -> Self {
        Self {
            value,
            new_targets: Vec::new(),
        }
    }
}

pub trait ExtModule {
    fn name(&self) -> &'static str;

    fn call(
        &self,
        method: &str,
        state: &ModuleState,
        args: &Args,
        interp: &mut Interpreter,
    ) -> IntpResult<ModuleReturnValue>;
}

fn instantiate(name: &str) -> Option<Rc<dyn ExtModule>> {
    match name {
        "fs" => Some(Rc::new(fs::FsModule)),
        "keyval" => Some(Rc::new(keyval::KeyvalModule)),
        _ => None,
    }
}

/// `import()`: first use per evaluator instantiates the module; later calls
/// reuse the instance.
pub fn import(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos_str(0, "import")?.to_owned();
    let (disabled, required, _) = interp.extract_required_kwarg(args, true)?;
    if disabled {
        return Ok(Value::Disabler);
    }

    if let Some(module) = interp.modules.get(&name) {
        return Ok(Value::Object(Rc::new(ModuleObject::new(module.clone()))));
    }

    match instantiate(&name) {
        Some(module) => {
            interp.modules.insert(name, module.clone());
            Ok(Value::Object(Rc::new(ModuleObject::new(module))))
        }
        None if required => Err(IntpError::invalid_arguments(format!(
            "module \"{name}\" does not exist"
        ))
        .at(&args.location)),
        None => {
            logger::message(&format!("module {name} not found"));
            Ok(Value::Disabler)
        }
    }
}

/// Runs one module method with the tamper check around it: the accumulator
/// may only grow by the targets the module declared in its return value.
pub fn dispatch(
    interp: &mut Interpreter,
    module: &Rc<dyn ExtModule>,
    method: &str,
    args: &Args,
) -> IntpResult<Value> {
    let state = ModuleState::snapshot(interp, &args.location);

    let targets_before = interp.build.borrow().targets().len();
    let result = module.call(method, &state, args, interp)?;
    let targets_after = interp.build.borrow().targets().len();
    if targets_after != targets_before {
        return Err(IntpError::invalid_code(format!(
            "module \"{}\" modified the target list behind the interpreter's back",
            module.name()
        ))
        .at(&args.location));
    }

    for target in result.new_targets {
        interp
            .build
            .borrow_mut()
            .add_target(target)
            .map_err(|e| IntpError::from(e).at(&args.location))?;
    }
    Ok(result.value)
}
