use std::any::Any;
use std::rc::Rc;

use mortar_kernel::deps::{Dependency, DepOrigin, IncludeType};
use mortar_kernel::ports::{Compiler, CompilerHandle};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::dependency::DependencyObject;
use crate::objects::run_result::TryRunObject;
use crate::objects::{Object, unknown_method};
use crate::value::Value;

/// Handle of a per-language compiler. Probes delegate to the compiler port;
/// caching by `(compiler id, args, code hash)` is the port's concern.
pub struct CompilerObject {
    pub compiler: CompilerHandle,
}

impl CompilerObject {
    pub fn new(compiler: CompilerHandle) -> Self {
        Self { compiler }
    }

    fn probe_code<'a>(&self, args: &'a Args, what: &str) -> IntpResult<&'a str> {
        args.check_pos_count(what, 1, Some(1))?;
        args.pos_str(0, what)
    }

    fn extra_args(&self, args: &Args) -> IntpResult<Vec<String>> {
        args.kw_string_list("args")
    }
}

impl Object for CompilerObject {
    fn kind(&self) -> &'static str {
        "compiler"
    }

    fn entity_id(&self) -> usize {
        Rc::as_ptr(&self.compiler) as *const () as usize
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, interp: &mut Interpreter) -> IntpResult<Value> {
        let at = |err: mortar_kernel::ports::PortError| {
            IntpError::from(err).at(&args.location)
        };
        match name {
            "get_id" => Ok(Value::Str(self.compiler.id().to_owned())),
            "get_linker_id" => Ok(Value::Str(self.compiler.id().to_owned())),
            "version" => Ok(Value::Str(self.compiler.version().to_owned())),
            "cmd_array" => Ok(Value::List(
                self.compiler
                    .command()
                    .iter()
                    .map(|part| Value::Str(part.clone()))
                    .collect(),
            )),
            "get_argument_syntax" => Ok(Value::Str("gcc".to_owned())),
            "compiles" => {
                let code = self.probe_code(args, "compiles")?;
                let result = self
                    .compiler
                    .compiles(code, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Bool(result.success))
            }
            "links" => {
                let code = self.probe_code(args, "links")?;
                let result = self
                    .compiler
                    .links(code, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Bool(result.success))
            }
            "run" => {
                let code = self.probe_code(args, "run")?;
                let result = self
                    .compiler
                    .run(code, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Object(Rc::new(TryRunObject::new(result))))
            }
            "has_header" => {
                let header = self.probe_code(args, "has_header")?;
                let found = self
                    .compiler
                    .has_header(header, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Bool(found))
            }
            "has_function" => {
                let function = self.probe_code(args, "has_function")?;
                let found = self
                    .compiler
                    .has_function(function, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Bool(found))
            }
            "has_type" => {
                let type_name = self.probe_code(args, "has_type")?;
                let found = self
                    .compiler
                    .has_type(type_name, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Bool(found))
            }
            "has_member" => {
                args.check_pos_count("has_member", 2, Some(2))?;
                let target = args.pos_str(0, "has_member")?;
                let member = args.pos_str(1, "has_member")?;
                let found = self
                    .compiler
                    .has_member(target, member, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Bool(found))
            }
            "has_members" => {
                args.check_pos_count("has_members", 2, None)?;
                let target = args.pos_str(0, "has_members")?;
                let extra = self.extra_args(args)?;
                for index in 1..args.positional.len() {
                    let member = args.pos_str(index, "has_members")?;
                    if !self.compiler.has_member(target, member, &extra).map_err(at)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            "has_argument" => {
                let argument = self.probe_code(args, "has_argument")?;
                Ok(Value::Bool(self.compiler.has_argument(argument).map_err(at)?))
            }
            "has_multi_arguments" => {
                args.check_pos_count("has_multi_arguments", 1, None)?;
                for index in 0..args.positional.len() {
                    let argument = args.pos_str(index, "has_multi_arguments")?;
                    if !self.compiler.has_argument(argument).map_err(at)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            "get_supported_arguments" => {
                let mut supported = Vec::new();
                for index in 0..args.positional.len() {
                    let argument = args.pos_str(index, "get_supported_arguments")?;
                    if self.compiler.has_argument(argument).map_err(at)? {
                        supported.push(Value::Str(argument.to_owned()));
                    }
                }
                Ok(Value::List(supported))
            }
            "sizeof" => {
                let type_name = self.probe_code(args, "sizeof")?;
                let size = self
                    .compiler
                    .sizeof(type_name, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Int(size))
            }
            "alignment" => {
                let type_name = self.probe_code(args, "alignment")?;
                let alignment = self
                    .compiler
                    .alignment(type_name, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Int(alignment))
            }
            "compute_int" => {
                let expr = self.probe_code(args, "compute_int")?;
                let value = self
                    .compiler
                    .compute_int(expr, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Int(value))
            }
            "get_define" => {
                let define = self.probe_code(args, "get_define")?;
                let value = self
                    .compiler
                    .get_define(define, &self.extra_args(args)?)
                    .map_err(at)?;
                Ok(Value::Str(value.unwrap_or_default()))
            }
            "find_library" => {
                let lib_name = self.probe_code(args, "find_library")?;
                let (disabled, required, _) =
                    interp.extract_required_kwarg(args, true)?;
                if disabled {
                    let dep = Dependency::not_found(lib_name, self.compiler.machine());
                    return Ok(Value::Object(Rc::new(DependencyObject::new(Rc::new(dep)))));
                }
                let static_link = args.kw_bool("static", false)?;
                let found = self
                    .compiler
                    .find_library(lib_name, static_link)
                    .map_err(at)?;
                match found {
                    Some(link_args) => {
                        let dep = Dependency {
                            name: lib_name.to_owned(),
                            version: None,
                            machine: self.compiler.machine(),
                            compile_args: Vec::new(),
                            link_args,
                            include_type: IncludeType::Preserve,
                            variables: Default::default(),
                            origin: DepOrigin::External,
                        };
                        Ok(Value::Object(Rc::new(DependencyObject::new(Rc::new(dep)))))
                    }
                    None if required => Err(IntpError::dependency(format!(
                        "library \"{lib_name}\" not found for {} compiler",
                        self.compiler.language()
                    ))
                    .at(&args.location)),
                    None => {
                        let dep = Dependency::not_found(lib_name, self.compiler.machine());
                        Ok(Value::Object(Rc::new(DependencyObject::new(Rc::new(dep)))))
                    }
                }
            }
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}
