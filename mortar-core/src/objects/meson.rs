use std::any::Any;
use std::rc::Rc;

use mortar_kernel::build::DependencyOverride;
use mortar_kernel::deps::DependencyId;
use mortar_kernel::machines::MachineChoice;
use mortar_kernel::ports::Backend;
use mortar_kernel::targets::ExternalProgram;

use crate::args::Args;
use crate::builtins::crosscut::lookup_compiler;
use crate::errors::{IntpError, IntpResult};
use crate::features::FeatureKind;
use crate::interpreter::{DSL_VERSION, Interpreter};
use crate::objects::dependency::DependencyObject;
use crate::objects::downcast;
use crate::objects::file::FileObject;
use crate::objects::program::ProgramObject;
use crate::objects::target::TargetObject;
use crate::objects::{Object, unknown_method};
use crate::scripts::{ScriptPhase, add_script};
use crate::value::Value;

/// The `meson` namespace object seeded into every evaluator scope.
pub struct MesonObject;

impl MesonObject {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MesonObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Object for MesonObject {
    fn kind(&self) -> &'static str {
        "meson"
    }

    fn entity_id(&self) -> usize {
        // All handles alias the same conceptual namespace.
        1
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn call_method(&self, name: &str, args: &Args, interp: &mut Interpreter) -> IntpResult<Value> {
        match name {
            "current_source_dir" => Ok(Value::Str(
                interp
                    .env
                    .source_root
                    .join(&interp.subdir)
                    .to_string_lossy()
                    .into_owned(),
            )),
            "current_build_dir" => Ok(Value::Str(
                interp
                    .env
                    .build_root
                    .join(&interp.subdir)
                    .to_string_lossy()
                    .into_owned(),
            )),
            "source_root" => {
                let subproject = interp.subproject.clone();
                interp.features.borrow_mut().check(
                    FeatureKind::Deprecated,
                    &subproject,
                    "meson.source_root",
                    "0.56.0",
                    Some(&args.location),
                );
                Ok(Value::Str(
                    interp.env.source_root.to_string_lossy().into_owned(),
                ))
            }
            "build_root" => {
                let subproject = interp.subproject.clone();
                interp.features.borrow_mut().check(
                    FeatureKind::Deprecated,
                    &subproject,
                    "meson.build_root",
                    "0.56.0",
                    Some(&args.location),
                );
                Ok(Value::Str(
                    interp.env.build_root.to_string_lossy().into_owned(),
                ))
            }
            "project_source_root" => Ok(Value::Str(
                interp
                    .env
                    .source_root
                    .join(&interp.root_subdir)
                    .to_string_lossy()
                    .into_owned(),
            )),
            "project_build_root" => Ok(Value::Str(
                interp
                    .env
                    .build_root
                    .join(&interp.root_subdir)
                    .to_string_lossy()
                    .into_owned(),
            )),
            "project_name" => Ok(Value::Str(interp.project_name.clone())),
            "project_version" => Ok(Value::Str(interp.project_version.clone())),
            "project_license" => Ok(Value::List(
                interp
                    .project_license
                    .iter()
                    .map(|l| Value::Str(l.clone()))
                    .collect(),
            )),
            "version" => Ok(Value::Str(DSL_VERSION.to_owned())),
            "is_cross_build" => Ok(Value::Bool(interp.env.machines.is_cross_build())),
            "is_subproject" => Ok(Value::Bool(!interp.subproject.is_empty())),
            "is_unity" => Ok(Value::Bool(false)),
            "can_run_host_binaries" | "has_exe_wrapper" => {
                Ok(Value::Bool(!interp.env.machines.is_cross_build()))
            }
            "backend" => Ok(Value::Str(interp.ports.backend.name().to_owned())),
            "get_compiler" => {
                let language = args.pos_str(0, "get_compiler")?;
                let machine = MachineChoice::from_native_flag(args.kw_bool("native", false)?);
                lookup_compiler(interp, language, machine, &args.location)
            }
            "override_dependency" => {
                let dep_name = args.pos_str(0, "override_dependency")?.to_owned();
                if dep_name.is_empty() {
                    return Err(IntpError::invalid_arguments(
                        "dependency name cannot be empty",
                    )
                    .at(&args.location));
                }
                let dep_value = args.pos(1, "override_dependency")?;
                let dep = dep_value
                    .as_object()
                    .and_then(|obj| downcast::<DependencyObject>(obj))
                    .ok_or_else(|| {
                        IntpError::invalid_arguments(
                            "override_dependency expects a dependency object",
                        )
                        .at(&args.location)
                    })?;
                let machine = MachineChoice::from_native_flag(args.kw_bool("native", false)?);
                let id = DependencyId::new(dep_name, machine);
                interp
                    .build
                    .borrow_mut()
                    .add_dependency_override(
                        id,
                        DependencyOverride {
                            dep: dep.dep.clone(),
                            explicit: true,
                            origin: args.location.to_string(),
                        },
                    )
                    .map_err(|e| IntpError::from(e).at(&args.location))?;
                Ok(Value::Null)
            }
            "override_find_program" => {
                let prog_name = args.pos_str(0, "override_find_program")?.to_owned();
                let replacement = args.pos(1, "override_find_program")?;
                let program: Rc<ExternalProgram> = match replacement {
                    Value::Object(obj) => {
                        if let Some(program) = downcast::<ProgramObject>(obj) {
                            program.program.clone()
                        } else if let Some(file) = downcast::<FileObject>(obj) {
                            let path = file
                                .file
                                .absolute_path(&interp.env.source_root, &interp.env.build_root);
                            Rc::new(ExternalProgram {
                                name: prog_name.clone(),
                                command: vec![path.to_string_lossy().into_owned()],
                                version: None,
                            })
                        } else if let Some(target) = downcast::<TargetObject>(obj) {
                            let build = interp.build.borrow();
                            let entity =
                                build.get_target(&target.target_id).ok_or_else(|| {
                                    IntpError::runtime(format!(
                                        "target \"{}\" vanished from the build accumulator",
                                        target.target_id
                                    ))
                                    .at(&args.location)
                                })?;
                            Rc::new(ExternalProgram {
                                name: prog_name.clone(),
                                command: vec![interp.ports.backend.get_target_filename(entity)],
                                version: None,
                            })
                        } else {
                            return Err(IntpError::invalid_arguments(format!(
                                "override_find_program expects a program, file or executable, \
                                 got {}",
                                obj.kind()
                            ))
                            .at(&args.location));
                        }
                    }
                    other => {
                        return Err(IntpError::invalid_arguments(format!(
                            "override_find_program expects a program, file or executable, got {}",
                            other.type_name()
                        ))
                        .at(&args.location));
                    }
                };
                interp
                    .build
                    .borrow_mut()
                    .add_find_override(&prog_name, program)
                    .map_err(|e| IntpError::from(e).at(&args.location))?;
                Ok(Value::Null)
            }
            "add_install_script" => add_script(interp, ScriptPhase::Install, args),
            "add_postconf_script" => add_script(interp, ScriptPhase::Postconf, args),
            "add_dist_script" => {
                if !interp.subproject.is_empty() {
                    let subproject = interp.subproject.clone();
                    interp.features.borrow_mut().check(
                        FeatureKind::New,
                        &subproject,
                        "meson.add_dist_script in a subproject",
                        "0.58.0",
                        Some(&args.location),
                    );
                }
                add_script(interp, ScriptPhase::Dist, args)
            }
            _ => Err(unknown_method(self.kind(), name, args)),
        }
    }
}
