use std::rc::Rc;

use mortar_kernel::build::DependencyOverride;
use mortar_kernel::deps::{Dependency, DependencyId, IncludeType};
use mortar_kernel::machines::MachineChoice;
use mortar_kernel::ports::{DependencyFinder, DependencyRequest, SubprojectResolver};
use mortar_kernel::version::version_compare_many;

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::{Interpreter, SubprojectRecord};
use crate::logger;
use crate::objects::dependency::DependencyObject;
use crate::objects::downcast;
use crate::project;
use crate::value::Value;

struct Lookup {
    name: String,
    machine: MachineChoice,
    constraints: Vec<String>,
    required: bool,
    return_disabler: bool,
    not_found_message: Option<String>,
    include_type: IncludeType,
}

impl Lookup {
    fn not_found(&self) -> Value {
        if self.return_disabler {
            return Value::Disabler;
        }
        let dep = Dependency::not_found(self.name.clone(), self.machine);
        Value::Object(Rc::new(DependencyObject::new(Rc::new(dep))))
    }

    fn wrap(&self, dep: Rc<Dependency>) -> Value {
        // A requested include type other than the record's makes a copy;
        // the cache slot keeps the original so identity stays stable for
        // default lookups.
        if self.include_type != IncludeType::Preserve && dep.include_type != self.include_type {
            let mut copy = (*dep).clone();
            copy.include_type = self.include_type;
            return Value::Object(Rc::new(DependencyObject::new(Rc::new(copy))));
        }
        Value::Object(Rc::new(DependencyObject::new(dep)))
    }
}

/// `dependency()`: required gate, override table, per-machine cache, system
/// provider, subproject fallback — in that order.
pub fn dependency(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos_str(0, "dependency")?.to_owned();
    let (disabled, required, feature) = interp.extract_required_kwarg(args, true)?;

    let include_type = {
        let raw = args.kw_str_or("include_type", "preserve")?;
        IncludeType::parse(&raw).ok_or_else(|| {
            IntpError::invalid_arguments(format!("unknown include_type \"{raw}\""))
                .at(&args.location)
        })?
    };

    let lookup = Lookup {
        name: name.clone(),
        machine: MachineChoice::from_native_flag(args.kw_bool("native", false)?),
        constraints: args.kw_string_list("version")?,
        required,
        return_disabler: args.kw_bool("disabler", false)?,
        not_found_message: args.kw_str("not_found_message")?,
        include_type,
    };

    if disabled {
        if let Some(feature) = feature {
            logger::message(&format!(
                "dependency {name} skipped: feature {feature} disabled"
            ));
        }
        return Ok(lookup.not_found());
    }

    let static_link = match args.kw("static") {
        Some(Value::Bool(b)) => Some(*b),
        _ => None,
    };
    let id = DependencyId::new(name.clone(), lookup.machine)
        .with_static(static_link)
        .with_method(args.kw_str("method")?)
        .with_modules(args.kw_string_list("modules")?);

    // Overrides beat everything, including the cache.
    let overridden = interp
        .build
        .borrow()
        .dependency_override(&id)
        .map(|entry| entry.dep.clone());
    if let Some(dep) = overridden {
        return finish_with_version_check(&lookup, dep, args, "overridden");
    }

    let cached = interp.build.borrow().cached_dependency(&id);
    if let Some(dep) = cached {
        return finish_with_version_check(&lookup, dep, args, "cached");
    }

    // Fallback binding: explicit kwarg, or an in-tree provider when fallback
    // is not ruled out.
    let fallback_kw = args.kw_string_list("fallback")?;
    let allow_fallback = args.kw_bool("allow_fallback", true)?;
    let fallback: Option<(String, Option<String>)> = if !fallback_kw.is_empty() {
        let subp_name = fallback_kw[0].clone();
        let varname = fallback_kw.get(1).cloned();
        Some((subp_name, varname))
    } else if allow_fallback {
        interp
            .ports
            .resolver
            .provider_for(&name)
            .map(|subp| (subp, None))
    } else {
        None
    };

    // System search, unless a method forces the fallback path.
    if !name.is_empty() {
        let request = DependencyRequest {
            constraints: lookup.constraints.clone(),
            static_link,
            method: id.method.clone(),
            modules: id.modules.clone(),
            machine: lookup.machine,
        };
        let searched = interp
            .ports
            .dep_finder
            .find_external_dependency(&name, &request);
        match searched {
            Ok(Some(dep)) => {
                if version_ok(&dep, &lookup.constraints) {
                    let dep = Rc::new(dep);
                    remember(interp, &id, dep.clone(), args);
                    return Ok(lookup.wrap(dep));
                }
                logger::message(&format!(
                    "dependency {name} found version {} but [{}] required",
                    dep.version_or_undefined(),
                    lookup.constraints.join(", ")
                ));
            }
            Ok(None) => {}
            Err(e) => {
                if lookup.required && fallback.is_none() {
                    return Err(IntpError::dependency(e.to_string()).at(&args.location));
                }
                logger::message(&format!("dependency {name} lookup failed: {e}"));
            }
        }
    }

    if let Some((subp_name, varname)) = fallback {
        let default_options = args.kw_string_list("default_options")?;
        if let Some(dep) = dependency_fallback(
            interp,
            &lookup,
            &id,
            &subp_name,
            varname.as_deref(),
            default_options,
            args,
        )? {
            return Ok(dep);
        }
    }

    not_found_result(&lookup, args)
}

fn not_found_result(lookup: &Lookup, args: &Args) -> IntpResult<Value> {
    if lookup.required {
        let mut message = format!("dependency \"{}\" not found", lookup.name);
        if let Some(extra) = &lookup.not_found_message {
            message.push_str(": ");
            message.push_str(extra);
        }
        return Err(IntpError::dependency(message).at(&args.location));
    }
    if let Some(extra) = &lookup.not_found_message {
        logger::message(extra);
    }
    Ok(lookup.not_found())
}

fn version_ok(dep: &Dependency, constraints: &[String]) -> bool {
    constraints.is_empty() || version_compare_many(dep.version_or_undefined(), constraints).is_ok()
}

fn finish_with_version_check(
    lookup: &Lookup,
    dep: Rc<Dependency>,
    args: &Args,
    origin: &str,
) -> IntpResult<Value> {
    if !dep.found() {
        // A cached or overridden not-found result short-circuits the search
        // the same way a found one does.
        return not_found_result(lookup, args);
    }
    if !version_ok(&dep, &lookup.constraints) {
        if lookup.required {
            return Err(IntpError::dependency(format!(
                "version {} of {origin} dependency \"{}\" does not satisfy [{}]",
                dep.version_or_undefined(),
                lookup.name,
                lookup.constraints.join(", ")
            ))
            .at(&args.location));
        }
        return Ok(lookup.not_found());
    }
    Ok(lookup.wrap(dep))
}

/// Found dependencies go into the cache and are auto-registered as overrides
/// for their identifier, which is what makes later lookups stable.
fn remember(interp: &mut Interpreter, id: &DependencyId, dep: Rc<Dependency>, args: &Args) {
    let mut build = interp.build.borrow_mut();
    build.store_dependency(id.clone(), dep.clone());
    let _ = build.add_dependency_override(
        id.clone(),
        DependencyOverride {
            dep,
            explicit: false,
            origin: args.location.to_string(),
        },
    );
}

#[allow(clippy::too_many_arguments)]
fn dependency_fallback(
    interp: &mut Interpreter,
    lookup: &Lookup,
    id: &DependencyId,
    subp_name: &str,
    varname: Option<&str>,
    default_options: Vec<String>,
    args: &Args,
) -> IntpResult<Option<Value>> {
    logger::message(&format!(
        "looking for a fallback subproject {subp_name} for the dependency {}",
        lookup.name
    ));

    // An already-disabled subproject is never re-instantiated on behalf of a
    // soft lookup.
    {
        let shared = interp.shared.borrow();
        if let Some(SubprojectRecord::Disabled { reason }) = shared.subprojects.get(subp_name) {
            if lookup.required {
                return Err(IntpError::dependency(format!(
                    "fallback subproject \"{subp_name}\" is disabled: {reason}"
                ))
                .at(&args.location));
            }
            return Ok(None);
        }
    }

    let sub_value = project::do_subproject(
        interp,
        subp_name,
        lookup.required,
        &[],
        default_options,
        args,
    )?;
    let found = {
        let shared = interp.shared.borrow();
        shared
            .subprojects
            .get(subp_name)
            .map(SubprojectRecord::found)
            .unwrap_or(false)
    };
    drop(sub_value);
    if !found {
        return Ok(None);
    }

    // The subproject may have registered an override for this identifier
    // while it ran; that is the preferred channel.
    let override_dep = interp
        .build
        .borrow()
        .dependency_override(id)
        .map(|entry| entry.dep.clone());

    let variable_dep: Option<Rc<Dependency>> = match varname {
        None => None,
        Some(varname) => {
            let shared = interp.shared.borrow();
            let Some(SubprojectRecord::Resolved { variables, .. }) =
                shared.subprojects.get(subp_name)
            else {
                return Ok(None);
            };
            match variables.get(varname) {
                Some(Value::Object(obj)) => {
                    downcast::<DependencyObject>(obj).map(|dep_obj| dep_obj.dep.clone())
                }
                Some(_) | None => None,
            }
        }
    };

    let dep = match (override_dep, variable_dep) {
        (Some(overridden), Some(variable)) => {
            if !Rc::ptr_eq(&overridden, &variable) {
                logger::warning(
                    &interp.subproject,
                    Some(&args.location),
                    &format!(
                        "subproject \"{subp_name}\" registered an override for \"{}\" that \
                         differs from variable \"{}\"; using the override",
                        lookup.name,
                        varname.unwrap_or_default()
                    ),
                );
            }
            overridden
        }
        (Some(overridden), None) => overridden,
        (None, Some(variable)) => variable,
        (None, None) => {
            if varname.is_none() {
                // Nothing registered and no variable requested: the
                // subproject does not provide this dependency.
                if lookup.required {
                    return Err(IntpError::dependency(format!(
                        "fallback subproject \"{subp_name}\" did not override dependency \"{}\"",
                        lookup.name
                    ))
                    .at(&args.location));
                }
                return Ok(None);
            }
            if lookup.required {
                return Err(IntpError::dependency(format!(
                    "fallback variable \"{}\" in subproject \"{subp_name}\" is not a dependency",
                    varname.unwrap_or_default()
                ))
                .at(&args.location));
            }
            return Ok(None);
        }
    };

    if !version_ok(&dep, &lookup.constraints) {
        if lookup.required {
            return Err(IntpError::dependency(format!(
                "fallback dependency \"{}\" from subproject \"{subp_name}\" is version {} \
                 but [{}] required",
                lookup.name,
                dep.version_or_undefined(),
                lookup.constraints.join(", ")
            ))
            .at(&args.location));
        }
        return Ok(None);
    }

    logger::message(&format!(
        "dependency {} from subproject {subp_name} found: YES {}",
        lookup.name,
        dep.version_or_undefined()
    ));
    remember(interp, id, dep.clone(), args);
    Ok(Some(lookup.wrap(dep)))
}
