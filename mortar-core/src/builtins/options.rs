use std::rc::Rc;

use mortar_kernel::options::{OptionLookup, OptionValue};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::logger;
use crate::objects::feature::FeatureObject;
use crate::value::Value;

pub fn get_option(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let name = args.pos_str(0, "get_option")?;
    if name.contains(':') {
        return Err(IntpError::invalid_arguments(format!(
            "option name \"{name}\" must not contain a colon; \
             options of other subprojects are not reachable"
        ))
        .at(&args.location));
    }

    let lookup = interp
        .env
        .options
        .borrow()
        .lookup(&interp.subproject, name);
    let Some(lookup) = lookup else {
        return Err(
            IntpError::runtime(format!("unknown option \"{name}\"")).at(&args.location)
        );
    };

    if let OptionLookup::KindMismatch { local, parent_kind } = &lookup {
        logger::warning(
            &interp.subproject,
            Some(&args.location),
            &format!(
                "option \"{name}\" yields to a parent option of a different type \
                 ({} vs {}), using the subproject value",
                local.kind.as_str(),
                parent_kind.as_str()
            ),
        );
    }

    let option = lookup.option();
    if option.deprecated {
        logger::deprecation(
            &interp.subproject,
            Some(&args.location),
            &format!("option \"{name}\" is deprecated"),
        );
    }

    Ok(match &option.value {
        OptionValue::Str(s) => Value::Str(s.clone()),
        OptionValue::Bool(b) => Value::Bool(*b),
        OptionValue::Int(i) => Value::Int(*i),
        OptionValue::StrList(items) => {
            Value::List(items.iter().map(|s| Value::Str(s.clone())).collect())
        }
        OptionValue::Feature(state) => {
            Value::Object(Rc::new(FeatureObject::new(name, *state)))
        }
    })
}
