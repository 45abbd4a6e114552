use std::path::Path;

use mortar_dsl::ast::{ArithmeticOp, Expr, Stmt};
use mortar_dsl::diagnostics::Location;

use mortar_kernel::options::{
    FeatureState, OptionKey, OptionKind, OptionStore, OptionValue, UserOption,
};

use crate::args::Args;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::{Interpreter, SourceLoader};
use crate::logger;
use crate::value::Value;

/// The options file is a heavily restricted dialect: nothing but `option()`
/// calls with literal arguments. This walks its AST without touching the
/// real evaluator so no build state can leak into option definitions.
pub fn process_options_file(
    interp: &mut Interpreter,
    relative: &Path,
    location: &Location,
) -> IntpResult<()> {
    let absolute = interp.env.source_root.join(relative);
    let ast = interp
        .ports
        .loader
        .load_options_file(&absolute)
        .map_err(|e| {
            IntpError::runtime(format!("could not read {}: {e}", relative.display())).at(location)
        })?;
    let Some(ast) = ast else {
        return Ok(());
    };

    interp.build.borrow_mut().add_build_def_file(absolute);

    for stmt in &ast.statements {
        let Stmt::Expression(expr_stmt) = stmt else {
            return Err(IntpError::invalid_code(
                "option file may only contain option definitions",
            )
            .at(stmt.location()));
        };
        let Expr::FunctionCall(call) = &expr_stmt.expression else {
            return Err(IntpError::invalid_code(
                "option file may only contain option definitions",
            )
            .at(expr_stmt.expression.location()));
        };
        if call.name != "option" {
            return Err(IntpError::invalid_code(
                "only calls to option() are allowed in option files",
            )
            .at(&call.location));
        }

        let mut positional = Vec::new();
        for expr in &call.args.positional {
            positional.push(reduce_literal(expr)?);
        }
        let mut kwargs = indexmap::IndexMap::new();
        for pair in &call.args.keywords {
            let Expr::Id(id) = &pair.name else {
                return Err(
                    IntpError::invalid_arguments("keyword argument name is not an identifier")
                        .at(&pair.location),
                );
            };
            kwargs.insert(id.name.clone(), reduce_literal(&pair.value)?);
        }
        let args = Args {
            positional,
            kwargs,
            location: call.location.clone(),
        };
        declare_option(interp, &args)?;
    }

    // Defaults recorded before this scope existed can be applied now.
    let deferred: Vec<(OptionKey, String)> = interp
        .deferred_default_options
        .iter()
        .filter(|(key, _)| key.subproject == interp.subproject)
        .cloned()
        .collect();
    if !deferred.is_empty() {
        let env = interp.env.clone();
        let mut options = env.options.borrow_mut();
        for (key, value) in &deferred {
            if options.get(key).is_some() {
                options
                    .set_from_string(key, value)
                    .map_err(|e| IntpError::from(e).at(location))?;
            }
        }
        interp
            .deferred_default_options
            .retain(|(key, _)| key.subproject != interp.subproject);
    }

    Ok(())
}

/// Literal reduction: strings, numbers, booleans, arrays and dicts of the
/// same, unary minus on numbers, `not` on booleans, and string concatenation.
fn reduce_literal(expr: &Expr) -> IntpResult<Value> {
    match expr {
        Expr::Str(node) => Ok(Value::Str(node.value.clone())),
        Expr::Number(node) => Ok(Value::Int(node.value)),
        Expr::Boolean(node) => Ok(Value::Bool(node.value)),
        Expr::Array(node) => {
            let mut items = Vec::new();
            for item in &node.args.positional {
                items.push(reduce_literal(item)?);
            }
            Ok(Value::List(items))
        }
        Expr::Dict(node) => {
            let mut map = indexmap::IndexMap::new();
            for pair in &node.args.keywords {
                let Expr::Str(key) = &pair.name else {
                    return Err(IntpError::invalid_arguments(
                        "dictionary keys must be string literals",
                    )
                    .at(&pair.location));
                };
                map.insert(key.value.clone(), reduce_literal(&pair.value)?);
            }
            Ok(Value::Dict(map))
        }
        Expr::UMinus(node) => {
            let inner = reduce_literal(&node.expression)?;
            match inner {
                Value::Int(i) => Ok(Value::Int(-i)),
                _ => Err(
                    IntpError::invalid_arguments("token after \"-\" is not a number")
                        .at(&node.location),
                ),
            }
        }
        Expr::Not(node) => {
            let inner = reduce_literal(&node.expression)?;
            match inner {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                _ => Err(
                    IntpError::invalid_arguments("token after \"not\" is not a boolean")
                        .at(&node.location),
                ),
            }
        }
        Expr::Arithmetic(node) if node.op == ArithmeticOp::Add => {
            let left = reduce_literal(&node.left)?;
            let right = reduce_literal(&node.right)?;
            match (left, right) {
                (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
                _ => Err(IntpError::invalid_arguments(
                    "only string concatenation with \"+\" is allowed in option files",
                )
                .at(&node.location)),
            }
        }
        other => Err(IntpError::invalid_arguments(
            "option file arguments may only be literals or arrays of literals",
        )
        .at(other.location())),
    }
}

fn declare_option(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    args.check_pos_count("option", 1, Some(1))?;
    let name = args.pos_str(0, "option")?.to_owned();
    if !OptionKey::is_valid_name(&name) {
        return Err(IntpError::invalid_arguments(format!(
            "option name \"{name}\" may only contain letters, numbers, dashes or underscores"
        ))
        .at(&args.location));
    }
    if OptionStore::is_builtin(&name) {
        return Err(
            IntpError::invalid_arguments(format!("option name \"{name}\" is reserved"))
                .at(&args.location),
        );
    }

    let kind_name = args.kw_str("type")?.ok_or_else(|| {
        IntpError::invalid_arguments("option() requires the \"type\" keyword").at(&args.location)
    })?;
    let kind = OptionKind::parse(&kind_name).ok_or_else(|| {
        IntpError::invalid_arguments(format!("unknown option type \"{kind_name}\""))
            .at(&args.location)
    })?;

    let description = args.kw_str_or("description", &name)?;
    let yielding = args.kw_bool("yield", false)?;
    let deprecated = args.kw_bool("deprecated", false)?;
    let choices = args.kw_string_list("choices")?;

    let default = match kind {
        OptionKind::String => OptionValue::Str(args.kw_str_or("value", "")?),
        OptionKind::Boolean => OptionValue::Bool(args.kw_bool("value", true)?),
        OptionKind::Combo => {
            if choices.is_empty() {
                return Err(IntpError::invalid_arguments(
                    "combo option missing \"choices\" keyword",
                )
                .at(&args.location));
            }
            OptionValue::Str(args.kw_str_or("value", &choices[0])?)
        }
        OptionKind::Integer => {
            let value = args.kw("value").and_then(Value::as_int).ok_or_else(|| {
                IntpError::invalid_arguments("integer option must contain a value argument")
                    .at(&args.location)
            })?;
            OptionValue::Int(value)
        }
        OptionKind::Array => {
            let value = match args.kw("value") {
                None => choices.clone(),
                Some(_) => args.kw_string_list("value")?,
            };
            OptionValue::StrList(value)
        }
        OptionKind::Feature => {
            let raw = args.kw_str_or("value", "auto")?;
            OptionValue::Feature(FeatureState::parse(&raw).ok_or_else(|| {
                IntpError::invalid_arguments(format!(
                    "feature option value must be enabled, disabled or auto, got \"{raw}\""
                ))
                .at(&args.location)
            })?)
        }
    };

    let mut option = UserOption::new(kind, description, default)
        .with_choices(choices)
        .yielding(yielding);
    option.deprecated = deprecated;
    if kind == OptionKind::Integer {
        option = option.with_range(
            args.kw("min").and_then(Value::as_int),
            args.kw("max").and_then(Value::as_int),
        );
    }

    let key = if interp.subproject.is_empty() {
        OptionKey::top_level(&name)
    } else {
        OptionKey::scoped(interp.subproject.clone(), &name)
    };
    let env = interp.env.clone();
    let mut options = env.options.borrow_mut();
    if options.get(&key).is_some() {
        logger::deprecation(
            &interp.subproject,
            Some(&args.location),
            &format!("option \"{name}\" already exists"),
        );
    }
    options.declare_or_update(key, option);
    Ok(Value::Null)
}
