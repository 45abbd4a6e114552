use mortar_kernel::targets::{InstallData, InstallDir, InstallHeaders, InstallMan};

use crate::args::Args;
use crate::builtins::meta::file_from_string;
use crate::errors::{IntpError, IntpResult};
use crate::interpreter::Interpreter;
use crate::objects::downcast;
use crate::objects::file::FileObject;
use crate::value::Value;

/// Positional and `sources:` values coerced into validated file references.
fn collect_sources(interp: &Interpreter, args: &Args, what: &str) -> IntpResult<Vec<mortar_kernel::targets::FileRef>> {
    let mut values: Vec<Value> = args.positional.clone();
    values.extend(args.kw_list("sources"));

    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Str(name) => out.push((*file_from_string(interp, &name, args)?.file).clone()),
            Value::Object(obj) => {
                let file = downcast::<FileObject>(&obj).ok_or_else(|| {
                    IntpError::invalid_arguments(format!(
                        "{what} sources must be strings or files, got {}",
                        obj.kind()
                    ))
                    .at(&args.location)
                })?;
                out.push((*file.file).clone());
            }
            other => {
                return Err(IntpError::invalid_arguments(format!(
                    "{what} sources must be strings or files, got {}",
                    other.type_name()
                ))
                .at(&args.location));
            }
        }
    }
    Ok(out)
}

pub fn install_data(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let sources = collect_sources(interp, args, "install_data")?;
    let install_dir = args.kw_str_or("install_dir", "share")?;
    let rename = args.kw_string_list("rename")?;
    if !rename.is_empty() && rename.len() != sources.len() {
        return Err(IntpError::invalid_arguments(format!(
            "\"rename\" has {} entries for {} sources",
            rename.len(),
            sources.len()
        ))
        .at(&args.location));
    }

    interp.build.borrow_mut().data.push(InstallData {
        sources,
        install_dir,
        install_mode: args.kw_str("install_mode")?,
        rename,
        subproject: interp.subproject.clone(),
    });
    Ok(Value::Null)
}

pub fn install_headers(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let sources = collect_sources(interp, args, "install_headers")?;
    let install_subdir = args.kw_str("subdir")?;
    let custom_install_dir = args.kw_str("install_dir")?;
    if install_subdir.is_some() && custom_install_dir.is_some() {
        return Err(IntpError::invalid_arguments(
            "install_headers: \"subdir\" and \"install_dir\" are mutually exclusive",
        )
        .at(&args.location));
    }

    interp.build.borrow_mut().headers.push(InstallHeaders {
        sources,
        install_subdir,
        custom_install_dir,
        subproject: interp.subproject.clone(),
    });
    Ok(Value::Null)
}

pub fn install_man(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let sources = collect_sources(interp, args, "install_man")?;
    for source in &sources {
        let section_ok = source
            .fname
            .rsplit('.')
            .next()
            .and_then(|ext| ext.parse::<u8>().ok())
            .map(|section| (1..=9).contains(&section))
            .unwrap_or(false);
        if !section_ok {
            return Err(IntpError::invalid_arguments(format!(
                "manual page \"{}\" must end in a section number between 1 and 9",
                source.fname
            ))
            .at(&args.location));
        }
    }

    interp.build.borrow_mut().man.push(InstallMan {
        sources,
        custom_install_dir: args.kw_str("install_dir")?,
        locale: args.kw_str("locale")?,
        subproject: interp.subproject.clone(),
    });
    Ok(Value::Null)
}

pub fn install_subdir(interp: &mut Interpreter, args: &Args) -> IntpResult<Value> {
    let source_subdir = args.pos_str(0, "install_subdir")?.to_owned();
    let install_dir = args.kw_str("install_dir")?.ok_or_else(|| {
        IntpError::invalid_arguments("install_subdir requires \"install_dir\"").at(&args.location)
    })?;

    interp.build.borrow_mut().install_dirs.push(InstallDir {
        source_subdir,
        installable_subdir: None,
        install_dir,
        exclude_files: args.kw_string_list("exclude_files")?,
        exclude_directories: args.kw_string_list("exclude_directories")?,
        strip_directory: args.kw_bool("strip_directory", false)?,
        subproject: interp.subproject.clone(),
    });
    Ok(Value::Null)
}
