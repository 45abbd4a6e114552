use std::path::{Path, PathBuf};

use mortar_dsl::diagnostics::Location;

use crate::errors::{IntpError, IntpResult};
use crate::value::Value;

/// `'@0@ and @1@'.format([a, b])`: numeric placeholders are replaced by the
/// stringified item at that index. A missing index fails; extra items are
/// ignored.
pub fn format_placeholders(
    template: &str,
    items: &[Value],
    location: &Location,
) -> IntpResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('@') {
        let (head, tail) = rest.split_at(start);
        out.push_str(head);
        let tail = &tail[1..];

        let Some(end) = tail.find('@') else {
            out.push('@');
            rest = tail;
            continue;
        };

        let token = &tail[..end];
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            let index: usize = token.parse().map_err(|_| {
                IntpError::invalid_arguments(format!("placeholder @{token}@ is out of range"))
                    .at(location)
            })?;
            let item = items.get(index).ok_or_else(|| {
                IntpError::invalid_arguments(format!(
                    "format placeholder @{index}@ has no matching argument (got {})",
                    items.len()
                ))
                .at(location)
            })?;
            out.push_str(&item.stringify());
            rest = &tail[end + 1..];
        } else {
            out.push('@');
            rest = tail;
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Scans `@IDENT@` tokens and replaces those the lookup resolves. Unresolved
/// identifiers are collected and left in place for the caller to warn about.
pub fn substitute_vars(
    template: &str,
    mut lookup: impl FnMut(&str) -> Option<String>,
) -> (String, Vec<String>) {
    let mut out = String::with_capacity(template.len());
    let mut missing = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find('@') {
        let (head, tail) = rest.split_at(start);
        out.push_str(head);
        let tail = &tail[1..];

        let Some(end) = tail.find('@') else {
            out.push('@');
            rest = tail;
            continue;
        };

        let token = &tail[..end];
        let is_identifier = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !is_identifier {
            out.push('@');
            rest = tail;
            continue;
        }

        match lookup(token) {
            Some(value) => {
                out.push_str(&value);
                rest = &tail[end + 1..];
            }
            None => {
                missing.push(token.to_owned());
                out.push('@');
                out.push_str(token);
                out.push('@');
                rest = &tail[end + 1..];
            }
        }
    }

    out.push_str(rest);
    (out, missing)
}

/// OS-aware path join: an absolute component resets everything accumulated
/// before it.
pub fn join_paths(parts: &[String]) -> String {
    let mut path = PathBuf::new();
    for part in parts {
        let component = Path::new(part);
        if component.is_absolute() {
            path = component.to_path_buf();
        } else {
            path.push(component);
        }
    }
    path.to_string_lossy().into_owned()
}
