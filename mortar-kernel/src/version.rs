use std::cmp::Ordering;

/// Placeholder version reported by entities whose real version could not be
/// determined. It never satisfies any constraint, including `== undefined`.
pub const UNDEFINED_VERSION: &str = "undefined";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    op: Op,
    reference: String,
    raw: String,
}

impl Constraint {
    /// Parses one constraint string. A bare version means equality.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let (op, rest) = if let Some(rest) = trimmed.strip_prefix(">=") {
            (Op::GtEq, rest)
        } else if let Some(rest) = trimmed.strip_prefix("<=") {
            (Op::LtEq, rest)
        } else if let Some(rest) = trimmed.strip_prefix("!=") {
            (Op::NotEq, rest)
        } else if let Some(rest) = trimmed.strip_prefix("==") {
            (Op::Eq, rest)
        } else if let Some(rest) = trimmed.strip_prefix('=') {
            (Op::Eq, rest)
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            (Op::Gt, rest)
        } else if let Some(rest) = trimmed.strip_prefix('<') {
            (Op::Lt, rest)
        } else {
            (Op::Eq, trimmed)
        };

        Self {
            op,
            reference: rest.trim().to_owned(),
            raw: trimmed.to_owned(),
        }
    }

    pub fn matches(&self, version: &str) -> bool {
        if version == UNDEFINED_VERSION {
            return false;
        }

        let ordering = compare_versions(version, &self.reference);
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::NotEq => ordering != Ordering::Equal,
            Op::Lt => ordering == Ordering::Less,
            Op::LtEq => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            Op::GtEq => ordering != Ordering::Less,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Number(u64),
    Text(&'a str),
}

fn chunks(version: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut rest = version;
    while !rest.is_empty() {
        let numeric = rest
            .chars()
            .next()
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false);
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != numeric || *c == '.')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        if end == 0 {
            // Separator character, skip it.
            let mut iter = rest.char_indices();
            iter.next();
            rest = iter.next().map(|(i, _)| &rest[i..]).unwrap_or("");
            continue;
        }

        let (chunk, remainder) = rest.split_at(end);
        if numeric {
            out.push(Chunk::Number(chunk.parse().unwrap_or(u64::MAX)));
        } else {
            out.push(Chunk::Text(chunk));
        }
        rest = remainder;
    }
    out
}

/// Component-wise comparison: numeric chunks compare numerically, text
/// chunks lexicographically, and a numeric chunk sorts above a text chunk
/// (`1.2.3 > 1.2.rc1`). Missing trailing chunks compare as empty.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let ordering = match (left.get(i), right.get(i)) {
            (Some(Chunk::Number(l)), Some(Chunk::Number(r))) => l.cmp(r),
            (Some(Chunk::Text(l)), Some(Chunk::Text(r))) => l.cmp(r),
            (Some(Chunk::Number(_)), Some(Chunk::Text(_))) => Ordering::Greater,
            (Some(Chunk::Text(_)), Some(Chunk::Number(_))) => Ordering::Less,
            (Some(Chunk::Number(l)), None) => l.cmp(&0),
            (None, Some(Chunk::Number(r))) => 0.cmp(r),
            (Some(Chunk::Text(_)), None) => Ordering::Greater,
            (None, Some(Chunk::Text(_))) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

pub fn version_compare(version: &str, constraint: &str) -> bool {
    Constraint::parse(constraint).matches(version)
}

/// Checks every constraint and returns the ones that failed, so callers can
/// report `found 1.0 but need ['>=1.2', '!=1.4']` style messages.
pub fn version_compare_many(version: &str, constraints: &[String]) -> Result<(), Vec<String>> {
    let failed: Vec<String> = constraints
        .iter()
        .filter(|c| !version_compare(version, c))
        .cloned()
        .collect();

    if failed.is_empty() { Ok(()) } else { Err(failed) }
}
