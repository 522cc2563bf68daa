//! Option path syntax: `name`, `name[index]`, `name.sub`, `name[index].sub`
//!
//! A path is resolved one hop at a time. The first hop is decided by the
//! first bracket or dot, whichever comes first, so `sub.weights[3]` goes
//! into `sub` and resolves `weights[3]` there.

use crate::error::{PLearnError, PResult};

/// First hop of an option path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathHop<'a> {
    /// No bracket and no dot
    Plain(&'a str),
    /// `base[index]`, optionally followed by `.rest`
    Indexed {
        base: &'a str,
        index: &'a str,
        rest: Option<&'a str>,
    },
    /// `base.rest`
    Member { base: &'a str, rest: &'a str },
}

fn malformed(name: &str, reason: &str) -> PLearnError {
    PLearnError::OptionName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Split off the first hop of `name`
pub(crate) fn split_path(name: &str) -> PResult<PathHop<'_>> {
    let open = name.find('[');
    let close = name.find(']');
    let dot = name.find('.');

    if let Some(close) = close {
        if open.map_or(true, |open| close < open) {
            return Err(malformed(name, "']' without a matching '['"));
        }
    }

    match (open, dot) {
        (Some(open), dot) if dot.map_or(true, |dot| open < dot) => {
            let close = name[open..]
                .find(']')
                .map(|offset| open + offset)
                .ok_or_else(|| malformed(name, "'[' without a matching ']'"))?;
            let base = &name[..open];
            if base.is_empty() {
                return Err(malformed(name, "missing option name before '['"));
            }
            let index = &name[open + 1..close];
            let after = &name[close + 1..];
            let rest = if after.is_empty() {
                None
            } else if let Some(rest) = after.strip_prefix('.') {
                if rest.is_empty() {
                    return Err(malformed(name, "empty segment after '.'"));
                }
                Some(rest)
            } else {
                return Err(malformed(name, "expected '.' after ']'"));
            };
            Ok(PathHop::Indexed { base, index, rest })
        }
        (_, Some(dot)) => {
            let base = &name[..dot];
            let rest = &name[dot + 1..];
            if base.is_empty() || rest.is_empty() {
                return Err(malformed(name, "empty segment around '.'"));
            }
            Ok(PathHop::Member { base, rest })
        }
        _ => Ok(PathHop::Plain(name)),
    }
}

/// True when `name` uses bracket or dot syntax
pub(crate) fn is_compound(name: &str) -> bool {
    name.contains(['[', '.'])
}
