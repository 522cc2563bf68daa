//! Process-wide table of free remote functions

use super::FunctionTrampoline;
use crate::error::{PLearnError, PResult, ResultExt};
use crate::stream::PStream;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

type FunctionTable = FxHashMap<(String, usize), Arc<dyn FunctionTrampoline>>;

static FUNCTIONS: Lazy<RwLock<FunctionTable>> = Lazy::new(|| RwLock::new(FunctionTable::default()));

/// Register a free function under `name`
///
/// Returns `false`, leaving the table unchanged, when `(name, arity)` is
/// already registered.
pub fn register_function(name: &str, function: Arc<dyn FunctionTrampoline>) -> bool {
    let key = (name.to_string(), function.arity());
    let mut table = FUNCTIONS.write();
    if table.contains_key(&key) {
        log::debug!("remote function {}/{} already registered", key.0, key.1);
        return false;
    }
    log::debug!("registering remote function {}/{}", key.0, key.1);
    table.insert(key, function);
    true
}

/// Remove a free function; returns whether it was registered
pub fn unregister_function(name: &str, arity: usize) -> bool {
    FUNCTIONS.write().remove(&(name.to_string(), arity)).is_some()
}

/// Call `name` with `nargs` arguments read from `io`, writing the reply
pub fn call_function(name: &str, nargs: usize, io: &mut PStream) -> PResult<()> {
    let (function, available) = {
        let table = FUNCTIONS.read();
        let function = table.get(&(name.to_string(), nargs)).cloned();
        let mut available: Vec<usize> = table
            .keys()
            .filter(|(n, _)| n == name)
            .map(|(_, arity)| *arity)
            .collect();
        available.sort_unstable();
        (function, available)
    };
    match function {
        Some(function) => {
            log::trace!("calling remote function {}/{}", name, nargs);
            function
                .call(io)
                .with_context(|| format!("calling function '{}'", name))
        }
        None if available.is_empty() => Err(PLearnError::UnknownMethod {
            class: "<functions>".to_string(),
            name: name.to_string(),
            arity: nargs,
        }),
        None => Err(PLearnError::ArityMismatch {
            class: "<functions>".to_string(),
            name: name.to_string(),
            arity: nargs,
            available,
        }),
    }
}

/// Help text of every overload of `name`
pub fn function_help_text(name: &str) -> String {
    let table = FUNCTIONS.read();
    let mut overloads: Vec<(&usize, &Arc<dyn FunctionTrampoline>)> = table
        .iter()
        .filter(|((n, _), _)| n == name)
        .map(|((_, arity), f)| (arity, f))
        .collect();
    if overloads.is_empty() {
        return format!("** No remote function named '{}' **\n", name);
    }
    overloads.sort_by_key(|(arity, _)| **arity);
    overloads
        .iter()
        .map(|(_, f)| f.help_text(name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sorted names of the registered functions
pub fn function_names() -> Vec<String> {
    let mut names: Vec<String> = FUNCTIONS.read().keys().map(|(n, _)| n.clone()).collect();
    names.sort();
    names.dedup();
    names
}
