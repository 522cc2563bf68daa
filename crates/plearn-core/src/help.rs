//! Help text for registered classes, their options and remote methods
//!
//! Options above the requested [`OptionLevel`] are counted but not shown.

use crate::config;
use crate::error::PResult;
use crate::factory;
use crate::option::{OptionBase, OptionLevel};
use std::fmt::Write as _;

/// Help text of one option
pub fn option_help(option: &dyn OptionBase) -> PResult<String> {
    let mut out = format!(
        "{}: {} [{}]",
        option.name(),
        option.option_type(),
        option.flag_strings()?.join(" | ")
    );
    if !option.default_value().is_empty() {
        let _ = write!(out, " = {}", option.default_value());
    }
    let _ = write!(out, " ({}, declared in {})", option.level(), option.declared_in());
    if !option.description().is_empty() {
        let _ = write!(out, "\n    {}", option.description());
    }
    Ok(out)
}

/// Help text of a class at the configured help level
pub fn class_help(name: &str) -> PResult<String> {
    class_help_at_level(name, config::current().help_level)
}

/// Help text of a class, showing options up to `level`
pub fn class_help_at_level(name: &str, level: OptionLevel) -> PResult<String> {
    let entry = factory::type_map_entry(name)?;
    let mut out = String::new();

    let _ = write!(out, "Class {}", entry.type_name);
    if !entry.parent_class.is_empty() {
        let _ = write!(out, " (derives from {})", entry.parent_class);
    }
    if entry.is_abstract() {
        out.push_str(" [abstract]");
    }
    out.push('\n');
    if !entry.one_line_descr.is_empty() {
        let _ = writeln!(out, "    {}", entry.one_line_descr);
    }
    if !entry.multi_line_help.is_empty() {
        out.push('\n');
        for line in entry.multi_line_help.lines() {
            let _ = writeln!(out, "    {}", line.trim());
        }
    }

    let options = (entry.getoptionlist_method)();
    out.push_str("\nOptions:\n");
    let mut hidden = 0;
    for option in options.iter() {
        if option.level() > level {
            hidden += 1;
            continue;
        }
        for line in option_help(option.as_ref())?.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
    if options.is_empty() {
        out.push_str("    (none)\n");
    }
    if hidden > 0 {
        let _ = writeln!(out, "    ({} options above level {} not shown)", hidden, level);
    }

    let methods = (entry.get_remote_methods)();
    out.push_str("\nRemote methods:\n");
    for method in methods.method_names() {
        let overloads = methods
            .arities(&method)
            .iter()
            .map(|arity| format!("{}/{}", method, arity))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "    {}", overloads);
    }
    Ok(out)
}

/// Help text of a remote method of a class
///
/// Without an arity every overload is described.
pub fn method_help(class: &str, method: &str, arity: Option<usize>) -> PResult<String> {
    let entry = factory::type_map_entry(class)?;
    (entry.get_remote_methods)().method_help_text(method, arity)
}

/// One line per registered class with its description
pub fn list_classes() -> String {
    let mut out = String::new();
    for name in factory::type_names() {
        let descr = factory::type_map_entry(&name)
            .map(|entry| entry.one_line_descr)
            .unwrap_or_default();
        let _ = writeln!(out, "{:<30} {}", name, descr);
    }
    out
}
