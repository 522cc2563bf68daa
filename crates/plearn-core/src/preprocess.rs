//! Macro substitution applied by `macro_load_object`
//!
//! - `${name}` is replaced by the value of `name`; undefined names fail.
//! - `$DEFINE{name}{value}` defines `name` from that point on and expands
//!   to nothing. Values cannot contain braces.
//! - `$INCLUDE{path}` is replaced by the processed content of `path`,
//!   relative to the including file.

use crate::error::{PLearnError, PResult};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MACRO_PATTERN: &str = r"\$(?:DEFINE\{([^}]*)\}\{([^}]*)\}|INCLUDE\{([^}]*)\}|\{([A-Za-z_][A-Za-z0-9_]*)\})";
const MAX_INCLUDE_DEPTH: usize = 32;

/// Macro expander with its variable table
#[derive(Debug, Clone)]
pub struct MacroProcessor {
    regex: Regex,
    vars: BTreeMap<String, String>,
    depth: usize,
}

impl MacroProcessor {
    /// Create an expander seeded with `vars`
    pub fn new(vars: BTreeMap<String, String>) -> PResult<Self> {
        let regex = Regex::new(MACRO_PATTERN)
            .map_err(|e| PLearnError::runtime(format!("Invalid macro pattern: {}", e)))?;
        Ok(Self {
            regex,
            vars,
            depth: 0,
        })
    }

    /// Variables defined so far
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Expand a file; relative includes resolve against its directory
    pub fn process_file(&mut self, path: &Path) -> PResult<String> {
        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(PLearnError::runtime(format!(
                "Includes nested deeper than {} levels at {}",
                MAX_INCLUDE_DEPTH,
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| PLearnError::from(e).context(format!("reading {}", path.display())))?;
        self.depth += 1;
        let result = self.process_str(&text, path.parent());
        self.depth -= 1;
        result
    }

    /// Expand text; relative includes resolve against `base_dir`
    pub fn process_str(&mut self, text: &str, base_dir: Option<&Path>) -> PResult<String> {
        let regex = self.regex.clone();
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in regex.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            if let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) {
                log::trace!("macro variable {} = {}", name.as_str().trim(), value.as_str());
                self.vars
                    .insert(name.as_str().trim().to_string(), value.as_str().to_string());
            } else if let Some(include) = caps.get(3) {
                let mut path = PathBuf::from(include.as_str().trim());
                if path.is_relative() {
                    if let Some(dir) = base_dir {
                        path = dir.join(path);
                    }
                }
                out.push_str(&self.process_file(&path)?);
            } else if let Some(name) = caps.get(4) {
                let value = self.vars.get(name.as_str()).ok_or_else(|| {
                    PLearnError::runtime(format!("Undefined macro variable '{}'", name.as_str()))
                })?;
                out.push_str(value);
            }
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

/// Expand `text` with `vars`
pub fn process_str(text: &str, vars: &BTreeMap<String, String>) -> PResult<String> {
    MacroProcessor::new(vars.clone())?.process_str(text, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_variable() {
        let out = process_str("Pair(first = ${n})", &vars(&[("n", "3")])).unwrap();
        assert_eq!(out, "Pair(first = 3)");
    }

    #[test]
    fn test_define_then_use() {
        let out = process_str("$DEFINE{k}{40} Pair(first = ${k}; second = ${n})", &vars(&[("n", "4")]))
            .unwrap();
        assert_eq!(out, " Pair(first = 40; second = 4)");
    }

    #[test]
    fn test_undefined_variable_fails() {
        let err = process_str("${missing}", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_text_without_macros_is_unchanged() {
        let text = "Pair(first = 1; second = 2) # $ alone";
        assert_eq!(process_str(text, &BTreeMap::new()).unwrap(), text);
    }

    #[test]
    fn test_include_relative_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("value.inc"), "${n}").unwrap();
        let main = dir.path().join("main.plearn");
        std::fs::write(&main, "Pair(first = $INCLUDE{value.inc})").unwrap();

        let mut processor = MacroProcessor::new(vars(&[("n", "12")])).unwrap();
        assert_eq!(processor.process_file(&main).unwrap(), "Pair(first = 12)");
    }

    #[test]
    fn test_recursive_include_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("loop.plearn");
        std::fs::write(&main, "$INCLUDE{loop.plearn}").unwrap();
        let mut processor = MacroProcessor::new(BTreeMap::new()).unwrap();
        assert!(processor.process_file(&main).is_err());
    }
}
