//! Loading and saving objects

use crate::error::{PLearnError, PResult, ResultExt};
use crate::graph::{read_object, write_object};
use crate::object::ObjRef;
use crate::preprocess::MacroProcessor;
use crate::stream::{PStream, StreamMode};
use std::collections::BTreeMap;
use std::path::Path;

fn read_root(io: &mut PStream, source: &str) -> PResult<ObjRef> {
    let obj = read_object(io)?
        .ok_or_else(|| PLearnError::NullObject(format!("root object of {}", source)))?;
    io.skip_separators();
    if !io.at_eof() {
        log::warn!(
            "ignoring {} trailing bytes after the object in {}",
            io.remaining().len(),
            source
        );
    }
    Ok(obj)
}

/// Load and build the object stored in `path`
pub fn load_object(path: impl AsRef<Path>) -> PResult<ObjRef> {
    let path = path.as_ref();
    let mut io = PStream::open(path)?;
    let source = path.display().to_string();
    let obj = read_root(&mut io, &source).with_context(|| format!("loading {}", source))?;
    log::debug!("loaded {} from {}", obj.class_name(), source);
    Ok(obj)
}

/// Load the target of a cross-file reference read from `parent`
pub(crate) fn load_referenced(path: &Path, parent: &PStream) -> PResult<ObjRef> {
    let mut io = PStream::open(path)?.nested_in(parent);
    let source = path.display().to_string();
    read_root(&mut io, &source).with_context(|| format!("loading {}", source))
}

/// Load an object from `path` after macro substitution
///
/// `vars` seeds the variables visible to `${name}`.
pub fn macro_load_object(path: impl AsRef<Path>, vars: &BTreeMap<String, String>) -> PResult<ObjRef> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let text = MacroProcessor::new(vars.clone())?
        .process_file(path)
        .with_context(|| format!("preprocessing {}", source))?;
    let mut io = PStream::from_text(&text);
    if let Some(dir) = path.parent() {
        io.set_base_dir(dir);
    }
    io.push_open_file(path);
    read_root(&mut io, &source).with_context(|| format!("loading {}", source))
}

/// Read and build an object from text
pub fn load_object_from_str(text: &str) -> PResult<ObjRef> {
    let mut io = PStream::from_text(text);
    read_root(&mut io, "string")
}

/// Save `obj`, and every object it reaches, to `path`
pub fn save_object(obj: &ObjRef, path: impl AsRef<Path>, mode: StreamMode) -> PResult<()> {
    let path = path.as_ref();
    let mut io = PStream::new().with_mode(mode);
    write_object(&mut io, obj).with_context(|| format!("saving {}", path.display()))?;
    io.put(b'\n');
    std::fs::write(path, io.output())
        .map_err(|e| PLearnError::from(e).context(format!("saving {}", path.display())))?;
    log::debug!("saved {} to {} ({})", obj.class_name(), path.display(), mode);
    Ok(())
}

/// Serialize `obj` as text
pub fn write_object_to_string(obj: &ObjRef) -> PResult<String> {
    let mut io = PStream::new().with_mode(StreamMode::PlearnAscii);
    write_object(&mut io, obj)?;
    io.output_string()
}
