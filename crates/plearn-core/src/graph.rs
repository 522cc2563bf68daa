//! Pointer-graph serialization of object references
//!
//! ```text
//! *0                      null
//! *3->Pair(first = 1)     definition, registered as id 3 before its body
//! *3                      backreference to id 3
//! *5;                     dummy forward reference, as a top-level
//!                         statement only: yields null, never
//!                         dereferenceable afterwards
//! Pair(first = 1)         anonymous definition
//! `other.plearn`          object loaded from another file
//! ```
//!
//! Inside a definition `;` only separates options, so an undefined `*5`
//! there is always a dangling reference.
//!
//! Ids are per stream. Writing in [`PointerMode::Shared`] emits each object
//! once and backreferences afterwards; [`PointerMode::Inline`] nests plain
//! definitions and rejects cycles.

use crate::error::{PLearnError, PResult, ResultExt};
use crate::factory;
use crate::object::{read_body, ObjRef, ObjectExt};
use crate::option::OptionFlags;
use crate::persist::Persist;
use crate::stream::{CopySlot, PStream, PointerMode};
use rustc_hash::FxHashSet;
use std::path::PathBuf;

// ============================================================================
// Reading
// ============================================================================

fn read_id(io: &mut PStream) -> PResult<u32> {
    let start = io.position();
    let mut digits = String::new();
    while let Some(b) = io.peek() {
        if !b.is_ascii_digit() {
            break;
        }
        digits.push(b as char);
        io.get()?;
    }
    digits
        .parse::<u32>()
        .map_err(|_| PLearnError::syntax(start, "Expected an object id after '*'"))
}

/// Read an object reference; `Ok(None)` is the null reference
pub fn read_object(io: &mut PStream) -> PResult<Option<ObjRef>> {
    io.skip_blanks_and_comments();
    match io.peek() {
        Some(b'*') => {
            io.get()?;
            let id = read_id(io)?;
            if id == 0 {
                return Ok(None);
            }
            io.skip_blanks();
            if io.peek() == Some(b'-') && io.peek_at(1) == Some(b'>') {
                io.get()?;
                io.get()?;
                return read_definition(io, Some(id)).map(Some);
            }
            let slot = io.copy_in(id).cloned();
            match slot {
                Some(CopySlot::Object(obj)) => Ok(Some(obj)),
                Some(CopySlot::Dummy) if io.peek() == Some(b';') && io.at_top_level() => Ok(None),
                Some(CopySlot::Dummy) => Err(PLearnError::DummyReference(id)),
                None if io.peek() == Some(b';') && io.at_top_level() => {
                    log::warn!("*{}; is a dummy forward reference, read as null", id);
                    io.register_dummy(id);
                    Ok(None)
                }
                None => Err(PLearnError::DanglingReference(id)),
            }
        }
        Some(b) if b == b'`' || b.is_ascii_alphabetic() || b == b'_' => read_definition(io, None).map(Some),
        Some(b) => Err(io.error(format!("Expected an object but found '{}'", b as char))),
        None => Err(io.error("Expected an object but reached end of stream")),
    }
}

/// Read a definition `ClassName(...)` or `` `file` ``, registering it
/// under `id` before its body is read
fn read_definition(io: &mut PStream, id: Option<u32>) -> PResult<ObjRef> {
    io.enter()?;
    let result = read_definition_inner(io, id);
    io.leave();
    result
}

fn read_definition_inner(io: &mut PStream, id: Option<u32>) -> PResult<ObjRef> {
    io.skip_blanks_and_comments();
    if io.peek() == Some(b'`') {
        io.get()?;
        let obj = read_cross_file(io)?;
        if let Some(id) = id {
            io.register_copy(id, obj.clone());
        }
        return Ok(obj);
    }

    let class_name = io.read_word()?;
    let obj = factory::new_object(&class_name)?;
    if let Some(id) = id {
        io.register_copy(id, obj.clone());
    }
    {
        let mut guard = obj.borrow_mut()?;
        read_body(&mut *guard, io).with_context(|| format!("reading object of class {}", class_name))?;
    }
    adopt_children(&obj)?;
    obj.borrow_mut()?
        .build()
        .with_context(|| format!("building object of class {}", class_name))?;
    Ok(obj)
}

fn read_cross_file(io: &mut PStream) -> PResult<ObjRef> {
    let raw = io.read_until(b'`')?;
    let mut path = PathBuf::from(raw.trim());
    if path.is_relative() {
        if let Some(dir) = io.base_dir() {
            path = dir.join(path);
        }
    }
    let canonical = std::fs::canonicalize(&path)
        .map_err(|e| PLearnError::from(e).context(format!("opening {}", path.display())))?;
    if io.is_open_file(&canonical) {
        return Err(PLearnError::FileCycle(path.display().to_string()));
    }
    log::debug!("following cross-file reference to {}", path.display());
    crate::io::load_referenced(&canonical, io)
}

/// Skip the value of an option that is not read
///
/// Object definitions inside the value are still read and discarded, so
/// their ids stay registered for later backreferences. Definitions of
/// classes that cannot be instantiated are skipped as plain text.
pub(crate) fn skip_unknown_value(io: &mut PStream) -> PResult<()> {
    io.skip_blanks_and_comments();
    let start = io.position();
    let mut depth = 0usize;
    loop {
        io.skip_blanks_and_comments();
        match io.peek() {
            None => break,
            Some(b'(' | b'[' | b'{') => {
                depth += 1;
                io.get()?;
            }
            Some(b')' | b']' | b'}') => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                io.get()?;
            }
            Some(b';' | b',') if depth == 0 => break,
            Some(_) if starts_definition(io) => {
                read_object(io)?;
            }
            Some(_) => io.skip_atom()?,
        }
    }
    if depth != 0 {
        return Err(PLearnError::syntax(start, "Unbalanced brackets in skipped value"));
    }
    Ok(())
}

/// True when the cursor is on `*id->` followed by a readable definition, or
/// on `ClassName(` for an instantiable class
fn starts_definition(io: &PStream) -> bool {
    match io.peek() {
        Some(b'*') => {
            let mut offset = 1;
            while io.peek_at(offset).is_some_and(|b| b.is_ascii_digit()) {
                offset += 1;
            }
            if offset == 1 {
                return false;
            }
            offset = io.skip_blanks_at(offset);
            if io.peek_at(offset) != Some(b'-') || io.peek_at(offset + 1) != Some(b'>') {
                return false;
            }
            offset = io.skip_blanks_at(offset + 2);
            io.peek_at(offset) == Some(b'`') || starts_class_at(io, offset)
        }
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => starts_class_at(io, 0),
        _ => false,
    }
}

fn starts_class_at(io: &PStream, offset: usize) -> bool {
    let Some((word, end)) = io.peek_word_at(offset) else {
        return false;
    };
    io.peek_at(io.skip_blanks_at(end)) == Some(b'(') && matches!(factory::is_abstract(&word), Ok(false))
}

/// Give every child held through a parentable option a weak link back to
/// `obj`
///
/// Children still being read (ancestors of `obj` in the stream) are
/// borrowed and left alone.
fn adopt_children(obj: &ObjRef) -> PResult<()> {
    let children = {
        let guard = obj.borrow()?;
        let mut children = Vec::new();
        for option in guard.option_list().iter() {
            if !option.flags().contains(OptionFlags::NONPARENTABLE) {
                children.extend(option.children(&*guard)?);
            }
        }
        children
    };
    let parent = obj.downgrade();
    for child in children {
        match child.borrow_mut() {
            Ok(mut child) => child.set_parent(&parent),
            Err(_) => log::trace!("{} is being read, not adopting it", child.class_name()),
        }
    }
    Ok(())
}

// ============================================================================
// Writing
// ============================================================================

/// Write an object reference according to the stream's pointer mode
pub fn write_object(io: &mut PStream, obj: &ObjRef) -> PResult<()> {
    let addr = obj.addr();
    match io.pointer_mode() {
        PointerMode::Shared => {
            if let Some(id) = io.assigned_id(addr) {
                io.write_str(&format!("*{}", id));
                return Ok(());
            }
            let id = io.assign_id(addr);
            io.write_str(&format!("*{}->", id));
            let guard = obj.borrow()?;
            guard.newwrite(io)
        }
        PointerMode::Inline => {
            if !io.begin_inline(addr) {
                return Err(PLearnError::Cycle(obj.class_name().to_string()));
            }
            let result = obj.borrow().and_then(|guard| guard.newwrite(io));
            io.end_inline(addr);
            result
        }
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// Every object reachable from `root` through traversable options,
/// `root` first, each object once
pub fn collect_objects(root: &ObjRef) -> PResult<Vec<ObjRef>> {
    let mut seen = FxHashSet::default();
    let mut order = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(obj) = stack.pop() {
        if !seen.insert(obj.addr()) {
            continue;
        }
        {
            let guard = obj.borrow()?;
            let mut children = Vec::new();
            for option in guard.option_list().iter() {
                if !option.flags().contains(OptionFlags::NONTRAVERSABLE) {
                    children.extend(option.children(&*guard)?);
                }
            }
            stack.extend(children.into_iter().rev());
        }
        order.push(obj);
    }
    Ok(order)
}

// ============================================================================
// Persist for object handles
// ============================================================================

impl Persist for Option<ObjRef> {
    fn type_name() -> String {
        "PP<Object>".to_string()
    }

    fn read_from(io: &mut PStream) -> PResult<Self> {
        read_object(io)
    }

    fn write_to(&self, io: &mut PStream) -> PResult<()> {
        match self {
            Some(obj) => write_object(io, obj),
            None => {
                io.write_str("*0");
                Ok(())
            }
        }
    }
}

impl Persist for ObjRef {
    fn type_name() -> String {
        "PP<Object>".to_string()
    }

    fn read_from(io: &mut PStream) -> PResult<Self> {
        read_object(io)?.ok_or_else(|| PLearnError::NullObject("object reference".to_string()))
    }

    fn write_to(&self, io: &mut PStream) -> PResult<()> {
        write_object(io, self)
    }
}
