//! PStream: the stream all object reads and writes go through
//!
//! A `PStream` couples an input buffer with a read cursor and an output
//! buffer, plus the per-stream state of the pointer-graph protocol:
//!
//! - the read-side identity map (`*id` → object already constructed),
//! - the write-side map (object identity → assigned id),
//! - the encoding mode for numbers and the pointer mode for sub-objects.
//!
//! Lexing helpers live in `lexer.rs`, binary number tags in `binary.rs`.

mod binary;
mod lexer;

pub use binary::BinaryNumber;
pub(crate) use binary::{binary_payload_len, is_binary_tag};
pub(crate) use binary::{TAG_BOOL, TAG_F32, TAG_F64, TAG_I32, TAG_I64, TAG_U32, TAG_U64};

use crate::config;
use crate::error::{PLearnError, PResult};
use crate::object::ObjRef;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// Modes
// ============================================================================

/// Encoding of numbers and booleans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    /// Everything is human-readable text
    #[default]
    PlearnAscii,
    /// Numbers and booleans are tagged little-endian binary, structure stays text
    PlearnBinary,
}

impl StreamMode {
    /// Conventional name of the format
    pub fn as_str(self) -> &'static str {
        match self {
            StreamMode::PlearnAscii => "plearn_ascii",
            StreamMode::PlearnBinary => "plearn_binary",
        }
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamMode {
    type Err = PLearnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "plearn_ascii" | "ascii" => Ok(StreamMode::PlearnAscii),
            "plearn_binary" | "binary" => Ok(StreamMode::PlearnBinary),
            other => Err(PLearnError::runtime(format!(
                "Unknown stream format '{}' (expected plearn_ascii or plearn_binary)",
                other
            ))),
        }
    }
}

/// How object references are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerMode {
    /// `*id->ClassName(...)` on first occurrence, `*id` afterwards
    #[default]
    Shared,
    /// Plain nested `ClassName(...)`; shared objects are duplicated
    Inline,
}

impl FromStr for PointerMode {
    type Err = PLearnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "shared" => Ok(PointerMode::Shared),
            "inline" => Ok(PointerMode::Inline),
            other => Err(PLearnError::runtime(format!(
                "Unknown pointer mode '{}' (expected shared or inline)",
                other
            ))),
        }
    }
}

/// Entry of the read-side identity map
#[derive(Clone)]
pub(crate) enum CopySlot {
    /// A constructed object
    Object(ObjRef),
    /// Declared by `*id;` and never defined: must not be dereferenced
    Dummy,
}

// ============================================================================
// PStream
// ============================================================================

/// Text/binary stream with pointer-graph bookkeeping
pub struct PStream {
    input: Vec<u8>,
    pos: usize,
    output: Vec<u8>,
    mode: StreamMode,
    pointer_mode: PointerMode,
    remote_transmit: bool,
    warn_unknown_options: bool,
    copies_in: FxHashMap<u32, CopySlot>,
    copies_out: FxHashMap<usize, u32>,
    next_id: u32,
    inline_stack: FxHashSet<usize>,
    base_dir: Option<PathBuf>,
    open_files: Vec<PathBuf>,
    depth: usize,
    max_depth: usize,
}

impl PStream {
    /// Create a stream with empty input, seeded from the current configuration
    pub fn new() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// Create a stream reading from text
    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes().to_vec())
    }

    /// Create a stream reading from raw bytes
    pub fn from_bytes(input: Vec<u8>) -> Self {
        let config = config::current();
        Self {
            input,
            pos: 0,
            output: Vec::new(),
            mode: config.save_format,
            pointer_mode: config.pointer_mode,
            remote_transmit: false,
            warn_unknown_options: config.warn_unknown_options,
            copies_in: FxHashMap::default(),
            copies_out: FxHashMap::default(),
            next_id: 1,
            inline_stack: FxHashSet::default(),
            base_dir: None,
            open_files: Vec::new(),
            depth: 0,
            max_depth: config.max_nesting_depth,
        }
    }

    /// Open a file for reading; relative cross-file references resolve
    /// against its directory
    pub fn open(path: impl AsRef<Path>) -> PResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            PLearnError::from(e).context(format!("opening {}", path.display()))
        })?;
        let mut stream = Self::from_bytes(bytes);
        stream.base_dir = path.parent().map(Path::to_path_buf);
        stream.push_open_file(path);
        Ok(stream)
    }

    /// Continue the file chain and nesting budget of `parent`, the stream
    /// holding a cross-file reference to this one
    pub(crate) fn nested_in(mut self, parent: &PStream) -> Self {
        let mut files = parent.open_files.clone();
        files.append(&mut self.open_files);
        self.open_files = files;
        self.max_depth = parent.max_depth.saturating_sub(parent.depth);
        self
    }

    /// Set the encoding mode
    pub fn with_mode(mut self, mode: StreamMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the pointer mode
    pub fn with_pointer_mode(mut self, pointer_mode: PointerMode) -> Self {
        self.pointer_mode = pointer_mode;
        self
    }

    /// Current encoding mode
    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Change the encoding mode
    pub fn set_mode(&mut self, mode: StreamMode) {
        self.mode = mode;
    }

    /// Current pointer mode
    pub fn pointer_mode(&self) -> PointerMode {
        self.pointer_mode
    }

    /// Change the pointer mode
    pub fn set_pointer_mode(&mut self, pointer_mode: PointerMode) {
        self.pointer_mode = pointer_mode;
    }

    /// Whether objects are written with their remote-transmit option set
    pub fn is_remote_transmit(&self) -> bool {
        self.remote_transmit
    }

    /// Select the remote-transmit option set for written objects
    pub fn set_remote_transmit(&mut self, remote_transmit: bool) {
        self.remote_transmit = remote_transmit;
    }

    pub(crate) fn warn_unknown_options(&self) -> bool {
        self.warn_unknown_options
    }

    /// Directory used to resolve relative cross-file references
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Set the directory used to resolve relative cross-file references
    pub fn set_base_dir(&mut self, dir: impl Into<PathBuf>) {
        self.base_dir = Some(dir.into());
    }

    /// Record `path` as being loaded through this stream
    pub(crate) fn push_open_file(&mut self, path: &Path) {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.open_files.push(canonical);
    }

    /// True when `path` is one of the files this stream is nested in
    pub(crate) fn is_open_file(&self, path: &Path) -> bool {
        self.open_files.iter().any(|open| open == path)
    }

    /// Byte offset of the read cursor
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unread input
    pub fn remaining(&self) -> &[u8] {
        &self.input[self.pos..]
    }

    /// Append bytes to the input
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend_from_slice(bytes);
    }

    /// Bytes written so far
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Take the written bytes, leaving the output empty
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Drop output written after the first `len` bytes
    pub(crate) fn truncate_output(&mut self, len: usize) {
        self.output.truncate(len);
    }

    /// Written bytes as text
    ///
    /// Fails if binary mode produced bytes that are not UTF-8.
    pub fn output_string(&self) -> PResult<String> {
        String::from_utf8(self.output.clone())
            .map_err(|_| PLearnError::runtime("Stream output is not valid UTF-8 text"))
    }

    /// Forget every id of the pointer-graph protocol, in both directions
    pub fn clear_copies(&mut self) {
        self.copies_in.clear();
        self.copies_out.clear();
        self.next_id = 1;
    }

    // ------------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------------

    /// Write text
    pub fn write_str(&mut self, s: &str) {
        self.output.extend_from_slice(s.as_bytes());
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    /// Write one byte
    pub fn put(&mut self, byte: u8) {
        self.output.push(byte);
    }

    /// Write a double-quoted, escaped string
    pub fn write_quoted(&mut self, s: &str) {
        self.output.push(b'"');
        for ch in s.chars() {
            match ch {
                '"' => self.write_str("\\\""),
                '\\' => self.write_str("\\\\"),
                '\n' => self.write_str("\\n"),
                '\r' => self.write_str("\\r"),
                '\t' => self.write_str("\\t"),
                c => {
                    let mut buf = [0u8; 4];
                    self.write_str(c.encode_utf8(&mut buf));
                }
            }
        }
        self.output.push(b'"');
    }

    // ------------------------------------------------------------------------
    // Pointer-graph bookkeeping
    // ------------------------------------------------------------------------

    pub(crate) fn copy_in(&self, id: u32) -> Option<&CopySlot> {
        self.copies_in.get(&id)
    }

    pub(crate) fn register_copy(&mut self, id: u32, obj: ObjRef) {
        self.copies_in.insert(id, CopySlot::Object(obj));
    }

    pub(crate) fn register_dummy(&mut self, id: u32) {
        self.copies_in.insert(id, CopySlot::Dummy);
    }

    pub(crate) fn assigned_id(&self, addr: usize) -> Option<u32> {
        self.copies_out.get(&addr).copied()
    }

    pub(crate) fn assign_id(&mut self, addr: usize) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.copies_out.insert(addr, id);
        id
    }

    /// Returns false when `addr` is already being written inline
    pub(crate) fn begin_inline(&mut self, addr: usize) -> bool {
        self.inline_stack.insert(addr)
    }

    pub(crate) fn end_inline(&mut self, addr: usize) {
        self.inline_stack.remove(&addr);
    }

    /// Enter one level of object nesting
    pub(crate) fn enter(&mut self) -> PResult<()> {
        if self.depth >= self.max_depth {
            return Err(self.error(format!(
                "Objects nested deeper than {} levels",
                self.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// True outside of every object definition
    pub(crate) fn at_top_level(&self) -> bool {
        self.depth == 0
    }
}

impl Default for PStream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PStream")
            .field("pos", &self.pos)
            .field("input_len", &self.input.len())
            .field("output_len", &self.output.len())
            .field("mode", &self.mode)
            .field("pointer_mode", &self.pointer_mode)
            .field("remote_transmit", &self.remote_transmit)
            .field("copies_in", &self.copies_in.len())
            .field("copies_out", &self.copies_out.len())
            .finish()
    }
}
