//! Request loop for remote method invocation
//!
//! ```text
//! !N id <object>              keep a new object under id      -> !R 0
//! !M id method nargs args...  call a method on object id      -> !R n ...
//! !F name nargs args...       call a free function            -> !R n ...
//! !D id                       forget object id                -> !R 0
//! !Z                          forget every object             -> !R 0
//! !Q                          stop
//! ```
//!
//! A failing command replies `!E "message"` and the rest of its line is
//! skipped. Replies carry options flagged `remote_transmit`.

use crate::error::{PLearnError, PResult};
use crate::graph::read_object;
use crate::object::{ObjRef, ObjectExt};
use crate::remote::call_function;
use crate::stream::{PStream, StreamMode};
use rustc_hash::FxHashMap;
use std::io::{BufRead, Write};

/// Objects held on behalf of a remote client
#[derive(Debug, Default)]
pub struct RemoteServer {
    objects: FxHashMap<u32, ObjRef>,
}

impl RemoteServer {
    /// Server holding no object
    pub fn new() -> Self {
        Self::default()
    }

    /// Object kept under `id`
    pub fn object(&self, id: u32) -> Option<&ObjRef> {
        self.objects.get(&id)
    }

    /// Number of objects held
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when no object is held
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Keep `obj` under `id`, replacing any previous object
    pub fn insert(&mut self, id: u32, obj: ObjRef) -> Option<ObjRef> {
        self.objects.insert(id, obj)
    }

    /// Handle one command, replying into `io`'s output
    ///
    /// Returns `false` on `!Q` or when the input is exhausted. Failures are
    /// reported to the client, never returned.
    pub fn handle(&mut self, io: &mut PStream) -> bool {
        let mark = io.output().len();
        match self.dispatch(io) {
            Ok(keep_going) => keep_going,
            Err(err) => {
                log::warn!("remote command failed: {}", err);
                io.truncate_output(mark);
                io.write_str("!E ");
                io.write_quoted(&err.to_string());
                io.put(b'\n');
                io.skip_rest_of_line();
                true
            }
        }
    }

    /// Handle every command in `io` until `!Q` or the end of input
    pub fn run(&mut self, io: &mut PStream) {
        io.set_remote_transmit(true);
        while self.handle(io) {}
    }

    /// Line-oriented loop: each line of `reader` holds whole commands, and
    /// the replies to a line are flushed to `writer` before the next is read
    pub fn serve(&mut self, reader: impl BufRead, mut writer: impl Write) -> PResult<()> {
        let mut io = PStream::new().with_mode(StreamMode::PlearnAscii);
        io.set_remote_transmit(true);
        for line in reader.lines() {
            let line = line?;
            io.feed(line.as_bytes());
            io.feed(b"\n");
            let mut keep_going = true;
            loop {
                io.skip_blanks();
                if io.at_eof() {
                    break;
                }
                if !self.handle(&mut io) {
                    keep_going = false;
                    break;
                }
            }
            writer.write_all(&io.take_output())?;
            writer.flush()?;
            if !keep_going {
                log::debug!("remote client asked to quit");
                return Ok(());
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, io: &mut PStream) -> PResult<bool> {
        io.skip_blanks_and_comments();
        if io.at_eof() {
            return Ok(false);
        }
        io.clear_copies();
        let bang = io.get()?;
        if bang != b'!' {
            return Err(io.error(format!("Expected a command starting with '!' but found '{}'", bang as char)));
        }
        let command = io.get()?;
        match command {
            b'N' => {
                let id = read_number::<u32>(io, "object id")?;
                let obj = read_object(io)?
                    .ok_or_else(|| PLearnError::NullObject(format!("remote object {}", id)))?;
                log::trace!("remote object {} is a {}", id, obj.class_name());
                self.objects.insert(id, obj);
                reply_empty(io);
            }
            b'M' => {
                let id = read_number::<u32>(io, "object id")?;
                let method = io.read_word()?;
                let nargs = read_number::<usize>(io, "argument count")?;
                let obj = self.lookup(id)?.clone();
                let mut guard = obj.borrow_mut()?;
                guard.call(&method, nargs, io)?;
            }
            b'F' => {
                let name = io.read_word()?;
                let nargs = read_number::<usize>(io, "argument count")?;
                call_function(&name, nargs, io)?;
            }
            b'D' => {
                let id = read_number::<u32>(io, "object id")?;
                self.objects
                    .remove(&id)
                    .ok_or_else(|| PLearnError::runtime(format!("No remote object with id {}", id)))?;
                reply_empty(io);
            }
            b'Z' => {
                log::trace!("forgetting {} remote objects", self.objects.len());
                self.objects.clear();
                reply_empty(io);
            }
            b'Q' => return Ok(false),
            other => {
                return Err(io.error(format!("Unknown remote command '!{}'", other as char)));
            }
        }
        Ok(true)
    }

    fn lookup(&self, id: u32) -> PResult<&ObjRef> {
        self.objects
            .get(&id)
            .ok_or_else(|| PLearnError::runtime(format!("No remote object with id {}", id)))
    }
}

fn read_number<T: std::str::FromStr>(io: &mut PStream, what: &str) -> PResult<T> {
    io.skip_blanks();
    let pos = io.position();
    let token = io.read_token()?;
    token
        .parse()
        .map_err(|_| PLearnError::syntax(pos, format!("Expected {} but found '{}'", what, token)))
}

fn reply_empty(io: &mut PStream) {
    io.write_str("!R 0\n");
}
