//! Zone file sources and the byte window.
//!
//! A [`SourceFile`] owns everything the scanner needs to make progress on
//! one input: the byte window it scans, the tape it indexes into, the
//! carry state between blocks, and the record-level state that belongs to
//! a single file ($ORIGIN, the last explicit owner, class and TTL, the
//! current line). `$INCLUDE` pushes another `SourceFile`; the parser
//! keeps them as a stack.
//!
//! The window is refilled from a boxed reader so that files, in-memory
//! strings and arbitrary readers share one code path. A refill performs a
//! single read; the scanner consumes whole blocks and carries the
//! remainder, so short reads merely move the block boundaries around.

use crate::error::{out_of_memory, raise, Code, Raise};
use crate::iana::Class;
use crate::parser::name::NameBuf;
use crate::scanner::tape::Tape;
use crate::WINDOW_SIZE;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

//------------ Eof -----------------------------------------------------------

/// How much more a source can deliver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Eof {
    /// The underlying stream may have more data.
    HaveData,

    /// The stream is exhausted but the window still holds unscanned data.
    ReadAllData,

    /// The stream is exhausted and the window fully scanned.
    NoMoreData,
}

//------------ Carry ---------------------------------------------------------

/// Scanner state carried between blocks.
///
/// These bits let scanning restart at an arbitrary 64 byte boundary
/// without losing context: a backslash pending at a block edge, an open
/// quoted string or comment, a contiguous run in progress, and line feeds
/// seen inside strings that still await a structural line feed to be
/// flushed into.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Carry {
    pub is_escaped: u64,
    pub in_quoted: u64,
    pub in_comment: u64,
    pub follows_contiguous: u64,
    pub lines: u32,
}

//------------ Window --------------------------------------------------------

/// The sliding byte window over a source.
///
/// `data` always holds one byte more than `size`; the byte at `length` is
/// NUL so consumers may read one past the buffered data.
#[derive(Debug)]
pub(crate) struct Window {
    pub data: Vec<u8>,

    /// The offset scanning continues at.
    pub index: usize,

    /// The number of buffered bytes.
    pub length: usize,

    /// The capacity of the window.
    pub size: usize,
}

impl Window {
    fn with_capacity(size: usize) -> Self {
        Window {
            data: vec![0; size + 1],
            index: 0,
            length: 0,
            size,
        }
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = Vec::with_capacity(bytes.len() + 1);
        data.extend_from_slice(bytes);
        data.push(0);
        Window {
            data,
            index: 0,
            length: bytes.len(),
            size: bytes.len(),
        }
    }
}

//------------ SourceFile ----------------------------------------------------

/// One input on the include stack.
pub(crate) struct SourceFile {
    /// The name of the source for messages.
    name: String,

    /// The canonicalized path, if the source is an actual file.
    pub path: Option<PathBuf>,

    /// The stream behind the window. `None` for in-memory sources.
    handle: Option<Box<dyn Read>>,

    pub buffer: Window,
    pub end_of_file: Eof,

    /// Whether we are inside a parenthesized group.
    pub grouped: bool,

    /// Whether the next token starts a record.
    pub start_of_line: bool,

    /// Set until the first byte of the source has been seen.
    pub fresh: bool,

    pub origin: NameBuf,
    pub owner: NameBuf,
    pub last_class: Class,
    pub last_ttl: u32,
    pub default_ttl: u32,

    /// The current line, counted from one.
    pub line: usize,

    pub carry: Carry,
    pub tape: Tape,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("buffer", &self.buffer)
            .field("end_of_file", &self.end_of_file)
            .field("grouped", &self.grouped)
            .field("start_of_line", &self.start_of_line)
            .field("fresh", &self.fresh)
            .field("origin", &self.origin)
            .field("owner", &self.owner)
            .field("last_class", &self.last_class)
            .field("last_ttl", &self.last_ttl)
            .field("default_ttl", &self.default_ttl)
            .field("line", &self.line)
            .field("carry", &self.carry)
            .field("tape", &self.tape)
            .finish()
    }
}

impl SourceFile {
    /// Opens a zone file.
    pub fn open(
        path: &Path,
        origin: NameBuf,
        last_class: Class,
        last_ttl: u32,
    ) -> Result<Self, Raise> {
        let name = path.display().to_string();
        let path = match std::fs::canonicalize(path) {
            Ok(path) => path,
            Err(err) => raise!(open_error(&err), "{}: {}", name, err),
        };
        let handle = match std::fs::File::open(&path) {
            Ok(handle) => handle,
            Err(err) => raise!(open_error(&err), "{}: {}", name, err),
        };
        Ok(Self::new(
            name,
            Some(path),
            Some(Box::new(handle)),
            Window::with_capacity(WINDOW_SIZE),
            Eof::HaveData,
            origin,
            last_class,
            last_ttl,
        ))
    }

    /// Creates a source over an in-memory string.
    pub fn from_bytes(
        bytes: &[u8],
        origin: NameBuf,
        last_class: Class,
        last_ttl: u32,
    ) -> Self {
        Self::new(
            "<string>".into(),
            None,
            None,
            Window::from_bytes(bytes),
            Eof::ReadAllData,
            origin,
            last_class,
            last_ttl,
        )
    }

    /// Creates a source over an arbitrary reader.
    pub fn from_reader(
        name: String,
        handle: Box<dyn Read>,
        origin: NameBuf,
        last_class: Class,
        last_ttl: u32,
    ) -> Self {
        Self::new(
            name,
            None,
            Some(handle),
            Window::with_capacity(WINDOW_SIZE),
            Eof::HaveData,
            origin,
            last_class,
            last_ttl,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        name: String,
        path: Option<PathBuf>,
        handle: Option<Box<dyn Read>>,
        buffer: Window,
        end_of_file: Eof,
        origin: NameBuf,
        last_class: Class,
        last_ttl: u32,
    ) -> Self {
        let tape = Tape::new(buffer.length);
        let owner = origin;
        SourceFile {
            name,
            path,
            handle,
            buffer,
            end_of_file,
            grouped: false,
            start_of_line: true,
            fresh: true,
            origin,
            owner,
            last_class,
            last_ttl,
            default_ttl: last_ttl,
            line: 1,
            carry: Carry::default(),
            tape,
        }
    }

    /// Returns the name of the source for messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads more data into the window.
    ///
    /// Performs one read. Growing the window only happens when it is
    /// completely full, which after compaction means a single token spans
    /// the whole window.
    pub fn refill(&mut self) -> Result<(), Raise> {
        if self.buffer.length == self.buffer.size {
            self.grow()?;
        }
        let handle = match self.handle.as_mut() {
            Some(handle) => handle,
            None => {
                self.end_of_file = Eof::ReadAllData;
                return Ok(());
            }
        };
        loop {
            let space =
                &mut self.buffer.data[self.buffer.length..self.buffer.size];
            match handle.read(space) {
                Ok(0) => {
                    self.end_of_file = Eof::ReadAllData;
                    break;
                }
                Ok(count) => {
                    self.buffer.length += count;
                    break;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue
                }
                Err(err) => {
                    raise!(
                        Code::IoError,
                        "Error reading {}: {}",
                        self.name,
                        err
                    )
                }
            }
        }
        self.buffer.data[self.buffer.length] = 0;
        Ok(())
    }

    fn grow(&mut self) -> Result<(), Raise> {
        if self.buffer.data.try_reserve(WINDOW_SIZE).is_err() {
            out_of_memory!();
        }
        self.buffer.size += WINDOW_SIZE;
        self.buffer.data.resize(self.buffer.size + 1, 0);
        Ok(())
    }
}

/// Maps an open failure to a return code.
fn open_error(err: &io::Error) -> Code {
    match err.kind() {
        io::ErrorKind::NotFound => Code::NotAFile,
        io::ErrorKind::PermissionDenied => Code::NotPermitted,
        _ => Code::IoError,
    }
}

//============ Testing =======================================================
