//! Byte streams backing message bodies.
//!
//! A [`Stream`] exclusively owns one [`Handle`], either an in-memory buffer or an open
//! file. The readable and writable capabilities are derived once from the open mode;
//! every operation on a detached or closed stream fails with [`StreamError::Detached`]
//! except [`Stream::size`], [`Stream::eof`] and [`Stream::to_string_lossy`], which have
//! non-failing answers for that state.
//!
//! # Locators
//!
//! - `memory://` and `temp://` open an in-memory buffer
//! - anything else is a filesystem path, optionally prefixed with `file://`
//!
//! # Modes
//!
//! Modes follow the `fopen` letters `r`, `w`, `a`, `x`, `c`, optionally followed by `+`
//! and a `b` or `t` flag in any order (`wb+` is normalized to `w+b`). The literal `rw`
//! is also accepted.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use bytes::Bytes;
use tracing::trace;

use crate::protocol::StreamError;

const MEMORY_LOCATORS: [&str; 2] = ["memory://", "temp://"];

/// Modes (without the `b`/`t` flag) that allow reading.
const READABLE_MODES: [&str; 6] = ["r", "r+", "w+", "a+", "x+", "c+"];

/// Modes (without the `b`/`t` flag) that allow writing.
const WRITABLE_MODES: [&str; 10] = ["w", "w+", "rw", "r+", "a", "a+", "x", "x+", "c", "c+"];

/// The resource owned by a [`Stream`].
#[derive(Debug)]
pub enum Handle {
    Memory(Cursor<Vec<u8>>),
    File(File),
}

impl Handle {
    fn position(&self) -> io::Result<u64> {
        match self {
            Handle::Memory(cursor) => Ok(cursor.position()),
            Handle::File(file) => {
                let mut file: &File = file;
                file.stream_position()
            }
        }
    }

    fn len(&self) -> io::Result<u64> {
        match self {
            Handle::Memory(cursor) => Ok(cursor.get_ref().len() as u64),
            Handle::File(file) => file.metadata().map(|metadata| metadata.len()),
        }
    }
}

impl Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Handle::Memory(cursor) => cursor.read(buf),
            Handle::File(file) => file.read(buf),
        }
    }
}

impl Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Handle::Memory(cursor) => cursor.write(buf),
            Handle::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Handle::Memory(_) => Ok(()),
            Handle::File(file) => file.flush(),
        }
    }
}

impl Seek for Handle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Handle::Memory(cursor) => cursor.seek(pos),
            Handle::File(file) => file.seek(pos),
        }
    }
}

/// A snapshot of the stream's descriptive data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub locator: String,
    pub mode: String,
    pub seekable: bool,
    pub size: Option<u64>,
}

pub struct Stream {
    locator: String,
    mode: String,
    handle: Option<Handle>,
    readable: bool,
    writable: bool,
    seekable: bool,
    append: bool,
}

impl Stream {
    /// Opens `locator` with an `fopen`-style `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidMode`] for an unknown mode and [`StreamError::Open`]
    /// when the file cannot be opened.
    pub fn open(locator: &str, mode: &str) -> Result<Stream, StreamError> {
        let mode = normalize_mode(mode)?;

        let handle = if MEMORY_LOCATORS.contains(&locator) {
            Handle::Memory(Cursor::new(Vec::new()))
        } else {
            let path = locator.strip_prefix("file://").unwrap_or(locator);
            let file = open_options(&mode).open(path).map_err(|source| StreamError::Open {
                locator: locator.to_string(),
                mode: mode.clone(),
                source,
            })?;
            Handle::File(file)
        };

        trace!(locator, mode = %mode, "opened stream");
        Ok(Stream::with_handle(locator, mode, handle))
    }

    /// An empty read-write in-memory stream.
    pub fn memory() -> Stream {
        Stream::with_handle("memory://", "w+b".to_string(), Handle::Memory(Cursor::new(Vec::new())))
    }

    /// A read-write in-memory stream holding `data`, positioned at the start.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Stream {
        Stream::with_handle("memory://", "w+b".to_string(), Handle::Memory(Cursor::new(data.into())))
    }

    fn with_handle(locator: &str, mode: String, handle: Handle) -> Stream {
        let base = mode.trim_end_matches(['b', 't']);
        Stream {
            locator: locator.to_string(),
            readable: READABLE_MODES.contains(&base),
            writable: WRITABLE_MODES.contains(&base),
            seekable: true,
            append: base.starts_with('a'),
            mode,
            handle: Some(handle),
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    pub fn is_detached(&self) -> bool {
        self.handle.is_none()
    }

    /// Reads up to `length` bytes; fewer are returned only at the end of the stream.
    pub fn read(&mut self, length: usize) -> Result<Bytes, StreamError> {
        let readable = self.readable;
        let handle = self.handle_mut("read")?;
        if !readable {
            return Err(StreamError::NotReadable);
        }

        let mut buf = Vec::with_capacity(length.min(64 * 1024));
        Read::by_ref(handle).take(length as u64).read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Writes all of `data` and returns the number of bytes accepted.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        let (writable, append) = (self.writable, self.append);
        let handle = self.handle_mut("write")?;
        if !writable {
            return Err(StreamError::NotWritable);
        }

        if append && matches!(handle, Handle::Memory(_)) {
            handle.seek(SeekFrom::End(0))?;
        }
        handle.write_all(data)?;
        Ok(data.len())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, StreamError> {
        let seekable = self.seekable;
        let handle = self.handle_mut("seek")?;
        if !seekable {
            return Err(StreamError::NotSeekable);
        }

        Ok(handle.seek(pos)?)
    }

    pub fn rewind(&mut self) -> Result<(), StreamError> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    pub fn tell(&self) -> Result<u64, StreamError> {
        let handle = self.handle.as_ref().ok_or_else(|| StreamError::detached("tell position"))?;
        Ok(handle.position()?)
    }

    /// `true` when the position is at or past the end, or the stream is detached.
    pub fn eof(&self) -> bool {
        match &self.handle {
            None => true,
            Some(handle) => match (handle.position(), handle.len()) {
                (Ok(position), Ok(len)) => position >= len,
                _ => true,
            },
        }
    }

    /// The total size in bytes, `None` when unknown (detached).
    pub fn size(&self) -> Option<u64> {
        self.handle.as_ref().and_then(|handle| handle.len().ok())
    }

    /// Reads from the current position to the end, without rewinding first.
    pub fn contents(&mut self) -> Result<Bytes, StreamError> {
        let readable = self.readable;
        let handle = self.handle_mut("read")?;
        if !readable {
            return Err(StreamError::NotReadable);
        }

        let mut buf = Vec::new();
        handle.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    pub fn metadata(&self) -> Option<StreamMetadata> {
        self.handle.as_ref().map(|_| StreamMetadata {
            locator: self.locator.clone(),
            mode: self.mode.clone(),
            seekable: self.seekable,
            size: self.size(),
        })
    }

    /// Releases the handle. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.detach() {
            if let Err(e) = handle.flush() {
                trace!(locator = %self.locator, "flush on close failed: {e}");
            }
            trace!(locator = %self.locator, "closed stream");
        }
    }

    /// Gives up ownership of the handle without closing it.
    ///
    /// The stream is unusable afterwards.
    pub fn detach(&mut self) -> Option<Handle> {
        let handle = self.handle.take();
        if handle.is_some() {
            trace!(locator = %self.locator, "detached stream");
        }
        self.readable = false;
        self.writable = false;
        self.seekable = false;
        handle
    }

    /// The whole content as text, from the start. Any failure yields an empty string.
    pub fn to_string_lossy(&mut self) -> String {
        match self.rewind().and_then(|()| self.contents()) {
            Ok(content) => String::from_utf8_lossy(&content).into_owned(),
            Err(_) => String::new(),
        }
    }

    fn handle_mut(&mut self, operation: &'static str) -> Result<&mut Handle, StreamError> {
        self.handle.as_mut().ok_or_else(|| StreamError::detached(operation))
    }
}

impl Default for Stream {
    fn default() -> Self {
        Stream::memory()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("locator", &self.locator)
            .field("mode", &self.mode)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("detached", &self.is_detached())
            .field("size", &self.size())
            .finish()
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let readable = self.readable;
        let handle = self.handle_mut("read").map_err(io::Error::other)?;
        if !readable {
            return Err(io::Error::other(StreamError::NotReadable));
        }
        handle.read(buf)
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Stream::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle_mut("flush").map_err(io::Error::other)?.flush()
    }
}

impl Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Stream::seek(self, pos).map_err(io::Error::other)
    }
}

/// Normalizes the order of the mode flags, e.g. `wb+` to `w+b`.
fn normalize_mode(mode: &str) -> Result<String, StreamError> {
    if mode == "rw" {
        return Ok(mode.to_string());
    }

    let mut chars = mode.chars();
    let base = chars.next().filter(|c| "rwaxc".contains(*c)).ok_or_else(|| StreamError::invalid_mode(mode))?;

    let (mut plus, mut flag) = (false, None);
    for c in chars {
        match c {
            '+' if !plus => plus = true,
            'b' | 't' if flag.is_none() => flag = Some(c),
            _ => return Err(StreamError::invalid_mode(mode)),
        }
    }

    let mut normalized = String::with_capacity(3);
    normalized.push(base);
    if plus {
        normalized.push('+');
    }
    normalized.extend(flag);
    Ok(normalized)
}

fn open_options(mode: &str) -> OpenOptions {
    let mut options = OpenOptions::new();
    let plus = mode.contains('+');

    match mode.as_bytes()[0] {
        b'r' if mode == "rw" => options.read(true).write(true),
        b'r' => options.read(true).write(plus),
        b'w' => options.write(true).create(true).truncate(true).read(plus),
        b'a' => options.append(true).create(true).read(plus),
        b'x' => options.write(true).create_new(true).read(plus),
        _ => options.write(true).create(true).read(plus),
    };

    options
}
