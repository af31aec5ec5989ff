//! Files received through a multipart upload.
//!
//! [`UploadedFile`] describes a file the server already stored in a temporary location.
//! How the file got there is up to the server adapter; this type only exposes it and moves
//! it to its final destination, once.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::ensure;
use crate::protocol::{Stream, StreamError};

/// Outcome of an upload as reported by the receiving server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    Ok,
    /// Larger than the server-wide size limit.
    IniSize,
    /// Larger than the form's declared size limit.
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    /// Stopped by a server extension.
    Extension,
}

impl UploadError {
    /// Maps the numeric codes used by form upload handlers; unknown codes are `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => UploadError::Ok,
            1 => UploadError::IniSize,
            2 => UploadError::FormSize,
            3 => UploadError::Partial,
            4 => UploadError::NoFile,
            6 => UploadError::NoTmpDir,
            7 => UploadError::CantWrite,
            8 => UploadError::Extension,
            _ => return None,
        })
    }

    pub fn code(self) -> i32 {
        match self {
            UploadError::Ok => 0,
            UploadError::IniSize => 1,
            UploadError::FormSize => 2,
            UploadError::Partial => 3,
            UploadError::NoFile => 4,
            UploadError::NoTmpDir => 6,
            UploadError::CantWrite => 7,
            UploadError::Extension => 8,
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UploadError::Ok => "no error",
            UploadError::IniSize => "file exceeds the server size limit",
            UploadError::FormSize => "file exceeds the form size limit",
            UploadError::Partial => "file was only partially uploaded",
            UploadError::NoFile => "no file was uploaded",
            UploadError::NoTmpDir => "missing temporary folder",
            UploadError::CantWrite => "failed to write file to disk",
            UploadError::Extension => "upload stopped by extension",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    temp_path: PathBuf,
    size: Option<u64>,
    error: UploadError,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    moved: bool,
}

impl UploadedFile {
    pub fn new(
        temp_path: impl Into<PathBuf>,
        size: Option<u64>,
        error: UploadError,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> Self {
        Self { temp_path: temp_path.into(), size, error, client_filename, client_media_type, moved: false }
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn error(&self) -> UploadError {
        self.error
    }

    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    pub fn is_moved(&self) -> bool {
        self.moved
    }

    /// Opens the temporary file read-only.
    pub fn stream(&self) -> Result<Stream, StreamError> {
        ensure!(!self.moved, StreamError::AlreadyMoved);
        Stream::open(&self.temp_path.to_string_lossy(), "rb")
    }

    /// Moves the file to `destination`, creating missing parent directories.
    ///
    /// Falls back to copy-and-delete when a rename is not possible (e.g. across
    /// filesystems).
    pub fn move_to(&mut self, destination: impl AsRef<Path>) -> Result<PathBuf, StreamError> {
        ensure!(self.error == UploadError::Ok, StreamError::Upload { error: self.error });
        ensure!(!self.moved, StreamError::AlreadyMoved);

        let destination = destination.as_ref();
        if let Some(parent) = destination.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if let Err(e) = fs::rename(&self.temp_path, destination) {
            debug!(from = %self.temp_path.display(), to = %destination.display(), "rename failed ({e}), copying instead");
            copy_and_remove(&self.temp_path, destination)?;
        }

        trace!(from = %self.temp_path.display(), to = %destination.display(), "moved uploaded file");
        self.moved = true;
        Ok(destination.to_path_buf())
    }
}

fn copy_and_remove(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    fs::remove_file(from)
}
