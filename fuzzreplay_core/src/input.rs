use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Broad category of a [`LoadError`], used when only the kind of failure matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    NotFound,
    Io,
}

/// Errors produced while reading a replay input from disk.
///
/// A failed load never yields a partially filled buffer.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be opened.
    #[error("cannot open {path:?}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was opened but its size or contents could not be read.
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fewer bytes were readable than the file size reported.
    #[error("short read on {path:?}: expected {expected} bytes, got {actual}")]
    ShortRead {
        path: PathBuf,
        expected: u64,
        actual: usize,
    },
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::NotFound { .. } => LoadErrorKind::NotFound,
            LoadError::Io { .. } | LoadError::ShortRead { .. } => LoadErrorKind::Io,
        }
    }

    /// The underlying OS error, when there is one.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            LoadError::NotFound { source, .. } | LoadError::Io { source, .. } => Some(source),
            LoadError::ShortRead { .. } => None,
        }
    }
}

/// One replay input: the path it was named by and its full contents.
///
/// Lives for a single iteration of the replay loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl InputFile {
    /// Reads `path` into an owned buffer of exactly the file's size.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| LoadError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;

        let metadata = file.metadata().map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other("is a directory"),
            });
        }
        let expected = metadata.len();

        // A size the allocator cannot satisfy is an I/O error, not an abort.
        let mut data = Vec::new();
        usize::try_from(expected)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::OutOfMemory, e))
            .and_then(|len| {
                data.try_reserve_exact(len)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::OutOfMemory, e))
            })
            .map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        file.by_ref()
            .take(expected)
            .read_to_end(&mut data)
            .map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        if data.len() as u64 != expected {
            return Err(LoadError::ShortRead {
                path: path.to_path_buf(),
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
