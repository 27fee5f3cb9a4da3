//! Archive formats, the provider chain that aggregates them, and the director that mounts them.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use thiserror::Error;

use crate::misc::resource_id::ResourceId;
use crate::ByteBuffer;

pub mod bif;
pub mod director;
pub mod erf;
pub mod exe;
pub mod folder;
pub mod key;
pub mod resources;
pub mod rim;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Error opening the file: {0}")]
    IoError(#[from] io::Error),

    #[error("Parsing error: {0}")]
    ParsingError(#[from] binrw::Error),

    #[error("Invalid signature: {0:?}")]
    InvalidSignature(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Couldn't find the requested resource inside of the archive")]
    ResourceNotFound,
}

/// A uniform view over one mounted archive.
///
/// `contains` is answered from tables built when the archive was opened; `read` goes back to the
/// backing storage. An archive that does not hold `id` answers `Ok(None)`; `Err` is reserved for
/// archives that are unreadable or malformed.
pub trait ResourceProvider: Send + Sync {
    fn contains(&self, id: &ResourceId) -> bool;

    fn read(&self, id: &ResourceId) -> Result<Option<ByteBuffer>, ArchiveError>;

    /// Every id this archive can resolve, in table order.
    fn resource_ids(&self) -> Vec<ResourceId>;

    /// A human readable name for logs and error messages, usually the archive path.
    fn description(&self) -> String;
}

/// Where the bytes of a single-file archive live.
#[derive(Clone)]
pub enum ArchiveSource {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

impl ArchiveSource {
    /// Runs `parse` over the whole archive. Files are memory mapped for the duration of the call.
    pub(crate) fn parse<T, F>(&self, parse: F) -> Result<T, ArchiveError>
    where
        F: FnOnce(&[u8]) -> Result<T, ArchiveError>,
    {
        match self {
            ArchiveSource::File(path) => {
                let file = File::open(path)?;
                let mmap = unsafe { Mmap::map(&file)? };
                parse(&mmap[..])
            }
            ArchiveSource::Memory(data) => parse(&data[..]),
        }
    }

    /// Reads `size` bytes starting at `offset`.
    pub fn read_range(&self, offset: u64, size: u32) -> Result<ByteBuffer, ArchiveError> {
        match self {
            ArchiveSource::File(path) => read_file_range(path, offset, size),
            ArchiveSource::Memory(data) => {
                let start = offset as usize;
                let end = start + size as usize;
                data.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| {
                    ArchiveError::InvalidEntry(format!(
                        "range {start}..{end} exceeds archive of {} bytes",
                        data.len()
                    ))
                })
            }
        }
    }
}

impl fmt::Display for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveSource::File(path) => write!(f, "{}", path.display()),
            ArchiveSource::Memory(data) => write!(f, "<memory, {} bytes>", data.len()),
        }
    }
}

pub(crate) fn read_file_range(path: &Path, offset: u64, size: u32) -> Result<ByteBuffer, ArchiveError> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;

    let mut buffer = vec![0; size as usize];
    file.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// Checks the eight byte `FTYP Vx.y` signature that opens every binary format of the engine.
pub(crate) fn check_signature(found: &[u8; 8], accepted: &[&[u8; 8]]) -> Result<(), ArchiveError> {
    if accepted.iter().any(|signature| *signature == found) {
        Ok(())
    } else {
        Err(ArchiveError::InvalidSignature(
            String::from_utf8_lossy(found).into_owned(),
        ))
    }
}
