//! BIF data files referenced by a KEY index.
//!
//! A BIF carries its own variable resource table. Entries are addressed by their position in that
//! table, the local index stored in the KEY entry.

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;

use binrw::binread;

use super::{check_signature, ArchiveError, ArchiveSource};
use crate::misc::binary_reader::BinaryReader;
use crate::ByteBuffer;

#[allow(dead_code)]
#[binread]
#[br(little)]
struct BifHeader {
    signature: [u8; 8],
    variable_resource_count: u32,
    fixed_resource_count: u32,
    offset_to_variable_resources: u32,
}

/// One row of the variable resource table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BifEntry {
    /// Informational id. Lookups go by table position instead.
    pub id: u32,
    pub offset: u32,
    pub size: u32,
    pub kind: u32,
}

pub struct BifFile {
    source: ArchiveSource,
    entries: Vec<BifEntry>,
}

impl BifFile {
    pub fn from_file(path: &Path) -> Result<Self, ArchiveError> {
        Self::from_source(ArchiveSource::File(path.to_path_buf()))
    }

    pub fn from_memory(data: Vec<u8>) -> Result<Self, ArchiveError> {
        Self::from_source(ArchiveSource::Memory(Arc::from(data)))
    }

    fn from_source(source: ArchiveSource) -> Result<Self, ArchiveError> {
        let entries = source.parse(read_entries)?;
        Ok(Self { source, entries })
    }

    pub fn entries(&self) -> &[BifEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&BifEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads the bytes of the entry at `index` in the variable resource table.
    pub fn read_resource(&self, index: usize) -> Result<ByteBuffer, ArchiveError> {
        let entry = self.entries.get(index).ok_or_else(|| {
            ArchiveError::InvalidEntry(format!(
                "{} has no resource #{index}, it holds {}",
                self.source,
                self.entries.len()
            ))
        })?;
        self.source.read_range(entry.offset as u64, entry.size)
    }
}

fn read_entries(data: &[u8]) -> Result<Vec<BifEntry>, ArchiveError> {
    let mut reader = BinaryReader::from_slice(data);
    let header = reader.read::<BifHeader>()?;
    check_signature(&header.signature, &[b"BIFFV1  "])?;

    let count = header.variable_resource_count as usize;
    let mut entries = Vec::with_capacity(count.min(4096));
    reader.seek(SeekFrom::Start(header.offset_to_variable_resources as u64))?;
    for _ in 0..count {
        let entry = BifEntry {
            id: reader.read_u32()?,
            offset: reader.read_u32()?,
            size: reader.read_u32()?,
            kind: reader.read_u32()?,
        };
        if entry.offset as u64 + entry.size as u64 > data.len() as u64 {
            return Err(ArchiveError::InvalidEntry(format!(
                "resource {} spans {}..{} past the end of the data file",
                entry.id,
                entry.offset,
                entry.offset as u64 + entry.size as u64
            )));
        }
        entries.push(entry);
    }

    Ok(entries)
}
