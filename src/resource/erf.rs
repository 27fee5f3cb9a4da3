//! Encapsulated resource files: ERF, MOD, SAV and HAK archives.
//!
//! A header is followed by a key table naming every entry and a parallel resource table giving the
//! byte range of each entry.

use std::path::Path;
use std::sync::Arc;

use binrw::binread;
use indexmap::IndexMap;
use tracing::debug;

use super::{check_signature, ArchiveError, ArchiveSource, ResourceProvider};
use crate::misc::binary_reader::BinaryReader;
use crate::misc::resource_id::{ResourceId, MAX_RESREF_LENGTH};
use crate::misc::resource_type::ResourceType;
use crate::ByteBuffer;

const SIGNATURES: [&[u8; 8]; 5] = [
    b"ERF V1.0", b"ERF V1.1", b"MOD V1.0", b"SAV V1.0", b"HAK V1.0",
];

#[allow(dead_code)]
#[binread]
#[br(little)]
struct ErfHeader {
    signature: [u8; 8],
    language_count: u32,
    localized_string_size: u32,
    entry_count: u32,
    offset_to_localized_strings: u32,
    offset_to_keys: u32,
    offset_to_resources: u32,
    build_year: u32,
    build_day: u32,
    description_str_ref: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErfEntry {
    pub offset: u32,
    pub size: u32,
}

pub struct ErfArchive {
    source: ArchiveSource,
    entries: IndexMap<ResourceId, ErfEntry>,
}

impl ErfArchive {
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

    pub fn entry(&self, id: &ResourceId) -> Option<&ErfEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_entries(data: &[u8]) -> Result<IndexMap<ResourceId, ErfEntry>, ArchiveError> {
    let mut reader = BinaryReader::from_slice(data);
    let header = reader.read::<ErfHeader>()?;
    check_signature(&header.signature, &SIGNATURES)?;

    let name_length = resref_length(&header.signature);
    let count = header.entry_count as usize;
    let mut keys = Vec::with_capacity(count.min(4096));
    reader.seek(std::io::SeekFrom::Start(header.offset_to_keys as u64))?;
    for _ in 0..count {
        let name = reader.read_string(name_length)?;
        let _resource_id = reader.read_u32()?;
        let kind = reader.read_u16()?;
        reader.skip(2)?;
        keys.push((name, kind));
    }

    let mut entries = IndexMap::with_capacity(keys.len());
    reader.seek(std::io::SeekFrom::Start(header.offset_to_resources as u64))?;
    for (name, kind) in keys {
        let entry = ErfEntry {
            offset: reader.read_u32()?,
            size: reader.read_u32()?,
        };
        if entry.offset as u64 + entry.size as u64 > data.len() as u64 {
            return Err(ArchiveError::InvalidEntry(format!(
                "{name} spans {}..{} past the end of the archive",
                entry.offset,
                entry.offset as u64 + entry.size as u64
            )));
        }
        let Some(kind) = ResourceType::from_id(kind) else {
            debug!(%name, kind, "Skipping entry of unknown resource type");
            continue;
        };
        entries
            .entry(ResourceId::new(&name, kind))
            .or_insert(entry);
    }

    Ok(entries)
}

/// Key table names are 16 bytes, except in `V1.1` archives which widen them to 32.
fn resref_length(signature: &[u8; 8]) -> usize {
    if &signature[4..] == b"V1.1" {
        2 * MAX_RESREF_LENGTH
    } else {
        MAX_RESREF_LENGTH
    }
}

impl ResourceProvider for ErfArchive {
    fn contains(&self, id: &ResourceId) -> bool {
        self.entries.contains_key(id)
    }

    fn read(&self, id: &ResourceId) -> Result<Option<ByteBuffer>, ArchiveError> {
        match self.entries.get(id) {
            Some(entry) => Ok(Some(self.source.read_range(entry.offset as u64, entry.size)?)),
            None => Ok(None),
        }
    }

    fn resource_ids(&self) -> Vec<ResourceId> {
        self.entries.keys().cloned().collect()
    }

    fn description(&self) -> String {
        self.source.to_string()
    }
}
