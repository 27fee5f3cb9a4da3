//! Resource image (RIM) archives. Unlike ERF there is no separate key table: each entry of the
//! single resource table carries the name, type and byte range of one resource.

use std::io::SeekFrom;
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

#[allow(dead_code)]
#[binread]
#[br(little)]
struct RimHeader {
    signature: [u8; 8],
    archive_id: u32,
    resource_count: u32,
    offset_to_resources: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RimEntry {
    pub offset: u32,
    pub size: u32,
}

pub struct RimArchive {
    source: ArchiveSource,
    entries: IndexMap<ResourceId, RimEntry>,
}

impl RimArchive {
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

    pub fn entry(&self, id: &ResourceId) -> Option<&RimEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_entries(data: &[u8]) -> Result<IndexMap<ResourceId, RimEntry>, ArchiveError> {
    let mut reader = BinaryReader::from_slice(data);
    let header = reader.read::<RimHeader>()?;
    check_signature(&header.signature, &[b"RIM V1.0"])?;

    let mut entries = IndexMap::new();
    reader.seek(SeekFrom::Start(header.offset_to_resources as u64))?;
    for _ in 0..header.resource_count {
        let name = reader.read_string(MAX_RESREF_LENGTH)?;
        let kind = reader.read_u32()?;
        let _resource_id = reader.read_u32()?;
        let entry = RimEntry {
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
        let Some(kind) = u16::try_from(kind).ok().and_then(ResourceType::from_id) else {
            debug!(%name, kind, "Skipping entry of unknown resource type");
            continue;
        };
        entries
            .entry(ResourceId::new(&name, kind))
            .or_insert(entry);
    }

    Ok(entries)
}

impl ResourceProvider for RimArchive {
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
