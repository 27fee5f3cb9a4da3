//! Resources embedded in the game executable.
//!
//! The engine keeps its mouse cursors in the `.rsrc` section of the PE image rather than in any
//! archive. The resource directory is a three level tree (type, name, language); cursors and cursor
//! groups are surfaced with their numeric resource id as name, every other type is ignored.

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;

use binrw::binread;
use indexmap::IndexMap;
use tracing::debug;

use super::{ArchiveError, ArchiveSource, ResourceProvider};
use crate::misc::binary_reader::BinaryReader;
use crate::misc::resource_id::ResourceId;
use crate::misc::resource_type::ResourceType;
use crate::ByteBuffer;

const RT_CURSOR: u32 = 1;
const RT_GROUP_CURSOR: u32 = 12;

const HIGH_BIT: u32 = 0x8000_0000;

#[allow(dead_code)]
#[binread]
#[br(little)]
struct CoffHeader {
    machine: u16,
    section_count: u16,
    timestamp: u32,
    symbol_table_offset: u32,
    symbol_count: u32,
    optional_header_size: u16,
    characteristics: u16,
}

#[allow(dead_code)]
#[binread]
#[br(little)]
struct SectionHeader {
    name: [u8; 8],
    virtual_size: u32,
    virtual_address: u32,
    raw_data_size: u32,
    raw_data_offset: u32,
    relocations_offset: u32,
    line_numbers_offset: u32,
    relocation_count: u16,
    line_number_count: u16,
    characteristics: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExeEntry {
    pub offset: u32,
    pub size: u32,
}

#[derive(Clone, Copy)]
struct DirectoryEntry {
    id: u32,
    offset: u32,
    is_directory: bool,
}

pub struct ExeArchive {
    source: ArchiveSource,
    entries: IndexMap<ResourceId, ExeEntry>,
}

impl ExeArchive {
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

    pub fn entry(&self, id: &ResourceId) -> Option<&ExeEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_entries(data: &[u8]) -> Result<IndexMap<ResourceId, ExeEntry>, ArchiveError> {
    let mut reader = BinaryReader::from_slice(data);
    let dos_magic = reader.read::<[u8; 2]>()?;
    if &dos_magic != b"MZ" {
        return Err(ArchiveError::InvalidSignature(
            String::from_utf8_lossy(&dos_magic).into_owned(),
        ));
    }

    reader.seek(SeekFrom::Start(0x3c))?;
    let pe_offset = reader.read_u32()?;
    reader.seek(SeekFrom::Start(pe_offset as u64))?;
    let pe_magic = reader.read::<[u8; 4]>()?;
    if &pe_magic != b"PE\0\0" {
        return Err(ArchiveError::InvalidSignature(
            String::from_utf8_lossy(&pe_magic).into_owned(),
        ));
    }

    let coff = reader.read::<CoffHeader>()?;
    reader.skip(coff.optional_header_size as i64)?;

    let mut resource_section = None;
    for _ in 0..coff.section_count {
        let section = reader.read::<SectionHeader>()?;
        if &section.name == b".rsrc\0\0\0" {
            resource_section = Some(section);
            break;
        }
    }
    let Some(section) = resource_section else {
        debug!("Executable has no resource section");
        return Ok(IndexMap::new());
    };

    let base = section.raw_data_offset as u64;
    let mut entries = IndexMap::new();
    for kind in read_directory(&mut reader, base, 0)? {
        let resource_type = match kind.id {
            RT_CURSOR => ResourceType::Cursor,
            RT_GROUP_CURSOR => ResourceType::CursorGroup,
            _ => continue,
        };
        if !kind.is_directory {
            continue;
        }

        for name in read_directory(&mut reader, base, kind.offset)? {
            let languages = if name.is_directory {
                read_directory(&mut reader, base, name.offset)?
            } else {
                vec![name]
            };
            let Some(leaf) = languages.into_iter().find(|l| !l.is_directory) else {
                continue;
            };

            let entry = read_leaf(&mut reader, base, leaf.offset, &section, data.len())?;
            entries
                .entry(ResourceId::new(&name.id.to_string(), resource_type))
                .or_insert(entry);
        }
    }

    Ok(entries)
}

/// Lists the id entries of the directory at `offset` within the resource section. Named entries
/// are skipped.
fn read_directory(
    reader: &mut BinaryReader<std::io::Cursor<&[u8]>>,
    base: u64,
    offset: u32,
) -> Result<Vec<DirectoryEntry>, ArchiveError> {
    let start = base + offset as u64;
    let (named_count, id_count) = reader.read_at(start + 12, |r| Ok((r.read_u16()?, r.read_u16()?)))?;

    let raw = reader.read_u32_array_at(start + 16, 2 * (named_count as usize + id_count as usize))?;
    Ok(raw
        .chunks_exact(2)
        .filter(|pair| pair[0] & HIGH_BIT == 0)
        .map(|pair| DirectoryEntry {
            id: pair[0],
            offset: pair[1] & !HIGH_BIT,
            is_directory: pair[1] & HIGH_BIT != 0,
        })
        .collect())
}

fn read_leaf(
    reader: &mut BinaryReader<std::io::Cursor<&[u8]>>,
    base: u64,
    offset: u32,
    section: &SectionHeader,
    file_size: usize,
) -> Result<ExeEntry, ArchiveError> {
    let (rva, size) = reader.read_at(base + offset as u64, |r| Ok((r.read_u32()?, r.read_u32()?)))?;
    let file_offset = rva
        .checked_sub(section.virtual_address)
        .and_then(|relative| relative.checked_add(section.raw_data_offset))
        .ok_or_else(|| {
            ArchiveError::InvalidEntry(format!("resource data at RVA {rva:#x} is outside .rsrc"))
        })?;
    if file_offset as u64 + size as u64 > file_size as u64 {
        return Err(ArchiveError::InvalidEntry(format!(
            "resource data {file_offset:#x}..{:#x} is past the end of the executable",
            file_offset as u64 + size as u64
        )));
    }
    Ok(ExeEntry {
        offset: file_offset,
        size,
    })
}

impl ResourceProvider for ExeArchive {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u16(data: &mut [u8], offset: usize, value: u16) {
        data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn put_u32(data: &mut [u8], offset: usize, value: u32) {
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// One `.rsrc` section at file offset 0x200, mapped at RVA 0x1000, holding cursor 5, cursor
    /// group 5 and an icon.
    fn build_exe() -> Vec<u8> {
        let mut data = vec![0u8; 0x2b0];
        data[..2].copy_from_slice(b"MZ");
        put_u32(&mut data, 0x3c, 0x40);
        data[0x40..0x44].copy_from_slice(b"PE\0\0");
        put_u16(&mut data, 0x44, 0x14c);
        put_u16(&mut data, 0x46, 1);

        let section = 0x58;
        data[section..section + 8].copy_from_slice(b".rsrc\0\0\0");
        put_u32(&mut data, section + 8, 0xb0);
        put_u32(&mut data, section + 12, 0x1000);
        put_u32(&mut data, section + 16, 0xb0);
        put_u32(&mut data, section + 20, 0x200);

        let rsrc = 0x200;
        let directory = |data: &mut Vec<u8>, at: usize, entries: &[(u32, u32)]| {
            put_u16(data, rsrc + at + 14, entries.len() as u16);
            for (i, (id, offset)) in entries.iter().enumerate() {
                put_u32(data, rsrc + at + 16 + i * 8, *id);
                put_u32(data, rsrc + at + 20 + i * 8, *offset);
            }
        };
        directory(
            &mut data,
            0x00,
            &[(1, HIGH_BIT | 0x28), (3, HIGH_BIT | 0x28), (12, HIGH_BIT | 0x58)],
        );
        directory(&mut data, 0x28, &[(5, HIGH_BIT | 0x40)]);
        directory(&mut data, 0x40, &[(1033, 0x88)]);
        directory(&mut data, 0x58, &[(5, HIGH_BIT | 0x70)]);
        directory(&mut data, 0x70, &[(1033, 0x98)]);

        put_u32(&mut data, rsrc + 0x88, 0x10a8);
        put_u32(&mut data, rsrc + 0x8c, 4);
        put_u32(&mut data, rsrc + 0x98, 0x10a8 + 4);
        put_u32(&mut data, rsrc + 0x9c, 4);
        data[rsrc + 0xa8..rsrc + 0xb0].copy_from_slice(b"CURGROUP");
        data
    }

    #[test]
    fn test_cursor_resources() -> Result<(), ArchiveError> {
        let exe = ExeArchive::from_memory(build_exe())?;
        assert_eq!(exe.len(), 2);

        let cursor = ResourceId::new("5", ResourceType::Cursor);
        assert_eq!(exe.entry(&cursor), Some(&ExeEntry { offset: 0x2a8, size: 4 }));
        assert_eq!(exe.read(&cursor)?, Some(b"CURG".to_vec()));
        assert_eq!(
            exe.read(&ResourceId::new("5", ResourceType::CursorGroup))?,
            Some(b"ROUP".to_vec())
        );
        Ok(())
    }

    #[test]
    fn test_not_an_executable() {
        let mut data = build_exe();
        data[..2].copy_from_slice(b"ZM");
        assert!(matches!(
            ExeArchive::from_memory(data),
            Err(ArchiveError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_leaf_outside_file() {
        let mut data = build_exe();
        put_u32(&mut data, 0x200 + 0x8c, 0x1000);
        assert!(matches!(
            ExeArchive::from_memory(data),
            Err(ArchiveError::InvalidEntry(_))
        ));
    }
}
