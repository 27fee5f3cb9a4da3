//! KEY index files and the BIF data files they reference.
//!
//! The KEY holds the name table of every BIF of an install plus one entry per resource, pointing
//! at a BIF and a position inside its resource table. BIF tables are parsed on first use and kept
//! for the lifetime of the archive.

use std::collections::HashMap;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use binrw::binread;
use indexmap::IndexMap;
use tracing::debug;

use super::bif::BifFile;
use super::{check_signature, ArchiveError, ArchiveSource, ResourceProvider};
use crate::misc::binary_reader::BinaryReader;
use crate::misc::resource_id::{ResourceId, MAX_RESREF_LENGTH};
use crate::misc::resource_type::ResourceType;
use crate::utils::find_path_ignore_case;
use crate::ByteBuffer;

#[allow(dead_code)]
#[binread]
#[br(little)]
struct KeyHeader {
    signature: [u8; 8],
    file_count: u32,
    key_count: u32,
    offset_to_files: u32,
    offset_to_keys: u32,
    build_year: u32,
    build_day: u32,
    reserved: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyFileEntry {
    /// Path of the data file relative to the game directory, with `\` separators.
    pub filename: String,
    pub size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEntry {
    pub bif_index: usize,
    pub resource_index: usize,
}

impl KeyEntry {
    fn from_resource_id(resource_id: u32) -> Self {
        Self {
            bif_index: (resource_id >> 20) as usize,
            resource_index: (resource_id & 0xfffff) as usize,
        }
    }
}

pub struct KeyArchive {
    path: PathBuf,
    game_dir: PathBuf,
    files: Vec<KeyFileEntry>,
    keys: IndexMap<ResourceId, KeyEntry>,
    bifs: Mutex<HashMap<usize, Arc<BifFile>>>,
}

impl KeyArchive {
    /// Opens a KEY file. Data files are looked up relative to the directory holding it.
    pub fn from_file(path: &Path) -> Result<Self, ArchiveError> {
        let (files, keys) = ArchiveSource::File(path.to_path_buf()).parse(read_tables)?;
        let game_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            game_dir,
            files,
            keys,
            bifs: Mutex::new(HashMap::new()),
        })
    }

    pub fn files(&self) -> &[KeyFileEntry] {
        &self.files
    }

    pub fn entry(&self, id: &ResourceId) -> Option<&KeyEntry> {
        self.keys.get(id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the parsed data file at `bif_index`, opening it on first use.
    pub fn bif(&self, bif_index: usize) -> Result<Arc<BifFile>, ArchiveError> {
        let mut bifs = self.bifs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bif) = bifs.get(&bif_index) {
            return Ok(bif.clone());
        }

        let file = self.files.get(bif_index).ok_or_else(|| {
            ArchiveError::InvalidEntry(format!(
                "{} references data file #{bif_index}, it lists {}",
                self.path.display(),
                self.files.len()
            ))
        })?;
        let path = find_path_ignore_case(&self.game_dir, &file.filename).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "data file {} not found in {}",
                    file.filename,
                    self.game_dir.display()
                ),
            )
        })?;

        let bif = Arc::new(BifFile::from_file(&path)?);
        debug!(path = %path.display(), entries = bif.len(), "Opened data file");
        bifs.insert(bif_index, bif.clone());
        Ok(bif)
    }
}

type KeyTables = (Vec<KeyFileEntry>, IndexMap<ResourceId, KeyEntry>);

fn read_tables(data: &[u8]) -> Result<KeyTables, ArchiveError> {
    let mut reader = BinaryReader::from_slice(data);
    let header = reader.read::<KeyHeader>()?;
    check_signature(&header.signature, &[b"KEY V1  "])?;

    let mut files = Vec::with_capacity((header.file_count as usize).min(4096));
    reader.seek(SeekFrom::Start(header.offset_to_files as u64))?;
    for _ in 0..header.file_count {
        let size = reader.read_u32()?;
        let name_offset = reader.read_u32()?;
        let name_size = reader.read_u16()?;
        let _drives = reader.read_u16()?;
        let filename = reader.read_string_at(name_offset as u64, name_size as usize)?;
        files.push(KeyFileEntry { filename, size });
    }

    let mut keys = IndexMap::new();
    reader.seek(SeekFrom::Start(header.offset_to_keys as u64))?;
    for _ in 0..header.key_count {
        let name = reader.read_string(MAX_RESREF_LENGTH)?;
        let kind = reader.read_u16()?;
        let entry = KeyEntry::from_resource_id(reader.read_u32()?);
        if entry.bif_index >= files.len() {
            return Err(ArchiveError::InvalidEntry(format!(
                "{name} references data file #{}, the index lists {}",
                entry.bif_index,
                files.len()
            )));
        }
        let Some(kind) = ResourceType::from_id(kind) else {
            debug!(%name, kind, "Skipping entry of unknown resource type");
            continue;
        };
        keys.entry(ResourceId::new(&name, kind)).or_insert(entry);
    }

    Ok((files, keys))
}

impl ResourceProvider for KeyArchive {
    fn contains(&self, id: &ResourceId) -> bool {
        self.keys.contains_key(id)
    }

    fn read(&self, id: &ResourceId) -> Result<Option<ByteBuffer>, ArchiveError> {
        let Some(entry) = self.keys.get(id) else {
            return Ok(None);
        };
        let bif = self.bif(entry.bif_index)?;
        Ok(Some(bif.read_resource(entry.resource_index)?))
    }

    fn resource_ids(&self) -> Vec<ResourceId> {
        self.keys.keys().cloned().collect()
    }

    fn description(&self) -> String {
        self.path.display().to_string()
    }
}
