//! Loose files in a directory, such as `override`, `streammusic` or `lips`.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use super::{ArchiveError, ResourceProvider};
use crate::misc::resource_id::ResourceId;
use crate::misc::resource_type::ResourceType;
use crate::utils::read_file_paths;
use crate::ByteBuffer;

/// Indexes a directory once when mounted. Files added afterwards are not picked up.
pub struct FolderArchive {
    path: PathBuf,
    entries: IndexMap<ResourceId, PathBuf>,
}

impl FolderArchive {
    pub fn from_file(path: &Path) -> Result<Self, ArchiveError> {
        Self::from_directory(path, false)
    }

    /// Indexes every file with a known extension, descending into subdirectories when `recursive`.
    /// When two files map to the same id the one listed first, in path order, wins.
    pub fn from_directory(path: &Path, recursive: bool) -> Result<Self, ArchiveError> {
        let mut entries = IndexMap::new();
        for file in read_file_paths(path, recursive)? {
            let (Some(stem), Some(extension)) = (
                file.file_stem().and_then(|s| s.to_str()),
                file.extension().and_then(|e| e.to_str()),
            ) else {
                continue;
            };
            let Some(kind) = ResourceType::from_extension(extension) else {
                debug!(path = %file.display(), "Skipping file of unknown resource type");
                continue;
            };
            entries
                .entry(ResourceId::new(stem, kind))
                .or_insert(file);
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path_of(&self, id: &ResourceId) -> Option<&Path> {
        self.entries.get(id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceProvider for FolderArchive {
    fn contains(&self, id: &ResourceId) -> bool {
        self.entries.contains_key(id)
    }

    fn read(&self, id: &ResourceId) -> Result<Option<ByteBuffer>, ArchiveError> {
        match self.entries.get(id) {
            Some(path) => Ok(Some(fs::read(path)?)),
            None => Ok(None),
        }
    }

    fn resource_ids(&self) -> Vec<ResourceId> {
        self.entries.keys().cloned().collect()
    }

    fn description(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_directory() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("Appearance.2DA"), b"2DA V2.b")?;
        fs::write(dir.path().join("notes.unknownext"), b"?")?;
        fs::write(dir.path().join("a_rather_long_texture_name.tga"), b"tga")?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(dir.path().join("nested").join("deep.txt"), b"deep")?;

        let flat = FolderArchive::from_file(dir.path())?;
        assert_eq!(flat.len(), 2);
        let table = ResourceId::new("appearance", ResourceType::TwoDa);
        assert!(flat.contains(&table));
        assert_eq!(flat.read(&table)?, Some(b"2DA V2.b".to_vec()));
        assert!(flat.contains(&ResourceId::new(
            "a_rather_long_texture_name",
            ResourceType::Tga
        )));
        assert_eq!(flat.read(&ResourceId::new("deep", ResourceType::Txt))?, None);

        let recursive = FolderArchive::from_directory(dir.path(), true)?;
        assert_eq!(recursive.len(), 3);
        assert_eq!(
            recursive.read(&ResourceId::new("deep", ResourceType::Txt))?,
            Some(b"deep".to_vec())
        );
        Ok(())
    }

    #[test]
    fn test_missing_directory() {
        let result = FolderArchive::from_file(Path::new("/nonexistent/aurora/override"));
        assert!(matches!(result, Err(ArchiveError::IoError(_))));
    }
}
