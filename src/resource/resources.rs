//! The provider chain. Archives are consulted head first, so the most recently mounted archive
//! that holds an id determines its bytes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use super::erf::ErfArchive;
use super::exe::ExeArchive;
use super::folder::FolderArchive;
use super::key::KeyArchive;
use super::rim::RimArchive;
use super::{ArchiveError, ResourceProvider};
use crate::misc::resource_id::ResourceId;
use crate::{AuroraResourceError, ByteBuffer};

#[derive(Debug, Error)]
pub enum ResourcesError {
    #[error("resource {0} not found in any archive")]
    NotFound(ResourceId),

    #[error("failed to mount {}: {source}", .path.display())]
    Mount {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("failed to read {id} from {archive}: {source}")]
    Read {
        id: ResourceId,
        archive: String,
        #[source]
        source: ArchiveError,
    },

    #[error("failed to decode {id}: {source}")]
    Decode {
        id: ResourceId,
        #[source]
        source: AuroraResourceError,
    },
}

/// A mounted archive together with its mount id and lifetime flag.
pub struct Provider {
    id: u32,
    local: bool,
    archive: Box<dyn ResourceProvider>,
}

impl Provider {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether the archive belongs to the current module and goes away with [`Resources::clear_local`].
    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn archive(&self) -> &dyn ResourceProvider {
        self.archive.as_ref()
    }
}

type RawCache = HashMap<String, Option<Arc<ByteBuffer>>>;

/// Ordered archive chain plus a cache of raw bytes keyed by `name.extension`.
///
/// Lookups that miss every archive are cached as well and stay cached until
/// [`invalidate_cache`](Self::invalidate_cache), [`clear`](Self::clear) or
/// [`clear_local`](Self::clear_local) runs. Mounting an archive does not invalidate the cache.
#[derive(Default)]
pub struct Resources {
    providers: Vec<Provider>,
    next_id: u32,
    cache: Mutex<RawCache>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `archive` at the head of the chain and returns its mount id.
    pub fn add(&mut self, archive: Box<dyn ResourceProvider>, local: bool) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        let cached = self.cache().len();
        if cached > 0 {
            debug!(
                archive = %archive.description(),
                cached,
                "Mounting with a non-empty raw cache, cached misses may be stale"
            );
        }

        self.providers.insert(0, Provider { id, local, archive });
        id
    }

    pub fn add_key(&mut self, path: &Path, local: bool) -> Result<u32, ResourcesError> {
        self.mount(path, local, KeyArchive::from_file)
    }

    pub fn add_erf(&mut self, path: &Path, local: bool) -> Result<u32, ResourcesError> {
        self.mount(path, local, ErfArchive::from_file)
    }

    pub fn add_rim(&mut self, path: &Path, local: bool) -> Result<u32, ResourcesError> {
        self.mount(path, local, RimArchive::from_file)
    }

    pub fn add_folder(&mut self, path: &Path, local: bool) -> Result<u32, ResourcesError> {
        self.mount(path, local, FolderArchive::from_file)
    }

    /// Mounts a directory together with every subdirectory below it.
    pub fn add_folder_recursive(&mut self, path: &Path, local: bool) -> Result<u32, ResourcesError> {
        self.mount(path, local, |path| FolderArchive::from_directory(path, true))
    }

    pub fn add_exe(&mut self, path: &Path, local: bool) -> Result<u32, ResourcesError> {
        self.mount(path, local, ExeArchive::from_file)
    }

    fn mount<A, F>(&mut self, path: &Path, local: bool, open: F) -> Result<u32, ResourcesError>
    where
        A: ResourceProvider + 'static,
        F: FnOnce(&Path) -> Result<A, ArchiveError>,
    {
        let archive = open(path).map_err(|source| ResourcesError::Mount {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            entries = archive.resource_ids().len(),
            local,
            "Indexed archive"
        );
        Ok(self.add(Box::new(archive), local))
    }

    /// Resolves `id` to its bytes, or `None` when no mounted archive holds it.
    ///
    /// A failure to read from the archive that claims `id` is returned as an error, never treated
    /// as a miss, and is not cached.
    pub fn find(&self, id: &ResourceId) -> Result<Option<Arc<ByteBuffer>>, ResourcesError> {
        let key = id.cache_key();
        if let Some(cached) = self.cache().get(&key) {
            return Ok(cached.clone());
        }
        debug!(%key, "Raw cache miss");

        let data = self.resolve(id)?.map(Arc::new);
        if data.is_none() {
            debug!(%id, "Resource not found in any archive");
        }
        self.cache().insert(key, data.clone());
        Ok(data)
    }

    /// Like [`find`](Self::find), but a miss is an error.
    pub fn get(&self, id: &ResourceId) -> Result<Arc<ByteBuffer>, ResourcesError> {
        self.find(id)?
            .ok_or_else(|| ResourcesError::NotFound(id.clone()))
    }

    fn resolve(&self, id: &ResourceId) -> Result<Option<ByteBuffer>, ResourcesError> {
        for provider in self.providers.iter().filter(|p| p.archive.contains(id)) {
            let data = provider
                .archive
                .read(id)
                .map_err(|source| ResourcesError::Read {
                    id: id.clone(),
                    archive: provider.archive.description(),
                    source,
                })?;
            if data.is_some() {
                return Ok(data);
            }
        }
        Ok(None)
    }

    /// Drops every archive and the raw cache.
    pub fn clear(&mut self) {
        self.providers.clear();
        self.invalidate_cache();
    }

    /// Drops the archives mounted as local, keeping the order of the others, and the raw cache.
    pub fn clear_local(&mut self) {
        self.providers.retain(|provider| !provider.local);
        self.invalidate_cache();
    }

    pub fn invalidate_cache(&self) {
        self.cache().clear();
    }

    /// Mounted archives, head (highest priority) first.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Every id resolvable through the chain, in override order.
    pub fn resource_ids(&self) -> Vec<ResourceId> {
        self.providers
            .iter()
            .flat_map(|provider| provider.archive.resource_ids())
            .unique()
            .collect()
    }

    fn cache(&self) -> MutexGuard<'_, RawCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
