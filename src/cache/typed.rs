//! Caches for each decoded resource kind, all backed by a [`Resources`] chain.

use std::sync::Arc;

use tracing::debug;

use super::ResourceCache;
use crate::format::gff::Gff;
use crate::format::ltr::LetterTable;
use crate::format::tlk::TalkTable;
use crate::format::two_da::TwoDa;
use crate::misc::resource_id::ResourceId;
use crate::misc::resource_type::ResourceType;
use crate::resource::resources::{Resources, ResourcesError};
use crate::AuroraResource;

/// Fetches the bytes of `id` and decodes them as `R`. `None` when no archive holds `id`.
pub fn find_decoded<R: AuroraResource>(
    resources: &Resources,
    id: &ResourceId,
) -> Result<Option<R::Output>, ResourcesError> {
    let Some(data) = resources.find(id)? else {
        return Ok(None);
    };
    debug!(%id, size = data.len(), "Decoding resource");
    R::process_data(&data)
        .map(Some)
        .map_err(|source| ResourcesError::Decode {
            id: id.clone(),
            source,
        })
}

/// GFF trees of any GFF kind, keyed by resource id.
#[derive(Default)]
pub struct Gffs {
    cache: ResourceCache<ResourceId, Gff>,
}

impl Gffs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        resources: &Resources,
        name: &str,
        kind: ResourceType,
    ) -> Result<Option<Arc<Gff>>, ResourcesError> {
        self.get_by_id(resources, &ResourceId::new(name, kind))
    }

    pub fn get_by_id(
        &self,
        resources: &Resources,
        id: &ResourceId,
    ) -> Result<Option<Arc<Gff>>, ResourcesError> {
        self.cache
            .get_or_compute(id, |id| find_decoded::<Gff>(resources, id))
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Decoded resources of a single kind, keyed by name.
pub struct TypedCache<R: AuroraResource> {
    kind: ResourceType,
    cache: ResourceCache<String, R::Output>,
}

impl<R: AuroraResource> TypedCache<R> {
    pub fn new(kind: ResourceType) -> Self {
        Self {
            kind,
            cache: ResourceCache::new(),
        }
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    pub fn get(
        &self,
        resources: &Resources,
        name: &str,
    ) -> Result<Option<Arc<R::Output>>, ResourcesError> {
        let key = name.to_ascii_lowercase();
        self.cache.get_or_compute(&key, |key| {
            find_decoded::<R>(resources, &ResourceId::new(key, self.kind))
        })
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

pub type TwoDas = TypedCache<TwoDa>;
pub type TalkTables = TypedCache<TalkTable>;
pub type LetterTables = TypedCache<LetterTable>;

impl Default for TwoDas {
    fn default() -> Self {
        Self::new(ResourceType::TwoDa)
    }
}

impl Default for TalkTables {
    fn default() -> Self {
        Self::new(ResourceType::Tlk)
    }
}

impl Default for LetterTables {
    fn default() -> Self {
        Self::new(ResourceType::Ltr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::gff::FieldValue;
    use crate::format::gff_writer::GffWriter;
    use crate::resource::{ArchiveError, ResourceProvider};
    use crate::ByteBuffer;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts reads so tests can tell whether a cache went back to the archive.
    struct CountingArchive {
        entries: HashMap<ResourceId, ByteBuffer>,
        reads: Arc<AtomicUsize>,
    }

    impl ResourceProvider for CountingArchive {
        fn contains(&self, id: &ResourceId) -> bool {
            self.entries.contains_key(id)
        }

        fn read(&self, id: &ResourceId) -> Result<Option<ByteBuffer>, ArchiveError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.get(id).cloned())
        }

        fn resource_ids(&self) -> Vec<ResourceId> {
            self.entries.keys().cloned().collect()
        }

        fn description(&self) -> String {
            "counting".to_string()
        }
    }

    fn mount(entries: Vec<(ResourceId, ByteBuffer)>) -> (Resources, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut resources = Resources::new();
        resources.add(
            Box::new(CountingArchive {
                entries: entries.into_iter().collect(),
                reads: reads.clone(),
            }),
            false,
        );
        (resources, reads)
    }

    #[test]
    fn test_gff_get_or_compute() -> Result<(), Box<dyn std::error::Error>> {
        let creature = Gff::new(Gff::ROOT_STRUCT_TYPE).with("Tag", FieldValue::CExoString("bandit".into()));
        let (resources, reads) = mount(vec![(
            ResourceId::new("n_bandit", ResourceType::Utc),
            GffWriter::write(&creature, ResourceType::Utc)?,
        )]);

        let gffs = Gffs::new();
        let first = gffs.get(&resources, "N_Bandit", ResourceType::Utc)?;
        assert_eq!(first.as_deref(), Some(&creature));

        resources.invalidate_cache();
        let second = gffs.get(&resources, "n_bandit", ResourceType::Utc)?;
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(matches!((first, second), (Some(a), Some(b)) if Arc::ptr_eq(&a, &b)));

        assert!(gffs.get(&resources, "n_bandit", ResourceType::Uti)?.is_none());
        assert_eq!(gffs.len(), 2);
        gffs.clear();
        assert!(gffs.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_errors_name_the_resource() {
        let (resources, _) = mount(vec![(
            ResourceId::new("appearance", ResourceType::TwoDa),
            b"not a table".to_vec(),
        )]);

        let result = TwoDas::default().get(&resources, "appearance");
        assert!(matches!(
            result,
            Err(ResourcesError::Decode { ref id, .. }) if id.name() == "appearance"
        ));
    }
}
