//! Universal lookup key for resources: a resource name (resref) paired with a [`ResourceType`].

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::resource_type::ResourceType;

/// Longest resource name that fits into the fixed-size name fields of KEY, ERF and RIM tables.
pub const MAX_RESREF_LENGTH: usize = 16;

#[derive(Error, Debug)]
pub enum ResourceIdError {
    #[error("{0} has no extension")]
    MissingExtension(String),

    #[error("unknown resource extension: {0}")]
    UnknownExtension(String),
}

/// Identifies a resource by name and kind.
///
/// The name is compared case-insensitively: it is stored lower-cased, so `Foo` and `foo` of the
/// same kind are equal and hash identically.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceId {
    name: String,
    kind: ResourceType,
}

impl ResourceId {
    pub fn new(name: &str, kind: ResourceType) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    /// Whether the name fits into the name fields of the binary archive formats.
    pub fn is_valid_resref(&self) -> bool {
        self.name.len() <= MAX_RESREF_LENGTH
    }

    /// The `name.extension` form, used as the key of the raw byte cache.
    pub fn cache_key(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension())
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, extension) = s
            .rsplit_once('.')
            .ok_or_else(|| ResourceIdError::MissingExtension(s.to_string()))?;
        let kind = ResourceType::from_extension(extension)
            .ok_or_else(|| ResourceIdError::UnknownExtension(extension.to_string()))?;
        Ok(Self::new(name, kind))
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}
