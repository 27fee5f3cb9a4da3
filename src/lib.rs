//! `aurora-rs` resolves typed resource identifiers to raw bytes across the archive formats used by
//! Aurora/Odyssey engine games (Knights of the Old Republic and its sequel), and decodes the generic
//! structured formats stored inside them.
//!
//! With aurora-rs, you can:
//!
//! - Mount KEY/BIF pairs, ERF/MOD/SAV archives, RIM archives, loose-file directories and the
//!   resource section of the game executable.
//! - Chain those archives in override order inside a [`resource::resources::Resources`] aggregator
//!   that caches raw bytes and drops module-scoped archives in bulk.
//! - Decode GFF trees, 2DA tables, talk tables and name-generator letter tables, memoized per kind
//!   by the caches in [`cache`].
//! - Let a [`resource::director::ResourceDirector`] mount the global archives of an install once and
//!   swap module archives on every module transition.
//!
//! The crate is read-only: none of the archive formats can be written.

use thiserror::Error;

pub mod cache;
pub mod format;
pub mod misc;
pub mod resource;
pub mod utils;

pub use misc::resource_id::ResourceId;
pub use misc::resource_type::ResourceType;

/// Raw bytes of a single resource.
pub type ByteBuffer = Vec<u8>;

#[derive(Debug, Error)]
pub enum AuroraResourceError {
    #[error("GFF error: {0}")]
    Gff(#[from] format::gff::GffError),

    #[error("2DA error: {0}")]
    TwoDa(#[from] format::two_da::TwoDaError),

    #[error("talk table error: {0}")]
    TalkTable(#[from] format::tlk::TalkTableError),

    #[error("letter table error: {0}")]
    LetterTable(#[from] format::ltr::LetterTableError),
}

/// A resource kind that can be decoded from the raw bytes of an archive entry.
///
/// Typed caches use this to turn the bytes returned by
/// [`Resources::find`](resource::resources::Resources::find) into a decoded value.
pub trait AuroraResource {
    type Output;

    fn process_data(data: &[u8]) -> Result<Self::Output, AuroraResourceError>;
}
