//! Decoders for the structured resource formats stored inside archives.

pub mod gff;
pub mod gff_reader;
pub mod gff_writer;
pub mod ltr;
pub mod tlk;
pub mod two_da;
