pub mod json;
pub mod reader;
pub mod tags;
pub mod writer;

pub use json::{NcsfJson, SequenceReport};
pub use reader::NcsfFile;
pub use tags::{format_length, parse_length, TagList};
pub use writer::{build_ncsf, write_ncsf};

/// PSF version byte identifying NCSF
pub const NCSF_VERSION: u8 = 0x25;

/// Extension of the shared library file holding the SDAT
pub const LIB_EXTENSION: &str = "ncsflib";

/// Extension of the per-sequence files
pub const MINI_EXTENSION: &str = "minincsf";
