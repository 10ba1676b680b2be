//! ZIP container constants, record layouts, and low-level parsing.
//!
//! Only the subset of the format this crate writes and copies is modelled:
//! single-disk archives without Zip64 extensions or encryption, whose
//! entries are stored or deflated.

pub mod header;
pub mod parser;
pub(crate) mod reader;

pub use header::{CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader};
pub use parser::{find_eocd, read_central_directory};

/// Local file header signature (`PK\x03\x04`).
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Central directory file header signature (`PK\x01\x02`).
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;

/// End of central directory record signature (`PK\x05\x06`).
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

/// Zip64 end of central directory locator signature (`PK\x06\x07`).
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;

/// Maximum archive comment length.
pub const MAX_COMMENT_SIZE: usize = u16::MAX as usize;

/// General purpose flag bits.
pub mod flags {
    /// Entry content is encrypted.
    pub const ENCRYPTED: u16 = 1 << 0;
    /// CRC and sizes follow the data in a data descriptor.
    pub const DATA_DESCRIPTOR: u16 = 1 << 3;
    /// Name and comment are UTF-8.
    pub const UTF8: u16 = 1 << 11;
}

/// Compression method of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CompressionMethod {
    /// No compression.
    Stored,
    /// Raw DEFLATE.
    Deflate,
    /// Any other method id; can be listed and copied but not opened.
    Other(u16),
}

impl CompressionMethod {
    /// Maps a header method id.
    pub fn from_id(id: u16) -> Self {
        match id {
            0 => Self::Stored,
            8 => Self::Deflate,
            other => Self::Other(other),
        }
    }

    /// Returns the header method id.
    pub fn id(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflate => 8,
            Self::Other(id) => id,
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored => write!(f, "store"),
            Self::Deflate => write!(f, "deflate"),
            Self::Other(id) => write!(f, "method {id}"),
        }
    }
}
