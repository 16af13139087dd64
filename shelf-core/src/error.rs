use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every way opening or querying an ELF object can fail.
///
/// Structural problems with the identification, the file header and the two
/// header tables are reported by [`ObjectHandle::open`](crate::ObjectHandle::open).
/// Section and symbol problems surface on the first query that needs them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{} is not a regular file", path.display())]
    NotARegularFile { path: PathBuf },

    #[error("permission denied reading {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("failed to map or read {}", path.display())]
    MapOrReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bad ELF magic {found:02x?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("unsupported ELF class {0:#04x}")]
    UnsupportedClass(u8),

    #[error("unsupported ELF data encoding {0:#04x}")]
    UnsupportedEncoding(u8),

    #[error("file is {len} bytes, too short for a {needed}-byte ELF header")]
    TruncatedHeader { needed: usize, len: usize },

    #[error("{count} program headers of {entsize} bytes at {offset:#x} run past end of file ({len} bytes)")]
    TruncatedProgramHeaders {
        offset: u64,
        count: u64,
        entsize: u16,
        len: usize,
    },

    #[error("{count} section headers of {entsize} bytes at {offset:#x} run past end of file ({len} bytes)")]
    TruncatedSectionHeaders {
        offset: u64,
        count: u64,
        entsize: u16,
        len: usize,
    },

    #[error("{table} entry size is {found}, expected {expected}")]
    InvalidEntrySize {
        table: &'static str,
        expected: u16,
        found: u16,
    },

    #[error("PT_LOAD segment {index} file content runs past end of file")]
    SegmentOutOfBounds { index: usize },

    #[error("section {index} content runs past end of file")]
    SectionOutOfBounds { index: usize },

    #[error("section name string table (index {index}) is missing or out of bounds")]
    MissingStringTable { index: u32 },

    #[error("string offset {offset:#x} is outside its {table_size}-byte string table")]
    BadStringOffset { offset: u32, table_size: u64 },

    #[error("index {index} out of range (count is {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("{section} size {size:#x} is not a multiple of the {entsize}-byte symbol entry")]
    MalformedSymbolTable {
        section: String,
        size: u64,
        entsize: u64,
    },

    #[error("read of {width} bytes at offset {offset:#x} exceeds {len}-byte buffer")]
    OutOfBounds {
        offset: u64,
        width: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
