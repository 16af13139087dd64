//! Read-only decoding of ELF object files.
//!
//! [`ObjectHandle`] is the entry point: it owns the file image, decodes the
//! identification, file header and both header tables when opened, and builds
//! the named section index and symbol tables the first time they are queried.
//! Both ELF classes and both byte orders are supported, and every read is
//! bounds-checked against the image.

pub mod error;
pub mod header;
pub mod names;
pub mod object;
pub mod reader;
pub mod sections;
pub mod segments;
mod strtab;
pub mod symbols;

pub use error::{Error, Result};
pub use header::ident::{Class, Identification};
pub use header::FileHeader;
pub use object::*;
pub use reader::Endian;
pub use sections::*;
pub use segments::*;
pub use symbols::*;
