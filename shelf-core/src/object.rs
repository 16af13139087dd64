use std::fmt;
use std::fs::{self, File};
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use goblin::elf::section_header::SHN_XINDEX;
use memmap::{Mmap, MmapOptions};
use once_cell::sync::OnceCell;

use crate::header::ident::{Class, Identification};
use crate::header::FileHeader;
use crate::reader::{span_fits, Endian};
use crate::sections::{self, Section, SectionHeader, SectionIndex};
use crate::segments::{self, ProgramHeader};
use crate::symbols::{Symbol, SymbolSource, SymbolTable, ValueMatch};
use crate::{Error, Result};

/// `e_phnum` value meaning the real count is in `sh_info` of section 0.
const PN_XNUM: u16 = 0xffff;

/// The complete file contents every decoded structure indexes into.
pub enum RawImage {
    Mapped(Mmap),
    Loaded(Vec<u8>),
}

impl RawImage {
    pub fn is_mapped(&self) -> bool {
        matches!(self, RawImage::Mapped(_))
    }
}

impl Deref for RawImage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            RawImage::Mapped(map) => map,
            RawImage::Loaded(buf) => buf,
        }
    }
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_mapped() { "Mapped" } else { "Loaded" };
        write!(f, "{kind}({} bytes)", self.len())
    }
}

/// An opened ELF object.
///
/// `open` decodes the identification, the file header and both header tables
/// up front and fails without handing back a partial handle. The section
/// index and the symbol tables are built on first use and cached until the
/// handle is closed or dropped.
///
/// Lazy tables are filled through [`OnceCell`], so queries only need `&self`.
/// Call [`ObjectHandle::resolve_all`] before sharing a handle to make every
/// later query a plain read that cannot fail on lazy decoding.
#[derive(Debug)]
pub struct ObjectHandle {
    path: Option<PathBuf>,
    image: RawImage,
    ident: Identification,
    header: FileHeader,
    shstrndx: u32,
    program_headers: Vec<ProgramHeader>,
    section_headers: Vec<SectionHeader>,
    sections: OnceCell<SectionIndex>,
    symtab: OnceCell<SymbolTable>,
    dynsym: OnceCell<SymbolTable>,
}

fn classify_io(path: &Path, source: io::Error) -> Error {
    if source.kind() == io::ErrorKind::PermissionDenied {
        Error::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        Error::MapOrReadFailed {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ObjectHandle {
    /// Maps the regular file at `path` and decodes its headers.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|e| classify_io(path, e))?;
        if !meta.is_file() {
            return Err(Error::NotARegularFile {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(|e| classify_io(path, e))?;
        // A zero-length mapping is rejected by mmap(2); there is nothing to map.
        let image = if meta.len() == 0 {
            RawImage::Loaded(Vec::new())
        } else {
            // SAFETY: the mapping is private and read-only. Truncating the file
            // underneath it while the handle lives is outside our control, as
            // for any mmap-based reader.
            let map = unsafe { MmapOptions::new().map(&file) }.map_err(|source| {
                Error::MapOrReadFailed {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            RawImage::Mapped(map)
        };
        log::debug!("Mapped {} ({} bytes)", path.display(), image.len());

        Self::decode(Some(path.to_path_buf()), image)
    }

    /// Decodes an object already held in memory.
    pub fn from_buffer(buf: Vec<u8>) -> Result<Self> {
        log::debug!("Loaded {} byte buffer", buf.len());
        Self::decode(None, RawImage::Loaded(buf))
    }

    fn decode(path: Option<PathBuf>, image: RawImage) -> Result<Self> {
        let data: &[u8] = &image;

        let ident = Identification::parse(data)?;
        let header = FileHeader::decode(data, &ident)?;
        log::debug!(
            "Header decoded: {:?} {:?}, type {}, machine {}",
            ident.class(),
            ident.endian(),
            header.e_type,
            header.e_machine
        );

        let (phnum, shnum, shstrndx) = effective_counts(data, &ident, &header)?;
        let program_headers =
            segments::decode_table(data, &ident, header.e_phoff, phnum, header.e_phentsize)?;
        let section_headers =
            sections::decode_table(data, &ident, header.e_shoff, shnum, header.e_shentsize)?;

        if section_headers.is_empty() {
            log::warn!("No section headers; only segments are available");
        }
        log::debug!(
            "Tables decoded: {} segments, {} sections",
            program_headers.len(),
            section_headers.len()
        );

        Ok(Self {
            path,
            image,
            ident,
            header,
            shstrndx,
            program_headers,
            section_headers,
            sections: OnceCell::new(),
            symtab: OnceCell::new(),
            dynsym: OnceCell::new(),
        })
    }

    /// Releases the image and every decoded table.
    ///
    /// Taking `self` by value means nothing borrowed from the handle can be
    /// used afterwards, and a second close does not compile.
    pub fn close(self) {
        log::debug!(
            "Closed {}",
            self.path
                .as_deref()
                .map_or_else(|| "<buffer>".into(), |p| p.display().to_string())
        );
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn is_mapped(&self) -> bool {
        self.image.is_mapped()
    }

    // Header accessors

    pub fn ident(&self) -> &Identification {
        &self.ident
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn class(&self) -> Class {
        self.ident.class()
    }

    pub fn data_encoding(&self) -> Endian {
        self.ident.endian()
    }

    pub fn osabi(&self) -> u8 {
        self.ident.osabi()
    }

    pub fn abi_version(&self) -> u8 {
        self.ident.abi_version()
    }

    pub fn file_type(&self) -> u16 {
        self.header.e_type
    }

    pub fn machine(&self) -> u16 {
        self.header.e_machine
    }

    pub fn version(&self) -> u32 {
        self.header.e_version
    }

    pub fn entry(&self) -> u64 {
        self.header.e_entry
    }

    pub fn flags(&self) -> u32 {
        self.header.e_flags
    }

    pub fn ehsize(&self) -> u16 {
        self.header.e_ehsize
    }

    pub fn phoff(&self) -> u64 {
        self.header.e_phoff
    }

    pub fn phnum(&self) -> u16 {
        self.header.e_phnum
    }

    pub fn phentsize(&self) -> u16 {
        self.header.e_phentsize
    }

    pub fn shoff(&self) -> u64 {
        self.header.e_shoff
    }

    pub fn shnum(&self) -> u16 {
        self.header.e_shnum
    }

    pub fn shentsize(&self) -> u16 {
        self.header.e_shentsize
    }

    pub fn shstrndx(&self) -> u16 {
        self.header.e_shstrndx
    }

    /// Program header count after undoing the `PN_XNUM` escape.
    pub fn segment_count(&self) -> usize {
        self.program_headers.len()
    }

    /// Section header count after undoing the `e_shnum == 0` escape.
    pub fn section_count(&self) -> usize {
        self.section_headers.len()
    }

    /// Name table index after undoing the `SHN_XINDEX` escape.
    pub fn section_name_table_index(&self) -> u32 {
        self.shstrndx
    }

    // Segments

    pub fn program_headers(&self) -> &[ProgramHeader] {
        &self.program_headers
    }

    pub fn segment(&self, index: usize) -> Result<&ProgramHeader> {
        self.program_headers
            .get(index)
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.program_headers.len(),
            })
    }

    /// File bytes of a segment, `p_filesz` long.
    pub fn segment_data(&self, phdr: &ProgramHeader) -> &[u8] {
        if !span_fits(self.image.len(), phdr.p_offset, phdr.p_filesz) {
            return &[];
        }
        let start = phdr.p_offset as usize;
        &self.image[start..start + phdr.p_filesz as usize]
    }

    // Sections

    pub fn section_headers(&self) -> &[SectionHeader] {
        &self.section_headers
    }

    /// The section index, built on first call.
    pub fn sections(&self) -> Result<&SectionIndex> {
        self.sections.get_or_try_init(|| {
            SectionIndex::build(&self.image, &self.section_headers, self.shstrndx)
        })
    }

    pub fn section_by_name(&self, name: &str) -> Result<Option<&Section>> {
        Ok(self.sections()?.by_name(name))
    }

    pub fn section_by_index(&self, index: usize) -> Result<&Section> {
        self.sections()?.by_index(index)
    }

    pub fn sections_by_type(&self, sh_type: u32) -> Result<Vec<&Section>> {
        Ok(self.sections()?.by_type(sh_type))
    }

    pub fn section_containing_address(&self, addr: u64) -> Result<Option<&Section>> {
        Ok(self.sections()?.containing_address(addr))
    }

    pub fn section_containing_file_offset(&self, offset: u64) -> Result<Option<&Section>> {
        Ok(self.sections()?.containing_file_offset(offset))
    }

    pub fn all_sections(&self) -> Result<&[Section]> {
        Ok(self.sections()?.list())
    }

    pub fn last_section(&self) -> Result<Option<&Section>> {
        Ok(self.sections()?.last())
    }

    /// File bytes of a section; empty for `SHT_NOBITS`.
    pub fn section_data(&self, section: &Section) -> &[u8] {
        section.header().bytes(&self.image)
    }

    // Symbols

    /// The symbol table for `source`, loaded on first call.
    pub fn symbols(&self, source: SymbolSource) -> Result<&SymbolTable> {
        let cell = match source {
            SymbolSource::Static => &self.symtab,
            SymbolSource::Dynamic => &self.dynsym,
        };
        cell.get_or_try_init(|| {
            let sections = self.sections()?;
            SymbolTable::load(&self.image, &self.ident, sections, source)
        })
    }

    /// Looks `name` up in `.symtab`.
    pub fn symbol_by_name(&self, name: &str) -> Result<Option<&Symbol>> {
        Ok(self.symbols(SymbolSource::Static)?.by_name(name))
    }

    /// Reverse lookup of `addr` in `.symtab`, with the offset from the match.
    pub fn symbol_by_value(&self, addr: u64, mode: ValueMatch) -> Result<Option<(&Symbol, u64)>> {
        Ok(self.symbols(SymbolSource::Static)?.by_value(addr, mode))
    }

    /// Every `.symtab` entry; empty for stripped objects.
    pub fn all_symbols(&self) -> Result<&[Symbol]> {
        Ok(self.symbols(SymbolSource::Static)?.list())
    }

    /// Builds every lazy table now, reporting the first failure.
    pub fn resolve_all(&self) -> Result<()> {
        self.sections()?;
        self.symbols(SymbolSource::Static)?;
        self.symbols(SymbolSource::Dynamic)?;
        Ok(())
    }
}

/// Program header count, section header count and name table index, with the
/// large-count escapes stored in section header 0 undone.
fn effective_counts(
    data: &[u8],
    ident: &Identification,
    header: &FileHeader,
) -> Result<(u64, u64, u32)> {
    let mut phnum = u64::from(header.e_phnum);
    let mut shnum = u64::from(header.e_shnum);
    let mut shstrndx = u32::from(header.e_shstrndx);

    let escaped = header.e_shnum == 0 || header.e_phnum == PN_XNUM || shstrndx == SHN_XINDEX;
    if header.e_shoff != 0 && escaped {
        let first = sections::decode_first(data, ident, header.e_shoff, header.e_shentsize)?;
        if header.e_shnum == 0 {
            shnum = first.sh_size;
        }
        if header.e_phnum == PN_XNUM {
            phnum = u64::from(first.sh_info);
        }
        if shstrndx == SHN_XINDEX {
            shstrndx = first.sh_link;
        }
        log::debug!(
            "Escaped counts from section 0: {} segments, {} sections, names in {}",
            phnum,
            shnum,
            shstrndx
        );
    }

    Ok((phnum, shnum, shstrndx))
}
