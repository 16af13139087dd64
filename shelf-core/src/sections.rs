use goblin::elf::section_header::{
    SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHN_UNDEF, SHT_NOBITS, SHT_STRTAB,
};

use crate::header::ident::Identification;
use crate::reader::{span_fits, FieldReader};
use crate::strtab::StringTable;
use crate::{Error, Result};

/// One section header, widened to 64-bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    /// Offset of the name in the section name string table.
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    /// Size of each entry for table sections (symbols, relocations), else 0.
    pub sh_entsize: u64,
}

impl SectionHeader {
    fn decode(cur: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            sh_name: cur.u32()?,
            sh_type: cur.u32()?,
            sh_flags: cur.word()?,
            sh_addr: cur.word()?,
            sh_offset: cur.word()?,
            sh_size: cur.word()?,
            sh_link: cur.u32()?,
            sh_info: cur.u32()?,
            sh_addralign: cur.word()?,
            sh_entsize: cur.word()?,
        })
    }

    /// `SHT_NOBITS` sections (`.bss`, `.tbss`) occupy no bytes in the file.
    pub fn is_nobits(&self) -> bool {
        self.sh_type == SHT_NOBITS
    }

    pub fn has_flag(&self, flag: u64) -> bool {
        self.sh_flags & flag != 0
    }

    /// Whether the section's file content lies inside a `len`-byte image.
    pub(crate) fn fits_in(&self, len: usize) -> bool {
        self.is_nobits() || span_fits(len, self.sh_offset, self.sh_size)
    }

    /// The section's bytes within `data`; empty for `SHT_NOBITS` or when the
    /// content does not fit.
    pub(crate) fn bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        if self.is_nobits() || !span_fits(data.len(), self.sh_offset, self.sh_size) {
            return &[];
        }
        let start = self.sh_offset as usize;
        &data[start..start + self.sh_size as usize]
    }
}

/// Reads only section header 0, where escaped counts live.
pub(crate) fn decode_first(
    data: &[u8],
    ident: &Identification,
    offset: u64,
    entsize: u16,
) -> Result<SectionHeader> {
    let expected = ident.class().section_header_size();
    if !span_fits(data.len(), offset, u64::from(expected)) {
        return Err(Error::TruncatedSectionHeaders {
            offset,
            count: 1,
            entsize,
            len: data.len(),
        });
    }
    SectionHeader::decode(&mut FieldReader::new(
        data,
        offset,
        ident.endian(),
        ident.class(),
    ))
}

/// Decodes `count` section headers of `entsize` bytes starting at `offset`.
pub(crate) fn decode_table(
    data: &[u8],
    ident: &Identification,
    offset: u64,
    count: u64,
    entsize: u16,
) -> Result<Vec<SectionHeader>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if entsize == 0 {
        return Err(Error::InvalidEntrySize {
            table: "section header",
            expected: ident.class().section_header_size(),
            found: 0,
        });
    }

    let fits = count
        .checked_mul(u64::from(entsize))
        .is_some_and(|size| span_fits(data.len(), offset, size));
    if !fits {
        return Err(Error::TruncatedSectionHeaders {
            offset,
            count,
            entsize,
            len: data.len(),
        });
    }

    let table = (0..count)
        .map(|i| {
            let at = offset + i * u64::from(entsize);
            SectionHeader::decode(&mut FieldReader::new(
                data,
                at,
                ident.endian(),
                ident.class(),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    log::debug!("Decoded {} section headers at {:#x}", table.len(), offset);
    Ok(table)
}

/// A section header paired with its resolved name and table position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    index: usize,
    name: String,
    header: SectionHeader,
}

impl Section {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &SectionHeader {
        &self.header
    }

    pub fn sh_type(&self) -> u32 {
        self.header.sh_type
    }

    pub fn flags(&self) -> u64 {
        self.header.sh_flags
    }

    pub fn addr(&self) -> u64 {
        self.header.sh_addr
    }

    pub fn offset(&self) -> u64 {
        self.header.sh_offset
    }

    pub fn size(&self) -> u64 {
        self.header.sh_size
    }

    pub fn is_alloc(&self) -> bool {
        self.header.has_flag(u64::from(SHF_ALLOC))
    }

    pub fn is_writable(&self) -> bool {
        self.header.has_flag(u64::from(SHF_WRITE))
    }

    pub fn is_executable(&self) -> bool {
        self.header.has_flag(u64::from(SHF_EXECINSTR))
    }

    /// Half-open `[sh_addr, sh_addr + sh_size)` containment.
    pub fn contains_address(&self, addr: u64) -> bool {
        addr >= self.addr() && addr - self.addr() < self.size()
    }

    /// Half-open `[sh_offset, sh_offset + sh_size)` containment. `SHT_NOBITS`
    /// sections have no file bytes and never contain an offset.
    pub fn contains_file_offset(&self, offset: u64) -> bool {
        !self.header.is_nobits()
            && offset >= self.offset()
            && offset - self.offset() < self.size()
    }
}

/// The name-resolved section list, in section header table order.
#[derive(Debug, Clone, Default)]
pub struct SectionIndex {
    sections: Vec<Section>,
}

impl SectionIndex {
    /// Resolves every name against the string table at `headers[shstrndx]`.
    pub(crate) fn build(data: &[u8], headers: &[SectionHeader], shstrndx: u32) -> Result<Self> {
        if headers.is_empty() {
            return Ok(Self::default());
        }

        let names = headers
            .get(shstrndx as usize)
            .filter(|_| shstrndx != SHN_UNDEF)
            .filter(|sh| !sh.is_nobits() && sh.fits_in(data.len()))
            .ok_or(Error::MissingStringTable { index: shstrndx })?;
        if names.sh_type != SHT_STRTAB {
            log::warn!(
                "Section name table {} has type {:#x}, not SHT_STRTAB",
                shstrndx,
                names.sh_type
            );
        }
        let strtab = StringTable::new(names.bytes(data));

        let mut sections = Vec::with_capacity(headers.len());
        for (index, header) in headers.iter().enumerate() {
            if !header.fits_in(data.len()) {
                return Err(Error::SectionOutOfBounds { index });
            }
            sections.push(Section {
                index,
                name: strtab.get(header.sh_name)?,
                header: *header,
            });
        }

        log::info!("Resolved {} section names", sections.len());
        Ok(Self { sections })
    }

    /// First section named `name`; duplicates later in the table are shadowed.
    pub fn by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn by_index(&self, index: usize) -> Result<&Section> {
        self.sections.get(index).ok_or(Error::IndexOutOfRange {
            index,
            count: self.sections.len(),
        })
    }

    pub fn by_type(&self, sh_type: u32) -> Vec<&Section> {
        self.sections
            .iter()
            .filter(|s| s.sh_type() == sh_type)
            .collect()
    }

    /// First section after the null section whose address range holds `addr`.
    pub fn containing_address(&self, addr: u64) -> Option<&Section> {
        self.sections
            .iter()
            .skip(1)
            .find(|s| s.contains_address(addr))
    }

    /// First section after the null section whose file range holds `offset`.
    pub fn containing_file_offset(&self, offset: u64) -> Option<&Section> {
        self.sections
            .iter()
            .skip(1)
            .find(|s| s.contains_file_offset(offset))
    }

    pub fn list(&self) -> &[Section] {
        &self.sections
    }

    pub fn last(&self) -> Option<&Section> {
        self.sections.last()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }
}

impl<'a> IntoIterator for &'a SectionIndex {
    type Item = &'a Section;
    type IntoIter = std::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goblin::elf::section_header::{SHT_NULL, SHT_PROGBITS};

    fn header(sh_name: u32, sh_type: u32, addr: u64, offset: u64, size: u64) -> SectionHeader {
        SectionHeader {
            sh_name,
            sh_type,
            sh_flags: 0,
            sh_addr: addr,
            sh_offset: offset,
            sh_size: size,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 1,
            sh_entsize: 0,
        }
    }

    /// 16 bytes of content followed by the name table.
    fn image() -> (Vec<u8>, Vec<SectionHeader>) {
        let mut data = vec![0xccu8; 16];
        data.extend_from_slice(b"\0.text\0.data\0.shstrtab\0");
        let headers = vec![
            header(0, SHT_NULL, 0, 0, 0),
            header(1, SHT_PROGBITS, 0x1000, 0, 8),
            header(7, SHT_PROGBITS, 0x1008, 8, 8),
            header(7, SHT_PROGBITS, 0x1008, 8, 8),
            header(13, SHT_STRTAB, 0, 16, 23),
        ];
        (data, headers)
    }

    #[test]
    fn resolves_names_in_table_order() {
        let (data, headers) = image();
        let index = SectionIndex::build(&data, &headers, 4).unwrap();
        let names: Vec<_> = index.iter().map(Section::name).collect();
        assert_eq!(names, ["", ".text", ".data", ".data", ".shstrtab"]);
        assert_eq!(index.last().unwrap().name(), ".shstrtab");
    }

    #[test]
    fn duplicate_names_resolve_to_first() {
        let (data, headers) = image();
        let index = SectionIndex::build(&data, &headers, 4).unwrap();
        assert_eq!(index.by_name(".data").unwrap().index(), 2);
        assert!(index.by_name(".bss").is_none());
        assert_eq!(index.by_type(SHT_PROGBITS).len(), 3);
        assert!(index.by_type(SHT_NOBITS).is_empty());
    }

    #[test]
    fn containment_is_half_open() {
        let (data, headers) = image();
        let index = SectionIndex::build(&data, &headers, 4).unwrap();
        assert_eq!(index.containing_address(0x1000).unwrap().name(), ".text");
        assert_eq!(index.containing_address(0x1008).unwrap().index(), 2);
        assert!(index.containing_address(0x1010).is_none());
        // the null section at offset 0 is never a match
        assert_eq!(index.containing_file_offset(0).unwrap().index(), 1);
        assert_eq!(index.containing_file_offset(16).unwrap().index(), 4);
    }

    #[test]
    fn out_of_range_index() {
        let (data, headers) = image();
        let index = SectionIndex::build(&data, &headers, 4).unwrap();
        assert!(index.by_index(4).is_ok());
        assert!(matches!(
            index.by_index(5),
            Err(Error::IndexOutOfRange { index: 5, count: 5 })
        ));
    }

    #[test]
    fn bad_name_table_index() {
        let (data, headers) = image();
        for shstrndx in [0, 5, 0xffff] {
            assert!(matches!(
                SectionIndex::build(&data, &headers, shstrndx),
                Err(Error::MissingStringTable { .. })
            ));
        }
        let mut past_end = headers.clone();
        past_end[4].sh_size = 0x100;
        assert!(matches!(
            SectionIndex::build(&data, &past_end, 4),
            Err(Error::MissingStringTable { index: 4 })
        ));
    }

    #[test]
    fn section_past_end_of_file() {
        let (data, mut headers) = image();
        headers[2].sh_size = 0x1000;
        assert!(matches!(
            SectionIndex::build(&data, &headers, 4),
            Err(Error::SectionOutOfBounds { index: 2 })
        ));

        headers[2].sh_type = SHT_NOBITS;
        let index = SectionIndex::build(&data, &headers, 4).unwrap();
        assert!(!index.by_index(2).unwrap().contains_file_offset(8));
    }

    #[test]
    fn no_sections_needs_no_name_table() {
        let index = SectionIndex::build(&[], &[], 0).unwrap();
        assert!(index.is_empty());
        assert!(index.last().is_none());
    }
}
