use goblin::elf::section_header::SHN_UNDEF;

use crate::header::ident::{Class, Identification};
use crate::reader::FieldReader;
use crate::sections::SectionIndex;
use crate::strtab::StringTable;
use crate::{Error, Result};

/// Which symbol table to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolSource {
    /// `.symtab` with names in `.strtab`. Absent from stripped binaries.
    Static,
    /// `.dynsym` with names in `.dynstr`.
    Dynamic,
}

impl SymbolSource {
    /// Symbol section and companion string table names.
    pub fn section_names(self) -> (&'static str, &'static str) {
        match self {
            SymbolSource::Static => (".symtab", ".strtab"),
            SymbolSource::Dynamic => (".dynsym", ".dynstr"),
        }
    }
}

/// How [`SymbolTable::by_value`] matches an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueMatch {
    /// `st_value == addr`.
    Exact,
    /// Nearest symbol at or below `addr`; offset is `addr - st_value`.
    Lower,
    /// Nearest symbol at or above `addr`; offset is `st_value - addr`.
    Higher,
}

/// A symbol table entry with its name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    index: usize,
    name: String,
    st_name: u32,
    st_info: u8,
    st_other: u8,
    st_shndx: u16,
    st_value: u64,
    st_size: u64,
}

impl Symbol {
    fn decode(cur: &mut FieldReader<'_>, index: usize) -> Result<Self> {
        let st_name = cur.u32()?;
        let (st_info, st_other, st_shndx, st_value, st_size) = match cur.class() {
            Class::Elf32 => {
                let st_value = cur.word()?;
                let st_size = cur.word()?;
                (cur.u8()?, cur.u8()?, cur.u16()?, st_value, st_size)
            }
            Class::Elf64 => (cur.u8()?, cur.u8()?, cur.u16()?, cur.word()?, cur.word()?),
        };

        Ok(Self {
            index,
            name: String::new(),
            st_name,
            st_info,
            st_other,
            st_shndx,
            st_value,
            st_size,
        })
    }

    /// Position in the symbol table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Empty when `st_name` is 0, as for section and null symbols.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn st_name(&self) -> u32 {
        self.st_name
    }

    pub fn st_info(&self) -> u8 {
        self.st_info
    }

    pub fn st_other(&self) -> u8 {
        self.st_other
    }

    pub fn st_shndx(&self) -> u16 {
        self.st_shndx
    }

    pub fn value(&self) -> u64 {
        self.st_value
    }

    pub fn size(&self) -> u64 {
        self.st_size
    }

    /// `STB_*` binding, the high nibble of `st_info`.
    pub fn bind(&self) -> u8 {
        self.st_info >> 4
    }

    /// `STT_*` type, the low nibble of `st_info`.
    pub fn kind(&self) -> u8 {
        self.st_info & 0xf
    }

    /// `STV_*` visibility, the low two bits of `st_other`.
    pub fn visibility(&self) -> u8 {
        self.st_other & 0x3
    }

    pub fn has_name(&self) -> bool {
        self.st_name != 0
    }

    /// Defined in some section of this object (`st_shndx != SHN_UNDEF`).
    pub fn is_defined(&self) -> bool {
        u32::from(self.st_shndx) != SHN_UNDEF
    }
}

/// A decoded symbol table, in on-disk order.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    source: SymbolSource,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Loads the table named by `source`.
    ///
    /// A missing symbol section or string table yields an empty table: stripped
    /// binaries legitimately carry neither.
    pub(crate) fn load(
        data: &[u8],
        ident: &Identification,
        sections: &SectionIndex,
        source: SymbolSource,
    ) -> Result<Self> {
        let (sym_name, str_name) = source.section_names();
        let (Some(symtab), Some(strtab)) = (sections.by_name(sym_name), sections.by_name(str_name))
        else {
            log::info!("{sym_name}/{str_name} not found; no {source:?} symbols");
            return Ok(Self {
                source,
                symbols: Vec::new(),
            });
        };

        let entsize = ident.class().symbol_size();
        if symtab.size() % entsize != 0 {
            return Err(Error::MalformedSymbolTable {
                section: sym_name.to_string(),
                size: symtab.size(),
                entsize,
            });
        }

        // A NOBITS symbol section has a size but no bytes behind it.
        let sym_data = symtab.header().bytes(data);
        if symtab.header().is_nobits() || sym_data.len() as u64 != symtab.size() {
            return Err(Error::SectionOutOfBounds {
                index: symtab.index(),
            });
        }
        let names = StringTable::new(strtab.header().bytes(data));
        let count = symtab.size() / entsize;

        let mut symbols = Vec::with_capacity(sym_data.len() / entsize as usize);
        for i in 0..count {
            let mut cur = FieldReader::new(sym_data, i * entsize, ident.endian(), ident.class());
            let mut symbol = Symbol::decode(&mut cur, i as usize)?;
            if symbol.has_name() {
                symbol.name = names.get(symbol.st_name)?;
            }
            symbols.push(symbol);
        }

        log::info!("Loaded {} symbols from {}", symbols.len(), sym_name);
        Ok(Self { source, symbols })
    }

    pub fn source(&self) -> SymbolSource {
        self.source
    }

    /// First symbol named `name`.
    pub fn by_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.has_name() && s.name == name)
    }

    /// Reverse lookup: the symbol describing `addr`, with the distance to it.
    ///
    /// Only named, defined symbols are candidates. Among equally close
    /// candidates the first in table order wins.
    pub fn by_value(&self, addr: u64, mode: ValueMatch) -> Option<(&Symbol, u64)> {
        let mut candidates = self
            .symbols
            .iter()
            .filter(|s| s.has_name() && s.is_defined());

        match mode {
            ValueMatch::Exact => candidates.find(|s| s.st_value == addr).map(|s| (s, 0)),
            ValueMatch::Lower => candidates
                .filter(|s| s.st_value <= addr)
                .fold(None, |best: Option<&Symbol>, s| match best {
                    Some(b) if b.st_value >= s.st_value => Some(b),
                    _ => Some(s),
                })
                .map(|s| (s, addr - s.st_value)),
            ValueMatch::Higher => candidates
                .filter(|s| s.st_value >= addr)
                .fold(None, |best: Option<&Symbol>, s| match best {
                    Some(b) if b.st_value <= s.st_value => Some(b),
                    _ => Some(s),
                })
                .map(|s| (s, s.st_value - addr)),
        }
    }

    pub fn list(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}
