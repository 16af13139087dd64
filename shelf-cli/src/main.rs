use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use shelf_core::names;
use shelf_core::{ObjectHandle, SymbolSource, ValueMatch};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// ELF object inspector
#[derive(Parser)]
#[command(
    name = "shelf",
    about = "Inspect ELF objects (header, segments, sections and symbols)",
    version,
    author
)]
struct Cli {
    /// Path to ELF file
    #[arg(required = true)]
    path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the identification and file header
    Header {
        #[arg(long)]
        json: bool,
    },
    /// List program headers
    Segments {
        #[arg(long)]
        json: bool,
    },
    /// List all sections
    Sections {
        #[arg(long)]
        json: bool,
    },
    /// List symbols from .symtab, or .dynsym with --dynamic
    Symbols {
        #[arg(long)]
        dynamic: bool,
        #[arg(long)]
        json: bool,
    },
    /// Find the section and nearest symbol for an address
    Lookup {
        /// Address, hex with 0x prefix or decimal
        #[arg(value_parser = parse_addr)]
        addr: u64,
        #[arg(long)]
        json: bool,
    },
}

fn parse_addr(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn hex(v: u64) -> String {
    format!("0x{v:x}")
}

#[derive(Serialize)]
struct HeaderReport {
    class: String,
    data: String,
    version: String,
    osabi: String,
    abi_version: u8,
    file_type: String,
    machine: String,
    entry: u64,
    phoff: u64,
    shoff: u64,
    flags: u32,
    ehsize: u16,
    phentsize: u16,
    phnum: usize,
    shentsize: u16,
    shnum: usize,
    shstrndx: u32,
}

#[derive(Tabled, Serialize)]
struct SegmentRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Offset")]
    offset: String,
    #[tabled(rename = "VirtAddr")]
    vaddr: String,
    #[tabled(rename = "PhysAddr")]
    paddr: String,
    #[tabled(rename = "FileSiz")]
    filesz: String,
    #[tabled(rename = "MemSiz")]
    memsz: String,
    #[tabled(rename = "Flg")]
    flags: String,
    #[tabled(rename = "Align")]
    align: String,
}

#[derive(Tabled, Serialize)]
struct SectionRow {
    #[tabled(rename = "Nr")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Address")]
    addr: String,
    #[tabled(rename = "Offset")]
    offset: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

#[derive(Tabled, Serialize)]
struct SymbolRow {
    #[tabled(rename = "Num")]
    index: usize,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Size")]
    size: u64,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Bind")]
    bind: String,
    #[tabled(rename = "Vis")]
    visibility: String,
    #[tabled(rename = "Ndx")]
    shndx: u16,
    #[tabled(rename = "Name")]
    name: String,
}

#[derive(Serialize)]
struct LookupReport {
    addr: u64,
    section: Option<String>,
    symbol: Option<String>,
    offset: Option<u64>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table<T: Tabled>(title: &str, rows: Vec<T>) {
    println!("{}", title.cyan().bold());
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
}

fn header_report(obj: &ObjectHandle) -> HeaderReport {
    let ident = obj.ident();
    HeaderReport {
        class: names::class_str(ident.class().raw()).into_owned(),
        data: names::data_encoding_str(ident.data_encoding()).into_owned(),
        version: names::elf_version_str(u32::from(ident.version())).into_owned(),
        osabi: names::osabi_str(ident.osabi()).into_owned(),
        abi_version: ident.abi_version(),
        file_type: names::file_type_str(obj.file_type()).into_owned(),
        machine: names::machine_str(obj.machine()).into_owned(),
        entry: obj.entry(),
        phoff: obj.phoff(),
        shoff: obj.shoff(),
        flags: obj.flags(),
        ehsize: obj.ehsize(),
        phentsize: obj.phentsize(),
        phnum: obj.segment_count(),
        shentsize: obj.shentsize(),
        shnum: obj.section_count(),
        shstrndx: obj.section_name_table_index(),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let obj = ObjectHandle::open(&cli.path)
        .with_context(|| format!("failed to open {}", cli.path.display()))?;
    log::info!(
        "Opened {}: {} segments, {} sections",
        cli.path.display(),
        obj.segment_count(),
        obj.section_count()
    );

    match cli.command {
        Command::Header { json } => {
            let report = header_report(&obj);
            if json {
                return print_json(&report);
            }
            println!("{}", "[ ELF HEADER ]".cyan().bold());
            println!("  {:<28} {}", "Class:", report.class);
            println!("  {:<28} {}", "Data:", report.data);
            println!("  {:<28} {}", "Version:", report.version);
            println!("  {:<28} {}", "OS/ABI:", report.osabi);
            println!("  {:<28} {}", "ABI Version:", report.abi_version);
            println!("  {:<28} {}", "Type:", report.file_type);
            println!("  {:<28} {}", "Machine:", report.machine);
            println!("  {:<28} {}", "Entry point address:", hex(report.entry));
            println!("  {:<28} {}", "Start of program headers:", report.phoff);
            println!("  {:<28} {}", "Start of section headers:", report.shoff);
            println!("  {:<28} {}", "Flags:", hex(u64::from(report.flags)));
            println!("  {:<28} {}", "Size of this header:", report.ehsize);
            println!("  {:<28} {}", "Size of program headers:", report.phentsize);
            println!("  {:<28} {}", "Number of program headers:", report.phnum);
            println!("  {:<28} {}", "Size of section headers:", report.shentsize);
            println!("  {:<28} {}", "Number of section headers:", report.shnum);
            println!("  {:<28} {}", "Section name table index:", report.shstrndx);
        }

        Command::Segments { json } => {
            let rows: Vec<SegmentRow> = obj
                .program_headers()
                .iter()
                .map(|p| SegmentRow {
                    kind: names::phdr_type_str(p.p_type).into_owned(),
                    offset: hex(p.p_offset),
                    vaddr: hex(p.p_vaddr),
                    paddr: hex(p.p_paddr),
                    filesz: hex(p.p_filesz),
                    memsz: hex(p.p_memsz),
                    flags: names::phdr_flags_str(p.p_flags),
                    align: hex(p.p_align),
                })
                .collect();
            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No program headers.");
            } else {
                print_table("[ PROGRAM HEADERS ]", rows);
            }
        }

        Command::Sections { json } => {
            let sections = obj.all_sections()?;
            let rows: Vec<SectionRow> = sections
                .iter()
                .map(|s| SectionRow {
                    index: s.index(),
                    name: s.name().to_string(),
                    kind: names::shdr_type_str(s.sh_type()).into_owned(),
                    addr: hex(s.addr()),
                    offset: hex(s.offset()),
                    size: hex(s.size()),
                    flags: names::shdr_flags_str(s.flags()),
                })
                .collect();
            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No sections found.");
            } else {
                print_table("[ SECTION HEADERS ]", rows);
            }
        }

        Command::Symbols { dynamic, json } => {
            let source = if dynamic {
                SymbolSource::Dynamic
            } else {
                SymbolSource::Static
            };
            let table = obj.symbols(source)?;
            let rows: Vec<SymbolRow> = table
                .iter()
                .map(|s| SymbolRow {
                    index: s.index(),
                    value: hex(s.value()),
                    size: s.size(),
                    kind: names::symbol_type_str(s.kind()).into_owned(),
                    bind: names::symbol_bind_str(s.bind()).into_owned(),
                    visibility: names::symbol_visibility_str(s.visibility()).into_owned(),
                    shndx: s.st_shndx(),
                    name: s.name().to_string(),
                })
                .collect();
            if json {
                return print_json(&rows);
            }
            let (sym_name, _) = source.section_names();
            if rows.is_empty() {
                println!("No symbols in {sym_name} (missing or stripped).");
            } else {
                print_table(&format!("[ SYMBOLS: {sym_name} ]"), rows);
            }
        }

        Command::Lookup { addr, json } => {
            let section = obj.section_containing_address(addr)?;
            let symbol = obj.symbol_by_value(addr, ValueMatch::Lower)?;
            let report = LookupReport {
                addr,
                section: section.map(|s| s.name().to_string()),
                symbol: symbol.map(|(s, _)| s.name().to_string()),
                offset: symbol.map(|(_, off)| off),
            };
            if json {
                return print_json(&report);
            }
            if report.section.is_none() && report.symbol.is_none() {
                bail!("{} is not inside any section or symbol", hex(addr));
            }
            let section = report.section.as_deref().unwrap_or("<none>");
            match (&report.symbol, report.offset) {
                (Some(name), Some(0)) => println!("{}: {} in {}", hex(addr), name.green(), section),
                (Some(name), Some(off)) => {
                    println!("{}: {}+{} in {}", hex(addr), name.green(), hex(off), section)
                }
                _ => println!("{}: {} in {}", hex(addr), "<no symbol>".yellow(), section),
            }
        }
    }

    obj.close();
    Ok(())
}
