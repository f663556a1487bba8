//! The readelf-style pretty printer behind the `parse` function.

use scroll::ctx::SizeWith;
use scroll::Pread;

use crate::elf::gnu_hash::{GnuHashHeader, SIZEOF_GNU_HASH_HEADER};
use crate::elf::header::{et_to_str, machine_to_str};
use crate::elf::program_header::pt_to_str;
use crate::elf::reloc::{r_sym, r_type, Rel, Rela};
use crate::elf::section_header::{sht_to_str, SHT_REL, SHT_RELA};
use crate::elf::sym::{bind_to_str, st_bind, st_type, type_to_str};
use crate::elf::{dynamic, Elf};
use crate::error::Result;

/// One table of the file the printer can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Everything below
    All,
    /// The ELF header
    Headers,
    /// The section header table
    Sections,
    /// The program header table
    Segments,
    /// `.symtab`
    Symtab,
    /// `.dynsym`
    Dynsym,
    /// The dynamic array
    Link,
    /// Relocation sections
    Relocations,
    /// `.init_array` / `.fini_array` pointer arrays
    Pointers,
    /// The GNU hash table
    GnuHash,
}

/// Render the selected scopes to stdout.
pub fn dump(elf: &Elf, scopes: &[Scope]) -> Result<()> {
    let all = scopes.contains(&Scope::All);
    let wants = |scope| all || scopes.contains(&scope);
    if wants(Scope::Headers) {
        print_header(elf);
    }
    if wants(Scope::Sections) {
        print_sections(elf)?;
    }
    if wants(Scope::Segments) {
        print_segments(elf)?;
    }
    if wants(Scope::Symtab) {
        print_symbols(elf, false)?;
    }
    if wants(Scope::Dynsym) {
        print_symbols(elf, true)?;
    }
    if wants(Scope::Link) {
        print_dynamic(elf)?;
    }
    if wants(Scope::Relocations) {
        print_relocations(elf)?;
    }
    if wants(Scope::Pointers) {
        print_pointers(elf)?;
    }
    if wants(Scope::GnuHash) {
        print_gnu_hash(elf)?;
    }
    Ok(())
}

fn print_header(elf: &Elf) {
    let head = elf.header();
    println!("ELF Header:");
    println!("  Class:                             ELF{}", if elf.ctx().is_64() { 64 } else { 32 });
    println!("  Type:                              {}", et_to_str(head.e_type));
    println!("  Machine:                           {}", machine_to_str(head.e_machine));
    println!("  Version:                           0x{:x}", head.e_version);
    println!("  Entry point address:               0x{:x}", head.e_entry);
    println!("  Start of program headers:          {} (bytes into file)", head.e_phoff);
    println!("  Start of section headers:          {} (bytes into file)", head.e_shoff);
    println!("  Flags:                             0x{:x}", head.e_flags);
    println!("  Size of this header:               {} (bytes)", head.e_ehsize);
    println!("  Size of program headers:           {} (bytes)", head.e_phentsize);
    println!("  Number of program headers:         {}", head.e_phnum);
    println!("  Size of section headers:           {} (bytes)", head.e_shentsize);
    println!("  Number of section headers:         {}", head.e_shnum);
    println!("  Section header string table index: {}", head.e_shstrndx);
}

fn print_sections(elf: &Elf) -> Result<()> {
    println!("Section Headers:");
    println!(
        "  [Nr] {:<20} {:<16} {:>16} {:>8} {:>8} Flg Lk Inf Al",
        "Name", "Type", "Address", "Offset", "Size"
    );
    for i in 0..elf.shnum() {
        let shdr = elf.shdr(i)?;
        let name = elf.section_name(i).unwrap_or_default();
        println!(
            "  [{i:2}] {:<20} {:<16} {:>16x} {:>8x} {:>8x} {:>3x} {:>2} {:>3} {:>2}",
            name,
            sht_to_str(shdr.sh_type),
            shdr.sh_addr,
            shdr.sh_offset,
            shdr.sh_size,
            shdr.sh_flags,
            shdr.sh_link,
            shdr.sh_info,
            shdr.sh_addralign,
        );
    }
    Ok(())
}

fn print_segments(elf: &Elf) -> Result<()> {
    println!("Program Headers:");
    println!(
        "  [Nr] {:<16} {:>8} {:>16} {:>16} {:>8} {:>8} Flg {:>8}",
        "Type", "Offset", "VirtAddr", "PhysAddr", "FileSiz", "MemSiz", "Align"
    );
    for i in 0..elf.phnum() {
        let phdr = elf.phdr(i)?;
        let flags = format!(
            "{}{}{}",
            if phdr.p_flags & 4 != 0 { 'R' } else { ' ' },
            if phdr.p_flags & 2 != 0 { 'W' } else { ' ' },
            if phdr.p_flags & 1 != 0 { 'E' } else { ' ' },
        );
        println!(
            "  [{i:2}] {:<16} {:>8x} {:>16x} {:>16x} {:>8x} {:>8x} {flags} {:>8x}",
            pt_to_str(phdr.p_type),
            phdr.p_offset,
            phdr.p_vaddr,
            phdr.p_paddr,
            phdr.p_filesz,
            phdr.p_memsz,
            phdr.p_align,
        );
    }
    Ok(())
}

fn print_symbols(elf: &Elf, dynamic: bool) -> Result<()> {
    let (title, count) = if dynamic {
        (".dynsym", elf.dynsym_count())
    } else {
        (".symtab", elf.symtab_count())
    };
    println!("Symbol table '{title}' contains {count} entries:");
    println!(
        "  {:>4}: {:>16} {:>8} {:<8} {:<8} {:>4} Name",
        "Num", "Value", "Size", "Type", "Bind", "Ndx"
    );
    for i in 0..count {
        let (sym, name) = if dynamic {
            (elf.dynsym_at(i)?, elf.dynsym_name(i).unwrap_or_default())
        } else {
            (elf.symtab_at(i)?, elf.symtab_name(i).unwrap_or_default())
        };
        println!(
            "  {i:>4}: {:>16x} {:>8x} {:<8} {:<8} {:>4} {name}",
            sym.st_value,
            sym.st_size,
            type_to_str(st_type(sym.st_info)),
            bind_to_str(st_bind(sym.st_info)),
            sym.st_shndx,
        );
    }
    Ok(())
}

fn print_dynamic(elf: &Elf) -> Result<()> {
    println!("Dynamic section contains {} entries:", elf.dyn_count());
    println!("  {:>18}  {:<20} Value", "Tag", "Type");
    for i in 0..elf.dyn_count() {
        let entry = elf.dyn_at(i)?;
        println!(
            "  0x{:016x}  {:<20} 0x{:x}",
            entry.d_tag,
            dynamic::tag_to_str(entry.d_tag),
            entry.d_val
        );
        if entry.d_tag == dynamic::DT_NULL {
            break;
        }
    }
    Ok(())
}

fn print_relocations(elf: &Elf) -> Result<()> {
    for i in 0..elf.shnum() {
        let shdr = elf.shdr(i)?;
        if shdr.sh_type != SHT_RELA && shdr.sh_type != SHT_REL {
            continue;
        }
        let name = elf.section_name(i).unwrap_or_default();
        let with_addend = shdr.sh_type == SHT_RELA;
        let entry_size = if with_addend {
            Rela::size_with(&elf.ctx())
        } else {
            Rel::size_with(&elf.ctx())
        } as u64;
        let count = shdr.sh_size / entry_size;
        println!("Relocation section '{name}' contains {count} entries:");
        println!("  {:>16} {:>8} {:>8} {:>16} Symbol", "Offset", "Sym", "Type", "Addend");
        for j in 0..count {
            let at = (shdr.sh_offset + j * entry_size) as usize;
            let (offset, info, addend) = if with_addend {
                let r: Rela = elf.bytes().pread_with(at, elf.ctx())?;
                (r.r_offset, r.r_info, r.r_addend)
            } else {
                let r: Rel = elf.bytes().pread_with(at, elf.ctx())?;
                (r.r_offset, r.r_info, 0)
            };
            let sym = r_sym(info, elf.class()) as usize;
            let symbol = elf.dynsym_name(sym).unwrap_or_default();
            println!(
                "  {offset:>16x} {sym:>8} {:>8} {addend:>16x} {symbol}",
                r_type(info, elf.class()),
            );
        }
    }
    Ok(())
}

fn print_pointers(elf: &Elf) -> Result<()> {
    for table in [".init_array", ".fini_array"] {
        let Ok((_, shdr)) = elf.section_by_name(table) else {
            continue;
        };
        let width = elf.class().word_size() as u64;
        let count = shdr.sh_size / width;
        println!("Pointer array '{table}' contains {count} entries:");
        for i in 0..count {
            let value = elf.read_word(shdr.sh_offset + i * width)?;
            println!("  [{i:2}] 0x{value:x}");
        }
    }
    Ok(())
}

fn print_gnu_hash(elf: &Elf) -> Result<()> {
    let (_, shdr) = elf.section_by_name(".gnu.hash")?;
    let header: GnuHashHeader = elf
        .read_bytes(shdr.sh_offset, SIZEOF_GNU_HASH_HEADER as u64)?
        .pread_with(0, elf.ctx().le)?;
    println!("GNU hash table:");
    println!("  nbuckets: {}", header.nbuckets);
    println!("  symndx:   {}", header.symndx);
    println!("  maskbits: {}", header.maskbits);
    println!("  shift:    {}", header.shift);
    let word = elf.class().word_size() as u64;
    let buckets_off = shdr.sh_offset + SIZEOF_GNU_HASH_HEADER as u64 + header.maskbits as u64 * word;
    for i in 0..header.nbuckets as u64 {
        let bucket: u32 = elf.bytes().pread_with((buckets_off + i * 4) as usize, elf.ctx().le)?;
        println!("  bucket[{i}] = {bucket}");
    }
    Ok(())
}
