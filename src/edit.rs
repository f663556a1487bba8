//! The coordinate-addressed field editor behind the `edit` function: a
//! scope picks the table, a row picks the entry, a column picks the field,
//! and the value is an integer or, for name columns, a string routed
//! through the string-table editor.

use crate::dump::Scope;
use crate::elf::Elf;
use crate::error::{Error, Result};

/// Apply one edit. `value` is the new integer value; `text` substitutes for
/// it on name-valued columns.
pub fn edit(
    elf: &mut Elf,
    scope: Scope,
    row: usize,
    column: usize,
    value: u64,
    text: Option<&str>,
) -> Result<()> {
    match scope {
        Scope::Headers => edit_header(elf, row, value),
        Scope::Sections => edit_section(elf, row, column, value, text),
        Scope::Segments => edit_segment(elf, row, column, value),
        Scope::Dynsym => edit_symbol(elf, true, row, column, value, text),
        Scope::Symtab => edit_symbol(elf, false, row, column, value, text),
        Scope::Link => edit_dynamic(elf, row, column, value, text),
        _ => Err(Error::Args("scope does not support editing".into())),
    }
}

fn edit_header(elf: &mut Elf, row: usize, value: u64) -> Result<()> {
    let mut head = elf.header();
    match row {
        0 => head.e_type = value as u16,
        1 => head.e_machine = value as u16,
        2 => head.e_version = value as u32,
        3 => head.e_entry = value,
        4 => head.e_phoff = value,
        5 => head.e_shoff = value,
        6 => head.e_flags = value as u32,
        7 => head.e_ehsize = value as u16,
        8 => head.e_phentsize = value as u16,
        9 => head.e_phnum = value as u16,
        10 => head.e_shentsize = value as u16,
        11 => head.e_shnum = value as u16,
        12 => head.e_shstrndx = value as u16,
        _ => return Err(Error::OutOfBounds(row as u64)),
    }
    elf.set_header(head)
}

fn edit_section(
    elf: &mut Elf,
    row: usize,
    column: usize,
    value: u64,
    text: Option<&str>,
) -> Result<()> {
    let mut shdr = elf.shdr(row)?;
    match column {
        0 => match text {
            Some(new_name) => {
                let old = elf.section_name(row)?;
                return elf.rename_section(&old, new_name);
            }
            None => shdr.sh_name = value as u32,
        },
        1 => shdr.sh_type = value as u32,
        2 => shdr.sh_addr = value,
        3 => shdr.sh_offset = value,
        4 => shdr.sh_size = value,
        5 => shdr.sh_link = value as u32,
        6 => shdr.sh_info = value as u32,
        7 => shdr.sh_addralign = value,
        8 => shdr.sh_entsize = value,
        9 => shdr.sh_flags = value,
        _ => return Err(Error::OutOfBounds(column as u64)),
    }
    elf.set_shdr(row, shdr)
}

fn edit_segment(elf: &mut Elf, row: usize, column: usize, value: u64) -> Result<()> {
    let mut phdr = elf.phdr(row)?;
    match column {
        0 => phdr.p_type = value as u32,
        1 => phdr.p_offset = value,
        2 => phdr.p_vaddr = value,
        3 => phdr.p_paddr = value,
        4 => phdr.p_filesz = value,
        5 => phdr.p_memsz = value,
        6 => phdr.p_flags = value as u32,
        7 => phdr.p_align = value,
        _ => return Err(Error::OutOfBounds(column as u64)),
    }
    elf.set_phdr(row, phdr)
}

fn edit_symbol(
    elf: &mut Elf,
    dynamic: bool,
    row: usize,
    column: usize,
    value: u64,
    text: Option<&str>,
) -> Result<()> {
    let mut sym = if dynamic {
        elf.dynsym_at(row)?
    } else {
        elf.symtab_at(row)?
    };
    match column {
        0 => match text {
            Some(new_name) => {
                return if dynamic {
                    let old = elf.dynsym_name(row)?;
                    elf.rename_dynsym(&old, new_name)
                } else {
                    let old = elf.symtab_name(row)?;
                    elf.rename_symbol(&old, new_name)
                };
            }
            None => sym.st_name = value as u32,
        },
        1 => sym.st_value = value,
        2 => sym.st_size = value,
        3 => sym.st_info = value as u8,
        4 => sym.st_other = value as u8,
        5 => sym.st_shndx = value as u16,
        _ => return Err(Error::OutOfBounds(column as u64)),
    }
    if dynamic {
        elf.set_dynsym(row, sym)
    } else {
        elf.set_symtab(row, sym)
    }
}

fn edit_dynamic(
    elf: &mut Elf,
    row: usize,
    column: usize,
    value: u64,
    text: Option<&str>,
) -> Result<()> {
    let mut entry = elf.dyn_at(row)?;
    match column {
        0 => entry.d_tag = value,
        1 => match text {
            Some(name) => return elf.set_dynamic_str(row, name),
            None => entry.d_val = value,
        },
        _ => return Err(Error::OutOfBounds(column as u64)),
    }
    elf.set_dyn(row, entry)
}
