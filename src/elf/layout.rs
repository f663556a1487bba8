//! Offset-ordered views over the section and segment tables, and the
//! LOAD-to-contents mapping the move engine cascades shifts through.
//!
//! These hold indices into the header tables, never copies: resolving an
//! index through the engine always reads the current row.

use super::program_header::{PT_GNU_STACK, PT_LOAD};
use super::section_header::SHT_NULL;
use super::Elf;
use crate::error::Result;

/// The contents of one LOAD segment.
#[derive(Debug)]
pub struct LoadEntry {
    /// Index of the owning LOAD program header
    pub seg: usize,
    /// Non-stack segments whose file offset falls inside the LOAD
    pub subsegs: Vec<usize>,
    /// Sections contained by file offset or, like `.bss`, by address
    pub subsecs: Vec<usize>,
}

/// Every LOAD segment mapped to the subsegments and subsections it carries.
#[derive(Debug)]
pub struct LoadMap {
    entries: Vec<LoadEntry>,
}

impl LoadMap {
    /// Build the mapping from the current state of the tables.
    pub fn build(elf: &Elf) -> Result<LoadMap> {
        let mut entries = Vec::new();
        for seg in 0..elf.phnum() {
            let load = elf.phdr(seg)?;
            if load.p_type != PT_LOAD {
                continue;
            }
            let mut entry = LoadEntry {
                seg,
                subsegs: Vec::new(),
                subsecs: Vec::new(),
            };
            for other in 0..elf.phnum() {
                if other == seg {
                    continue;
                }
                let phdr = elf.phdr(other)?;
                if phdr.p_type != PT_GNU_STACK && load.covers_offset(phdr.p_offset) {
                    entry.subsegs.push(other);
                }
            }
            for sec in 0..elf.shnum() {
                let shdr = elf.shdr(sec)?;
                if shdr.sh_type != SHT_NULL && load.covers_offset(shdr.sh_offset) {
                    entry.subsecs.push(sec);
                } else if shdr.sh_addr != 0 && load.covers_addr(shdr.sh_addr) {
                    entry.subsecs.push(sec);
                }
            }
            entries.push(entry);
        }
        Ok(LoadMap { entries })
    }

    /// The entry for LOAD segment `seg`, if it is one.
    pub fn entry(&self, seg: usize) -> Option<&LoadEntry> {
        self.entries.iter().find(|e| e.seg == seg)
    }

    /// All mapped LOAD entries.
    pub fn entries(&self) -> &[LoadEntry] {
        &self.entries
    }
}

/// Section indices matching `keep`, sorted by descending file offset — the
/// order every destructive move walks in.
pub fn sections_by_offset_desc<F>(elf: &Elf, keep: F) -> Result<Vec<usize>>
where
    F: Fn(usize, &super::section_header::SectionHeader) -> bool,
{
    let mut rows = Vec::new();
    for i in 0..elf.shnum() {
        let shdr = elf.shdr(i)?;
        if keep(i, &shdr) {
            rows.push((shdr.sh_offset, i));
        }
    }
    rows.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(rows.into_iter().map(|(_, i)| i).collect())
}

/// LOAD segment indices sorted by descending file offset.
pub fn loads_by_offset_desc(elf: &Elf) -> Result<Vec<usize>> {
    let mut rows = Vec::new();
    for i in 0..elf.phnum() {
        let phdr = elf.phdr(i)?;
        if phdr.p_type == PT_LOAD {
            rows.push((phdr.p_offset, i));
        }
    }
    rows.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(rows.into_iter().map(|(_, i)| i).collect())
}

/// LOAD segment indices sorted by ascending file offset.
pub fn loads_by_offset_asc(elf: &Elf) -> Result<Vec<usize>> {
    let mut rows = loads_by_offset_desc(elf)?;
    rows.reverse();
    Ok(rows)
}
