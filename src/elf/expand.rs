//! The space allocator and the relocation-consistent move engine.
//!
//! Growing anything inside an ELF means finding or creating file space at a
//! loader-acceptable address, shifting every trailing structure out of the
//! way in descending offset order, and re-pointing the header tables, the
//! entry point, and the address-valued dynamic tags that name the moved
//! content. The allocator ladder:
//!
//! 1. free tail space inside an isolated LOAD,
//! 2. grow that LOAD in place ([`Elf::expand_segment_load`]),
//! 3. repurpose a `PT_NOTE`/`PT_NULL` header as a fresh LOAD,
//! 4. grow the program header table itself by relocating it into the new
//!    tail LOAD.

use log::{debug, info};

use super::dynamic::is_rebase_tag;
use super::layout::{self, LoadMap};
use super::program_header::{ProgramHeader, PF_R, PF_W, PT_LOAD, PT_NOTE, PT_NULL, PT_PHDR};
use super::{header, Elf};
use crate::align::{congruent_offset, page_align, PAGE_SIZE};
use crate::error::{Error, Result};

impl Elf {
    /// Advance every address-valued dynamic entry at or above `min_addr` by
    /// `delta`. Only the tags naming relocatable linker structures move.
    pub(crate) fn shift_rebase_tags(&mut self, min_addr: u64, delta: u64) -> Result<()> {
        for i in 0..self.dyn_count() {
            let mut entry = self.dyn_at(i)?;
            if entry.d_val >= min_addr && is_rebase_tag(entry.d_tag) {
                entry.d_val += delta;
                self.set_dyn(i, entry)?;
            }
        }
        Ok(())
    }

    /// Move the section header table and every isolated (address-free)
    /// section at or past `from_offset` down by `delta`. The image must
    /// already have been grown by at least `delta`.
    fn move_trailing(&mut self, from_offset: u64, delta: u64) -> Result<()> {
        let mut head = self.header();
        if head.e_shnum > 0 && head.e_shoff >= from_offset {
            let table_len = head.e_shnum as u64 * head.e_shentsize as u64;
            self.copy_within(head.e_shoff, table_len, head.e_shoff + delta)?;
            head.e_shoff += delta;
            self.set_header(head)?;
        }

        let movers = layout::sections_by_offset_desc(self, |_, shdr| {
            shdr.sh_addr == 0 && shdr.sh_offset != 0 && shdr.sh_offset >= from_offset
        })?;
        for index in movers {
            let mut shdr = self.shdr(index)?;
            let len = if shdr.has_file_data() { shdr.sh_size } else { 0 };
            self.copy_within(shdr.sh_offset, len, shdr.sh_offset + delta)?;
            shdr.sh_offset += delta;
            self.set_shdr(index, shdr)?;
        }
        Ok(())
    }

    /// Grow LOAD segment `index` by `size` bytes of tail space, shifting
    /// everything behind it. Returns the offset and virtual address where
    /// the new space begins.
    pub fn expand_segment_load(&mut self, index: usize, size: u64) -> Result<(u64, u64)> {
        let map = LoadMap::build(self)?;
        let entry = map.entry(index).ok_or(Error::SegmentNotFound(PT_LOAD))?;

        let target = self.phdr(index)?;
        let added_offset = target.file_end();
        let added_vaddr = target.mem_end();

        // file slack up to the next segment, when the next header is a LOAD
        let mut free = 0;
        if index + 1 < self.phnum() {
            let next = self.phdr(index + 1)?;
            if next.p_type == PT_LOAD {
                free = next.p_offset.saturating_sub(added_offset);
            }
        }

        // the tail subsection absorbs the growth
        let mut tail: Option<(usize, u64)> = None;
        for &sec in &entry.subsecs {
            let off = self.shdr(sec)?.sh_offset;
            if tail.map(|(_, best)| off > best).unwrap_or(true) {
                tail = Some((sec, off));
            }
        }
        if let Some((sec, _)) = tail {
            let mut shdr = self.shdr(sec)?;
            shdr.sh_size += size;
            self.set_shdr(sec, shdr)?;
        }

        let mut grown = target;
        grown.p_filesz += size;
        grown.p_memsz += size;
        self.set_phdr(index, grown)?;

        if size <= free {
            debug!("expand load {index}: {size:#x} bytes fit the existing slack");
            return Ok((added_offset, added_vaddr));
        }

        let added = page_align(size);
        info!("expand load {index}: inserting {added:#x} bytes at {added_offset:#x}");
        let new_len = self.len() + added;
        self.resize(new_len)?;
        self.rederive()?;

        self.move_trailing(added_offset, added)?;

        // shift every later LOAD, cascading into its contents
        let old_entry = self.header().e_entry;
        for seg in layout::loads_by_offset_desc(self)? {
            let phdr = self.phdr(seg)?;
            if phdr.p_offset <= target.p_offset || seg == index {
                continue;
            }
            self.copy_within(phdr.p_offset, phdr.p_filesz, phdr.p_offset + added)?;
            let mut moved = phdr;
            moved.p_offset += added;
            moved.p_vaddr += added;
            moved.p_paddr += added;
            self.set_phdr(seg, moved)?;

            if let Some(sub) = map.entry(seg) {
                for &s in &sub.subsegs {
                    let mut child = self.phdr(s)?;
                    child.p_offset += added;
                    child.p_vaddr += added;
                    child.p_paddr += added;
                    self.set_phdr(s, child)?;
                }
                for &s in &sub.subsecs {
                    let mut child = self.shdr(s)?;
                    if child.sh_addr == 0 {
                        // already handled by the trailing move
                        continue;
                    }
                    child.sh_offset += added;
                    child.sh_addr += added;
                    self.set_shdr(s, child)?;
                }
            }

            if phdr.is_executable() && phdr.covers_addr(old_entry) {
                let mut head = self.header();
                head.e_entry += added;
                self.set_header(head)?;
            }
        }

        self.zero(added_offset, added)?;
        self.rederive()?;
        self.shift_rebase_tags(added_vaddr, added)?;
        Ok((added_offset, added_vaddr))
    }

    /// Grow the byte range `[src_offset, src_offset + src_size)` by
    /// appending `content`, moving the range to fresh space when its
    /// surroundings leave no room. Returns the index of the LOAD segment
    /// that holds the content afterwards.
    pub(crate) fn expand_content(
        &mut self,
        src_offset: u64,
        src_size: u64,
        content: &[u8],
    ) -> Result<usize> {
        let added = content.len() as u64;
        let mut section = None;
        for i in 0..self.shnum() {
            if self.shdr(i)?.sh_offset == src_offset {
                section = Some(i);
                break;
            }
        }

        // a LOAD starting exactly at the range is the isolated case
        let mut isolated = None;
        for i in 0..self.phnum() {
            let phdr = self.phdr(i)?;
            if phdr.p_type == PT_LOAD && phdr.p_offset == src_offset {
                isolated = Some(i);
                break;
            }
        }

        if let Some(seg) = isolated {
            let phdr = self.phdr(seg)?;
            if src_size + added <= phdr.p_filesz {
                debug!("expand content: slack in isolated load {seg}");
                self.write_bytes(src_offset + src_size, content)?;
                if let Some(index) = section {
                    let mut shdr = self.shdr(index)?;
                    shdr.sh_size += added;
                    self.set_shdr(index, shdr)?;
                }
                return Ok(seg);
            }
            debug!("expand content: growing isolated load {seg}");
            self.expand_segment_load(seg, added)
                .map_err(|_| Error::ExpandSegment)?;
            // the grown tail subsection is the range itself
            self.write_bytes(src_offset + src_size, content)?;
            self.rederive()?;
            return Ok(seg);
        }

        debug!("expand content: range not isolated, allocating a segment");
        let seg = self
            .add_segment(src_size + added)
            .map_err(|_| Error::AddSegment)?;
        let phdr = self.phdr(seg)?;
        self.copy_within(src_offset, src_size, phdr.p_offset)?;
        self.write_bytes(phdr.p_offset + src_size, content)?;
        if let Some(index) = section {
            let mut shdr = self.shdr(index)?;
            shdr.sh_offset = phdr.p_offset;
            shdr.sh_addr = phdr.p_vaddr;
            shdr.sh_size = src_size + added;
            self.set_shdr(index, shdr)?;
        }
        self.rederive()?;
        Ok(seg)
    }

    fn add_segment_common(&mut self, size: u64, move_pht: bool) -> Result<usize> {
        let head = self.header();

        let mut slot = None;
        let mut last_load = None;
        for i in 0..self.phnum() {
            match self.phdr(i)?.p_type {
                PT_NOTE | PT_NULL if slot.is_none() => slot = Some(i),
                PT_LOAD => last_load = Some(i),
                _ => {}
            }
        }
        if slot.is_none() && !move_pht {
            return Err(Error::SegmentNotFound(PT_NOTE));
        }
        let last = self.phdr(last_load.ok_or(Error::SegmentNotFound(PT_LOAD))?)?;

        let start_offset = last.file_end();
        let start_addr = last.mem_end();
        // an executable keeps the tail address; a shared object gets a fresh
        // page so relative relocations stay untouched
        let actual_addr = match self.file_kind() {
            header::ET_EXEC => start_addr,
            header::ET_DYN => page_align(start_addr),
            other => return Err(Error::ElfType(other)),
        };
        let actual_offset = congruent_offset(start_offset, actual_addr);

        let mut actual_size = page_align(size);
        let mut pht = None;
        if move_pht {
            let table_new = (head.e_phnum as u64 + 1) * head.e_phentsize as u64;
            let pht_offset = actual_offset + page_align(size);
            let pht_addr = actual_addr + page_align(size);
            actual_size = page_align(size) + page_align(table_new);
            slot = Some(head.e_phnum as usize);
            pht = Some((pht_offset, pht_addr, table_new));
        }
        let actual_diff = actual_offset - start_offset + actual_size;

        info!(
            "add segment: {actual_size:#x} bytes at offset {actual_offset:#x}, vaddr {actual_addr:#x}{}",
            if move_pht { ", relocating PHT" } else { "" }
        );

        let new_len = self.len() + actual_diff;
        self.resize(new_len)?;
        self.rederive()?;

        self.move_trailing(start_offset, actual_diff)?;
        self.zero(start_offset, actual_diff)?;
        self.rederive()?;

        self.shift_rebase_tags(start_addr, actual_size)?;

        if let Some((pht_offset, pht_addr, table_new)) = pht {
            let mut head = self.header();
            let table_old = head.e_phnum as u64 * head.e_phentsize as u64;
            self.copy_within(head.e_phoff, table_old, pht_offset)?;
            head.e_phnum += 1;
            head.e_phoff = pht_offset;
            self.set_header(head)?;
            self.rederive()?;
            if let Ok(phdr_seg) = self.segment_index_by_type(PT_PHDR) {
                let mut entry = self.phdr(phdr_seg)?;
                entry.p_offset = pht_offset;
                entry.p_vaddr = pht_addr;
                entry.p_paddr = pht_addr;
                entry.p_filesz = table_new;
                entry.p_memsz = table_new;
                self.set_phdr(phdr_seg, entry)?;
            }
        }

        let index = slot.expect("slot chosen above");
        self.set_phdr(
            index,
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R | PF_W,
                p_offset: actual_offset,
                p_vaddr: actual_addr,
                p_paddr: actual_addr,
                p_filesz: actual_size,
                p_memsz: actual_size,
                p_align: PAGE_SIZE,
            },
        )?;
        self.rederive()?;
        Ok(index)
    }

    /// Add a LOAD by rewriting a disposable `PT_NOTE`/`PT_NULL` header.
    pub fn add_segment_easy(&mut self, size: u64) -> Result<usize> {
        self.add_segment_common(size, false)
    }

    /// Add a LOAD by growing the program header table, relocating it into
    /// the new tail LOAD so no existing segment address changes.
    pub fn add_segment_difficult(&mut self, size: u64) -> Result<usize> {
        self.add_segment_common(size, true)
    }

    /// Add a LOAD, choosing the cheapest strategy available.
    pub fn add_segment(&mut self, size: u64) -> Result<usize> {
        for i in 0..self.phnum() {
            let p_type = self.phdr(i)?.p_type;
            if p_type == PT_NOTE || p_type == PT_NULL {
                debug!("add segment: repurposing disposable header {i}");
                return self.add_segment_easy(size);
            }
        }
        debug!("add segment: no disposable header, relocating the PHT");
        self.add_segment_difficult(size)
    }

    /// Add a LOAD sized and filled from `path`.
    pub fn add_segment_with_file<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<usize> {
        let content = std::fs::read(path).map_err(Error::FileOpen)?;
        if content.is_empty() {
            return Err(Error::Args("empty segment content file".into()));
        }
        let index = self.add_segment(content.len() as u64)?;
        let phdr = self.phdr(index)?;
        self.write_bytes(phdr.p_offset, &content)?;
        Ok(index)
    }

    /// Splice `data` into the image at `offset`, shifting the tail.
    pub(crate) fn insert_bytes(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let old_len = self.len();
        if offset > old_len {
            return Err(Error::OutOfBounds(offset));
        }
        self.resize(old_len + data.len() as u64)?;
        self.copy_within(offset, old_len - offset, offset + data.len() as u64)?;
        self.write_bytes(offset, data)?;
        Ok(())
    }

    /// Cut `size` bytes out of the image at `offset`, closing the gap.
    pub(crate) fn delete_bytes(&mut self, offset: u64, size: u64) -> Result<()> {
        let len = self.len();
        let end = offset
            .checked_add(size)
            .filter(|&end| end <= len)
            .ok_or_else(|| Error::Args(format!("delete of {size:#x} bytes at {offset:#x}")))?;
        self.copy_within(end, len - end, offset)?;
        self.resize(len - size)?;
        Ok(())
    }
}
