//! Wrap a raw binary blob in a minimal two-LOAD ELF container, so firmware
//! fragments load into analysis tooling with real addresses.

use std::path::{Path, PathBuf};

use log::info;
use scroll::ctx::SizeWith;
use scroll::{Endian, Pwrite};

use super::header::{self, Header};
use super::program_header::{ProgramHeader, PF_R, PF_W, PF_X, PT_LOAD};
use super::section_header::{SectionHeader, SHF_EXECINSTR, SHT_PROGBITS};
use crate::align::PAGE_SIZE;
use crate::container::{Class, Ctx};
use crate::error::{Error, Result};

/// Default image base for 32-bit executables.
const BASE32: u64 = 0x0804_8000;
/// Default image base for 64-bit executables.
const BASE64: u64 = 0x40_0000;

/// ABI version flags ARM firmware tooling expects in `e_flags`.
const ARM_EFLAGS: u32 = 0x0500_0200;

fn machine_for(arch: &str, class: Class) -> Result<u16> {
    match (arch.to_ascii_lowercase().as_str(), class) {
        ("arm", _) => Ok(header::EM_ARM),
        ("x86", Class::Class32) => Ok(header::EM_386),
        ("x86", Class::Class64) => Ok(header::EM_X86_64),
        ("mips", _) => Ok(header::EM_MIPS),
        (other, _) => Err(Error::Args(format!("unknown architecture {other:?}"))),
    }
}

fn class_for(bits: u32) -> Result<Class> {
    match bits {
        32 => Ok(Class::Class32),
        64 => Ok(Class::Class64),
        other => Err(Error::ElfClass(other as u8)),
    }
}

fn endian_for(endian: &str) -> Result<(Endian, u8)> {
    match endian {
        "little" => Ok((Endian::Little, header::ELFDATA2LSB)),
        "big" => Ok((Endian::Big, header::ELFDATA2MSB)),
        other => Err(Error::Args(format!("unknown endianness {other:?}"))),
    }
}

/// Build the container around the blob at `path` and write it next to the
/// input as `<path>.out`. Returns the output path.
pub fn wrap_blob<P: AsRef<Path>>(
    path: P,
    arch: &str,
    bits: u32,
    endian: &str,
    base_addr: u64,
) -> Result<PathBuf> {
    let path = path.as_ref();
    let blob = std::fs::read(path).map_err(Error::FileOpen)?;
    let class = class_for(bits)?;
    let (le, data) = endian_for(endian)?;
    let ctx = Ctx::new(class, le);
    let machine = machine_for(arch, class)?;
    let base = if base_addr != 0 {
        base_addr
    } else if class.is_64() {
        BASE64
    } else {
        BASE32
    };

    let ehdr_size = Header::size_with(&ctx);
    let phdr_size = ProgramHeader::size_with(&ctx);
    let shdr_size = SectionHeader::size_with(&ctx);
    let headers_size = (ehdr_size + 2 * phdr_size + shdr_size) as u64;

    let mut e_ident = [0u8; header::SIZEOF_IDENT];
    e_ident[..4].copy_from_slice(header::ELFMAG);
    e_ident[header::EI_CLASS] = class.to_ident();
    e_ident[header::EI_DATA] = data;
    e_ident[header::EI_VERSION] = 1;

    let ehdr = Header {
        e_ident,
        e_type: header::ET_EXEC,
        e_machine: machine,
        e_version: header::EV_CURRENT,
        e_entry: base + PAGE_SIZE,
        e_phoff: ehdr_size as u64,
        e_shoff: (ehdr_size + 2 * phdr_size) as u64,
        e_flags: if machine == header::EM_ARM { ARM_EFLAGS } else { 0 },
        e_ehsize: ehdr_size as u16,
        e_phentsize: phdr_size as u16,
        e_phnum: 2,
        e_shentsize: shdr_size as u16,
        e_shnum: 1,
        e_shstrndx: 0,
    };
    let headers_load = ProgramHeader {
        p_type: PT_LOAD,
        p_flags: PF_R,
        p_offset: 0,
        p_vaddr: base,
        p_paddr: base,
        p_filesz: headers_size,
        p_memsz: headers_size,
        p_align: PAGE_SIZE,
    };
    let blob_load = ProgramHeader {
        p_type: PT_LOAD,
        p_flags: PF_R | PF_W | PF_X,
        p_offset: PAGE_SIZE,
        p_vaddr: base + PAGE_SIZE,
        p_paddr: base + PAGE_SIZE,
        p_filesz: blob.len() as u64,
        p_memsz: blob.len() as u64,
        p_align: PAGE_SIZE,
    };
    let blob_section = SectionHeader {
        sh_name: 0,
        sh_type: SHT_PROGBITS,
        sh_flags: SHF_EXECINSTR,
        sh_addr: base + PAGE_SIZE,
        sh_offset: PAGE_SIZE,
        sh_size: blob.len() as u64,
        sh_link: 0,
        sh_info: 0,
        sh_addralign: 4,
        sh_entsize: 0,
    };

    let mut out = vec![0u8; PAGE_SIZE as usize + blob.len()];
    let offset = &mut 0;
    out.gwrite_with(ehdr, offset, ctx)?;
    out.gwrite_with(headers_load, offset, ctx)?;
    out.gwrite_with(blob_load, offset, ctx)?;
    out.gwrite_with(blob_section, offset, ctx)?;
    out[PAGE_SIZE as usize..].copy_from_slice(&blob);

    let mut output = path.as_os_str().to_owned();
    output.push(".out");
    let output = PathBuf::from(output);
    std::fs::write(&output, &out)?;
    info!(
        "wrapped {} byte blob as {} at base {base:#x}",
        blob.len(),
        output.display()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elf::Elf;
    use std::env;

    #[test]
    fn wrapped_blob_parses_with_two_loads() {
        let dir = env::temp_dir();
        let input = dir.join(format!("hobgoblin_blob_{}", std::process::id()));
        std::fs::write(&input, [0x90u8, 0x90, 0xc3]).unwrap();

        let out = wrap_blob(&input, "x86", 64, "little", 0).unwrap();
        let elf = Elf::open(&out, true).unwrap();
        assert_eq!(elf.header().e_type, header::ET_EXEC);
        assert_eq!(elf.header().e_machine, header::EM_X86_64);
        assert_eq!(elf.header().e_entry, BASE64 + PAGE_SIZE);
        assert_eq!(elf.phnum(), 2);
        let code = elf.phdr(1).unwrap();
        assert_eq!(code.p_offset, PAGE_SIZE);
        assert_eq!(code.p_filesz, 3);
        assert_eq!(
            elf.read_bytes(PAGE_SIZE, 3).unwrap(),
            &[0x90, 0x90, 0xc3]
        );

        std::fs::remove_file(&input).unwrap();
        std::fs::remove_file(&out).unwrap();
    }

    #[test]
    fn unknown_arch_is_args() {
        let dir = env::temp_dir();
        let input = dir.join(format!("hobgoblin_blob_bad_{}", std::process::id()));
        std::fs::write(&input, [0u8; 4]).unwrap();
        assert!(matches!(
            wrap_blob(&input, "sparc", 64, "little", 0),
            Err(Error::Args(_))
        ));
        std::fs::remove_file(&input).unwrap();
    }
}
