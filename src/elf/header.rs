//! The ELF header and its identification constants.

use scroll::ctx::{self, SizeWith};
use scroll::{Pread, Pwrite};

use crate::container::{narrow, Ctx};
use crate::error;

/// The ELF magic number.
pub const ELFMAG: &[u8; 4] = b"\x7fELF";
/// Size of the ELF magic number.
pub const SELFMAG: usize = 4;

/// File class byte index.
pub const EI_CLASS: usize = 4;
/// Invalid class.
pub const ELFCLASSNONE: u8 = 0;
/// 32-bit objects.
pub const ELFCLASS32: u8 = 1;
/// 64-bit objects.
pub const ELFCLASS64: u8 = 2;

/// Data encoding byte index.
pub const EI_DATA: usize = 5;
/// Invalid data encoding.
pub const ELFDATANONE: u8 = 0;
/// 2's complement, little endian.
pub const ELFDATA2LSB: u8 = 1;
/// 2's complement, big endian.
pub const ELFDATA2MSB: u8 = 2;

/// File version byte index.
pub const EI_VERSION: usize = 6;
/// Current ELF version.
pub const EV_CURRENT: u32 = 1;

/// Number of bytes in an identifier.
pub const SIZEOF_IDENT: usize = 16;
/// Size of a 32-bit ELF header.
pub const SIZEOF_EHDR32: usize = 52;
/// Size of a 64-bit ELF header.
pub const SIZEOF_EHDR64: usize = 64;

/// No file type.
pub const ET_NONE: u16 = 0;
/// Relocatable file.
pub const ET_REL: u16 = 1;
/// Executable file.
pub const ET_EXEC: u16 = 2;
/// Shared object file.
pub const ET_DYN: u16 = 3;
/// Core file.
pub const ET_CORE: u16 = 4;

/// Intel 80386.
pub const EM_386: u16 = 3;
/// MIPS R3000.
pub const EM_MIPS: u16 = 8;
/// ARM.
pub const EM_ARM: u16 = 40;
/// AMD x86-64.
pub const EM_X86_64: u16 = 62;
/// ARM AArch64.
pub const EM_AARCH64: u16 = 183;

/// Convert an ET value to its associated string.
#[inline]
pub fn et_to_str(et: u16) -> &'static str {
    match et {
        ET_NONE => "NONE",
        ET_REL => "REL",
        ET_EXEC => "EXEC",
        ET_DYN => "DYN",
        ET_CORE => "CORE",
        _ => "UNKNOWN_ET",
    }
}

/// Convert an EM value to its associated string.
#[inline]
pub fn machine_to_str(machine: u16) -> &'static str {
    match machine {
        EM_386 => "Intel 80386",
        EM_MIPS => "MIPS R3000",
        EM_ARM => "ARM",
        EM_X86_64 => "AMD x86-64",
        EM_AARCH64 => "AArch64",
        _ => "UNKNOWN_EM",
    }
}

/// A unified ELF header. Offsets and addresses are stored 64-bit wide; the
/// context narrows them on a 32-bit write.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// Magic number and other info
    pub e_ident: [u8; SIZEOF_IDENT],
    /// Object file type
    pub e_type: u16,
    /// Architecture
    pub e_machine: u16,
    /// Object file version
    pub e_version: u32,
    /// Entry point virtual address
    pub e_entry: u64,
    /// Program header table file offset
    pub e_phoff: u64,
    /// Section header table file offset
    pub e_shoff: u64,
    /// Processor-specific flags
    pub e_flags: u32,
    /// ELF header size in bytes
    pub e_ehsize: u16,
    /// Program header table entry size
    pub e_phentsize: u16,
    /// Program header table entry count
    pub e_phnum: u16,
    /// Section header table entry size
    pub e_shentsize: u16,
    /// Section header table entry count
    pub e_shnum: u16,
    /// Section header string table index
    pub e_shstrndx: u16,
}

impl core::fmt::Debug for Header {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "e_type: {} e_machine: 0x{:x} e_version: 0x{:x} e_entry: 0x{:x} \
             e_phoff: 0x{:x} e_shoff: 0x{:x} e_flags: {:x} e_ehsize: {} e_phentsize: {} \
             e_phnum: {} e_shentsize: {} e_shnum: {} e_shstrndx: {}",
            et_to_str(self.e_type),
            self.e_machine,
            self.e_version,
            self.e_entry,
            self.e_phoff,
            self.e_shoff,
            self.e_flags,
            self.e_ehsize,
            self.e_phentsize,
            self.e_phnum,
            self.e_shentsize,
            self.e_shnum,
            self.e_shstrndx
        )
    }
}

impl SizeWith<Ctx> for Header {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_64() {
            SIZEOF_EHDR64
        } else {
            SIZEOF_EHDR32
        }
    }
}

impl ctx::TryFromCtx<'_, Ctx> for Header {
    type Error = error::Error;
    fn try_from_ctx(src: &[u8], ctx: Ctx) -> Result<(Self, usize), Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        let mut header = Header::default();
        if src.len() < SIZEOF_IDENT {
            return Err(error::Error::Malformed("too small for an ELF ident".into()));
        }
        header.e_ident.copy_from_slice(&src[..SIZEOF_IDENT]);
        *offset = SIZEOF_IDENT;
        header.e_type = src.gread_with(offset, le)?;
        header.e_machine = src.gread_with(offset, le)?;
        header.e_version = src.gread_with(offset, le)?;
        if ctx.is_64() {
            header.e_entry = src.gread_with::<u64>(offset, le)?;
            header.e_phoff = src.gread_with::<u64>(offset, le)?;
            header.e_shoff = src.gread_with::<u64>(offset, le)?;
        } else {
            header.e_entry = src.gread_with::<u32>(offset, le)? as u64;
            header.e_phoff = src.gread_with::<u32>(offset, le)? as u64;
            header.e_shoff = src.gread_with::<u32>(offset, le)? as u64;
        }
        header.e_flags = src.gread_with(offset, le)?;
        header.e_ehsize = src.gread_with(offset, le)?;
        header.e_phentsize = src.gread_with(offset, le)?;
        header.e_phnum = src.gread_with(offset, le)?;
        header.e_shentsize = src.gread_with(offset, le)?;
        header.e_shnum = src.gread_with(offset, le)?;
        header.e_shstrndx = src.gread_with(offset, le)?;
        Ok((header, *offset))
    }
}

impl ctx::TryIntoCtx<Ctx> for Header {
    type Error = error::Error;
    fn try_into_ctx(self, dst: &mut [u8], ctx: Ctx) -> Result<usize, Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        if dst.len() < SIZEOF_IDENT {
            return Err(error::Error::Malformed("too small for an ELF ident".into()));
        }
        dst[..SIZEOF_IDENT].copy_from_slice(&self.e_ident);
        *offset = SIZEOF_IDENT;
        dst.gwrite_with(self.e_type, offset, le)?;
        dst.gwrite_with(self.e_machine, offset, le)?;
        dst.gwrite_with(self.e_version, offset, le)?;
        if ctx.is_64() {
            dst.gwrite_with(self.e_entry, offset, le)?;
            dst.gwrite_with(self.e_phoff, offset, le)?;
            dst.gwrite_with(self.e_shoff, offset, le)?;
        } else {
            dst.gwrite_with(narrow(self.e_entry)?, offset, le)?;
            dst.gwrite_with(narrow(self.e_phoff)?, offset, le)?;
            dst.gwrite_with(narrow(self.e_shoff)?, offset, le)?;
        }
        dst.gwrite_with(self.e_flags, offset, le)?;
        dst.gwrite_with(self.e_ehsize, offset, le)?;
        dst.gwrite_with(self.e_phentsize, offset, le)?;
        dst.gwrite_with(self.e_phnum, offset, le)?;
        dst.gwrite_with(self.e_shentsize, offset, le)?;
        dst.gwrite_with(self.e_shnum, offset, le)?;
        dst.gwrite_with(self.e_shstrndx, offset, le)?;
        Ok(*offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Class;
    use scroll::Endian;

    fn ident(class: u8, data: u8) -> [u8; SIZEOF_IDENT] {
        let mut ident = [0u8; SIZEOF_IDENT];
        ident[..4].copy_from_slice(ELFMAG);
        ident[EI_CLASS] = class;
        ident[EI_DATA] = data;
        ident[EI_VERSION] = 1;
        ident
    }

    #[test]
    fn header_roundtrip_64_le() {
        let ctx = Ctx::new(Class::Class64, Endian::Little);
        let header = Header {
            e_ident: ident(ELFCLASS64, ELFDATA2LSB),
            e_type: ET_DYN,
            e_machine: EM_X86_64,
            e_version: EV_CURRENT,
            e_entry: 0x401000,
            e_phoff: 0x40,
            e_shoff: 0x2000,
            e_ehsize: SIZEOF_EHDR64 as u16,
            e_phentsize: 56,
            e_phnum: 9,
            e_shentsize: 64,
            e_shnum: 30,
            e_shstrndx: 29,
            ..Default::default()
        };
        let mut buf = [0u8; SIZEOF_EHDR64];
        buf.pwrite_with(header, 0, ctx).unwrap();
        let back: Header = buf.pread_with(0, ctx).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn header_roundtrip_32_be() {
        let ctx = Ctx::new(Class::Class32, Endian::Big);
        let header = Header {
            e_ident: ident(ELFCLASS32, ELFDATA2MSB),
            e_type: ET_EXEC,
            e_machine: EM_MIPS,
            e_version: EV_CURRENT,
            e_entry: 0x8048000,
            e_phoff: 52,
            e_shoff: 0x400,
            e_ehsize: SIZEOF_EHDR32 as u16,
            e_phentsize: 32,
            e_phnum: 2,
            e_shentsize: 40,
            e_shnum: 3,
            e_shstrndx: 2,
            ..Default::default()
        };
        let mut buf = [0u8; SIZEOF_EHDR32];
        let size = buf.pwrite_with(header, 0, ctx).unwrap();
        assert_eq!(size, SIZEOF_EHDR32);
        let back: Header = buf.pread_with(0, ctx).unwrap();
        assert_eq!(back, header);
        // big endian: e_type at offset 16 is 0x0002 stored MSB first
        assert_eq!(&buf[16..18], &[0x00, 0x02]);
    }

    #[test]
    fn narrow_rejects_wide_fields_on_32bit() {
        let ctx = Ctx::new(Class::Class32, Endian::Little);
        let header = Header {
            e_ident: ident(ELFCLASS32, ELFDATA2LSB),
            e_shoff: 0x1_0000_0000,
            ..Default::default()
        };
        let mut buf = [0u8; SIZEOF_EHDR32];
        assert!(buf.pwrite_with(header, 0, ctx).is_err());
    }
}
