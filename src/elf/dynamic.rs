//! The dynamic array: (tag, value) pairs parameterizing dynamic linking.
//!
//! Tags are kept `u64` so 32-bit tags widen losslessly at parse time.

use scroll::ctx::{self, SizeWith};
use scroll::{Pread, Pwrite};

use crate::container::{narrow, Ctx};
use crate::error;

/// Marks end of dynamic section.
pub const DT_NULL: u64 = 0;
/// Name of needed library.
pub const DT_NEEDED: u64 = 1;
/// Size in bytes of PLT relocs.
pub const DT_PLTRELSZ: u64 = 2;
/// Processor defined value.
pub const DT_PLTGOT: u64 = 3;
/// Address of symbol hash table.
pub const DT_HASH: u64 = 4;
/// Address of string table.
pub const DT_STRTAB: u64 = 5;
/// Address of symbol table.
pub const DT_SYMTAB: u64 = 6;
/// Address of Rela relocs.
pub const DT_RELA: u64 = 7;
/// Total size of Rela relocs.
pub const DT_RELASZ: u64 = 8;
/// Size of one Rela reloc.
pub const DT_RELAENT: u64 = 9;
/// Size of string table.
pub const DT_STRSZ: u64 = 10;
/// Size of one symbol table entry.
pub const DT_SYMENT: u64 = 11;
/// Address of init function.
pub const DT_INIT: u64 = 12;
/// Address of termination function.
pub const DT_FINI: u64 = 13;
/// Name of shared object.
pub const DT_SONAME: u64 = 14;
/// Library search path (deprecated).
pub const DT_RPATH: u64 = 15;
/// Start symbol search here.
pub const DT_SYMBOLIC: u64 = 16;
/// Address of Rel relocs.
pub const DT_REL: u64 = 17;
/// Total size of Rel relocs.
pub const DT_RELSZ: u64 = 18;
/// Size of one Rel reloc.
pub const DT_RELENT: u64 = 19;
/// Type of reloc in PLT.
pub const DT_PLTREL: u64 = 20;
/// For debugging; unspecified.
pub const DT_DEBUG: u64 = 21;
/// Reloc might modify .text.
pub const DT_TEXTREL: u64 = 22;
/// Address of PLT relocs.
pub const DT_JMPREL: u64 = 23;
/// Process relocations of object.
pub const DT_BIND_NOW: u64 = 24;
/// Array with addresses of init fct.
pub const DT_INIT_ARRAY: u64 = 25;
/// Array with addresses of fini fct.
pub const DT_FINI_ARRAY: u64 = 26;
/// Size in bytes of DT_INIT_ARRAY.
pub const DT_INIT_ARRAYSZ: u64 = 27;
/// Size in bytes of DT_FINI_ARRAY.
pub const DT_FINI_ARRAYSZ: u64 = 28;
/// Library search path.
pub const DT_RUNPATH: u64 = 29;
/// Flags for the object being loaded.
pub const DT_FLAGS: u64 = 30;
/// GNU-style hash table.
pub const DT_GNU_HASH: u64 = 0x6ffffef5;
/// The versioning entry types.
pub const DT_VERSYM: u64 = 0x6ffffff0;
/// State flags.
pub const DT_FLAGS_1: u64 = 0x6ffffffb;
/// Address of version definition table.
pub const DT_VERDEF: u64 = 0x6ffffffc;
/// Number of version definitions.
pub const DT_VERDEFNUM: u64 = 0x6ffffffd;
/// Address of table with needed versions.
pub const DT_VERNEED: u64 = 0x6ffffffe;
/// Number of needed versions.
pub const DT_VERNEEDNUM: u64 = 0x6fffffff;

/// Set RTLD_NOW for this object.
pub const DF_1_NOW: u64 = 0x00000001;
/// Set RTLD_GLOBAL for this object.
pub const DF_1_GLOBAL: u64 = 0x00000002;
/// Set RTLD_NODELETE for this object.
pub const DF_1_NODELETE: u64 = 0x00000008;
/// Object is a position independent executable.
pub const DF_1_PIE: u64 = 0x08000000;

/// Size of a 32-bit dynamic entry.
pub const SIZEOF_DYN32: usize = 8;
/// Size of a 64-bit dynamic entry.
pub const SIZEOF_DYN64: usize = 16;

/// Converts a tag to its string representation.
#[inline]
pub fn tag_to_str(tag: u64) -> &'static str {
    match tag {
        DT_NULL => "DT_NULL",
        DT_NEEDED => "DT_NEEDED",
        DT_PLTRELSZ => "DT_PLTRELSZ",
        DT_PLTGOT => "DT_PLTGOT",
        DT_HASH => "DT_HASH",
        DT_STRTAB => "DT_STRTAB",
        DT_SYMTAB => "DT_SYMTAB",
        DT_RELA => "DT_RELA",
        DT_RELASZ => "DT_RELASZ",
        DT_RELAENT => "DT_RELAENT",
        DT_STRSZ => "DT_STRSZ",
        DT_SYMENT => "DT_SYMENT",
        DT_INIT => "DT_INIT",
        DT_FINI => "DT_FINI",
        DT_SONAME => "DT_SONAME",
        DT_RPATH => "DT_RPATH",
        DT_SYMBOLIC => "DT_SYMBOLIC",
        DT_REL => "DT_REL",
        DT_RELSZ => "DT_RELSZ",
        DT_RELENT => "DT_RELENT",
        DT_PLTREL => "DT_PLTREL",
        DT_DEBUG => "DT_DEBUG",
        DT_TEXTREL => "DT_TEXTREL",
        DT_JMPREL => "DT_JMPREL",
        DT_BIND_NOW => "DT_BIND_NOW",
        DT_INIT_ARRAY => "DT_INIT_ARRAY",
        DT_FINI_ARRAY => "DT_FINI_ARRAY",
        DT_INIT_ARRAYSZ => "DT_INIT_ARRAYSZ",
        DT_FINI_ARRAYSZ => "DT_FINI_ARRAYSZ",
        DT_RUNPATH => "DT_RUNPATH",
        DT_FLAGS => "DT_FLAGS",
        DT_GNU_HASH => "DT_GNU_HASH",
        DT_VERSYM => "DT_VERSYM",
        DT_FLAGS_1 => "DT_FLAGS_1",
        DT_VERDEF => "DT_VERDEF",
        DT_VERDEFNUM => "DT_VERDEFNUM",
        DT_VERNEED => "DT_VERNEED",
        DT_VERNEEDNUM => "DT_VERNEEDNUM",
        _ => "UNKNOWN_TAG",
    }
}

/// The address-valued tags the move engine re-points when loaded content
/// shifts to higher addresses.
pub const REBASE_TAGS: [u64; 12] = [
    DT_INIT,
    DT_FINI,
    DT_INIT_ARRAY,
    DT_FINI_ARRAY,
    DT_GNU_HASH,
    DT_STRTAB,
    DT_SYMTAB,
    DT_PLTGOT,
    DT_JMPREL,
    DT_RELA,
    DT_VERNEED,
    DT_VERSYM,
];

/// Whether the move engine must rebase this tag's value.
#[inline]
pub fn is_rebase_tag(tag: u64) -> bool {
    REBASE_TAGS.contains(&tag)
}

/// A unified dynamic array entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dyn {
    /// Entry tag
    pub d_tag: u64,
    /// Value or address, interpreted per tag
    pub d_val: u64,
}

impl SizeWith<Ctx> for Dyn {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_64() {
            SIZEOF_DYN64
        } else {
            SIZEOF_DYN32
        }
    }
}

impl ctx::TryFromCtx<'_, Ctx> for Dyn {
    type Error = error::Error;
    fn try_from_ctx(src: &[u8], ctx: Ctx) -> Result<(Self, usize), Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        let dyn_ = if ctx.is_64() {
            Dyn {
                d_tag: src.gread_with::<u64>(offset, le)?,
                d_val: src.gread_with::<u64>(offset, le)?,
            }
        } else {
            Dyn {
                d_tag: src.gread_with::<u32>(offset, le)? as u64,
                d_val: src.gread_with::<u32>(offset, le)? as u64,
            }
        };
        Ok((dyn_, *offset))
    }
}

impl ctx::TryIntoCtx<Ctx> for Dyn {
    type Error = error::Error;
    fn try_into_ctx(self, dst: &mut [u8], ctx: Ctx) -> Result<usize, Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        if ctx.is_64() {
            dst.gwrite_with(self.d_tag, offset, le)?;
            dst.gwrite_with(self.d_val, offset, le)?;
        } else {
            dst.gwrite_with(narrow(self.d_tag)?, offset, le)?;
            dst.gwrite_with(narrow(self.d_val)?, offset, le)?;
        }
        Ok(*offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Class;
    use scroll::Endian;

    #[test]
    fn dyn_roundtrip_both_classes() {
        let d = Dyn {
            d_tag: DT_STRTAB,
            d_val: 0x40_0318,
        };
        for ctx in [
            Ctx::new(Class::Class64, Endian::Little),
            Ctx::new(Class::Class32, Endian::Big),
        ] {
            let mut buf = [0u8; SIZEOF_DYN64];
            let size = buf.pwrite_with(d, 0, ctx).unwrap();
            assert_eq!(size, Dyn::size_with(&ctx));
            let back: Dyn = buf.pread_with(0, ctx).unwrap();
            assert_eq!(back, d);
        }
    }

    #[test]
    fn rebase_tag_classification() {
        assert!(is_rebase_tag(DT_STRTAB));
        assert!(is_rebase_tag(DT_GNU_HASH));
        assert!(!is_rebase_tag(DT_STRSZ));
        assert!(!is_rebase_tag(DT_NEEDED));
    }
}
