//! The ELF class (32 vs 64 bit) and endianness, bundled into a parsing
//! context. The context is decided once, from `e_ident`, and every typed
//! read or write of the image carries it.

use scroll::Endian;

use crate::elf::header;
use crate::error;

/// The width of offset, size, and address fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Class {
    /// 32-bit fields
    Class32,
    /// 64-bit fields
    Class64,
}

impl Class {
    /// Whether this is a 64-bit class
    #[inline]
    pub fn is_64(self) -> bool {
        matches!(self, Class::Class64)
    }
    /// The size in bytes of a native word for this class
    #[inline]
    pub fn word_size(self) -> usize {
        match self {
            Class::Class32 => 4,
            Class::Class64 => 8,
        }
    }
    /// The `e_ident[EI_CLASS]` byte for this class
    #[inline]
    pub fn to_ident(self) -> u8 {
        match self {
            Class::Class32 => header::ELFCLASS32,
            Class::Class64 => header::ELFCLASS64,
        }
    }
}

/// The class and endianness the image is decoded with
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Ctx {
    /// The field width
    pub class: Class,
    /// The byte order, from `e_ident[EI_DATA]`
    pub le: Endian,
}

impl Ctx {
    /// Create a new context
    pub fn new(class: Class, le: Endian) -> Self {
        Ctx { class, le }
    }
    /// Whether the container is 64-bit
    #[inline]
    pub fn is_64(&self) -> bool {
        self.class.is_64()
    }
}

/// Peek at the ident bytes and return the context they describe, or an error
/// when the magic, class, or data encoding is not an ELF we know.
pub fn peek(bytes: &[u8]) -> error::Result<Ctx> {
    if bytes.len() < header::SIZEOF_IDENT {
        return Err(error::Error::Malformed(format!(
            "{} bytes is smaller than an ELF identification header",
            bytes.len()
        )));
    }
    if &bytes[0..header::SELFMAG] != header::ELFMAG {
        let mut magic = 0u64;
        for (i, b) in bytes[0..header::SELFMAG].iter().enumerate() {
            magic |= (*b as u64) << (i * 8);
        }
        return Err(error::Error::BadMagic(magic));
    }
    let class = match bytes[header::EI_CLASS] {
        header::ELFCLASS32 => Class::Class32,
        header::ELFCLASS64 => Class::Class64,
        other => return Err(error::Error::ElfClass(other)),
    };
    let le = match bytes[header::EI_DATA] {
        header::ELFDATA2LSB => Endian::Little,
        header::ELFDATA2MSB => Endian::Big,
        other => {
            return Err(error::Error::Malformed(format!(
                "unknown data encoding {other}"
            )))
        }
    };
    Ok(Ctx::new(class, le))
}

/// Narrow a 64-bit field for a 32-bit write, failing instead of truncating.
pub(crate) fn narrow(value: u64) -> error::Result<u32> {
    u32::try_from(value)
        .map_err(|_| error::Error::Malformed(format!("0x{value:x} does not fit a 32-bit field")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_classifies_ident() {
        let mut ident = [0u8; 16];
        ident[0..4].copy_from_slice(b"\x7fELF");
        ident[4] = header::ELFCLASS64;
        ident[5] = header::ELFDATA2LSB;
        let ctx = peek(&ident).unwrap();
        assert!(ctx.is_64());
        assert_eq!(ctx.le, Endian::Little);

        ident[4] = header::ELFCLASS32;
        ident[5] = header::ELFDATA2MSB;
        let ctx = peek(&ident).unwrap();
        assert!(!ctx.is_64());
        assert_eq!(ctx.le, Endian::Big);
    }

    #[test]
    fn peek_rejects_bad_magic() {
        let ident = [0u8; 16];
        assert!(matches!(peek(&ident), Err(error::Error::BadMagic(_))));
    }

    #[test]
    fn peek_rejects_bad_class() {
        let mut ident = [0u8; 16];
        ident[0..4].copy_from_slice(b"\x7fELF");
        ident[4] = 3;
        ident[5] = header::ELFDATA2LSB;
        assert!(matches!(peek(&ident), Err(error::Error::ElfClass(3))));
    }
}
