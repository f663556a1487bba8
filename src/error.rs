//! A custom error and result used throughout the crate.

use core::fmt;
use core::result;
use std::error;
use std::io;

#[derive(Debug)]
/// A custom hobgoblin error
pub enum Error {
    /// The target file could not be opened
    FileOpen(io::Error),
    /// The target file could not be stat'd
    FileStat(io::Error),
    /// Some other I/O failure while reading or writing the image
    Io(io::Error),
    /// Growing or remapping the byte image failed
    Memory(String),
    /// The magic is bad
    BadMagic(u64),
    /// A byte copy inside the image went out of bounds
    Copy,
    /// Moving a trailing structure inside the image went out of bounds
    Move,
    /// A coordinate was out of bounds, or the hash rebuild hit a
    /// bucket-order violation
    OutOfBounds(u64),
    /// A symbol lookup failed
    NotFound(String),
    /// A section lookup by name failed
    SectionNotFound(String),
    /// A segment lookup by type failed
    SegmentNotFound(u32),
    /// A dynamic entry lookup by tag failed
    DynamicNotFound(u64),
    /// The ELF class is neither 32 nor 64 bit
    ElfClass(u8),
    /// The file type does not support the requested operation
    ElfType(u16),
    /// Invalid arguments (malformed shellcode string, write past the image, ...)
    Args(String),
    /// The allocator failed while expanding a LOAD segment
    ExpandSegment,
    /// The allocator failed while adding a LOAD segment
    AddSegment,
    /// The entity is malformed in some way
    Malformed(String),
    /// An error emanating from reading or writing a structured field
    Scroll(scroll::Error),
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::FileOpen(io) | Error::FileStat(io) | Error::Io(io) => Some(io),
            Error::Scroll(scroll) => Some(scroll),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<scroll::Error> for Error {
    fn from(err: scroll::Error) -> Error {
        Error::Scroll(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FileOpen(err) => write!(fmt, "open failed: {err}"),
            Error::FileStat(err) => write!(fmt, "stat failed: {err}"),
            Error::Io(err) => write!(fmt, "{err}"),
            Error::Memory(msg) => write!(fmt, "image allocation failed: {msg}"),
            Error::BadMagic(magic) => write!(fmt, "invalid magic number: 0x{magic:x}"),
            Error::Copy => write!(fmt, "byte copy out of bounds"),
            Error::Move => write!(fmt, "structure move out of bounds"),
            Error::OutOfBounds(at) => write!(fmt, "out of bounds: 0x{at:x}"),
            Error::NotFound(name) => write!(fmt, "symbol not found: {name}"),
            Error::SectionNotFound(name) => write!(fmt, "section not found: {name}"),
            Error::SegmentNotFound(pt) => write!(fmt, "segment not found: type 0x{pt:x}"),
            Error::DynamicNotFound(tag) => write!(fmt, "dynamic entry not found: tag 0x{tag:x}"),
            Error::ElfClass(class) => write!(fmt, "unsupported ELF class: {class}"),
            Error::ElfType(typ) => write!(fmt, "unsupported ELF file type: {typ}"),
            Error::Args(msg) => write!(fmt, "invalid argument: {msg}"),
            Error::ExpandSegment => write!(fmt, "expanding a LOAD segment failed"),
            Error::AddSegment => write!(fmt, "adding a LOAD segment failed"),
            Error::Malformed(msg) => write!(fmt, "malformed entity: {msg}"),
            Error::Scroll(err) => write!(fmt, "{err}"),
        }
    }
}

/// An impish result
pub type Result<T> = result::Result<T, Error>;
