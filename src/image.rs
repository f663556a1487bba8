//! The byte-image backing store.
//!
//! One engine instance exclusively owns one image: an owned byte buffer,
//! optionally backed by a file opened with read-only or read-write intent.
//! Growth may re-base the buffer, so nothing outside this module ever holds
//! a pointer into it; all views are byte offsets resolved on demand.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

/// A mutable file image plus its backing file, if any.
#[derive(Debug)]
pub struct Image {
    bytes: Vec<u8>,
    file: Option<File>,
    path: Option<PathBuf>,
    readonly: bool,
}

impl Image {
    /// Open `path`, stat it, and read the whole file into the image.
    /// With `readonly` the backing file is never written or truncated.
    pub fn open<P: AsRef<Path>>(path: P, readonly: bool) -> Result<Image> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .write(!readonly)
            .open(path)
            .map_err(Error::FileOpen)?;
        let len = file.metadata().map_err(Error::FileStat)?.len();
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len as usize)
            .map_err(|e| Error::Memory(e.to_string()))?;
        file.read_to_end(&mut bytes)?;
        Ok(Image {
            bytes,
            file: Some(file),
            path: Some(path.to_path_buf()),
            readonly,
        })
    }

    /// Wrap an in-memory buffer with no backing file.
    pub fn from_vec(bytes: Vec<u8>) -> Image {
        Image {
            bytes,
            file: None,
            path: None,
            readonly: false,
        }
    }

    /// Current image length in bytes; equals the backing file's length at rest.
    #[inline]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the image is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The backing path, if the image came from a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read access to the raw bytes
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write access to the raw bytes
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Truncate or grow both the image and its backing file to `new_len`.
    /// Growth fills with zero bytes and may move the buffer.
    pub fn resize(&mut self, new_len: u64) -> Result<()> {
        let new_len = usize::try_from(new_len)
            .map_err(|_| Error::Memory(format!("image of {new_len:#x} bytes")))?;
        if new_len > self.bytes.len() {
            self.bytes
                .try_reserve_exact(new_len - self.bytes.len())
                .map_err(|e| Error::Memory(e.to_string()))?;
        }
        debug!("resize image {:#x} -> {:#x}", self.bytes.len(), new_len);
        self.bytes.resize(new_len, 0);
        if let Some(file) = &self.file {
            if !self.readonly {
                file.set_len(new_len as u64).map_err(Error::Io)?;
            }
        }
        Ok(())
    }

    /// Flush the whole image back to the backing file and truncate it to the
    /// image length. A no-op for in-memory and read-only images.
    pub fn save(&mut self) -> Result<()> {
        if self.readonly {
            return Ok(());
        }
        if let Some(file) = &mut self.file {
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&self.bytes)?;
            file.set_len(self.bytes.len() as u64)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Give up the backing file and hand the bytes to the caller.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(tag: &str) -> PathBuf {
        env::temp_dir().join(format!("hobgoblin_image_{}_{}", std::process::id(), tag))
    }

    #[test]
    fn resize_grows_with_zeros() {
        let mut image = Image::from_vec(vec![1, 2, 3]);
        image.resize(6).unwrap();
        assert_eq!(image.bytes(), &[1, 2, 3, 0, 0, 0]);
        image.resize(2).unwrap();
        assert_eq!(image.bytes(), &[1, 2]);
    }

    #[test]
    fn open_resize_save_roundtrip() {
        let path = temp_path("roundtrip");
        fs::write(&path, [0xaau8; 8]).unwrap();

        let mut image = Image::open(&path, false).unwrap();
        assert_eq!(image.len(), 8);
        image.resize(12).unwrap();
        image.bytes_mut()[8] = 0x55;
        image.save().unwrap();
        drop(image);

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes[8], 0x55);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn open_missing_is_file_open() {
        let err = Image::open("/nonexistent/hobgoblin", true).unwrap_err();
        assert!(matches!(err, Error::FileOpen(_)));
    }
}
