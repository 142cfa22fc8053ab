//! Region backed by buffered positional file I/O.

use super::{check_read, check_write, Region};
use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A region stored in a regular file.
///
/// Writes go through a `BufWriter`; consecutive writes that continue where
/// the previous one ended skip the seek. Reads flush pending writes first so
/// they always observe the latest bytes.
pub struct FileRegion {
    /// Path to the region file
    path: PathBuf,
    /// Buffered writer for efficient I/O
    writer: BufWriter<File>,
    /// Current file size
    len: u64,
    /// Offset the next buffered write would land on without seeking
    write_pos: Option<u64>,
}

impl FileRegion {
    /// Open the region file, creating it if it doesn't exist.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            len,
            write_pos: None,
        })
    }

    /// Get the path to the region file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Region for FileRegion {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_read(offset, buf.len(), self.len)?;
        self.writer.flush()?;
        self.write_pos = None;

        let file = self.writer.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        check_write(offset, data.len(), self.len)?;
        if self.write_pos != Some(offset) {
            // BufWriter flushes before seeking
            self.writer.seek(SeekFrom::Start(offset))?;
        }
        self.writer.write_all(data)?;
        self.write_pos = Some(offset + data.len() as u64);
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().set_len(len)?;
        self.len = len;
        self.write_pos = None;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sequential_writes_then_read() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut region = FileRegion::open(temp_file.path()).unwrap();
        region.set_len(64).unwrap();

        region.write_at(0, b"abc").unwrap();
        region.write_at(3, b"def").unwrap();
        region.write_at(32, b"xyz").unwrap();

        let mut buf = [0u8; 6];
        region.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"abcdef");

        let mut buf = [0u8; 3];
        region.read_at(32, &mut buf).unwrap();
        assert_eq!(&buf, b"xyz");
    }

    #[test]
    fn test_write_after_read_reseeks() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut region = FileRegion::open(temp_file.path()).unwrap();
        region.set_len(32).unwrap();

        region.write_at(0, b"one").unwrap();
        let mut buf = [0u8; 3];
        region.read_at(0, &mut buf).unwrap();
        region.write_at(3, b"two").unwrap();

        let mut buf = [0u8; 6];
        region.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"onetwo");
    }

    #[test]
    fn test_existing_file_length() {
        let temp_file = NamedTempFile::new().unwrap();
        temp_file.as_file().set_len(4096).unwrap();
        let region = FileRegion::open(temp_file.path()).unwrap();
        assert_eq!(region.len(), 4096);
        assert_eq!(region.path(), temp_file.path());
    }

    #[test]
    fn test_short_read_is_io_error() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut region = FileRegion::open(temp_file.path()).unwrap();
        region.set_len(128).unwrap();

        // Someone else truncates the file behind the region's back
        temp_file.as_file().set_len(32).unwrap();

        match region.read_at(64, &mut [0u8; 16]) {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected an I/O error, got {:?}", other),
        }
    }
}
