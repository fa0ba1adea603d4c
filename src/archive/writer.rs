//! Zip archive writing.

use std::io::{Cursor, Seek, Write};

use zip::write::{SimpleFileOptions, ZipWriter};

use crate::common::Result;

/// Writes entries into a deflate-compressed zip archive.
///
/// # Examples
///
/// ```
/// # use dex::archive::ArchiveWriter;
/// # fn example() -> dex::Result<()> {
/// let mut writer = ArchiveWriter::new();
/// writer.add_file("[Content_Types].xml", b"<Types/>")?;
/// let bytes = writer.finish_to_bytes()?;
/// assert!(bytes.starts_with(b"PK"));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct ArchiveWriter<W: Write + Seek> {
    zip_writer: ZipWriter<W>,
}

impl ArchiveWriter<Cursor<Vec<u8>>> {
    /// Create a writer that writes to memory.
    pub fn new() -> Self {
        Self {
            zip_writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Finish the archive and return its bytes.
    pub fn finish_to_bytes(self) -> Result<Vec<u8>> {
        Ok(self.finish()?.into_inner())
    }
}

impl Default for ArchiveWriter<Cursor<Vec<u8>>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Seek> ArchiveWriter<W> {
    /// Create a writer over any seekable sink.
    pub fn with_writer(writer: W) -> Self {
        Self {
            zip_writer: ZipWriter::new(writer),
        }
    }

    pub fn add_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        self.zip_writer.start_file(path, options)?;
        self.zip_writer.write_all(content)?;
        Ok(())
    }

    pub fn add_directory(&mut self, path: &str) -> Result<()> {
        self.zip_writer
            .add_directory(path.trim_end_matches('/'), SimpleFileOptions::default())?;
        Ok(())
    }

    /// Write the central directory and return the underlying sink.
    pub fn finish(self) -> Result<W> {
        Ok(self.zip_writer.finish()?)
    }
}
