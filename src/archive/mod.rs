//! In-memory view of a zip-based document package.
//!
//! A presentation is a zip archive of XML parts, relationship files and
//! media. [`Archive`] loads every entry into an insertion-ordered map so the
//! templater can rewrite parts and swap media in place, then writes the
//! entries back in their original order.

mod writer;

use std::io::{Cursor, Read};

use indexmap::IndexMap;
use tracing::debug;
use zip::ZipArchive;

use crate::common::{Error, Result};

pub use writer::ArchiveWriter;

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOCATED_BYTES: usize = 8 << 20;

/// One archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub data: Vec<u8>,
    pub is_dir: bool,
}

/// Mutable, ordered key → bytes mapping over a zip archive.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    entries: IndexMap<String, Entry>,
}

impl Archive {
    /// Read every entry of a zip archive.
    ///
    /// Bytes that are not a zip archive, or entries that cannot be
    /// decompressed, fail with [`Error::ArchiveFormat`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::ArchiveFormat(format!("not a zip archive: {e}")))?;

        let mut entries = IndexMap::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip
                .by_index(i)
                .map_err(|e| Error::ArchiveFormat(format!("failed to read zip entry {i}: {e}")))?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();

            let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
            let mut data = Vec::with_capacity(declared.min(MAX_PREALLOCATED_BYTES));
            file.read_to_end(&mut data)
                .map_err(|e| Error::ArchiveFormat(format!("failed to decompress '{name}': {e}")))?;

            entries.insert(name, Entry { data, is_dir });
        }

        debug!(entries = entries.len(), "loaded archive");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// File entries (directories excluded) in archive order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_dir)
            .map(|(name, entry)| (name.as_str(), entry.data.as_slice()))
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(|e| e.data.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Replace the content of an entry, or append a new file entry.
    pub fn set(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        match self.entries.get_mut(&name) {
            Some(entry) => entry.data = data,
            None => {
                self.entries.insert(name, Entry { data, is_dir: false });
            },
        }
    }

    /// Serialize to a deflate-compressed zip archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ArchiveWriter::new();
        for (name, entry) in &self.entries {
            if entry.is_dir {
                writer.add_directory(name)?;
            } else {
                writer.add_file(name, &entry.data)?;
            }
        }
        writer.finish_to_bytes()
    }
}
