//! Top-level Param container
//!
//! A Param is either *empty* (nothing loaded, or the input failed the magic
//! check) or *loaded*. Decoding never reports structural problems: input that
//! cannot be read becomes an empty container so an editor keeps working.
//! [`Param::try_decode`] exposes the reason for callers that want to show it.

use std::sync::Arc;

use crate::cursor::read_clamped;
use crate::entry::Entry;
use crate::error::{ParamError, Result};
use crate::schema::Schema;
use crate::section::Section;
use crate::{DIRECTORY_ENTRY_SIZE, HEADER_SIZE, PARAM_MAGIC};

mod header;

pub use header::{read_directory, DirectoryEntry, Header};

/// A decoded Param file
#[derive(Debug, Clone)]
pub struct Param {
    schema: Arc<dyn Schema>,
    /// `None` while empty
    header: Option<Header>,
    /// Bytes between the end of the directory and the first payload
    directory_gap: Vec<u8>,
    sections: Vec<Section>,
    /// Bytes after the last section payload
    trailer: Vec<u8>,
    /// Sections were added or removed since decode/commit
    resized: bool,
}

impl Param {
    /// An empty container bound to `schema`
    pub fn new(schema: Arc<dyn Schema>) -> Self {
        Self {
            schema,
            header: None,
            directory_gap: Vec::new(),
            sections: Vec::new(),
            trailer: Vec::new(),
            resized: false,
        }
    }

    /// Decode `buffer`, yielding an empty container if it cannot be read
    pub fn decode(buffer: &[u8], schema: Arc<dyn Schema>) -> Self {
        match Self::try_decode(buffer, Arc::clone(&schema)) {
            Ok(param) => param,
            Err(e) => {
                tracing::warn!("Ignoring Param data: {}", e);
                Self::new(schema)
            }
        }
    }

    /// Decode `buffer`, reporting why it could not be read
    pub fn try_decode(buffer: &[u8], schema: Arc<dyn Schema>) -> Result<Self> {
        if buffer.is_empty() || read_clamped(buffer, 0, PARAM_MAGIC.len()) != PARAM_MAGIC {
            return Err(ParamError::FormatRejected);
        }

        let header = Header::read(buffer)?;
        let directory = read_directory(buffer, header.section_count)?;

        let directory_end = HEADER_SIZE + directory.len() * DIRECTORY_ENTRY_SIZE;
        let data_start = header.data_pointer as usize;
        let directory_gap =
            read_clamped(buffer, directory_end, data_start.saturating_sub(directory_end)).to_vec();

        // Sections are contiguous, in directory order, from the data pointer
        let mut cursor = data_start;
        let mut sections = Vec::with_capacity(directory.len());
        for (index, dir) in directory.iter().enumerate() {
            let raw = read_clamped(buffer, cursor, dir.payload_len());
            tracing::debug!(
                "Section {}: {} entries x {} bytes at 0x{:X}",
                index,
                dir.entry_count,
                dir.entry_size,
                cursor
            );
            let layout = schema.layout(header.record_kind_id, index);
            sections.push(Section::decode(
                index,
                raw,
                dir.entry_size,
                dir.entry_count,
                layout,
            )?);
            cursor = cursor.saturating_add(dir.payload_len());
        }

        let trailer = read_clamped(buffer, cursor, usize::MAX).to_vec();

        Ok(Self {
            schema,
            header: Some(header),
            directory_gap,
            sections,
            trailer,
            resized: false,
        })
    }

    /// Replace the contents with a fresh decode of `buffer`
    ///
    /// Unsaved edits are discarded. If `buffer` cannot be read the current
    /// contents are kept and `false` is returned.
    pub fn load(&mut self, buffer: &[u8]) -> bool {
        match Self::try_decode(buffer, Arc::clone(&self.schema)) {
            Ok(param) => {
                *self = param;
                true
            }
            Err(e) => {
                tracing::warn!("Ignoring Param data: {}", e);
                false
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none()
    }

    pub fn is_loaded(&self) -> bool {
        self.header.is_some()
    }

    pub fn schema(&self) -> &dyn Schema {
        self.schema.as_ref()
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn record_kind_id(&self) -> Option<u32> {
        self.header.map(|h| h.record_kind_id)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn get_section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn get_section_mut(&mut self, index: usize) -> Option<&mut Section> {
        self.sections.get_mut(index)
    }

    /// Entries of a section; empty for an out-of-range index
    pub fn get_section_entries(&self, section: usize) -> &[Entry] {
        self.sections
            .get(section)
            .map(Section::entries)
            .unwrap_or_default()
    }

    pub fn get_section_entry(&self, section: usize, entry: usize) -> Option<&Entry> {
        self.sections.get(section)?.entry(entry)
    }

    pub fn get_section_entry_mut(&mut self, section: usize, entry: usize) -> Option<&mut Entry> {
        self.sections.get_mut(section)?.entry_mut(entry)
    }

    /// Append a section of `entry_count` zero-filled entries
    ///
    /// The directory and data pointer are recomputed when encoding.
    pub fn add_section(&mut self, entry_size: u32, entry_count: u32) -> Result<&mut Section> {
        let record_kind_id = self.record_kind_id().ok_or(ParamError::NotLoaded)?;
        let index = self.sections.len();
        let layout = self.schema.layout(record_kind_id, index);
        self.sections
            .push(Section::zeroed(index, entry_size, entry_count, layout));
        self.resized = true;
        Ok(&mut self.sections[index])
    }

    /// Remove the section at `index`; later sections shift down by one
    ///
    /// Layouts stay bound to the section they were decoded for.
    pub fn remove_section(&mut self, index: usize) -> Option<Section> {
        if index >= self.sections.len() {
            return None;
        }
        let removed = self.sections.remove(index);
        for (i, section) in self.sections.iter_mut().enumerate().skip(index) {
            section.set_index(i);
        }
        self.resized = true;
        Some(removed)
    }

    /// Offset of the first section payload in the encoded file
    pub fn data_pointer(&self) -> usize {
        HEADER_SIZE + self.sections.len() * DIRECTORY_ENTRY_SIZE + self.directory_gap.len()
    }

    /// Whether anything changed since the last decode or commit
    pub fn is_changed(&self) -> bool {
        self.resized || self.sections.iter().any(Section::is_changed)
    }

    /// Encode the whole file
    ///
    /// Fails with [`ParamError::CorruptTree`] rather than emit a file whose
    /// directory disagrees with its payloads.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = self.header.as_ref().ok_or(ParamError::NotLoaded)?;
        for section in &self.sections {
            section.validate()?;
        }

        let corrupt = |what: &str| ParamError::CorruptTree(format!("{} exceeds u32", what));
        let section_count = u32::try_from(self.sections.len()).map_err(|_| corrupt("section count"))?;
        let data_pointer = u32::try_from(self.data_pointer()).map_err(|_| corrupt("data pointer"))?;

        let payload_len: usize = self.sections.iter().map(Section::payload_len).sum();
        let mut output =
            Vec::with_capacity(self.data_pointer() + payload_len + self.trailer.len());

        header.write(&mut output, data_pointer, section_count);
        for section in &self.sections {
            output.extend_from_slice(&(section.entry_count() as u32).to_le_bytes());
            output.extend_from_slice(&section.entry_size().to_le_bytes());
        }
        output.extend_from_slice(&self.directory_gap);
        for section in &self.sections {
            output.extend_from_slice(&section.to_bytes()?);
        }
        output.extend_from_slice(&self.trailer);

        Ok(output)
    }

    /// Encode the file and adopt the result as the new baseline
    ///
    /// Afterwards [`Param::is_changed`] is false until the next edit.
    pub fn commit(&mut self) -> Result<Vec<u8>> {
        let bytes = self.to_bytes()?;
        for section in &mut self.sections {
            section.commit()?;
        }
        let (section_count, data_pointer) = (self.sections.len() as u32, self.data_pointer() as u32);
        if let Some(header) = self.header.as_mut() {
            header.section_count = section_count;
            header.data_pointer = data_pointer;
        }
        self.resized = false;
        Ok(bytes)
    }
}
