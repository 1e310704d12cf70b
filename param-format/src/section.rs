//! Homogeneous runs of fixed-stride entries

use std::sync::Arc;

use crate::cursor::read_clamped;
use crate::entry::Entry;
use crate::error::{ParamError, Result};
use crate::schema::Layout;

/// A run of entries sharing one stride and one layout
#[derive(Debug, Clone)]
pub struct Section {
    index: usize,
    entry_size: u32,
    layout: Arc<Layout>,
    entries: Vec<Entry>,
    /// Entries were added or removed since decode/commit
    resized: bool,
}

impl Section {
    /// Slice `raw` into `entry_count` entries of `entry_size` bytes
    ///
    /// A payload shorter than `entry_count * entry_size` is read as far as it
    /// goes; trailing entries may be short or empty. Every counted entry is
    /// built regardless, so memory grows with `entry_count` even when the
    /// payload is empty.
    pub fn decode(
        index: usize,
        raw: &[u8],
        entry_size: u32,
        entry_count: u32,
        layout: Arc<Layout>,
    ) -> Result<Self> {
        let stride = entry_size as usize;
        let expected = (entry_count as usize).saturating_mul(stride);
        if raw.len() < expected {
            tracing::debug!(
                "Section {}: payload has {} of {} bytes, trailing entries are short",
                index,
                raw.len(),
                expected
            );
        }
        let mut entries = Vec::new();
        for i in 0..entry_count as usize {
            let slice = read_clamped(raw, i.saturating_mul(stride), stride);
            entries.push(Entry::decode(i, slice, stride, Arc::clone(&layout))?);
        }

        Ok(Self {
            index,
            entry_size,
            layout,
            entries,
            resized: false,
        })
    }

    /// A section of `entry_count` zero-filled entries
    pub fn zeroed(index: usize, entry_size: u32, entry_count: u32, layout: Arc<Layout>) -> Self {
        let entries = (0..entry_count as usize)
            .map(|i| Entry::zeroed(i, entry_size as usize, Arc::clone(&layout)))
            .collect();
        Self {
            index,
            entry_size,
            layout,
            entries,
            resized: false,
        }
    }

    /// Position among the file's sections
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Stride of one entry in bytes
    pub fn entry_size(&self) -> u32 {
        self.entry_size
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn entry_mut(&mut self, index: usize) -> Option<&mut Entry> {
        self.entries.get_mut(index)
    }

    /// Append a zero-filled entry
    pub fn add_entry(&mut self) -> &mut Entry {
        let index = self.entries.len();
        self.entries.push(Entry::zeroed(
            index,
            self.entry_size as usize,
            Arc::clone(&self.layout),
        ));
        self.resized = true;
        &mut self.entries[index]
    }

    /// Insert a zero-filled entry at `position`, shifting later entries up
    ///
    /// Returns `None` if `position` is past the end.
    pub fn insert_entry(&mut self, position: usize) -> Option<&mut Entry> {
        if position > self.entries.len() {
            return None;
        }
        self.entries.insert(
            position,
            Entry::zeroed(position, self.entry_size as usize, Arc::clone(&self.layout)),
        );
        self.reindex(position + 1);
        self.resized = true;
        Some(&mut self.entries[position])
    }

    /// Remove the entry at `index`
    ///
    /// Later entries shift down by one, so indices held elsewhere are stale
    /// after this call.
    pub fn remove_entry(&mut self, index: usize) -> Option<Entry> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);
        self.reindex(index);
        self.resized = true;
        Some(removed)
    }

    fn reindex(&mut self, from: usize) {
        for (i, entry) in self.entries.iter_mut().enumerate().skip(from) {
            entry.set_index(i);
        }
    }

    /// Encoded payload length
    pub fn payload_len(&self) -> usize {
        self.entries.len() * self.entry_size as usize
    }

    /// Whether entries were added, removed or edited since decode/commit
    pub fn is_changed(&self) -> bool {
        self.resized || self.entries.iter().any(Entry::is_changed)
    }

    /// Check every entry still spans exactly one stride
    pub fn validate(&self) -> Result<()> {
        u32::try_from(self.entries.len()).map_err(|_| {
            ParamError::CorruptTree(format!(
                "section {} has {} entries",
                self.index,
                self.entries.len()
            ))
        })?;
        for entry in &self.entries {
            if entry.raw_bytes().len() != self.entry_size as usize {
                return Err(ParamError::CorruptTree(format!(
                    "section {} entry {} is {} bytes, stride is {}",
                    self.index,
                    entry.index(),
                    entry.raw_bytes().len(),
                    self.entry_size
                )));
            }
        }
        Ok(())
    }

    /// Concatenate every entry's encoding in index order
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(self.payload_len());
        for entry in &self.entries {
            output.extend_from_slice(&entry.to_bytes()?);
        }
        Ok(output)
    }

    pub(crate) fn commit(&mut self) -> Result<()> {
        for entry in &mut self.entries {
            entry.commit()?;
        }
        self.resized = false;
        Ok(())
    }
}
