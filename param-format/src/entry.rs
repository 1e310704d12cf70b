//! Fixed-size records
//!
//! An entry keeps the exact bytes it was decoded from. Encoding starts from a
//! copy of those bytes and overwrites only the ranges claimed by fields, so
//! padding and reserved regions pass through untouched.

use std::sync::Arc;

use crate::cursor::{patch, read_clamped};
use crate::error::{ParamError, Result};
use crate::field::{Field, FieldValue};
use crate::schema::Layout;

/// One record of a section
#[derive(Debug, Clone)]
pub struct Entry {
    index: usize,
    /// Stride of the owning section
    size: usize,
    layout: Arc<Layout>,
    raw: Vec<u8>,
    fields: Vec<Field>,
    /// Raw bytes were replaced since decode/commit
    replaced: bool,
}

impl Entry {
    /// Decode an entry from its slice of the section payload
    ///
    /// `raw` may be shorter than `size` when the file is truncated; fields past
    /// the end decode from whatever bytes remain.
    pub fn decode(index: usize, raw: &[u8], size: usize, layout: Arc<Layout>) -> Result<Self> {
        let fields = decode_fields(raw, &layout)?;
        Ok(Self {
            index,
            size,
            layout,
            raw: raw.to_vec(),
            fields,
            replaced: false,
        })
    }

    /// An all-zero entry; every field holds its type's zero value
    pub fn zeroed(index: usize, size: usize, layout: Arc<Layout>) -> Self {
        let raw = vec![0u8; size];
        let fields = layout
            .fields
            .iter()
            .map(|descriptor| {
                let bytes = read_clamped(&raw, descriptor.offset, descriptor.size);
                Field::zeroed(bytes, Arc::clone(descriptor))
            })
            .collect();
        Self {
            index,
            size,
            layout,
            raw,
            fields,
            replaced: false,
        }
    }

    /// Position within the owning section
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Bytes as decoded (or last committed / replaced)
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    /// Assign a new value to the field called `name`
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        self.field_mut(name)
            .ok_or_else(|| ParamError::UnknownField(name.to_string()))?
            .set_value(value)
    }

    /// Text of the layout's name field, or empty
    pub fn name(&self) -> &str {
        self.layout
            .name_field
            .as_deref()
            .and_then(|name| self.field(name))
            .and_then(|field| field.value().as_text())
            .unwrap_or_default()
    }

    /// Whether any field or the raw data changed since decode/commit
    pub fn is_changed(&self) -> bool {
        self.replaced || self.fields.iter().any(Field::is_changed)
    }

    /// Replace the raw bytes wholesale and re-decode every field
    ///
    /// Used by hex edits and paste. The entry is left untouched on error.
    pub fn update_raw_data(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.size {
            return Err(ParamError::SizeMismatch {
                expected: self.size,
                actual: bytes.len(),
            });
        }
        self.fields = decode_fields(bytes, &self.layout)?;
        self.raw = bytes.to_vec();
        self.replaced = true;
        Ok(())
    }

    /// Encode the entry, patching changed fields over a copy of the raw bytes
    ///
    /// Unchanged fields are already in the copy, so an overlapping unchanged
    /// field never overwrites an edit.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut output = self.raw.clone();
        for field in self.fields.iter().filter(|f| f.is_changed()) {
            patch(&mut output, field.descriptor().offset, &field.to_bytes()?);
        }
        Ok(output)
    }

    /// Encode, then adopt the result as the new baseline
    pub(crate) fn commit(&mut self) -> Result<()> {
        let bytes = self.to_bytes()?;
        for field in &mut self.fields {
            let range = read_clamped(&bytes, field.descriptor().offset, field.descriptor().size);
            field.commit(range.to_vec());
        }
        self.raw = bytes;
        self.replaced = false;
        Ok(())
    }
}

fn decode_fields(raw: &[u8], layout: &Layout) -> Result<Vec<Field>> {
    layout
        .fields
        .iter()
        .map(|descriptor| {
            Field::decode(
                read_clamped(raw, descriptor.offset, descriptor.size),
                Arc::clone(descriptor),
            )
        })
        .collect()
}
