//! Field layouts that give meaning to record bytes
//!
//! The codec never interprets a record on its own. A [`Schema`] maps a
//! `(record_kind_id, section_index)` pair to a [`Layout`]: the ordered list of
//! field descriptors for one record. Layouts are handed out behind [`Arc`] so
//! every entry and field of a section shares the same descriptors.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

/// Primitive kind of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// "uint" - u32
    U32,
    /// "int" - i32
    I32,
    /// "ushort" - u16
    U16,
    /// "short" - i16
    I16,
    /// "uchar" - u8
    U8,
    /// "char" - i8
    I8,
    /// "bool" - low bit of one byte
    Bool,
    /// "str" - NUL-padded UTF-8 text filling the field
    Str,
    /// "rgba" - four bytes R, G, B, A
    Rgba,
    /// "enum" - unsigned integer as wide as the field, labelled by an enumeration
    Enum,
    /// Any tag the codec does not understand; decoded as raw bytes
    Unknown(String),
}

impl FieldType {
    /// Map a schema type tag to a field type
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "uint" => Self::U32,
            "int" => Self::I32,
            "ushort" => Self::U16,
            "short" => Self::I16,
            "uchar" => Self::U8,
            "char" => Self::I8,
            "bool" => Self::Bool,
            "str" => Self::Str,
            "rgba" => Self::Rgba,
            "enum" => Self::Enum,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The schema tag for this type
    pub fn tag(&self) -> &str {
        match self {
            Self::U32 => "uint",
            Self::I32 => "int",
            Self::U16 => "ushort",
            Self::I16 => "short",
            Self::U8 => "uchar",
            Self::I8 => "char",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Rgba => "rgba",
            Self::Enum => "enum",
            Self::Unknown(tag) => tag,
        }
    }

    /// Whether values of this type are integers
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::U32 | Self::I32 | Self::U16 | Self::I16 | Self::U8 | Self::I8 | Self::Enum
        )
    }
}

/// Static metadata for one field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub description: String,
    /// Byte offset within the record
    pub offset: usize,
    /// Number of record bytes the field claims
    pub size: usize,
    pub field_type: FieldType,
    /// Name of the enumeration that labels this field's values
    pub enumeration: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: &str, offset: usize, size: usize, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            offset,
            size,
            field_type,
            enumeration: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_enumeration(mut self, enumeration: &str) -> Self {
        self.enumeration = Some(enumeration.to_string());
        self
    }

    /// The `[offset, offset + size)` range this field claims in its record
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset.saturating_add(self.size)
    }
}

/// Ordered field descriptors for one record of a section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub fields: Vec<Arc<FieldDescriptor>>,
    /// Field whose text names an entry
    pub name_field: Option<String>,
}

impl Layout {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self {
            fields: fields.into_iter().map(Arc::new).collect(),
            name_field: None,
        }
    }

    pub fn with_name_field(mut self, name: &str) -> Self {
        self.name_field = Some(name.to_string());
        self
    }

    /// Position of the field called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Named set of `(value, label)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub name: String,
    pub values: Vec<(i64, String)>,
}

impl Enumeration {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: i64, label: &str) -> Self {
        self.values.push((value, label.to_string()));
        self
    }

    /// Label for `value`, if the enumeration defines one
    pub fn label(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, label)| label.as_str())
    }

    /// Value carrying `label`
    pub fn value_of(&self, label: &str) -> Option<i64> {
        self.values
            .iter()
            .find(|(_, l)| l == label)
            .map(|(value, _)| *value)
    }
}

/// Source of record layouts and enumerations
///
/// Implementations are read-only as far as the codec is concerned; a decoded
/// Param keeps a shared handle and only ever queries it.
pub trait Schema: fmt::Debug + Send + Sync {
    /// Layout of one record in section `section_index` of a file of kind `record_kind_id`
    ///
    /// Sections the schema does not describe get an empty layout.
    fn layout(&self, record_kind_id: u32, section_index: usize) -> Arc<Layout>;

    /// Enumeration called `name`
    fn enumeration(&self, name: &str) -> Option<&Enumeration>;
}

/// Schema that describes nothing; every record is opaque bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySchema;

impl Schema for EmptySchema {
    fn layout(&self, _record_kind_id: u32, _section_index: usize) -> Arc<Layout> {
        Arc::new(Layout::default())
    }

    fn enumeration(&self, _name: &str) -> Option<&Enumeration> {
        None
    }
}

/// In-memory schema keyed by `(record_kind_id, section_index)`
#[derive(Debug, Clone, Default)]
pub struct SchemaMap {
    layouts: HashMap<(u32, usize), Arc<Layout>>,
    enumerations: HashMap<String, Enumeration>,
    empty: Arc<Layout>,
}

impl SchemaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the layout for one section of one record kind
    pub fn insert_layout(&mut self, record_kind_id: u32, section_index: usize, layout: Layout) {
        self.layouts
            .insert((record_kind_id, section_index), Arc::new(layout));
    }

    /// Register an enumeration under its own name
    pub fn insert_enumeration(&mut self, enumeration: Enumeration) {
        self.enumerations
            .insert(enumeration.name.clone(), enumeration);
    }

    /// Number of registered section layouts
    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }
}

impl Schema for SchemaMap {
    fn layout(&self, record_kind_id: u32, section_index: usize) -> Arc<Layout> {
        self.layouts
            .get(&(record_kind_id, section_index))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.empty))
    }

    fn enumeration(&self, name: &str) -> Option<&Enumeration> {
        self.enumerations.get(name)
    }
}
