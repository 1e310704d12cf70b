//! Schema file parsing
//!
//! Maps a TOML description of record layouts into a [`SchemaMap`].
//!
//! ```toml
//! [[param]]
//! id = 3
//! name = "weapons"
//!
//! [[param.section]]
//! index = 0
//! name_field = "name"
//!
//! [[param.section.field]]
//! name = "id"
//! offset = 0
//! size = 4
//! type = "uint"
//!
//! [[param.section.field]]
//! name = "kind"
//! offset = 4
//! size = 1
//! type = "enum"
//! enum = "weapon_kind"
//!
//! [enums.weapon_kind]
//! values = [{ value = 0, label = "Sword" }, { value = 1, label = "Bow" }]
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use hashbrown::{HashMap, HashSet};
use param_format::{Enumeration, FieldDescriptor, FieldType, Layout, SchemaMap};
use serde::Deserialize;

/// Schema file structure
#[derive(Debug, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub param: Vec<ParamDef>,
    #[serde(default)]
    pub enums: HashMap<String, EnumDef>,
}

/// Layouts for one record kind
#[derive(Debug, Deserialize)]
pub struct ParamDef {
    /// Record kind id from the file header
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub section: Vec<SectionDef>,
}

/// Layout of one section's records
#[derive(Debug, Deserialize)]
pub struct SectionDef {
    pub index: usize,
    /// Text field that names each entry
    #[serde(default)]
    pub name_field: Option<String>,
    #[serde(default)]
    pub field: Vec<FieldDef>,
}

/// Single field descriptor
#[derive(Debug, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub offset: usize,
    pub size: usize,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, rename = "enum")]
    pub enumeration: Option<String>,
}

/// Enumeration values
#[derive(Debug, Default, Deserialize)]
pub struct EnumDef {
    #[serde(default)]
    pub values: Vec<EnumValueDef>,
}

#[derive(Debug, Deserialize)]
pub struct EnumValueDef {
    pub value: i64,
    pub label: String,
}

impl SchemaFile {
    /// Load schema from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid schema: {}", path.display()))
    }

    /// Parse schema from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse schema TOML")
    }

    /// Check cross references and build the in-memory schema
    pub fn into_schema(self) -> Result<SchemaMap> {
        let mut schema = SchemaMap::new();
        let mut seen = HashSet::new();

        for param in &self.param {
            for section in &param.section {
                if !seen.insert((param.id, section.index)) {
                    bail!(
                        "Section {} of param {} is defined more than once",
                        section.index,
                        param.id
                    );
                }
                let layout = self.build_layout(param, section)?;
                schema.insert_layout(param.id, section.index, layout);
            }
        }

        for (name, def) in self.enums {
            let enumeration = def
                .values
                .into_iter()
                .fold(Enumeration::new(&name), |e, v| e.with_value(v.value, &v.label));
            schema.insert_enumeration(enumeration);
        }

        Ok(schema)
    }

    fn build_layout(&self, param: &ParamDef, section: &SectionDef) -> Result<Layout> {
        let mut fields = Vec::with_capacity(section.field.len());
        for def in &section.field {
            let field_type = FieldType::from_tag(&def.field_type);
            if let FieldType::Unknown(tag) = &field_type {
                tracing::warn!(
                    "Field '{}' in param {} section {} has unknown type '{}', showing raw bytes",
                    def.name,
                    param.id,
                    section.index,
                    tag
                );
            }
            if field_type == FieldType::Enum && def.enumeration.is_none() {
                bail!("Enum field '{}' does not name an enumeration", def.name);
            }
            if let Some(name) = &def.enumeration
                && !self.enums.contains_key(name)
            {
                bail!("Field '{}' references unknown enum '{}'", def.name, name);
            }

            let mut descriptor = FieldDescriptor::new(&def.name, def.offset, def.size, field_type)
                .with_description(&def.description);
            if let Some(name) = &def.enumeration {
                descriptor = descriptor.with_enumeration(name);
            }
            fields.push(descriptor);
        }

        let mut layout = Layout::new(fields);
        if let Some(name_field) = &section.name_field {
            let Some(position) = layout.position(name_field) else {
                bail!(
                    "Name field '{}' is not a field of param {} section {}",
                    name_field,
                    param.id,
                    section.index
                );
            };
            if layout.fields[position].field_type != FieldType::Str {
                bail!("Name field '{}' must have type \"str\"", name_field);
            }
            layout = layout.with_name_field(name_field);
        }
        Ok(layout)
    }
}

/// Load and build a schema in one step
pub fn load_schema(path: &Path) -> Result<SchemaMap> {
    let schema = SchemaFile::load(path)?.into_schema()?;
    tracing::info!(
        "Loaded schema {} ({} section layouts)",
        path.display(),
        schema.layout_count()
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use param_format::Schema;

    const SCHEMA: &str = r#"
        [[param]]
        id = 3
        name = "weapons"

        [[param.section]]
        index = 0
        name_field = "name"

        [[param.section.field]]
        name = "id"
        description = "Weapon id"
        offset = 0
        size = 4
        type = "uint"

        [[param.section.field]]
        name = "kind"
        offset = 4
        size = 1
        type = "enum"
        enum = "weapon_kind"

        [[param.section.field]]
        name = "name"
        offset = 8
        size = 8
        type = "str"

        [[param.section.field]]
        name = "scale"
        offset = 16
        size = 4
        type = "float"

        [enums.weapon_kind]
        values = [{ value = 0, label = "Sword" }, { value = 1, label = "Bow" }]
    "#;

    #[test]
    fn test_parse_schema() {
        let schema = SchemaFile::parse(SCHEMA).unwrap().into_schema().unwrap();
        let layout = schema.layout(3, 0);
        assert_eq!(layout.fields.len(), 4);
        assert_eq!(layout.fields[0].description, "Weapon id");
        assert_eq!(layout.fields[1].field_type, FieldType::Enum);
        assert_eq!(layout.fields[1].enumeration.as_deref(), Some("weapon_kind"));
        assert_eq!(
            layout.fields[3].field_type,
            FieldType::Unknown("float".to_string())
        );
        assert_eq!(layout.name_field.as_deref(), Some("name"));

        assert_eq!(
            schema.enumeration("weapon_kind").unwrap().label(1),
            Some("Bow")
        );
        assert!(schema.layout(3, 1).fields.is_empty());
    }

    #[test]
    fn test_empty_schema_file() {
        let schema = SchemaFile::parse("").unwrap().into_schema().unwrap();
        assert_eq!(schema.layout_count(), 0);
    }

    #[test]
    fn test_missing_enum_is_error() {
        let content = SCHEMA.replace("[enums.weapon_kind]", "[enums.other]");
        let err = SchemaFile::parse(&content)
            .unwrap()
            .into_schema()
            .unwrap_err();
        assert!(err.to_string().contains("unknown enum 'weapon_kind'"));
    }

    #[test]
    fn test_enum_without_reference_is_error() {
        let content = SCHEMA.replace("enum = \"weapon_kind\"", "");
        assert!(SchemaFile::parse(&content).unwrap().into_schema().is_err());
    }

    #[test]
    fn test_bad_name_field_is_error() {
        let content = SCHEMA.replace("name_field = \"name\"", "name_field = \"id\"");
        let err = SchemaFile::parse(&content)
            .unwrap()
            .into_schema()
            .unwrap_err();
        assert!(err.to_string().contains("must have type"));
    }

    #[test]
    fn test_duplicate_section_is_error() {
        let content = format!(
            "{}\n[[param.section]]\nindex = 0\n",
            SCHEMA.split("[enums").next().unwrap()
        );
        let content = format!("{}\n[enums.weapon_kind]\nvalues = []\n", content);
        let err = SchemaFile::parse(&content)
            .unwrap()
            .into_schema()
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_missing_required_key() {
        assert!(SchemaFile::parse("[[param]]\nname = \"x\"").is_err());
    }
}
