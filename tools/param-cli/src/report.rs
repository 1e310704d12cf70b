//! Text reports for `info` and `dump`

use anyhow::{Result, bail};
use param_format::{Entry, FieldValue, Param, Schema, Section};

/// Header summary and one line per section
pub fn describe_param(param: &Param) -> String {
    let mut lines = Vec::new();
    if let Some(kind) = param.record_kind_id() {
        lines.push(format!("Record kind: {}", kind));
    }
    lines.push(format!("Data pointer: 0x{:X}", param.data_pointer()));
    lines.push(format!("Sections: {}", param.section_count()));
    for section in param.sections() {
        lines.push(format!("  {}", section_line(section)));
    }
    lines.join("\n")
}

fn section_line(section: &Section) -> String {
    format!(
        "[{}] {} entries x {} bytes, {} fields",
        section.index(),
        section.entry_count(),
        section.entry_size(),
        section.layout().fields.len()
    )
}

/// Section line followed by each entry's index and name
pub fn describe_section(section: &Section) -> String {
    let mut lines = vec![format!("Section {}", section_line(section))];
    for entry in section.entries() {
        match entry.name() {
            "" => lines.push(format!("  {}", entry.index())),
            name => lines.push(format!("  {}: {}", entry.index(), name)),
        }
    }
    lines.join("\n")
}

/// Every field of one entry, with enum labels where the schema has them
pub fn describe_entry(entry: &Entry, schema: &dyn Schema) -> String {
    let mut lines = vec![match entry.name() {
        "" => format!("Entry {}", entry.index()),
        name => format!("Entry {}: {}", entry.index(), name),
    }];
    if entry.fields().is_empty() {
        lines.push("  (no fields)".to_string());
    }
    for field in entry.fields() {
        let descriptor = field.descriptor();
        let mut line = format!(
            "  {} ({} @ 0x{:02X}, {} bytes) = {}",
            descriptor.name,
            descriptor.field_type.tag(),
            descriptor.offset,
            descriptor.size,
            field.value()
        );
        if let FieldValue::Int(value) = field.value()
            && let Some(label) = descriptor
                .enumeration
                .as_deref()
                .and_then(|name| schema.enumeration(name))
                .and_then(|e| e.label(*value))
        {
            line.push_str(&format!(" [{}]", label));
        }
        if !descriptor.description.is_empty() {
            line.push_str(&format!("  # {}", descriptor.description));
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Whole file, one section, or one entry
pub fn dump(param: &Param, section: Option<usize>, entry: Option<usize>) -> Result<String> {
    let Some(section_index) = section else {
        return Ok(param
            .sections()
            .iter()
            .map(describe_section)
            .collect::<Vec<_>>()
            .join("\n"));
    };

    let Some(section) = param.get_section(section_index) else {
        bail!(
            "Section {} does not exist ({} sections)",
            section_index,
            param.section_count()
        );
    };

    match entry {
        None => Ok(describe_section(section)),
        Some(entry_index) => match section.entry(entry_index) {
            Some(entry) => Ok(describe_entry(entry, param.schema())),
            None => bail!(
                "Entry {} does not exist in section {} ({} entries)",
                entry_index,
                section_index,
                section.entry_count()
            ),
        },
    }
}
