//! Open, edit and save one Param file

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use param_format::{Entry, Field, FieldType, FieldValue, Param, Schema};

use crate::hex_text::from_hex_text;

/// A Param file loaded for editing
pub struct Session {
    path: PathBuf,
    param: Param,
}

impl Session {
    /// Read and decode `path`; input the codec rejects is an error here
    pub fn open(path: &Path, schema: Arc<dyn Schema>) -> Result<Self> {
        let data = fs::read(path)
            .with_context(|| format!("Failed to read Param file: {}", path.display()))?;
        let param = Param::try_decode(&data, schema)
            .with_context(|| format!("Failed to load Param file: {}", path.display()))?;
        tracing::debug!(
            "Loaded {} ({} bytes, {} sections)",
            path.display(),
            data.len(),
            param.section_count()
        );
        Ok(Self {
            path: path.to_path_buf(),
            param,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn param(&self) -> &Param {
        &self.param
    }

    pub fn param_mut(&mut self) -> &mut Param {
        &mut self.param
    }

    /// Entry `entry` of section `section`
    pub fn entry(&self, section: usize, entry: usize) -> Result<&Entry> {
        self.check_entry(section, entry)?;
        self.param
            .get_section_entry(section, entry)
            .context("Entry disappeared")
    }

    fn entry_mut(&mut self, section: usize, entry: usize) -> Result<&mut Entry> {
        self.check_entry(section, entry)?;
        self.param
            .get_section_entry_mut(section, entry)
            .context("Entry disappeared")
    }

    fn check_entry(&self, section: usize, entry: usize) -> Result<()> {
        let Some(s) = self.param.get_section(section) else {
            bail!(
                "Section {} does not exist ({} sections)",
                section,
                self.param.section_count()
            );
        };
        if entry >= s.entry_count() {
            bail!(
                "Entry {} does not exist in section {} ({} entries)",
                entry,
                section,
                s.entry_count()
            );
        }
        Ok(())
    }

    /// Set one field from its text form
    pub fn set_field(&mut self, section: usize, entry: usize, field: &str, text: &str) -> Result<()> {
        let value = {
            let current = self.entry(section, entry)?;
            let Some(f) = current.field(field) else {
                bail!(
                    "Entry {} of section {} has no field '{}'",
                    entry,
                    section,
                    field
                );
            };
            parse_field_value(f, text, self.param.schema())?
        };
        tracing::debug!("Setting {}[{}].{} = {}", section, entry, field, value);
        self.entry_mut(section, entry)?
            .set_field(field, value)
            .with_context(|| format!("Failed to set field '{}'", field))
    }

    /// Replace an entry's bytes with hex text; the length must match the stride
    pub fn paste(&mut self, section: usize, entry: usize, hex: &str) -> Result<()> {
        let bytes = from_hex_text(hex)?;
        self.entry_mut(section, entry)?
            .update_raw_data(&bytes)
            .with_context(|| format!("Failed to paste into entry {} of section {}", entry, section))
    }

    /// Append a zeroed entry; returns its index
    pub fn add_entry(&mut self, section: usize) -> Result<usize> {
        let count = self.param.section_count();
        let Some(s) = self.param.get_section_mut(section) else {
            bail!("Section {} does not exist ({} sections)", section, count);
        };
        Ok(s.add_entry().index())
    }

    pub fn remove_entry(&mut self, section: usize, entry: usize) -> Result<()> {
        self.check_entry(section, entry)?;
        if let Some(s) = self.param.get_section_mut(section) {
            s.remove_entry(entry);
        }
        Ok(())
    }

    /// Append a zeroed section; returns its index
    pub fn add_section(&mut self, entry_size: u32, entry_count: u32) -> Result<usize> {
        let section = self
            .param
            .add_section(entry_size, entry_count)
            .context("Failed to add section")?;
        Ok(section.index())
    }

    pub fn remove_section(&mut self, section: usize) -> Result<()> {
        if self.param.remove_section(section).is_none() {
            bail!(
                "Section {} does not exist ({} sections)",
                section,
                self.param.section_count()
            );
        }
        Ok(())
    }

    /// Encode and write to `output`, or back to the source file
    ///
    /// Overwriting the source copies it to `<file>.bak` first when `backup` is set.
    /// Returns the path written.
    /// Edits stay pending if encoding or writing fails.
    pub fn save(&mut self, output: Option<&Path>, backup: bool) -> Result<PathBuf> {
        let bytes = self.param.to_bytes().context("Failed to encode Param file")?;
        let target = output.unwrap_or(self.path.as_path()).to_path_buf();

        if backup && same_file(&target, &self.path) {
            let backup_path = backup_path(&target);
            fs::copy(&target, &backup_path)
                .with_context(|| format!("Failed to write backup: {}", backup_path.display()))?;
            tracing::info!("Backup written to {}", backup_path.display());
        }

        fs::write(&target, &bytes)
            .with_context(|| format!("Failed to write Param file: {}", target.display()))?;
        self.param.commit().context("Failed to encode Param file")?;
        Ok(target)
    }
}

/// Whether `a` and `b` name the same existing file
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `<file>.bak` next to `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Parse text typed for `field`
///
/// Opaque fields take hex bytes and enum fields take a label or a number.
/// Everything else uses the field type's own text form.
pub fn parse_field_value(field: &Field, text: &str, schema: &dyn Schema) -> Result<FieldValue> {
    let descriptor = field.descriptor();
    if matches!(descriptor.field_type, FieldType::Unknown(_))
        || matches!(field.value(), FieldValue::Raw(_))
    {
        let bytes = from_hex_text(text)?;
        if bytes.len() != descriptor.size {
            bail!(
                "Field '{}' takes {} bytes, got {}",
                descriptor.name,
                descriptor.size,
                bytes.len()
            );
        }
        return Ok(FieldValue::Raw(bytes));
    }

    if let Some(value) = descriptor
        .enumeration
        .as_deref()
        .and_then(|name| schema.enumeration(name))
        .and_then(|e| e.value_of(text.trim()))
    {
        return Ok(FieldValue::Int(value));
    }

    field
        .parse_value(text)
        .with_context(|| format!("Cannot parse {:?} for field '{}'", text, descriptor.name))
}

/// Decode `path` and re-encode it without edits
///
/// Fails at the first byte that differs. Returns the file length.
pub fn verify_round_trip(path: &Path, schema: Arc<dyn Schema>) -> Result<usize> {
    let session = Session::open(path, schema)?;
    let original = fs::read(path)
        .with_context(|| format!("Failed to read Param file: {}", path.display()))?;
    let encoded = session
        .param()
        .to_bytes()
        .context("Failed to encode Param file")?;

    if let Some(offset) = original
        .iter()
        .zip(&encoded)
        .position(|(a, b)| a != b)
    {
        bail!(
            "Re-encoded bytes differ at offset 0x{:X} (file {:02X}, encoded {:02X})",
            offset,
            original[offset],
            encoded[offset]
        );
    }
    if original.len() != encoded.len() {
        bail!(
            "Re-encoded length {} differs from file length {}",
            encoded.len(),
            original.len()
        );
    }
    Ok(original.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use param_format::{Enumeration, FieldDescriptor, Layout, SchemaMap};
    use tempfile::tempdir;

    const KIND: u32 = 3;

    /// Header, directory and payloads for `sections` of `(stride, payload)`
    fn build_file(sections: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let data_pointer = 0x20 + 8 * sections.len() as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"PARAM\0\0\0");
        out.extend_from_slice(&data_pointer.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&(sections.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&KIND.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        for (stride, payload) in sections {
            out.extend_from_slice(&(payload.len() as u32 / stride).to_le_bytes());
            out.extend_from_slice(&stride.to_le_bytes());
        }
        for (_, payload) in sections {
            out.extend_from_slice(payload);
        }
        out
    }

    fn schema() -> Arc<dyn Schema> {
        let mut schema = SchemaMap::new();
        schema.insert_layout(
            KIND,
            0,
            Layout::new(vec![
                FieldDescriptor::new("id", 0, 2, FieldType::U16),
                FieldDescriptor::new("kind", 2, 1, FieldType::Enum).with_enumeration("kind"),
                FieldDescriptor::new("flags", 3, 1, FieldType::from_tag("bits")),
            ]),
        );
        schema.insert_enumeration(
            Enumeration::new("kind")
                .with_value(0, "Sword")
                .with_value(1, "Bow"),
        );
        Arc::new(schema)
    }

    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("weapons.param");
        fs::write(&path, build_file(&[(4, vec![1, 0, 0, 0, 2, 0, 1, 0])])).unwrap();
        path
    }

    #[test]
    fn test_set_field_by_label_and_number() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        let mut session = Session::open(&path, schema()).unwrap();

        session.set_field(0, 0, "kind", "Bow").unwrap();
        session.set_field(0, 1, "id", "0x10").unwrap();
        session.set_field(0, 1, "flags", "7F").unwrap();

        let entry = session.entry(0, 0).unwrap();
        assert_eq!(entry.field("kind").unwrap().value(), &FieldValue::Int(1));

        let written = session.save(None, false).unwrap();
        assert_eq!(written, path);
        let data = fs::read(&path).unwrap();
        assert_eq!(&data[data.len() - 8..], &[1, 0, 1, 0, 0x10, 0, 1, 0x7F]);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_set_field_errors() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        let mut session = Session::open(&path, schema()).unwrap();

        assert!(session.set_field(0, 0, "missing", "1").is_err());
        assert!(session.set_field(0, 5, "id", "1").is_err());
        assert!(session.set_field(1, 0, "id", "1").is_err());
        assert!(session.set_field(0, 0, "id", "abc").is_err());
        assert!(session.set_field(0, 0, "flags", "0102").is_err());
    }

    #[test]
    fn test_paste_checks_length() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        let mut session = Session::open(&path, schema()).unwrap();

        session.paste(0, 1, "09 00 01 FF").unwrap();
        let entry = session.entry(0, 1).unwrap();
        assert_eq!(entry.field("id").unwrap().value(), &FieldValue::Int(9));
        assert_eq!(entry.raw_bytes(), &[9, 0, 1, 0xFF]);

        assert!(session.paste(0, 1, "09 00").is_err());
        assert!(session.paste(0, 1, "nothex").is_err());
        assert_eq!(session.entry(0, 1).unwrap().raw_bytes(), &[9, 0, 1, 0xFF]);
    }

    #[test]
    fn test_save_with_backup_and_output() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        let original = fs::read(&path).unwrap();

        let mut session = Session::open(&path, schema()).unwrap();
        session.remove_entry(0, 0).unwrap();

        let out = dir.path().join("copy.param");
        session.save(Some(&out), true).unwrap();
        assert!(!backup_path(&out).exists());
        assert_eq!(fs::read(&out).unwrap().len(), original.len() - 4);

        session.save(None, true).unwrap();
        assert_eq!(fs::read(backup_path(&path)).unwrap(), original);
        assert_eq!(fs::read(&path).unwrap().len(), original.len() - 4);
    }

    #[test]
    fn test_structural_edits() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        let mut session = Session::open(&path, schema()).unwrap();

        assert_eq!(session.add_entry(0).unwrap(), 2);
        assert_eq!(session.add_section(8, 2).unwrap(), 1);
        assert!(session.add_entry(5).is_err());
        assert!(session.remove_entry(1, 2).is_err());
        session.remove_section(1).unwrap();
        assert!(session.remove_section(1).is_err());

        let bytes = session.param_mut().commit().unwrap();
        assert_eq!(bytes.len(), 0x28 + 12);
    }

    #[test]
    fn test_open_rejects_non_param() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.param");
        fs::write(&path, b"NOTPARAM and more").unwrap();
        let err = Session::open(&path, schema()).err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to load Param file"));
    }

    #[test]
    fn test_verify_round_trip() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        let len = verify_round_trip(&path, schema()).unwrap();
        assert_eq!(len, fs::read(&path).unwrap().len());
    }

    #[test]
    fn test_output_spelled_differently_still_backs_up() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        let original = fs::read(&path).unwrap();

        let mut session = Session::open(&path, schema()).unwrap();
        session.set_field(0, 0, "id", "5").unwrap();
        let same = dir.path().join(".").join("weapons.param");
        session.save(Some(&same), true).unwrap();

        assert_eq!(fs::read(backup_path(&path)).unwrap(), original);
        assert_eq!(fs::read(&path).unwrap()[0x28], 5);
    }

    #[test]
    fn test_failed_write_keeps_edits_pending() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        let mut session = Session::open(&path, schema()).unwrap();
        session.set_field(0, 0, "id", "5").unwrap();

        let unwritable = dir.path().join("missing").join("out.param");
        assert!(session.save(Some(&unwritable), true).is_err());
        assert!(session.param().is_changed());

        session.save(None, false).unwrap();
        assert!(!session.param().is_changed());
        assert_eq!(fs::read(&path).unwrap()[0x28], 5);
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("data/weapons.param")),
            PathBuf::from("data/weapons.param.bak")
        );
    }
}
