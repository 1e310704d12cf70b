//! Typed values decoded from a record's bytes

use std::fmt;
use std::sync::Arc;

use crate::cursor::{
    read_bool, read_bytes, read_cstring, read_i8, read_i16, read_i32, read_u8, read_u16, read_u32,
};
use crate::error::{ParamError, Result};
use crate::schema::{FieldDescriptor, FieldType};

/// Color stored as four bytes R, G, B, A
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Parse `#RRGGBBAA` (the leading `#` is optional)
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        if hex.len() != 8 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

/// Decoded value of a field
///
/// Integers of every width share one variant so edits can hold values that
/// do not fit yet; range checks happen when the field is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Bool(bool),
    Text(String),
    Color(Rgba),
    /// Bytes the codec could not interpret
    Raw(Vec<u8>),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Parse edit text as a value of `field_type`
    ///
    /// Integers accept decimal or `0x` hex, bools accept `true/false/1/0`,
    /// colors accept `#RRGGBBAA`. Raw bytes have no text form here.
    ///
    /// Text is taken verbatim; other kinds ignore surrounding whitespace.
    pub fn parse(field_type: &FieldType, text: &str) -> Option<Self> {
        if *field_type == FieldType::Str {
            return Some(Self::Text(text.to_string()));
        }
        let text = text.trim();
        match field_type {
            t if t.is_integer() => parse_int(text).map(Self::Int),
            FieldType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Self::Bool(true)),
                "false" | "0" => Some(Self::Bool(false)),
                _ => None,
            },
            FieldType::Rgba => Rgba::parse(text).map(Self::Color),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{:?}", v),
            Self::Color(c) => write!(f, "{}", c),
            Self::Raw(bytes) => {
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
        }
    }
}

/// Parse a decimal or `0x`-prefixed hex integer, with optional sign
fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// One decoded value inside an entry, bound to its descriptor
#[derive(Debug, Clone)]
pub struct Field {
    descriptor: Arc<FieldDescriptor>,
    /// Bytes the field was decoded from (or last committed)
    raw: Vec<u8>,
    value: FieldValue,
    /// Value captured at decode/commit, used for change tracking
    baseline: FieldValue,
}

impl Field {
    /// Decode a field from the bytes its descriptor claims
    ///
    /// Unknown types and ranges too short for their type decode to
    /// [`FieldValue::Raw`]. Only invalid UTF-8 in a string is an error.
    pub fn decode(raw: &[u8], descriptor: Arc<FieldDescriptor>) -> Result<Self> {
        let value = match decode_value(raw, &descriptor) {
            Ok(value) => value,
            Err(ParamError::ShortRead { wanted, available, .. }) => {
                tracing::debug!(
                    "Field '{}' has {} of {} bytes, keeping raw",
                    descriptor.name,
                    available,
                    wanted
                );
                FieldValue::Raw(raw.to_vec())
            }
            Err(ParamError::Decode { offset, reason }) => {
                return Err(ParamError::Decode {
                    offset: descriptor.offset + offset,
                    reason,
                });
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            descriptor,
            raw: raw.to_vec(),
            baseline: value.clone(),
            value,
        })
    }

    /// Field backed by zero bytes; holds its type's zero value
    pub(crate) fn zeroed(raw: &[u8], descriptor: Arc<FieldDescriptor>) -> Self {
        let value = decode_lenient(raw, &descriptor);
        Self {
            descriptor,
            raw: raw.to_vec(),
            baseline: value.clone(),
            value,
        }
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Bytes the field was decoded from; not updated by [`Field::set_value`]
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Whether the value differs from the one captured at decode/commit
    pub fn is_changed(&self) -> bool {
        self.value != self.baseline
    }

    /// Replace the value
    ///
    /// Only the kind is checked. Integers are range-checked by
    /// [`Field::to_bytes`], so out-of-range edits are held until encode.
    pub fn set_value(&mut self, value: FieldValue) -> Result<()> {
        let ty = &self.descriptor.field_type;
        let accepted = match &value {
            FieldValue::Raw(_) => true,
            FieldValue::Int(_) => ty.is_integer() || *ty == FieldType::Bool,
            FieldValue::Bool(_) => *ty == FieldType::Bool,
            FieldValue::Text(_) => *ty == FieldType::Str,
            FieldValue::Color(_) => *ty == FieldType::Rgba,
        };
        if !accepted {
            return Err(ParamError::TypeMismatch {
                field: self.descriptor.name.clone(),
                expected: expected_kind(ty),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Parse edit text into a value this field accepts
    pub fn parse_value(&self, text: &str) -> Result<FieldValue> {
        let ty = &self.descriptor.field_type;
        FieldValue::parse(ty, text).ok_or_else(|| ParamError::TypeMismatch {
            field: self.descriptor.name.clone(),
            expected: expected_kind(ty),
        })
    }

    /// Encode the value into exactly the bytes the field claims
    ///
    /// An unchanged field returns its original bytes, so interpretations that
    /// lose information (bool bytes other than 0/1, data after a string's NUL)
    /// still round-trip.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if !self.is_changed() {
            return Ok(self.raw.clone());
        }
        encode_value(&self.value, &self.descriptor)
    }

    /// Adopt `bytes` as the new raw data and current value as the baseline
    pub(crate) fn commit(&mut self, bytes: Vec<u8>) {
        // Re-read so values stay in step with bytes written by overlapping fields
        self.value = decode_lenient(&bytes, &self.descriptor);
        self.baseline = self.value.clone();
        self.raw = bytes;
    }
}

fn expected_kind(ty: &FieldType) -> &'static str {
    match ty {
        FieldType::Bool => "a boolean",
        FieldType::Str => "text",
        FieldType::Rgba => "a #RRGGBBAA color",
        FieldType::Unknown(_) => "raw bytes",
        _ => "an integer",
    }
}

/// Decode, keeping bytes that do not decode as raw
fn decode_lenient(raw: &[u8], descriptor: &FieldDescriptor) -> FieldValue {
    decode_value(raw, descriptor).unwrap_or_else(|_| FieldValue::Raw(raw.to_vec()))
}

fn decode_value(raw: &[u8], descriptor: &FieldDescriptor) -> Result<FieldValue> {
    let value = match &descriptor.field_type {
        FieldType::U32 => FieldValue::Int(read_u32(raw, 0)?.into()),
        FieldType::I32 => FieldValue::Int(read_i32(raw, 0)?.into()),
        FieldType::U16 => FieldValue::Int(read_u16(raw, 0)?.into()),
        FieldType::I16 => FieldValue::Int(read_i16(raw, 0)?.into()),
        FieldType::U8 => FieldValue::Int(read_u8(raw, 0)?.into()),
        FieldType::I8 => FieldValue::Int(read_i8(raw, 0)?.into()),
        FieldType::Bool => FieldValue::Bool(read_bool(raw, 0)?),
        FieldType::Str => FieldValue::Text(read_cstring(raw, 0)?),
        FieldType::Rgba => {
            let [r, g, b, a] = read_bytes::<4>(raw, 0)?;
            FieldValue::Color(Rgba::new(r, g, b, a))
        }
        FieldType::Enum => match descriptor.size {
            1 => FieldValue::Int(read_u8(raw, 0)?.into()),
            2 => FieldValue::Int(read_u16(raw, 0)?.into()),
            4 => FieldValue::Int(read_u32(raw, 0)?.into()),
            _ => FieldValue::Raw(raw.to_vec()),
        },
        FieldType::Unknown(_) => FieldValue::Raw(raw.to_vec()),
    };
    Ok(value)
}

fn encode_value(value: &FieldValue, descriptor: &FieldDescriptor) -> Result<Vec<u8>> {
    let size = descriptor.size;
    let encode_error = |reason: String| ParamError::Encode {
        field: descriptor.name.clone(),
        reason,
    };

    let bytes = match (&descriptor.field_type, value) {
        (_, FieldValue::Raw(bytes)) => bytes.clone(),
        (FieldType::Str, FieldValue::Text(text)) => {
            let mut end = text.len().min(size);
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.as_bytes()[..end].to_vec()
        }
        (FieldType::Rgba, FieldValue::Color(color)) => color.to_bytes().to_vec(),
        (FieldType::Bool, FieldValue::Bool(v)) => vec![u8::from(*v)],
        (FieldType::Bool, FieldValue::Int(v @ (0 | 1))) => vec![*v as u8],
        (FieldType::Bool, FieldValue::Int(v)) => {
            return Err(encode_error(format!("{} is not 0 or 1", v)));
        }
        (ty, FieldValue::Int(v)) if ty.is_integer() => {
            let out_of_range = || encode_error(format!("{} does not fit in {}", v, ty.tag()));
            let bytes = match ty {
                FieldType::U32 => u32::try_from(*v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
                FieldType::I32 => i32::try_from(*v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
                FieldType::U16 => u16::try_from(*v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
                FieldType::I16 => i16::try_from(*v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
                FieldType::U8 => u8::try_from(*v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
                FieldType::I8 => i8::try_from(*v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
                _ => match size {
                    1 => u8::try_from(*v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
                    2 => u16::try_from(*v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
                    4 => u32::try_from(*v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
                    _ => return Err(encode_error(format!("enum fields cannot be {} bytes", size))),
                },
            };
            if bytes.len() > size {
                return Err(encode_error(format!(
                    "{} needs {} bytes, field has {}",
                    ty.tag(),
                    bytes.len(),
                    size
                )));
            }
            bytes
        }
        (ty, _) => {
            return Err(ParamError::TypeMismatch {
                field: descriptor.name.clone(),
                expected: expected_kind(ty),
            });
        }
    };

    let mut bytes = bytes;
    bytes.resize(size, 0);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(ty: FieldType, size: usize) -> Arc<FieldDescriptor> {
        Arc::new(FieldDescriptor::new("value", 0, size, ty))
    }

    #[test]
    fn test_decode_integers() {
        let raw = [0xFE, 0xFF, 0xFF, 0xFF];
        let cases = [
            (FieldType::U32, 4, 0xFFFF_FFFE),
            (FieldType::I32, 4, -2),
            (FieldType::U16, 2, 0xFFFE),
            (FieldType::I16, 2, -2),
            (FieldType::U8, 1, 0xFE),
            (FieldType::I8, 1, -2),
        ];
        for (ty, size, expected) in cases {
            let field = Field::decode(&raw[..size], descriptor(ty, size)).unwrap();
            assert_eq!(field.value(), &FieldValue::Int(expected));
        }
    }

    #[test]
    fn test_encode_matches_decode_width() {
        // Each type encodes with the same width and signedness it decodes with
        for (ty, size, v, expected) in [
            (FieldType::U32, 4, 9, vec![9, 0, 0, 0]),
            (FieldType::I32, 4, -1, vec![0xFF; 4]),
            (FieldType::U16, 2, 0x1234, vec![0x34, 0x12]),
            (FieldType::I16, 2, -2, vec![0xFE, 0xFF]),
            (FieldType::U8, 1, 200, vec![200]),
            (FieldType::I8, 1, -128, vec![0x80]),
        ] {
            let mut field = Field::decode(&vec![0; size], descriptor(ty, size)).unwrap();
            field.set_value(FieldValue::Int(v)).unwrap();
            assert_eq!(field.to_bytes().unwrap(), expected);
        }
    }

    #[test]
    fn test_overflow_rejected_at_encode() {
        let mut field = Field::decode(&[0, 0], descriptor(FieldType::U16, 2)).unwrap();
        // Accepted at set time
        field.set_value(FieldValue::Int(70_000)).unwrap();
        assert!(matches!(field.to_bytes(), Err(ParamError::Encode { .. })));

        let mut field = Field::decode(&[0], descriptor(FieldType::I8, 1)).unwrap();
        field.set_value(FieldValue::Int(-129)).unwrap();
        assert!(matches!(field.to_bytes(), Err(ParamError::Encode { .. })));
    }

    #[test]
    fn test_string_padding_and_truncation() {
        let desc = descriptor(FieldType::Str, 8);
        let mut field = Field::decode(b"Axe\0\0\0\0\0", Arc::clone(&desc)).unwrap();
        assert_eq!(field.value(), &FieldValue::Text("Axe".to_string()));

        field.set_value(FieldValue::Text("Sword".to_string())).unwrap();
        assert_eq!(field.to_bytes().unwrap(), b"Sword\0\0\0");

        field
            .set_value(FieldValue::Text("Greatsword".to_string()))
            .unwrap();
        assert_eq!(field.to_bytes().unwrap(), b"Greatswo");

        // Never splits a multi-byte character
        field.set_value(FieldValue::Text("abcdefgé".to_string())).unwrap();
        assert_eq!(field.to_bytes().unwrap(), b"abcdefg\0");
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let desc = Arc::new(FieldDescriptor::new("name", 4, 4, FieldType::Str));
        let err = Field::decode(&[b'a', 0xFF, 0, 0], desc).unwrap_err();
        assert!(matches!(err, ParamError::Decode { offset: 5, .. }));
    }

    #[test]
    fn test_unchanged_field_keeps_raw_bytes() {
        let field = Field::decode(&[0x03], descriptor(FieldType::Bool, 1)).unwrap();
        assert_eq!(field.value(), &FieldValue::Bool(true));
        assert_eq!(field.to_bytes().unwrap(), vec![0x03]);

        let field = Field::decode(b"ab\0junk", descriptor(FieldType::Str, 7)).unwrap();
        assert_eq!(field.to_bytes().unwrap(), b"ab\0junk");
    }

    #[test]
    fn test_unknown_and_short_decode_to_raw() {
        let field = Field::decode(
            &[1, 2, 3],
            descriptor(FieldType::Unknown("float".to_string()), 3),
        )
        .unwrap();
        assert_eq!(field.value(), &FieldValue::Raw(vec![1, 2, 3]));

        let field = Field::decode(&[1, 2], descriptor(FieldType::U32, 4)).unwrap();
        assert_eq!(field.value(), &FieldValue::Raw(vec![1, 2]));
    }

    #[test]
    fn test_set_value_checks_kind() {
        let mut field = Field::decode(&[0; 4], descriptor(FieldType::U32, 4)).unwrap();
        assert!(matches!(
            field.set_value(FieldValue::Text("x".to_string())),
            Err(ParamError::TypeMismatch { .. })
        ));
        assert!(!field.is_changed());

        field.set_value(FieldValue::Int(1)).unwrap();
        assert!(field.is_changed());
        field.set_value(FieldValue::Int(0)).unwrap();
        assert!(!field.is_changed());
    }

    #[test]
    fn test_color_and_enum() {
        let mut field = Field::decode(&[1, 2, 3, 4], descriptor(FieldType::Rgba, 4)).unwrap();
        assert_eq!(field.value(), &FieldValue::Color(Rgba::new(1, 2, 3, 4)));
        field
            .set_value(field.parse_value("#FF8000C0").unwrap())
            .unwrap();
        assert_eq!(field.to_bytes().unwrap(), vec![0xFF, 0x80, 0x00, 0xC0]);

        let mut field = Field::decode(&[2, 0], descriptor(FieldType::Enum, 2)).unwrap();
        assert_eq!(field.value(), &FieldValue::Int(2));
        field.set_value(FieldValue::Int(0x1FF)).unwrap();
        assert_eq!(field.to_bytes().unwrap(), vec![0xFF, 0x01]);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(FieldValue::parse(&FieldType::U32, "0x10"), Some(FieldValue::Int(16)));
        assert_eq!(FieldValue::parse(&FieldType::I16, "-12"), Some(FieldValue::Int(-12)));
        assert_eq!(FieldValue::parse(&FieldType::Bool, "TRUE"), Some(FieldValue::Bool(true)));
        assert_eq!(FieldValue::parse(&FieldType::Bool, "yes"), None);
        assert_eq!(FieldValue::parse(&FieldType::U8, "ten"), None);
        assert_eq!(FieldValue::parse(&FieldType::Rgba, "#12"), None);
        assert_eq!(FieldValue::parse(&FieldType::U16, " 7 "), Some(FieldValue::Int(7)));
        assert_eq!(
            FieldValue::parse(&FieldType::Str, "  padded "),
            Some(FieldValue::Text("  padded ".to_string()))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Int(-3).to_string(), "-3");
        assert_eq!(FieldValue::Text("Axe".to_string()).to_string(), "\"Axe\"");
        assert_eq!(FieldValue::Color(Rgba::new(255, 0, 16, 1)).to_string(), "#FF001001");
        assert_eq!(FieldValue::Raw(vec![0xAB, 0x01]).to_string(), "AB 01");
    }
}
