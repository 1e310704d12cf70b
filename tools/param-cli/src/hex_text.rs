//! Hex text for raw entry bytes

use anyhow::{Context, Result};

/// Format bytes as uppercase hex pairs, `columns` per row
pub fn to_hex_text(bytes: &[u8], columns: usize) -> String {
    bytes
        .chunks(columns.max(1))
        .map(|row| {
            row.iter()
                .map(|b| hex::encode_upper([*b]))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse hex text, ignoring whitespace between digits
pub fn from_hex_text(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits).with_context(|| format!("Invalid hex text: {:?}", text.trim()))
}
