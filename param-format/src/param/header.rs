//! Fixed file header and section directory

use crate::cursor::{read_bytes, read_u32};
use crate::error::Result;
use crate::{DIRECTORY_ENTRY_SIZE, HEADER_SIZE, PARAM_MAGIC};

/// Header scalars following the magic
///
/// `unknown2` overlaps `record_kind_id`: the last four of its eight bytes are
/// the kind id. Encoding writes `unknown2` first and the kind id over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Offset of the first section payload, as read from the file
    pub data_pointer: u32,
    pub unknown1: [u8; 4],
    /// Section count, as read from the file
    pub section_count: u32,
    pub unknown2: [u8; 8],
    pub record_kind_id: u32,
    /// Bytes 0x1C..0x20
    pub reserved: [u8; 4],
}

impl Header {
    /// Read the header scalars; the magic is checked by the caller
    pub fn read(data: &[u8]) -> Result<Self> {
        Ok(Self {
            data_pointer: read_u32(data, 0x08)?,
            unknown1: read_bytes(data, 0x0C)?,
            section_count: read_u32(data, 0x10)?,
            unknown2: read_bytes(data, 0x14)?,
            record_kind_id: read_u32(data, 0x18)?,
            reserved: read_bytes(data, 0x1C)?,
        })
    }

    /// Write magic and header, 0x20 bytes in total
    pub fn write(&self, output: &mut Vec<u8>, data_pointer: u32, section_count: u32) {
        let start = output.len();
        output.extend_from_slice(PARAM_MAGIC);
        output.extend_from_slice(&data_pointer.to_le_bytes());
        output.extend_from_slice(&self.unknown1);
        output.extend_from_slice(&section_count.to_le_bytes());
        output.extend_from_slice(&self.unknown2);
        output[start + 0x18..start + 0x1C].copy_from_slice(&self.record_kind_id.to_le_bytes());
        output.extend_from_slice(&self.reserved);
        debug_assert_eq!(output.len() - start, HEADER_SIZE);
    }
}

/// One `(entry_count, entry_size)` pair of the section directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub entry_count: u32,
    pub entry_size: u32,
}

impl DirectoryEntry {
    /// Payload length of the section this entry describes
    pub fn payload_len(&self) -> usize {
        (self.entry_count as usize).saturating_mul(self.entry_size as usize)
    }
}

/// Read `count` directory entries starting at 0x20
pub fn read_directory(data: &[u8], count: u32) -> Result<Vec<DirectoryEntry>> {
    (0..count as usize)
        .map(|i| {
            let offset = HEADER_SIZE + i * DIRECTORY_ENTRY_SIZE;
            Ok(DirectoryEntry {
                entry_count: read_u32(data, offset)?,
                entry_size: read_u32(data, offset + 4)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParamError;

    fn sample() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(PARAM_MAGIC);
        data.extend_from_slice(&0x30u32.to_le_bytes());
        data.extend_from_slice(&[1, 2, 3, 4]);
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[5, 6, 7, 8]);
        data.extend_from_slice(&0x11u32.to_le_bytes());
        data.extend_from_slice(&[9, 10, 11, 12]);
        data
    }

    #[test]
    fn test_header_read_write() {
        let data = sample();
        let header = Header::read(&data).unwrap();
        assert_eq!(header.data_pointer, 0x30);
        assert_eq!(header.unknown1, [1, 2, 3, 4]);
        assert_eq!(header.section_count, 2);
        assert_eq!(header.unknown2, [5, 6, 7, 8, 0x11, 0, 0, 0]);
        assert_eq!(header.record_kind_id, 0x11);
        assert_eq!(header.reserved, [9, 10, 11, 12]);

        let mut output = Vec::new();
        header.write(&mut output, 0x30, 2);
        assert_eq!(output, data);
    }

    #[test]
    fn test_kind_id_written_over_unknown2() {
        let mut header = Header::read(&sample()).unwrap();
        header.record_kind_id = 0xAABB;
        let mut output = Vec::new();
        header.write(&mut output, 0x20, 0);
        assert_eq!(&output[0x14..0x18], &[5, 6, 7, 8]);
        assert_eq!(&output[0x18..0x1C], &[0xBB, 0xAA, 0, 0]);
        assert_eq!(&output[0x10..0x14], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_short_header_fails() {
        let data = sample();
        assert!(matches!(
            Header::read(&data[..0x1A]),
            Err(ParamError::ShortRead { .. })
        ));
    }

    #[test]
    fn test_read_directory() {
        let mut data = sample();
        data.extend_from_slice(&[3, 0, 0, 0, 16, 0, 0, 0]);
        data.extend_from_slice(&[1, 0, 0, 0, 8, 0, 0, 0]);
        let directory = read_directory(&data, 2).unwrap();
        assert_eq!(
            directory,
            vec![
                DirectoryEntry {
                    entry_count: 3,
                    entry_size: 16
                },
                DirectoryEntry {
                    entry_count: 1,
                    entry_size: 8
                },
            ]
        );
        assert_eq!(directory[0].payload_len(), 48);
        assert!(read_directory(&data, 3).is_err());
    }
}
