//! Relocates the sequence lookup to the end of the file.
//! The existing lookup is left in place since other data may share its bytes.
//! Only the lookup count and offset in the header are modified.
use crate::bytes::{check_range, round_up, write_u32_at};
use crate::header::{M2Array, M2Header, SEQUENCE_LOOKUP_OFFSET};
use crate::marker::REMAP_MARKER;
use crate::FormatError;

/// The alignment in bytes of the appended lookup.
pub const LOOKUP_ALIGNMENT: u64 = 16;

/// Appends `lookup` and [REMAP_MARKER] to `data` and points the header at the appended lookup.
/// The data is padded with zeros so the lookup starts at a multiple of 16 bytes.
///
/// Returns the new lookup count and offset relative to the MD20 data.
/// No bytes are modified if an error occurs.
pub fn append_sequence_lookup(
    data: &mut Vec<u8>,
    header: &M2Header,
    lookup: &[i16],
) -> Result<M2Array, FormatError> {
    let base_offset = header.base_offset() as u64;

    // Check the header fields before appending anything.
    let count_offset = base_offset + SEQUENCE_LOOKUP_OFFSET;
    check_range("sequence lookup array", count_offset, 8, data.len())?;

    let aligned_size = round_up(data.len() as u64, LOOKUP_ALIGNMENT);

    // The appended data must still be addressable from the header.
    let offset = u32::try_from(aligned_size - base_offset).map_err(|_| {
        FormatError::FileTooLarge {
            file_length: aligned_size,
        }
    })?;
    let count = u32::try_from(lookup.len()).map_err(|_| FormatError::FileTooLarge {
        file_length: aligned_size + lookup.len() as u64 * 2,
    })?;

    data.resize(aligned_size as usize, 0u8);
    data.reserve(lookup.len() * 2 + REMAP_MARKER.len());
    for value in lookup {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.extend_from_slice(&REMAP_MARKER);

    write_u32_at(data, "sequence lookup count", count_offset, count)?;
    write_u32_at(data, "sequence lookup offset", count_offset + 4, offset)?;

    Ok(M2Array { count, offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_hex_eq;
    use crate::header::Envelope;
    use hexlit::hex;

    fn header(envelope: Envelope) -> M2Header {
        M2Header {
            envelope,
            version: 264,
            sequences: M2Array::default(),
            sequence_lookup: M2Array::default(),
        }
    }

    fn direct_data(length: usize) -> Vec<u8> {
        let mut data = vec![0xAA; length];
        data[0..4].copy_from_slice(b"MD20");
        data
    }

    #[test]
    fn append_aligned() {
        let mut data = direct_data(0x30);
        let array = append_sequence_lookup(&mut data, &header(Envelope::Direct), &[-1, 0]).unwrap();

        assert_eq!(M2Array { count: 2, offset: 0x30 }, array);
        assert_eq!(0x30 + 4 + 8, data.len());
        assert_hex_eq!(&data[0x24..0x2C], &hex!("02000000 30000000"));
        assert_hex_eq!(&data[0x30..], &hex!("FFFF0000 53455152 454D4150"));
    }

    #[test]
    fn append_with_padding() {
        let mut data = direct_data(0x31);
        let array = append_sequence_lookup(&mut data, &header(Envelope::Direct), &[3]).unwrap();

        assert_eq!(M2Array { count: 1, offset: 0x40 }, array);
        assert_eq!(0x40 + 2 + 8, data.len());
        assert_hex_eq!(&data[0x31..0x40], &[0u8; 15]);
        assert_hex_eq!(&data[0x40..0x42], &hex!("0300"));
    }

    #[test]
    fn append_offset_relative_to_chunk() {
        let mut data = vec![0xAA; 0x3A];
        data[0..4].copy_from_slice(b"MD21");
        data[8..12].copy_from_slice(b"MD20");
        let array =
            append_sequence_lookup(&mut data, &header(Envelope::Chunked), &[0, 1]).unwrap();

        // The lookup starts at 0x40 in the file.
        assert_eq!(M2Array { count: 2, offset: 0x38 }, array);
        assert_hex_eq!(&data[0x2C..0x34], &hex!("02000000 38000000"));
        assert_hex_eq!(&data[0x40..0x44], &hex!("00000100"));
    }

    #[test]
    fn append_empty_lookup() {
        let mut data = direct_data(0x30);
        let array = append_sequence_lookup(&mut data, &header(Envelope::Direct), &[]).unwrap();

        assert_eq!(M2Array { count: 0, offset: 0x30 }, array);
        assert_hex_eq!(&data[0x30..], &REMAP_MARKER);
    }

    #[test]
    fn append_preserves_existing_bytes() {
        let original = direct_data(0x45);
        let mut data = original.clone();
        append_sequence_lookup(&mut data, &header(Envelope::Direct), &[0, -1, 1]).unwrap();

        for (i, (before, after)) in original.iter().zip(data.iter()).enumerate() {
            if !(0x24..0x2C).contains(&i) {
                assert_eq!(before, after, "byte {i} changed");
            }
        }
    }

    #[test]
    fn append_truncated_header() {
        let mut data = direct_data(0x28);
        let result = append_sequence_lookup(&mut data, &header(Envelope::Direct), &[0]);

        assert!(matches!(result, Err(FormatError::OutOfBounds { .. })));
        assert_eq!(direct_data(0x28), data);
    }
}
