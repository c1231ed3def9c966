//! Animation sequences stored as fixed size records in the MD20 data.
//! Only the animation ID and sub index are read.
//! The remaining fields such as timing, flags, and bounds are left untouched.
use binrw::BinRead;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bytes::read_elements;
use crate::header::M2Header;
use crate::FormatError;

/// The size in bytes of each sequence record.
pub const SEQUENCE_SIZE: u64 = 0x40;

/// An animation clip such as a walk or attack animation.
/// Variations of the same animation share an [animation_id](#structfield.animation_id)
/// and are distinguished by [sub_index](#structfield.sub_index).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[br(little, import(position: usize))]
pub struct Sequence {
    /// The ID of the animation in AnimationData.dbc.
    pub animation_id: u16,
    pub sub_index: u16,
    /// The index of this [Sequence] in the sequences array.
    #[br(calc = position)]
    pub position: usize,
}

impl Sequence {
    /// The name used for log output like "Anim_5_1".
    pub fn display_name(&self) -> String {
        format!("{}_{}", animation_name(self.animation_id), self.sub_index)
    }
}

/// The name used for log output like "Anim_5".
/// Names are generated from the ID since the animation names are stored outside the model.
pub fn animation_name(animation_id: u16) -> String {
    format!("Anim_{animation_id}")
}

/// Reads every sequence record described by `header` in order.
pub fn read_sequences(data: &[u8], header: &M2Header) -> Result<Vec<Sequence>, FormatError> {
    read_elements(
        data,
        "sequences",
        header.absolute_offset(header.sequences.offset),
        header.sequences.count,
        SEQUENCE_SIZE,
        |i| (i,),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{Envelope, M2Array};

    fn header(envelope: Envelope, count: u32, offset: u32) -> M2Header {
        M2Header {
            envelope,
            version: 264,
            sequences: M2Array { count, offset },
            sequence_lookup: M2Array::default(),
        }
    }

    fn record(animation_id: u16, sub_index: u16) -> Vec<u8> {
        let mut bytes = vec![0xCC; SEQUENCE_SIZE as usize];
        bytes[0..2].copy_from_slice(&animation_id.to_le_bytes());
        bytes[2..4].copy_from_slice(&sub_index.to_le_bytes());
        bytes
    }

    #[test]
    fn read_sequences_direct() {
        let mut data = vec![0u8; 16];
        data.extend(record(5, 0));
        data.extend(record(3, 0));
        data.extend(record(5, 1));

        let sequences = read_sequences(&data, &header(Envelope::Direct, 3, 16)).unwrap();
        assert_eq!(
            vec![
                Sequence {
                    animation_id: 5,
                    sub_index: 0,
                    position: 0
                },
                Sequence {
                    animation_id: 3,
                    sub_index: 0,
                    position: 1
                },
                Sequence {
                    animation_id: 5,
                    sub_index: 1,
                    position: 2
                },
            ],
            sequences
        );
    }

    #[test]
    fn read_sequences_relative_to_base_offset() {
        let mut data = vec![0u8; 8 + 16];
        data.extend(record(0x0102, 7));

        let sequences = read_sequences(&data, &header(Envelope::Chunked, 1, 16)).unwrap();
        assert_eq!(0x0102, sequences[0].animation_id);
        assert_eq!(7, sequences[0].sub_index);
        assert_eq!(0, sequences[0].position);
    }

    #[test]
    fn read_sequences_empty_ignores_offset() {
        let sequences = read_sequences(&[], &header(Envelope::Direct, 0, 0xFFFF)).unwrap();
        assert!(sequences.is_empty());
    }

    #[test]
    fn read_sequences_truncated_record() {
        let mut data = record(1, 0);
        data.truncate(0x3F);

        let result = read_sequences(&data, &header(Envelope::Direct, 1, 0));
        assert!(matches!(
            result,
            Err(FormatError::OutOfBounds {
                name: "sequences",
                offset: 0,
                size: 0x40,
                file_length: 0x3F
            })
        ));
    }

    #[test]
    fn display_names() {
        let sequence = Sequence {
            animation_id: 143,
            sub_index: 2,
            position: 0,
        };
        assert_eq!("Anim_143_2", sequence.display_name());
        assert_eq!("Anim_0", animation_name(0));
    }
}
