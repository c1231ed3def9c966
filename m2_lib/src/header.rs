//! The MD20 header and the two envelopes it can be stored in.
//! Legion and later clients wrap the MD20 data in an MD21 chunk.
//! Older clients and most downported models store the MD20 data at the start of the file.
use binrw::BinRead;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bytes::{read_at, read_magic};
use crate::FormatError;

pub const MD21_MAGIC: [u8; 4] = *b"MD21";
pub const MD20_MAGIC: [u8; 4] = *b"MD20";

/// The size of the MD21 chunk magic and chunk size preceding the MD20 data.
const MD21_CHUNK_HEADER_SIZE: usize = 8;

/// The size of the MD20 header up to and including the sequence lookup array.
pub(crate) const HEADER_SIZE: u64 = 0x2C;

/// The offset of the sequence lookup [M2Array] relative to the start of the MD20 data.
pub(crate) const SEQUENCE_LOOKUP_OFFSET: u64 = 0x24;

/// An element count and an offset relative to the start of the MD20 data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct M2Array {
    pub count: u32,
    pub offset: u32,
}

/// The outer container of the MD20 data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// An MD21 chunk containing the MD20 data after the chunk header.
    Chunked,
    /// MD20 data at the start of the file.
    Direct,
}

impl Envelope {
    /// The tag stored in the first 4 bytes of the file.
    pub fn magic(&self) -> [u8; 4] {
        match self {
            Envelope::Chunked => MD21_MAGIC,
            Envelope::Direct => MD20_MAGIC,
        }
    }

    /// The absolute offset of the MD20 data.
    /// All header offsets are relative to this position.
    pub fn base_offset(&self) -> usize {
        match self {
            Envelope::Chunked => MD21_CHUNK_HEADER_SIZE,
            Envelope::Direct => 0,
        }
    }
}

// The fields skipped by the header are the model name, global flags, and global loops.
#[derive(BinRead, Debug)]
#[br(little, magic = b"MD20")]
struct Md20Header {
    version: u32,
    #[br(pad_before = 0x14)]
    sequences: M2Array,
    sequence_lookup: M2Array,
}

/// The header fields needed to locate the sequences and the sequence lookup.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct M2Header {
    pub envelope: Envelope,
    pub version: u32,
    /// The 64 byte sequence records.
    pub sequences: M2Array,
    /// The lookup from animation ID to the index in [sequences](#structfield.sequences).
    pub sequence_lookup: M2Array,
}

impl M2Header {
    /// Detects the [Envelope] and reads the MD20 header from `data`.
    pub fn read(data: &[u8]) -> Result<Self, FormatError> {
        let envelope = match read_magic(data, 0)? {
            MD21_MAGIC => {
                let inner = read_magic(data, MD21_CHUNK_HEADER_SIZE)?;
                if inner != MD20_MAGIC {
                    return Err(FormatError::UnexpectedInnerMagic { magic: inner });
                }
                Envelope::Chunked
            }
            MD20_MAGIC => Envelope::Direct,
            magic => return Err(FormatError::UnrecognizedContainer { magic }),
        };

        let header: Md20Header = read_at(
            data,
            "header",
            envelope.base_offset() as u64,
            HEADER_SIZE,
            (),
        )?;

        Ok(Self {
            envelope,
            version: header.version,
            sequences: header.sequences,
            sequence_lookup: header.sequence_lookup,
        })
    }

    pub fn base_offset(&self) -> usize {
        self.envelope.base_offset()
    }

    /// Converts an offset relative to the MD20 data to an absolute offset in the file.
    pub fn absolute_offset(&self, relative_offset: u32) -> u64 {
        self.base_offset() as u64 + relative_offset as u64
    }
}
