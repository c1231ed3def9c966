//! # m2_lib
//!
//! m2_lib repairs the sequence lookup of M2 model files.
//!
//! An M2 model stores its animations as an array of sequences and a lookup from animation ID to sequence index.
//! Models converted between client versions often keep a lookup that no longer matches their sequences.
//! The lookup is derived data, so m2_lib rebuilds it from the sequences and points the header at the rebuilt lookup.
//!
//! The library only reads the header fields and sequence fields needed to rebuild the lookup.
//! The rest of the file is never parsed and is preserved byte for byte.
//!
//! ## Remapping
//! The rebuilt lookup is appended to the end of the file after aligning to 16 bytes
//! and followed by a marker used to skip files that were already remapped.
//! The only existing bytes that change are the lookup count and offset in the header.
/*!
```no_run
use m2_lib::M2File;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut m2 = M2File::from_file("character.m2")?;

let report = m2.remap(false)?;
if report.is_changed() {
    m2.write_to_file("character_fixed.m2")?;
}
println!("{}", report.summary());
# Ok(())
# }
```
 */
//! For processing files on disk with the same backup behavior as the `m2_remap` tool, see [remap_file].
pub mod header;
pub mod lookup;
pub mod marker;
pub mod patch;
pub mod sequence;

mod bytes;

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use header::{Envelope, M2Array, M2Header};
pub use lookup::LookupChange;
pub use sequence::Sequence;

/// The largest number of sequences addressable by the [i16] lookup entries.
pub const MAX_SEQUENCE_COUNT: u32 = i16::MAX as u32 + 1;

/// Errors for data that does not match the expected M2 layout.
/// No data is modified when one of these errors occurs.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The file does not start with an MD21 or MD20 tag.
    #[error(
        "Unrecognized container {:?}. Expected MD21 or MD20.",
        String::from_utf8_lossy(magic)
    )]
    UnrecognizedContainer { magic: [u8; 4] },

    /// The MD21 chunk does not contain MD20 data.
    #[error(
        "Expected MD20 inside MD21 chunk but found {:?}.",
        String::from_utf8_lossy(magic)
    )]
    UnexpectedInnerMagic { magic: [u8; 4] },

    /// A header field, array, or record extends past the end of the file.
    #[error(
        "The {} at offset {} with size {} exceeds the file length {}.",
        name,
        offset,
        size,
        file_length
    )]
    OutOfBounds {
        name: &'static str,
        offset: u64,
        size: u64,
        file_length: usize,
    },

    /// The sequence count exceeds the number of sequences addressable by the lookup.
    #[error(
        "Sequence count {} exceeds the maximum lookup index of {}.",
        count,
        MAX_SEQUENCE_COUNT - 1
    )]
    TooManySequences { count: u32 },

    /// The appended data would not be addressable with a 32 bit offset.
    #[error("File length {} exceeds the maximum supported length.", file_length)]
    FileTooLarge { file_length: u64 },

    /// An error occurred while reading a record.
    #[error(transparent)]
    BinRead(#[from] binrw::error::Error),
}

/// Errors while remapping the sequence lookup.
#[derive(Error, Debug)]
pub enum RemapError {
    /// The file contains the [REMAP_MARKER](crate::marker::REMAP_MARKER) and remapping was not forced.
    #[error("File has already been remapped. Use force to remap again.")]
    AlreadyRemapped,

    /// The data does not match the expected M2 layout.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// An error occurred while reading or writing a file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The result of rebuilding the sequence lookup.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapReport {
    /// The header before remapping.
    pub header: M2Header,
    pub sequences: Vec<Sequence>,
    /// The lookup stored in the file before remapping.
    pub old_lookup: Vec<i16>,
    /// The lookup rebuilt from [sequences](#structfield.sequences).
    pub new_lookup: Vec<i16>,
    /// The entries that differ between [old_lookup](#structfield.old_lookup) and [new_lookup](#structfield.new_lookup).
    pub changes: Vec<LookupChange>,
    /// The count and offset of the appended lookup or `None` if the data was not modified.
    pub relocated: Option<M2Array>,
}

impl RemapReport {
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` if the data was modified.
    pub fn is_changed(&self) -> bool {
        self.relocated.is_some()
    }

    /// A short description of the result like "Successfully remapped 3 entries".
    pub fn summary(&self) -> String {
        if self.is_changed() {
            format!("Successfully remapped {} entries", self.change_count())
        } else {
            "No changes needed".to_string()
        }
    }
}

/// The bytes of an M2 file.
/// Only the sequences and the sequence lookup are parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct M2File {
    data: Vec<u8>,
}

impl M2File {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Reads the file at `path`.
    /// The entire file is buffered for performance.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Writes the data to the given path.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, &self.data)
    }

    pub fn header(&self) -> Result<M2Header, FormatError> {
        M2Header::read(&self.data)
    }

    pub fn sequences(&self, header: &M2Header) -> Result<Vec<Sequence>, FormatError> {
        sequence::read_sequences(&self.data, header)
    }

    pub fn sequence_lookup(&self, header: &M2Header) -> Result<Vec<i16>, FormatError> {
        lookup::read_sequence_lookup(&self.data, header)
    }

    /// Returns `true` if the data ends with the marker appended by [M2File::remap].
    /// See [is_remapped](crate::marker::is_remapped) for details.
    pub fn is_remapped(&self) -> bool {
        marker::is_remapped(&self.data)
    }

    /// Rebuilds the sequence lookup from the sequences.
    /// If the rebuilt lookup differs from the existing lookup,
    /// the rebuilt lookup is appended and the header is updated to point to it.
    ///
    /// Files already containing the remap marker return [RemapError::AlreadyRemapped] unless `force` is `true`.
    /// The data is not modified if an error occurs.
    pub fn remap(&mut self, force: bool) -> Result<RemapReport, RemapError> {
        if !force && self.is_remapped() {
            return Err(RemapError::AlreadyRemapped);
        }

        let header = self.header()?;
        log_header(&header);

        if header.sequences.count > MAX_SEQUENCE_COUNT {
            return Err(FormatError::TooManySequences {
                count: header.sequences.count,
            }
            .into());
        }

        let sequences = self.sequences(&header)?;
        info!("Sequences found ({}):", sequences.len());
        for sequence in &sequences {
            info!("  [{}] {}", sequence.position, sequence.display_name());
        }

        let old_lookup = self.sequence_lookup(&header)?;
        let new_lookup = lookup::build_sequence_lookup(&sequences);
        info!("Old nSequenceLookup: {}", old_lookup.len());
        info!("New nSequenceLookup: {} (max_anim_id + 1)", new_lookup.len());

        let changes = lookup::diff_sequence_lookup(&old_lookup, &new_lookup);
        for change in &changes {
            let old = change
                .old
                .map(|v| v.to_string())
                .unwrap_or_else(|| "(new)".to_string());
            info!(
                "  [{}] {}: {} -> {}",
                change.index,
                // The lookup is indexed by animation ID.
                sequence::animation_name(change.index as u16),
                old,
                change.new
            );
        }

        let relocated = if changes.is_empty() {
            info!("No changes needed. The sequence lookup is already correct.");
            None
        } else {
            info!("Total changes: {}", changes.len());
            let array = patch::append_sequence_lookup(&mut self.data, &header, &new_lookup)?;
            info!("New nSequenceLookup: {}", array.count);
            info!("New ofsSequenceLookup: 0x{:X}", array.offset);
            Some(array)
        };

        Ok(RemapReport {
            header,
            sequences,
            old_lookup,
            new_lookup,
            changes,
            relocated,
        })
    }
}

fn log_header(header: &M2Header) {
    info!("  Format: {}", String::from_utf8_lossy(&header.envelope.magic()));
    info!("  Version: {}", header.version);
    info!("  Base offset: 0x{:X}", header.base_offset());
    info!("  nSequences: {}", header.sequences.count);
    info!("  ofsSequences: 0x{:X}", header.sequences.offset);
    info!("  nSequenceLookup: {}", header.sequence_lookup.count);
    info!("  ofsSequenceLookup: 0x{:X}", header.sequence_lookup.offset);
}

/// The path of the copy of `path` made before modifying a file in place like "model.m2.bak".
pub fn backup_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut backup = path.as_ref().as_os_str().to_owned();
    backup.push(".bak");
    PathBuf::from(backup)
}

/// Remaps the sequence lookup of the M2 file at `input`.
///
/// If `output` is `None`, `input` is copied to [backup_path] and then overwritten.
/// Otherwise the result is written to `output` and `input` is left unchanged.
/// Nothing is written if the lookup is already correct or an error occurs.
pub fn remap_file<P: AsRef<Path>>(
    input: P,
    output: Option<&Path>,
    force: bool,
) -> Result<RemapReport, RemapError> {
    let input = input.as_ref();
    let mut m2 = M2File::from_file(input)?;

    info!("M2 File: {}", input.display());
    let report = m2.remap(force)?;

    if report.is_changed() {
        let output = match output {
            Some(output) => output,
            None => {
                let backup = backup_path(input);
                std::fs::copy(input, &backup)?;
                info!("Backup created: {}", backup.display());
                input
            }
        };

        m2.write_to_file(output)?;
        info!("Output written to: {}", output.display());
    }

    Ok(report)
}

#[cfg(test)]
pub(crate) fn group_hex(a: &str, words_per_line: usize) -> String {
    // ex: "FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF..."
    let words = a
        .chars()
        .collect::<Vec<char>>()
        .chunks(8)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<String>>();

    words
        .chunks(words_per_line)
        .map(|c| c.join(" "))
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
macro_rules! assert_hex_eq {
    ($a:expr, $b:expr) => {
        assert!(
            $a == $b,
            "\n{} !=\n{}",
            crate::group_hex(&hex::encode($a), 8),
            crate::group_hex(&hex::encode($b), 8)
        )
    };
}

#[cfg(test)]
pub(crate) use assert_hex_eq;
