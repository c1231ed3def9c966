/// Appended after a rebuilt sequence lookup to mark the file as remapped.
pub const REMAP_MARKER: [u8; 8] = *b"SEQREMAP";

/// The number of bytes at the end of the file searched for [REMAP_MARKER].
const MARKER_SEARCH_SIZE: usize = 64;

/// Returns `true` if [REMAP_MARKER] appears in the last 64 bytes of `data`.
///
/// Any data appended to the file after remapping can push the marker out of the searched range.
/// Unrelated trailing data can also contain the marker by chance.
pub fn is_remapped(data: &[u8]) -> bool {
    let tail = &data[data.len().saturating_sub(MARKER_SEARCH_SIZE)..];
    tail.windows(REMAP_MARKER.len())
        .any(|window| window == REMAP_MARKER)
}
