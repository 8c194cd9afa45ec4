// --- Constants for the wire format ---

pub const DEFAULT_FRAME_ALLOCATION_SIZE: usize = 1024 * 1024; // 1 MB

pub const EOS_MARKER_LEN: usize = 8; // 8 bytes cont 0xFFFFFFFF + 0u32.
pub const CONTINUATION_MARKER_LEN: usize = 4; // 4 bytes - <continuation: 0xFFFFFFFF>
pub const CONTINUATION_SENTINEL: u32 = 0xFFFF_FFFF;
pub const METADATA_SIZE_PREFIX: usize = 4; // 4 bytes - <metadata_size: int32>

/// Fixed metadata prefix: message kind (u8) + body length (u64, LE).
/// The frame decoder reads the body length from here without a full
/// metadata parse.
pub const METADATA_HEADER_LEN: usize = 9;
