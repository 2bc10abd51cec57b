//! Wire-format constants for the chunk header, filter pipeline and codec
//! registry. Mirrors `c-blosc2/include/blosc2.h`.

/// Chunk format version written by this crate.
pub const BLOSC_VERSION_FORMAT: u8 = 5;

/// Length in bytes of the minimal (Blosc1-compatible) header.
pub const MIN_HEADER_LEN: usize = 16;
/// Length in bytes of the extended (Blosc2) header.
pub const EXTENDED_HEADER_LEN: usize = 32;
/// Maximum overhead a chunk can add over the source buffer.
pub const MAX_OVERHEAD: usize = EXTENDED_HEADER_LEN;

/// Minimum source size worth compressing; smaller buffers go MEMCPYED.
pub const MIN_BUFFERSIZE: usize = 32;
/// Largest buffer this crate will compress in one chunk.
pub const MAX_BUFFERSIZE: usize = i32::MAX as usize - MAX_OVERHEAD;
/// Largest permitted block size.
pub const MAX_BLOCKSIZE: usize = MAX_BUFFERSIZE;
/// Largest permitted typesize.
pub const MAX_TYPESIZE: usize = u8::MAX as usize;

/// Typesize above which block splitting is never attempted (§4.6 step 2).
pub const MAX_SPLIT_TYPESIZE: usize = 256;

pub const L1: usize = 32 * 1024;

/// Number of filter slots in a pipeline.
pub const MAX_FILTERS: usize = 6;

// --- flags byte (offset 2 in the minimal header) ---
pub const FLAG_BYTE_SHUFFLE: u8 = 0x01;
pub const FLAG_MEMCPYED: u8 = 0x02;
pub const FLAG_BIT_SHUFFLE: u8 = 0x04;
pub const FLAG_DELTA: u8 = 0x08;
pub const FLAG_DONT_SPLIT: u8 = 0x10;
/// Bits 5-7: 3-bit codec id.
pub const FLAG_CODEC_SHIFT: u8 = 5;
pub const FLAG_CODEC_MASK: u8 = 0x07;

/// Both shuffle flags set together means "extended header follows".
pub const FLAG_EXTENDED_HEADER_MARKER: u8 = FLAG_BYTE_SHUFFLE | FLAG_BIT_SHUFFLE;

// --- ext_flags byte (offset 31 in the extended header) ---
pub const EXT_FLAG_BIGENDIAN: u8 = 0x01;
pub const EXT_FLAG_DICT: u8 = 0x02;
pub const EXT_FLAG_LAZY: u8 = 0x08;
pub const EXT_FLAG_SPECIAL_SHIFT: u8 = 4;
pub const EXT_FLAG_SPECIAL_MASK: u8 = 0x0F;

// --- filter ids (stable on the wire, §6) ---
pub const FILTER_IDENTITY: u8 = 0;
pub const FILTER_BYTE_SHUFFLE: u8 = 1;
pub const FILTER_BIT_SHUFFLE: u8 = 2;
pub const FILTER_DELTA: u8 = 3;
pub const FILTER_TRUNC_PREC: u8 = 4;
pub const FILTER_USER_START: u8 = 32;

// --- codec ids (3 bits, bits 5-7 of flags) ---
pub const CODEC_BLOSCLZ: u8 = 0;
pub const CODEC_LZ4: u8 = 1;
pub const CODEC_LZ4HC: u8 = 2;
pub const CODEC_ZLIB: u8 = 3;
pub const CODEC_ZSTD: u8 = 4;

/// Largest dictionary this crate's trainer will produce (§4.10, §9).
pub const MAX_DICT_SIZE: usize = 128 * 1024;

/// Special chunk types, packed into `ext_flags` bits 4-7.
pub const SPECIAL_NONE: u8 = 0;
pub const SPECIAL_ZERO: u8 = 1;
pub const SPECIAL_NAN: u8 = 2;
pub const SPECIAL_VALUE: u8 = 3;
pub const SPECIAL_UNINIT: u8 = 4;
