//! C1: chunk header codec (§4.1, §6).
//!
//! Packs/unpacks the 16-byte minimal header and its 32-byte extended form.
//! All multi-byte fields are little-endian on the wire regardless of host
//! endianness; the extended header additionally records whether the chunk
//! was produced on a big-endian host.

use crate::constants::*;
use crate::error::{BloscError, Result};
use crate::special::SpecialType;

/// Chunk format version understood by this crate, before accepting
/// a chunk produced by an older alpha/beta writer (see `versionlz`).
const VERSION_ALPHA: u8 = 3;

#[derive(Debug, Clone)]
pub struct ExtendedHeader {
    pub filters: [u8; MAX_FILTERS],
    pub udcodec: u8,
    pub codec_meta: u8,
    pub filters_meta: [u8; MAX_FILTERS],
    pub reserved: u8,
    pub ext_flags: u8,
}

#[derive(Debug, Clone)]
pub struct Header {
    pub version: u8,
    pub versionlz: u8,
    pub flags: u8,
    pub typesize: u8,
    pub nbytes: u32,
    pub blocksize: u32,
    pub cbytes: u32,
    pub extended: Option<ExtendedHeader>,
}

impl Header {
    pub fn header_len(&self) -> usize {
        if self.extended.is_some() {
            EXTENDED_HEADER_LEN
        } else {
            MIN_HEADER_LEN
        }
    }

    pub fn is_memcpyed(&self) -> bool {
        self.flags & FLAG_MEMCPYED != 0
    }

    pub fn is_dont_split(&self) -> bool {
        self.flags & FLAG_DONT_SPLIT != 0
    }

    pub fn codec_id(&self) -> u8 {
        (self.flags >> FLAG_CODEC_SHIFT) & FLAG_CODEC_MASK
    }

    /// The effective filter pipeline: the extended header's `filters` array
    /// if present, else a single slot derived from the minimal header's
    /// byte/bit-shuffle flag bits.
    pub fn filters(&self) -> [u8; MAX_FILTERS] {
        if let Some(ext) = &self.extended {
            ext.filters
        } else {
            let mut f = [FILTER_IDENTITY; MAX_FILTERS];
            if self.flags & FLAG_BIT_SHUFFLE != 0 {
                f[MAX_FILTERS - 1] = FILTER_BIT_SHUFFLE;
            } else if self.flags & FLAG_BYTE_SHUFFLE != 0 {
                f[MAX_FILTERS - 1] = FILTER_BYTE_SHUFFLE;
            }
            if self.flags & FLAG_DELTA != 0 {
                // Slot before shuffle so delta is applied after unshuffle on
                // decompress, mirroring minimal-header Blosc1 semantics.
                f[MAX_FILTERS - 2] = FILTER_DELTA;
            }
            f
        }
    }

    pub fn filters_meta(&self) -> [u8; MAX_FILTERS] {
        self.extended.as_ref().map(|e| e.filters_meta).unwrap_or([0; MAX_FILTERS])
    }

    pub fn special_type(&self) -> SpecialType {
        match &self.extended {
            Some(ext) => {
                let raw = (ext.ext_flags >> EXT_FLAG_SPECIAL_SHIFT) & EXT_FLAG_SPECIAL_MASK;
                SpecialType::from_raw(raw)
            }
            None => SpecialType::None,
        }
    }

    pub fn is_dict(&self) -> bool {
        self.extended.as_ref().map(|e| e.ext_flags & EXT_FLAG_DICT != 0).unwrap_or(false)
    }

    pub fn produced_bigendian(&self) -> bool {
        self.extended
            .as_ref()
            .map(|e| e.ext_flags & EXT_FLAG_BIGENDIAN != 0)
            .unwrap_or(false)
    }
}

/// Parameters needed to produce a header; codec/filters come from the
/// caller's configuration, sizes from the chunk engine.
pub struct HeaderParams<'a> {
    pub typesize: u8,
    pub nbytes: u32,
    pub blocksize: u32,
    pub cbytes: u32,
    pub flags: u8,
    pub extended: bool,
    pub filters: &'a [u8; MAX_FILTERS],
    pub filters_meta: &'a [u8; MAX_FILTERS],
    pub codec_meta: u8,
    pub special: SpecialType,
    pub use_dict: bool,
}

/// Read and validate a chunk header from `src` (§4.1).
///
/// `want_extended` controls whether the extended tail is parsed when the
/// flags byte signals it is present; passing `false` deliberately stops at
/// the minimal header (used by the Blosc1-compatible non-contextual path).
pub fn read_header(src: &[u8], want_extended: bool) -> Result<Header> {
    if src.len() < MIN_HEADER_LEN {
        return Err(BloscError::ReadBufferShort);
    }

    let version = src[0];
    if version > BLOSC_VERSION_FORMAT {
        return Err(BloscError::VersionUnsupported(version));
    }

    let versionlz = src[1];
    let flags = src[2];
    let typesize = src[3];
    let nbytes = u32::from_le_bytes(src[4..8].try_into().unwrap());
    let blocksize = u32::from_le_bytes(src[8..12].try_into().unwrap());
    let cbytes = u32::from_le_bytes(src[12..16].try_into().unwrap());

    if (cbytes as usize) < MIN_HEADER_LEN {
        return Err(BloscError::InvalidHeader("cbytes smaller than header".into()));
    }
    if blocksize == 0 && nbytes != 0 {
        return Err(BloscError::InvalidHeader("blocksize is zero".into()));
    }
    if blocksize as usize > MAX_BLOCKSIZE {
        return Err(BloscError::InvalidHeader("blocksize exceeds maximum".into()));
    }
    if typesize == 0 {
        return Err(BloscError::InvalidHeader("typesize is zero".into()));
    }

    let extended_present = (flags & FLAG_EXTENDED_HEADER_MARKER) == FLAG_EXTENDED_HEADER_MARKER;

    let extended = if want_extended && extended_present {
        if src.len() < EXTENDED_HEADER_LEN {
            return Err(BloscError::ReadBufferShort);
        }
        let mut filters = [0u8; MAX_FILTERS];
        filters.copy_from_slice(&src[16..22]);
        let udcodec = src[22];
        let codec_meta = src[23];
        let mut filters_meta = [0u8; MAX_FILTERS];
        filters_meta.copy_from_slice(&src[24..30]);
        let reserved = src[30];
        let ext_flags = src[31];

        // Historical quirk: the ALPHA writer never zeroed the last filter
        // slot; readers must do it for it.
        if version == VERSION_ALPHA {
            filters[MAX_FILTERS - 1] = FILTER_IDENTITY;
        }

        let special_raw = (ext_flags >> EXT_FLAG_SPECIAL_SHIFT) & EXT_FLAG_SPECIAL_MASK;
        if special_raw != SPECIAL_NONE
            && typesize > 0
            && matches!(special_raw, SPECIAL_VALUE | SPECIAL_NAN)
            && nbytes % typesize as u32 != 0
        {
            return Err(BloscError::InvalidHeader(
                "nbytes not a multiple of typesize for special chunk".into(),
            ));
        }

        Some(ExtendedHeader {
            filters,
            udcodec,
            codec_meta,
            filters_meta,
            reserved,
            ext_flags,
        })
    } else {
        None
    };

    let header = Header {
        version,
        versionlz,
        flags,
        typesize,
        nbytes,
        blocksize,
        cbytes,
        extended,
    };

    // The minimal (Blosc1-compatible) header has no endianness marker at all,
    // so only the extended form can be checked here.
    if header.extended.is_some() && header.produced_bigendian() != cfg!(target_endian = "big") {
        return Err(BloscError::InvalidHeader(
            "chunk was produced on a host of different endianness".into(),
        ));
    }

    Ok(header)
}

/// Write a chunk header into `dst` (§4.1). Returns the number of header
/// bytes written (16 or 32).
pub fn write_header(params: &HeaderParams, dst: &mut [u8]) -> Result<usize> {
    let header_len = if params.extended { EXTENDED_HEADER_LEN } else { MIN_HEADER_LEN };
    if dst.len() < header_len {
        return Err(BloscError::WriteBufferShort);
    }

    dst[0] = if params.extended { BLOSC_VERSION_FORMAT } else { 2 };
    dst[1] = 1;
    dst[2] = params.flags;
    dst[3] = params.typesize;
    dst[4..8].copy_from_slice(&params.nbytes.to_le_bytes());
    dst[8..12].copy_from_slice(&params.blocksize.to_le_bytes());
    dst[12..16].copy_from_slice(&params.cbytes.to_le_bytes());

    if params.extended {
        dst[16..22].copy_from_slice(params.filters);
        dst[22] = 0; // udcodec: no user-defined codec in this core
        dst[23] = params.codec_meta;
        dst[24..30].copy_from_slice(params.filters_meta);
        dst[30] = 0; // reserved

        let mut ext_flags = 0u8;
        if cfg!(target_endian = "big") {
            ext_flags |= EXT_FLAG_BIGENDIAN;
        }
        if params.use_dict {
            ext_flags |= EXT_FLAG_DICT;
        }
        ext_flags |= (params.special.as_raw() & EXT_FLAG_SPECIAL_MASK) << EXT_FLAG_SPECIAL_SHIFT;
        dst[31] = ext_flags;
    }

    Ok(header_len)
}

/// Patch the `cbytes` field of an already-written header in place.
pub fn patch_cbytes(dst: &mut [u8], cbytes: u32) {
    dst[12..16].copy_from_slice(&cbytes.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_minimal() {
        let filters = [FILTER_IDENTITY; MAX_FILTERS];
        let filters_meta = [0u8; MAX_FILTERS];
        let params = HeaderParams {
            typesize: 4,
            nbytes: 1024,
            blocksize: 256,
            cbytes: 1024 + MIN_HEADER_LEN as u32,
            flags: CODEC_BLOSCLZ << FLAG_CODEC_SHIFT,
            extended: false,
            filters: &filters,
            filters_meta: &filters_meta,
            codec_meta: 0,
            special: SpecialType::None,
            use_dict: false,
        };
        let mut buf = [0u8; MIN_HEADER_LEN];
        let n = write_header(&params, &mut buf).unwrap();
        assert_eq!(n, MIN_HEADER_LEN);

        let header = read_header(&buf, true).unwrap();
        assert_eq!(header.typesize, 4);
        assert_eq!(header.nbytes, 1024);
        assert_eq!(header.blocksize, 256);
        assert!(header.extended.is_none());
        assert_eq!(header.codec_id(), CODEC_BLOSCLZ);
    }

    #[test]
    fn roundtrip_extended_with_special() {
        let mut filters = [FILTER_IDENTITY; MAX_FILTERS];
        filters[MAX_FILTERS - 1] = FILTER_BYTE_SHUFFLE;
        let filters_meta = [0u8; MAX_FILTERS];
        let params = HeaderParams {
            typesize: 8,
            nbytes: 4096,
            blocksize: 4096,
            cbytes: EXTENDED_HEADER_LEN as u32,
            flags: FLAG_EXTENDED_HEADER_MARKER | (CODEC_ZSTD << FLAG_CODEC_SHIFT),
            extended: true,
            filters: &filters,
            filters_meta: &filters_meta,
            codec_meta: 0,
            special: SpecialType::Zero,
            use_dict: false,
        };
        let mut buf = [0u8; EXTENDED_HEADER_LEN];
        write_header(&params, &mut buf).unwrap();

        let header = read_header(&buf, true).unwrap();
        assert!(header.extended.is_some());
        assert_eq!(header.special_type(), SpecialType::Zero);
        assert_eq!(header.codec_id(), CODEC_ZSTD);
        assert_eq!(header.filters()[MAX_FILTERS - 1], FILTER_BYTE_SHUFFLE);
    }

    #[test]
    fn rejects_mismatched_endianness_marker() {
        let filters = [FILTER_IDENTITY; MAX_FILTERS];
        let filters_meta = [0u8; MAX_FILTERS];
        let params = HeaderParams {
            typesize: 4,
            nbytes: 1024,
            blocksize: 1024,
            cbytes: EXTENDED_HEADER_LEN as u32,
            flags: FLAG_EXTENDED_HEADER_MARKER | (CODEC_BLOSCLZ << FLAG_CODEC_SHIFT),
            extended: true,
            filters: &filters,
            filters_meta: &filters_meta,
            codec_meta: 0,
            special: SpecialType::None,
            use_dict: false,
        };
        let mut buf = [0u8; EXTENDED_HEADER_LEN];
        write_header(&params, &mut buf).unwrap();
        // Flip the marker so it claims the opposite endianness from this host.
        buf[31] ^= EXT_FLAG_BIGENDIAN;
        assert!(matches!(read_header(&buf, true), Err(BloscError::InvalidHeader(_))));
    }

    #[test]
    fn rejects_future_version() {
        let mut buf = [0u8; MIN_HEADER_LEN];
        buf[0] = BLOSC_VERSION_FORMAT + 1;
        buf[3] = 1;
        buf[8..12].copy_from_slice(&16u32.to_le_bytes());
        buf[12..16].copy_from_slice(&16u32.to_le_bytes());
        assert!(matches!(read_header(&buf, true), Err(BloscError::VersionUnsupported(_))));
    }
}
