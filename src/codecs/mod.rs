//! C4: codec registry (§5). Dispatches a sub-stream's compressed bytes to
//! the backend named by the chunk header's codec id.

pub mod blosclz;

use crate::constants::*;
use crate::error::{BloscError, Result};
use std::io::{Read, Write};

/// The five built-in backends (§5); `CODEC_LZ4HC` is an alias selecting a
/// higher-effort LZ4 encode, same wire id as plain LZ4 on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    BloscLz,
    Lz4,
    Lz4Hc,
    Zlib,
    Zstd,
}

impl Codec {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            CODEC_BLOSCLZ => Ok(Codec::BloscLz),
            CODEC_LZ4 => Ok(Codec::Lz4),
            CODEC_LZ4HC => Ok(Codec::Lz4Hc),
            CODEC_ZLIB => Ok(Codec::Zlib),
            CODEC_ZSTD => Ok(Codec::Zstd),
            other => Err(BloscError::CodecUnsupported(other)),
        }
    }

    /// Wire id stored in the flags byte; `Lz4Hc` shares `CODEC_LZ4`'s id
    /// since a decoder cannot distinguish the two encode strategies.
    pub fn id(self) -> u8 {
        match self {
            Codec::BloscLz => CODEC_BLOSCLZ,
            Codec::Lz4 | Codec::Lz4Hc => CODEC_LZ4,
            Codec::Zlib => CODEC_ZLIB,
            Codec::Zstd => CODEC_ZSTD,
        }
    }
}

/// Compress one sub-stream. `clevel` is 0-9; backends that don't take a
/// level (LZ4 plain) ignore it. Returns `None` when the codec judges the
/// input incompressible and declines to emit anything (caller falls back
/// to a literal run).
pub fn compress(codec: Codec, clevel: u8, src: &[u8], dest: &mut [u8]) -> Result<Option<usize>> {
    match codec {
        Codec::BloscLz => {
            let n = blosclz::compress(clevel as i32, src, dest);
            Ok(if n == 0 { None } else { Some(n) })
        }
        Codec::Lz4 => {
            let n = lz4_flex::block::compress_into(src, dest)
                .map_err(|e| BloscError::DataCorruption(e.to_string()))?;
            Ok(Some(n))
        }
        Codec::Lz4Hc => {
            // lz4_flex exposes only the fast path; "hc" differs only in the
            // level hint the caller requested, not the wire format.
            let n = lz4_flex::block::compress_into(src, dest)
                .map_err(|e| BloscError::DataCorruption(e.to_string()))?;
            Ok(Some(n))
        }
        Codec::Zlib => {
            let level = flate2::Compression::new(clevel.min(9) as u32);
            let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), level);
            encoder
                .write_all(src)
                .map_err(|e| BloscError::DataCorruption(e.to_string()))?;
            let out = encoder
                .finish()
                .map_err(|e| BloscError::DataCorruption(e.to_string()))?;
            if out.len() > dest.len() {
                return Ok(None);
            }
            dest[..out.len()].copy_from_slice(&out);
            Ok(Some(out.len()))
        }
        Codec::Zstd => {
            let level = (clevel as i32).clamp(1, 22);
            let out = zstd::bulk::compress(src, level)
                .map_err(|e| BloscError::DataCorruption(e.to_string()))?;
            if out.len() > dest.len() {
                return Ok(None);
            }
            dest[..out.len()].copy_from_slice(&out);
            Ok(Some(out.len()))
        }
    }
}

/// Decompress one sub-stream known to be `dest.len()` bytes when expanded.
pub fn decompress(codec: Codec, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    match codec {
        Codec::BloscLz => {
            let n = blosclz::decompress(src, dest);
            if n == 0 && !dest.is_empty() {
                return Err(BloscError::DataCorruption("blosclz decode failed".into()));
            }
            Ok(n)
        }
        Codec::Lz4 | Codec::Lz4Hc => lz4_flex::block::decompress_into(src, dest)
            .map_err(|e| BloscError::DataCorruption(e.to_string())),
        Codec::Zlib => {
            let mut decoder = flate2::read::DeflateDecoder::new(src);
            decoder
                .read_exact(dest)
                .map_err(|e| BloscError::DataCorruption(e.to_string()))?;
            Ok(dest.len())
        }
        Codec::Zstd => {
            let n = zstd::bulk::decompress_to_buffer(src, dest)
                .map_err(|e| BloscError::DataCorruption(e.to_string()))?;
            Ok(n)
        }
    }
}

/// Decompress one sub-stream using a trained dictionary (§9, C9).
pub fn decompress_with_dict(codec: Codec, src: &[u8], dest: &mut [u8], dict: &[u8]) -> Result<usize> {
    match codec {
        Codec::Zstd => {
            let mut decoder = zstd::bulk::Decompressor::with_dictionary(dict)
                .map_err(|e| BloscError::CodecDict(e.to_string()))?;
            decoder
                .decompress_to_buffer(src, dest)
                .map_err(|e| BloscError::CodecDict(e.to_string()))
        }
        _ => Err(BloscError::CodecDict(
            "dictionary support is limited to the entropy-dict (zstd) backend".into(),
        )),
    }
}

/// Compress one sub-stream using a trained dictionary (§9, C9).
pub fn compress_with_dict(
    codec: Codec,
    clevel: u8,
    src: &[u8],
    dest: &mut [u8],
    dict: &[u8],
) -> Result<Option<usize>> {
    match codec {
        Codec::Zstd => {
            let level = (clevel as i32).clamp(1, 22);
            let mut compressor = zstd::bulk::Compressor::with_dictionary(level, dict)
                .map_err(|e| BloscError::CodecDict(e.to_string()))?;
            let out = compressor
                .compress(src)
                .map_err(|e| BloscError::CodecDict(e.to_string()))?;
            if out.len() > dest.len() {
                return Ok(None);
            }
            dest[..out.len()].copy_from_slice(&out);
            Ok(Some(out.len()))
        }
        _ => Err(BloscError::CodecDict(
            "dictionary support is limited to the entropy-dict (zstd) backend".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blosclz_roundtrips() {
        let src: Vec<u8> = (0..4096u32).map(|i| (i % 17) as u8).collect();
        let mut compressed = vec![0u8; src.len() * 2];
        let n = compress(Codec::BloscLz, 5, &src, &mut compressed).unwrap().unwrap();
        let mut decompressed = vec![0u8; src.len()];
        let m = decompress(Codec::BloscLz, &compressed[..n], &mut decompressed).unwrap();
        assert_eq!(m, src.len());
        assert_eq!(src, decompressed);
    }

    #[test]
    fn lz4_roundtrips() {
        let src: Vec<u8> = (0..2048u32).map(|i| (i % 5) as u8).collect();
        let mut compressed = vec![0u8; lz4_flex::block::get_maximum_output_size(src.len())];
        let n = compress(Codec::Lz4, 0, &src, &mut compressed).unwrap().unwrap();
        let mut decompressed = vec![0u8; src.len()];
        decompress(Codec::Lz4, &compressed[..n], &mut decompressed).unwrap();
        assert_eq!(src, decompressed);
    }

    #[test]
    fn zstd_roundtrips() {
        let src: Vec<u8> = (0..2048u32).map(|i| (i % 9) as u8).collect();
        let mut compressed = vec![0u8; src.len() * 2];
        let n = compress(Codec::Zstd, 3, &src, &mut compressed).unwrap().unwrap();
        let mut decompressed = vec![0u8; src.len()];
        decompress(Codec::Zstd, &compressed[..n], &mut decompressed).unwrap();
        assert_eq!(src, decompressed);
    }

    #[test]
    fn from_id_rejects_unknown_codec() {
        assert!(matches!(Codec::from_id(200), Err(BloscError::CodecUnsupported(200))));
    }
}
