//! C5: block engine (§4.4, §4.5, §9). Compresses or decompresses one
//! block, optionally split into `typesize` independently-compressed
//! sub-streams, each preceded by a signed length-prefix with the three
//! reserved run-length sentinels.

use crate::codecs::{self, Codec};
use crate::error::{BloscError, Result};
use crate::filters::pipeline::FilterPipeline;

/// Non-filter, non-codec knobs the block engine needs per call.
pub struct BlockParams {
    pub clevel: u8,
    pub codec: Codec,
    pub typesize: usize,
    pub split: bool,
}

const RUN_TOKEN_NONZERO: u8 = 0x01;

fn uniform_byte(buf: &[u8]) -> Option<u8> {
    let first = *buf.first()?;
    if buf.iter().all(|&b| b == first) {
        Some(first)
    } else {
        None
    }
}

/// Compress one already-sliced block. Returns the number of bytes written
/// to `dest` (length prefixes included).
pub fn compress_block(
    params: &BlockParams,
    pipeline: &FilterPipeline,
    reference: Option<&[u8]>,
    src: &[u8],
    dest: &mut [u8],
) -> Result<usize> {
    compress_block_inner(params, pipeline, reference, None, src, dest)
}

/// As [`compress_block`], but every sub-stream is compressed against a
/// trained dictionary (§4.10, C9) rather than standalone.
pub fn compress_block_with_dict(
    params: &BlockParams,
    pipeline: &FilterPipeline,
    reference: Option<&[u8]>,
    dict: &[u8],
    src: &[u8],
    dest: &mut [u8],
) -> Result<usize> {
    compress_block_inner(params, pipeline, reference, Some(dict), src, dest)
}

fn compress_block_inner(
    params: &BlockParams,
    pipeline: &FilterPipeline,
    reference: Option<&[u8]>,
    dict: Option<&[u8]>,
    src: &[u8],
    dest: &mut [u8],
) -> Result<usize> {
    let filtered = if pipeline.is_noop() {
        src.to_vec()
    } else {
        pipeline.apply_forward(src, reference)?
    };

    let nstreams = if params.split { params.typesize.max(1) } else { 1 };
    if filtered.len() % nstreams != 0 {
        return Err(BloscError::InvalidParam(
            "block length is not a multiple of the sub-stream count".into(),
        ));
    }
    let neblock = filtered.len() / nstreams;

    let mut offset = 0;
    for s in 0..nstreams {
        let stream_src = &filtered[s * neblock..(s + 1) * neblock];
        if offset + 4 > dest.len() {
            return Err(BloscError::WriteBufferShort);
        }

        if let Some(value) = uniform_byte(stream_src) {
            if value == 0 {
                dest[offset..offset + 4].copy_from_slice(&0i32.to_le_bytes());
                offset += 4;
                continue;
            }
            if offset + 5 > dest.len() {
                return Err(BloscError::WriteBufferShort);
            }
            let len: i32 = -(value as i32);
            dest[offset..offset + 4].copy_from_slice(&len.to_le_bytes());
            dest[offset + 4] = RUN_TOKEN_NONZERO;
            offset += 5;
            continue;
        }

        let compressed = match dict {
            Some(d) => codecs::compress_with_dict(params.codec, params.clevel, stream_src, &mut dest[offset + 4..], d),
            None => codecs::compress(params.codec, params.clevel, stream_src, &mut dest[offset + 4..]),
        };
        match compressed {
            Ok(Some(csize)) if csize < neblock => {
                dest[offset..offset + 4].copy_from_slice(&(csize as i32).to_le_bytes());
                offset += 4 + csize;
            }
            Ok(_) => {
                if offset + 4 + neblock > dest.len() {
                    return Err(BloscError::Incompressible);
                }
                dest[offset..offset + 4].copy_from_slice(&(neblock as i32).to_le_bytes());
                dest[offset + 4..offset + 4 + neblock].copy_from_slice(stream_src);
                offset += 4 + neblock;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(offset)
}

/// Decompress one block of `block_nbytes` post-filter bytes from `src`,
/// writing the restored (pre-filter) bytes into `dest`.
pub fn decompress_block(
    params: &BlockParams,
    pipeline: &FilterPipeline,
    reference: Option<&[u8]>,
    src: &[u8],
    block_nbytes: usize,
    dest: &mut [u8],
) -> Result<usize> {
    decompress_block_inner(params, pipeline, reference, None, src, block_nbytes, dest)
}

/// As [`decompress_block`], but every sub-stream is decompressed against a
/// trained dictionary (§4.10, C9).
pub fn decompress_block_with_dict(
    params: &BlockParams,
    pipeline: &FilterPipeline,
    reference: Option<&[u8]>,
    dict: &[u8],
    src: &[u8],
    block_nbytes: usize,
    dest: &mut [u8],
) -> Result<usize> {
    decompress_block_inner(params, pipeline, reference, Some(dict), src, block_nbytes, dest)
}

fn decompress_block_inner(
    params: &BlockParams,
    pipeline: &FilterPipeline,
    reference: Option<&[u8]>,
    dict: Option<&[u8]>,
    src: &[u8],
    block_nbytes: usize,
    dest: &mut [u8],
) -> Result<usize> {
    let nstreams = if params.split { params.typesize.max(1) } else { 1 };
    if block_nbytes % nstreams != 0 {
        return Err(BloscError::DataCorruption(
            "block length is not a multiple of the sub-stream count".into(),
        ));
    }
    let neblock = block_nbytes / nstreams;

    let mut filtered = vec![0u8; block_nbytes];
    let mut src_offset = 0;
    let mut dst_offset = 0;

    for _ in 0..nstreams {
        if src_offset + 4 > src.len() {
            return Err(BloscError::ReadBufferShort);
        }
        let len = i32::from_le_bytes(src[src_offset..src_offset + 4].try_into().unwrap());
        src_offset += 4;

        if len == 0 {
            filtered[dst_offset..dst_offset + neblock].fill(0);
        } else if len < 0 {
            if src_offset >= src.len() {
                return Err(BloscError::ReadBufferShort);
            }
            let token = src[src_offset];
            src_offset += 1;
            if token != RUN_TOKEN_NONZERO {
                return Err(BloscError::DataCorruption(format!(
                    "reserved run-length token bits set: {token:#x}"
                )));
            }
            let value = (-len) as u8;
            filtered[dst_offset..dst_offset + neblock].fill(value);
        } else if len as usize == neblock {
            if src_offset + neblock > src.len() {
                return Err(BloscError::ReadBufferShort);
            }
            filtered[dst_offset..dst_offset + neblock]
                .copy_from_slice(&src[src_offset..src_offset + neblock]);
            src_offset += neblock;
        } else {
            let csize = len as usize;
            if src_offset + csize > src.len() {
                return Err(BloscError::ReadBufferShort);
            }
            let n = match dict {
                Some(d) => codecs::decompress_with_dict(
                    params.codec,
                    &src[src_offset..src_offset + csize],
                    &mut filtered[dst_offset..dst_offset + neblock],
                    d,
                )?,
                None => codecs::decompress(
                    params.codec,
                    &src[src_offset..src_offset + csize],
                    &mut filtered[dst_offset..dst_offset + neblock],
                )?,
            };
            if n != neblock {
                return Err(BloscError::DataCorruption(format!(
                    "sub-stream decoded to {n} bytes, expected {neblock}"
                )));
            }
            src_offset += csize;
        }
        dst_offset += neblock;
    }

    let restored = if pipeline.is_noop() {
        filtered
    } else {
        pipeline.apply_reverse(&filtered, reference)?
    };
    dest[..restored.len()].copy_from_slice(&restored);
    Ok(src_offset)
}
