//! C6: chunk engine (§4.6). Computes block size/count, lays out the
//! header + bstarts + bodies, picks the MEMCPYED fast path, and folds
//! whole-chunk special encodings in and out.

use crate::block::{self, BlockParams};
use crate::codecs::Codec;
use crate::constants::*;
use crate::error::{BloscError, Result};
use crate::filters::pipeline::FilterPipeline;
use crate::header::{read_header, write_header, HeaderParams};
use crate::special::{self, SpecialType};

pub struct ChunkParams {
    pub typesize: usize,
    pub clevel: u8,
    pub codec: Codec,
    pub pipeline: FilterPipeline,
    /// Caller override; `None` lets the chunk engine pick via `tune_blocksize`.
    pub blocksize: Option<usize>,
    /// `BLOSC_SPLITMODE` override (§3 ambient config); `None` behaves like `Auto`.
    pub split_mode: Option<SplitMode>,
    /// `BLOSC_BLOSC1_COMPAT` (§3): write the 16-byte minimal header instead of
    /// the extended one. Special-value folding and arbitrary filter pipelines
    /// have no encoding in that header, so only a pipeline expressible as
    /// shuffle/bitshuffle optionally combined with delta is accepted.
    pub minimal_header: bool,
}

/// Packs a pipeline into the minimal header's flag bits (§6): only the last
/// two slots (shuffle/bitshuffle, then delta) may be non-identity.
fn minimal_header_flags(pipeline: &FilterPipeline) -> Result<u8> {
    for idx in 0..MAX_FILTERS - 2 {
        if pipeline.filters[idx] != FILTER_IDENTITY {
            return Err(BloscError::InvalidParam(
                "Blosc1-compatible header cannot express this filter pipeline".into(),
            ));
        }
    }
    let mut flags = 0u8;
    match pipeline.filters[MAX_FILTERS - 2] {
        FILTER_IDENTITY => {}
        FILTER_DELTA => flags |= FLAG_DELTA,
        _ => {
            return Err(BloscError::InvalidParam(
                "Blosc1-compatible header cannot express this filter pipeline".into(),
            ))
        }
    }
    match pipeline.filters[MAX_FILTERS - 1] {
        FILTER_IDENTITY => {}
        FILTER_BYTE_SHUFFLE => flags |= FLAG_BYTE_SHUFFLE,
        FILTER_BIT_SHUFFLE => flags |= FLAG_BIT_SHUFFLE,
        _ => {
            return Err(BloscError::InvalidParam(
                "Blosc1-compatible header cannot express this filter pipeline".into(),
            ))
        }
    }
    Ok(flags)
}

/// Mirrors `BLOSC_SPLITMODE` (§3): whether a block's sub-streams are
/// independently compressed, forced either way or left to [`should_split`]'s
/// heuristic. `ForwardCompat` behaves like `Auto` here since this crate has
/// no older on-disk format to stay compatible with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Always,
    Never,
    Auto,
    ForwardCompat,
}

pub fn resolve_split(mode: Option<SplitMode>, heuristic: bool) -> bool {
    match mode {
        Some(SplitMode::Always) => true,
        Some(SplitMode::Never) => false,
        Some(SplitMode::Auto) | Some(SplitMode::ForwardCompat) | None => heuristic,
    }
}

/// Default block-size tuner (§4.6 step 2), shaped after the teacher's
/// `compute_blocksize`/`stune.rs` heuristic: scale from an L1-sized base by
/// compression level and codec cost class, then align to `typesize`.
pub fn tune_blocksize(clevel: u8, typesize: usize, nbytes: usize, codec: Codec, split: bool) -> usize {
    if nbytes < typesize || typesize == 0 {
        return nbytes.max(1);
    }

    let mut blocksize = nbytes;
    if nbytes >= L1 {
        blocksize = L1;
        let hcr = matches!(codec, Codec::Lz4Hc | Codec::Zlib | Codec::Zstd);
        if hcr {
            blocksize *= 2;
        }
        blocksize = match clevel {
            0 => blocksize / 4,
            1 => blocksize / 2,
            2 => blocksize,
            3 => blocksize * 2,
            4 | 5 => blocksize * 4,
            6 | 7 | 8 => blocksize * 8,
            _ => {
                let mut b = blocksize * 8;
                if hcr {
                    b *= 2;
                }
                b
            }
        };
    }

    if clevel > 0 && split {
        blocksize = match clevel {
            1 | 2 | 3 => 32 * 1024,
            4 | 5 | 6 => 64 * 1024,
            7 => 128 * 1024,
            8 => 256 * 1024,
            _ => 512 * 1024,
        };
        blocksize = (blocksize * typesize).min(4 * 1024 * 1024).max(32 * 1024);
    }

    if blocksize > nbytes {
        blocksize = nbytes;
    }
    if blocksize > typesize {
        blocksize = (blocksize / typesize) * typesize;
    }
    blocksize.max(1)
}

/// Whether a block should be split into `typesize` sub-streams (§4.6,
/// mirrors `split_block` in the teacher's tuner): only worthwhile for
/// byte-shuffled data, narrow types, and codecs that benefit from it.
pub fn should_split(codec: Codec, clevel: u8, typesize: usize, blocksize: usize, byte_shuffled: bool) -> bool {
    if !byte_shuffled || typesize == 0 {
        return false;
    }
    let split = match codec {
        Codec::BloscLz | Codec::Lz4 | Codec::Lz4Hc => true,
        Codec::Zstd => clevel <= 5,
        Codec::Zlib => false,
    };
    split && typesize <= MAX_SPLIT_TYPESIZE && blocksize / typesize >= MIN_BUFFERSIZE
}

/// Compress `src` into `dest`, returning the final `cbytes`.
pub fn compress_chunk(p: &ChunkParams, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let nbytes = src.len();
    if nbytes > MAX_BUFFERSIZE {
        return Err(BloscError::InvalidParam("source exceeds MAX_BUFFERSIZE".into()));
    }
    if dest.len() < MAX_OVERHEAD {
        return Err(BloscError::WriteBufferShort);
    }

    let typesize = if p.typesize > MAX_SPLIT_TYPESIZE { 1 } else { p.typesize };
    let byte_shuffled = p.pipeline.filters.contains(&FILTER_BYTE_SHUFFLE);
    let blocksize = p
        .blocksize
        .unwrap_or_else(|| tune_blocksize(p.clevel, typesize, nbytes, p.codec, byte_shuffled));
    let nblocks = if nbytes == 0 { 0 } else { (nbytes + blocksize - 1) / blocksize };

    let extended = !p.minimal_header;
    let header_len = if extended { EXTENDED_HEADER_LEN } else { MIN_HEADER_LEN };
    let pipeline_flags = if extended {
        FLAG_EXTENDED_HEADER_MARKER
    } else {
        minimal_header_flags(&p.pipeline)?
    };

    if p.clevel == 0 || nbytes < MIN_BUFFERSIZE {
        if dest.len() < header_len + nbytes {
            return Err(BloscError::WriteBufferShort);
        }
        let params = HeaderParams {
            typesize: typesize as u8,
            nbytes: nbytes as u32,
            blocksize: blocksize as u32,
            cbytes: (header_len + nbytes) as u32,
            flags: pipeline_flags | FLAG_MEMCPYED | (p.codec.id() << FLAG_CODEC_SHIFT),
            extended,
            filters: &p.pipeline.filters,
            filters_meta: &p.pipeline.filters_meta,
            codec_meta: 0,
            special: SpecialType::None,
            use_dict: false,
        };
        write_header(&params, dest)?;
        dest[header_len..header_len + nbytes].copy_from_slice(src);
        return Ok(header_len + nbytes);
    }

    let bstarts_len = nblocks * 4;
    let body_start = header_len + bstarts_len;
    if dest.len() < body_start {
        return Err(BloscError::WriteBufferShort);
    }

    let mut bstarts = vec![0u32; nblocks];
    let mut offset = body_start;
    let mut all_zero = true;

    let reference_src = if p.pipeline.uses_delta() && nblocks > 0 {
        Some(&src[0..blocksize.min(nbytes)])
    } else {
        None
    };

    // Decided once for the whole chunk and recorded in `FLAG_DONT_SPLIT` so
    // the decompressor doesn't have to re-derive it from a clevel it never
    // sees; only the trailing leftover block ever overrides it to `false`.
    let global_split = resolve_split(
        p.split_mode,
        should_split(p.codec, p.clevel, typesize, blocksize, byte_shuffled),
    );

    for k in 0..nblocks {
        let start = k * blocksize;
        let end = (start + blocksize).min(nbytes);
        let block_src = &src[start..end];
        let leftover = end - start != blocksize;
        let params = BlockParams {
            clevel: p.clevel,
            codec: p.codec,
            typesize,
            split: !leftover && global_split,
        };

        bstarts[k] = offset as u32;
        all_zero = all_zero && special::is_all_zero(block_src);

        let reference = if k == 0 { None } else { reference_src };
        let written = block::compress_block(&params, &p.pipeline, reference, block_src, &mut dest[offset..])?;
        offset += written;
    }

    let cbytes = offset;

    // Special-value folding needs ext_flags, so it's only available with the
    // extended header; a Blosc1-compatible chunk always stores its blocks.
    if all_zero && extended {
        let params = HeaderParams {
            typesize: typesize as u8,
            nbytes: nbytes as u32,
            blocksize: blocksize as u32,
            cbytes: header_len as u32,
            flags: pipeline_flags | (p.codec.id() << FLAG_CODEC_SHIFT),
            extended,
            filters: &p.pipeline.filters,
            filters_meta: &p.pipeline.filters_meta,
            codec_meta: 0,
            special: SpecialType::Zero,
            use_dict: false,
        };
        write_header(&params, dest)?;
        return Ok(header_len);
    }

    for (k, &bstart) in bstarts.iter().enumerate() {
        let off = header_len + k * 4;
        dest[off..off + 4].copy_from_slice(&bstart.to_le_bytes());
    }

    let mut flags = pipeline_flags | (p.codec.id() << FLAG_CODEC_SHIFT);
    if !global_split {
        flags |= FLAG_DONT_SPLIT;
    }
    let params = HeaderParams {
        typesize: typesize as u8,
        nbytes: nbytes as u32,
        blocksize: blocksize as u32,
        cbytes: cbytes as u32,
        flags,
        extended,
        filters: &p.pipeline.filters,
        filters_meta: &p.pipeline.filters_meta,
        codec_meta: 0,
        special: SpecialType::None,
        use_dict: false,
    };
    write_header(&params, dest)?;

    Ok(cbytes)
}

/// Compress `src` into `dest` using a dictionary trained from the chunk's
/// own blocks (§4.10, C9): a first pass collects each block's filtered
/// output as a training sample, then a second pass recompresses every
/// block against the trained dictionary. Wire layout is `header ‖
/// bstarts[nblocks] ‖ dict_size ‖ dict_bytes ‖ per-block bodies`, the same
/// shape as an ordinary chunk with the dictionary inserted between the
/// bstarts table and the bodies. Blocks are never split in this mode.
pub fn compress_chunk_with_dict(p: &ChunkParams, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    if p.codec != Codec::Zstd {
        return Err(BloscError::CodecDict(
            "dictionary support is limited to the entropy-dict (zstd) backend".into(),
        ));
    }
    let nbytes = src.len();
    if nbytes > MAX_BUFFERSIZE {
        return Err(BloscError::InvalidParam("source exceeds MAX_BUFFERSIZE".into()));
    }

    let typesize = if p.typesize > MAX_SPLIT_TYPESIZE { 1 } else { p.typesize };
    let blocksize = p
        .blocksize
        .unwrap_or_else(|| tune_blocksize(p.clevel, typesize, nbytes, p.codec, false));
    let nblocks = if nbytes == 0 { 0 } else { (nbytes + blocksize - 1) / blocksize };
    let header_len = EXTENDED_HEADER_LEN;

    let base_flags = FLAG_EXTENDED_HEADER_MARKER | FLAG_DONT_SPLIT | (p.codec.id() << FLAG_CODEC_SHIFT);

    if nblocks == 0 {
        if dest.len() < header_len {
            return Err(BloscError::WriteBufferShort);
        }
        let params = HeaderParams {
            typesize: typesize as u8,
            nbytes: 0,
            blocksize: blocksize as u32,
            cbytes: header_len as u32,
            flags: base_flags,
            extended: true,
            filters: &p.pipeline.filters,
            filters_meta: &p.pipeline.filters_meta,
            codec_meta: 0,
            special: SpecialType::None,
            use_dict: false,
        };
        write_header(&params, dest)?;
        return Ok(header_len);
    }

    let reference_src = if p.pipeline.uses_delta() { Some(&src[0..blocksize.min(nbytes)]) } else { None };

    let mut samples = Vec::with_capacity(nblocks);
    for k in 0..nblocks {
        let start = k * blocksize;
        let end = (start + blocksize).min(nbytes);
        let block_src = &src[start..end];
        let filtered = if p.pipeline.is_noop() {
            block_src.to_vec()
        } else {
            let reference = if k == 0 { None } else { reference_src };
            p.pipeline.apply_forward(block_src, reference)?
        };
        samples.push(filtered);
    }

    let cap = (nbytes / 20).max(1).min(MAX_DICT_SIZE);
    let dict = crate::dict::train_dictionary(&samples, cap)?;

    let bstarts_len = nblocks * 4;
    let dict_off = header_len + bstarts_len;
    let body_start = dict_off + 4 + dict.len();
    if dest.len() < body_start {
        return Err(BloscError::WriteBufferShort);
    }
    dest[dict_off..dict_off + 4].copy_from_slice(&(dict.len() as u32).to_le_bytes());
    dest[dict_off + 4..dict_off + 4 + dict.len()].copy_from_slice(&dict);

    let mut bstarts = vec![0u32; nblocks];
    let mut offset = body_start;
    for k in 0..nblocks {
        let start = k * blocksize;
        let end = (start + blocksize).min(nbytes);
        let block_src = &src[start..end];
        let params = BlockParams { clevel: p.clevel, codec: p.codec, typesize, split: false };
        bstarts[k] = offset as u32;
        let reference = if k == 0 { None } else { reference_src };
        let written =
            block::compress_block_with_dict(&params, &p.pipeline, reference, &dict, block_src, &mut dest[offset..])?;
        offset += written;
    }

    for (k, &bstart) in bstarts.iter().enumerate() {
        let off = header_len + k * 4;
        dest[off..off + 4].copy_from_slice(&bstart.to_le_bytes());
    }

    let cbytes = offset;
    let params = HeaderParams {
        typesize: typesize as u8,
        nbytes: nbytes as u32,
        blocksize: blocksize as u32,
        cbytes: cbytes as u32,
        flags: base_flags,
        extended: true,
        filters: &p.pipeline.filters,
        filters_meta: &p.pipeline.filters_meta,
        codec_meta: 0,
        special: SpecialType::None,
        use_dict: true,
    };
    write_header(&params, dest)?;

    Ok(cbytes)
}

/// `NAN` special chunk (§4.7, mirrors the teacher's `blosc2_chunk_nans`):
/// no body is stored; decompress fills the destination with
/// `nbytes/typesize` IEEE NaNs. `typesize` must be 4 or 8.
pub fn compress_nan(typesize: usize, nbytes: usize, dest: &mut [u8]) -> Result<usize> {
    if typesize != 4 && typesize != 8 {
        return Err(BloscError::InvalidParam("NaN special value requires typesize 4 or 8".into()));
    }
    compress_special_header(SpecialType::Nan, typesize, nbytes, dest)
}

/// `UNINIT` special chunk (§4.7, mirrors `blosc2_chunk_uninit`): no body is
/// stored; decompress leaves the destination untouched.
pub fn compress_uninit(typesize: usize, nbytes: usize, dest: &mut [u8]) -> Result<usize> {
    compress_special_header(SpecialType::Uninit, typesize, nbytes, dest)
}

/// `VALUE` special chunk (§4.7, mirrors `blosc2_chunk_repeatval`): validates
/// that `src` is `src.len()/typesize` repeats of the same `typesize`-wide
/// element, then stores just that element; decompress broadcasts it back
/// out to `src.len()` bytes.
pub fn compress_value(typesize: usize, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    if typesize == 0 || typesize > MAX_TYPESIZE {
        return Err(BloscError::InvalidParam("typesize out of range".into()));
    }
    let value = special::detect_repeated_value(src, typesize)
        .ok_or_else(|| BloscError::InvalidParam("source is not a uniform repeat of one element".into()))?;

    let header_len = EXTENDED_HEADER_LEN;
    if dest.len() < header_len + typesize {
        return Err(BloscError::WriteBufferShort);
    }
    let cbytes = header_len + typesize;
    let params = HeaderParams {
        typesize: typesize as u8,
        nbytes: src.len() as u32,
        blocksize: src.len() as u32,
        cbytes: cbytes as u32,
        flags: FLAG_EXTENDED_HEADER_MARKER,
        extended: true,
        filters: &[FILTER_IDENTITY; MAX_FILTERS],
        filters_meta: &[0; MAX_FILTERS],
        codec_meta: 0,
        special: SpecialType::Value,
        use_dict: false,
    };
    write_header(&params, dest)?;
    dest[header_len..header_len + typesize].copy_from_slice(&value);
    Ok(cbytes)
}

fn compress_special_header(special: SpecialType, typesize: usize, nbytes: usize, dest: &mut [u8]) -> Result<usize> {
    if typesize == 0 || typesize > MAX_TYPESIZE {
        return Err(BloscError::InvalidParam("typesize out of range".into()));
    }
    if nbytes % typesize != 0 {
        return Err(BloscError::InvalidParam("nbytes must be a multiple of typesize".into()));
    }

    let header_len = EXTENDED_HEADER_LEN;
    if dest.len() < header_len {
        return Err(BloscError::WriteBufferShort);
    }
    let params = HeaderParams {
        typesize: typesize as u8,
        nbytes: nbytes as u32,
        blocksize: nbytes as u32,
        cbytes: header_len as u32,
        flags: FLAG_EXTENDED_HEADER_MARKER,
        extended: true,
        filters: &[FILTER_IDENTITY; MAX_FILTERS],
        filters_meta: &[0; MAX_FILTERS],
        codec_meta: 0,
        special,
        use_dict: false,
    };
    write_header(&params, dest)?;
    Ok(header_len)
}

/// Decompress a chunk produced by [`compress_chunk`] (or a Blosc1-minimal
/// one) into `dest`, returning `nbytes`.
pub fn decompress_chunk(src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let header = read_header(src, true)?;
    let nbytes = header.nbytes as usize;
    if dest.len() < nbytes {
        return Err(BloscError::WriteBufferShort);
    }

    let special = header.special_type();
    if special.is_special() {
        let header_len = header.header_len();
        let body = if src.len() > header_len { &src[header_len..] } else { &[] };
        special::decode_special(special, header.typesize as usize, nbytes, body, dest)?;
        return Ok(nbytes);
    }

    if header.is_memcpyed() {
        let header_len = header.header_len();
        dest[..nbytes].copy_from_slice(&src[header_len..header_len + nbytes]);
        return Ok(nbytes);
    }

    if header.is_dict() {
        let header_len = header.header_len();
        let codec = Codec::from_id(header.codec_id())?;
        let typesize = header.typesize as usize;
        let blocksize = header.blocksize as usize;
        let nblocks = if blocksize == 0 { 0 } else { (nbytes + blocksize - 1) / blocksize };

        if src.len() < header_len + nblocks * 4 + 4 {
            return Err(BloscError::ReadBufferShort);
        }
        let mut bstarts = Vec::with_capacity(nblocks);
        for k in 0..nblocks {
            let off = header_len + k * 4;
            bstarts.push(u32::from_le_bytes(src[off..off + 4].try_into().unwrap()) as usize);
        }

        let dict_off = header_len + nblocks * 4;
        let dict_len = u32::from_le_bytes(src[dict_off..dict_off + 4].try_into().unwrap()) as usize;
        if src.len() < dict_off + 4 + dict_len {
            return Err(BloscError::ReadBufferShort);
        }
        let dict = &src[dict_off + 4..dict_off + 4 + dict_len];

        let filters = header.filters();
        let filters_meta = header.filters_meta();
        let pipeline = FilterPipeline { filters, filters_meta, typesize };

        let mut reference: Option<Vec<u8>> = None;
        for k in 0..nblocks {
            let start = bstarts[k];
            let end = if k + 1 < nblocks { bstarts[k + 1] } else { header.cbytes as usize };
            if end > src.len() || start > end {
                return Err(BloscError::ReadBufferShort);
            }
            let block_start = k * blocksize;
            let block_end = (block_start + blocksize).min(nbytes);
            let block_nbytes = block_end - block_start;

            let params = BlockParams { clevel: 0, codec, typesize, split: false };
            block::decompress_block_with_dict(
                &params,
                &pipeline,
                reference.as_deref(),
                dict,
                &src[start..end],
                block_nbytes,
                &mut dest[block_start..block_end],
            )?;

            if k == 0 && pipeline.uses_delta() {
                reference = Some(dest[block_start..block_end].to_vec());
            }
        }

        return Ok(nbytes);
    }

    let codec = Codec::from_id(header.codec_id())?;
    let typesize = header.typesize as usize;
    let blocksize = header.blocksize as usize;
    let nblocks = if blocksize == 0 { 0 } else { (nbytes + blocksize - 1) / blocksize };
    let header_len = header.header_len();

    if src.len() < header_len + nblocks * 4 {
        return Err(BloscError::ReadBufferShort);
    }
    let mut bstarts = Vec::with_capacity(nblocks);
    for k in 0..nblocks {
        let off = header_len + k * 4;
        bstarts.push(u32::from_le_bytes(src[off..off + 4].try_into().unwrap()) as usize);
    }

    let filters = header.filters();
    let filters_meta = header.filters_meta();
    let pipeline = FilterPipeline { filters, filters_meta, typesize };
    let dont_split = header.is_dont_split();

    let mut reference: Option<Vec<u8>> = None;

    for k in 0..nblocks {
        let start = bstarts[k];
        let end = if k + 1 < nblocks { bstarts[k + 1] } else { header.cbytes as usize };
        if end > src.len() || start > end {
            return Err(BloscError::ReadBufferShort);
        }
        let block_start = k * blocksize;
        let block_end = (block_start + blocksize).min(nbytes);
        let block_nbytes = block_end - block_start;
        let leftover = block_nbytes != blocksize;

        let params = BlockParams {
            clevel: 0,
            codec,
            typesize,
            split: !dont_split && !leftover,
        };

        block::decompress_block(
            &params,
            &pipeline,
            reference.as_deref(),
            &src[start..end],
            block_nbytes,
            &mut dest[block_start..block_end],
        )?;

        if k == 0 && pipeline.uses_delta() {
            reference = Some(dest[block_start..block_end].to_vec());
        }
    }

    Ok(nbytes)
}

/// Header-only peek used by the getitem path and non-contextual `cbuffer_sizes`.
pub fn chunk_sizes(src: &[u8]) -> Result<(usize, usize, usize)> {
    let header = read_header(src, true)?;
    Ok((header.nbytes as usize, header.cbytes as usize, header.blocksize as usize))
}
