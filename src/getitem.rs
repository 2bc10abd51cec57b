//! C8: getitem path (§4.9 in the teacher's numbering / §8 scenario 5).
//! Decompresses only the blocks that intersect `[start, start+nitems)` and
//! copies out the requested element range.

use crate::block::{self, BlockParams};
use crate::codecs::Codec;
use crate::constants::FILTER_BYTE_SHUFFLE;
use crate::error::{BloscError, Result};
use crate::filters::pipeline::FilterPipeline;
use crate::header::read_header;
use crate::special::{self, SpecialType};

/// Copy `nitems` elements starting at element index `start` out of a
/// compressed chunk `src`, typesize taken from the header, into `dest`.
/// Returns the number of bytes written.
pub fn getitem(src: &[u8], start: usize, nitems: usize, dest: &mut [u8]) -> Result<usize> {
    let header = read_header(src, true)?;
    let typesize = header.typesize as usize;
    let nbytes = header.nbytes as usize;
    let start_byte = start * typesize;
    let end_byte = (start + nitems) * typesize;
    if end_byte > nbytes {
        return Err(BloscError::InvalidParam("getitem range exceeds chunk nbytes".into()));
    }
    let want = end_byte - start_byte;
    if dest.len() < want {
        return Err(BloscError::WriteBufferShort);
    }

    let header_len = header.header_len();
    let special = header.special_type();
    if special.is_special() {
        let body = if src.len() > header_len { &src[header_len..] } else { &[] };
        let mut full = vec![0u8; nbytes];
        special::decode_special(special, typesize, nbytes, body, &mut full)?;
        dest[..want].copy_from_slice(&full[start_byte..end_byte]);
        return Ok(want);
    }

    if header.is_memcpyed() {
        dest[..want].copy_from_slice(&src[header_len + start_byte..header_len + end_byte]);
        return Ok(want);
    }

    let codec = Codec::from_id(header.codec_id())?;
    let blocksize = header.blocksize as usize;
    let nblocks = if blocksize == 0 { 0 } else { (nbytes + blocksize - 1) / blocksize };
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
    let cbytes = header.cbytes as usize;

    let start_block = start_byte / blocksize;
    let end_block = (end_byte - 1) / blocksize;

    // Delta needs block 0's reference window whenever the intersecting
    // range excludes it.
    let mut reference: Option<Vec<u8>> = None;
    if pipeline.uses_delta() && start_block > 0 {
        let block_end = blocksize.min(nbytes);
        let end = if nblocks > 1 { bstarts[1] } else { cbytes };
        let params = BlockParams { clevel: 0, codec, typesize, split: false };
        let mut buf = vec![0u8; block_end];
        block::decompress_block(&params, &pipeline, None, &src[bstarts[0]..end], block_end, &mut buf)?;
        reference = Some(buf);
    }

    let mut written = 0;
    for k in start_block..=end_block {
        let block_start = k * blocksize;
        let block_end_byte = (block_start + blocksize).min(nbytes);
        let block_nbytes = block_end_byte - block_start;
        let leftover = block_nbytes != blocksize;

        let s = bstarts[k];
        let e = if k + 1 < nblocks { bstarts[k + 1] } else { cbytes };
        let params = BlockParams {
            clevel: 0,
            codec,
            typesize,
            split: !dont_split && !leftover,
        };

        let mut block_buf = vec![0u8; block_nbytes];
        let effective_reference = if k == 0 { None } else { reference.as_deref() };
        block::decompress_block(&params, &pipeline, effective_reference, &src[s..e], block_nbytes, &mut block_buf)?;

        if k == 0 && pipeline.uses_delta() && reference.is_none() {
            reference = Some(block_buf.clone());
        }

        let copy_start = start_byte.max(block_start) - block_start;
        let copy_end = end_byte.min(block_end_byte) - block_start;
        let len = copy_end - copy_start;
        dest[written..written + len].copy_from_slice(&block_buf[copy_start..copy_end]);
        written += len;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{compress_chunk, ChunkParams};
    use crate::codecs::Codec;
    use crate::constants::MAX_FILTERS;

    #[test]
    fn extracts_mid_block_range() {
        let typesize = 4;
        let mut pipeline = FilterPipeline::identity(typesize);
        pipeline.filters[MAX_FILTERS - 1] = FILTER_BYTE_SHUFFLE;
        let params = ChunkParams {
            typesize,
            clevel: 5,
            codec: Codec::BloscLz,
            pipeline,
            blocksize: Some(4096),
            split_mode: None,
            minimal_header: false,
        };

        let values: Vec<u32> = (0..16384u32).collect();
        let src: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut dest = vec![0u8; src.len() * 2 + crate::constants::MAX_OVERHEAD];
        let cbytes = compress_chunk(&params, &src, &mut dest).unwrap();

        let mut out = vec![0u8; 3 * typesize];
        let n = getitem(&dest[..cbytes], 5000, 3, &mut out).unwrap();
        assert_eq!(n, 3 * typesize);

        let got: Vec<u32> = out
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(got, vec![5000, 5001, 5002]);
    }
}
