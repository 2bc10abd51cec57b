//! C7: worker pool (§4.8). Scoped OS threads coordinate block dispatch
//! with a dynamic work-queue during compression (output sizes vary) and
//! static partitioning during decompression (output offsets are known up
//! front). A one-shot latch lets every worker but the one assigned block 0
//! wait for the delta filter's reference window.

use crate::block::{self, BlockParams};
use crate::chunk::{resolve_split, should_split, tune_blocksize};
use crate::codecs::Codec;
use crate::constants::*;
use crate::error::{BloscError, Result};
use crate::filters::pipeline::FilterPipeline;
use crate::header::{write_header, HeaderParams};
use crate::special::{self, SpecialType};
use log::trace;
use std::sync::{Condvar, Mutex};

use crate::chunk::ChunkParams;

/// One-shot gate: everyone but the block-0 worker blocks in [`wait`] until
/// the block-0 worker calls [`signal`] (§4.5 "edge cases", §9).
pub struct DeltaLatch {
    ready: Mutex<bool>,
    cv: Condvar,
}

impl DeltaLatch {
    pub fn new() -> Self {
        DeltaLatch { ready: Mutex::new(false), cv: Condvar::new() }
    }

    pub fn signal(&self) {
        let mut ready = self.ready.lock().unwrap();
        *ready = true;
        self.cv.notify_all();
    }

    pub fn wait(&self) {
        let mut ready = self.ready.lock().unwrap();
        while !*ready {
            ready = self.cv.wait(ready).unwrap();
        }
    }
}

impl Default for DeltaLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Guards both the next-block counter/output cursor and the shared output
/// buffer itself, so reserving a write offset and writing into it happen
/// under the same lock with no need for unsafe disjoint-slice aliasing.
struct DynamicQueue<'a> {
    next_block: usize,
    offset: usize,
    dest: &'a mut [u8],
}

/// Compress `src` into `dest` using `nthreads` workers and a dynamic
/// work-queue (§4.8 "dynamic"). With `nthreads <= 1` this degenerates to
/// the same sequential path as [`crate::chunk::compress_chunk`].
pub fn compress_chunk_parallel(p: &ChunkParams, src: &[u8], dest: &mut [u8], nthreads: usize) -> Result<usize> {
    if nthreads <= 1 || p.minimal_header {
        return crate::chunk::compress_chunk(p, src, dest);
    }

    let nbytes = src.len();
    if nbytes > MAX_BUFFERSIZE {
        return Err(BloscError::InvalidParam("source exceeds MAX_BUFFERSIZE".into()));
    }
    if p.clevel == 0 || nbytes < MIN_BUFFERSIZE {
        return crate::chunk::compress_chunk(p, src, dest);
    }

    let typesize = if p.typesize > MAX_SPLIT_TYPESIZE { 1 } else { p.typesize };
    let byte_shuffled = p.pipeline.filters.contains(&FILTER_BYTE_SHUFFLE);
    let blocksize = p
        .blocksize
        .unwrap_or_else(|| tune_blocksize(p.clevel, typesize, nbytes, p.codec, byte_shuffled));
    let nblocks = if nbytes == 0 { 0 } else { (nbytes + blocksize - 1) / blocksize };

    let header_len = EXTENDED_HEADER_LEN;
    let body_start = header_len + nblocks * 4;
    if dest.len() < body_start {
        return Err(BloscError::WriteBufferShort);
    }

    let bstarts = Mutex::new(vec![0u32; nblocks]);
    let dest_len = dest.len();
    let queue = Mutex::new(DynamicQueue { next_block: 0, offset: body_start, dest });
    let giveup = Mutex::new(None::<BloscError>);
    let delta_latch = DeltaLatch::new();
    let reference: Mutex<Option<Vec<u8>>> = Mutex::new(None);
    let global_split = resolve_split(
        p.split_mode,
        should_split(p.codec, p.clevel, typesize, blocksize, byte_shuffled),
    );

    std::thread::scope(|scope| {
        for tid in 0..nthreads {
            let queue = &queue;
            let bstarts = &bstarts;
            let giveup = &giveup;
            let delta_latch = &delta_latch;
            let reference = &reference;
            let pipeline = &p.pipeline;
            scope.spawn(move || {
                loop {
                    if giveup.lock().unwrap().is_some() {
                        return;
                    }
                    let k;
                    {
                        let mut q = queue.lock().unwrap();
                        if q.next_block >= nblocks {
                            return;
                        }
                        k = q.next_block;
                        q.next_block += 1;
                    }
                    trace!("worker {tid} compressing block {k}");

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

                    if k == 0 && pipeline.uses_delta() {
                        *reference.lock().unwrap() = Some(block_src.to_vec());
                        delta_latch.signal();
                    } else if pipeline.uses_delta() {
                        delta_latch.wait();
                    }
                    let delta_reference = reference.lock().unwrap().clone();

                    let mut scratch = vec![0u8; (end - start) * 2 + MAX_OVERHEAD];
                    let written = match block::compress_block(
                        &params,
                        pipeline,
                        delta_reference.as_deref(),
                        block_src,
                        &mut scratch,
                    ) {
                        Ok(w) => w,
                        Err(e) => {
                            *giveup.lock().unwrap() = Some(e);
                            return;
                        }
                    };

                    let mut q = queue.lock().unwrap();
                    let place_at = q.offset;
                    if place_at + written > dest_len {
                        drop(q);
                        *giveup.lock().unwrap() = Some(BloscError::WriteBufferShort);
                        return;
                    }
                    q.offset += written;
                    q.dest[place_at..place_at + written].copy_from_slice(&scratch[..written]);
                    drop(q);
                    bstarts.lock().unwrap()[k] = place_at as u32;
                }
            });
        }
    });

    if let Some(err) = giveup.into_inner().unwrap() {
        return Err(err);
    }

    let DynamicQueue { offset: final_offset, dest, .. } = queue.into_inner().unwrap();
    let bstarts = bstarts.into_inner().unwrap();

    let mut flags = FLAG_EXTENDED_HEADER_MARKER | (p.codec.id() << FLAG_CODEC_SHIFT);
    if !global_split {
        flags |= FLAG_DONT_SPLIT;
    }

    let all_zero = special::is_all_zero(src);
    if all_zero {
        let params = HeaderParams {
            typesize: typesize as u8,
            nbytes: nbytes as u32,
            blocksize: blocksize as u32,
            cbytes: header_len as u32,
            flags,
            extended: true,
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

    let params = HeaderParams {
        typesize: typesize as u8,
        nbytes: nbytes as u32,
        blocksize: blocksize as u32,
        cbytes: final_offset as u32,
        flags,
        extended: true,
        filters: &p.pipeline.filters,
        filters_meta: &p.pipeline.filters_meta,
        codec_meta: 0,
        special: SpecialType::None,
        use_dict: false,
    };
    write_header(&params, dest)?;

    Ok(final_offset)
}

/// Decompress using `nthreads` workers with static block partitioning
/// (§4.8 "static"): each thread owns a contiguous range of block indices
/// and writes into its own disjoint slice of `dest`, so no locking is
/// needed beyond the one-shot delta latch.
pub fn decompress_chunk_parallel(src: &[u8], dest: &mut [u8], nthreads: usize) -> Result<usize> {
    if nthreads <= 1 {
        return crate::chunk::decompress_chunk(src, dest);
    }

    let header = crate::header::read_header(src, true)?;
    let nbytes = header.nbytes as usize;
    if dest.len() < nbytes {
        return Err(BloscError::WriteBufferShort);
    }

    let special = header.special_type();
    if special.is_special() || header.is_memcpyed() || header.is_dict() {
        return crate::chunk::decompress_chunk(src, dest);
    }

    let codec = Codec::from_id(header.codec_id())?;
    let typesize = header.typesize as usize;
    let blocksize = header.blocksize as usize;
    let nblocks = if blocksize == 0 { 0 } else { (nbytes + blocksize - 1) / blocksize };
    let header_len = header.header_len();

    if nblocks <= 1 {
        return crate::chunk::decompress_chunk(src, dest);
    }
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
    let uses_delta = pipeline.uses_delta();

    let giveup: Mutex<Option<BloscError>> = Mutex::new(None);
    let delta_latch = DeltaLatch::new();
    let reference: Mutex<Option<Vec<u8>>> = Mutex::new(None);

    if uses_delta {
        let end = if nblocks > 1 { bstarts[1] } else { cbytes };
        let block_end = blocksize.min(nbytes);
        let mut ref_buf = vec![0u8; block_end];
        let params = BlockParams { clevel: 0, codec, typesize, split: false };
        block::decompress_block(&params, &pipeline, None, &src[bstarts[0]..end], block_end, &mut ref_buf)?;
        *reference.lock().unwrap() = Some(ref_buf);
        delta_latch.signal();
    }

    let chunk = nblocks.div_ceil(nthreads).max(1);

    std::thread::scope(|scope| {
        let mut rest = dest;
        let mut block_cursor = 0usize;
        for tid in 0..nthreads {
            if block_cursor >= nblocks {
                break;
            }
            let take_blocks = chunk.min(nblocks - block_cursor);
            let byte_len: usize = (block_cursor..block_cursor + take_blocks)
                .map(|k| {
                    let s = k * blocksize;
                    let e = (s + blocksize).min(nbytes);
                    e - s
                })
                .sum();
            let (my_slice, remainder) = rest.split_at_mut(byte_len);
            rest = remainder;

            let start_block = block_cursor;
            block_cursor += take_blocks;

            let giveup = &giveup;
            let delta_latch = &delta_latch;
            let reference = &reference;
            let pipeline = &pipeline;
            let bstarts = &bstarts;

            scope.spawn(move || {
                trace!("worker {tid} decompressing blocks {start_block}..{}", start_block + take_blocks);
                let mut local_offset = 0;
                for k in start_block..start_block + take_blocks {
                    if giveup.lock().unwrap().is_some() {
                        return;
                    }
                    let start = bstarts[k];
                    let end = if k + 1 < nblocks { bstarts[k + 1] } else { cbytes };
                    let block_start = k * blocksize;
                    let block_end = (block_start + blocksize).min(nbytes);
                    let block_nbytes = block_end - block_start;
                    let leftover = block_nbytes != blocksize;

                    if k != 0 && pipeline.uses_delta() {
                        delta_latch.wait();
                    }
                    let delta_reference = reference.lock().unwrap().clone();

                    let params = BlockParams {
                        clevel: 0,
                        codec,
                        typesize,
                        split: !dont_split && !leftover,
                    };
                    if let Err(e) = block::decompress_block(
                        &params,
                        pipeline,
                        delta_reference.as_deref(),
                        &src[start..end],
                        block_nbytes,
                        &mut my_slice[local_offset..local_offset + block_nbytes],
                    ) {
                        *giveup.lock().unwrap() = Some(e);
                        return;
                    }
                    local_offset += block_nbytes;
                }
            });
        }
    });

    if let Some(err) = giveup.into_inner().unwrap() {
        return Err(err);
    }

    Ok(nbytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{FILTER_BYTE_SHUFFLE, MAX_FILTERS};

    fn params(typesize: usize, nthreads_hint_blocksize: usize) -> ChunkParams {
        let mut pipeline = FilterPipeline::identity(typesize);
        pipeline.filters[MAX_FILTERS - 1] = FILTER_BYTE_SHUFFLE;
        ChunkParams {
            typesize,
            clevel: 5,
            codec: Codec::BloscLz,
            pipeline,
            blocksize: Some(nthreads_hint_blocksize),
            split_mode: None,
            minimal_header: false,
        }
    }

    #[test]
    fn parallel_compress_matches_serial_roundtrip() {
        let p = params(4, 256);
        let src: Vec<u8> = (0..16384u32).flat_map(|v| (v % 251).to_le_bytes()).collect();

        let mut dest_serial = vec![0u8; src.len() * 2 + MAX_OVERHEAD];
        let cbytes_serial = crate::chunk::compress_chunk(&p, &src, &mut dest_serial).unwrap();

        let mut dest_parallel = vec![0u8; src.len() * 2 + MAX_OVERHEAD];
        let cbytes_parallel = compress_chunk_parallel(&p, &src, &mut dest_parallel, 4).unwrap();

        let mut out_serial = vec![0u8; src.len()];
        crate::chunk::decompress_chunk(&dest_serial[..cbytes_serial], &mut out_serial).unwrap();
        let mut out_parallel = vec![0u8; src.len()];
        decompress_chunk_parallel(&dest_parallel[..cbytes_parallel], &mut out_parallel, 4).unwrap();

        assert_eq!(out_serial, src);
        assert_eq!(out_parallel, src);
    }

    #[test]
    fn threadcount_invariance() {
        let p = params(4, 512);
        let src: Vec<u8> = (0..16384u32).map(|v| (v % 97) as u8).collect();
        let mut dest = vec![0u8; src.len() * 2 + MAX_OVERHEAD];
        let cbytes = compress_chunk_parallel(&p, &src, &mut dest, 2).unwrap();

        for nthreads in [1, 2, 8] {
            let mut out = vec![0u8; src.len()];
            decompress_chunk_parallel(&dest[..cbytes], &mut out, nthreads).unwrap();
            assert_eq!(out, src);
        }
    }
}
