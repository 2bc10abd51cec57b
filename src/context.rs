//! C10: context object (§4.10 in the teacher's shorthand / entity
//! `Context` in §3). Bundles everything one compression or decompression
//! session needs and owns the thread-count knob the worker pool reads.

use crate::chunk::{ChunkParams, SplitMode};
use crate::codecs::Codec;
use crate::constants::*;
use crate::error::{BloscError, Result};
use crate::filters::pipeline::FilterPipeline;
use crate::pool;

/// Compression-side parameters (§3 `Cparams`).
#[derive(Clone)]
pub struct Cparams {
    pub typesize: usize,
    pub clevel: u8,
    pub codec: Codec,
    pub filters: [u8; MAX_FILTERS],
    pub filters_meta: [u8; MAX_FILTERS],
    pub blocksize: Option<usize>,
    pub nthreads: usize,
    /// Train and embed a dictionary from this chunk's own blocks (§4.10, C9).
    pub use_dict: bool,
    pub split_mode: Option<SplitMode>,
    pub minimal_header: bool,
}

impl Default for Cparams {
    fn default() -> Self {
        Cparams {
            typesize: 1,
            clevel: 5,
            codec: Codec::BloscLz,
            filters: {
                let mut f = [FILTER_IDENTITY; MAX_FILTERS];
                f[MAX_FILTERS - 1] = FILTER_BYTE_SHUFFLE;
                f
            },
            filters_meta: [0; MAX_FILTERS],
            blocksize: None,
            nthreads: 1,
            use_dict: false,
            split_mode: None,
            minimal_header: false,
        }
    }
}

impl Cparams {
    pub fn builder() -> CparamsBuilder {
        CparamsBuilder(Cparams::default())
    }

    fn pipeline(&self) -> FilterPipeline {
        FilterPipeline { filters: self.filters, filters_meta: self.filters_meta, typesize: self.typesize }
    }
}

pub struct CparamsBuilder(Cparams);

impl CparamsBuilder {
    pub fn typesize(mut self, typesize: usize) -> Self {
        self.0.typesize = typesize;
        self
    }
    pub fn clevel(mut self, clevel: u8) -> Self {
        self.0.clevel = clevel.min(9);
        self
    }
    pub fn codec(mut self, codec: Codec) -> Self {
        self.0.codec = codec;
        self
    }
    pub fn filters(mut self, filters: [u8; MAX_FILTERS], filters_meta: [u8; MAX_FILTERS]) -> Self {
        self.0.filters = filters;
        self.0.filters_meta = filters_meta;
        self
    }
    pub fn blocksize(mut self, blocksize: usize) -> Self {
        self.0.blocksize = Some(blocksize);
        self
    }
    pub fn nthreads(mut self, nthreads: usize) -> Self {
        self.0.nthreads = nthreads.max(1);
        self
    }
    /// Train and embed a dictionary from this chunk's own blocks instead of
    /// compressing each sub-stream standalone (§4.10, C9).
    pub fn use_dict(mut self, use_dict: bool) -> Self {
        self.0.use_dict = use_dict;
        self
    }
    pub fn split_mode(mut self, split_mode: SplitMode) -> Self {
        self.0.split_mode = Some(split_mode);
        self
    }
    /// Force Blosc1-compatible minimal (16-byte) headers (§ ambient config
    /// `BLOSC_BLOSC1_COMPAT`). Only a shuffle/bitshuffle + optional delta
    /// pipeline can be expressed this way; anything richer fails at
    /// compress time.
    pub fn minimal_header(mut self, minimal_header: bool) -> Self {
        self.0.minimal_header = minimal_header;
        self
    }
    pub fn build(self) -> Cparams {
        self.0
    }
}

/// Decompression-side parameters (§3 `Dparams`). A dictionary, if the chunk
/// was trained with one, travels embedded in the chunk body (§4.10) and
/// needs no caller-supplied counterpart here.
#[derive(Clone, Default)]
pub struct Dparams {
    pub nthreads: usize,
}

impl Dparams {
    pub fn builder() -> DparamsBuilder {
        DparamsBuilder(Dparams { nthreads: 1 })
    }
}

pub struct DparamsBuilder(Dparams);

impl DparamsBuilder {
    pub fn nthreads(mut self, nthreads: usize) -> Self {
        self.0.nthreads = nthreads.max(1);
        self
    }
    pub fn build(self) -> Dparams {
        self.0
    }
}

/// One compression or decompression session (§3 `Context`). Holds the
/// params above; the worker pool it drives is spun up per call via
/// `std::thread::scope` rather than kept alive between calls, matching
/// the scoped-thread idiom used throughout this crate.
pub struct Context {
    cparams: Option<Cparams>,
    dparams: Option<Dparams>,
}

impl Context {
    pub fn for_compression(cparams: Cparams) -> Self {
        Context { cparams: Some(cparams), dparams: None }
    }

    pub fn for_decompression(dparams: Dparams) -> Self {
        Context { cparams: None, dparams: Some(dparams) }
    }

    pub fn compress(&self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        let cparams = self
            .cparams
            .as_ref()
            .ok_or_else(|| BloscError::InvalidParam("context has no compression parameters".into()))?;

        let chunk_params = ChunkParams {
            typesize: cparams.typesize,
            clevel: cparams.clevel,
            codec: cparams.codec,
            pipeline: cparams.pipeline(),
            blocksize: cparams.blocksize,
            split_mode: cparams.split_mode,
            minimal_header: cparams.minimal_header,
        };

        if cparams.use_dict {
            return crate::chunk::compress_chunk_with_dict(&chunk_params, src, dest);
        }

        pool::compress_chunk_parallel(&chunk_params, src, dest, cparams.nthreads)
    }

    pub fn decompress(&self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        let dparams = self
            .dparams
            .as_ref()
            .ok_or_else(|| BloscError::InvalidParam("context has no decompression parameters".into()))?;
        pool::decompress_chunk_parallel(src, dest, dparams.nthreads)
    }

    pub fn getitem(&self, src: &[u8], start: usize, nitems: usize, dest: &mut [u8]) -> Result<usize> {
        crate::getitem::getitem(src, start, nitems, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_decompress_roundtrip() {
        let cparams = Cparams::builder().typesize(4).clevel(5).codec(Codec::BloscLz).nthreads(2).build();
        let ctx = Context::for_compression(cparams);

        let src: Vec<u8> = (0..16384u32).flat_map(|v| (v % 31).to_le_bytes()).collect();
        let mut dest = vec![0u8; src.len() * 2 + MAX_OVERHEAD];
        let cbytes = ctx.compress(&src, &mut dest).unwrap();

        let dparams = Dparams::builder().nthreads(2).build();
        let dctx = Context::for_decompression(dparams);
        let mut out = vec![0u8; src.len()];
        let nbytes = dctx.decompress(&dest[..cbytes], &mut out).unwrap();
        assert_eq!(nbytes, src.len());
        assert_eq!(out, src);
    }
}
