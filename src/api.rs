//! Non-contextual API (§3 "Non-contextual API"): thin wrappers that build
//! a one-shot [`Context`] from explicit arguments overlaid with
//! environment overrides (§ ambient config), the way the teacher's
//! `api.rs` wraps `Blosc2Context` construction.

use crate::codecs::Codec;
use crate::constants::*;
use crate::context::{Context, Cparams, Dparams};
use crate::env;
use crate::error::Result;

/// Compress `src` into `dest` with the given typesize/clevel/shuffle mode,
/// honouring any `BLOSC_*` environment overrides (§ ambient config).
pub fn compress(clevel: u8, doshuffle: u8, typesize: usize, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let clevel = env::clevel().unwrap_or(clevel);
    let doshuffle = env::shuffle().unwrap_or(doshuffle);
    let typesize = env::typesize().unwrap_or(typesize);
    let use_delta = env::delta().unwrap_or(false);
    let codec = env::compressor().unwrap_or(Codec::BloscLz);
    let blocksize = env::blocksize();
    let nthreads = env::nthreads().unwrap_or(1);
    let split_mode = env::splitmode();
    let blosc1_compat = env::blosc1_compat();

    let mut filters = [FILTER_IDENTITY; MAX_FILTERS];
    match doshuffle {
        1 => filters[MAX_FILTERS - 1] = FILTER_BYTE_SHUFFLE,
        2 => filters[MAX_FILTERS - 1] = FILTER_BIT_SHUFFLE,
        _ => {}
    }
    if use_delta {
        filters[MAX_FILTERS - 2] = FILTER_DELTA;
    }

    let mut builder = Cparams::builder()
        .typesize(typesize.max(1))
        .clevel(clevel)
        .codec(codec)
        .filters(filters, [0; MAX_FILTERS])
        .nthreads(nthreads);
    if let Some(b) = blocksize {
        builder = builder.blocksize(b);
    }
    if let Some(mode) = split_mode {
        builder = builder.split_mode(mode);
    }
    if blosc1_compat {
        builder = builder.minimal_header(true);
    }

    let ctx = Context::for_compression(builder.build());
    ctx.compress(src, dest)
}

/// Decompress a chunk produced by [`compress`] or a compatible writer.
pub fn decompress(src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let nthreads = env::nthreads().unwrap_or(1);
    let ctx = Context::for_decompression(Dparams::builder().nthreads(nthreads).build());
    ctx.decompress(src, dest)
}

/// Build a header-only `NAN` chunk (§4.7): no body is stored, and
/// decompress fills the destination with `nbytes/typesize` IEEE NaNs.
pub fn compress_nan(typesize: usize, nbytes: usize, dest: &mut [u8]) -> Result<usize> {
    crate::chunk::compress_nan(typesize, nbytes, dest)
}

/// Build a header-only `UNINIT` chunk (§4.7): no body is stored, and
/// decompress leaves the destination untouched.
pub fn compress_uninit(typesize: usize, nbytes: usize, dest: &mut [u8]) -> Result<usize> {
    crate::chunk::compress_uninit(typesize, nbytes, dest)
}

/// Build a `VALUE` chunk (§4.7) from a source buffer that is a uniform
/// repeat of one `typesize`-wide element; the body stores just that
/// element, broadcast back out on decompress.
pub fn compress_value(typesize: usize, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    crate::chunk::compress_value(typesize, src, dest)
}

/// Extract `nitems` elements starting at `start` without decompressing
/// the whole chunk (§4.9 / §8 scenario 5).
pub fn getitem(src: &[u8], start: usize, nitems: usize, dest: &mut [u8]) -> Result<usize> {
    crate::getitem::getitem(src, start, nitems, dest)
}

/// `(nbytes, cbytes, blocksize)` read straight from a chunk's header.
pub fn cbuffer_sizes(src: &[u8]) -> Result<(usize, usize, usize)> {
    crate::chunk::chunk_sizes(src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_decompress_roundtrip() {
        let src: Vec<u8> = (0..4096u32).flat_map(|v| (v % 11).to_le_bytes()).collect();
        let mut compressed = vec![0u8; src.len() * 2 + MAX_OVERHEAD];
        let cbytes = compress(5, 1, 4, &src, &mut compressed).unwrap();

        let mut out = vec![0u8; src.len()];
        let nbytes = decompress(&compressed[..cbytes], &mut out).unwrap();
        assert_eq!(nbytes, src.len());
        assert_eq!(out, src);
    }

    #[test]
    fn cbuffer_sizes_reports_header_fields() {
        let src = vec![7u8; 256];
        let mut compressed = vec![0u8; 512 + MAX_OVERHEAD];
        let cbytes = compress(5, 0, 1, &src, &mut compressed).unwrap();
        let (nbytes, reported_cbytes, _blocksize) = cbuffer_sizes(&compressed[..cbytes]).unwrap();
        assert_eq!(nbytes, src.len());
        assert_eq!(reported_cbytes, cbytes);
    }

    #[test]
    fn blosc1_compat_env_forces_minimal_header() {
        std::env::set_var("BLOSC_BLOSC1_COMPAT", "1");
        let src: Vec<u8> = (0..1024u32).flat_map(|v| (v % 7).to_le_bytes()).collect();
        let mut compressed = vec![0u8; src.len() * 2 + MAX_OVERHEAD];
        let result = compress(5, 1, 4, &src, &mut compressed);
        std::env::remove_var("BLOSC_BLOSC1_COMPAT");

        let cbytes = result.unwrap();
        assert_eq!(compressed[0], 2);

        let mut out = vec![0u8; src.len()];
        let nbytes = decompress(&compressed[..cbytes], &mut out).unwrap();
        assert_eq!(nbytes, src.len());
        assert_eq!(out, src);
    }
}
