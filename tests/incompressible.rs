use blockzip::context::{Cparams, Context};
use blockzip::Codec;

// A crude xorshift PRNG so the test has no extra dependency but still
// produces data a general-purpose codec cannot shrink.
fn pseudo_random(len: usize) -> Vec<u8> {
    let mut state: u64 = 0x9E3779B97F4A7C15;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(len);
    out
}

#[test]
fn incompressible_input_roundtrips() {
    let src = pseudo_random(1024 * 1024);
    let cparams = Cparams::builder().typesize(1).clevel(5).codec(Codec::BloscLz).build();
    let ctx = Context::for_compression(cparams);

    let mut dest = vec![0u8; src.len() * 2 + blockzip::constants::MAX_OVERHEAD];
    let cbytes = ctx.compress(&src, &mut dest).unwrap();

    let mut out = vec![0u8; src.len()];
    blockzip::api::decompress(&dest[..cbytes], &mut out).unwrap();
    assert_eq!(out, src);
}
