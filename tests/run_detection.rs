use blockzip::block::{compress_block, decompress_block, BlockParams};
use blockzip::codecs::Codec;
use blockzip::filters::pipeline::FilterPipeline;

#[test]
fn run_of_nonzero_byte_emits_token_sentinel() {
    let params = BlockParams { clevel: 5, codec: Codec::BloscLz, typesize: 1, split: false };
    let pipeline = FilterPipeline::identity(1);

    let src = vec![0xAAu8; 256];
    let mut dest = vec![0u8; 512];
    let written = compress_block(&params, &pipeline, None, &src, &mut dest).unwrap();
    assert_eq!(written, 5, "zero-len run should be a 4-byte prefix plus 1 token byte");

    let len = i32::from_le_bytes(dest[0..4].try_into().unwrap());
    assert_eq!(len, -0xAA);
    assert_eq!(dest[4], 0x01);

    let mut out = vec![0u8; 256];
    decompress_block(&params, &pipeline, None, &dest[..written], 256, &mut out).unwrap();
    assert_eq!(out, src);
}
